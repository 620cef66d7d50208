use std::path::PathBuf;

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use governance_encoder::{
    rpc::RpcChain, ChainReader, ControllerKind, ControllerRegistry, DeploymentBook, DryRunConfig,
    DryRunOrchestrator,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod batch;

use batch::BatchScript;

/// Deployment name of the protocol core, used when `--protocol` is not given.
const PROTOCOL_DEPLOYMENT: &str = "DolomiteMargin";

/// Encode a governance batch for the protocol's current owner, dry-run it on a forked node, and
/// write a Safe transaction-builder upload file.
///
/// The fork must expose `hardhat_impersonateAccount` and `hardhat_setBalance` (anvil or hardhat).
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// JSON batch file: contracts, calls and post-state invariants.
    batch: PathBuf,

    /// RPC URL of the forked node.
    #[arg(long, env = "RPC_URL")]
    rpc_url: String,

    /// Deployment manifests (`{ Name: { chainId: { address } } }`); later files win on name lookups.
    #[arg(long, env = "DEPLOYMENTS", value_delimiter = ',')]
    deployments: Vec<PathBuf>,

    /// Protocol core address. Defaults to the `DolomiteMargin` deployment.
    #[arg(long, env = "PROTOCOL_ADDRESS")]
    protocol: Option<Address>,

    /// Controller registry (`{ "<chainId>": { ownerAdapterV1: [..], delayedMultiSig: [..], .. } }`),
    /// merged over the controllers found in the deployment manifests.
    #[arg(long)]
    controllers: Option<PathBuf>,

    /// Plain account allowed to own the protocol directly. Repeatable.
    #[arg(long = "direct-signer")]
    direct_signers: Vec<Address>,

    /// Where to write the upload manifest.
    #[arg(long, default_value = "upload.json")]
    out: PathBuf,

    /// Only encode and write the manifest; skip fork execution and invariants.
    #[arg(long)]
    encode_only: bool,

    /// Log diagnostics instead of printing them.
    #[arg(long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let fork = RpcChain::new(&cli.rpc_url)
        .with_context(|| format!("invalid RPC URL {}", cli.rpc_url))?;
    let chain_id = fork
        .chain_id()
        .await
        .with_context(|| format!("failed reading chain id from {}", cli.rpc_url))?;

    let mut deployments = DeploymentBook::new();
    for path in &cli.deployments {
        deployments.load(path)?;
    }

    let protocol = match cli.protocol {
        Some(address) => address,
        None => deployments
            .address_of(PROTOCOL_DEPLOYMENT, chain_id)
            .ok_or_else(|| {
                anyhow!("no {PROTOCOL_DEPLOYMENT} deployment on chain {chain_id}; pass --protocol")
            })?,
    };

    let mut registry = ControllerRegistry::from_deployments(&deployments, chain_id);
    if let Some(path) = &cli.controllers {
        registry.extend(ControllerRegistry::from_json_file(path, chain_id)?);
    }
    for signer in &cli.direct_signers {
        registry = registry.with(ControllerKind::DirectOwner, *signer);
    }

    let script = BatchScript::load(&cli.batch, &deployments, chain_id)?;
    info!(chain_id, %protocol, batch = %cli.batch.display(), "starting dry run");

    let mut config = DryRunConfig::new(protocol, registry);
    config.deployments = deployments;
    config.output = Some(cli.out.clone());
    config.encode_only = cli.encode_only;
    config.echo = !cli.quiet;

    let manifest = DryRunOrchestrator::new(&fork, config).run(&script).await?;

    println!(
        "Wrote {} transaction(s) for chain {} to {} (checksum {})",
        manifest.transactions.len(),
        manifest.chain_id,
        cli.out.display(),
        manifest.meta.checksum.as_deref().unwrap_or("-")
    );
    Ok(())
}
