use alloy_primitives::Address;
use governance_types::{ChainReader, EncodedTransaction, OwnershipTopology};
use tracing::info;

use crate::{
    errors::GovernanceError,
    formatter::ArgumentFormatter,
    intent::CallIntent,
    resolver::AddressNameResolver,
    topology::{ControllerRegistry, OwnershipTopologyResolver},
    wrapper::wrap,
};

const RULE_WIDTH: usize = 35;

/// Per-run encoding session: turns intents into owner-wrapped transactions and prints the
/// diagnostics reviewers check before signing.
///
/// Owns the run's [`AddressNameResolver`] cache and the cached ownership topology.
pub struct GovernanceEncoder<'a> {
    chain: &'a dyn ChainReader,
    protocol: Address,
    topology: OwnershipTopologyResolver,
    names: AddressNameResolver,
    encoded: usize,
    echo: bool,
}

impl<'a> GovernanceEncoder<'a> {
    pub fn new(
        chain: &'a dyn ChainReader,
        protocol: Address,
        registry: ControllerRegistry,
        names: AddressNameResolver,
    ) -> Self {
        Self {
            chain,
            protocol,
            topology: OwnershipTopologyResolver::new(registry),
            names,
            encoded: 0,
            echo: true,
        }
    }

    /// Print diagnostics to stdout (default) or only log them.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn chain(&self) -> &'a dyn ChainReader {
        self.chain
    }

    pub fn protocol(&self) -> Address {
        self.protocol
    }

    pub fn names(&mut self) -> &mut AddressNameResolver {
        &mut self.names
    }

    pub async fn topology(&mut self) -> Result<OwnershipTopology, GovernanceError> {
        self.topology.resolve(self.chain, self.protocol).await
    }

    /// Encode `intent`, wrap it for the live controller and print its diagnostics.
    pub async fn encode(&mut self, intent: &CallIntent) -> Result<EncodedTransaction, GovernanceError> {
        let raw = intent.encode()?;
        let topology = self.topology().await?;
        let outer = wrap(raw.clone(), &topology)?;

        self.encoded += 1;
        let report = self.describe(intent, &raw, &outer, &topology).await;
        if self.echo {
            println!("{report}");
        }
        info!(
            index = self.encoded,
            contract = %intent.contract,
            method = %intent.function.name,
            to = %outer.to,
            wrapped = outer != raw,
            "encoded governance transaction"
        );
        Ok(outer)
    }

    /// Encode several intents in order.
    pub async fn encode_all(
        &mut self,
        intents: &[CallIntent],
    ) -> Result<Vec<EncodedTransaction>, GovernanceError> {
        let mut out = Vec::with_capacity(intents.len());
        for intent in intents {
            out.push(self.encode(intent).await?);
        }
        Ok(out)
    }

    async fn describe(
        &mut self,
        intent: &CallIntent,
        raw: &EncodedTransaction,
        outer: &EncodedTransaction,
        topology: &OwnershipTopology,
    ) -> String {
        let readable = ArgumentFormatter::new(self.chain, &mut self.names)
            .format_call(intent)
            .await;
        let target_label = self.names.resolve_generic(self.chain, raw.to).await;

        let rule = "=".repeat(RULE_WIDTH);
        let mut lines = vec![
            format!(
                "{rule} {} - {}.{} {rule}",
                self.encoded, intent.contract, intent.function.name
            ),
            format!("Signature:\t{}", intent.signature()),
            format!("Readable:\t{readable}"),
            format!("Target:\t{} {target_label}", raw.to),
        ];
        if !raw.value.is_zero() {
            lines.push(format!("Value:\t{}", raw.value));
        }
        if outer != raw {
            let controller_label = self.names.resolve_generic(self.chain, outer.to).await;
            lines.push(format!(
                "To:\t{} {controller_label} (submitted via {:?})",
                outer.to,
                topology.kind()
            ));
        } else if matches!(topology, OwnershipTopology::GnosisSafe(_)) {
            lines.push("Note:\timport into the Safe transaction builder; no submission call".into());
        }
        lines.push(format!("Calldata:\t0x{}", hex::encode(&raw.data)));
        if outer != raw {
            lines.push(format!("Data:\t0x{}", hex::encode(&outer.data)));
        }
        lines.push("=".repeat(RULE_WIDTH * 2 + 2));
        lines
            .into_iter()
            .map(|l| l.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
