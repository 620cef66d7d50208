#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use alloy_dyn_abi::DynSolValue;
    use alloy_json_abi::JsonAbi;
    use alloy_primitives::{address, Address, Bytes, U256};
    use alloy_sol_types::{sol, SolCall, SolValue};
    use async_trait::async_trait;

    use crate::{
        deployments::DeploymentBook,
        dry_run::{DryRunConfig, DryRunOrchestrator, GovernanceScript},
        encoder::GovernanceEncoder,
        errors::{DryRunError, GovernanceError, InvariantViolation},
        formatter::ArgumentFormatter,
        intent::ContractInterface,
        interfaces::{IChainlinkAggregator, IDelayedMultiSig, IERC20Metadata, IMarketRegistry, IOwnerAdapterV1, IProtocolOwnable},
        manifest::UploadManifest,
        mock::{MockChain, MockContract},
        resolver::{AddressNameResolver, UNKNOWN_MARKET},
        topology::{ControllerRegistry, OwnershipTopologyResolver},
        wrapper::{unwrap, wrap},
        ChainError, ChainReader, ControllerKind, EncodedTransaction, OwnershipTopology,
    };

    const CHAIN_ID: u64 = 42161;
    const MARGIN: Address = address!("6Bd780E7fDf01D77e4d475c821f1e7AE05409072");
    const OWNER: Address = address!("00000000000000000000000000000000000000a1");
    const MULTISIG: Address = address!("00000000000000000000000000000000000000a2");
    const ADAPTER_V1: Address = address!("00000000000000000000000000000000000000a3");
    const ADAPTER_V2: Address = address!("00000000000000000000000000000000000000a4");
    const SAFE: Address = address!("00000000000000000000000000000000000000a5");
    const OPERATOR: Address = address!("00000000000000000000000000000000000000b1");
    const USDC: Address = address!("af88d065e77c8cC2239327C5EDb3A432268e5831");
    const BAD_TOKEN: Address = address!("00000000000000000000000000000000000000d1");
    const FEED: Address = address!("00000000000000000000000000000000000000c1");

    const MARGIN_ABI: &str = r#"{ "abi": [
        { "type": "function", "name": "ownerSetGlobalOperator", "stateMutability": "nonpayable",
          "inputs": [ { "name": "operator", "type": "address" }, { "name": "approved", "type": "bool" } ],
          "outputs": [] },
        { "type": "function", "name": "getIsGlobalOperator", "stateMutability": "view",
          "inputs": [ { "name": "operator", "type": "address" } ],
          "outputs": [ { "name": "", "type": "bool" } ] },
        { "type": "function", "name": "ownerSetMaxSupplyWei", "stateMutability": "nonpayable",
          "inputs": [ { "name": "marketId", "type": "uint256" }, { "name": "maxSupplyWei", "type": "uint256" } ],
          "outputs": [] },
        { "type": "function", "name": "ownerSetTokenFeed", "stateMutability": "nonpayable",
          "inputs": [ { "name": "token", "type": "address" }, { "name": "chainlinkAggregator", "type": "address" } ],
          "outputs": [] },
        { "type": "function", "name": "ownerSetRiskParams", "stateMutability": "nonpayable",
          "inputs": [ { "name": "params", "type": "tuple[]", "components": [
              { "name": "token", "type": "address" },
              { "name": "limits", "type": "uint256[]" }
          ] } ],
          "outputs": [] },
        { "type": "function", "name": "setFee", "stateMutability": "nonpayable",
          "inputs": [ { "name": "fee", "type": "uint256" } ], "outputs": [] },
        { "type": "function", "name": "setFee", "stateMutability": "nonpayable",
          "inputs": [ { "name": "fee", "type": "uint128" } ], "outputs": [] }
    ] }"#;

    const DEPLOYMENTS: &str = r#"{
        "DolomiteMargin": { "42161": { "address": "0x6Bd780E7fDf01D77e4d475c821f1e7AE05409072" } },
        "DelayedMultiSig": { "42161": { "address": "0x00000000000000000000000000000000000000a2" } },
        "LiquidatorProxyV4": { "42161": { "address": "0x00000000000000000000000000000000000000b1" } }
    }"#;

    sol! {
        interface ITestMargin {
            function owner() external view returns (address);
            function getNumMarkets() external view returns (uint256);
            function getMarketTokenAddress(uint256 marketId) external view returns (address);
            function ownerSetGlobalOperator(address operator, bool approved) external;
            function getIsGlobalOperator(address operator) external view returns (bool);
        }
    }

    /// Protocol stand-in: owner-gated global operators and a market list.
    struct MockMargin {
        owner: Address,
        markets: Vec<Address>,
        operators: HashMap<Address, bool>,
        revert_with: Option<String>,
    }

    impl MockMargin {
        fn owned_by(owner: Address) -> Self {
            Self {
                owner,
                markets: vec![USDC],
                operators: HashMap::new(),
                revert_with: None,
            }
        }
    }

    impl MockContract for MockMargin {
        fn call(&self, data: &[u8]) -> Result<Bytes, ChainError> {
            let malformed = || ChainError::MalformedReturn { target: MARGIN };
            let selector = data.get(..4).ok_or_else(malformed)?;
            let out = if selector == ITestMargin::ownerCall::SELECTOR {
                self.owner.abi_encode()
            } else if selector == ITestMargin::getNumMarketsCall::SELECTOR {
                U256::from(self.markets.len()).abi_encode()
            } else if selector == ITestMargin::getMarketTokenAddressCall::SELECTOR {
                let call = ITestMargin::getMarketTokenAddressCall::abi_decode(data, true)
                    .map_err(|_| malformed())?;
                let index = usize::try_from(call.marketId).map_err(|_| malformed())?;
                self.markets.get(index).ok_or_else(malformed)?.abi_encode()
            } else if selector == ITestMargin::getIsGlobalOperatorCall::SELECTOR {
                let call = ITestMargin::getIsGlobalOperatorCall::abi_decode(data, true)
                    .map_err(|_| malformed())?;
                self.operators
                    .get(&call.operator)
                    .copied()
                    .unwrap_or(false)
                    .abi_encode()
            } else {
                return Err(ChainError::Reverted {
                    reason: "unknown selector".to_string(),
                });
            };
            Ok(out.into())
        }

        fn execute(&mut self, from: Address, _value: U256, data: &[u8]) -> Result<(), String> {
            if let Some(reason) = &self.revert_with {
                return Err(reason.clone());
            }
            let call = ITestMargin::ownerSetGlobalOperatorCall::abi_decode(data, true)
                .map_err(|_| "unsupported call".to_string())?;
            if from != self.owner {
                return Err("OnlyOwner: caller is not owner".to_string());
            }
            self.operators.insert(call.operator, call.approved);
            Ok(())
        }
    }

    fn margin() -> ContractInterface {
        ContractInterface::from_artifact("DolomiteMargin", MARGIN, MARGIN_ABI).unwrap()
    }

    fn book() -> DeploymentBook {
        let mut book = DeploymentBook::new();
        book.add_json(DEPLOYMENTS).unwrap();
        book
    }

    fn names() -> AddressNameResolver {
        AddressNameResolver::new(CHAIN_ID, MARGIN, book())
    }

    fn token_chain() -> MockChain {
        MockChain::new(CHAIN_ID)
            .with_call(USDC, IERC20Metadata::symbolCall {}, "USDC".to_string())
            .with_call(USDC, IERC20Metadata::decimalsCall {}, U256::from(6u8))
            .with_revert(BAD_TOKEN, IERC20Metadata::symbolCall {}, "no metadata")
            .with_call(FEED, IChainlinkAggregator::descriptionCall {}, "ETH / USD".to_string())
    }

    fn all_topologies() -> [OwnershipTopology; 5] {
        [
            OwnershipTopology::DirectOwner(OWNER),
            OwnershipTopology::DelayedMultiSig(MULTISIG),
            OwnershipTopology::OwnerAdapterV1(ADAPTER_V1),
            OwnershipTopology::OwnerAdapterV2(ADAPTER_V2),
            OwnershipTopology::GnosisSafe(SAFE),
        ]
    }

    fn set_operator_raw() -> EncodedTransaction {
        margin()
            .intent(
                "ownerSetGlobalOperator",
                vec![DynSolValue::Address(OPERATOR), DynSolValue::Bool(true)],
            )
            .unwrap()
            .encode()
            .unwrap()
    }

    // ---------------------------------------------------------------------------------------------
    // wrapping

    #[test]
    fn wrap_then_unwrap_recovers_inner_call_for_every_topology() {
        let raw = set_operator_raw();
        for topology in all_topologies() {
            let outer = wrap(raw.clone(), &topology).unwrap();
            if topology.wraps_calls() {
                assert_eq!(outer.to, topology.controller(), "{topology}");
                assert!(outer.value.is_zero());
            } else {
                assert_eq!(outer, raw, "{topology}");
            }
            assert_eq!(unwrap(&outer, &topology), raw, "{topology}");
        }
    }

    #[test]
    fn adapters_use_two_argument_submission() {
        let raw = set_operator_raw();

        let v1 = wrap(raw.clone(), &OwnershipTopology::OwnerAdapterV1(ADAPTER_V1)).unwrap();
        let decoded = IOwnerAdapterV1::submitTransactionCall::abi_decode(&v1.data, true).unwrap();
        assert_eq!(decoded.destination, MARGIN);
        assert_eq!(decoded.data, raw.data);

        let v2 = wrap(raw.clone(), &OwnershipTopology::OwnerAdapterV2(ADAPTER_V2)).unwrap();
        assert_eq!(v2.to, ADAPTER_V2);
        assert_eq!(v2.data, v1.data);
        assert_ne!(v2.to, v1.to);
    }

    #[test]
    fn calls_to_the_controller_itself_are_not_wrapped() {
        let reconfigure = EncodedTransaction::new(MULTISIG, vec![0xba, 0x51, 0xa6, 0xdf, 0, 0, 0, 1]);
        let topology = OwnershipTopology::DelayedMultiSig(MULTISIG);

        let outer = wrap(reconfigure.clone(), &topology).unwrap();
        assert_eq!(outer, reconfigure);
        assert_eq!(unwrap(&outer, &topology), reconfigure);
    }

    #[test]
    fn adapters_refuse_native_value() {
        let raw = set_operator_raw().with_value(U256::from(1u64));

        let err = wrap(raw.clone(), &OwnershipTopology::OwnerAdapterV2(ADAPTER_V2)).unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::ValueNotForwardable { controller, .. } if controller == ADAPTER_V2
        ));

        // the multisig forwards value inside the submission
        let outer = wrap(raw.clone(), &OwnershipTopology::DelayedMultiSig(MULTISIG)).unwrap();
        let decoded = IDelayedMultiSig::submitTransactionCall::abi_decode(&outer.data, true).unwrap();
        assert_eq!(decoded.value, U256::from(1u64));
        assert!(outer.value.is_zero());
    }

    // ---------------------------------------------------------------------------------------------
    // topology resolution

    #[tokio::test]
    async fn resolves_once_and_serves_from_cache() {
        let chain = MockChain::new(CHAIN_ID).with_call(MARGIN, IProtocolOwnable::ownerCall {}, MULTISIG);
        let registry = ControllerRegistry::default().with(ControllerKind::DelayedMultiSig, MULTISIG);
        let mut resolver = OwnershipTopologyResolver::new(registry);

        let first = resolver.resolve(&chain, MARGIN).await.unwrap();
        let second = resolver.resolve(&chain, MARGIN).await.unwrap();

        assert_eq!(first, OwnershipTopology::DelayedMultiSig(MULTISIG));
        assert_eq!(first, second);
        assert_eq!(chain.query_count(), 1);
    }

    #[tokio::test]
    async fn adapter_v1_takes_precedence() {
        let chain = MockChain::new(CHAIN_ID).with_call(MARGIN, IProtocolOwnable::ownerCall {}, ADAPTER_V1);
        let registry = ControllerRegistry::default()
            .with(ControllerKind::GnosisSafe, ADAPTER_V1)
            .with(ControllerKind::DelayedMultiSig, ADAPTER_V1)
            .with(ControllerKind::OwnerAdapterV1, ADAPTER_V1);

        let topology = OwnershipTopologyResolver::new(registry)
            .resolve(&chain, MARGIN)
            .await
            .unwrap();
        assert_eq!(topology, OwnershipTopology::OwnerAdapterV1(ADAPTER_V1));
    }

    #[tokio::test]
    async fn unknown_owner_is_fatal() {
        let chain = MockChain::new(CHAIN_ID).with_call(MARGIN, IProtocolOwnable::ownerCall {}, OPERATOR);
        let registry = ControllerRegistry::default()
            .with(ControllerKind::DirectOwner, OWNER)
            .with(ControllerKind::DelayedMultiSig, MULTISIG);

        let err = OwnershipTopologyResolver::new(registry)
            .resolve(&chain, MARGIN)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::UnknownOwner { owner } if owner == OPERATOR));
    }

    #[test]
    fn registry_from_deployments_uses_canonical_names() {
        let registry = ControllerRegistry::from_deployments(&book(), CHAIN_ID);
        assert_eq!(registry.delayed_multi_sig, vec![MULTISIG]);
        assert!(registry.owner_adapter_v1.is_empty());
        assert_eq!(registry.classify(MULTISIG), Some(ControllerKind::DelayedMultiSig));
        assert_eq!(registry.classify(OWNER), None);
    }

    // ---------------------------------------------------------------------------------------------
    // name resolution and formatting

    #[tokio::test]
    async fn markets_past_the_count_are_unknown_without_a_query() {
        let chain = MockChain::new(CHAIN_ID)
            .with_call(MARGIN, IMarketRegistry::getNumMarketsCall {}, U256::from(1u64))
            .with_call(
                MARGIN,
                IMarketRegistry::getMarketTokenAddressCall { marketId: U256::ZERO },
                USDC,
            )
            .with_call(USDC, IERC20Metadata::symbolCall {}, "USDC".to_string())
            .with_call(USDC, IERC20Metadata::decimalsCall {}, U256::from(6u8));
        let mut names = names();

        assert_eq!(names.resolve_market(&chain, U256::ZERO).await, "(USDC)");
        let queries = chain.query_count();

        assert_eq!(names.resolve_market(&chain, U256::from(7u64)).await, UNKNOWN_MARKET);
        assert_eq!(names.resolve_market(&chain, U256::ZERO).await, "(USDC)");
        assert_eq!(chain.query_count(), queries);
        assert_eq!(names.cache().decimals(USDC), Some(6));
    }

    #[tokio::test]
    async fn token_without_metadata_degrades_to_an_unlabeled_value() {
        let chain = token_chain();
        let mut names = names();
        let intent = margin()
            .intent(
                "ownerSetTokenFeed",
                vec![DynSolValue::Address(BAD_TOKEN), DynSolValue::Address(FEED)],
            )
            .unwrap();

        let rendered = ArgumentFormatter::new(&chain, &mut names).format_call(&intent).await;
        assert_eq!(
            rendered,
            format!(
                "ownerSetTokenFeed(\n\taddress token = {},\n\taddress chainlinkAggregator = {} (ETH / USD)\n)",
                BAD_TOKEN.to_checksum(None),
                FEED.to_checksum(None)
            )
        );
        assert_eq!(names.cache().token_label(BAD_TOKEN), Some(""));
    }

    #[tokio::test]
    async fn feed_seen_as_plain_address_still_gets_its_description() {
        let chain = token_chain();
        let mut names = names();

        assert_eq!(names.resolve_generic(&chain, FEED).await, "");
        assert_eq!(names.resolve_aggregator(&chain, FEED).await, "(ETH / USD)");
        assert_eq!(names.cache().token_label(FEED), Some(""));
        assert_eq!(names.cache().feed_label(FEED), Some("(ETH / USD)"));
    }

    #[tokio::test]
    async fn feed_description_is_not_reused_as_a_token_symbol() {
        let chain = token_chain();
        let mut names = names();

        assert_eq!(names.resolve_aggregator(&chain, FEED).await, "(ETH / USD)");
        assert_eq!(names.resolve_token(&chain, FEED).await, "");

        let queries = chain.query_count();
        assert_eq!(names.resolve_aggregator(&chain, FEED).await, "(ETH / USD)");
        assert_eq!(names.resolve_token(&chain, FEED).await, "");
        assert_eq!(chain.query_count(), queries);
    }

    #[tokio::test]
    async fn max_wei_is_scaled_by_the_market_token_decimals() {
        let chain = token_chain().with_contract(MARGIN, MockMargin::owned_by(OWNER));
        let mut names = names();
        let intent = margin()
            .intent(
                "ownerSetMaxSupplyWei",
                vec![
                    DynSolValue::Uint(U256::ZERO, 256),
                    DynSolValue::Uint(U256::from(1_000_000u64), 256),
                ],
            )
            .unwrap();

        let rendered = ArgumentFormatter::new(&chain, &mut names).format_call(&intent).await;
        assert_eq!(
            rendered,
            "ownerSetMaxSupplyWei(\n\tuint256 marketId = 0 (USDC),\n\tuint256 maxSupplyWei = 1000000 (1)\n)"
        );
    }

    #[tokio::test]
    async fn decimals_do_not_leak_between_calls() {
        let chain = token_chain().with_contract(MARGIN, MockMargin::owned_by(OWNER));
        let mut names = names();
        let margin = margin();

        let with_market = margin
            .intent(
                "ownerSetMaxSupplyWei",
                vec![DynSolValue::Uint(U256::ZERO, 256), DynSolValue::Uint(U256::from(5u64), 256)],
            )
            .unwrap();
        let unknown_market = margin
            .intent(
                "ownerSetMaxSupplyWei",
                vec![DynSolValue::Uint(U256::from(9u64), 256), DynSolValue::Uint(U256::from(5u64), 256)],
            )
            .unwrap();

        let mut formatter = ArgumentFormatter::new(&chain, &mut names);
        assert!(formatter.format_call(&with_market).await.contains("maxSupplyWei = 5 (0.000005)"));
        assert!(formatter
            .format_call(&unknown_market)
            .await
            .ends_with("uint256 maxSupplyWei = 5\n)"));
    }

    #[tokio::test]
    async fn nested_tuple_arrays_are_indented_per_level() {
        let chain = token_chain();
        let mut names = names();
        let intent = margin()
            .intent(
                "ownerSetRiskParams",
                vec![DynSolValue::Array(vec![DynSolValue::Tuple(vec![
                    DynSolValue::Address(USDC),
                    DynSolValue::Array(vec![
                        DynSolValue::Uint(U256::from(1u64), 256),
                        DynSolValue::Uint(U256::from(2u64), 256),
                    ]),
                ])])],
            )
            .unwrap();

        let rendered = ArgumentFormatter::new(&chain, &mut names).format_call(&intent).await;
        let expected = format!(
            "ownerSetRiskParams(\n\
             \ttuple[] params = [\n\
             \t\ttuple params[0] = {{\n\
             \t\t\taddress token = {usdc} (USDC),\n\
             \t\t\tuint256[] limits = [\n\
             \t\t\t\tuint256 limits[0] = 1,\n\
             \t\t\t\tuint256 limits[1] = 2\n\
             \t\t\t]\n\
             \t\t}}\n\
             \t]\n\
             )",
            usdc = USDC.to_checksum(None)
        );
        assert_eq!(rendered, expected);
    }

    #[tokio::test]
    async fn plain_addresses_get_deployment_labels() {
        let chain = token_chain();
        let mut names = names();
        let intent = margin()
            .intent(
                "ownerSetGlobalOperator",
                vec![DynSolValue::Address(OPERATOR), DynSolValue::Bool(false)],
            )
            .unwrap();

        let rendered = ArgumentFormatter::new(&chain, &mut names).format_call(&intent).await;
        assert_eq!(
            rendered,
            format!(
                "ownerSetGlobalOperator(\n\taddress operator = {} (LiquidatorProxyV4),\n\tbool approved = false\n)",
                OPERATOR.to_checksum(None)
            )
        );
    }

    #[tokio::test]
    async fn formatting_does_not_change_the_payload() {
        let chain = MockChain::new(CHAIN_ID)
            .with_contract(MARGIN, MockMargin::owned_by(OWNER))
            .with_revert(OPERATOR, IERC20Metadata::symbolCall {}, "boom");
        let registry = ControllerRegistry::default().with(ControllerKind::DirectOwner, OWNER);
        let mut encoder = GovernanceEncoder::new(&chain, MARGIN, registry, names()).with_echo(false);

        let intent = margin()
            .intent(
                "ownerSetGlobalOperator",
                vec![DynSolValue::Address(OPERATOR), DynSolValue::Bool(true)],
            )
            .unwrap();
        let tx = encoder.encode(&intent).await.unwrap();
        assert_eq!(tx, set_operator_raw());
    }

    // ---------------------------------------------------------------------------------------------
    // intents

    #[test]
    fn methods_are_selected_by_arity_or_signature() {
        let margin = margin();

        let err = margin.function("setFee", 1).unwrap_err();
        assert!(matches!(err, GovernanceError::AmbiguousMethod { .. }));
        assert_eq!(
            margin.function("setFee(uint128)", 1).unwrap().signature(),
            "setFee(uint128)"
        );
        assert!(matches!(
            margin.function("ownerSetGlobalOperator", 1),
            Err(GovernanceError::UnknownMethod { arity: 1, .. })
        ));
    }

    #[test]
    fn textual_arguments_are_coerced_to_declared_types() {
        let operator = OPERATOR.to_checksum(None);
        let intent = margin()
            .intent_from_strs("ownerSetGlobalOperator", &[operator.as_str(), "true"])
            .unwrap();
        assert_eq!(intent.encode().unwrap(), set_operator_raw());

        let nested = margin()
            .intent_from_strs("ownerSetRiskParams", &[format!("[({},[1,2])]", USDC)])
            .unwrap();
        assert_eq!(nested.args.len(), 1);
        assert!(nested.encode().is_ok());
    }

    #[test]
    fn bare_abi_arrays_are_accepted() {
        let abi: JsonAbi = serde_json::from_str(
            r#"[{ "type": "function", "name": "owner", "stateMutability": "view", "inputs": [], "outputs": [{ "name": "", "type": "address" }] }]"#,
        )
        .unwrap();
        let from_json = ContractInterface::from_artifact(
            "Ownable",
            MARGIN,
            r#"[{ "type": "function", "name": "owner", "stateMutability": "view", "inputs": [], "outputs": [{ "name": "", "type": "address" }] }]"#,
        )
        .unwrap();
        assert_eq!(from_json.abi, abi);
        let tx = from_json.intent("owner", vec![]).unwrap().encode().unwrap();
        assert_eq!(tx.data.as_ref(), IProtocolOwnable::ownerCall::SELECTOR.as_slice());
    }

    // ---------------------------------------------------------------------------------------------
    // dry runs

    struct SetGlobalOperator {
        margin: ContractInterface,
        operator: Address,
        expect_operator: Address,
    }

    impl SetGlobalOperator {
        fn new() -> Self {
            Self {
                margin: margin(),
                operator: OPERATOR,
                expect_operator: OPERATOR,
            }
        }
    }

    #[async_trait(?Send)]
    impl GovernanceScript for SetGlobalOperator {
        fn name(&self) -> String {
            "Set global operator".to_string()
        }

        async fn transactions(
            &self,
            encoder: &mut GovernanceEncoder<'_>,
        ) -> Result<Vec<EncodedTransaction>, GovernanceError> {
            let intent = self.margin.intent(
                "ownerSetGlobalOperator",
                vec![DynSolValue::Address(self.operator), DynSolValue::Bool(true)],
            )?;
            Ok(vec![encoder.encode(&intent).await?])
        }

        async fn invariants(&self, chain: &dyn ChainReader) -> Result<(), InvariantViolation> {
            let query = ITestMargin::getIsGlobalOperatorCall {
                operator: self.expect_operator,
            };
            let out = chain.call(self.margin.address, query.abi_encode().into()).await?;
            let is_operator = ITestMargin::getIsGlobalOperatorCall::abi_decode_returns(&out, true)
                .map_err(|e| InvariantViolation::new(e.to_string()))?
                ._0;
            if !is_operator {
                return Err(InvariantViolation::new(format!(
                    "{} is not a global operator",
                    self.expect_operator
                )));
            }
            Ok(())
        }
    }

    fn config(registry: ControllerRegistry, output: &std::path::Path) -> DryRunConfig {
        let mut config = DryRunConfig::new(MARGIN, registry);
        config.deployments = book();
        config.output = Some(output.to_path_buf());
        config.echo = false;
        config
    }

    #[tokio::test]
    async fn direct_owner_batch_produces_a_single_raw_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("upload.json");
        let chain = token_chain().with_contract(MARGIN, MockMargin::owned_by(OWNER));
        let registry = ControllerRegistry::default().with(ControllerKind::DirectOwner, OWNER);

        let manifest = DryRunOrchestrator::new(&chain, config(registry, &out))
            .run(&SetGlobalOperator::new())
            .await
            .unwrap();

        let raw = set_operator_raw();
        assert_eq!(manifest.chain_id, "42161");
        assert_eq!(manifest.meta.name, "Set global operator");
        assert_eq!(manifest.transactions.len(), 1);
        assert_eq!(manifest.transactions[0].to, MARGIN.to_checksum(None));
        assert_eq!(manifest.transactions[0].value, "0");
        assert_eq!(manifest.transactions[0].data, format!("0x{}", hex::encode(&raw.data)));
        assert_eq!(chain.sent(), vec![(OWNER, raw)]);

        let written: UploadManifest =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written, manifest);
        assert_eq!(written.meta.checksum, Some(manifest.compute_checksum().unwrap()));
    }

    #[tokio::test]
    async fn multisig_batch_submits_the_direct_payload() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("upload.json");
        let chain = token_chain().with_contract(MARGIN, MockMargin::owned_by(MULTISIG));
        let registry = ControllerRegistry::from_deployments(&book(), CHAIN_ID);

        let manifest = DryRunOrchestrator::new(&chain, config(registry, &out))
            .run(&SetGlobalOperator::new())
            .await
            .unwrap();

        let raw = set_operator_raw();
        assert_eq!(manifest.transactions.len(), 1);
        assert_eq!(manifest.transactions[0].to, MULTISIG.to_checksum(None));

        let data = hex::decode(manifest.transactions[0].data.trim_start_matches("0x")).unwrap();
        let submitted = IDelayedMultiSig::submitTransactionCall::abi_decode(&data, true).unwrap();
        assert_eq!(submitted.destination, MARGIN);
        assert_eq!(submitted.value, U256::ZERO);
        assert_eq!(submitted.data, raw.data);

        // the fork executes what the multisig will eventually perform
        assert_eq!(chain.sent(), vec![(MULTISIG, raw)]);
    }

    #[tokio::test]
    async fn revert_aborts_the_batch_with_its_reason() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("upload.json");
        let mut margin_state = MockMargin::owned_by(OWNER);
        margin_state.revert_with = Some("Paused: protocol is paused".to_string());
        let chain = token_chain().with_contract(MARGIN, margin_state);
        let registry = ControllerRegistry::default().with(ControllerKind::DirectOwner, OWNER);

        let err = DryRunOrchestrator::new(&chain, config(registry, &out))
            .run(&SetGlobalOperator::new())
            .await
            .unwrap_err();

        match err {
            DryRunError::Execution { index, to, reason } => {
                assert_eq!(index, 0);
                assert_eq!(to, MARGIN);
                assert_eq!(reason, "Paused: protocol is paused");
            }
            other => panic!("expected execution failure, got {other}"),
        }
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn failed_invariant_is_reported_separately() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("upload.json");
        let chain = token_chain().with_contract(MARGIN, MockMargin::owned_by(OWNER));
        let registry = ControllerRegistry::default().with(ControllerKind::DirectOwner, OWNER);
        let mut script = SetGlobalOperator::new();
        script.expect_operator = BAD_TOKEN;

        let err = DryRunOrchestrator::new(&chain, config(registry, &out))
            .run(&script)
            .await
            .unwrap_err();

        assert!(matches!(err, DryRunError::Invariant(_)), "{err}");
        assert_eq!(chain.sent().len(), 1);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn unknown_owner_aborts_before_execution() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("upload.json");
        let chain = token_chain().with_contract(MARGIN, MockMargin::owned_by(SAFE));
        let registry = ControllerRegistry::default().with(ControllerKind::DirectOwner, OWNER);

        let err = DryRunOrchestrator::new(&chain, config(registry, &out))
            .run(&SetGlobalOperator::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DryRunError::Encoding(GovernanceError::UnknownOwner { owner }) if owner == SAFE
        ));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn encode_only_skips_the_fork() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("upload.json");
        let chain = token_chain().with_contract(MARGIN, MockMargin::owned_by(SAFE));
        let registry = ControllerRegistry::default().with(ControllerKind::GnosisSafe, SAFE);
        let mut config = config(registry, &out);
        config.encode_only = true;

        let manifest = DryRunOrchestrator::new(&chain, config)
            .run(&SetGlobalOperator::new())
            .await
            .unwrap();

        assert_eq!(manifest.transactions[0].to, MARGIN.to_checksum(None));
        assert!(chain.sent().is_empty());
        assert!(out.exists());
    }

    // ---------------------------------------------------------------------------------------------
    // manifest

    #[test]
    fn checksum_ignores_the_batch_name() {
        let txs = vec![set_operator_raw()];
        let a = UploadManifest::new(CHAIN_ID, "first", &txs).with_created_at(1_700_000_000_000);
        let b = UploadManifest::new(CHAIN_ID, "second", &txs).with_created_at(1_700_000_000_000);
        assert_eq!(a.compute_checksum().unwrap(), b.compute_checksum().unwrap());

        let other = UploadManifest::new(CHAIN_ID, "first", &[set_operator_raw().with_value(U256::from(1u64))])
            .with_created_at(1_700_000_000_000);
        assert_ne!(a.compute_checksum().unwrap(), other.compute_checksum().unwrap());

        let sealed = a.clone().sealed().unwrap();
        assert_eq!(sealed.compute_checksum().unwrap(), a.compute_checksum().unwrap());
    }

    #[test]
    fn manifest_json_shape() {
        let manifest = UploadManifest::new(CHAIN_ID, "batch", &[set_operator_raw()])
            .with_created_at(1)
            .sealed()
            .unwrap();
        let value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(value["version"], "1.0");
        assert_eq!(value["chainId"], "42161");
        assert_eq!(value["createdAt"], 1);
        assert_eq!(value["meta"]["name"], "batch");
        assert_eq!(value["meta"]["txBuilderVersion"], "1.16.5");
        assert!(value["meta"]["checksum"].as_str().unwrap().starts_with("0x"));
        assert_eq!(value["transactions"][0]["value"], "0");
    }
}
