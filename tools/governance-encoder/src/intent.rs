use alloy_dyn_abi::{DynSolValue, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{Address, U256};
use governance_types::EncodedTransaction;

use crate::errors::GovernanceError;

/// A deployed contract together with the ABI used to build calls against it.
#[derive(Clone, Debug)]
pub struct ContractInterface {
    pub name: String,
    pub address: Address,
    pub abi: JsonAbi,
}

impl ContractInterface {
    pub fn new(name: impl Into<String>, address: Address, abi: JsonAbi) -> Self {
        Self {
            name: name.into(),
            address,
            abi,
        }
    }

    /// Build from a compiler artifact (`{ "abi": [...] }`) or a bare ABI array.
    pub fn from_artifact(
        name: impl Into<String>,
        address: Address,
        raw: &str,
    ) -> Result<Self, GovernanceError> {
        let name = name.into();
        let mut value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| GovernanceError::abi(&name, e))?;
        if let Some(abi) = value.get_mut("abi") {
            value = abi.take();
        }
        let abi: JsonAbi = serde_json::from_value(value).map_err(|e| GovernanceError::abi(&name, e))?;
        Ok(Self::new(name, address, abi))
    }

    /// Look up `method` by name and arity, or by full signature (`ownerSetMaxWei(uint256,uint256)`).
    pub fn function(&self, method: &str, arity: usize) -> Result<&Function, GovernanceError> {
        let unknown = || GovernanceError::UnknownMethod {
            contract: self.name.clone(),
            method: method.to_string(),
            arity,
        };

        if method.contains('(') {
            return self
                .abi
                .functions()
                .find(|f| f.signature() == method)
                .ok_or_else(unknown);
        }

        let overloads = self.abi.function(method).ok_or_else(unknown)?;
        let mut candidates = overloads.iter().filter(|f| f.inputs.len() == arity);
        let found = candidates.next().ok_or_else(unknown)?;
        if candidates.next().is_some() {
            return Err(GovernanceError::AmbiguousMethod {
                contract: self.name.clone(),
                method: method.to_string(),
                arity,
            });
        }
        Ok(found)
    }

    pub fn intent(
        &self,
        method: &str,
        args: Vec<DynSolValue>,
    ) -> Result<CallIntent, GovernanceError> {
        let function = self.function(method, args.len())?.clone();
        Ok(CallIntent {
            contract: self.name.clone(),
            target: self.address,
            function,
            args,
            value: U256::ZERO,
        })
    }

    /// Like [`ContractInterface::intent`], with arguments given in their textual form
    /// (`"true"`, `"(1,0xabc..)"`, `"[1,2,3]"`) and coerced to the declared parameter types.
    pub fn intent_from_strs<S: AsRef<str>>(
        &self,
        method: &str,
        args: &[S],
    ) -> Result<CallIntent, GovernanceError> {
        let function = self.function(method, args.len())?;
        let values = coerce_args(&function.inputs, args, &self.name, method)?;
        self.intent(&function.signature(), values)
    }
}

pub(crate) fn coerce_args<S: AsRef<str>>(
    params: &[alloy_json_abi::Param],
    args: &[S],
    contract: &str,
    method: &str,
) -> Result<Vec<DynSolValue>, GovernanceError> {
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let context = format!("{contract}.{method} argument `{}`", param.name);
            let ty = param
                .resolve()
                .map_err(|e| GovernanceError::abi(&context, e))?;
            ty.coerce_str(arg.as_ref())
                .map_err(|e| GovernanceError::abi(&context, e))
        })
        .collect()
}

/// "Call `function` on `contract` with `args`". Immutable once built.
#[derive(Clone, Debug)]
pub struct CallIntent {
    pub contract: String,
    pub target: Address,
    pub function: Function,
    pub args: Vec<DynSolValue>,
    pub value: U256,
}

impl CallIntent {
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn signature(&self) -> String {
        self.function.signature()
    }

    /// ABI-encode into the raw (unwrapped) transaction.
    pub fn encode(&self) -> Result<EncodedTransaction, GovernanceError> {
        let data = self
            .function
            .abi_encode_input(&self.args)
            .map_err(|e| GovernanceError::abi(format!("{}.{}", self.contract, self.signature()), e))?;
        Ok(EncodedTransaction::new(self.target, data).with_value(self.value))
    }
}
