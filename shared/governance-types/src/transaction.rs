use alloy_primitives::{Address, Bytes, U256};

/// A final, submittable call: what a signer (or a signing UI) executes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EncodedTransaction {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl EncodedTransaction {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: data.into(),
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}
