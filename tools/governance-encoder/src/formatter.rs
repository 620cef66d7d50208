//! Recursive, semantically annotated rendering of ABI-typed call arguments.
//!
//! Output is diagnostic only. It never feeds back into the encoded calldata, and resolution
//! failures degrade to an unlabeled raw value.

use std::{future::Future, pin::Pin};

use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::Param;
use alloy_primitives::U256;
use governance_types::ChainReader;

use crate::{
    classifier::{classify, SemanticKind},
    intent::CallIntent,
    resolver::AddressNameResolver,
};

pub struct ArgumentFormatter<'a> {
    chain: &'a dyn ChainReader,
    names: &'a mut AddressNameResolver,
}

impl<'a> ArgumentFormatter<'a> {
    pub fn new(chain: &'a dyn ChainReader, names: &'a mut AddressNameResolver) -> Self {
        Self { chain, names }
    }

    /// Render a whole call as `method(\n\t<arg>,\n\t<arg>\n)`.
    ///
    /// The decimals tracker is reset first so a max-wei argument can only be scaled by a token
    /// resolved earlier in the same call.
    pub async fn format_call(&mut self, intent: &CallIntent) -> String {
        self.names.reset_decimals();
        let mut rendered = Vec::with_capacity(intent.args.len());
        for (param, value) in intent.function.inputs.iter().zip(&intent.args) {
            rendered.push(self.format(param, value, 1).await);
        }
        if rendered.is_empty() {
            return format!("{}()", intent.function.name);
        }
        format!("{}(\n\t{}\n)", intent.function.name, rendered.join(",\n\t"))
    }

    pub async fn format(&mut self, param: &Param, value: &DynSolValue, level: usize) -> String {
        self.format_indexed(param, value, level, None).await
    }

    fn format_indexed<'b>(
        &'b mut self,
        param: &'b Param,
        value: &'b DynSolValue,
        level: usize,
        index: Option<usize>,
    ) -> Pin<Box<dyn Future<Output = String> + 'b>> {
        Box::pin(async move {
            let header = header(param, index);
            let tabs = "\t".repeat(level);

            if let DynSolValue::Array(items) | DynSolValue::FixedArray(items) = value {
                if items.is_empty() {
                    return format!("{header} = []");
                }
                let element = element_param(param);
                let mut rendered = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    rendered.push(self.format_indexed(&element, item, level + 1, Some(i)).await);
                }
                return format!(
                    "{header} = [\n{tabs}\t{}\n{tabs}]",
                    rendered.join(&format!(",\n{tabs}\t"))
                );
            }

            if let Some(label) = self.semantic_label(param, value).await {
                return annotate(&header, &raw_value(value), &label);
            }

            if let DynSolValue::Tuple(fields) = value {
                let mut rendered = Vec::with_capacity(fields.len());
                for (i, field) in fields.iter().enumerate() {
                    let rendered_field = match param.components.get(i) {
                        Some(component) => self.format_indexed(component, field, level + 1, None).await,
                        None => raw_value(field),
                    };
                    rendered.push(rendered_field);
                }
                return format!(
                    "{header} = {{\n{tabs}\t{}\n{tabs}}}",
                    rendered.join(&format!(",\n{tabs}\t"))
                );
            }

            let label = match value {
                DynSolValue::Address(address) => {
                    self.names.resolve_generic(self.chain, *address).await
                }
                _ => String::new(),
            };
            annotate(&header, &raw_value(value), &label)
        })
    }

    /// Label from the name-based rule, if one applies to this kind of value.
    async fn semantic_label(&mut self, param: &Param, value: &DynSolValue) -> Option<String> {
        match (classify(param), value) {
            (SemanticKind::MarketId, DynSolValue::Uint(id, _)) => {
                Some(self.names.resolve_market(self.chain, *id).await)
            }
            (SemanticKind::Token, DynSolValue::Address(token)) => {
                Some(self.names.resolve_token(self.chain, *token).await)
            }
            (SemanticKind::PriceFeed, DynSolValue::Address(feed)) => {
                Some(self.names.resolve_aggregator(self.chain, *feed).await)
            }
            (SemanticKind::MaxWeiAmount, DynSolValue::Uint(amount, _)) => Some(
                self.names
                    .last_decimals()
                    .map(|decimals| format!("({})", format_units(*amount, decimals)))
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }
}

fn header(param: &Param, index: Option<usize>) -> String {
    let mut out = param.ty.clone();
    if !param.name.is_empty() {
        out.push(' ');
        out.push_str(&param.name);
    }
    if let Some(i) = index {
        out.push_str(&format!("[{i}]"));
    }
    out
}

fn annotate(header: &str, raw: &str, label: &str) -> String {
    if label.is_empty() {
        format!("{header} = {raw}")
    } else {
        format!("{header} = {raw} {label}")
    }
}

/// Descriptor of one element of an array parameter; keeps the parent's name.
pub fn element_param(param: &Param) -> Param {
    let ty = match param.ty.rfind('[') {
        Some(i) if param.ty.ends_with(']') => param.ty[..i].to_string(),
        _ => param.ty.clone(),
    };
    Param {
        ty,
        name: param.name.clone(),
        components: param.components.clone(),
        internal_type: None,
    }
}

pub fn raw_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(address) => address.to_checksum(None),
        DynSolValue::Uint(v, _) => v.to_string(),
        DynSolValue::Int(v, _) => v.to_string(),
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::String(s) => format!("{s:?}"),
        DynSolValue::Function(f) => format!("0x{}", hex::encode(f.as_slice())),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            let inner: Vec<String> = items.iter().map(raw_value).collect();
            format!("[{}]", inner.join(", "))
        }
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}

/// `amount / 10^decimals` as a decimal string without trailing zeros.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let Some(base) = U256::from(10u64).checked_pow(U256::from(decimals)) else {
        return amount.to_string();
    };
    let whole = amount / base;
    let frac = amount % base;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
