use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Specifier},
    json_abi::Function,
    primitives::{Address, Bytes},
    rpc::types::TransactionRequest,
};
use std::io::Write;
use std::time::Duration;

use super::{
    abi::Interface,
    args::TypedArg,
    provider::{bounded, ContractBackend},
    utils, Mode, Outcome,
};
use crate::error::{InvokeError, InvokeResult};
use crate::report::Reporter;

/// A contract address bound to its interface and a backend.
pub struct ContractHandle<'a> {
    address: Address,
    interface: &'a Interface,
    backend: &'a dyn ContractBackend,
    timeout: Option<Duration>,
    confirmation_timeout: Option<Duration>,
}

impl<'a> ContractHandle<'a> {
    pub fn new(
        address: Address,
        interface: &'a Interface,
        backend: &'a dyn ContractBackend,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            address,
            interface,
            backend,
            timeout,
            confirmation_timeout: None,
        }
    }

    /// Limit the wait for a receipt. Without one it waits until mined.
    pub fn with_confirmation_timeout(mut self, limit: Option<Duration>) -> Self {
        self.confirmation_timeout = limit;
        self
    }

    /// Invoke `method` with already-coerced `args` and report as it goes.
    pub async fn execute<O: Write, E: Write>(
        &self,
        method: &str,
        args: &[TypedArg],
        mode: Mode,
        reporter: &mut Reporter<O, E>,
    ) -> InvokeResult<Outcome> {
        let function = self.select_function(method, args.len())?;
        let calldata = encode_call(function, args)?;
        let tx = self.request(calldata);

        tracing::debug!(
            "Invoking {} on {} ({:?})",
            function.signature(),
            self.address,
            mode
        );

        match mode {
            Mode::Call => {
                let output = bounded("Contract call", self.timeout, self.backend.call(tx)).await?;
                let values = decode_output(function, &output)?;
                reporter.result(&render_outputs(&values));
                Ok(Outcome::Value(values))
            }
            Mode::Estimate => {
                self.require_sender()?;
                let gas =
                    bounded("Gas estimation", self.timeout, self.backend.estimate_gas(tx)).await?;
                reporter.gas_estimate(gas);
                Ok(Outcome::GasEstimate(gas))
            }
            Mode::Send => {
                self.require_sender()?;
                let submitted =
                    bounded("Transaction submission", self.timeout, self.backend.submit(tx))
                        .await?;
                let tx_hash = submitted.tx_hash;
                reporter.tx_sent(&tx_hash);

                let confirmation = submitted
                    .with_timeout(self.confirmation_timeout)
                    .confirmed()
                    .await?;
                if !confirmation.success {
                    return Err(InvokeError::Transaction(format!(
                        "Transaction {} reverted in block {}",
                        tx_hash, confirmation.block_number
                    )));
                }

                reporter.tx_confirmed(confirmation.block_number);
                Ok(Outcome::Confirmed {
                    tx_hash,
                    block_number: confirmation.block_number,
                })
            }
        }
    }

    /// Find the function to call by name or full signature.
    ///
    /// Overloads are told apart by argument count.
    pub fn select_function(&self, method: &str, arg_count: usize) -> InvokeResult<&'a Function> {
        let interface = self.interface;
        let not_found = || InvokeError::MethodNotFound {
            method: method.to_string(),
            available: interface.method_names().to_vec(),
        };

        if method.contains('(') {
            let wanted = utils::normalize_signature(method);
            return interface
                .abi()
                .functions()
                .find(|f| f.signature() == wanted)
                .ok_or_else(not_found);
        }

        let overloads = interface.overloads(method);
        match overloads {
            [] => Err(not_found()),
            [only] => Ok(only),
            _ => {
                let matching: Vec<&Function> = overloads
                    .iter()
                    .filter(|f| f.inputs.len() == arg_count)
                    .collect();
                match matching.as_slice() {
                    [only] => Ok(*only),
                    [] => Err(InvokeError::argument(format!(
                        "No overload of '{}' takes {} argument(s). Candidates: {}",
                        method,
                        arg_count,
                        signatures(overloads.iter())
                    ))),
                    several => Err(InvokeError::argument(format!(
                        "Method '{}' is ambiguous with {} argument(s); pass a full signature instead: {}",
                        method,
                        arg_count,
                        signatures(several.iter().copied())
                    ))),
                }
            }
        }
    }

    fn request(&self, calldata: Bytes) -> TransactionRequest {
        let tx = TransactionRequest::default()
            .to(self.address)
            .input(calldata.into());

        match self.backend.sender() {
            Some(sender) => tx.from(sender),
            None => tx,
        }
    }

    fn require_sender(&self) -> InvokeResult<Address> {
        self.backend.sender().ok_or_else(|| {
            InvokeError::InvalidKey("a private key is required for this operation".to_string())
        })
    }
}

fn signatures<'f>(functions: impl Iterator<Item = &'f Function>) -> String {
    functions
        .map(|f| f.signature())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Encode `args` against the function's input descriptors.
pub fn encode_call(function: &Function, args: &[TypedArg]) -> InvokeResult<Bytes> {
    if args.len() != function.inputs.len() {
        let expected: Vec<String> = function
            .inputs
            .iter()
            .map(|input| format!("{} {}", input.ty, input.name).trim_end().to_string())
            .collect();

        return Err(InvokeError::argument(format!(
            "Argument count mismatch for '{}': expected {}, got {}. Expected arguments: [{}]",
            function.name,
            function.inputs.len(),
            args.len(),
            expected.join(", ")
        )));
    }

    let mut values = Vec::with_capacity(args.len());
    for (i, (arg, input)) in args.iter().zip(&function.inputs).enumerate() {
        let ty = input.resolve().map_err(|e| {
            InvokeError::Parse(format!("unsupported type '{}' in ABI: {}", input.ty, e))
        })?;
        let value = arg.to_sol_value(&ty).map_err(|e| {
            InvokeError::argument(format!(
                "Invalid argument #{} ('{}' of type '{}'): {}",
                i + 1,
                input.name,
                input.ty,
                e
            ))
        })?;
        values.push(value);
    }

    let encoded = function
        .abi_encode_input(&values)
        .map_err(|e| InvokeError::argument(format!("Failed to encode arguments: {}", e)))?;

    Ok(encoded.into())
}

fn decode_output(function: &Function, output: &Bytes) -> InvokeResult<Vec<DynSolValue>> {
    if output.is_empty() && !function.outputs.is_empty() {
        return Err(InvokeError::Transport(format!(
            "Call to {} returned no data; the address may not be a contract",
            function.signature()
        )));
    }

    function
        .abi_decode_output(output, false)
        .map_err(|e| InvokeError::Transport(format!("Failed to decode result: {}", e)))
}

/// Render decoded return values. A single value is shown bare.
pub fn render_outputs(values: &[DynSolValue]) -> String {
    match values {
        [single] => render_value(single, true),
        many => render_list(many),
    }
}

fn render_list(values: &[DynSolValue]) -> String {
    let items: Vec<String> = values.iter().map(|v| render_value(v, false)).collect();
    format!("[{}]", items.join(", "))
}

fn render_value(value: &DynSolValue, top_level: bool) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(n, _) => n.to_string(),
        DynSolValue::Uint(n, _) => n.to_string(),
        DynSolValue::Address(addr) => addr.to_checksum(None),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::String(s) if top_level => s.clone(),
        DynSolValue::String(s) => serde_json::Value::String(s.clone()).to_string(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            render_list(items)
        }
        other => format!("{:?}", other),
    }
}
