use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::Address;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{InvokeError, InvokeResult};

/// Local ABI files are recognised by this extension.
pub const ABI_FILE_EXTENSION: &str = ".json";

pub const DEFAULT_EXPLORER_URL: &str = "https://api.etherscan.io";

/// Where the interface description comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiSource {
    File(PathBuf),
    Explorer { api_key: String },
}

impl AbiSource {
    pub fn from_arg(arg: &str) -> Self {
        if arg.ends_with(ABI_FILE_EXTENSION) {
            Self::File(PathBuf::from(arg))
        } else {
            Self::Explorer {
                api_key: arg.to_string(),
            }
        }
    }
}

/// A contract interface with its functions addressable by name.
#[derive(Debug, Clone)]
pub struct Interface {
    abi: JsonAbi,
    method_names: Vec<String>,
}

impl Interface {
    pub fn from_json_str(content: &str) -> InvokeResult<Self> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| InvokeError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Accepts a bare ABI array or a compiler artifact with an `abi` field.
    pub fn from_value(value: Value) -> InvokeResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut artifact) => match artifact.remove("abi") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(InvokeError::Parse(
                        "expected a JSON array or an object with an \"abi\" array".to_string(),
                    ))
                }
            },
            other => {
                return Err(InvokeError::Parse(format!(
                    "expected a JSON array, found {}",
                    json_kind(&other)
                )))
            }
        };

        // JsonAbi groups functions by name; keep the declaration order separately.
        let mut method_names: Vec<String> = Vec::new();
        for item in &items {
            if item.get("type").and_then(Value::as_str) == Some("function") {
                if let Some(name) = item.get("name").and_then(Value::as_str) {
                    if !method_names.iter().any(|n| n == name) {
                        method_names.push(name.to_string());
                    }
                }
            }
        }

        let abi: JsonAbi = serde_json::from_value(Value::Array(items))
            .map_err(|e| InvokeError::Parse(e.to_string()))?;

        Ok(Self { abi, method_names })
    }

    /// Method names in declaration order, overloads listed once.
    pub fn method_names(&self) -> &[String] {
        &self.method_names
    }

    pub fn overloads(&self, name: &str) -> &[Function] {
        self.abi.function(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

impl ExplorerResponse {
    fn into_interface(self) -> InvokeResult<Interface> {
        let payload = match &self.result {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        };

        match payload {
            Some(abi) if self.status == "1" => Interface::from_json_str(abi).map_err(|e| match e {
                InvokeError::Parse(reason) => InvokeError::Parse(format!(
                    "explorer returned a malformed ABI: {}",
                    reason
                )),
                other => other,
            }),
            _ => {
                let mut message = self
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string());
                if self.status != "1" {
                    if let Some(detail) = payload {
                        message.push_str(&format!(" ({})", detail));
                    }
                }
                Err(InvokeError::Lookup(message))
            }
        }
    }
}

/// Resolves an [`AbiSource`] into an [`Interface`]. Nothing is cached.
#[derive(Debug)]
pub struct AbiResolver {
    client: Client,
    explorer_url: String,
    timeout: Option<Duration>,
}

impl AbiResolver {
    pub fn new(explorer_url: &str, timeout: Option<Duration>) -> InvokeResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            explorer_url: explorer_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub async fn resolve(&self, source: &AbiSource, address: &Address) -> InvokeResult<Interface> {
        match source {
            AbiSource::File(path) => self.load_file(path).await,
            AbiSource::Explorer { api_key } => self.fetch_from_explorer(address, api_key).await,
        }
    }

    async fn load_file(&self, path: &Path) -> InvokeResult<Interface> {
        debug!("Reading ABI from {:?}", path);
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| InvokeError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        Interface::from_json_str(&content)
    }

    async fn fetch_from_explorer(
        &self,
        address: &Address,
        api_key: &str,
    ) -> InvokeResult<Interface> {
        info!("Fetching ABI from explorer for {}", address);
        let url = format!("{}/api", self.explorer_url);
        let address = address.to_string();

        let body = self
            .client
            .get(&url)
            .query(&[
                ("module", "contract"),
                ("action", "getabi"),
                ("address", address.as_str()),
                ("apikey", api_key),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| self.request_error(e))?
            .text()
            .await
            .map_err(|e| self.request_error(e))?;

        let response: ExplorerResponse = serde_json::from_str(&body).map_err(|e| {
            InvokeError::Parse(format!("explorer response is not valid JSON: {}", e))
        })?;

        response.into_interface()
    }

    fn request_error(&self, error: reqwest::Error) -> InvokeError {
        match self.timeout {
            Some(elapsed) if error.is_timeout() => InvokeError::Timeout {
                stage: "ABI lookup",
                elapsed,
            },
            _ => InvokeError::Fetch(error),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const TOKEN_ABI: &str = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"event","name":"Transfer","anonymous":false,
         "inputs":[{"name":"from","type":"address","indexed":true},
                   {"name":"to","type":"address","indexed":true},
                   {"name":"value","type":"uint256","indexed":false}]},
        {"type":"function","name":"balanceOf","stateMutability":"view",
         "inputs":[{"name":"owner","type":"address"}],
         "outputs":[{"name":"","type":"uint256"}]}
    ]"#;

    fn contract_address() -> Address {
        Address::from_str("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").unwrap()
    }

    /// Answers one HTTP request with `body` and hands back the request head.
    async fn serve_once(body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    #[test]
    fn test_source_from_arg() {
        assert_eq!(
            AbiSource::from_arg("./Token.json"),
            AbiSource::File(PathBuf::from("./Token.json"))
        );
        assert_eq!(
            AbiSource::from_arg("ABCDEF123"),
            AbiSource::Explorer {
                api_key: "ABCDEF123".to_string()
            }
        );
    }

    #[test]
    fn test_method_names_follow_declaration_order() {
        let interface = Interface::from_json_str(TOKEN_ABI).unwrap();
        assert_eq!(interface.method_names(), ["transfer", "balanceOf"]);
        assert_eq!(interface.overloads("balanceOf").len(), 1);
        assert!(interface.overloads("Transfer").is_empty());
        assert_eq!(interface.abi().events().count(), 1);
    }

    #[test]
    fn test_artifact_object_is_accepted() {
        let artifact = format!(r#"{{"contractName":"Token","abi":{}}}"#, TOKEN_ABI);
        let interface = Interface::from_json_str(&artifact).unwrap();
        assert_eq!(interface.method_names(), ["transfer", "balanceOf"]);
    }

    #[test]
    fn test_malformed_abi_is_a_parse_error() {
        for content in [
            "{not json",
            "42",
            r#"{"bytecode":"0x"}"#,
            "[1]",
            r#"[{"type":"function","name":"f","inputs":"nope"}]"#,
        ] {
            assert!(
                matches!(Interface::from_json_str(content), Err(InvokeError::Parse(_))),
                "{}",
                content
            );
        }
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Token.json");
        std::fs::write(&path, TOKEN_ABI).unwrap();

        let resolver = AbiResolver::new(DEFAULT_EXPLORER_URL, None).unwrap();
        let source = AbiSource::from_arg(path.to_str().unwrap());
        let interface = resolver.resolve(&source, &contract_address()).await.unwrap();
        assert_eq!(interface.method_names().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_local_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let resolver = AbiResolver::new(DEFAULT_EXPLORER_URL, None).unwrap();
        let source = AbiSource::File(dir.path().join("Missing.json"));

        let err = resolver.resolve(&source, &contract_address()).await.unwrap_err();
        assert!(matches!(err, InvokeError::Read { .. }));
    }

    #[tokio::test]
    async fn test_explorer_success() {
        let body = serde_json::json!({
            "status": "1",
            "message": "OK",
            "result": TOKEN_ABI,
        })
        .to_string();
        let (url, request) = serve_once(body).await;

        let resolver = AbiResolver::new(&url, Some(Duration::from_secs(10))).unwrap();
        let source = AbiSource::from_arg("MYKEY");
        let interface = resolver.resolve(&source, &contract_address()).await.unwrap();
        assert_eq!(interface.method_names(), ["transfer", "balanceOf"]);

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /api?module=contract&action=getabi&address="));
        assert!(request.contains("apikey=MYKEY"));
    }

    #[tokio::test]
    async fn test_explorer_notok_is_a_lookup_error() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#.to_string();
        let (url, _request) = serve_once(body).await;

        let resolver = AbiResolver::new(&url, None).unwrap();
        let err = resolver
            .resolve(&AbiSource::from_arg("BADKEY"), &contract_address())
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::Lookup(_)));
        assert!(err.to_string().contains("NOTOK"));
    }

    #[test]
    fn test_explorer_empty_result_is_a_lookup_error() {
        let response: ExplorerResponse =
            serde_json::from_str(r#"{"status":"1","message":"OK","result":""}"#).unwrap();
        assert!(matches!(response.into_interface(), Err(InvokeError::Lookup(_))));

        let response: ExplorerResponse = serde_json::from_str(r#"{"status":"0"}"#).unwrap();
        let err = response.into_interface().unwrap_err();
        assert!(err.to_string().contains("Unknown error"));
    }

    #[test]
    fn test_explorer_malformed_result_is_a_parse_error() {
        let response: ExplorerResponse =
            serde_json::from_str(r#"{"status":"1","message":"OK","result":"[{oops"}"#).unwrap();
        assert!(matches!(response.into_interface(), Err(InvokeError::Parse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_explorer_is_a_fetch_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let resolver = AbiResolver::new(&url, None).unwrap();
        let err = resolver
            .resolve(&AbiSource::from_arg("KEY"), &contract_address())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Fetch(_)));
    }
}
