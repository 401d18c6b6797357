use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSONRPC_VERSION: &str = "2.0";

fn jsonrpc_version() -> String {
    JSONRPC_VERSION.to_owned()
}

/// A single message exchanged with a tool provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    /// A request expecting a response.
    Request(Request),
    /// A response to an earlier request.
    Response(Response),
    /// A one-way message.
    Notification(Notification),
}

/// Identifies a request and its response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// A numeric id, which is what this crate's clients generate.
    Number(i64),
    /// A string id.
    String(String),
}

impl From<i64> for RequestId {
    #[inline]
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    #[inline]
    fn from(s: &str) -> Self {
        RequestId::String(s.to_owned())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// A request frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Always `"2.0"`.
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    /// The correlation id.
    pub id: RequestId,
    /// The method to invoke.
    pub method: String,
    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// Creates a request without parameters.
    #[inline]
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    /// Attaches parameters to the request.
    #[inline]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// A response frame, carrying either a result or an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Always `"2.0"`.
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    /// The id of the request this frame answers.
    pub id: RequestId,
    /// The result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Creates a successful response.
    #[inline]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[inline]
    pub fn failure(id: RequestId, error: RpcError) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Converts the response into its outcome. A response without both
    /// fields is treated as a successful `null` result.
    #[inline]
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A notification frame, which has no id and gets no response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Always `"2.0"`.
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    /// The notification method.
    pub method: String,
    /// Notification parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    /// Creates a notification without parameters.
    #[inline]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            method: method.into(),
            params: None,
        }
    }
}

/// The error member of a response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// One of the `*` error code constants, or a provider-specific code.
    pub code: i64,
    /// A short description.
    pub message: String,
    /// Additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// The frame could not be parsed.
    pub const PARSE_ERROR: i64 = -32700;
    /// The frame is not a valid request.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// The parameters are invalid. Providers also use it for unknown
    /// tool names in `tools/call`.
    pub const INVALID_PARAMS: i64 = -32602;
    /// The provider failed internally.
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Creates an error with the given code and message.
    #[inline]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_frame_kinds() {
        let frame: Frame = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/list"
        }))
        .unwrap();
        assert!(matches!(frame, Frame::Request(req) if req.method == "tools/list"));

        let frame: Frame = serde_json::from_value(json!({
            "id": 7,
            "result": { "tools": [] }
        }))
        .unwrap();
        let Frame::Response(resp) = frame else {
            panic!("expected a response");
        };
        assert_eq!(resp.id, RequestId::Number(7));
        assert_eq!(resp.jsonrpc, "2.0");

        let frame: Frame = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }))
        .unwrap();
        assert!(matches!(frame, Frame::Notification(_)));
    }

    #[test]
    fn test_error_response() {
        let frame: Frame = serde_json::from_str(
            r#"{"id":"abc","error":{"code":-32602,"message":"unknown tool: nope"}}"#,
        )
        .unwrap();
        let Frame::Response(resp) = frame else {
            panic!("expected a response");
        };
        assert_eq!(resp.id, RequestId::from("abc"));
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, RpcError::INVALID_PARAMS);
        assert_eq!(err.to_string(), "unknown tool: nope (code -32602)");
    }

    #[test]
    fn test_request_omits_missing_params() {
        let req = Request::new(3i64, "initialize");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({ "jsonrpc": "2.0", "id": 3, "method": "initialize" })
        );
    }
}
