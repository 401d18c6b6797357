use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::PROTOCOL_VERSION;

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Name and version of either side of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Name of the program.
    pub name: String,
    /// Version of the program.
    #[serde(default)]
    pub version: String,
}

/// Parameters of the `initialize` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// The protocol version the client speaks.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default = "empty_object")]
    pub capabilities: Value,
    /// Information about the client.
    pub client_info: Implementation,
}

impl InitializeParams {
    /// Creates handshake parameters for the given client.
    #[inline]
    pub fn new(client_info: Implementation) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_owned(),
            capabilities: empty_object(),
            client_info,
        }
    }
}

/// The result of the `initialize` request.
///
/// Every field is optional on the wire, so that minimal providers can
/// acknowledge the handshake with an empty object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The protocol version the provider speaks.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Provider capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Information about the provider.
    #[serde(default)]
    pub server_info: Option<Implementation>,
}

/// Describes a tool advertised by a provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name of the tool, unique within a provider.
    pub name: String,
    /// What the tool does.
    #[serde(default)]
    pub description: String,
    /// A JSON schema of the tool's arguments.
    #[serde(
        rename = "inputSchema",
        alias = "input_schema",
        default = "empty_object"
    )]
    pub input_schema: Value,
}

/// The result of `tools/list`.
///
/// Providers normally wrap the list in an object, but a bare array is
/// accepted as well.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListToolsResult {
    /// `{"tools": [...]}`.
    Wrapped {
        /// The advertised tools, in provider order.
        tools: Vec<ToolDescriptor>,
    },
    /// `[...]`.
    Bare(Vec<ToolDescriptor>),
}

impl ListToolsResult {
    /// Returns the advertised tools, in provider order.
    #[inline]
    pub fn into_tools(self) -> Vec<ToolDescriptor> {
        match self {
            ListToolsResult::Wrapped { tools } => tools,
            ListToolsResult::Bare(tools) => tools,
        }
    }
}

/// Parameters of `tools/call`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToolParams {
    /// The tool to call.
    pub name: String,
    /// The arguments, which should match the tool's input schema.
    #[serde(default = "empty_object")]
    pub arguments: Value,
}

/// A content item of a tool result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// Base64-encoded image data.
    Image {
        /// The encoded data.
        data: String,
        /// The MIME type of the image.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// An embedded resource.
    Resource {
        /// The resource object, passed through as-is.
        resource: Value,
    },
}

impl Content {
    /// Creates a text item.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text { text: text.into() }
    }
}

/// The result of `tools/call`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Output of the tool.
    #[serde(default)]
    pub content: Vec<Content>,
    /// Whether the tool itself reported a failure.
    #[serde(rename = "isError", alias = "is_error", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Creates a successful result with a single text item.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// Creates a failed result with a single text item.
    #[inline]
    pub fn error<S: Into<String>>(text: S) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: true,
        }
    }

    /// Renders the content items as text, one line per item. Items
    /// other than text are rendered as compact JSON.
    pub fn render_text(&self) -> String {
        let mut rendered = String::new();
        for (idx, item) in self.content.iter().enumerate() {
            if idx > 0 {
                rendered.push('\n');
            }
            match item {
                Content::Text { text } => rendered.push_str(text),
                other => {
                    let json = serde_json::to_string(other).unwrap_or_default();
                    rendered.push_str(&json);
                }
            }
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_list_tools_shapes() {
        let wrapped: ListToolsResult = serde_json::from_value(json!({
            "tools": [
                {
                    "name": "get_healthcheck",
                    "description": "Get the health status of the web server.",
                    "inputSchema": { "type": "object", "properties": {} }
                },
                { "name": "echo", "input_schema": { "type": "object" } }
            ]
        }))
        .unwrap();
        let tools = wrapped.into_tools();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "get_healthcheck");
        assert_eq!(tools[1].description, "");
        assert_eq!(tools[1].input_schema, json!({ "type": "object" }));

        let bare: ListToolsResult =
            serde_json::from_value(json!([{ "name": "echo" }])).unwrap();
        let tools = bare.into_tools();
        assert_eq!(tools[0].input_schema, json!({}));
    }

    #[test]
    fn test_descriptor_uses_camel_case_on_the_wire() {
        let descriptor = ToolDescriptor {
            name: "echo".to_owned(),
            description: "Echoes the input".to_owned(),
            input_schema: json!({ "type": "object" }),
        };
        let value = serde_json::to_value(&descriptor).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn test_render_text() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "{\"status\": \"ok\"}" },
                { "type": "image", "data": "AAAA", "mimeType": "image/png" }
            ],
            "isError": false
        }))
        .unwrap();
        assert_eq!(
            result.render_text(),
            "{\"status\": \"ok\"}\n{\"type\":\"image\",\"data\":\"AAAA\",\"mimeType\":\"image/png\"}"
        );
    }

    #[test]
    fn test_initialize_result_is_lenient() {
        let result: InitializeResult =
            serde_json::from_value(json!({})).unwrap();
        assert_eq!(result, InitializeResult::default());

        let result: InitializeResult = serde_json::from_value(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "mcp-server", "version": "1.0" }
        }))
        .unwrap();
        assert_eq!(result.server_info.unwrap().name, "mcp-server");
    }
}
