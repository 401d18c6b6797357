use std::io;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use toolbridge_protocol::{
    CallToolParams, CallToolResult, Frame, Implementation, InitializeResult,
    ListToolsResult, PROTOCOL_VERSION, Request, Response, RpcError, method,
};
use tracing::Instrument;

use crate::tool::Toolbox;

/// The provider side of a session: answers handshake, discovery and tool
/// calls with the tools of a [`Toolbox`].
pub struct Server {
    toolbox: Toolbox,
    info: Implementation,
}

impl Server {
    /// Creates a server exposing the tools of `toolbox`.
    #[inline]
    pub fn new(toolbox: Toolbox) -> Self {
        Self {
            toolbox,
            info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
        }
    }

    /// Handles a frame, returning the response to send back, if any.
    pub async fn handle(&self, frame: Frame) -> Option<Response> {
        match frame {
            Frame::Request(request) => Some(self.handle_request(request).await),
            Frame::Notification(notification) => {
                debug!("got notification `{}`", notification.method);
                None
            }
            Frame::Response(response) => {
                debug!("ignoring response to {}", response.id);
                None
            }
        }
    }

    async fn handle_request(&self, request: Request) -> Response {
        let Request {
            id,
            method: method_name,
            params,
            ..
        } = request;
        debug!("got request `{method_name}` ({id})");

        let result = match method_name.as_str() {
            method::INITIALIZE => to_value(InitializeResult {
                protocol_version: Some(PROTOCOL_VERSION.to_owned()),
                capabilities: json!({ "tools": {} }),
                server_info: Some(self.info.clone()),
            }),
            method::LIST_TOOLS => to_value(ListToolsResult::Wrapped {
                tools: self.toolbox.descriptors(),
            }),
            method::CALL_TOOL => self
                .call_tool(params)
                .instrument(debug_span!("tools/call", %id))
                .await
                .and_then(to_value),
            _ => Err(RpcError::new(
                RpcError::METHOD_NOT_FOUND,
                format!("Method not found: {method_name}"),
            )),
        };
        match result {
            Ok(result) => Response::success(id, result),
            Err(error) => Response::failure(id, error),
        }
    }

    async fn call_tool(
        &self,
        params: Option<Value>,
    ) -> Result<CallToolResult, RpcError> {
        let params: CallToolParams =
            serde_json::from_value(params.unwrap_or(Value::Null)).map_err(
                |err| RpcError::new(RpcError::INVALID_PARAMS, err.to_string()),
            )?;

        let Some(call) = self.toolbox.call(&params.name, params.arguments)
        else {
            warn!("tool not found: {}", params.name);
            return Err(RpcError::new(
                RpcError::INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            ));
        };
        Ok(call.await)
    }

    /// Serves newline-delimited frames from `reader` until it is closed,
    /// writing responses to `writer`.
    ///
    /// Requests are handled one at a time, in order.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        let mut writer = writer;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            trace!("received: {line}");

            let reply = match serde_json::from_str::<Frame>(line) {
                Ok(frame) => match self.handle(frame).await {
                    Some(response) => serde_json::to_string(&response)?,
                    None => continue,
                },
                Err(err) => {
                    warn!("failed to parse a frame: {err}");
                    // The id is unknown, so it has to be null.
                    json!({
                        "jsonrpc": "2.0",
                        "id": null,
                        "error": RpcError::new(
                            RpcError::PARSE_ERROR,
                            format!("Parse error: {err}"),
                        ),
                    })
                    .to_string()
                }
            };
            trace!("sending: {reply}");
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        debug!("client closed the connection");
        Ok(())
    }
}

#[inline]
fn to_value<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|err| RpcError::new(RpcError::INTERNAL_ERROR, err.to_string()))
}
