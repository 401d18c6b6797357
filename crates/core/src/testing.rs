//! In-memory tool providers for tests.

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex, split};
use toolbridge_protocol::{
    Frame, PROTOCOL_VERSION, RequestId, Response, RpcError, method,
};

use crate::session::{Session, SessionOptions};
use crate::transport::Transport;

/// Connects a transport to a provider driven by `handler`.
///
/// The handler gets every frame the client sends and returns the lines to
/// write back. Returning `None` makes the provider hang up.
pub(crate) fn scripted_transport<F>(mut handler: F) -> Transport
where
    F: FnMut(Frame) -> Option<Vec<String>> + Send + 'static,
{
    let (client, server) = duplex(64 * 1024);
    let (client_read, client_write) = split(client);
    let (server_read, mut server_write) = split(server);
    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(frame) = serde_json::from_str::<Frame>(&line) else {
                continue;
            };
            let Some(replies) = handler(frame) else {
                break;
            };
            for reply in replies {
                let reply = format!("{reply}\n");
                if server_write.write_all(reply.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    });
    Transport::from_io(client_read, client_write)
}

pub(crate) fn line(response: Response) -> String {
    serde_json::to_string(&Frame::Response(response)).unwrap()
}

pub(crate) fn acknowledge(id: RequestId) -> String {
    line(Response::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "fake-provider", "version": "0.1.0" }
        }),
    ))
}

pub(crate) fn advertised_tools() -> Value {
    json!([
        {
            "name": "get_healthcheck",
            "description": "Get the health status of the web server.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "slow",
            "description": "Never answers in time.",
            "inputSchema": { "type": "object" }
        },
        {
            "name": "broken",
            "description": "Always fails.",
            "inputSchema": { "type": "object" }
        }
    ])
}

/// A provider with three tools: `get_healthcheck` reports a healthy
/// server, `slow` answers only when the next request arrives, and
/// `broken` reports a tool failure. Unknown tools get `-32602`.
pub(crate) fn healthcheck_provider()
-> impl FnMut(Frame) -> Option<Vec<String>> + Send + 'static {
    let mut late: Option<RequestId> = None;
    move |frame| {
        let Frame::Request(request) = frame else {
            return Some(vec![]);
        };
        let mut replies = vec!["a line that is not a frame".to_owned()];
        if let Some(id) = late.take() {
            replies.push(line(Response::success(
                id,
                json!({ "content": [{ "type": "text", "text": "too late" }] }),
            )));
        }

        let response = match request.method.as_str() {
            method::INITIALIZE => {
                replies.push(acknowledge(request.id));
                return Some(replies);
            }
            method::LIST_TOOLS => Response::success(
                request.id,
                json!({ "tools": advertised_tools() }),
            ),
            method::CALL_TOOL => {
                let name = request
                    .params
                    .as_ref()
                    .and_then(|params| params.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                match name.as_str() {
                    "get_healthcheck" => Response::success(
                        request.id,
                        json!({
                            "content": [{
                                "type": "text",
                                "text": "{\"status\":\"ok\"}"
                            }],
                            "isError": false
                        }),
                    ),
                    "slow" => {
                        late = Some(request.id);
                        return Some(replies);
                    }
                    "broken" => Response::success(
                        request.id,
                        json!({
                            "content": [{ "type": "text", "text": "boom" }],
                            "isError": true
                        }),
                    ),
                    _ => Response::failure(
                        request.id,
                        RpcError::new(
                            RpcError::INVALID_PARAMS,
                            format!("Unknown tool: {name}"),
                        ),
                    ),
                }
            }
            other => Response::failure(
                request.id,
                RpcError::new(
                    RpcError::METHOD_NOT_FOUND,
                    format!("Method not found: {other}"),
                ),
            ),
        };
        replies.push(line(response));
        Some(replies)
    }
}

/// Returns an initialized session connected to [`healthcheck_provider`].
pub(crate) async fn ready_session() -> Session {
    let transport = scripted_transport(healthcheck_provider());
    let mut session = Session::new(transport, SessionOptions::default());
    session.initialize().await.unwrap();
    session
}
