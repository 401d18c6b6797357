//! The protocol state machine on top of a [`Transport`].

mod error;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{self, Display};
use std::time::Duration;

use serde_json::Value;
use tokio::time::timeout;
use toolbridge_protocol::{
    CallToolParams, CallToolResult, Content, Frame, Implementation,
    InitializeParams, InitializeResult, ListToolsResult, Notification,
    Request, RequestId, Response, RpcError, method,
};

pub use error::SessionError;
pub use toolbridge_protocol::ToolDescriptor as Tool;

use crate::transport::Transport;

/// How many abandoned request ids are remembered. Late responses to
/// older ones are logged as unknown.
const MAX_ABANDONED: usize = 64;

/// Lifecycle of a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, the handshake has not started.
    Uninitialized,
    /// The handshake is in progress.
    Initializing,
    /// Tools can be listed and called.
    Ready,
    /// The session has ended, either on request or after a fatal error.
    Closed,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Options of a [`Session`].
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Timeout of every request other than tool calls, that is the
    /// handshake and `tools/list`.
    pub request_timeout: Duration,
    /// How the client introduces itself.
    pub client_info: Implementation,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            client_info: Implementation {
                name: "toolbridge".to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
        }
    }
}

/// The outcome of a tool call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCallResult {
    /// The correlation id of the call.
    pub id: RequestId,
    /// Output of the tool.
    pub content: Vec<Content>,
    /// Whether the tool reported a failure.
    pub is_error: bool,
}

impl ToolCallResult {
    /// Renders the content as text, see [`CallToolResult::render_text`].
    pub fn text(&self) -> String {
        CallToolResult {
            content: self.content.clone(),
            is_error: self.is_error,
        }
        .render_text()
    }
}

/// A session with a tool provider: handshake, discovery, and correlated
/// tool calls.
///
/// Requests get fresh, increasing ids. A request that times out or whose
/// caller gave up is abandoned, and a late response to it is discarded
/// when it arrives. Only the most recent abandoned ids are remembered.
/// Transport failures are fatal and close the session, while errors that
/// only concern one request leave it ready.
pub struct Session {
    transport: Transport,
    options: SessionOptions,
    state: SessionState,
    next_id: i64,
    in_flight: HashMap<RequestId, &'static str>,
    abandoned: VecDeque<RequestId>,
    tools: Vec<Tool>,
    server: Option<InitializeResult>,
}

impl Session {
    /// Creates an uninitialized session over `transport`.
    pub fn new(transport: Transport, options: SessionOptions) -> Self {
        Self {
            transport,
            options,
            state: SessionState::Uninitialized,
            next_id: 1,
            in_flight: HashMap::new(),
            abandoned: VecDeque::new(),
            tools: vec![],
            server: None,
        }
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the tools from the last [`Session::list_tools`] call.
    #[inline]
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Returns what the provider acknowledged the handshake with.
    #[inline]
    pub fn server(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    /// Returns the OS process id of the provider, if any.
    #[inline]
    pub fn provider_pid(&self) -> Option<u32> {
        self.transport.provider_pid()
    }

    /// Performs the handshake.
    ///
    /// On failure the session is closed and the provider is terminated.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        self.ensure_state(SessionState::Uninitialized, "initialize")?;
        self.state = SessionState::Initializing;
        debug!("handshake started");

        match self.handshake().await {
            Ok(server) => {
                info!(
                    "connected to tool provider {}",
                    server
                        .server_info
                        .as_ref()
                        .map(|info| format!("{} {}", info.name, info.version))
                        .unwrap_or_else(|| "(unnamed)".to_owned())
                );
                self.server = Some(server);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(err) => {
                warn!("handshake failed: {err}");
                self.shut_down().await;
                Err(match err {
                    SessionError::Handshake { .. } => err,
                    other => SessionError::Handshake {
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    async fn handshake(&mut self) -> Result<InitializeResult, SessionError> {
        let params = InitializeParams::new(self.options.client_info.clone());
        let params = serde_json::to_value(params)
            .map_err(|err| SessionError::Handshake {
                reason: err.to_string(),
            })?;
        let request_timeout = self.options.request_timeout;
        let result = self
            .request(method::INITIALIZE, Some(params), request_timeout)
            .await
            .map_err(|err| match err {
                SessionError::Provider { error, .. } => {
                    SessionError::Handshake {
                        reason: format!("rejected by provider: {error}"),
                    }
                }
                SessionError::RequestTimeout { timeout, .. } => {
                    SessionError::Handshake {
                        reason: format!("no acknowledgement within {timeout:?}"),
                    }
                }
                other => other,
            })?;

        let server = if result.is_null() {
            InitializeResult::default()
        } else {
            serde_json::from_value(result).map_err(|err| {
                SessionError::Handshake {
                    reason: format!("malformed acknowledgement: {err}"),
                }
            })?
        };

        self.transport
            .send(&Frame::Notification(Notification::new(method::INITIALIZED)))
            .await?;
        Ok(server)
    }

    /// Fetches the tools the provider advertises, in provider order, and
    /// replaces the session's snapshot with them.
    pub async fn list_tools(&mut self) -> Result<Vec<Tool>, SessionError> {
        self.ensure_state(SessionState::Ready, "list tools")?;
        let request_timeout = self.options.request_timeout;
        let result = self
            .request(method::LIST_TOOLS, None, request_timeout)
            .await?;
        let listed: ListToolsResult =
            serde_json::from_value(result).map_err(|err| {
                SessionError::Protocol {
                    method: method::LIST_TOOLS,
                    reason: err.to_string(),
                }
            })?;

        let mut seen = HashSet::new();
        let tools: Vec<Tool> = listed
            .into_tools()
            .into_iter()
            .filter(|tool| {
                let unique = seen.insert(tool.name.clone());
                if !unique {
                    warn!("ignoring duplicated tool `{}`", tool.name);
                }
                unique
            })
            .collect();
        debug!("provider advertises {} tool(s)", tools.len());

        self.tools = tools.clone();
        Ok(tools)
    }

    /// Calls a tool and waits for its result.
    ///
    /// The name is not checked locally, unknown tools are reported by the
    /// provider as [`SessionError::ToolNotFound`].
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
        call_timeout: Duration,
    ) -> Result<ToolCallResult, SessionError> {
        self.ensure_state(SessionState::Ready, "call a tool")?;
        let params = CallToolParams {
            name: name.to_owned(),
            arguments,
        };
        let params = serde_json::to_value(params).map_err(|err| {
            SessionError::Protocol {
                method: method::CALL_TOOL,
                reason: err.to_string(),
            }
        })?;

        let id = self.send_request(method::CALL_TOOL, Some(params)).await?;
        debug!("calling tool `{name}` ({id})");
        let result = match self
            .wait_for(&id, method::CALL_TOOL, call_timeout)
            .await
        {
            Ok(result) => result,
            Err(SessionError::RequestTimeout { timeout, .. }) => {
                return Err(SessionError::ToolCallTimeout {
                    name: name.to_owned(),
                    timeout,
                });
            }
            Err(SessionError::Provider { error, .. })
                if error.code == RpcError::INVALID_PARAMS =>
            {
                return Err(SessionError::ToolNotFound {
                    name: name.to_owned(),
                    message: error.message,
                });
            }
            Err(err) => return Err(err),
        };

        let result: CallToolResult =
            serde_json::from_value(result).map_err(|err| {
                SessionError::Protocol {
                    method: method::CALL_TOOL,
                    reason: err.to_string(),
                }
            })?;
        Ok(ToolCallResult {
            id,
            content: result.content,
            is_error: result.is_error,
        })
    }

    /// Closes the session and then the transport. Calling it more than
    /// once is a no-op.
    pub async fn close(&mut self) {
        self.shut_down().await;
    }

    async fn shut_down(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Closed;
            self.in_flight.clear();
            self.abandoned.clear();
            debug!("session closed");
        }
        self.transport.close().await;
    }

    #[inline]
    fn ensure_state(
        &self,
        expected: SessionState,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    async fn request(
        &mut self,
        method: &'static str,
        params: Option<Value>,
        request_timeout: Duration,
    ) -> Result<Value, SessionError> {
        let id = self.send_request(method, params).await?;
        self.wait_for(&id, method, request_timeout).await
    }

    async fn send_request(
        &mut self,
        method: &'static str,
        params: Option<Value>,
    ) -> Result<RequestId, SessionError> {
        // Whatever is still in flight belongs to a caller that was
        // cancelled.
        let cancelled: Vec<_> = self.in_flight.drain().collect();
        for (id, cancelled_method) in cancelled {
            debug!("abandoning cancelled `{cancelled_method}` ({id})");
            self.abandon(id);
        }

        let id = RequestId::Number(self.next_id);
        self.next_id += 1;

        let mut request = Request::new(id.clone(), method);
        request.params = params;
        self.in_flight.insert(id.clone(), method);
        if let Err(err) = self.transport.send(&Frame::Request(request)).await {
            self.in_flight.remove(&id);
            return Err(self.fail(err.into()).await);
        }
        Ok(id)
    }

    async fn wait_for(
        &mut self,
        id: &RequestId,
        method: &'static str,
        request_timeout: Duration,
    ) -> Result<Value, SessionError> {
        let response = match timeout(request_timeout, self.next_response(id))
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(self.fail(err).await),
            Err(_) => {
                self.in_flight.remove(id);
                self.abandon(id.clone());
                return Err(SessionError::RequestTimeout {
                    method,
                    timeout: request_timeout,
                });
            }
        };

        response
            .into_result()
            .map_err(|error| SessionError::Provider { method, error })
    }

    /// Reads frames until the response to `id` arrives, routing anything
    /// else on the way.
    ///
    /// If this future is dropped early, `id` stays in flight and its
    /// response is discarded later on.
    async fn next_response(
        &mut self,
        id: &RequestId,
    ) -> Result<Response, SessionError> {
        loop {
            let frame = self.transport.receive().await?;
            let response = match frame {
                Frame::Response(response) => response,
                Frame::Notification(notification) => {
                    debug!("ignoring notification `{}`", notification.method);
                    continue;
                }
                Frame::Request(request) => {
                    debug!(
                        "rejecting request `{}` from the provider",
                        request.method
                    );
                    let error = RpcError::new(
                        RpcError::METHOD_NOT_FOUND,
                        format!("method not supported: {}", request.method),
                    );
                    self.transport
                        .send(&Frame::Response(Response::failure(
                            request.id, error,
                        )))
                        .await?;
                    continue;
                }
            };

            if response.id == *id {
                self.in_flight.remove(id);
                return Ok(response);
            }
            if let Some(pos) =
                self.abandoned.iter().position(|other| *other == response.id)
            {
                self.abandoned.remove(pos);
                debug!("discarding late response to {}", response.id);
            } else {
                warn!("discarding response with unknown id {}", response.id);
            }
        }
    }

    fn abandon(&mut self, id: RequestId) {
        if self.abandoned.len() == MAX_ABANDONED {
            self.abandoned.pop_front();
        }
        self.abandoned.push_back(id);
    }

    /// Handles a fatal error by closing the session.
    async fn fail(&mut self, err: SessionError) -> SessionError {
        if err.is_fatal() {
            error!("session failed: {err}");
            self.shut_down().await;
        }
        err
    }
}
