use std::ops::AsyncFnOnce;

use thiserror::Error;

use crate::session::{Session, SessionError, SessionOptions};
use crate::transport::{ProviderLaunch, Transport, TransportError};

/// Errors of connecting to a tool provider.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The provider could not be started.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The handshake failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Scoped access to a tool provider.
///
/// [`ResourceGuard::run`] starts the provider, performs the handshake,
/// hands the ready session to a body and closes the session afterwards,
/// which terminates the provider. If the scope itself is dropped midway,
/// the provider is killed together with the transport.
#[derive(Clone, Debug)]
pub struct ResourceGuard {
    launch: ProviderLaunch,
    options: SessionOptions,
}

impl ResourceGuard {
    /// Creates a guard for the provider described by `launch`.
    #[inline]
    pub fn new(launch: ProviderLaunch, options: SessionOptions) -> Self {
        Self { launch, options }
    }

    /// Runs `body` with a ready session.
    ///
    /// The body's output is returned once the session is closed.
    pub async fn run<T, F>(self, body: F) -> Result<T, ConnectError>
    where
        F: AsyncFnOnce(&mut Session) -> T,
    {
        let transport = Transport::start(&self.launch)?;
        let mut session = Session::new(transport, self.options);
        if let Err(err) = session.initialize().await {
            // `initialize` closes on failure, this is a no-op then.
            session.close().await;
            return Err(err.into());
        }

        let output = body(&mut session).await;
        session.close().await;
        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::SessionState;

    // Acknowledges the handshake, then lists no tools.
    const TINY_PROVIDER: &str = r#"
read line
echo '{"jsonrpc":"2.0","id":1,"result":{}}'
read line
read line
echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[]}}'
cat > /dev/null
"#;

    fn options() -> SessionOptions {
        SessionOptions {
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run() {
        let launch =
            ProviderLaunch::new("sh").with_args(["-c", TINY_PROVIDER]);
        let guard = ResourceGuard::new(launch, options());
        let pid = guard
            .run(async |session: &mut Session| {
                assert_eq!(session.state(), SessionState::Ready);
                assert!(session.list_tools().await.unwrap().is_empty());
                session.provider_pid().unwrap()
            })
            .await
            .unwrap();

        #[cfg(target_os = "linux")]
        assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
        let _ = pid;
    }

    #[tokio::test]
    async fn test_provider_exits_before_handshake() {
        let launch = ProviderLaunch::new("sh").with_args(["-c", "exit 0"]);
        let guard = ResourceGuard::new(launch, options());
        let mut entered = false;
        let err = guard
            .run(async |_: &mut Session| entered = true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectError::Session(SessionError::Handshake { .. })
        ));
        assert!(!entered);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let launch = ProviderLaunch::new("/nonexistent/tool-provider");
        let err = ResourceGuard::new(launch, options())
            .run(async |_: &mut Session| ())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectError::Transport(TransportError::Spawn { .. })
        ));
    }
}
