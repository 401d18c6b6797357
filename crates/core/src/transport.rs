//! Process-owning, newline-framed channel to a tool provider.

use std::io::{self, ErrorKind as IoErrorKind};
use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use toolbridge_protocol::Frame;
use tracing::Instrument;

const FRAME_BUFFER: usize = 64;

/// Errors of a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The provider process could not be started.
    #[error("failed to start tool provider `{program}`: {source}")]
    Spawn {
        /// The program that was launched.
        program: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The provider exited, or the transport has been closed.
    #[error("tool provider closed the connection")]
    Closed,
    /// Writing to the provider failed.
    #[error("failed to write to tool provider: {0}")]
    Io(#[from] io::Error),
    /// A frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Describes how to start a tool provider process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderLaunch {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl ProviderLaunch {
    /// Runs `program` directly.
    #[inline]
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            envs: vec![],
        }
    }

    /// Picks an interpreter from the file extension of `path`: Python
    /// scripts run under `python3`, JavaScript under `node`, anything
    /// else is executed directly.
    pub fn infer<S: Into<String>>(path: S) -> Self {
        let path = path.into();
        let interpreter = match Path::new(&path)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some("py") => Some("python3"),
            Some("js" | "mjs") => Some("node"),
            _ => None,
        };
        match interpreter {
            Some(interpreter) => Self::new(interpreter).with_arg(path),
            None => Self::new(path),
        }
    }

    /// Appends an argument.
    #[inline]
    pub fn with_arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[inline]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable for the provider.
    #[inline]
    pub fn with_env<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Returns the program to run.
    #[inline]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments.
    #[inline]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// A bidirectional frame channel to a tool provider.
///
/// Frames are read by a background task and buffered in a channel, so
/// [`Transport::receive`] can be cancelled without losing partial lines.
/// Lines that are not protocol frames (e.g. a provider printing a banner
/// to stdout) are skipped.
pub struct Transport {
    child: Option<Child>,
    writer: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    frames: mpsc::Receiver<Frame>,
    reader_task: Option<JoinHandle<()>>,
    closed: bool,
}

impl Transport {
    /// Spawns the provider process and connects to its stdio.
    ///
    /// The child is killed when the transport is dropped without being
    /// closed.
    pub fn start(launch: &ProviderLaunch) -> Result<Self, TransportError> {
        let spawn_err = |source| TransportError::Spawn {
            program: launch.program.clone(),
            source,
        };

        let mut child = Command::new(&launch.program)
            .args(&launch.args)
            .envs(launch.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take())
        else {
            return Err(spawn_err(io::Error::other("stdio is not captured")));
        };
        debug!(
            "started tool provider `{}` (pid {:?})",
            launch.program,
            child.id()
        );

        let mut transport = Self::from_io(stdout, stdin);
        transport.child = Some(child);
        Ok(transport)
    }

    /// Creates a transport over arbitrary byte streams, without owning
    /// a process.
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let reader_task = tokio::spawn(
            pump_frames(reader, frame_tx)
                .instrument(trace_span!("transport reader")),
        );
        Self {
            child: None,
            writer: Some(Box::new(writer)),
            frames: frame_rx,
            reader_task: Some(reader_task),
            closed: false,
        }
    }

    /// Returns the OS process id of the provider, if the transport owns
    /// a running process.
    #[inline]
    pub fn provider_pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Returns whether [`Transport::close`] has been called.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Sends a frame as a single line.
    pub async fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let writer = match &mut self.writer {
            Some(writer) if !self.closed => writer,
            _ => return Err(TransportError::Closed),
        };

        let mut line = serde_json::to_string(frame)?;
        line.push('\n');
        trace!("sending: {}", line.trim_end());

        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        };
        match written.await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == IoErrorKind::BrokenPipe => {
                Err(TransportError::Closed)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Waits for the next frame.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe.
    pub async fn receive(&mut self) -> Result<Frame, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.frames.recv().await.ok_or(TransportError::Closed)
    }

    /// Terminates the provider and releases the channel. Calling it more
    /// than once is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // Closing stdin first lets a well-behaved provider see EOF.
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await.ok();
        }
        if let Some(reader_task) = self.reader_task.take() {
            reader_task.abort();
        }
        if let Some(mut child) = self.child.take() {
            match child.kill().await {
                Ok(()) => debug!("tool provider terminated"),
                Err(err) => warn!("failed to terminate tool provider: {err}"),
            }
        }
        self.frames.close();
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some(reader_task) = self.reader_task.take() {
            reader_task.abort();
        }
    }
}

async fn pump_frames<R>(reader: R, frame_tx: mpsc::Sender<Frame>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("tool provider closed its output");
                break;
            }
            Err(err) => {
                warn!("failed to read from tool provider: {err}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        trace!("received: {line}");
        let frame = match serde_json::from_str::<Frame>(line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("skipping a line that is not a frame ({err}): {line}");
                continue;
            }
        };
        if frame_tx.send(frame).await.is_err() {
            break;
        }
    }
}
