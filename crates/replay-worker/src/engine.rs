//! UCI engine session over async pipes.
//!
//! The session owns the engine process (or, for tests, any pair of async
//! streams) and speaks strict request/response: one command, then read
//! until that command's terminal line. Queries on a session that is not
//! running return neutral defaults instead of failing.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::error::ReplayError;
use crate::protocol::{self, PerftCollector, SearchCollector, READY_OK, UCI_OK};
use crate::score::Evaluation;

/// Pause before retrying a read that returned no bytes
const RETRY_PAUSE: Duration = Duration::from_millis(1);

/// How long `stop` waits for the engine to exit after `quit`
const QUIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Handshaking,
    Ready,
    Terminated,
}

/// Engine options sent during the handshake and used per search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub threads: u32,
    pub hash_mb: u32,
    /// Depth for `go depth N`
    pub search_depth: u32,
    /// Per-read limit; `None` waits forever
    pub read_timeout: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 256,
            search_depth: 20,
            read_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// A UCI engine session
pub struct EngineSession<W = ChildStdin, R = ChildStdout> {
    options: EngineOptions,
    state: SessionState,
    process: Option<Child>,
    stdin: Option<W>,
    stdout: Option<BufReader<R>>,
    last_command: String,
}

impl EngineSession {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            state: SessionState::Uninitialized,
            process: None,
            stdin: None,
            stdout: None,
            last_command: String::new(),
        }
    }

    /// Spawn the engine executable and run the handshake.
    /// On failure the session is left uninitialized.
    pub async fn start(&mut self, path: &str) -> Result<(), ReplayError> {
        if self.is_running() {
            warn!("Engine already running, ignoring start");
            return Ok(());
        }

        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ReplayError::EngineSpawn(format!("{path}: {e}")))?;

        let (Some(stdin), Some(stdout)) = (process.stdin.take(), process.stdout.take()) else {
            let _ = process.start_kill();
            return Err(ReplayError::EngineSpawn(format!("{path}: pipes unavailable")));
        };

        self.process = Some(process);
        self.stdin = Some(stdin);
        self.stdout = Some(BufReader::new(stdout));

        if let Err(e) = self.handshake().await {
            self.stop().await;
            self.state = SessionState::Uninitialized;
            return Err(e);
        }
        info!(path, "Engine started");
        Ok(())
    }
}

impl<W, R> EngineSession<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    /// Run a session over already-connected streams
    pub async fn attach(writer: W, reader: R, options: EngineOptions) -> Result<Self, ReplayError> {
        let mut session = Self {
            options,
            state: SessionState::Uninitialized,
            process: None,
            stdin: Some(writer),
            stdout: Some(BufReader::new(reader)),
            last_command: String::new(),
        };
        session.handshake().await?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Handshaking | SessionState::Ready)
    }

    async fn handshake(&mut self) -> Result<(), ReplayError> {
        self.state = SessionState::Handshaking;

        self.send("uci").await?;
        self.wait_for(UCI_OK).await?;

        self.send(&format!("setoption name Threads value {}", self.options.threads))
            .await?;
        self.send(&format!("setoption name Hash value {}", self.options.hash_mb))
            .await?;
        self.send("isready").await?;
        self.wait_for(READY_OK).await?;

        self.state = SessionState::Ready;
        debug!(
            threads = self.options.threads,
            hash_mb = self.options.hash_mb,
            "Engine handshake complete"
        );
        Ok(())
    }

    /// Write one command line. No-op when the session is not running.
    pub async fn send(&mut self, cmd: &str) -> Result<(), ReplayError> {
        if !self.is_running() {
            debug!(cmd, "Engine not running, command dropped");
            return Ok(());
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(());
        };

        debug!(cmd, "engine <");
        stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| ReplayError::EngineIo(format!("Failed to write to engine: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| ReplayError::EngineIo(format!("Failed to flush engine stdin: {e}")))?;

        self.last_command.clear();
        self.last_command.push_str(cmd);
        Ok(())
    }

    /// Read one response line without its terminator.
    /// Returns an empty string when the session is not running.
    pub async fn read_line(&mut self) -> Result<String, ReplayError> {
        if !self.is_running() {
            return Ok(String::new());
        }

        let line = match self.options.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.next_line()).await {
                Ok(line) => line?,
                Err(_) => {
                    return Err(ReplayError::EngineTimeout {
                        command: self.last_command.clone(),
                        after: limit,
                    })
                }
            },
            None => self.next_line().await?,
        };

        debug!(line = %line, "engine >");
        Ok(line)
    }

    async fn next_line(&mut self) -> Result<String, ReplayError> {
        let mut buf = Vec::new();
        loop {
            let Some(stdout) = self.stdout.as_mut() else {
                return Ok(String::new());
            };
            let read = stdout
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| ReplayError::EngineIo(format!("Failed to read from engine: {e}")))?;

            if buf.last() == Some(&b'\n') {
                break;
            }
            if read == 0 {
                if self.process_exited() {
                    return Err(ReplayError::EngineExited);
                }
                tokio::time::sleep(RETRY_PAUSE).await;
            }
        }

        buf.pop();
        buf.retain(|&b| b != b'\r');
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn process_exited(&mut self) -> bool {
        match self.process.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(Some(_))),
            None => false,
        }
    }

    /// Read until a line equal to `expected`
    async fn wait_for(&mut self, expected: &str) -> Result<(), ReplayError> {
        while self.is_running() {
            if self.read_line().await?.trim() == expected {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Legal moves in the engine's current position, via `go perft 1`
    pub async fn count_legal_moves(&mut self) -> Result<u32, ReplayError> {
        if !self.is_running() {
            return Ok(0);
        }
        self.send("go perft 1").await?;

        let mut perft = PerftCollector::default();
        loop {
            let line = self.read_line().await?;
            if perft.push(&line) {
                break;
            }
        }

        let count = perft.legal_moves();
        if let Some(nodes) = perft.nodes_searched() {
            if nodes != u64::from(count) {
                warn!(count, nodes, "Perft move lines disagree with node total");
            }
        }
        Ok(count)
    }

    /// Search the current position to the configured depth
    pub async fn evaluate(&mut self) -> Result<Evaluation, ReplayError> {
        if !self.is_running() {
            return Ok(Evaluation::default());
        }
        self.send(&format!("go depth {}", self.options.search_depth))
            .await?;

        let mut search = SearchCollector::default();
        loop {
            let line = self.read_line().await?;
            if search.push(&line) {
                break;
            }
        }
        Ok(search.finish())
    }

    /// Position export of the engine's current position, from the `d`
    /// diagnostic. `isready` is sent after `d` so the end of the
    /// diagnostic block is marked by `readyok`.
    pub async fn board_diagnostic(&mut self) -> Result<String, ReplayError> {
        if !self.is_running() {
            return Ok(String::new());
        }
        self.send("d").await?;
        self.send("isready").await?;
        // The reply being waited on is the diagnostic, not the sync marker
        self.last_command.clear();
        self.last_command.push_str("d");

        let mut fen = None;
        loop {
            let line = self.read_line().await?;
            if line.trim() == READY_OK {
                break;
            }
            if fen.is_none() {
                fen = protocol::fen_field(&line).map(str::to_string);
            }
        }
        fen.ok_or(ReplayError::MissingMarker(protocol::FEN_LABEL))
    }

    /// Ask the engine to quit and release it. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        let was_running = self.is_running();
        if was_running {
            if let Err(e) = self.send("quit").await {
                debug!(error = %e, "Failed to send quit");
            }
        }
        self.stdin = None;
        self.stdout = None;

        if let Some(mut child) = self.process.take() {
            match tokio::time::timeout(QUIT_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "Engine exited"),
                _ => {
                    warn!("Engine did not exit after quit, killing");
                    let _ = child.kill().await;
                }
            }
        }

        if was_running {
            self.state = SessionState::Terminated;
            info!("Engine stopped");
        }
    }
}

impl<W, R> Drop for EngineSession<W, R> {
    fn drop(&mut self) {
        if let Some(child) = self.process.as_mut() {
            let _ = child.start_kill();
        }
    }
}
