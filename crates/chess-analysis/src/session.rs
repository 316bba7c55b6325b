//! Engine process session.
//!
//! One [`EngineSession`] drives one search: it spawns the engine, walks the
//! UCI handshake, issues the search and yields progress until `bestmove`.
//! Every exit path funnels through [`EngineSession::teardown`], which is
//! idempotent and also runs on drop.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};
use uci::{EngineInfo, EngineMessage, GoOptions, GuiCommand};

use crate::{AnalysisError, EngineConfig};

/// Handle on the engine process that can be told to die.
pub trait EngineProcess: Send {
    /// Request termination without waiting for the process to exit.
    fn start_kill(&mut self) -> std::io::Result<()>;
}

impl EngineProcess for Child {
    fn start_kill(&mut self) -> std::io::Result<()> {
        Child::start_kill(self)
    }
}

/// What to search and how wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub fen: String,
    pub depth: u32,
    /// Number of candidate lines; `1` skips the option exchange.
    pub multipv: u32,
}

/// Progress of the UCI exchange for one search.
///
/// Each state names the acknowledgement the session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    /// `uci` sent, waiting for `uciok`.
    AwaitingIdentifyAck { multipv: u32 },
    /// `isready` sent, waiting for `readyok`.
    AwaitingReadyAck { multipv: u32 },
    /// `setoption` + `isready` sent, waiting for `readyok`.
    AwaitingOptionAck,
    /// `position` + `go` sent, waiting for `bestmove`.
    Searching,
    Done,
}

impl Handshake {
    pub fn new(multipv: u32) -> Self {
        Handshake::AwaitingIdentifyAck { multipv }
    }

    /// Next state after receiving `msg`. Unrelated lines leave the state unchanged.
    pub fn advance(self, msg: &EngineMessage) -> Handshake {
        match (self, msg) {
            (Handshake::AwaitingIdentifyAck { multipv }, EngineMessage::UciOk) => {
                Handshake::AwaitingReadyAck { multipv }
            }
            (Handshake::AwaitingReadyAck { multipv }, EngineMessage::ReadyOk) if multipv > 1 => {
                Handshake::AwaitingOptionAck
            }
            (Handshake::AwaitingReadyAck { .. }, EngineMessage::ReadyOk) => Handshake::Searching,
            (Handshake::AwaitingOptionAck, EngineMessage::ReadyOk) => Handshake::Searching,
            (Handshake::Searching, EngineMessage::BestMove { .. }) => Handshake::Done,
            (state, _) => state,
        }
    }

    /// Commands to write when entering this state.
    pub fn commands(&self, request: &SearchRequest) -> Vec<GuiCommand> {
        match self {
            Handshake::AwaitingIdentifyAck { .. } => vec![GuiCommand::Uci],
            Handshake::AwaitingReadyAck { .. } => vec![GuiCommand::IsReady],
            Handshake::AwaitingOptionAck => {
                vec![GuiCommand::multipv(request.multipv), GuiCommand::IsReady]
            }
            Handshake::Searching => vec![
                GuiCommand::position_fen(&request.fen),
                GuiCommand::Go(GoOptions::depth(request.depth)),
            ],
            Handshake::Done => Vec::new(),
        }
    }
}

/// Search output relevant to evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Info(EngineInfo),
    BestMove(String),
}

/// A single engine conversation.
pub struct EngineSession<R, W, P>
where
    P: EngineProcess,
{
    lines: Option<Lines<BufReader<R>>>,
    stdin: Option<W>,
    process: Option<P>,
    deadline: Option<Instant>,
    state: Handshake,
    engine_name: Option<String>,
    closed: bool,
}

impl EngineSession<ChildStdout, ChildStdin, Child> {
    /// Spawn the configured engine with piped stdio.
    ///
    /// The `timeout` covers the whole session, handshake included. Engine
    /// stderr is logged as warnings until the process exits.
    pub fn spawn(config: &EngineConfig, timeout: Duration) -> Result<Self, AnalysisError> {
        debug!(path = %config.engine_path, "spawning engine");
        let mut child = Command::new(&config.engine_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AnalysisError::from_spawn(&config.engine_path, e))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AnalysisError::EngineStream("failed to open engine stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::EngineStream("failed to open engine stdout".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            log_stderr(stderr);
        }

        Ok(Self::new(stdout, stdin, child, timeout))
    }
}

impl<R, W, P> EngineSession<R, W, P>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    P: EngineProcess,
{
    /// Wrap already-connected pipes.
    pub fn new(reader: R, writer: W, process: P, timeout: Duration) -> Self {
        Self {
            lines: Some(BufReader::new(reader).lines()),
            stdin: Some(writer),
            process: Some(process),
            deadline: Some(Instant::now() + timeout),
            state: Handshake::new(1),
            engine_name: None,
            closed: false,
        }
    }

    /// Name reported by `id name`, once the handshake has seen it.
    pub fn engine_name(&self) -> Option<&str> {
        self.engine_name.as_deref()
    }

    pub fn state(&self) -> Handshake {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run the handshake and issue the search.
    ///
    /// Returns once `position` and `go` have been written.
    pub async fn start(&mut self, request: &SearchRequest) -> Result<(), AnalysisError> {
        self.state = Handshake::new(request.multipv);
        let opening = self.state.commands(request);
        self.send_all(&opening).await?;

        while self.state != Handshake::Searching {
            let msg = self.next_message().await?;
            if let EngineMessage::Id {
                name: Some(name), ..
            } = &msg
            {
                self.engine_name = Some(name.clone());
            }

            let next = self.state.advance(&msg);
            if next != self.state {
                debug!(from = ?self.state, to = ?next, "handshake");
                self.state = next;
                self.send_all(&next.commands(request)).await?;
            }
        }

        if let Some(name) = &self.engine_name {
            debug!(engine = %name, depth = request.depth, "search started");
        }
        Ok(())
    }

    /// Next progress line or the final best move.
    ///
    /// Acknowledgements and other chatter are skipped.
    pub async fn next_event(&mut self) -> Result<SearchEvent, AnalysisError> {
        loop {
            let msg = self.next_message().await?;
            self.state = self.state.advance(&msg);
            match msg {
                EngineMessage::Info(info) => return Ok(SearchEvent::Info(info)),
                EngineMessage::BestMove { mv, .. } => return Ok(SearchEvent::BestMove(mv)),
                _ => continue,
            }
        }
    }

    /// Write one command line.
    pub async fn send(&mut self, command: &GuiCommand) -> Result<(), AnalysisError> {
        let line = command.to_uci();
        trace!("UCI >> {}", line);

        let deadline = self.deadline.ok_or_else(closed_error)?;
        let stdin = self.stdin.as_mut().ok_or_else(closed_error)?;
        let write = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        };

        let result = timeout_at(deadline, write).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "engine write failed");
                self.teardown();
                Err(AnalysisError::EngineStream(format!(
                    "failed to write to engine: {}",
                    e
                )))
            }
            Err(_) => {
                self.teardown();
                Err(AnalysisError::TimedOut)
            }
        }
    }

    async fn send_all(&mut self, commands: &[GuiCommand]) -> Result<(), AnalysisError> {
        for command in commands {
            self.send(command).await?;
        }
        Ok(())
    }

    /// Read and tokenize lines until one parses.
    ///
    /// Malformed `info` lines are logged and skipped; a malformed terminal
    /// line is fatal because the search result would be lost.
    async fn next_message(&mut self) -> Result<EngineMessage, AnalysisError> {
        loop {
            let line = self.read_line().await?;
            trace!("UCI << {}", line);

            match EngineMessage::parse(&line) {
                Ok(msg) => return Ok(msg),
                Err(e) if line.trim_start().starts_with("bestmove") => {
                    self.teardown();
                    return Err(AnalysisError::EngineStream(e.to_string()));
                }
                Err(e) => warn!(error = %e, line = %line, "skipping malformed engine line"),
            }
        }
    }

    async fn read_line(&mut self) -> Result<String, AnalysisError> {
        let deadline = self.deadline.ok_or_else(closed_error)?;
        let lines = self.lines.as_mut().ok_or_else(closed_error)?;

        let result = timeout_at(deadline, lines.next_line()).await;
        match result {
            Ok(Ok(Some(line))) => Ok(line),
            Ok(Ok(None)) => {
                warn!(state = ?self.state, "engine closed its output");
                self.teardown();
                Err(AnalysisError::EngineStream(
                    "engine closed unexpectedly".to_string(),
                ))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "engine read failed");
                self.teardown();
                Err(e.into())
            }
            Err(_) => {
                warn!(state = ?self.state, "engine timed out");
                self.teardown();
                Err(AnalysisError::TimedOut)
            }
        }
    }

    /// Ask the engine to quit, then tear down.
    pub async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        if let Some(stdin) = self.stdin.as_mut() {
            let line = format!("{}\n", GuiCommand::Quit.to_uci());
            trace!("UCI >> {}", line.trim_end());
            // Best effort: a dead engine cannot read it anyway.
            let _ = stdin.write_all(line.as_bytes()).await;
            let _ = stdin.flush().await;
        }
        self.teardown();
    }
}

impl<R, W, P> EngineSession<R, W, P>
where
    P: EngineProcess,
{
    /// Release every resource the session holds. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.lines = None;
        self.stdin = None;
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.start_kill() {
                debug!(error = %e, "engine already exited");
            }
        }
        self.deadline = None;
        debug!("engine session closed");
    }
}

impl<R, W, P> Drop for EngineSession<R, W, P>
where
    P: EngineProcess,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Log every stderr line of the engine until the pipe closes.
///
/// The task ends with the process; it yields the number of lines seen.
pub fn log_stderr<R>(stderr: R) -> JoinHandle<usize>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut seen = 0;
        while let Ok(Some(line)) = lines.next_line().await {
            seen += 1;
            warn!(target: "engine", "{}", line);
        }
        seen
    })
}

fn closed_error() -> AnalysisError {
    AnalysisError::EngineStream("engine session already closed".to_string())
}
