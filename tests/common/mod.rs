//! Shared helpers: an in-memory UCI engine and unique temp paths.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chess_core::{Color, PositionTracker};
use replay_worker::{EngineOptions, EngineSession, ReplayError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

pub type StubSession = EngineSession<WriteHalf<DuplexStream>, ReadHalf<DuplexStream>>;

/// How the stub engine answers
#[derive(Clone, Debug, Default)]
pub struct StubBehavior {
    /// Score after `n` plies is `cp_base + cp_step * n`
    pub cp_base: i32,
    pub cp_step: i32,
    /// Finish each search with a `score mate N` line
    pub mate: Option<i32>,
    /// Leave the `Fen:` line out of `d`
    pub omit_fen: bool,
    /// Never answer `go depth`
    pub silent_search: bool,
    /// Never answer `d`, nor the `isready` that follows it
    pub silent_diagnostic: bool,
    /// Never answer anything
    pub mute: bool,
    /// Terminate lines with CRLF
    pub crlf: bool,
}

/// Handle on a running stub engine
pub struct StubEngine {
    commands: Arc<Mutex<Vec<String>>>,
}

impl StubEngine {
    /// Commands received so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Wait until the stub has received `cmd`
    pub async fn wait_for_command(&self, cmd: &str) -> bool {
        for _ in 0..100 {
            if self.commands().iter().any(|c| c == cmd) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

/// Legal-move count the stub reports after `plies` moves
pub fn stub_legal_moves(plies: usize) -> u32 {
    20 + plies as u32
}

/// Options with a short read timeout so a broken test fails fast
pub fn test_options() -> EngineOptions {
    EngineOptions {
        read_timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    }
}

/// Start a stub engine and connect a session to it
pub async fn try_attach_stub(
    behavior: StubBehavior,
    options: EngineOptions,
) -> (Result<StubSession, ReplayError>, StubEngine) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let commands = Arc::new(Mutex::new(Vec::new()));
    tokio::spawn(run_stub(server, behavior, commands.clone()));

    let (reader, writer) = tokio::io::split(client);
    let session = EngineSession::attach(writer, reader, options).await;
    (session, StubEngine { commands })
}

pub async fn attach_stub(behavior: StubBehavior, options: EngineOptions) -> (StubSession, StubEngine) {
    let (session, stub) = try_attach_stub(behavior, options).await;
    (session.expect("stub handshake failed"), stub)
}

async fn run_stub(stream: DuplexStream, behavior: StubBehavior, commands: Arc<Mutex<Vec<String>>>) {
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();
    let mut tracker = PositionTracker::new();
    let mut plies = 0usize;
    let mut after_diagnostic = false;

    while let Ok(Some(cmd)) = lines.next_line().await {
        commands.lock().unwrap().push(cmd.clone());
        if behavior.mute {
            continue;
        }

        let silenced = behavior.silent_diagnostic && (cmd == "d" || after_diagnostic);
        after_diagnostic = cmd == "d";
        if silenced {
            continue;
        }

        let reply = match cmd.as_str() {
            "uci" => "id name StubFish\nid author tests\nuciok\n".to_string(),
            "isready" => "readyok\n".to_string(),
            "go perft 1" => perft_reply(stub_legal_moves(plies)),
            "d" => diagnostic_reply(&tracker, plies, behavior.omit_fen),
            "quit" => break,
            c if c.starts_with("position startpos") => {
                tracker.reset();
                plies = 0;
                if let Some((_, moves)) = c.split_once(" moves ") {
                    for mv in moves.split_whitespace() {
                        tracker.apply(mv);
                        plies += 1;
                    }
                }
                String::new()
            }
            c if c.starts_with("go depth") => {
                if behavior.silent_search {
                    String::new()
                } else {
                    search_reply(&behavior, plies)
                }
            }
            _ => String::new(),
        };

        let reply = if behavior.crlf {
            reply.replace('\n', "\r\n")
        } else {
            reply
        };
        if writer.write_all(reply.as_bytes()).await.is_err() {
            break;
        }
    }
}

fn perft_reply(count: u32) -> String {
    let mut out = String::new();
    for i in 0..count {
        out.push_str(&format!("move{i:02}: 1\n"));
    }
    out.push_str(&format!("\nNodes searched: {count}\n\n"));
    out
}

fn search_reply(behavior: &StubBehavior, plies: usize) -> String {
    let cp = behavior.cp_base + behavior.cp_step * plies as i32;
    let mut out = String::from("info string NNUE evaluation using nn-stub.nnue\n");
    out.push_str(&format!("info depth 1 seldepth 1 score cp {} nodes 20 pv e2e4\n", cp - 7));
    out.push_str(&format!("info depth 2 seldepth 3 score cp {cp} nodes 90 pv e2e4 e7e5\n"));
    if let Some(mate) = behavior.mate {
        out.push_str(&format!("info depth 3 seldepth 5 score mate {mate} nodes 400 pv d1h5\n"));
    }
    out.push_str("bestmove e2e4 ponder e7e5\n");
    out
}

fn diagnostic_reply(tracker: &PositionTracker, plies: usize, omit_fen: bool) -> String {
    let side = match Color::for_ply(plies) {
        Color::White => 'w',
        Color::Black => 'b',
    };
    let mut out = String::from("\n +---+---+---+---+---+---+---+---+\n (board omitted)\n\n");
    if !omit_fen {
        out.push_str(&format!("Fen: {} {side} KQkq - 0 1\n", tracker.placement_fen()));
    }
    out.push_str("Key: 8F8F01D4562F59FB\nCheckers: \n");
    out
}

/// FEN the stub reports for a placement with `side` to move
pub fn stub_fen(placement: &str, side: char) -> String {
    format!("{placement} {side} KQkq - 0 1")
}

/// Minimal UCI engine as a shell script: completes the handshake, exits
/// on any `go` or `quit`.
pub const SHELL_ENGINE: &str = r#"#!/bin/sh
while read -r cmd; do
  case "$cmd" in
    uci) echo "id name ShellStub"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*|quit) exit 0 ;;
  esac
done
"#;

/// Write `SHELL_ENGINE` to an executable temp file
#[cfg(unix)]
pub fn write_shell_engine(name: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = temp_path(name);
    std::fs::write(&path, SHELL_ENGINE).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Start a session on `path`, retrying while the freshly written script is
/// still busy (ETXTBSY when another test thread forked with it open)
pub async fn start_process_engine(path: &std::path::Path) -> EngineSession {
    let path = path.to_str().unwrap();
    let mut last_err = None;
    for _ in 0..20 {
        let mut session = EngineSession::new(test_options());
        match session.start(path).await {
            Ok(()) => return session,
            Err(e) => last_err = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("engine did not start: {last_err:?}");
}

/// Generate a unique suffix based on timestamp to avoid collisions.
pub fn unique_suffix() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}", ts % 1_000_000_000)
}

/// Fresh path under the system temp dir
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("replay-{}-{name}", unique_suffix()))
}
