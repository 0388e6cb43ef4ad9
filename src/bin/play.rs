use chrono::{SecondsFormat, Utc};
use clap::Parser;
use maze_chase::constants::{COLLISION_POLL_MS, FRAME_MS};
use maze_chase::engine::{GameSession, SessionOptions};
use maze_chase::types::{Difficulty, Direction};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs one maze-chase session driven by stdin")]
struct Cli {
    #[arg(long, default_value = "normal")]
    difficulty: String,
    /// Text file with one layout row per line.
    #[arg(long)]
    layout: Option<PathBuf>,
    #[arg(long)]
    lives: Option<u32>,
    /// How often a snapshot line is written to stdout.
    #[arg(long, default_value_t = 100)]
    snapshot_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Input {
        dir: Option<String>,
        dx: Option<i32>,
        dy: Option<i32>,
    },
    Restart,
    Quit,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampIso")]
    timestamp_iso: String,
    level: String,
    event: String,
    #[serde(rename = "nowMs", skip_serializing_if = "Option::is_none")]
    now_ms: Option<u64>,
    details: Value,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Turn(Direction),
    Vector(i32, i32),
    Restart,
    Quit,
}

/// Accepts either a JSON message or a bare word (`up`, `restart`, ...) or a `dx dy` pair.
fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.starts_with('{') {
        return match serde_json::from_str::<ClientMessage>(line).ok()? {
            ClientMessage::Input { dir: Some(dir), .. } => {
                Direction::parse_move(&dir).map(Command::Turn)
            }
            ClientMessage::Input {
                dx: Some(dx),
                dy: Some(dy),
                ..
            } => Some(Command::Vector(dx, dy)),
            ClientMessage::Input { .. } => None,
            ClientMessage::Restart => Some(Command::Restart),
            ClientMessage::Quit => Some(Command::Quit),
        };
    }

    match line {
        "restart" | "r" => return Some(Command::Restart),
        "quit" | "q" => return Some(Command::Quit),
        _ => {}
    }
    if let Some(dir) = Direction::parse_move(line) {
        return Some(Command::Turn(dir));
    }
    let mut parts = line.split_whitespace();
    let dx = parts.next()?.parse().ok()?;
    let dy = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Command::Vector(dx, dy))
}

fn read_layout(path: &Path) -> std::io::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

fn emit(value: Value) {
    println!("{value}");
}

fn emit_log(level: &str, event: &str, now_ms: Option<u64>, details: Value) {
    let log_line = StructuredLogLine {
        timestamp_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        level: level.to_string(),
        event: event.to_string(),
        now_ms,
        details,
    };
    if let Ok(line) = serde_json::to_string(&log_line) {
        eprintln!("{line}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let difficulty = Difficulty::parse(&cli.difficulty).unwrap_or(Difficulty::Normal);
    let layout = match cli.layout.as_deref().map(read_layout).transpose() {
        Ok(layout) => layout,
        Err(error) => {
            emit_log(
                "error",
                "layout_read_failed",
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };

    let started = Instant::now();
    let now_ms = || started.elapsed().as_millis() as u64;

    let mut session = match GameSession::new(
        SessionOptions {
            difficulty,
            layout,
            starting_lives: cli.lives,
        },
        now_ms(),
    ) {
        Ok(session) => session,
        Err(error) => {
            emit_log(
                "error",
                "layout_rejected",
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };
    emit_log(
        "info",
        "session_started",
        Some(session.started_at_ms),
        json!({
            "width": session.board.width,
            "height": session.board.height,
            "difficulty": session.difficulty,
            "profile": session.profile,
        }),
    );

    let mut frame = tokio::time::interval(Duration::from_millis(FRAME_MS));
    let mut poll = tokio::time::interval(Duration::from_millis(COLLISION_POLL_MS));
    let mut snapshot = tokio::time::interval(Duration::from_millis(cli.snapshot_ms.max(FRAME_MS)));
    for interval in [&mut frame, &mut poll, &mut snapshot] {
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // Every mutation happens on this task, so a move and its pickups are
    // always visible to the next poll.
    loop {
        tokio::select! {
            _ = frame.tick() => session.tick(now_ms()),
            _ = poll.tick() => session.poll_collisions(now_ms()),
            _ = snapshot.tick() => {
                emit(json!({ "type": "state", "snapshot": session.build_snapshot(true) }));
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(Command::Turn(dir)) => session.set_direction(dir),
                    Some(Command::Vector(dx, dy)) => {
                        if !session.set_direction_vector(dx, dy) {
                            emit_log(
                                "warn",
                                "input_ignored",
                                Some(now_ms()),
                                json!({ "dx": dx, "dy": dy }),
                            );
                        }
                    }
                    Some(Command::Restart) => session.restart(now_ms()),
                    Some(Command::Quit) => break,
                    None => emit_log(
                        "warn",
                        "input_unrecognized",
                        Some(now_ms()),
                        json!({ "line": line }),
                    ),
                },
                Ok(None) => stdin_open = false,
                Err(error) => {
                    emit_log(
                        "error",
                        "stdin_failed",
                        Some(now_ms()),
                        json!({ "error": error.to_string() }),
                    );
                    stdin_open = false;
                }
            },
            _ = &mut ctrl_c => break,
        }
    }

    session.stop();
    let summary = session.summary();
    emit_log(
        "info",
        "session_stopped",
        Some(now_ms()),
        json!({ "score": summary.score, "level": summary.level, "state": summary.state }),
    );
    emit(json!({ "type": "game_over", "summary": summary }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_words_and_vectors() {
        assert_eq!(parse_command("up"), Some(Command::Turn(Direction::Up)));
        assert_eq!(parse_command(" left \n"), Some(Command::Turn(Direction::Left)));
        assert_eq!(parse_command("0 1"), Some(Command::Vector(0, 1)));
        assert_eq!(parse_command("r"), Some(Command::Restart));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
        assert_eq!(parse_command("1 2 3"), None);
        assert_eq!(parse_command("sideways"), None);
    }

    #[test]
    fn log_line_skips_missing_clock() {
        let line = StructuredLogLine {
            timestamp_iso: "2026-01-01T00:00:00.000Z".to_string(),
            level: "info".to_string(),
            event: "session_started".to_string(),
            now_ms: None,
            details: json!({ "width": 21 }),
        };
        let value = serde_json::to_value(&line).expect("log line serializes");
        assert_eq!(value["event"], "session_started");
        assert_eq!(value["details"]["width"], 21);
        assert!(value.get("nowMs").is_none());
    }

    #[test]
    fn parses_json_messages() {
        assert_eq!(
            parse_command(r#"{"type":"input","dir":"right"}"#),
            Some(Command::Turn(Direction::Right))
        );
        assert_eq!(
            parse_command(r#"{"type":"input","dx":-1,"dy":0}"#),
            Some(Command::Vector(-1, 0))
        );
        assert_eq!(parse_command(r#"{"type":"restart"}"#), Some(Command::Restart));
        assert_eq!(parse_command(r#"{"type":"input"}"#), None);
        assert_eq!(parse_command(r#"{"type":"dance"}"#), None);
    }
}
