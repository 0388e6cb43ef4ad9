use chrono::{SecondsFormat, Utc};
use clap::Parser;
use maze_chase::board::{Board, Mover};
use maze_chase::constants::{
    get_difficulty_profile, COLLISION_POLL_MS, FRAME_MS, FRIGHTENED_DURATION_MS,
};
use maze_chase::engine::{GameSession, SessionOptions};
use maze_chase::types::{Difficulty, Direction, GameEvent, GameState, Snapshot, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_MAX_MS: u64 = 5 * 60_000;
const WANDER_CHANCE: f64 = 0.05;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless autopilot runs of the maze-chase engine")]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    difficulty: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated time budget per scenario.
    #[arg(long)]
    max_ms: Option<u64>,
    /// Text file with one layout row per line.
    #[arg(long)]
    layout: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    difficulty: Difficulty,
    seed: u64,
    #[serde(rename = "maxMs")]
    max_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Lost,
    Timeout,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u64,
    difficulty: Difficulty,
    outcome: Outcome,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    score: u32,
    level: u32,
    #[serde(rename = "levelsCleared")]
    levels_cleared: u32,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    #[serde(rename = "fruitsEaten")]
    fruits_eaten: u32,
    #[serde(rename = "livesLost")]
    lives_lost: u32,
    #[serde(rename = "bestCombo")]
    best_combo: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    #[serde(rename = "nowMs")]
    now_ms: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtIso")]
    started_at_iso: String,
    #[serde(rename = "finishedAtIso")]
    finished_at_iso: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampIso")]
    timestamp_iso: String,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(rename = "nowMs", skip_serializing_if = "Option::is_none")]
    now_ms: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let started_at_iso = now_iso();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, wall_clock_ms()));

    let layout = match cli.layout.as_deref().map(read_layout).transpose() {
        Ok(layout) => layout,
        Err(error) => {
            emit_log(
                "error",
                "layout_read_failed",
                &match_id,
                None,
                None,
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };

    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "difficulty": scenario.difficulty,
                "profile": get_difficulty_profile(scenario.difficulty),
                "maxMs": scenario.max_ms,
            }),
        );

        let options = SessionOptions {
            difficulty: scenario.difficulty,
            layout: layout.clone(),
            starting_lives: None,
        };
        let scenario_run = match run_scenario(&scenario, options) {
            Ok(run) => run,
            Err(error) => {
                emit_log(
                    "error",
                    "layout_rejected",
                    &match_id,
                    Some(&scenario.name),
                    Some(scenario.seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.now_ms),
                json!({ "message": anomaly.message }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.result.duration_ms),
            json!({
                "outcome": scenario_run.result.outcome,
                "score": scenario_run.result.score,
                "level": scenario_run.result.level,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => emit_log(
                "error",
                "scenario_result_unserializable",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                None,
                json!({ "error": error.to_string() }),
            ),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        started_at_iso,
        now_iso(),
        scenario_results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageScore": summary.average_score,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

/// Drives one session the way the interactive loop does: frames every
/// `FRAME_MS`, collision polls every `COLLISION_POLL_MS`.
fn run_scenario(
    scenario: &Scenario,
    options: SessionOptions,
) -> Result<ScenarioRunResult, maze_chase::board::BoardError> {
    let mut session = GameSession::new(options, 0)?;
    let mut rng = StdRng::seed_from_u64(scenario.seed);
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut levels_cleared = 0u32;
    let mut last_score = 0u32;
    let mut next_poll_at = COLLISION_POLL_MS;
    let mut now = 0u64;
    let mut outcome = Outcome::Timeout;

    while now < scenario.max_ms {
        now += FRAME_MS;
        let snapshot = session.build_snapshot(false);
        if let Some(dir) = autopilot_direction(&session.board, &snapshot, &mut rng) {
            session.set_direction(dir);
        }
        session.tick(now);
        while next_poll_at <= now {
            session.poll_collisions(next_poll_at);
            next_poll_at += COLLISION_POLL_MS;
        }

        let snapshot = session.build_snapshot(true);
        for message in collect_snapshot_anomalies(&session.board, &snapshot, last_score) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                now,
                message,
            );
        }
        last_score = snapshot.score;
        levels_cleared += snapshot
            .events
            .iter()
            .filter(|event| matches!(event, GameEvent::Won { .. }))
            .count() as u32;

        if snapshot.state == GameState::Lost {
            outcome = Outcome::Lost;
            break;
        }
    }

    let summary = session.summary();
    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            difficulty: scenario.difficulty,
            outcome,
            duration_ms: summary.duration_ms,
            score: summary.score,
            level: summary.level,
            levels_cleared,
            pellets_eaten: summary.stats.pellets_eaten,
            ghosts_eaten: summary.stats.ghosts_eaten,
            fruits_eaten: summary.stats.fruits_eaten,
            lives_lost: summary.stats.lives_lost,
            best_combo: summary.stats.best_combo,
            anomalies,
        },
        anomaly_records,
    })
}

/// Breadth-first search to the nearest pellet, treating cells next to a
/// dangerous ghost as blocked. Falls back to a random legal turn.
fn autopilot_direction(board: &Board, snapshot: &Snapshot, rng: &mut StdRng) -> Option<Direction> {
    let start = Vec2::new(snapshot.player.x, snapshot.player.y);
    let legal = board.legal_neighbors(start, Mover::Player);
    if legal.is_empty() {
        return None;
    }
    if rng.random_bool(WANDER_CHANCE) {
        return Some(legal[rng.random_range(0..legal.len())].0);
    }

    let threats: Vec<Vec2> = snapshot
        .ghosts
        .iter()
        .filter(|ghost| !ghost.eaten && !ghost.frightened)
        .map(|ghost| Vec2::new(ghost.x, ghost.y))
        .collect();
    let blocked = |cell: Vec2| {
        threats
            .iter()
            .any(|threat| (threat.x - cell.x).abs() + (threat.y - cell.y).abs() <= 1)
    };

    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::new();
    for (dir, next) in &legal {
        if !blocked(*next) && seen.insert(*next) {
            queue.push_back((*dir, *next));
        }
    }
    while let Some((first, pos)) = queue.pop_front() {
        if board.cell(pos.x, pos.y).is_consumable() {
            return Some(first);
        }
        for (_, next) in board.legal_neighbors(pos, Mover::Player) {
            if !blocked(next) && seen.insert(next) {
                queue.push_back((first, next));
            }
        }
    }
    Some(legal[rng.random_range(0..legal.len())].0)
}

fn collect_snapshot_anomalies(board: &Board, snapshot: &Snapshot, last_score: u32) -> Vec<String> {
    let mut anomalies = Vec::new();
    if snapshot.state == GameState::Playing && snapshot.score < last_score {
        anomalies.push(format!(
            "score decreased while playing: {} -> {}",
            last_score, snapshot.score
        ));
    }
    if snapshot.pellets_remaining > board.total_pellets() {
        anomalies.push(format!(
            "pellets remaining out of range: {}/{}",
            snapshot.pellets_remaining,
            board.total_pellets()
        ));
    }
    if snapshot.level == 0 {
        anomalies.push("level dropped below 1".to_string());
    }
    if snapshot.frightened_remaining_ms > FRIGHTENED_DURATION_MS {
        anomalies.push(format!(
            "frightened window too long: {}",
            snapshot.frightened_remaining_ms
        ));
    }
    if !board.is_walkable(snapshot.player.x, snapshot.player.y, Mover::Player) {
        anomalies.push(format!(
            "player inside wall at ({}, {})",
            snapshot.player.x, snapshot.player.y
        ));
    }
    for ghost in &snapshot.ghosts {
        if !board.is_walkable(ghost.x, ghost.y, Mover::Ghost) {
            anomalies.push(format!(
                "ghost inside wall: {:?} at ({}, {})",
                ghost.role, ghost.x, ghost.y
            ));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(wall_clock_ms);
    let max_ms = cli.max_ms.unwrap_or(DEFAULT_MAX_MS).max(FRAME_MS);

    if cli.single || cli.difficulty.is_some() {
        let difficulty = cli
            .difficulty
            .as_deref()
            .and_then(Difficulty::parse)
            .unwrap_or(Difficulty::Normal);
        return vec![Scenario {
            name: format!("custom-{}", difficulty_key(difficulty)),
            difficulty,
            seed,
            max_ms,
        }];
    }

    [Difficulty::Casual, Difficulty::Normal, Difficulty::Nightmare]
        .into_iter()
        .enumerate()
        .map(|(idx, difficulty)| Scenario {
            name: format!("autopilot-{}", difficulty_key(difficulty)),
            difficulty,
            seed: seed.wrapping_add(idx as u64),
            max_ms,
        })
        .collect()
}

fn read_layout(path: &Path) -> io::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    now_ms: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        now_ms,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u64, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_iso: String,
    finished_at_iso: String,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_score: u64 = scenarios.iter().map(|s| s.score as u64).sum();
    let average_score = if scenario_count == 0 {
        0
    } else {
        (total_score / scenario_count as u64) as u32
    };
    RunSummary {
        match_id,
        started_at_iso,
        finished_at_iso,
        scenario_count,
        anomaly_count,
        average_score,
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u64>,
    now_ms: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_iso: now_iso(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        now_ms,
        details,
    };
    if let Ok(line) = serde_json::to_string(&log_line) {
        eprintln!("{line}");
    }
}

fn outcome_key(outcome: Outcome) -> String {
    match outcome {
        Outcome::Lost => "lost",
        Outcome::Timeout => "timeout",
    }
    .to_string()
}

fn difficulty_key(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Casual => "casual",
        Difficulty::Normal => "normal",
        Difficulty::Hard => "hard",
        Difficulty::Nightmare => "nightmare",
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_scenario_result(outcome: Outcome, score: u32) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            difficulty: Difficulty::Normal,
            outcome,
            duration_ms: 60_000,
            score,
            level: 1,
            levels_cleared: 0,
            pellets_eaten: 0,
            ghosts_eaten: 0,
            fruits_eaten: 0,
            lives_lost: 0,
            best_combo: 0,
            anomalies: Vec::new(),
        }
    }

    fn scenario(difficulty: Difficulty, seed: u64, max_ms: u64) -> Scenario {
        Scenario {
            name: "test".to_string(),
            difficulty,
            seed,
            max_ms,
        }
    }

    #[test]
    fn default_match_id_contains_seed_and_timestamp() {
        assert_eq!(default_match_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_score() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            "a".to_string(),
            "b".to_string(),
            vec![
                make_scenario_result(Outcome::Timeout, 1_000),
                make_scenario_result(Outcome::Lost, 3_000),
            ],
            BTreeMap::from([("timeout".to_string(), 1usize), ("lost".to_string(), 1usize)]),
            1,
        );
        assert_eq!(summary.average_score, 2_000);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("maze-chase-missing-{}", wall_clock_ms()))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            "a".to_string(),
            "b".to_string(),
            vec![make_scenario_result(Outcome::Timeout, 0)],
            BTreeMap::from([("timeout".to_string(), 1usize)]),
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same anomaly".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same anomaly".to_string());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].now_ms, 10);
        assert_eq!(records[1].now_ms, 11);
    }

    #[test]
    fn resolve_scenarios_defaults_to_three_difficulties() {
        let cli = Cli::parse_from(["simulate", "--seed", "7"]);
        let scenarios = resolve_scenarios(&cli);
        assert_eq!(scenarios.len(), 3);
        assert_eq!(scenarios[0].seed, 7);
        assert_eq!(scenarios[2].difficulty, Difficulty::Nightmare);

        let cli = Cli::parse_from(["simulate", "--difficulty", "hard", "--max-ms", "1000"]);
        let scenarios = resolve_scenarios(&cli);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].difficulty, Difficulty::Hard);
        assert_eq!(scenarios[0].max_ms, 1_000);
    }

    #[test]
    fn autopilot_heads_for_nearest_pellet() {
        let mut session = GameSession::new(
            SessionOptions {
                layout: Some(
                    ["##########", "#   P  . #", "######## #", "#GGGG    #", "##########"]
                        .iter()
                        .map(|row| row.to_string())
                        .collect(),
                ),
                ..SessionOptions::default()
            },
            0,
        )
        .expect("layout parses");
        let snapshot = session.build_snapshot(false);
        let mut rng = StdRng::seed_from_u64(3);
        let rightward = (0..100)
            .filter(|_| {
                autopilot_direction(&session.board, &snapshot, &mut rng) == Some(Direction::Right)
            })
            .count();
        assert!(rightward >= 80, "autopilot went right {rightward} times");
    }

    #[test]
    fn scenario_runs_clean_on_classic_board() {
        let run = run_scenario(&scenario(Difficulty::Normal, 11, 60_000), SessionOptions::default())
            .expect("classic layout parses");
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
        assert!(run.result.pellets_eaten > 0);
        assert!(run.result.duration_ms <= 60_000);
    }

    #[test]
    fn anomaly_check_flags_falling_score() {
        let mut session = GameSession::new(SessionOptions::default(), 0).expect("classic");
        let snapshot = session.build_snapshot(false);
        let anomalies = collect_snapshot_anomalies(&session.board, &snapshot, 50);
        assert_eq!(anomalies, vec!["score decreased while playing: 50 -> 0".to_string()]);
        assert!(collect_snapshot_anomalies(&session.board, &snapshot, 0).is_empty());
    }
}
