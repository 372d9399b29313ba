//! Proctor - exam proctoring decision engine CLI
//!
//! The `proctor` command drives the decision engine from the terminal.
//!
//! ## Commands
//!
//! - `run`: Replay a scenario file of violation events through the engine
//! - `parse`: Resolve a raw oracle reply to a decision token
//! - `score`: Recompute the integrity score from an exported report

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, Level};

use proctor_core::fakes::StaticOracle;
use proctor_core::{
    parse_decision, read_report, write_report_csv, write_report_json, EngineConfig, ExamConfig,
    HttpOracleClient, OracleClient, OracleConfig, ProctoringEngine, Severity, ViolationEvent,
    ViolationKind, METRICS,
};

#[derive(Parser)]
#[command(name = "proctor")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Exam proctoring decision engine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file of violation events through the engine
    Run {
        /// Scenario file: one JSON event per line
        scenario: PathBuf,

        /// Exam name for the session
        #[arg(long, default_value = "scenario-exam")]
        exam_name: String,

        /// Candidate identifier
        #[arg(long, default_value = "candidate")]
        candidate: String,

        /// Exam duration in minutes
        #[arg(long, default_value = "60")]
        duration: u32,

        /// Chat-completions endpoint for the advisory oracle
        #[arg(long, env = "PROCTOR_ORACLE_URL")]
        oracle_url: Option<String>,

        /// Model identifier sent to the oracle
        #[arg(long, env = "PROCTOR_ORACLE_MODEL")]
        model: Option<String>,

        /// Skip the network and answer every consultation with this reply
        #[arg(long)]
        offline_reply: Option<String>,

        /// Override the sliding window length, in seconds
        #[arg(long)]
        window_secs: Option<u64>,

        /// Override the oracle cooldown, in seconds
        #[arg(long)]
        cooldown_secs: Option<u64>,

        /// Override the termination grace delay, in milliseconds
        #[arg(long)]
        grace_ms: Option<u64>,

        /// Override the warning notice lifetime, in milliseconds
        #[arg(long)]
        notice_ttl_ms: Option<u64>,

        /// How long to wait after the last event for pending decisions, in ms
        #[arg(long, default_value = "3000")]
        settle_ms: u64,

        /// Directory to write report.json and report.csv into
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Resolve a raw oracle reply to a decision token
    Parse {
        /// Reply text; reads stdin when omitted
        reply: Option<String>,
    },

    /// Recompute the integrity score from an exported report
    Score {
        /// Path to a report.json produced by `run`
        report: PathBuf,
    },
}

/// One line of a scenario file.
#[derive(Debug, Deserialize)]
struct ScenarioStep {
    /// Milliseconds to wait before emitting this event.
    #[serde(default)]
    delay_ms: u64,
    #[serde(rename = "type")]
    kind: ViolationKind,
    severity: Severity,
    confidence: Option<f64>,
    detail: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    proctor_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            scenario,
            exam_name,
            candidate,
            duration,
            oracle_url,
            model,
            offline_reply,
            window_secs,
            cooldown_secs,
            grace_ms,
            notice_ttl_ms,
            settle_ms,
            report_dir,
        } => {
            // Flags override the PROCTOR_* environment.
            let mut config = EngineConfig::from_env();
            if let Some(secs) = window_secs {
                config.policy.window_secs = secs;
            }
            if let Some(secs) = cooldown_secs {
                config.cooldown_secs = secs;
            }
            if let Some(ms) = grace_ms {
                config.termination_grace_ms = ms;
            }
            if let Some(ms) = notice_ttl_ms {
                config.notice_ttl_ms = ms;
            }
            cmd_run(
                &scenario,
                config,
                exam_name,
                candidate,
                duration,
                oracle_url.as_deref(),
                model.as_deref(),
                offline_reply.as_deref(),
                settle_ms,
                report_dir.as_deref(),
            )
            .await
        }
        Commands::Parse { reply } => cmd_parse(reply),
        Commands::Score { report } => cmd_score(&report),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    scenario: &Path,
    config: EngineConfig,
    exam_name: String,
    candidate: String,
    duration: u32,
    oracle_url: Option<&str>,
    model: Option<&str>,
    offline_reply: Option<&str>,
    settle_ms: u64,
    report_dir: Option<&Path>,
) -> Result<()> {
    let steps = load_scenario(scenario)?;
    info!(steps = steps.len(), "scenario loaded");

    let client: Arc<dyn OracleClient> = match offline_reply {
        Some(reply) => Arc::new(StaticOracle::text(reply)),
        None => {
            let mut oracle_config = OracleConfig::from_env();
            if let Some(url) = oracle_url {
                oracle_config.endpoint = url.to_string();
            }
            if let Some(model) = model {
                oracle_config.model = model.to_string();
            }
            Arc::new(HttpOracleClient::new(oracle_config))
        }
    };

    let engine = ProctoringEngine::new(config, client);
    let session = engine.start_session(ExamConfig {
        exam_name,
        candidate_id: candidate,
        duration_minutes: duration,
    })?;
    println!("session {} started", session.id);

    for step in steps {
        if step.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(step.delay_ms)).await;
        }
        let mut event = ViolationEvent::new(step.kind, step.severity, Utc::now());
        if let Some(confidence) = step.confidence {
            event = event.with_confidence(confidence);
        }
        if let Some(detail) = step.detail {
            event = event.with_detail(detail);
        }
        engine.emit_violation(event);
    }

    // Let in-flight consultations and grace delays resolve.
    tokio::time::sleep(std::time::Duration::from_millis(settle_ms)).await;

    if engine.status().is_active() {
        engine.end_session()?;
    }

    let report = engine.export_report();
    println!("status:     {}", engine.status());
    println!("violations: {}", report.violations.len());
    println!("score:      {:.1}", engine.score());
    if let Some(decision) = engine.last_decision() {
        println!(
            "decision:   {}{}",
            decision.decision,
            decision
                .reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default()
        );
    }

    if let Some(dir) = report_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating report dir {}", dir.display()))?;
        let json_path = dir.join("report.json");
        let csv_path = dir.join("report.csv");
        write_report_json(&report, &json_path)?;
        write_report_csv(&report, &csv_path)?;
        println!("report:     {}", json_path.display());
    }

    METRICS.flush();
    Ok(())
}

fn cmd_parse(reply: Option<String>) -> Result<()> {
    let raw = match reply {
        Some(text) => text,
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading reply from stdin")?;
            buf
        }
    };
    let result = parse_decision(&raw);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_score(report_path: &Path) -> Result<()> {
    let report = read_report(report_path)
        .with_context(|| format!("reading report {}", report_path.display()))?;
    if !report.verify_integrity() {
        anyhow::bail!("report digest mismatch: file has been modified");
    }
    let score = proctor_core::integrity_score(&report.violations);
    println!("violations: {}", report.violations.len());
    println!("score:      {score:.1}");
    Ok(())
}

fn load_scenario(path: &Path) -> Result<Vec<ScenarioStep>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let mut steps = Vec::new();
    for (lineno, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step: ScenarioStep = serde_json::from_str(line)
            .with_context(|| format!("scenario line {}", lineno + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_scenario_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.jsonl");
        std::fs::write(
            &path,
            r#"# warmup
{"type": "GAZE_OFF_SCREEN", "severity": "WARNING"}

{"delay_ms": 10, "type": "MULTIPLE_FACES", "severity": "CRITICAL", "confidence": 0.95, "detail": "second face"}
"#,
        )
        .unwrap();

        let steps = load_scenario(&path).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].delay_ms, 0);
        assert_eq!(steps[1].confidence, Some(0.95));
    }

    #[test]
    fn test_load_scenario_rejects_unknown_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.jsonl");
        std::fs::write(&path, r#"{"type": "PHONE_CALL", "severity": "MAJOR"}"#).unwrap();
        assert!(load_scenario(&path).is_err());
    }
}
