//! Integration tests for the full escalation pipeline with oracle fakes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use proctor_core::fakes::{SequenceOracle, SlowOracle, StaticOracle};
use proctor_core::{
    write_report_csv, write_report_json, Decision, EngineConfig, ExamConfig, ProctoringEngine,
    SessionStatus, Severity, ViolationEvent, ViolationKind,
};

fn test_config() -> EngineConfig {
    EngineConfig {
        termination_grace_ms: 20,
        notice_ttl_ms: 40,
        ..EngineConfig::default()
    }
}

fn exam() -> ExamConfig {
    ExamConfig {
        exam_name: "calculus-final".to_string(),
        candidate_id: "cand-314".to_string(),
        duration_minutes: 120,
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within timeout");
}

/// Test: a burst of MAJOR violations crosses the threshold, the oracle
/// orders termination, and the session ends with the full audit trail.
#[tokio::test]
async fn test_major_burst_ends_exam() {
    let engine = ProctoringEngine::new(
        test_config(),
        Arc::new(StaticOracle::text("END_EXAM\nRepeated collaboration signals.")),
    );
    engine.start_session(exam()).unwrap();

    for _ in 0..3 {
        engine.emit_violation(ViolationEvent::new(
            ViolationKind::MultipleVoices,
            Severity::Major,
            Utc::now(),
        ));
    }

    let e = engine.clone();
    wait_until(move || e.status() == SessionStatus::Terminated).await;

    let violations = engine.violations();
    assert_eq!(violations.len(), 4, "3 source events + 1 synthetic decision");
    let synthetic = violations.last().unwrap();
    assert_eq!(
        synthetic.kind,
        ViolationKind::AgentDecision(Decision::EndExam)
    );
    assert_eq!(synthetic.severity, Severity::Critical);
    assert_eq!(
        synthetic.detail.as_deref(),
        Some("Repeated collaboration signals.")
    );

    let decision = engine.last_decision().unwrap();
    assert_eq!(decision.decision, Decision::EndExam);
}

/// Test: sub-threshold noise never reaches the oracle.
#[tokio::test]
async fn test_below_threshold_never_consults_oracle() {
    let oracle = Arc::new(StaticOracle::text("END_EXAM"));
    let engine = ProctoringEngine::new(test_config(), oracle.clone());
    engine.start_session(exam()).unwrap();

    // 2 MAJOR + 4 WARNING: below every threshold.
    for _ in 0..2 {
        engine.emit_violation(ViolationEvent::new(
            ViolationKind::SpeechDetected,
            Severity::Major,
            Utc::now(),
        ));
    }
    for _ in 0..4 {
        engine.emit_violation(ViolationEvent::new(
            ViolationKind::GazeOffScreen,
            Severity::Warning,
            Utc::now(),
        ));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(oracle.call_count(), 0);
    assert_eq!(engine.status(), SessionStatus::InProgress);
}

/// Test: five warnings escalate; a FLASH_WARNING leaves the session
/// running with a visible notice and a MAJOR synthetic entry.
#[tokio::test]
async fn test_warning_burst_flashes_notice() {
    let engine = ProctoringEngine::new(
        test_config(),
        Arc::new(StaticOracle::text("FLASH_WARNING\nStay in frame.")),
    );
    engine.start_session(exam()).unwrap();

    for _ in 0..5 {
        engine.emit_violation(ViolationEvent::new(
            ViolationKind::FaceTurnedAway,
            Severity::Warning,
            Utc::now(),
        ));
    }

    let e = engine.clone();
    wait_until(move || e.current_notice().is_some()).await;

    assert_eq!(engine.status(), SessionStatus::InProgress);
    assert_eq!(engine.current_notice().unwrap().text, "Stay in frame.");
    let synthetic = engine
        .violations()
        .into_iter()
        .find(|v| v.kind == ViolationKind::AgentDecision(Decision::FlashWarning))
        .expect("synthetic FLASH_WARNING event");
    assert_eq!(synthetic.severity, Severity::Major);

    // The notice self-clears.
    let e = engine.clone();
    wait_until(move || e.current_notice().is_none()).await;
    assert_eq!(engine.status(), SessionStatus::InProgress);
}

/// Test: the score reflects confidence-weighted deductions across the
/// whole pipeline, synthetic events included.
#[tokio::test]
async fn test_score_accounts_for_synthetic_events() {
    let engine = ProctoringEngine::new(
        test_config(),
        Arc::new(StaticOracle::text("FLASH_WARNING")),
    );
    engine.start_session(exam()).unwrap();
    assert_eq!(engine.score(), 100.0);

    engine.emit_violation(
        ViolationEvent::new(ViolationKind::MultipleFaces, Severity::Critical, Utc::now())
            .with_confidence(1.0),
    );

    let e = engine.clone();
    wait_until(move || e.last_decision().is_some()).await;

    // 100 - 15 (critical) - 8 (synthetic MAJOR at confidence 1.0) = 77
    assert_eq!(engine.score(), 77.0);
}

/// Test: consecutive escalations are coalesced by the cooldown gate and
/// the queued oracle replies arrive in order across sessions.
#[tokio::test]
async fn test_sequence_oracle_across_sessions() {
    let engine = ProctoringEngine::new(
        test_config(),
        Arc::new(SequenceOracle::texts(&[
            "FLASH_WARNING\nFirst strike.",
            "END_EXAM\nSecond strike.",
        ])),
    );

    engine.start_session(exam()).unwrap();
    engine.emit_violation(ViolationEvent::new(
        ViolationKind::ObjectDetected,
        Severity::Critical,
        Utc::now(),
    ));
    let e = engine.clone();
    wait_until(move || e.last_decision().is_some()).await;
    assert_eq!(engine.last_decision().unwrap().decision, Decision::FlashWarning);
    engine.end_session().unwrap();

    // A fresh session resets the gate and log; the next escalation gets
    // the next reply.
    engine.start_session(exam()).unwrap();
    engine.emit_violation(ViolationEvent::new(
        ViolationKind::ObjectDetected,
        Severity::Critical,
        Utc::now(),
    ));
    let e = engine.clone();
    wait_until(move || e.status() == SessionStatus::Terminated).await;
    assert_eq!(engine.last_decision().unwrap().decision, Decision::EndExam);
}

/// Test: an oracle reply landing after the session ended and the next
/// one started never mutates the newer session.
#[tokio::test]
async fn test_stale_oracle_reply_discarded_across_restart() {
    let engine = ProctoringEngine::new(
        test_config(),
        Arc::new(SlowOracle::text(80, "END_EXAM\nStale verdict.")),
    );
    engine.start_session(exam()).unwrap();
    engine.emit_violation(ViolationEvent::new(
        ViolationKind::MultipleFaces,
        Severity::Critical,
        Utc::now(),
    ));

    // End before the reply arrives, then seat the next candidate.
    engine.end_session().unwrap();
    let second = engine.start_session(exam()).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(engine.status(), SessionStatus::InProgress);
    assert_eq!(engine.session().unwrap().id, second.id);
    assert!(engine.violations().is_empty());
    assert!(engine.last_decision().is_none());
}

/// Test: the exported report round-trips through disk and carries the
/// audit columns.
#[tokio::test]
async fn test_report_written_to_disk() {
    let engine = ProctoringEngine::new(test_config(), Arc::new(StaticOracle::text("IGNORE")));
    engine.start_session(exam()).unwrap();
    engine.emit_violation(
        ViolationEvent::new(ViolationKind::TabSwitch, Severity::Major, Utc::now())
            .with_detail("switched to browser"),
    );
    engine.end_session().unwrap();

    let report = engine.export_report();
    assert!(report.verify_integrity());

    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("report.json");
    let csv_path = dir.path().join("report.csv");
    write_report_json(&report, &json_path).unwrap();
    write_report_csv(&report, &csv_path).unwrap();

    let loaded = proctor_core::read_report(&json_path).unwrap();
    assert_eq!(loaded, report);

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("\"Timestamp\",\"Type\",\"Severity\""));
    assert!(csv.contains("\"TAB_SWITCH\""));
    assert!(csv.contains("switched to browser"));
}
