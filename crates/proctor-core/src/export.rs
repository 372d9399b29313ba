//! Audit report export.
//!
//! Renders a finished (or in-flight) session as pretty JSON and as a
//! flat CSV table, with a SHA-256 content digest for tamper evidence.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{ExamSession, Result, ViolationEvent};

/// Immutable audit record of a proctoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProctoringReport {
    /// The session, if one was ever started.
    pub session: Option<ExamSession>,
    /// Full violation log in insertion order.
    pub violations: Vec<ViolationEvent>,
    /// When this report was produced.
    pub export_time: DateTime<Utc>,
    /// SHA-256 digest of the report content for tamper evidence.
    pub content_digest: String,
}

impl ProctoringReport {
    /// Create a finalized report with its digest computed.
    pub fn finalize(
        session: Option<ExamSession>,
        violations: Vec<ViolationEvent>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut report = Self {
            session,
            violations,
            export_time: now,
            content_digest: String::new(),
        };
        report.content_digest = report.compute_digest();
        report
    }

    /// Compute the SHA-256 digest of the report content (excluding the
    /// digest field itself).
    fn compute_digest(&self) -> String {
        let payload = serde_json::json!({
            "session_id": self.session.as_ref().map(|s| s.id),
            "violation_count": self.violations.len(),
            "violation_ids": self.violations.iter().map(|v| v.id).collect::<Vec<_>>(),
            "export_time": self.export_time.to_rfc3339(),
        });
        let bytes = serde_json::to_vec(&payload).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }

    /// Verify the report's integrity.
    pub fn verify_integrity(&self) -> bool {
        self.content_digest == self.compute_digest()
    }

    /// Render as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render the violation log as CSV with the audit columns
    /// `[Timestamp, Type, Severity, Description, Confidence]`.
    ///
    /// Every field is quoted; embedded quotes are doubled.
    pub fn to_csv(&self) -> String {
        let mut rows = vec![csv_row(&[
            "Timestamp",
            "Type",
            "Severity",
            "Description",
            "Confidence",
        ])];
        for v in &self.violations {
            rows.push(csv_row(&[
                &v.timestamp.to_rfc3339(),
                &v.kind.to_string(),
                &v.severity.to_string(),
                v.detail.as_deref().unwrap_or(""),
                &v.confidence.to_string(),
            ]));
        }
        rows.join("\n")
    }
}

fn csv_row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| format!("\"{}\"", f.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write a report to disk as JSON.
pub fn write_report_json(report: &ProctoringReport, path: &Path) -> Result<()> {
    std::fs::write(path, report.to_json()?)?;
    Ok(())
}

/// Write a report's violation table to disk as CSV.
pub fn write_report_csv(report: &ProctoringReport, path: &Path) -> Result<()> {
    std::fs::write(path, report.to_csv())?;
    Ok(())
}

/// Read a report back from disk.
pub fn read_report(path: &Path) -> Result<ProctoringReport> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
