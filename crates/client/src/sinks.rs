//! Audit and security-event sinks.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use portal_core::UserId;

/// Category of a reported security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    PrivilegeEscalation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Security event handed to a [`SecuritySink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatReport {
    #[serde(rename = "type")]
    pub kind: ThreatKind,
    pub severity: Severity,
    pub description: String,
    pub user_id: Option<UserId>,
    pub metadata: serde_json::Value,
    /// Whether the attempt was stopped.
    pub blocked: bool,
}

/// An entry written through [`AuditSink::log_user_action`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub action: String,
    pub description: String,
    pub category: String,
    pub user_id: Option<UserId>,
}

pub trait AuditSink: Send + Sync {
    fn log_user_action(
        &self,
        action: &str,
        description: &str,
        category: &str,
        user_id: Option<&UserId>,
    );
}

pub trait SecuritySink: Send + Sync {
    fn report_threat(&self, report: ThreatReport);
}

/// Sink that writes audit records and threats to the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn log_user_action(
        &self,
        action: &str,
        description: &str,
        category: &str,
        user_id: Option<&UserId>,
    ) {
        tracing::info!(
            audit.action = action,
            audit.category = category,
            user_id = user_id.map(UserId::as_str),
            "{}",
            description
        );
    }
}

impl SecuritySink for TracingSink {
    fn report_threat(&self, report: ThreatReport) {
        tracing::warn!(
            threat.kind = ?report.kind,
            threat.severity = ?report.severity,
            threat.blocked = report.blocked,
            user_id = report.user_id.as_ref().map(UserId::as_str),
            metadata = %report.metadata,
            "{}",
            report.description
        );
    }
}

/// Sink that keeps everything in memory, for tests and the demo binary.
#[derive(Debug, Default)]
pub struct RecordingSink {
    audits: Mutex<Vec<AuditRecord>>,
    threats: Mutex<Vec<ThreatReport>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audits(&self) -> Vec<AuditRecord> {
        lock(&self.audits).clone()
    }

    pub fn threats(&self) -> Vec<ThreatReport> {
        lock(&self.threats).clone()
    }
}

impl AuditSink for RecordingSink {
    fn log_user_action(
        &self,
        action: &str,
        description: &str,
        category: &str,
        user_id: Option<&UserId>,
    ) {
        lock(&self.audits).push(AuditRecord {
            action: action.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            user_id: user_id.cloned(),
        });
    }
}

impl SecuritySink for RecordingSink {
    fn report_threat(&self, report: ThreatReport) {
        lock(&self.threats).push(report);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
