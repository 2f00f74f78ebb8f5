use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Cross-component correlation (spec §3 `related-ids`). All fields are
/// optional; a given entry carries whichever ids are known at emission.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RelatedIds {
    pub request_id: Option<String>,
    pub quote_id: Option<String>,
    pub trade_id: Option<String>,
    pub session_id: Option<String>,
    pub counterparty_id: Option<String>,
}

impl RelatedIds {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..Default::default()
        }
    }
}

/// One append-only journal record (spec §3 `AuditEntry`). `event_id` is
/// assigned by the journal on write and is strictly increasing within a
/// process; it is never set by the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub event_id: u64,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub description: String,
    pub related_ids: RelatedIds,
    pub data: Option<serde_json::Value>,
    pub source_ip: Option<String>,
    pub severity: Severity,
}

/// A new entry as supplied by a caller, before the journal stamps an
/// `event_id` and timestamp.
#[derive(Clone, Debug)]
pub struct NewEntry {
    pub event_type: String,
    pub actor: String,
    pub description: String,
    pub related_ids: RelatedIds,
    pub data: Option<serde_json::Value>,
    pub source_ip: Option<String>,
    pub severity: Severity,
}

impl NewEntry {
    pub fn new(event_type: impl Into<String>, actor: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            actor: actor.into(),
            description: description.into(),
            related_ids: RelatedIds::default(),
            data: None,
            source_ip: None,
            severity: Severity::Info,
        }
    }

    pub fn with_related(mut self, related_ids: RelatedIds) -> Self {
        self.related_ids = related_ids;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Query predicate over journal contents; every field is an optional
/// AND-ed filter.
#[derive(Clone, Debug, Default)]
pub struct JournalFilter {
    pub event_type: Option<String>,
    pub request_id: Option<String>,
    pub quote_id: Option<String>,
    pub trade_id: Option<String>,
    pub session_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub min_severity: Option<Severity>,
}

impl JournalFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(t) = &self.event_type {
            if &entry.event_type != t {
                return false;
            }
        }
        if let Some(id) = &self.request_id {
            if entry.related_ids.request_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(id) = &self.quote_id {
            if entry.related_ids.quote_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(id) = &self.trade_id {
            if entry.related_ids.trade_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(id) = &self.session_id {
            if entry.related_ids.session_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(min) = self.min_severity {
            if entry.severity < min {
                return false;
            }
        }
        true
    }
}
