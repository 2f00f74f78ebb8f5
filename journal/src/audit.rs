use std::sync::Arc;

use crate::types::{AuditEntry, NewEntry, RelatedIds, Severity};
use crate::Journal;

/// Thin structured-logging facade over a [`Journal`] (spec §2 "Audit
/// Trail"). Every write is mirrored to `tracing` at a level derived from
/// `Severity`, so operators get the same record both in logs and in
/// journal queries without two call sites to keep in sync.
pub struct AuditTrail {
    journal: Arc<dyn Journal>,
}

impl AuditTrail {
    pub fn new(journal: Arc<dyn Journal>) -> Self {
        Self { journal }
    }

    pub fn record(&self, entry: NewEntry) -> AuditEntry {
        let severity = entry.severity;
        let event_type = entry.event_type.clone();
        let description = entry.description.clone();
        let stamped = self.journal.write(entry);

        match severity {
            Severity::Info => tracing::info!(event_id = stamped.event_id, event_type = %event_type, %description, "audit"),
            Severity::Warning => tracing::warn!(event_id = stamped.event_id, event_type = %event_type, %description, "audit"),
            Severity::Error => tracing::error!(event_id = stamped.event_id, event_type = %event_type, %description, "audit"),
        }

        stamped
    }

    pub fn rfq_received(&self, actor: &str, related: RelatedIds) -> AuditEntry {
        self.record(NewEntry::new("rfq.received", actor, "rfq received").with_related(related))
    }

    pub fn quote_generated(&self, actor: &str, related: RelatedIds) -> AuditEntry {
        self.record(NewEntry::new("quote.generated", actor, "quote generated").with_related(related))
    }

    pub fn quote_accepted(&self, actor: &str, related: RelatedIds) -> AuditEntry {
        self.record(NewEntry::new("quote.accepted", actor, "quote accepted").with_related(related))
    }

    pub fn quote_rejected(&self, actor: &str, related: RelatedIds, reason: &str) -> AuditEntry {
        self.record(
            NewEntry::new("quote.rejected", actor, format!("quote rejected: {reason}"))
                .with_related(related)
                .with_severity(Severity::Warning),
        )
    }

    pub fn quote_expired(&self, actor: &str, related: RelatedIds) -> AuditEntry {
        self.record(
            NewEntry::new("quote.expired", actor, "quote expired")
                .with_related(related)
                .with_severity(Severity::Warning),
        )
    }

    pub fn trade_executed(&self, actor: &str, related: RelatedIds) -> AuditEntry {
        self.record(NewEntry::new("trade.executed", actor, "trade executed").with_related(related))
    }

    pub fn journal(&self) -> Arc<dyn Journal> {
        self.journal.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryJournal;
    use crate::types::JournalFilter;

    #[test]
    fn facade_writes_through_to_journal() {
        let journal = Arc::new(InMemoryJournal::default());
        let trail = AuditTrail::new(journal.clone());

        trail.rfq_received("fixengine", RelatedIds::with_request_id("REQ-001"));
        trail.quote_generated("lifecycle", RelatedIds::with_request_id("REQ-001"));

        let entries = journal.query(&JournalFilter {
            request_id: Some("REQ-001".to_string()),
            ..Default::default()
        });
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, "rfq.received");
        assert_eq!(entries[1].event_type, "quote.generated");
    }
}
