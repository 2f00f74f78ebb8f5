use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::CounterpartyProfile;

/// Static-ish counterparty directory; updates are rare (config reload)
/// so a single `RwLock` over the whole map is sufficient.
#[derive(Default)]
pub struct CounterpartyRegistry {
    profiles: RwLock<HashMap<String, CounterpartyProfile>>,
}

impl CounterpartyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, counterparty_id: impl Into<String>, profile: CounterpartyProfile) {
        self.profiles.write().insert(counterparty_id.into(), profile);
    }

    pub fn get(&self, counterparty_id: &str) -> Option<CounterpartyProfile> {
        self.profiles.read().get(counterparty_id).cloned()
    }
}
