use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use upstream::IndicativeQuote;

use crate::types::{CachedRate, RateEvent, pair_key};
use common::EventBus;

/// Keyed cache from canonical pair key to the latest cached rate
/// (spec §4.2). Writes come only from the publisher loop; reads are
/// lock-free over a cloned `Arc<CachedRate>` snapshot per entry, matching
/// the "readers are lock-free over an immutable snapshot" resource model
/// in spec §5.
pub struct RateCache {
    entries: RwLock<HashMap<String, Arc<CachedRate>>>,
    bus: Arc<EventBus<RateEvent>>,
}

/// Request-time scaling applies when the caller's `amount_in` differs from
/// the cached quote's `amount_in` — linear scaling, a known approximation
/// per spec §4.2 and the Open Questions in §9; it is never "fixed" here.
const LARGE_REQUEST_MULTIPLE: u128 = 10;

impl RateCache {
    pub fn new(bus: Arc<EventBus<RateEvent>>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            bus,
        }
    }

    /// Store a freshly-fetched rate. `ttl_ms = 2 * refresh_interval_ms`
    /// per spec §4.2's freshness policy.
    pub fn put(&self, src: &str, dst: &str, response: IndicativeQuote, now_ms: u64, refresh_interval_ms: u64) {
        let key = pair_key(src, dst);
        let entry = Arc::new(CachedRate {
            key: key.clone(),
            response,
            cached_at_ms: now_ms,
            ttl_ms: refresh_interval_ms * 2,
        });
        self.entries.write().insert(key.clone(), entry);
        self.bus.publish(RateEvent::Updated { key });
    }

    /// Look up a rate for `(src, dst)` and scale it to `requested_amount_in`.
    /// Expired entries are removed and treated as a miss.
    pub fn get_rate(&self, src: &str, dst: &str, requested_amount_in: u128, now_ms: u64) -> Option<IndicativeQuote> {
        let key = pair_key(src, dst);

        let cached = {
            let guard = self.entries.read();
            guard.get(&key).cloned()
        };

        let cached = cached?;

        if cached.is_expired(now_ms) {
            self.entries.write().remove(&key);
            return None;
        }

        let cached_src = cached.response.amount_in;
        if cached_src == 0 {
            return None;
        }

        if requested_amount_in > cached_src.saturating_mul(LARGE_REQUEST_MULTIPLE) {
            self.bus.publish(RateEvent::Error {
                key: key.clone(),
                reason: format!(
                    "requested amount_in {requested_amount_in} exceeds {LARGE_REQUEST_MULTIPLE}x cached amount_in {cached_src}; linear scaling is an approximation"
                ),
            });
        }

        let scaled_out = scale_amount_out(cached.response.amount_out, requested_amount_in, cached_src);

        let mut out = cached.response.clone();
        out.amount_in = requested_amount_in;
        out.amount_out = scaled_out;
        Some(out)
    }

    /// Surface a refresh failure on the bus without touching the cached
    /// entry; a stale-but-present rate is preferred over no rate at all.
    pub fn emit_error(&self, key: String, reason: String) {
        self.bus.publish(RateEvent::Error { key, reason });
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `dstAmount := cachedDst * requestedSrc / cachedSrc`, integer division,
/// per spec §4.2 / Testable Property P7.
fn scale_amount_out(cached_dst: u128, requested_src: u128, cached_src: u128) -> u128 {
    cached_dst.saturating_mul(requested_src) / cached_src
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn quote(amount_in: u128, amount_out: u128) -> IndicativeQuote {
        IndicativeQuote {
            src_token: "A".into(),
            dst_token: "B".into(),
            amount_in,
            amount_out,
            price: Decimal::ONE,
            observed_at_ms: 0,
            valid_for_s: 30,
        }
    }

    #[test]
    fn scaling_is_linear_s4() {
        let bus = Arc::new(EventBus::new());
        let cache = RateCache::new(bus);
        cache.put("A", "B", quote(1_000_000_000_000_000_000, 2_000_000_000_000_000_000), 0, 1_000);

        let r = cache.get_rate("A", "B", 5_000_000_000_000_000_000, 500).unwrap();
        assert_eq!(r.amount_out, 10_000_000_000_000_000_000);
    }

    #[test]
    fn large_request_emits_warning_but_still_scales_s4() {
        let bus = Arc::new(EventBus::new());
        let errors = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let e2 = errors.clone();
        bus.subscribe(move |ev: &RateEvent| {
            if let RateEvent::Error { reason, .. } = ev {
                e2.lock().push(reason.clone());
            }
        });

        let cache = RateCache::new(bus);
        cache.put("A", "B", quote(1_000_000_000_000_000_000, 2_000_000_000_000_000_000), 0, 1_000);

        let r = cache.get_rate("A", "B", 15_000_000_000_000_000_000, 500).unwrap();
        assert_eq!(r.amount_out, 30_000_000_000_000_000_000);
        assert_eq!(errors.lock().len(), 1);
    }

    #[test]
    fn expired_entry_is_removed_and_misses() {
        let bus = Arc::new(EventBus::new());
        let cache = RateCache::new(bus);
        cache.put("A", "B", quote(100, 200), 0, 10); // ttl = 20ms

        assert!(cache.get_rate("A", "B", 100, 21).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn key_is_case_insensitive() {
        let bus = Arc::new(EventBus::new());
        let cache = RateCache::new(bus);
        cache.put("aBc", "XyZ", quote(100, 200), 0, 1_000);
        assert!(cache.get_rate("ABC", "xyz", 100, 0).is_some());
    }
}
