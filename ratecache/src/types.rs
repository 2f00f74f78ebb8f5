use upstream::IndicativeQuote;

/// One cached entry (spec §3 `CachedRate`). Invariant: one entry per key,
/// enforced by `RateCache` storing entries in a map keyed on the
/// canonical pair key.
#[derive(Clone, Debug)]
pub struct CachedRate {
    pub key: String,
    pub response: IndicativeQuote,
    pub cached_at_ms: u64,
    pub ttl_ms: u64,
}

impl CachedRate {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.cached_at_ms) > self.ttl_ms
    }
}

/// Canonicalize a (src, dst) pair into the cache key: lowercased `src:dst`.
pub fn pair_key(src: &str, dst: &str) -> String {
    format!("{}:{}", src.to_lowercase(), dst.to_lowercase())
}

/// Events emitted on the rate-cache event bus (spec §4.2, §4.7).
#[derive(Clone, Debug)]
pub enum RateEvent {
    Updated { key: String },
    Error { key: String, reason: String },
}
