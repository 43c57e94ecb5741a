//! Result cache seam keyed by a content fingerprint of the lead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::domain::{ConversationTurn, LeadId, LeadRecord};
use super::scorers::ScorerKind;

pub const CACHE_KEY_PREFIX: &str = "lead_eval:";

const MIN_PURGE_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache entry could not be encoded: {0}")]
    Encoding(String),
}

/// Key/value store for serialized evaluation results.
///
/// Every write is a full overwrite of one key; implementations need no read-modify-write
/// coordination.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Stable cache key for a lead, any live turns supplied with the request, and the scorer
/// set that produced the result.
///
/// The lead is serialized through `serde_json::Value`, whose object map keeps keys sorted,
/// so the key does not depend on the order fields were inserted or received. Modes running
/// the same scorers share entries; modes running different scorers never evict each other.
pub fn cache_key(
    lead_id: &LeadId,
    lead: &LeadRecord,
    live_turns: &[ConversationTurn],
    scorers: &[ScorerKind],
) -> Result<String, CacheError> {
    let normalized =
        serde_json::to_value(lead).map_err(|err| CacheError::Encoding(err.to_string()))?;
    let turns =
        serde_json::to_value(live_turns).map_err(|err| CacheError::Encoding(err.to_string()))?;
    let mut profile: Vec<&'static str> = scorers.iter().map(ScorerKind::label).collect();
    profile.sort_unstable();
    profile.dedup();
    let canonical = serde_json::to_string(&serde_json::json!({
        "lead": normalized,
        "live_turns": turns,
        "scorers": profile,
    }))
    .map_err(|err| CacheError::Encoding(err.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(lead_id.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();

    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    Ok(format!("{CACHE_KEY_PREFIX}{hex}"))
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Process-local cache with per-entry TTL. Expired entries read as misses.
#[derive(Debug, Default)]
pub struct InMemoryResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Purges expired entries every `period` (at least one second) until the cache is
    /// dropped.
    pub fn spawn_purge_task(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let period = period.max(MIN_PURGE_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired().await;
                if removed > 0 {
                    debug!(removed, "purged expired evaluation cache entries");
                }
            }
        })
    }
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}
