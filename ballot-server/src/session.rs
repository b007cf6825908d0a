//! Session provider
//!
//! Resolves a bearer token to `{identity, profile}` and caches the result.
//! A background listener subscribed to the [`EventBus`] keeps the cache in
//! step with auth changes: sign-in and refresh trigger a re-fetch, sign-out
//! evicts. The same task periodically sweeps cache entries older than the
//! cache TTL and purges expired session rows. The subscription lives until
//! [`SessionProvider::shutdown`] or drop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ballot_common::db::{identities, profiles};
use ballot_common::events::{AuthEvent, EventBus};
use ballot_common::{Identity, Profile};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Identity plus profile for one session token
///
/// The profile is `None` when its fetch failed; the identity is still usable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub identity: Identity,
    pub profile: Option<Profile>,
}

/// Cache timing
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    /// Age after which a cached snapshot is re-checked against the database
    pub ttl: Duration,
    /// Period of the stale-entry sweep and expired-session purge
    pub sweep_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

struct CachedSession {
    snapshot: SessionSnapshot,
    cached_at: Instant,
}

/// Entries plus a counter bumped by every eviction
///
/// A fetch only stores its result if no eviction happened while it ran.
#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedSession>,
    generation: u64,
}

impl CacheState {
    fn evict(&mut self, token: &str) {
        self.entries.remove(token);
        self.generation += 1;
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.generation += 1;
    }
}

type Cache = Arc<RwLock<CacheState>>;

pub struct SessionProvider {
    db: SqlitePool,
    cache: Cache,
    settings: CacheSettings,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionProvider {
    /// Subscribe to auth events and start the cache listener
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(db: SqlitePool, events: &EventBus) -> Arc<Self> {
        Self::start_with(db, events, CacheSettings::default())
    }

    pub fn start_with(db: SqlitePool, events: &EventBus, settings: CacheSettings) -> Arc<Self> {
        let cache: Cache = Arc::new(RwLock::new(CacheState::default()));

        // Subscribe before spawning so no event emitted after start() is missed
        let rx = events.subscribe();
        let handle = tokio::spawn(listen(db.clone(), cache.clone(), settings, rx));

        info!(
            "Session provider listening for auth events (cache ttl {:?}, sweep every {:?})",
            settings.ttl, settings.sweep_interval
        );

        Arc::new(Self {
            db,
            cache,
            settings,
            listener: Mutex::new(Some(handle)),
        })
    }

    /// Current session for a token, fetching on cache miss
    ///
    /// A cached entry older than the TTL is re-checked, so a token that has
    /// expired in the database is rejected and evicted. Returns `None` for
    /// unknown or expired tokens or when the identity lookup fails.
    pub async fn current(&self, token: &str) -> Option<SessionSnapshot> {
        if let Some(cached) = self.cache.read().await.entries.get(token) {
            if cached.cached_at.elapsed() < self.settings.ttl {
                return Some(cached.snapshot.clone());
            }
        }

        refetch(&self.db, &self.cache, token).await
    }

    /// Drop any cached state for a token
    pub async fn invalidate(&self, token: &str) {
        self.cache.write().await.evict(token);
    }

    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.entries.len()
    }

    pub fn is_listening(&self) -> bool {
        match self.listener.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|h| !h.is_finished()),
            Err(_) => false,
        }
    }

    /// Stop the listener and release the event subscription
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
                info!("Session provider stopped");
            }
        }
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Identity first, then profile
async fn fetch(db: &SqlitePool, token: &str) -> Option<SessionSnapshot> {
    let identity = identities::identity_for_token(db, token).await.ok().flatten()?;

    let profile = match profiles::fetch_profile(db, identity.user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Failed to fetch profile for {}: {}", identity.user_id, e);
            None
        }
    };

    Some(SessionSnapshot { identity, profile })
}

/// Fetch without holding the lock, then store unless an eviction intervened
///
/// Evictions follow the database delete, so a fetch that raced a sign-out
/// either sees no session or finds the generation moved and skips the insert.
async fn refetch(db: &SqlitePool, cache: &Cache, token: &str) -> Option<SessionSnapshot> {
    let generation = cache.read().await.generation;
    let fetched = fetch(db, token).await;
    store(cache, token, generation, fetched).await
}

async fn store(
    cache: &Cache,
    token: &str,
    generation: u64,
    fetched: Option<SessionSnapshot>,
) -> Option<SessionSnapshot> {
    let mut state = cache.write().await;
    match fetched {
        Some(snapshot) => {
            if state.generation == generation {
                state.entries.insert(
                    token.to_string(),
                    CachedSession {
                        snapshot: snapshot.clone(),
                        cached_at: Instant::now(),
                    },
                );
            } else {
                debug!("Cache changed during fetch, not storing snapshot");
            }
            Some(snapshot)
        }
        None => {
            state.entries.remove(token);
            None
        }
    }
}

/// Drop stale cache entries and expired session rows
async fn sweep(db: &SqlitePool, cache: &Cache, ttl: Duration) {
    let dropped = {
        let mut state = cache.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, cached| cached.cached_at.elapsed() < ttl);
        before - state.entries.len()
    };
    if dropped > 0 {
        debug!("Swept {} stale cache entries", dropped);
    }

    if let Err(e) = identities::purge_expired_sessions(db).await {
        warn!("Failed to purge expired sessions: {}", e);
    }
}

async fn listen(db: SqlitePool, cache: Cache, settings: CacheSettings, mut rx: broadcast::Receiver<AuthEvent>) {
    let period = settings.sweep_interval;
    let mut timer = interval_at(tokio::time::Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let received = tokio::select! {
            received = rx.recv() => received,
            _ = timer.tick() => {
                sweep(&db, &cache, settings.ttl).await;
                continue;
            }
        };

        match received {
            Ok(event) => {
                debug!("Auth event {} for {}", event.event_type(), event.user_id());
                match event {
                    AuthEvent::SignedIn { token, .. } => {
                        refetch(&db, &cache, &token).await;
                    }
                    AuthEvent::TokenRefreshed {
                        old_token,
                        new_token,
                        ..
                    } => {
                        cache.write().await.evict(&old_token);
                        refetch(&db, &cache, &new_token).await;
                    }
                    AuthEvent::SignedOut { token, .. } => {
                        cache.write().await.evict(&token);
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Missed events could include sign-outs; start from a clean cache
                warn!("Session provider lagged by {} events, clearing cache", skipped);
                cache.write().await.clear();
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
