//! Client-side query cache keyed by structural query identity.
//!
//! # Design
//! The cache is an explicit value owned by the host and injected into the
//! [`QueryClient`](crate::query::QueryClient); there is no global instance.
//! All bookkeeping sits behind one mutex, so completions arriving from
//! several threads in any order leave the key→entry map consistent.
//!
//! A read goes through [`QueryCache::lookup`]:
//! - `Fresh` returns the cached value without I/O,
//! - `Join` hands back the fetch already in flight for that key,
//! - `Fetch` issues a [`FetchTicket`] and the caller performs the request,
//!   then reports back with [`QueryCache::resolve`].
//!
//! Every ticket carries a generation number. A result is written only if its
//! generation is newer than the last written one, so an older fetch finishing
//! late never overwrites a newer value. Invalidation records the current
//! generation; results of fetches started before it are stored but remain
//! stale. A read after an invalidation never joins a fetch that started
//! before it.
//!
//! A ticket dropped without being resolved (the caller bailed out or the
//! transport panicked) releases its in-flight slot and fails its joiners.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::error::ApiError;

type AnyValue = Arc<dyn Any + Send + Sync>;

/// Ordered list of key segments, e.g. `["todos", "completed=false"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(root: impl Into<String>) -> Self {
        Self(vec![root.into()])
    }

    pub fn with(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Segment-wise prefix match; `["todos"]` matches `["todos", "..."]` but
    /// not `["todos-archive"]`.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheConfig {
    /// How long a successful result stays fresh. `None` keeps it fresh until
    /// invalidated.
    pub stale_time: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched.
    Idle,
    /// First fetch in flight, nothing to show yet.
    Loading,
    Success,
    Error,
}

/// Snapshot of one cache entry, typed for rendering.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<ApiError>,
    pub stale: bool,
    pub fetching: bool,
}

/// Result shared between the fetching caller and any joiners.
#[derive(Default)]
pub struct PendingFetch {
    outcome: Mutex<Option<Result<AnyValue, ApiError>>>,
    ready: Condvar,
}

impl PendingFetch {
    fn complete(&self, outcome: Result<AnyValue, ApiError>) {
        *self.outcome.lock() = Some(outcome);
        self.ready.notify_all();
    }

    /// Block until the owning fetch resolves.
    pub fn wait<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Result<Arc<T>, ApiError> {
        let mut outcome = self.outcome.lock();
        loop {
            match outcome.as_ref() {
                Some(Ok(value)) => return downcast(key, value.clone()),
                Some(Err(err)) => return Err(err.clone()),
                None => self.ready.wait(&mut outcome),
            }
        }
    }
}

impl fmt::Debug for PendingFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFetch")
            .field("resolved", &self.outcome.lock().is_some())
            .finish()
    }
}

/// Permission to fetch `key`, to be handed back to [`QueryCache::resolve`].
#[derive(Debug)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
    pending: Arc<PendingFetch>,
    state: Weak<Mutex<State>>,
    resolved: bool,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock();
            if let Some(entry) = state.entries.get_mut(&self.key) {
                if matches!(entry.in_flight, Some((g, _)) if g == self.generation) {
                    entry.in_flight = None;
                }
            }
        }
        debug!(key = %self.key, generation = self.generation, "fetch abandoned");
        self.pending.complete(Err(ApiError::Transport(format!(
            "fetch for {} was abandoned",
            self.key
        ))));
    }
}

#[derive(Debug)]
pub enum Lookup<T> {
    Fresh(Arc<T>),
    Join(Arc<PendingFetch>),
    Fetch(FetchTicket),
}

#[derive(Default)]
struct Entry {
    data: Option<AnyValue>,
    error: Option<ApiError>,
    updated_at: Option<Instant>,
    /// Generation of the last result written into this entry.
    written: u64,
    /// Results from fetches started before this generation are stale.
    invalidated_at: u64,
    stale: bool,
    in_flight: Option<(u64, Arc<PendingFetch>)>,
}

#[derive(Default)]
struct State {
    entries: HashMap<QueryKey, Entry>,
    generation: u64,
}

/// Shared, thread-safe query cache.
#[derive(Default)]
pub struct QueryCache {
    config: CacheConfig,
    state: Arc<Mutex<State>>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Decide how a read of `key` is served.
    pub fn lookup<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Result<Lookup<T>, ApiError> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let stale_time = self.config.stale_time;

        if let Some(entry) = state.entries.get(key) {
            match &entry.in_flight {
                Some((started, pending)) if *started > entry.invalidated_at => {
                    debug!(%key, "joining in-flight fetch");
                    return Ok(Lookup::Join(pending.clone()));
                }
                Some((started, _)) => {
                    debug!(%key, started, "in-flight fetch predates invalidation, refetching");
                }
                None => {}
            }
            if let Some(data) = &entry.data {
                let expired = match (stale_time, entry.updated_at) {
                    (Some(ttl), Some(at)) => now.duration_since(at) >= ttl,
                    _ => false,
                };
                if !entry.stale && !expired && entry.error.is_none() {
                    debug!(%key, "cache hit");
                    return downcast(key, data.clone()).map(Lookup::Fresh);
                }
            }
        }

        state.generation += 1;
        let generation = state.generation;
        let pending = Arc::new(PendingFetch::default());
        let entry = state.entries.entry(key.clone()).or_default();
        entry.in_flight = Some((generation, pending.clone()));
        debug!(%key, generation, "cache miss, fetching");
        Ok(Lookup::Fetch(FetchTicket {
            key: key.clone(),
            generation,
            pending,
            state: Arc::downgrade(&self.state),
            resolved: false,
        }))
    }

    /// Record the outcome of a fetch and wake any joiners.
    ///
    /// A failure keeps the previously cached data in place. The caller always
    /// gets its own outcome back, even when the generation check discards it.
    pub fn resolve<T: Send + Sync + 'static>(
        &self,
        mut ticket: FetchTicket,
        result: Result<T, ApiError>,
    ) -> Result<Arc<T>, ApiError> {
        ticket.resolved = true;
        let key = &ticket.key;
        let generation = ticket.generation;
        let outcome: Result<Arc<T>, ApiError> = result.map(Arc::new);
        let shared: Result<AnyValue, ApiError> = match &outcome {
            Ok(value) => Ok(value.clone() as AnyValue),
            Err(err) => Err(err.clone()),
        };

        {
            let mut state = self.state.lock();
            match state.entries.get_mut(key) {
                Some(entry) => {
                    if matches!(entry.in_flight, Some((g, _)) if g == generation) {
                        entry.in_flight = None;
                    }
                    if generation > entry.written {
                        entry.written = generation;
                        entry.stale = generation < entry.invalidated_at;
                        match &shared {
                            Ok(value) => {
                                entry.data = Some(value.clone());
                                entry.error = None;
                                entry.updated_at = Some(Instant::now());
                            }
                            Err(err) => entry.error = Some(err.clone()),
                        }
                    } else {
                        debug!(%key, generation, written = entry.written, "discarding out-of-order result");
                    }
                }
                None => debug!(%key, generation, "entry cleared while fetching"),
            }
        }

        ticket.pending.complete(shared);
        outcome
    }

    /// Mark every entry under `prefix` stale. Returns how many were touched.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut state = self.state.lock();
        state.generation += 1;
        let generation = state.generation;
        let mut touched = 0;
        for (key, entry) in state.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                entry.invalidated_at = generation;
                touched += 1;
            }
        }
        debug!(%prefix, touched, "invalidated queries");
        touched
    }

    /// Seed or replace a value directly, as if a fetch had just succeeded.
    pub fn set<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) {
        let mut state = self.state.lock();
        state.generation += 1;
        let generation = state.generation;
        let entry = state.entries.entry(key.clone()).or_default();
        entry.data = Some(Arc::new(value));
        entry.error = None;
        entry.stale = false;
        entry.written = generation;
        entry.updated_at = Some(Instant::now());
    }

    /// Typed snapshot for rendering loading / error / success.
    pub fn state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let state = self.state.lock();
        let Some(entry) = state.entries.get(key) else {
            return QueryState {
                status: QueryStatus::Idle,
                data: None,
                error: None,
                stale: false,
                fetching: false,
            };
        };
        let data = entry.data.clone().and_then(|d| d.downcast::<T>().ok());
        let fetching = entry.in_flight.is_some();
        let status = if entry.error.is_some() {
            QueryStatus::Error
        } else if data.is_some() {
            QueryStatus::Success
        } else if fetching {
            QueryStatus::Loading
        } else {
            QueryStatus::Idle
        };
        QueryState {
            status,
            data,
            error: entry.error.clone(),
            stale: entry.stale,
            fetching,
        }
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. In-flight fetches still complete for their callers.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.config)
            .field("entries", &self.len())
            .finish()
    }
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: AnyValue) -> Result<Arc<T>, ApiError> {
    value.downcast::<T>().map_err(|_| {
        ApiError::Deserialization(format!(
            "cached value for {key} is not a {}",
            std::any::type_name::<T>()
        ))
    })
}
