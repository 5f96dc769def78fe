//! Query cache: one entry per [`QueryKey`], filled by background fetches.
//!
//! Requests run as spawned tokio tasks and report back over a channel. Their
//! results are applied only from [`QueryCache::poll`] or
//! [`QueryCache::next_change`], on whatever task owns the cache, so entry
//! updates, listener calls and mutation hooks never interleave.

use chrono::Utc;
use futures::FutureExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::entry::{CacheEntry, QueryData, QueryStatus};
use super::key::QueryKey;
use super::mutation::{MutationId, MutationState};
use crate::api::types::{Pc, PcId, PcIdResponse};
use crate::api::PcApi;
use crate::error::TransportError;

/// Called synchronously whenever an entry's data or status changes.
pub type Listener = Box<dyn FnMut(&QueryKey, &CacheEntry)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// How responses for the same key are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
  /// A response older than one already applied is dropped.
  #[default]
  LastIssued,
  /// Responses are applied in completion order, whatever their age.
  LastCompleted,
}

/// Retry policy for fetches. Only transport failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub retries: u32,
  /// Delay before the first retry, doubled for each further attempt
  pub backoff: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      retries: 0,
      backoff: Duration::from_millis(500),
    }
  }
}

impl RetryPolicy {
  pub fn delay(&self, attempt: u32) -> Duration {
    self.backoff.saturating_mul(1u32 << attempt.min(16))
  }
}

#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
  pub retry: RetryPolicy,
  /// Age after which successful data is refetched on observe. `None` keeps
  /// data fresh until invalidated.
  pub stale_time: Option<Duration>,
  pub ordering: ResponseOrdering,
}

pub(super) enum CacheMessage {
  Fetched {
    key: QueryKey,
    seq: u64,
    result: Result<QueryData, TransportError>,
  },
  Mutated {
    id: MutationId,
    result: Result<PcIdResponse, TransportError>,
  },
}

pub struct QueryCache {
  pub(super) api: Arc<dyn PcApi>,
  pub(super) options: CacheOptions,
  pub(super) entries: HashMap<QueryKey, CacheEntry>,
  listeners: HashMap<QueryKey, Vec<(SubscriptionId, Listener)>>,
  next_subscription: u64,
  pub(super) mutations: MutationState,
  tx: mpsc::UnboundedSender<CacheMessage>,
  rx: mpsc::UnboundedReceiver<CacheMessage>,
  tasks: Vec<JoinHandle<()>>,
  in_flight: usize,
  pub(super) closed: bool,
}

impl QueryCache {
  pub fn new(api: Arc<dyn PcApi>, options: CacheOptions) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      api,
      options,
      entries: HashMap::new(),
      listeners: HashMap::new(),
      next_subscription: 0,
      mutations: MutationState::default(),
      tx,
      rx,
      tasks: Vec::new(),
      in_flight: 0,
      closed: false,
    }
  }

  pub fn options(&self) -> &CacheOptions {
    &self.options
  }

  /// Read an entry, starting a fetch if it was never fetched or has gone
  /// stale. Stale data keeps being served while the refetch runs.
  pub fn observe(&mut self, key: &QueryKey) -> &CacheEntry {
    let needs_fetch = self
      .entries
      .get(key)
      .map_or(true, |entry| entry.needs_fetch(self.options.stale_time));
    if needs_fetch {
      self.start_fetch(key.clone());
    }
    self.entries.entry(key.clone()).or_default()
  }

  pub fn observe_collection(&mut self) -> &CacheEntry {
    self.observe(&QueryKey::Pcs)
  }

  pub fn observe_item(&mut self, id: &PcId) -> &CacheEntry {
    self.observe(&QueryKey::pc(id.clone()))
  }

  /// Read an entry without side effects.
  pub fn peek(&self, key: &QueryKey) -> Option<&CacheEntry> {
    self.entries.get(key)
  }

  /// Start a fetch unless one is already running for `key`.
  ///
  /// Returns the sequence number of the started fetch.
  pub fn fetch(&mut self, key: &QueryKey) -> Option<u64> {
    if self.entries.get(key).is_some_and(CacheEntry::is_fetching) {
      return None;
    }
    Some(self.start_fetch(key.clone()))
  }

  /// Start a fetch even if one is already running. The newer request wins
  /// under [`ResponseOrdering::LastIssued`].
  pub fn refetch(&mut self, key: &QueryKey) -> u64 {
    self.start_fetch(key.clone())
  }

  /// Rewrite an entry's data in place without touching its network state.
  ///
  /// The updater sees the current data (if any); returning `None` leaves
  /// the entry alone. Data of the wrong kind or id is rejected.
  pub fn set_data<F>(&mut self, key: &QueryKey, updater: F) -> bool
  where
    F: FnOnce(Option<&QueryData>) -> Option<QueryData>,
  {
    let current = self.entries.get(key).and_then(|entry| entry.data.as_ref());
    let Some(next) = updater(current) else {
      return false;
    };
    if !next.fits(key) {
      warn!(query = %key, "rejecting data that does not match its key");
      return false;
    }

    self.entries.entry(key.clone()).or_default().data = Some(next);
    self.notify(key);
    true
  }

  /// Patch a cached record. No-op when the record is not cached.
  pub fn update_pc<F>(&mut self, id: &PcId, patch: F) -> bool
  where
    F: FnOnce(&mut Pc),
  {
    self.set_data(&QueryKey::pc(id.clone()), |old| {
      let mut pc = old?.pc()?.clone();
      patch(&mut pc);
      Some(QueryData::Pc(Box::new(pc)))
    })
  }

  pub fn subscribe(&mut self, key: QueryKey, listener: Listener) -> SubscriptionId {
    self.next_subscription += 1;
    let id = SubscriptionId(self.next_subscription);
    self.listeners.entry(key).or_default().push((id, listener));
    id
  }

  pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
    let mut removed = false;
    self.listeners.retain(|_, listeners| {
      let before = listeners.len();
      listeners.retain(|(sub, _)| *sub != id);
      removed |= listeners.len() != before;
      !listeners.is_empty()
    });
    removed
  }

  /// A key is observed while it has at least one listener.
  pub fn is_observed(&self, key: &QueryKey) -> bool {
    self.listeners.get(key).is_some_and(|l| !l.is_empty())
  }

  /// Number of requests (fetches and mutations) whose results have not been
  /// applied yet.
  pub fn in_flight(&self) -> usize {
    self.in_flight
  }

  /// Apply every result that has already arrived, without waiting.
  ///
  /// Returns `true` if anything was applied.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(message) = self.rx.try_recv() {
      self.apply(message);
      changed = true;
    }
    changed
  }

  /// Wait for the next result, apply it and anything else already queued.
  ///
  /// Returns `false` immediately when nothing is in flight.
  pub async fn next_change(&mut self) -> bool {
    if self.in_flight == 0 {
      return false;
    }
    match self.rx.recv().await {
      Some(message) => self.apply(message),
      None => return false,
    }
    self.poll();
    true
  }

  /// Wait until no request is in flight, including any started by hooks.
  pub async fn settle(&mut self) {
    while self.next_change().await {}
  }

  /// Abort every pending request, drop all listeners and settle pending
  /// mutations as failed.
  pub fn shutdown(&mut self) {
    if self.closed {
      return;
    }
    self.closed = true;

    for task in self.tasks.drain(..) {
      task.abort();
    }
    self.listeners.clear();
    self.cancel_mutations();
    while self.rx.try_recv().is_ok() {}
    self.in_flight = 0;
    for entry in self.entries.values_mut() {
      entry.in_flight = 0;
    }
    info!("query cache shut down");
  }

  pub(super) fn start_fetch(&mut self, key: QueryKey) -> u64 {
    let entry = self.entries.entry(key.clone()).or_default();
    if self.closed {
      return entry.issued_seq;
    }
    entry.issued_seq += 1;
    entry.in_flight += 1;
    if entry.data.is_none() {
      entry.status = QueryStatus::Loading;
    }
    let seq = entry.issued_seq;
    debug!(query = %key, seq, "fetch started");

    let api = Arc::clone(&self.api);
    let retry = self.options.retry;
    let fallback = CacheMessage::Fetched {
      key: key.clone(),
      seq,
      result: Err(TransportError::transport("fetch task panicked")),
    };
    self.spawn_request(
      async move {
        let result = fetch_with_retry(api.as_ref(), &key, retry).await;
        CacheMessage::Fetched { key, seq, result }
      },
      fallback,
    );
    seq
  }

  pub(super) fn spawn_request<F>(&mut self, request: F, fallback: CacheMessage)
  where
    F: Future<Output = CacheMessage> + Send + 'static,
  {
    let tx = self.tx.clone();
    self.in_flight += 1;
    self.tasks.retain(|task| !task.is_finished());
    self.tasks.push(tokio::spawn(async move {
      let message = AssertUnwindSafe(request)
        .catch_unwind()
        .await
        .unwrap_or(fallback);
      // Receiver is gone after shutdown
      let _ = tx.send(message);
    }));
  }

  fn apply(&mut self, message: CacheMessage) {
    self.in_flight = self.in_flight.saturating_sub(1);
    match message {
      CacheMessage::Fetched { key, seq, result } => self.apply_fetch(key, seq, result),
      CacheMessage::Mutated { id, result } => self.complete_mutation(id, result),
    }
  }

  fn apply_fetch(&mut self, key: QueryKey, seq: u64, result: Result<QueryData, TransportError>) {
    let ordering = self.options.ordering;
    let Some(entry) = self.entries.get_mut(&key) else {
      return;
    };
    entry.in_flight = entry.in_flight.saturating_sub(1);

    if ordering == ResponseOrdering::LastIssued && seq < entry.applied_seq {
      debug!(query = %key, seq, applied = entry.applied_seq, "dropping out-of-order response");
      return;
    }
    entry.applied_seq = entry.applied_seq.max(seq);

    match result {
      Ok(data) => {
        debug!(query = %key, seq, "fetch succeeded");
        entry.data = Some(data);
        entry.error = None;
        entry.status = QueryStatus::Success;
        entry.last_fetched_at = Some(Utc::now());
      }
      Err(err) => {
        warn!(query = %key, seq, error = %err, "fetch failed");
        entry.error = Some(err);
        entry.status = QueryStatus::Error;
      }
    }
    self.notify(&key);
  }

  fn notify(&mut self, key: &QueryKey) {
    let (Some(entry), Some(listeners)) = (self.entries.get(key), self.listeners.get_mut(key)) else {
      return;
    };
    for (_, listener) in listeners.iter_mut() {
      listener(key, entry);
    }
  }
}

impl Drop for QueryCache {
  fn drop(&mut self) {
    self.shutdown();
  }
}

async fn fetch_query(api: &dyn PcApi, key: &QueryKey) -> Result<QueryData, TransportError> {
  match key {
    QueryKey::Pcs => api.list_pcs().await.map(QueryData::Pcs),
    QueryKey::Pc { id } => {
      let pc = api.get_pc(id).await?;
      if &pc.id != id {
        return Err(TransportError::decode(format!(
          "requested pc {} but received {}",
          id, pc.id
        )));
      }
      Ok(QueryData::Pc(Box::new(pc)))
    }
  }
}

async fn fetch_with_retry(
  api: &dyn PcApi,
  key: &QueryKey,
  retry: RetryPolicy,
) -> Result<QueryData, TransportError> {
  let mut attempt = 0;
  loop {
    match fetch_query(api, key).await {
      Err(err) if err.is_transport() && attempt < retry.retries => {
        let delay = retry.delay(attempt);
        attempt += 1;
        warn!(query = %key, attempt, error = %err, ?delay, "fetch failed, retrying");
        tokio::time::sleep(delay).await;
      }
      result => return result,
    }
  }
}
