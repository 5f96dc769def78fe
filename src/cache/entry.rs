use chrono::{DateTime, Utc};
use std::time::Duration;

use super::key::QueryKey;
use crate::api::types::{Pc, PcRef};
use crate::error::TransportError;

/// Network state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
  /// Never fetched
  #[default]
  Idle,
  /// First fetch in progress, no data yet
  Loading,
  /// Last applied fetch succeeded
  Success,
  /// Last applied fetch failed
  Error,
}

/// Payload of a cache entry, one variant per query kind.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
  Pcs(Vec<PcRef>),
  Pc(Box<Pc>),
}

impl QueryData {
  pub fn pcs(&self) -> Option<&[PcRef]> {
    match self {
      QueryData::Pcs(pcs) => Some(pcs),
      QueryData::Pc(_) => None,
    }
  }

  pub fn pc(&self) -> Option<&Pc> {
    match self {
      QueryData::Pc(pc) => Some(pc),
      QueryData::Pcs(_) => None,
    }
  }

  /// Whether this payload may be stored under `key`. Item payloads must
  /// carry the key's id.
  pub fn fits(&self, key: &QueryKey) -> bool {
    match (self, key) {
      (QueryData::Pcs(_), QueryKey::Pcs) => true,
      (QueryData::Pc(pc), QueryKey::Pc { id }) => &pc.id == id,
      _ => false,
    }
  }
}

/// Cached state for one [`QueryKey`].
///
/// `status` only drops back to `Loading` when there is no data to show; a
/// refetch of present data is reported through [`CacheEntry::is_fetching`]
/// so views keep rendering the last good value.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
  pub(super) status: QueryStatus,
  pub(super) data: Option<QueryData>,
  pub(super) error: Option<TransportError>,
  pub(super) last_fetched_at: Option<DateTime<Utc>>,
  pub(super) in_flight: usize,
  /// Sequence number of the most recently started fetch
  pub(super) issued_seq: u64,
  /// Highest sequence number whose response has been applied
  pub(super) applied_seq: u64,
  /// Responses below this sequence number predate the last invalidation
  pub(super) fresh_from_seq: u64,
}

impl CacheEntry {
  pub fn status(&self) -> QueryStatus {
    self.status
  }

  pub fn data(&self) -> Option<&QueryData> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&TransportError> {
    self.error.as_ref()
  }

  pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
    self.last_fetched_at
  }

  pub fn pcs(&self) -> Option<&[PcRef]> {
    self.data.as_ref().and_then(QueryData::pcs)
  }

  pub fn pc(&self) -> Option<&Pc> {
    self.data.as_ref().and_then(QueryData::pc)
  }

  /// A request for this entry is outstanding.
  pub fn is_fetching(&self) -> bool {
    self.in_flight > 0
  }

  /// Nothing to show yet and a first fetch is running.
  pub fn is_pending(&self) -> bool {
    self.status == QueryStatus::Loading && self.data.is_none()
  }

  pub fn is_invalidated(&self) -> bool {
    self.applied_seq < self.fresh_from_seq
  }

  /// Invalidated, or successful data older than `stale_time`.
  pub fn is_stale(&self, stale_time: Option<Duration>) -> bool {
    if self.is_invalidated() {
      return true;
    }
    match (self.status, self.last_fetched_at, stale_time) {
      (QueryStatus::Success, Some(fetched), Some(limit)) => chrono::Duration::from_std(limit)
        .map(|limit| Utc::now() - fetched >= limit)
        .unwrap_or(false),
      _ => false,
    }
  }

  /// Whether observing this entry should start a fetch. Errors are only
  /// retried on an explicit refetch or invalidation.
  pub(super) fn needs_fetch(&self, stale_time: Option<Duration>) -> bool {
    if self.is_fetching() {
      return false;
    }
    self.status == QueryStatus::Idle || self.is_stale(stale_time)
  }
}
