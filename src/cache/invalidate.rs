//! Routing of "this changed" signals to cache entries.

use std::fmt;
use tracing::debug;

use super::key::QueryKey;
use super::store::QueryCache;

/// Which entries an invalidation targets.
pub enum InvalidateFilter {
  Key(QueryKey),
  /// Every item query, but not the collection.
  AllItems,
  Predicate(Box<dyn Fn(&QueryKey) -> bool>),
}

impl InvalidateFilter {
  pub fn predicate<F>(f: F) -> Self
  where
    F: Fn(&QueryKey) -> bool + 'static,
  {
    Self::Predicate(Box::new(f))
  }

  pub fn matches(&self, key: &QueryKey) -> bool {
    match self {
      Self::Key(k) => k == key,
      Self::AllItems => matches!(key, QueryKey::Pc { .. }),
      Self::Predicate(f) => f(key),
    }
  }
}

impl From<QueryKey> for InvalidateFilter {
  fn from(key: QueryKey) -> Self {
    Self::Key(key)
  }
}

impl fmt::Debug for InvalidateFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
      Self::AllItems => f.write_str("AllItems"),
      Self::Predicate(_) => f.write_str("Predicate(..)"),
    }
  }
}

impl QueryCache {
  /// Mark matching entries stale. Observed entries are refetched right away;
  /// the rest refetch the next time they are observed. Existing data keeps
  /// being served in both cases.
  ///
  /// Returns the number of entries marked.
  pub fn invalidate(&mut self, filter: impl Into<InvalidateFilter>) -> usize {
    let filter = filter.into();
    let keys: Vec<QueryKey> = self
      .entries
      .keys()
      .filter(|key| filter.matches(key))
      .cloned()
      .collect();

    for key in &keys {
      if let Some(entry) = self.entries.get_mut(key) {
        entry.fresh_from_seq = entry.issued_seq + 1;
      }
      if self.is_observed(key) {
        self.refetch(key);
      }
    }

    debug!(?filter, count = keys.len(), "invalidated queries");
    keys.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::PcId;
  use crate::cache::entry::QueryStatus;
  use crate::cache::store::CacheOptions;
  use crate::cache::testing::{fixture, FakeApi};

  #[tokio::test]
  async fn test_unobserved_entry_refetches_on_next_observe() {
    let (api, mut cache) = fixture(CacheOptions::default());
    cache.observe_item(&PcId::from("p1"));
    cache.settle().await;

    assert_eq!(cache.invalidate(QueryKey::pc("p1")), 1);
    let entry = cache.peek(&QueryKey::pc("p1")).unwrap();
    assert!(entry.is_invalidated());
    assert!(!entry.is_fetching());
    assert_eq!(FakeApi::calls(&api.get_calls), 1);

    let entry = cache.observe_item(&PcId::from("p1"));
    assert!(entry.is_fetching());
    assert_eq!(entry.status(), QueryStatus::Success);
    assert_eq!(entry.pc().unwrap().notes, "old");

    cache.settle().await;
    assert!(!cache.peek(&QueryKey::pc("p1")).unwrap().is_invalidated());
    assert_eq!(FakeApi::calls(&api.get_calls), 2);
  }

  #[tokio::test]
  async fn test_observed_entry_refetches_immediately() {
    let (api, mut cache) = fixture(CacheOptions::default());
    cache.subscribe(QueryKey::pc("p1"), Box::new(|_, _| {}));
    cache.observe_item(&PcId::from("p1"));
    cache.settle().await;

    api.set_notes(&PcId::from("p1"), "changed elsewhere");
    cache.invalidate(QueryKey::pc("p1"));
    assert!(cache.peek(&QueryKey::pc("p1")).unwrap().is_fetching());

    cache.settle().await;
    assert_eq!(
      cache.peek(&QueryKey::pc("p1")).unwrap().pc().unwrap().notes,
      "changed elsewhere"
    );
  }

  #[tokio::test]
  async fn test_no_fan_out() {
    let (_api, mut cache) = fixture(CacheOptions::default());
    cache.observe_collection();
    cache.observe_item(&PcId::from("p1"));
    cache.observe_item(&PcId::from("p2"));
    cache.settle().await;

    cache.invalidate(QueryKey::pc("p1"));

    assert!(cache.peek(&QueryKey::pc("p1")).unwrap().is_invalidated());
    assert!(!cache.peek(&QueryKey::pc("p2")).unwrap().is_invalidated());
    assert!(!cache.peek(&QueryKey::Pcs).unwrap().is_invalidated());
  }

  #[tokio::test]
  async fn test_all_items_and_predicate() {
    let (_api, mut cache) = fixture(CacheOptions::default());
    cache.observe_collection();
    cache.observe_item(&PcId::from("p1"));
    cache.observe_item(&PcId::from("p2"));
    cache.settle().await;

    assert_eq!(cache.invalidate(InvalidateFilter::AllItems), 2);
    assert!(!cache.peek(&QueryKey::Pcs).unwrap().is_invalidated());

    let only_p2 = InvalidateFilter::predicate(|key| key.item_id() == Some(&PcId::from("p2")));
    assert_eq!(cache.invalidate(only_p2), 1);
  }

  #[tokio::test]
  async fn test_unknown_key_is_ignored() {
    let (_api, mut cache) = fixture(CacheOptions::default());
    assert_eq!(cache.invalidate(QueryKey::pc("nope")), 0);
    assert!(cache.peek(&QueryKey::pc("nope")).is_none());
  }
}
