//! One-shot writes against the API and their effect on the cache.

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use super::key::QueryKey;
use super::store::{CacheMessage, QueryCache, ResponseOrdering};
use crate::api::types::{PcId, PcIdResponse};
use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
  UpdateNotes { id: PcId, notes: String },
  Delete { id: PcId },
}

impl Mutation {
  pub fn target(&self) -> &PcId {
    match self {
      Mutation::UpdateNotes { id, .. } | Mutation::Delete { id } => id,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Mutation::UpdateNotes { .. } => "update-notes",
      Mutation::Delete { .. } => "delete",
    }
  }
}

/// Caller side effects for a mutation.
///
/// Exactly one of `on_success` / `on_error` runs, followed by `on_settled`.
/// Hooks run on the task that polls the cache.
pub struct MutationHooks<T> {
  on_success: Option<Box<dyn FnOnce(T)>>,
  on_error: Option<Box<dyn FnOnce(&TransportError)>>,
  on_settled: Option<Box<dyn FnOnce()>>,
}

impl<T> Default for MutationHooks<T> {
  fn default() -> Self {
    Self {
      on_success: None,
      on_error: None,
      on_settled: None,
    }
  }
}

impl<T> MutationHooks<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on_success(mut self, f: impl FnOnce(T) + 'static) -> Self {
    self.on_success = Some(Box::new(f));
    self
  }

  pub fn on_error(mut self, f: impl FnOnce(&TransportError) + 'static) -> Self {
    self.on_error = Some(Box::new(f));
    self
  }

  pub fn on_settled(mut self, f: impl FnOnce() + 'static) -> Self {
    self.on_settled = Some(Box::new(f));
    self
  }

  fn finish(self, result: Result<T, TransportError>) {
    match result {
      Ok(value) => {
        if let Some(f) = self.on_success {
          f(value);
        }
      }
      Err(err) => {
        if let Some(f) = self.on_error {
          f(&err);
        }
      }
    }
    if let Some(f) = self.on_settled {
      f();
    }
  }
}

impl<T> fmt::Debug for MutationHooks<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MutationHooks")
      .field("on_success", &self.on_success.is_some())
      .field("on_error", &self.on_error.is_some())
      .field("on_settled", &self.on_settled.is_some())
      .finish()
  }
}

/// Runs once when a mutation's response is applied. The cache is `None`
/// when the mutation is cancelled by shutdown.
pub type Completion = Box<dyn FnOnce(Option<&mut QueryCache>, Result<PcIdResponse, TransportError>)>;

#[derive(Default)]
pub(super) struct MutationState {
  next_id: u64,
  pending: HashMap<MutationId, Completion>,
  /// Per-record (issued, applied) sequence of notes writes
  notes_writes: HashMap<PcId, (u64, u64)>,
}

impl MutationState {
  fn begin_notes_write(&mut self, id: &PcId) -> u64 {
    let seq = self.notes_writes.entry(id.clone()).or_default();
    seq.0 += 1;
    seq.0
  }

  /// Whether a confirmed notes write may be spliced into the cache.
  fn accept_notes_write(&mut self, id: &PcId, write: u64, ordering: ResponseOrdering) -> bool {
    let seq = self.notes_writes.entry(id.clone()).or_default();
    if ordering == ResponseOrdering::LastIssued && write < seq.1 {
      return false;
    }
    seq.1 = seq.1.max(write);
    true
  }
}

impl QueryCache {
  /// Send `mutation` and run `completion` once its response is applied.
  pub fn execute(&mut self, mutation: Mutation, completion: Completion) -> MutationId {
    self.mutations.next_id += 1;
    let id = MutationId(self.mutations.next_id);
    if self.closed {
      warn!(mutation = mutation.name(), pc = %mutation.target(), "cache is shut down, not sending");
      completion(None, Err(TransportError::transport("cache is shut down")));
      return id;
    }
    info!(mutation = mutation.name(), pc = %mutation.target(), "mutation started");

    self.mutations.pending.insert(id, completion);
    let api = self.api.clone();
    let fallback = CacheMessage::Mutated {
      id,
      result: Err(TransportError::transport("mutation task panicked")),
    };
    self.spawn_request(
      async move {
        let result = match &mutation {
          Mutation::UpdateNotes { id, notes } => api.update_notes(id, notes).await,
          Mutation::Delete { id } => api.delete_pc(id).await,
        };
        CacheMessage::Mutated { id, result }
      },
      fallback,
    );
    id
  }

  /// Write new notes for a record.
  ///
  /// Once the server accepts, the record's item query is invalidated and
  /// the new text is spliced into the cached record, then `on_success`
  /// receives the confirmed notes. Nothing is patched before the server
  /// answers.
  pub fn run_update_notes(
    &mut self,
    id: PcId,
    notes: impl Into<String>,
    hooks: MutationHooks<String>,
  ) -> MutationId {
    let notes = notes.into();
    let write = self.mutations.begin_notes_write(&id);
    let ordering = self.options.ordering;
    let mutation = Mutation::UpdateNotes {
      id: id.clone(),
      notes: notes.clone(),
    };

    self.execute(
      mutation,
      Box::new(
        move |cache: Option<&mut QueryCache>, result: Result<PcIdResponse, TransportError>| {
          let result = result.map(|_| notes);
          if let (Some(cache), Ok(notes)) = (cache, &result) {
            cache.invalidate(QueryKey::pc(id.clone()));
            if cache.mutations.accept_notes_write(&id, write, ordering) {
              let key = QueryKey::pc(id.clone());
              if cache.update_pc(&id, |pc| pc.notes = notes.clone())
                && ordering == ResponseOrdering::LastIssued
              {
                // reads issued before the write carry the old notes
                if let Some(entry) = cache.entries.get_mut(&key) {
                  entry.applied_seq = entry.applied_seq.max(entry.issued_seq);
                }
              }
            } else {
              debug!(pc = %id, write, "superseded notes write, not patching cache");
            }
          }
          hooks.finish(result);
        },
      ),
    )
  }

  /// Delete a record. The cache is left untouched: removing the id from the
  /// collection is up to the caller, typically by refetching it from
  /// `on_settled`.
  pub fn run_delete(&mut self, id: PcId, hooks: MutationHooks<PcId>) -> MutationId {
    self.execute(
      Mutation::Delete { id },
      Box::new(
        move |_: Option<&mut QueryCache>, result: Result<PcIdResponse, TransportError>| {
          hooks.finish(result.map(|ack| ack.pc_id))
        },
      ),
    )
  }

  pub fn pending_mutations(&self) -> usize {
    self.mutations.pending.len()
  }

  pub(super) fn complete_mutation(
    &mut self,
    id: MutationId,
    result: Result<PcIdResponse, TransportError>,
  ) {
    let Some(completion) = self.mutations.pending.remove(&id) else {
      return;
    };
    match &result {
      Ok(ack) => info!(pc = %ack.pc_id, "mutation accepted"),
      Err(err) => warn!(error = %err, "mutation failed"),
    }
    completion(Some(self), result);
  }

  pub(super) fn cancel_mutations(&mut self) {
    let pending: Vec<Completion> = self
      .mutations
      .pending
      .drain()
      .map(|(_, completion)| completion)
      .collect();
    for completion in pending {
      completion(None, Err(TransportError::transport("cancelled at shutdown")));
    }
  }
}
