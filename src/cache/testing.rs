//! In-memory [`PcApi`] for cache tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::store::{CacheOptions, QueryCache};
use crate::api::types::{Pc, PcId, PcIdResponse, PcRef};
use crate::api::PcApi;
use crate::error::TransportError;

/// Behaviour override for the next call, consumed in call order.
#[derive(Debug, Clone, Default)]
pub struct Step {
  pub delay: Duration,
  pub fail: Option<TransportError>,
}

impl Step {
  pub fn delay(ms: u64) -> Self {
    Self {
      delay: Duration::from_millis(ms),
      fail: None,
    }
  }

  pub fn fail(err: TransportError) -> Self {
    Self {
      delay: Duration::ZERO,
      fail: Some(err),
    }
  }
}

#[derive(Default)]
pub struct FakeApi {
  pcs: Mutex<Vec<Pc>>,
  script: Mutex<VecDeque<Step>>,
  pub list_calls: AtomicUsize,
  pub get_calls: AtomicUsize,
  pub update_calls: AtomicUsize,
  pub delete_calls: AtomicUsize,
}

impl FakeApi {
  pub fn with_pcs(pcs: Vec<Pc>) -> Arc<Self> {
    Arc::new(Self {
      pcs: Mutex::new(pcs),
      ..Default::default()
    })
  }

  pub fn push_step(&self, step: Step) {
    self.script.lock().unwrap().push_back(step);
  }

  pub fn set_notes(&self, id: &PcId, notes: &str) {
    let mut pcs = self.pcs.lock().unwrap();
    if let Some(pc) = pcs.iter_mut().find(|pc| &pc.id == id) {
      pc.notes = notes.to_string();
    }
  }

  pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
  }

  async fn next_step(&self) -> Result<(), TransportError> {
    let step = self.script.lock().unwrap().pop_front().unwrap_or_default();
    if !step.delay.is_zero() {
      tokio::time::sleep(step.delay).await;
    }
    match step.fail {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  fn not_found(id: &PcId) -> TransportError {
    TransportError::status(404, format!("pc {} not found", id))
  }
}

#[async_trait]
impl PcApi for FakeApi {
  async fn list_pcs(&self) -> Result<Vec<PcRef>, TransportError> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    let snapshot: Vec<PcRef> = self
      .pcs
      .lock()
      .unwrap()
      .iter()
      .map(|pc| PcRef { id: pc.id.clone() })
      .collect();
    self.next_step().await?;
    Ok(snapshot)
  }

  async fn get_pc(&self, id: &PcId) -> Result<Pc, TransportError> {
    self.get_calls.fetch_add(1, Ordering::SeqCst);
    let snapshot = self
      .pcs
      .lock()
      .unwrap()
      .iter()
      .find(|pc| &pc.id == id)
      .cloned();
    self.next_step().await?;
    snapshot.ok_or_else(|| Self::not_found(id))
  }

  async fn update_notes(&self, id: &PcId, notes: &str) -> Result<PcIdResponse, TransportError> {
    self.update_calls.fetch_add(1, Ordering::SeqCst);
    self.next_step().await?;
    let mut pcs = self.pcs.lock().unwrap();
    let pc = pcs
      .iter_mut()
      .find(|pc| &pc.id == id)
      .ok_or_else(|| Self::not_found(id))?;
    pc.notes = notes.to_string();
    Ok(PcIdResponse { pc_id: id.clone() })
  }

  async fn delete_pc(&self, id: &PcId) -> Result<PcIdResponse, TransportError> {
    self.delete_calls.fetch_add(1, Ordering::SeqCst);
    self.next_step().await?;
    let mut pcs = self.pcs.lock().unwrap();
    let before = pcs.len();
    pcs.retain(|pc| &pc.id != id);
    if pcs.len() == before {
      return Err(Self::not_found(id));
    }
    Ok(PcIdResponse { pc_id: id.clone() })
  }
}

pub fn pc(id: &str, notes: &str) -> Pc {
  Pc {
    id: PcId::from(id),
    host: format!("host-{}", id),
    cpu: "Ryzen 5 3600".to_string(),
    ram_total_gb: 16.0,
    ram_slots: Some(4),
    ram_sticks: Vec::new(),
    disks: Vec::new(),
    gpus: vec!["GTX 1660".to_string()],
    mainboard: "B450".to_string(),
    resolution: "1920x1080".to_string(),
    serial: format!("SN-{}", id),
    notes: notes.to_string(),
  }
}

/// Fake seeded with `p1` ("old") and `p2` ("spare"), plus a cache over it.
pub fn fixture(options: CacheOptions) -> (Arc<FakeApi>, QueryCache) {
  let api = FakeApi::with_pcs(vec![pc("p1", "old"), pc("p2", "spare")]);
  let cache = QueryCache::new(api.clone(), options);
  (api, cache)
}
