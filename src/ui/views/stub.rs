//! Small in-memory API for driving views against a real cache.

use async_trait::async_trait;
use pcdb::api::types::{Pc, PcId, PcIdResponse, PcRef};
use pcdb::api::PcApi;
use pcdb::cache::{CacheOptions, QueryCache};
use pcdb::error::TransportError;
use ratatui::backend::TestBackend;
use ratatui::prelude::Rect;
use ratatui::Terminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::ui::view::View;

pub struct StubApi {
  pub pcs: Mutex<Vec<Pc>>,
  pub fail_writes: bool,
  /// Reads answer 500 while set
  pub fail_reads: AtomicBool,
}

impl StubApi {
  fn check_read(&self) -> Result<(), TransportError> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(TransportError::status(500, "INTERNAL SERVER ERROR"));
    }
    Ok(())
  }
}

#[async_trait]
impl PcApi for StubApi {
  async fn list_pcs(&self) -> Result<Vec<PcRef>, TransportError> {
    self.check_read()?;
    let pcs = self.pcs.lock().unwrap();
    Ok(pcs.iter().map(|pc| PcRef { id: pc.id.clone() }).collect())
  }

  async fn get_pc(&self, id: &PcId) -> Result<Pc, TransportError> {
    self.check_read()?;
    let pcs = self.pcs.lock().unwrap();
    pcs
      .iter()
      .find(|pc| &pc.id == id)
      .cloned()
      .ok_or_else(|| TransportError::status(404, "NOT FOUND"))
  }

  async fn update_notes(&self, id: &PcId, notes: &str) -> Result<PcIdResponse, TransportError> {
    if self.fail_writes {
      return Err(TransportError::status(500, "INTERNAL SERVER ERROR"));
    }
    let mut pcs = self.pcs.lock().unwrap();
    if let Some(pc) = pcs.iter_mut().find(|pc| &pc.id == id) {
      pc.notes = notes.to_string();
    }
    Ok(PcIdResponse { pc_id: id.clone() })
  }

  async fn delete_pc(&self, id: &PcId) -> Result<PcIdResponse, TransportError> {
    if self.fail_writes {
      return Err(TransportError::status(500, "INTERNAL SERVER ERROR"));
    }
    self.pcs.lock().unwrap().retain(|pc| &pc.id != id);
    Ok(PcIdResponse { pc_id: id.clone() })
  }
}

pub fn pc(id: &str, host: &str, notes: &str) -> Pc {
  Pc {
    id: PcId::from(id),
    host: host.to_string(),
    cpu: "Ryzen 5 3600".to_string(),
    ram_total_gb: 16.0,
    ram_slots: Some(4),
    ram_sticks: Vec::new(),
    disks: Vec::new(),
    gpus: Vec::new(),
    mainboard: String::new(),
    resolution: "1920x1080".to_string(),
    serial: String::new(),
    notes: notes.to_string(),
  }
}

pub fn cache_with(pcs: Vec<Pc>, fail_writes: bool) -> (Arc<StubApi>, QueryCache) {
  let api = Arc::new(StubApi {
    pcs: Mutex::new(pcs),
    fail_writes,
    fail_reads: AtomicBool::new(false),
  });
  let cache = QueryCache::new(api.clone(), CacheOptions::default());
  (api, cache)
}

/// Draw `view` on a `width` x `height` test terminal and return the screen as text
pub fn render_text(view: &mut dyn View, cache: &QueryCache, width: u16, height: u16) -> String {
  let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
  terminal
    .draw(|frame| view.render(frame, Rect::new(0, 0, width, height), cache))
    .unwrap();
  terminal
    .backend()
    .buffer()
    .content()
    .iter()
    .map(|cell| cell.symbol())
    .collect()
}
