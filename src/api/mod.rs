//! Inventory API: wire types, field labels and the HTTP client.

pub mod client;
pub mod labels;
pub mod types;

use async_trait::async_trait;

use crate::error::TransportError;
use types::{Pc, PcId, PcIdResponse, PcRef};

pub use client::ApiClient;

/// The four endpoints the cache consumes.
///
/// [`ApiClient`] is the production implementation; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait PcApi: Send + Sync {
  /// `GET /pcs`
  async fn list_pcs(&self) -> Result<Vec<PcRef>, TransportError>;

  /// `GET /pc/{id}`
  async fn get_pc(&self, id: &PcId) -> Result<Pc, TransportError>;

  /// `POST /update_notes`
  async fn update_notes(&self, id: &PcId, notes: &str) -> Result<PcIdResponse, TransportError>;

  /// `DELETE /pc/{id}/delete`
  async fn delete_pc(&self, id: &PcId) -> Result<PcIdResponse, TransportError>;
}
