//! Serde types matching the inventory API's JSON bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::labels::{DiskField, RamStickField};

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque PC identifier. The API may send either a number or a string, and
/// the same form is sent back on writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PcId {
  Num(i64),
  Str(String),
}

impl fmt::Display for PcId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PcId::Num(n) => write!(f, "{}", n),
      PcId::Str(s) => f.write_str(s),
    }
  }
}

impl From<&str> for PcId {
  fn from(s: &str) -> Self {
    PcId::Str(s.to_string())
  }
}

impl From<i64> for PcId {
  fn from(n: i64) -> Self {
    PcId::Num(n)
  }
}

// ============================================================================
// Entity record
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Disk {
  #[serde(default)]
  pub model: String,
  #[serde(rename = "type", default)]
  pub kind: String,
  #[serde(default)]
  pub size_gb: f64,
}

impl Disk {
  pub fn value(&self, field: DiskField) -> String {
    match field {
      DiskField::Model => self.model.clone(),
      DiskField::Kind => self.kind.clone(),
      DiskField::SizeGb => format!("{} GB", self.size_gb),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RamStick {
  #[serde(default)]
  pub manufacturer: String,
  #[serde(default)]
  pub part_number: String,
  #[serde(default)]
  pub size_gb: f64,
  #[serde(default)]
  pub speed_mhz: u32,
}

impl RamStick {
  pub fn value(&self, field: RamStickField) -> String {
    match field {
      RamStickField::Manufacturer => self.manufacturer.clone(),
      RamStickField::PartNumber => self.part_number.clone(),
      RamStickField::SizeGb => format!("{} GB", self.size_gb),
      RamStickField::SpeedMhz => format!("{} MHz", self.speed_mhz),
    }
  }
}

/// A single inventory record. Only `notes` is ever changed by this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pc {
  pub id: PcId,
  pub host: String,
  pub cpu: String,
  pub ram_total_gb: f64,
  #[serde(default)]
  pub ram_slots: Option<u32>,
  #[serde(default)]
  pub ram_sticks: Vec<RamStick>,
  #[serde(default)]
  pub disks: Vec<Disk>,
  #[serde(default)]
  pub gpus: Vec<String>,
  #[serde(default)]
  pub mainboard: String,
  #[serde(default)]
  pub resolution: String,
  #[serde(default)]
  pub serial: String,
  #[serde(default)]
  pub notes: String,
}

// ============================================================================
// Collection and write payloads
// ============================================================================

/// Element of the `GET /pcs` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcRef {
  pub id: PcId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateNotesRequest<'a> {
  pub pc_id: &'a PcId,
  pub notes: &'a str,
}

/// Acknowledgement body returned by both write endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcIdResponse {
  pub pc_id: PcId,
}
