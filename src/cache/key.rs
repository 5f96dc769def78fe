use std::fmt;

use crate::api::types::PcId;

/// Identifies one cache entry.
///
/// The collection and every item are independent entries; nothing ties
/// "the list contains X" to "item X is cached".
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
  /// `GET /pcs`
  Pcs,
  /// `GET /pc/{id}`
  Pc { id: PcId },
}

impl QueryKey {
  pub fn pc(id: impl Into<PcId>) -> Self {
    Self::Pc { id: id.into() }
  }

  pub fn item_id(&self) -> Option<&PcId> {
    match self {
      Self::Pcs => None,
      Self::Pc { id } => Some(id),
    }
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Pcs => f.write_str("pcs"),
      Self::Pc { id } => write!(f, "pc:{}", id),
    }
  }
}
