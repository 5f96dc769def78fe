//! Display labels for record fields.
//!
//! Nested records (disks, RAM sticks) are rendered by walking these tables in
//! order rather than by enumerating JSON keys at runtime.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcField {
  Cpu,
  Disks,
  Gpus,
  Host,
  Id,
  Mainboard,
  RamSlots,
  RamSticks,
  RamTotalGb,
  Resolution,
  Serial,
  Notes,
}

impl PcField {
  /// Detail panel order.
  pub const ALL: [PcField; 12] = [
    PcField::Cpu,
    PcField::Disks,
    PcField::Gpus,
    PcField::Host,
    PcField::Id,
    PcField::Mainboard,
    PcField::RamSlots,
    PcField::RamSticks,
    PcField::RamTotalGb,
    PcField::Resolution,
    PcField::Serial,
    PcField::Notes,
  ];

  pub const fn label(self) -> &'static str {
    match self {
      PcField::Cpu => "CPU",
      PcField::Disks => "Disks",
      PcField::Gpus => "GPUs",
      PcField::Host => "Host",
      PcField::Id => "ID",
      PcField::Mainboard => "Mainboard",
      PcField::RamSlots => "RAM slots",
      PcField::RamSticks => "RAM sticks",
      PcField::RamTotalGb => "RAM total",
      PcField::Resolution => "Resolution",
      PcField::Serial => "Serial number",
      PcField::Notes => "Notes",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskField {
  Model,
  Kind,
  SizeGb,
}

impl DiskField {
  pub const ALL: [DiskField; 3] = [DiskField::Model, DiskField::Kind, DiskField::SizeGb];

  pub const fn label(self) -> &'static str {
    match self {
      DiskField::Model => "Model",
      DiskField::Kind => "Type",
      DiskField::SizeGb => "Size",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamStickField {
  Manufacturer,
  PartNumber,
  SizeGb,
  SpeedMhz,
}

impl RamStickField {
  pub const ALL: [RamStickField; 4] = [
    RamStickField::Manufacturer,
    RamStickField::PartNumber,
    RamStickField::SizeGb,
    RamStickField::SpeedMhz,
  ];

  pub const fn label(self) -> &'static str {
    match self {
      RamStickField::Manufacturer => "Manufacturer",
      RamStickField::PartNumber => "Part number",
      RamStickField::SizeGb => "Size",
      RamStickField::SpeedMhz => "Speed",
    }
  }
}
