mod pc_detail;
mod pc_list;

#[cfg(test)]
pub(crate) mod stub;

pub use pc_detail::PcDetailView;
pub use pc_list::PcListView;
