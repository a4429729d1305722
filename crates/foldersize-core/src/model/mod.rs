/// Data model for foldersize.
///
/// Re-exports the listing entry, the presentation item, and the
/// per-pass aggregate size map.
pub mod aggregate_map;
pub mod entry;
pub mod item;
pub mod size;

pub use aggregate_map::AggregateSizeMap;
pub use entry::{Entry, EntryKind};
pub use item::SizeItem;
