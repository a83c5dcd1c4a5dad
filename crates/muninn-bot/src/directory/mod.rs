//! Name index: home servers declared in display names (`Alice [example.com]`)
//! for the main room's members, with the inverse server -> members map.

pub mod index;
pub mod monitor;
pub mod parse;

pub use index::{DirectoryEntry, NameIndex};
pub use monitor::NameMonitor;
pub use parse::{parse_name, TldSet};
