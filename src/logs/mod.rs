// Logs module - reading Apache log sources and splitting combined blobs

pub mod markers;
mod reader;

pub use markers::{compose, parse_combined, CombinedSections, Marker};
pub use reader::{read_log, ReadOptions};
