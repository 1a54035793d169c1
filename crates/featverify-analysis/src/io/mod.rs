//! Readers and writers for delimited tabular data.
pub mod delimited;

pub use delimited::{read_frame, read_frame_with_config, write_frame, TableReaderConfig};
