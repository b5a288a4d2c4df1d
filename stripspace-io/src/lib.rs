//! stripspace-io: File I/O for stripspace.
//!
//! This crate reads JSON event files (sensor table plus per-event hit
//! collections) and builder configurations, and writes resolved space
//! points as CSV or little-endian binary records.
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{
    load_config, Event, EventFile, EventFileReader, EventRecord, HitRecord,
    SegmentationDescriptor, SensorDescriptor,
};
pub use writer::{SpacePointWriter, BINARY_RECORD_SIZE};
