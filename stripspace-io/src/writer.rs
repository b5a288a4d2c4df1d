//! Space point writers.

use crate::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use stripspace_core::SpacePoint;

/// Size in bytes of one binary space point record.
///
/// Layout (little-endian): u64 event, f64 x, f64 y, f64 z, u64 group,
/// u64 first, u64 second, u8 recovered.
pub const BINARY_RECORD_SIZE: usize = 8 + 3 * 8 + 3 * 8 + 1;

const CSV_HEADER: &str = "event,x,y,z,group,first,second,recovered";

/// Writer for resolved space points.
///
/// Events are appended one after another; the CSV header is emitted once,
/// before the first record.
pub struct SpacePointWriter {
    writer: BufWriter<File>,
    header_written: bool,
}

impl SpacePointWriter {
    /// Creates a new file writer, truncating any existing file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            header_written: false,
        })
    }

    /// Appends the space points of one event as CSV rows.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_csv(&mut self, event: usize, points: &[SpacePoint]) -> Result<()> {
        if !self.header_written {
            writeln!(self.writer, "{CSV_HEADER}")?;
            self.header_written = true;
        }

        for sp in points {
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{}",
                event,
                sp.x(),
                sp.y(),
                sp.z(),
                sp.group,
                sp.first,
                sp.second,
                u8::from(sp.recovered)
            )?;
        }
        Ok(())
    }

    /// Appends the space points of one event as binary records.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_binary(&mut self, event: usize, points: &[SpacePoint]) -> Result<()> {
        let event = event as u64;
        for sp in points {
            self.writer.write_all(&event.to_le_bytes())?;
            for coord in sp.position.iter() {
                self.writer.write_all(&coord.to_le_bytes())?;
            }
            for index in [sp.group, sp.first, sp.second] {
                self.writer.write_all(&(index as u64).to_le_bytes())?;
            }
            self.writer.write_all(&[u8::from(sp.recovered)])?;
        }
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the underlying file cannot be flushed.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
