//! JSON event file and configuration readers.
//!

use crate::{Error, Result};
use log::debug;
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use stripspace_core::{
    CartesianSegmentation, PlanarStripModule, SensorId, SpacePointBuilderConfig, StripCluster,
    StripDetector,
};

/// Segmentation of a sensor as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentationDescriptor {
    /// Half length along local x.
    pub half_x: f64,
    /// Half length along local y.
    pub half_y: f64,
    /// Number of bins along local x.
    pub bins_x: usize,
    /// Number of bins along local y.
    pub bins_y: usize,
}

/// Placement and segmentation of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    /// Sensor identifier referenced by hits.
    pub id: u32,
    /// Global position of the local origin.
    pub center: [f64; 3],
    /// Global direction of the local x axis.
    pub axis_x: [f64; 3],
    /// Global direction of the local y axis.
    pub axis_y: [f64; 3],
    /// Segmentation of the sensor surface.
    pub segmentation: SegmentationDescriptor,
}

impl SensorDescriptor {
    /// Builds the planar module described by this entry.
    pub fn to_module(&self) -> Result<PlanarStripModule> {
        let seg = &self.segmentation;
        let segmentation =
            CartesianSegmentation::new(seg.half_x, seg.half_y, seg.bins_x, seg.bins_y)?;
        PlanarStripModule::with_frame(
            segmentation,
            Vector3::from(self.center),
            Vector3::from(self.axis_x),
            Vector3::from(self.axis_y),
        )
        .map_err(Into::into)
    }
}

/// One digitized hit as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    /// Sensor the hit was recorded on.
    pub sensor: u32,
    /// Local position on the sensor.
    pub local: [f64; 2],
}

impl From<HitRecord> for StripCluster {
    fn from(record: HitRecord) -> Self {
        StripCluster {
            sensor: SensorId::new(record.sensor),
            local: Vector2::from(record.local),
        }
    }
}

/// Hits of one event as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Hits on the first layer.
    #[serde(default)]
    pub first: Vec<HitRecord>,
    /// Hits on the second layer.
    #[serde(default)]
    pub second: Vec<HitRecord>,
}

/// Top-level layout of an event file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFile {
    /// Sensor table.
    pub sensors: Vec<SensorDescriptor>,
    /// Recorded events.
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

/// Hits of one event, ready for the builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    /// Hits on the first layer.
    pub first: Vec<StripCluster>,
    /// Hits on the second layer.
    pub second: Vec<StripCluster>,
}

impl Event {
    /// Total number of hits on both layers.
    pub fn hit_count(&self) -> usize {
        self.first.len() + self.second.len()
    }
}

impl From<&EventRecord> for Event {
    fn from(record: &EventRecord) -> Self {
        Self {
            first: record.first.iter().copied().map(StripCluster::from).collect(),
            second: record.second.iter().copied().map(StripCluster::from).collect(),
        }
    }
}

/// Reader for JSON event files.
pub struct EventFileReader {
    contents: EventFile,
    path: Option<PathBuf>,
}

impl EventFileReader {
    /// Opens and parses an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid event file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let mut reader = Self::from_reader(BufReader::new(file))?;
        reader.path = Some(path.as_ref().to_path_buf());
        debug!(
            "{}: {} sensors, {} events",
            path.as_ref().display(),
            reader.contents.sensors.len(),
            reader.contents.events.len()
        );
        Ok(reader)
    }

    /// Parses an event file from any reader.
    ///
    /// # Errors
    /// Returns an error on malformed JSON or duplicate sensor ids.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let contents: EventFile = serde_json::from_reader(reader)?;
        let mut seen = HashSet::new();
        for sensor in &contents.sensors {
            if !seen.insert(sensor.id) {
                return Err(Error::InvalidFormat(format!(
                    "duplicate sensor id {}",
                    sensor.id
                )));
            }
        }
        Ok(Self {
            contents,
            path: None,
        })
    }

    /// Path the file was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw file contents.
    pub fn contents(&self) -> &EventFile {
        &self.contents
    }

    /// Number of events in the file.
    pub fn event_count(&self) -> usize {
        self.contents.events.len()
    }

    /// Builds the detector geometry from the sensor table.
    ///
    /// # Errors
    /// Returns an error if a sensor has an invalid segmentation or frame.
    pub fn detector(&self) -> Result<StripDetector> {
        let mut detector = StripDetector::new();
        for sensor in &self.contents.sensors {
            detector.insert(SensorId::new(sensor.id), sensor.to_module()?);
        }
        Ok(detector)
    }

    /// Converts all events into builder input.
    pub fn events(&self) -> Vec<Event> {
        self.contents.events.iter().map(Event::from).collect()
    }
}

/// Loads a builder configuration from a JSON file.
///
/// Missing fields take their default values.
///
/// # Errors
/// Returns an error if the file cannot be read, is malformed or fails validation.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SpacePointBuilderConfig> {
    let file = File::open(path)?;
    let config: SpacePointBuilderConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use stripspace_core::StripGeometry;
    use tempfile::NamedTempFile;

    const EVENT_FILE: &str = r#"{
        "sensors": [
            {"id": 1, "center": [0.0, 0.0, 0.5], "axis_x": [0.0, 0.0, 1.0], "axis_y": [1.0, 0.0, 0.0],
             "segmentation": {"half_x": 0.05, "half_y": 1.0, "bins_x": 1, "bins_y": 1}},
            {"id": 2, "center": [0.0, 1.0, 0.5], "axis_x": [1.0, 0.0, 0.0], "axis_y": [0.0, 0.0, 1.0],
             "segmentation": {"half_x": 0.05, "half_y": 1.0, "bins_x": 1, "bins_y": 1}}
        ],
        "events": [
            {"first": [{"sensor": 1, "local": [0.0, 0.0]}], "second": [{"sensor": 2, "local": [0.0, 0.0]}]},
            {"first": []},
            {"second": [{"sensor": 2, "local": [0.0, 0.5]}]}
        ]
    }"#;

    #[test]
    fn test_parse_event_file() {
        let reader = EventFileReader::from_reader(EVENT_FILE.as_bytes()).unwrap();
        assert_eq!(reader.event_count(), 3);
        assert!(reader.path().is_none());

        let detector = reader.detector().unwrap();
        assert_eq!(detector.len(), 2);

        let events = reader.events();
        assert_eq!(events[0].hit_count(), 2);
        assert_eq!(events[1].hit_count(), 0);
        assert!(events[2].first.is_empty());
        assert_eq!(events[2].second.len(), 1);

        let ends = detector.strip_ends(&events[0].first[0]).unwrap();
        approx::assert_relative_eq!(ends.top, Vector3::new(1.0, 0.0, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_open_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(EVENT_FILE.as_bytes()).unwrap();
        let reader = EventFileReader::open(file.path()).unwrap();
        assert_eq!(reader.path(), Some(file.path()));
        assert_eq!(reader.contents().sensors.len(), 2);
    }

    #[test]
    fn test_duplicate_sensor_rejected() {
        let json = r#"{"sensors": [
            {"id": 1, "center": [0,0,0], "axis_x": [1,0,0], "axis_y": [0,1,0],
             "segmentation": {"half_x": 1, "half_y": 1, "bins_x": 1, "bins_y": 1}},
            {"id": 1, "center": [0,0,1], "axis_x": [1,0,0], "axis_y": [0,1,0],
             "segmentation": {"half_x": 1, "half_y": 1, "bins_x": 1, "bins_y": 1}}
        ]}"#;
        assert!(matches!(
            EventFileReader::from_reader(json.as_bytes()),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_invalid_segmentation_surfaces_core_error() {
        let json = r#"{"sensors": [
            {"id": 3, "center": [0,0,0], "axis_x": [1,0,0], "axis_y": [0,1,0],
             "segmentation": {"half_x": 1, "half_y": 1, "bins_x": 0, "bins_y": 1}}
        ]}"#;
        let reader = EventFileReader::from_reader(json.as_bytes()).unwrap();
        assert!(matches!(reader.detector(), Err(Error::CoreError(_))));
    }

    #[test]
    fn test_load_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"diff_phi2": 0.5, "vertex": [0.0, -10.0, 0.5], "use_perp_proj": true, "pairing": "closest_match"}}"#
        )
        .unwrap();
        let config = load_config(file.path()).unwrap();
        assert!((config.diff_phi2 - 0.5).abs() < f64::EPSILON);
        assert!((config.diff_theta2 - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.vertex, Vector3::new(0.0, -10.0, 0.5));
        assert!(config.use_perp_proj);
        assert_eq!(config.pairing, stripspace_core::PairingStrategy::ClosestMatch);

        let mut bad = NamedTempFile::new().unwrap();
        write!(bad, r#"{{"strip_length_tolerance": -1.0}}"#).unwrap();
        assert!(matches!(load_config(bad.path()), Err(Error::CoreError(_))));
    }
}
