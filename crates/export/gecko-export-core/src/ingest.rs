//! Ingest of baked per-frame transform records.
//!
//! Input is a JSON array with one object per animated object per sampled
//! frame, in any order:
//!
//! ```json
//! [{ "name": "arm", "frame": 1, "location": [0, 0, 0],
//!    "rotation": [0, 90, 0], "scale": [1, 1, 1] }]
//! ```
//!
//! Unknown keys are ignored. An optional `"interpolation"` key is carried
//! through to the emitted keys unchanged, whether or not the decoder knows it.

use std::collections::btree_map::{BTreeMap, Entry};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::axis::Vec3;
use crate::data::{BoneTimeline, Interpolation, KeyframeSample, TimelineSet};
use crate::error::ExportError;

/// One validated input record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub name: String,
    pub frame: u32,
    pub location: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpolation: Option<Interpolation>,
}

impl InputRecord {
    fn into_sample(self) -> (String, KeyframeSample) {
        let sample = KeyframeSample {
            frame: self.frame,
            location: self.location,
            rotation: self.rotation,
            scale: self.scale,
            interpolation: self.interpolation,
        };
        (self.name, sample)
    }
}

// ----- JSON schema (serde) -----

/// Every field optional so a missing one can be reported by name.
#[derive(Debug, Deserialize)]
struct RawRecord {
    name: Option<String>,
    frame: Option<i64>,
    location: Option<Vec3>,
    rotation: Option<Vec3>,
    scale: Option<Vec3>,
    interpolation: Option<String>,
}

impl RawRecord {
    fn validate(self, index: usize) -> Result<InputRecord, ExportError> {
        let missing = |field: &str| {
            ExportError::malformed_record(index, format!("missing required field '{field}'"))
        };

        let name = self.name.ok_or_else(|| missing("name"))?;
        let frame = self.frame.ok_or_else(|| missing("frame"))?;
        let location = self.location.ok_or_else(|| missing("location"))?;
        let rotation = self.rotation.ok_or_else(|| missing("rotation"))?;
        let scale = self.scale.ok_or_else(|| missing("scale"))?;

        let frame = u32::try_from(frame).map_err(|_| ExportError::MalformedInput {
            record: Some(index),
            bone: Some(name.clone()),
            frame: None,
            reason: format!("frame {frame} is not a non-negative frame index"),
        })?;

        let interpolation = match self.interpolation {
            None => None,
            Some(kind) if kind.trim().is_empty() => {
                return Err(ExportError::MalformedInput {
                    record: Some(index),
                    bone: Some(name),
                    frame: Some(frame),
                    reason: "interpolation name must be non-empty".into(),
                });
            }
            Some(kind) => Some(Interpolation::from(kind)),
        };

        Ok(InputRecord {
            name,
            frame,
            location,
            rotation,
            scale,
            interpolation,
        })
    }
}

/// Parse a JSON array of records into per-bone timelines.
pub fn ingest_json(json: &str) -> Result<TimelineSet, ExportError> {
    let document: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| ExportError::malformed(format!("input is not valid JSON: {e}")))?;
    let serde_json::Value::Array(items) = document else {
        return Err(ExportError::malformed("input must be a JSON array of records"));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            return Err(ExportError::malformed_record(index, "record must be a JSON object"));
        }
        let raw: RawRecord = serde_json::from_value(item)
            .map_err(|e| ExportError::malformed_record(index, e.to_string()))?;
        records.push(raw.validate(index)?);
    }
    ingest_records(records)
}

/// Group records by bone and sort each bone by frame.
///
/// A repeated (bone, frame) pair is tolerated only when both records carry
/// identical values.
pub fn ingest_records<I>(records: I) -> Result<TimelineSet, ExportError>
where
    I: IntoIterator<Item = InputRecord>,
{
    let mut grouped: BTreeMap<String, BTreeMap<u32, KeyframeSample>> = BTreeMap::new();
    let mut total = 0usize;

    for (index, record) in records.into_iter().enumerate() {
        if record.name.trim().is_empty() {
            return Err(ExportError::MalformedInput {
                record: Some(index),
                bone: None,
                frame: Some(record.frame),
                reason: "bone name must be non-empty".into(),
            });
        }
        let (name, sample) = record.into_sample();
        let frames = grouped.entry(name.clone()).or_default();
        match frames.entry(sample.frame) {
            Entry::Vacant(slot) => {
                slot.insert(sample);
                total += 1;
            }
            Entry::Occupied(existing) if *existing.get() == sample => {
                warn!(
                    "ingest: identical duplicate record {} for bone '{}' frame {}; keeping one",
                    index, name, sample.frame
                );
            }
            Entry::Occupied(_) => {
                return Err(ExportError::MalformedInput {
                    record: Some(index),
                    bone: Some(name),
                    frame: Some(sample.frame),
                    reason: "duplicate frame with conflicting values".into(),
                });
            }
        }
    }

    let mut set = TimelineSet::new();
    for (name, frames) in grouped {
        set.insert(BoneTimeline::new(name, frames.into_values().collect())?)?;
    }
    debug!("ingest: {} samples across {} bones", total, set.len());
    Ok(set)
}
