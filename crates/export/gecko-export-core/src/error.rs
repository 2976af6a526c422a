//! Error types for the export pipeline.

use crate::axis::Axis;

/// Every failure the pipeline can report. Stages fail fast and hand the first
/// error back to the caller; no partial document is ever produced.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExportError {
    /// A record is missing a field, carries a bad value, or conflicts with another record.
    #[error("Malformed input{}: {reason}", location(.record, .bone, .frame))]
    MalformedInput {
        record: Option<usize>,
        bone: Option<String>,
        frame: Option<u32>,
        reason: String,
    },

    /// Rejected configuration option. Raised before any data is processed.
    #[error("Invalid config option '{option}': {reason}")]
    Config { option: String, reason: String },

    /// Scale normalization would divide by a zero first-frame component.
    #[error("Degenerate scale for bone '{bone}' at frame {frame}: {axis} axis is zero")]
    DegenerateScale { bone: String, frame: u32, axis: Axis },

    /// A named bone reached the reducer without any samples.
    #[error("Bone '{bone}' has an empty timeline")]
    EmptyTimeline { bone: String },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    #[error("IO error: {reason}")]
    Io { reason: String },
}

fn location(record: &Option<usize>, bone: &Option<String>, frame: &Option<u32>) -> String {
    let mut parts = Vec::new();
    if let Some(index) = record {
        parts.push(format!("record {index}"));
    }
    if let Some(name) = bone {
        parts.push(format!("bone '{name}'"));
    }
    if let Some(frame) = frame {
        parts.push(format!("frame {frame}"));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl ExportError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            record: None,
            bone: None,
            frame: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_record(record: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            record: Some(record),
            bone: None,
            frame: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn config(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Errors scoped to a single bone; the caller may skip that bone and carry on.
    #[inline]
    pub fn is_bone_local(&self) -> bool {
        matches!(self, Self::DegenerateScale { .. })
    }

    /// Bone the error refers to, when known.
    pub fn bone(&self) -> Option<&str> {
        match self {
            Self::MalformedInput { bone, .. } => bone.as_deref(),
            Self::DegenerateScale { bone, .. } | Self::EmptyTimeline { bone } => Some(bone),
            _ => None,
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "input",
            Self::Config { .. } => "config",
            Self::DegenerateScale { .. } => "scale",
            Self::EmptyTimeline { .. } => "timeline",
            Self::Serialization { .. } => "serialization",
            Self::Io { .. } => "io",
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
