use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NotifierError, Result};

pub const PIPELINE_EXECUTION_STATE_CHANGE: &str = "CodePipeline Pipeline Execution State Change";
pub const STAGE_EXECUTION_STATE_CHANGE: &str = "CodePipeline Stage Execution State Change";
pub const ACTION_EXECUTION_STATE_CHANGE: &str = "CodePipeline Action Execution State Change";

/// Kind of CodePipeline event, taken from the `detail-type` field.
///
/// Matching is case-exact; anything unrecognized is kept as `Other`, and
/// a missing `detail-type` is `Other("")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailType {
    PipelineStateChange,
    StageStateChange,
    ActionStateChange,
    Other(String),
}

impl DetailType {
    /// The `detail-type` string as it appears on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Self::PipelineStateChange => PIPELINE_EXECUTION_STATE_CHANGE,
            Self::StageStateChange => STAGE_EXECUTION_STATE_CHANGE,
            Self::ActionStateChange => ACTION_EXECUTION_STATE_CHANGE,
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for DetailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DetailType {
    fn from(value: &str) -> Self {
        match value {
            PIPELINE_EXECUTION_STATE_CHANGE => Self::PipelineStateChange,
            STAGE_EXECUTION_STATE_CHANGE => Self::StageStateChange,
            ACTION_EXECUTION_STATE_CHANGE => Self::ActionStateChange,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Lifecycle state reported by CodePipeline.
///
/// `Superceded` keeps the upstream spelling. Unknown states are carried
/// verbatim so they can still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ExecutionState {
    Started,
    Succeeded,
    Resumed,
    Failed,
    Cancelled,
    Superceded,
    Other(String),
}

impl From<String> for ExecutionState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "STARTED" => Self::Started,
            "SUCCEEDED" => Self::Succeeded,
            "RESUMED" => Self::Resumed,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            "SUPERCEDED" => Self::Superceded,
            _ => Self::Other(value),
        }
    }
}

impl ExecutionState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Started => "STARTED",
            Self::Succeeded => "SUCCEEDED",
            Self::Resumed => "RESUMED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Superceded => "SUPERCEDED",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event timestamp, forwarded unchanged as the Slack `ts` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    Epoch(i64),
    EpochFractional(f64),
    Text(String),
}

/// Event envelope as delivered by CloudWatch Events / EventBridge.
///
/// Only `detail-type` is looked at up front. `detail` and `time` stay raw
/// until the event is known to be one we handle.
#[derive(Debug, Deserialize)]
pub struct RawEvent {
    #[serde(default, rename = "detail-type")]
    pub detail_type: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub time: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Detail {
    pipeline: String,
    state: ExecutionState,
    #[serde(rename = "execution-id")]
    execution_id: String,
    #[serde(default)]
    stage: Option<String>,
}

/// A decoded CodePipeline state change event.
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    pub pipeline_name: String,
    pub state: ExecutionState,
    pub execution_id: String,
    pub stage_name: Option<String>,
    pub time: Option<EventTime>,
}

impl RawEvent {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| NotifierError::InvalidEvent(e.to_string()))
    }

    /// The raw `detail-type`, empty when the field is missing or null.
    pub fn detail_type(&self) -> &str {
        self.detail_type.as_deref().unwrap_or_default()
    }

    pub fn kind(&self) -> DetailType {
        DetailType::from(self.detail_type())
    }

    /// Decodes the `detail` body and `time` into a [`PipelineEvent`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidEvent` if `detail` is missing or lacks the
    /// `pipeline`, `state` or `execution-id` fields, or if `time` is neither
    /// a number nor a string.
    pub fn into_pipeline_event(self) -> Result<PipelineEvent> {
        let kind = self.kind();
        let detail = self
            .detail
            .ok_or_else(|| NotifierError::InvalidEvent(format!("{kind} event has no detail")))?;

        let detail: Detail = serde_json::from_value(detail)
            .map_err(|e| NotifierError::InvalidEvent(format!("{kind}: {e}")))?;

        let time = self
            .time
            .map(serde_json::from_value::<EventTime>)
            .transpose()
            .map_err(|e| NotifierError::InvalidEvent(format!("{kind}: time: {e}")))?;

        Ok(PipelineEvent {
            pipeline_name: detail.pipeline,
            state: detail.state,
            execution_id: detail.execution_id,
            stage_name: detail.stage,
            time,
        })
    }
}
