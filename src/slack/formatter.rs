use log::debug;

use crate::codepipeline::{pipeline_console_url, MetadataFetcher, RevisionInfo, StagePosition};
use crate::error::{NotifierError, Result};
use crate::event::{EventTime, ExecutionState};

use super::payload::{Attachment, Color, Field, NotificationPayload};

/// Which event a state belongs to; `SUPERCEDED` only exists for pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateContext {
    Stage,
    Pipeline,
}

/// Maps a lifecycle state to its attachment color.
///
/// Unmapped states return `None` and the attachment is sent uncolored.
pub fn color_for_state(state: &ExecutionState, context: StateContext) -> Option<Color> {
    match state {
        ExecutionState::Started => Some(Color::Grey),
        ExecutionState::Succeeded => Some(Color::Green),
        ExecutionState::Resumed => Some(Color::Blue),
        ExecutionState::Failed => Some(Color::Red),
        ExecutionState::Cancelled => Some(Color::Yellow),
        ExecutionState::Superceded if context == StateContext::Pipeline => Some(Color::Blue),
        ExecutionState::Superceded | ExecutionState::Other(_) => None,
    }
}

/// Uppercases the first character and leaves the rest untouched.
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `FAILED` -> `Failed`
pub fn humanize_state(state: &ExecutionState) -> String {
    title_case(&state.as_str().to_lowercase())
}

fn revision_title(revision: &RevisionInfo) -> String {
    format!(
        "Building and deploying: <{}|{}@{}>",
        revision.source_url,
        revision.artifact_name,
        revision.short_commit()
    )
}

fn markdown_fields() -> Option<Vec<String>> {
    Some(vec!["text".to_string(), "title".to_string()])
}

/// Announces the revision a build stage is working on.
pub fn build_metadata_message(revision: &RevisionInfo) -> NotificationPayload {
    NotificationPayload::single(Attachment {
        title: revision_title(revision),
        text: Some(revision.summary.clone()),
        mrkdwn_in: markdown_fields(),
        ..Default::default()
    })
}

/// Pipeline-level state change with revision details and summary fields.
pub fn pipeline_execution_message(
    revision: &RevisionInfo,
    pipeline_name: &str,
    execution_id: &str,
    state: &ExecutionState,
    time: Option<&EventTime>,
    region: &str,
) -> NotificationPayload {
    let console_url = pipeline_console_url(region, pipeline_name);

    NotificationPayload::single(Attachment {
        color: color_for_state(state, StateContext::Pipeline),
        title: revision_title(revision),
        text: Some(revision.summary.clone()),
        mrkdwn_in: markdown_fields(),
        fields: Some(vec![
            Field::short("Pipeline", format!("<{console_url}|{pipeline_name}>")),
            Field::short("Execution Id", execution_id),
            Field::short("State", humanize_state(state)),
        ]),
        ts: time.cloned(),
        ..Default::default()
    })
}

/// Stage-level state change: one titled line linking to the console.
pub fn stage_execution_message(
    position: &StagePosition,
    state: &ExecutionState,
    region: &str,
) -> NotificationPayload {
    NotificationPayload::single(Attachment {
        color: color_for_state(state, StateContext::Stage),
        title: format!(
            "Pipeline: {}, Stage: {} ({}/{}), State: {}",
            title_case(&position.pipeline_name),
            position.stage_name,
            position.index_1_based,
            position.total_stages,
            humanize_state(state)
        ),
        title_link: Some(pipeline_console_url(region, &position.pipeline_name)),
        ..Default::default()
    })
}

/// Fetches enrichment metadata and turns it into Slack messages.
#[derive(Debug)]
pub struct MessageFormatter {
    fetcher: MetadataFetcher,
    region: String,
}

impl MessageFormatter {
    pub fn new(fetcher: MetadataFetcher, region: impl Into<String>) -> Self {
        Self {
            fetcher,
            region: region.into(),
        }
    }

    async fn require_revision(&self, pipeline_name: &str, execution_id: &str) -> Result<RevisionInfo> {
        self.fetcher
            .fetch_revision_info(pipeline_name, execution_id)
            .await?
            .ok_or_else(|| NotifierError::MissingRevision {
                pipeline: pipeline_name.to_string(),
                execution_id: execution_id.to_string(),
            })
    }

    /// # Errors
    ///
    /// `UpstreamQuery` if the execution cannot be fetched, `MissingRevision`
    /// if it has no artifact revisions.
    pub async fn format_pipeline_execution_message(
        &self,
        pipeline_name: &str,
        execution_id: &str,
        state: &ExecutionState,
        time: Option<&EventTime>,
    ) -> Result<NotificationPayload> {
        let revision = self.require_revision(pipeline_name, execution_id).await?;
        Ok(pipeline_execution_message(
            &revision,
            pipeline_name,
            execution_id,
            state,
            time,
            &self.region,
        ))
    }

    /// # Errors
    ///
    /// `UpstreamQuery` if the pipeline cannot be fetched, `StageNotFound` if
    /// the stage is not declared in it.
    pub async fn format_stage_execution_message(
        &self,
        pipeline_name: &str,
        stage_name: &str,
        state: &ExecutionState,
    ) -> Result<NotificationPayload> {
        let position = self
            .fetcher
            .fetch_stage_position(pipeline_name, stage_name)
            .await?;
        Ok(stage_execution_message(&position, state, &self.region))
    }

    /// # Errors
    ///
    /// Same as [`MessageFormatter::format_pipeline_execution_message`].
    pub async fn format_build_metadata_message(
        &self,
        pipeline_name: &str,
        execution_id: &str,
    ) -> Result<NotificationPayload> {
        let revision = self.require_revision(pipeline_name, execution_id).await?;
        debug!(
            "Build of {pipeline_name} is at {}@{}",
            revision.artifact_name,
            revision.short_commit()
        );
        Ok(build_metadata_message(&revision))
    }
}
