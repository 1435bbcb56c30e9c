use log::{debug, info};

use crate::error::{NotifierError, Result};

use super::client::CodePipelineClient;
use super::types::{ArtifactRevision, PipelineDeclaration, PipelineExecution};

/// Source revision behind a pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    pub artifact_name: String,
    /// Full commit hash; only [`RevisionInfo::short_commit`] is displayed
    pub commit_id: String,
    pub summary: String,
    pub source_url: String,
}

impl RevisionInfo {
    /// First seven characters of the commit id (fewer if it is shorter).
    pub fn short_commit(&self) -> &str {
        match self.commit_id.char_indices().nth(7) {
            Some((idx, _)) => &self.commit_id[..idx],
            None => &self.commit_id,
        }
    }
}

impl From<ArtifactRevision> for RevisionInfo {
    fn from(revision: ArtifactRevision) -> Self {
        Self {
            artifact_name: revision.name.unwrap_or_default(),
            commit_id: revision.revision_id.unwrap_or_default(),
            summary: revision.revision_summary.unwrap_or_default(),
            source_url: revision.revision_url.unwrap_or_default(),
        }
    }
}

/// Position of a stage within its pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePosition {
    pub pipeline_name: String,
    pub stage_name: String,
    pub index_1_based: usize,
    pub total_stages: usize,
}

/// First artifact revision of an execution, if any.
pub fn revision_from_execution(execution: PipelineExecution) -> Option<RevisionInfo> {
    execution
        .artifact_revisions
        .into_iter()
        .next()
        .map(RevisionInfo::from)
}

/// Locates `stage_name` among the declared stages, in declaration order.
///
/// The position carries the requested `pipeline_name`, not the name echoed
/// back in the declaration.
///
/// # Errors
///
/// Returns `StageNotFound` when no stage has that exact name.
pub fn stage_position(
    pipeline: &PipelineDeclaration,
    pipeline_name: &str,
    stage_name: &str,
) -> Result<StagePosition> {
    let index = pipeline
        .stages
        .iter()
        .position(|stage| stage.name == stage_name)
        .ok_or_else(|| NotifierError::StageNotFound {
            pipeline: pipeline_name.to_string(),
            stage: stage_name.to_string(),
        })?;

    Ok(StagePosition {
        pipeline_name: pipeline_name.to_string(),
        stage_name: stage_name.to_string(),
        index_1_based: index + 1,
        total_stages: pipeline.stages.len(),
    })
}

/// Enriches events with revision and stage metadata from CodePipeline.
#[derive(Debug)]
pub struct MetadataFetcher {
    client: CodePipelineClient,
}

impl MetadataFetcher {
    pub fn new(client: CodePipelineClient) -> Self {
        Self { client }
    }

    /// Fetches the first artifact revision of an execution.
    ///
    /// Returns `Ok(None)` when the execution has no artifact revisions.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamQuery` if the API call fails or the execution does
    /// not exist.
    pub async fn fetch_revision_info(
        &self,
        pipeline_name: &str,
        execution_id: &str,
    ) -> Result<Option<RevisionInfo>> {
        let execution = self
            .client
            .get_pipeline_execution(pipeline_name, execution_id)
            .await?;

        debug!(
            "Execution {execution_id} of {pipeline_name} has {} artifact revisions",
            execution.artifact_revisions.len()
        );

        Ok(revision_from_execution(execution))
    }

    /// Fetches the 1-based position of a stage and the pipeline's stage count.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamQuery` if the API call fails, `StageNotFound` if the
    /// pipeline has no stage with that name.
    pub async fn fetch_stage_position(
        &self,
        pipeline_name: &str,
        stage_name: &str,
    ) -> Result<StagePosition> {
        let pipeline = self.client.get_pipeline(pipeline_name).await?;
        let position = stage_position(&pipeline, pipeline_name, stage_name)?;

        info!(
            "Stage {stage_name} is {}/{} in {pipeline_name}",
            position.index_1_based, position.total_stages
        );

        Ok(position)
    }
}
