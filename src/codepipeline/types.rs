use serde::{Deserialize, Serialize};

/// `GetPipelineExecution` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPipelineExecutionInput<'a> {
    pub pipeline_name: &'a str,
    pub pipeline_execution_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPipelineExecutionOutput {
    pub pipeline_execution: Option<PipelineExecution>,
}

/// One run of a pipeline.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineExecution {
    /// Source revisions that triggered the run, in upstream order
    #[serde(default)]
    pub artifact_revisions: Vec<ArtifactRevision>,
}

/// A versioned source artifact of an execution.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRevision {
    pub name: Option<String>,
    pub revision_id: Option<String>,
    pub revision_summary: Option<String>,
    pub revision_url: Option<String>,
}

/// `GetPipeline` request body.
#[derive(Debug, Serialize)]
pub struct GetPipelineInput<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GetPipelineOutput {
    pub pipeline: Option<PipelineDeclaration>,
}

#[derive(Debug, Deserialize)]
pub struct PipelineDeclaration {
    #[serde(default)]
    pub stages: Vec<StageDeclaration>,
}

#[derive(Debug, Deserialize)]
pub struct StageDeclaration {
    pub name: String,
}

/// Error body returned by the JSON 1.1 protocol on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "__type")]
    pub error_type: Option<String>,
    #[serde(alias = "Message")]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Error code without the namespace prefix some endpoints add
    /// (`com.amazonaws.codepipeline#PipelineNotFoundException`).
    pub fn code(&self) -> Option<&str> {
        self.error_type
            .as_deref()
            .map(|t| t.rsplit('#').next().unwrap_or(t))
    }
}
