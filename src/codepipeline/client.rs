use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::Credentials;
use crate::config::Config;
use crate::error::{NotifierError, Result};

use super::sigv4::{self, RequestParts, Signer};
use super::types::{
    ApiErrorBody, GetPipelineExecutionInput, GetPipelineExecutionOutput, GetPipelineInput,
    GetPipelineOutput, PipelineDeclaration, PipelineExecution,
};

const SERVICE: &str = "codepipeline";
const TARGET_PREFIX: &str = "CodePipeline_20150709";
const CONTENT_TYPE_JSON_1_1: &str = "application/x-amz-json-1.1";

pub(super) const GET_PIPELINE_EXECUTION: &str = "GetPipelineExecution";
pub(super) const GET_PIPELINE: &str = "GetPipeline";

/// Client for the CodePipeline JSON 1.1 API.
///
/// Requests are signed with SigV4 when credentials are available and sent
/// unsigned otherwise.
pub struct CodePipelineClient {
    client: Client,
    endpoint: Url,
    region: String,
    credentials: Option<Credentials>,
}

impl CodePipelineClient {
    pub fn new(config: &Config, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pipeline-notify/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.codepipeline.timeout_secs))
            .build()
            .map_err(|e| NotifierError::Config(format!("Failed to create HTTP client: {e}")))?;

        let endpoint = Url::parse(&config.codepipeline_endpoint())
            .map_err(|e| NotifierError::Config(format!("Invalid CodePipeline endpoint: {e}")))?;

        if credentials.is_none() {
            warn!("No AWS credentials found, CodePipeline requests will be unsigned");
        }

        Ok(Self {
            client,
            endpoint,
            region: config.codepipeline.region.clone(),
            credentials,
        })
    }

    pub async fn get_pipeline_execution(
        &self,
        pipeline_name: &str,
        execution_id: &str,
    ) -> Result<PipelineExecution> {
        let output: GetPipelineExecutionOutput = self
            .call(
                GET_PIPELINE_EXECUTION,
                &GetPipelineExecutionInput {
                    pipeline_name,
                    pipeline_execution_id: execution_id,
                },
            )
            .await?;

        output.pipeline_execution.ok_or_else(|| {
            NotifierError::upstream(
                GET_PIPELINE_EXECUTION,
                format!("no execution {execution_id} for pipeline {pipeline_name}"),
            )
        })
    }

    pub async fn get_pipeline(&self, pipeline_name: &str) -> Result<PipelineDeclaration> {
        let output: GetPipelineOutput = self
            .call(GET_PIPELINE, &GetPipelineInput { name: pipeline_name })
            .await?;

        output.pipeline.ok_or_else(|| {
            NotifierError::upstream(GET_PIPELINE, format!("no pipeline named {pipeline_name}"))
        })
    }

    /// Host header value as the HTTP client will send it.
    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Executes one API operation. Never retried.
    async fn call<T>(&self, operation: &'static str, input: &impl Serialize) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(input)?;
        let now = Utc::now();
        let target = format!("{TARGET_PREFIX}.{operation}");

        let mut headers = vec![
            ("content-type".to_string(), CONTENT_TYPE_JSON_1_1.to_string()),
            ("host".to_string(), self.host()),
            ("x-amz-date".to_string(), sigv4::amz_date(now)),
            ("x-amz-target".to_string(), target),
        ];
        if let Some(token) = self
            .credentials
            .as_ref()
            .and_then(|c| c.session_token.clone())
        {
            headers.push(("x-amz-security-token".to_string(), token));
        }

        let authorization = self.credentials.as_ref().map(|credentials| {
            Signer::new(credentials, &self.region, SERVICE).authorization(
                &RequestParts {
                    method: "POST",
                    path: self.endpoint.path(),
                    query: "",
                    headers: &headers,
                    payload: &payload,
                },
                now,
            )
        });

        debug!("CodePipeline {operation} -> {}", self.endpoint);

        // reqwest derives Host from the URL itself
        let mut request = self.client.post(self.endpoint.clone());
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|e| NotifierError::upstream(operation, e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| NotifierError::upstream(operation, e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<ApiErrorBody>(&body) {
                Ok(error) => format!(
                    "{}: {} (status {})",
                    error.code().unwrap_or("UnknownError"),
                    error.message.as_deref().unwrap_or("no message"),
                    status.as_u16()
                ),
                Err(_) => format!(
                    "status {}: {}",
                    status.as_u16(),
                    String::from_utf8_lossy(&body)
                ),
            };
            return Err(NotifierError::upstream(operation, message));
        }

        serde_json::from_slice(&body).map_err(|e| {
            NotifierError::upstream(operation, format!("invalid response body: {e}"))
        })
    }
}

impl std::fmt::Debug for CodePipelineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodePipelineClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("region", &self.region)
            .field("signed", &self.credentials.is_some())
            .finish()
    }
}
