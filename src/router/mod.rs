//! Routes CodePipeline events to enrichment, formatting and delivery.
//!
//! | `detail-type`                              | Action                          |
//! |--------------------------------------------|---------------------------------|
//! | Stage Execution State Change               | stage notification (+ build     |
//! |                                            | metadata for the build stage)   |
//! | Pipeline Execution State Change            | no-op unless `pipeline-events`  |
//! | Action Execution State Change              | no-op                           |
//! | anything else                              | no-op                           |

use std::fmt;

use log::{debug, info, warn};

use crate::config::RoutingConfig;
use crate::error::{NotifierError, Result};
use crate::event::{DetailType, PipelineEvent, RawEvent};
use crate::slack::{Ack, MessageFormatter, WebhookDispatcher};

/// Terminal result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The primary notification was accepted by the webhook.
    Posted(Ack),
    /// Nothing was sent for this event kind.
    Skipped(DetailType),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posted(ack) => write!(f, "{ack}"),
            Self::Skipped(kind) if kind.as_str().is_empty() => {
                f.write_str("ignored event without detail-type")
            }
            Self::Skipped(kind) => write!(f, "ignored event type: {kind}"),
        }
    }
}

pub struct EventRouter {
    formatter: MessageFormatter,
    dispatcher: WebhookDispatcher,
    routing: RoutingConfig,
}

impl EventRouter {
    pub fn new(
        formatter: MessageFormatter,
        dispatcher: WebhookDispatcher,
        routing: RoutingConfig,
    ) -> Self {
        Self {
            formatter,
            dispatcher,
            routing,
        }
    }

    /// Handles one raw event JSON document.
    ///
    /// # Errors
    ///
    /// Returns the first failure on the primary path: an invalid event,
    /// an enrichment failure, or a delivery failure. The best-effort build
    /// metadata notification never fails the invocation.
    pub async fn handle_json(&self, json: &str) -> Result<Outcome> {
        let raw = RawEvent::parse(json)?;
        self.handle(raw).await
    }

    pub async fn handle(&self, raw: RawEvent) -> Result<Outcome> {
        let kind = raw.kind();
        info!("Received event: {}", raw.detail_type());

        match kind {
            DetailType::StageStateChange => {
                let event = raw.into_pipeline_event()?;
                self.handle_stage_event(&event).await
            }
            DetailType::PipelineStateChange if self.routing.pipeline_events => {
                let event = raw.into_pipeline_event()?;
                self.handle_pipeline_event(&event).await
            }
            DetailType::ActionStateChange => {
                debug!("Action execution events are not notified");
                Ok(Outcome::Skipped(kind))
            }
            _ => {
                debug!("Ignoring event type {kind}");
                Ok(Outcome::Skipped(kind))
            }
        }
    }

    async fn handle_stage_event(&self, event: &PipelineEvent) -> Result<Outcome> {
        let stage = event.stage_name.as_deref().ok_or_else(|| {
            NotifierError::InvalidEvent(format!(
                "stage event for {} has no stage",
                event.pipeline_name
            ))
        })?;

        if stage == self.routing.build_stage {
            match self.post_build_metadata(event).await {
                Ok(_) => info!("Posted build metadata for {}", event.pipeline_name),
                Err(e) if e.is_delivery() => warn!(
                    "Build metadata for {} was not delivered: {e}",
                    event.pipeline_name
                ),
                Err(e) => warn!(
                    "Could not prepare build metadata for {}: {e}",
                    event.pipeline_name
                ),
            }
        }

        let payload = self
            .formatter
            .format_stage_execution_message(&event.pipeline_name, stage, &event.state)
            .await?;
        let ack = self.dispatcher.post_notification(&payload).await?;

        info!(
            "Posted {} stage {} state {}",
            event.pipeline_name, stage, event.state
        );
        Ok(Outcome::Posted(ack))
    }

    async fn post_build_metadata(&self, event: &PipelineEvent) -> Result<Ack> {
        let payload = self
            .formatter
            .format_build_metadata_message(&event.pipeline_name, &event.execution_id)
            .await?;
        self.dispatcher.post_notification(&payload).await
    }

    async fn handle_pipeline_event(&self, event: &PipelineEvent) -> Result<Outcome> {
        let payload = self
            .formatter
            .format_pipeline_execution_message(
                &event.pipeline_name,
                &event.execution_id,
                &event.state,
                event.time.as_ref(),
            )
            .await?;
        let ack = self.dispatcher.post_notification(&payload).await?;

        info!(
            "Posted {} execution {} state {}",
            event.pipeline_name, event.execution_id, event.state
        );
        Ok(Outcome::Posted(ack))
    }
}

#[cfg(test)]
mod tests;
