use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::auth::Credentials;
use crate::codepipeline::{CodePipelineClient, MetadataFetcher};
use crate::config::Config;
use crate::output;
use crate::router::EventRouter;
use crate::slack::{MessageFormatter, WebhookDispatcher};

#[derive(Parser)]
#[command(name = "pipeline-notify")]
#[command(author, version, about = "CodePipeline to Slack notifier", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./pipeline-notify.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one CodePipeline event and notify Slack
    Handle {
        /// Event JSON file; reads stdin when omitted
        #[arg(short, long)]
        event: Option<PathBuf>,

        #[arg(long, env = "SLACK_HOOK_URL", hide_env_values = true)]
        webhook_url: Option<String>,

        #[arg(long, env = "AWS_REGION")]
        region: Option<String>,

        #[arg(long, env = "CODEPIPELINE_ENDPOINT")]
        endpoint: Option<String>,

        /// Stage whose events also announce the revision being built
        #[arg(long)]
        build_stage: Option<String>,

        /// Also notify pipeline-level execution state changes
        #[arg(long, default_value_t = false)]
        pipeline_events: bool,

        /// Print payloads instead of posting them
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Write a default configuration file
    Init {
        #[arg(default_value = "pipeline-notify.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
}

/// Values given on the command line or through the environment.
#[derive(Default)]
struct Overrides {
    webhook_url: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    build_stage: Option<String>,
    pipeline_events: bool,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(url) = self.webhook_url {
            config.webhook.url = Some(url);
        }
        if let Some(region) = self.region {
            config.codepipeline.region = region;
        }
        if let Some(endpoint) = self.endpoint {
            config.codepipeline.endpoint = Some(endpoint);
        }
        if let Some(stage) = self.build_stage {
            config.routing.build_stage = stage;
        }
        config.routing.pipeline_events |= self.pipeline_events;
    }
}

fn read_event(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file: {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read event from stdin")?;
            Ok(buffer)
        }
    }
}

/// Wires the fetcher, formatter and dispatcher from one configuration.
fn build_router(config: &Config, dry_run: bool) -> Result<EventRouter> {
    let client = CodePipelineClient::new(config, Credentials::from_env())?;
    let formatter = MessageFormatter::new(MetadataFetcher::new(client), &config.codepipeline.region);
    let dispatcher = WebhookDispatcher::new(&config.webhook)?.with_dry_run(dry_run);

    Ok(EventRouter::new(formatter, dispatcher, config.routing.clone()))
}

impl Cli {
    async fn execute_handle(
        &self,
        event: Option<&Path>,
        overrides: Overrides,
        dry_run: bool,
    ) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        overrides.apply(&mut config);
        debug!("Effective configuration: {:?}", config.routing);

        let router = build_router(&config, dry_run)?;

        let json = read_event(event)?;
        if let Ok(pretty) = serde_json::from_str::<serde_json::Value>(&json)
            .and_then(|value| serde_json::to_string_pretty(&value))
        {
            debug!("Received event:\n{pretty}");
        }

        let outcome = router.handle_json(&json).await?;

        output::print_outcome(&outcome);
        println!("{outcome}");

        Ok(())
    }

    fn execute_init(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "{} already exists, use --force to overwrite",
                path.display()
            );
        }

        Config::default().save(path)?;
        info!("Configuration written to: {}", path.display());

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Handle {
                event,
                webhook_url,
                region,
                endpoint,
                build_stage,
                pipeline_events,
                dry_run,
            } => {
                let overrides = Overrides {
                    webhook_url: webhook_url.clone(),
                    region: region.clone(),
                    endpoint: endpoint.clone(),
                    build_stage: build_stage.clone(),
                    pipeline_events: *pipeline_events,
                };
                self.execute_handle(event.as_deref(), overrides, *dry_run)
                    .await
            }
            Commands::Init { path, force } => Self::execute_init(path, *force),
        }
    }
}
