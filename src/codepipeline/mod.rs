mod client;
mod links;
mod metadata;
mod sigv4;
mod types;

pub use client::CodePipelineClient;
pub use links::pipeline_console_url;
pub use metadata::{MetadataFetcher, RevisionInfo, StagePosition};
