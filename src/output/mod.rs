mod styling;

use styling::{bright_green, dim, magenta_bold};

use crate::router::Outcome;

/// Prints the `pipeline-notify` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔔 pipeline-notify"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CodePipeline to Slack notifier")
    );
}

/// Prints a one-line status for the handled event to stderr.
///
/// stdout only carries the acknowledgment so callers can capture it.
pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Posted(_) => eprintln!("{} {}", bright_green("✔"), bright_green(outcome)),
        Outcome::Skipped(_) => eprintln!("{} {}", dim("–"), dim(outcome)),
    }
}
