const CONSOLE_BASE_URL: &str = "https://console.aws.amazon.com/codepipeline/home";

/// Builds the AWS console URL for a pipeline's overview page.
///
/// # Arguments
///
/// * `region` - AWS region hosting the pipeline (e.g., "us-east-1")
/// * `pipeline_name` - Pipeline name as it appears in events
///
/// # Returns
///
/// Clickable URL (e.g., <https://console.aws.amazon.com/codepipeline/home?region=us-east-1#/view/app>)
pub fn pipeline_console_url(region: &str, pipeline_name: &str) -> String {
    format!("{CONSOLE_BASE_URL}?region={region}#/view/{pipeline_name}")
}
