use anyhow::{Context, Result};
use colored::Colorize;
use taskstack_engine::models::RequestSubmission;
use taskstack_engine::EngineHandle;

#[allow(clippy::too_many_arguments)]
pub async fn submit(
    handle: &EngineHandle,
    task_id: String,
    parameters: String,
    priority: i32,
    request_id: Option<String>,
    depends_on: Vec<String>,
    requester: String,
) -> Result<()> {
    let parameters: serde_json::Value =
        serde_json::from_str(&parameters).context("--parameters must be valid JSON")?;

    let mut submission = RequestSubmission::new(task_id, parameters);
    submission.priority = priority;
    submission.requester = requester;
    submission.depends_on = depends_on;
    if let Some(id) = request_id {
        submission.request_id = id;
    }

    let outcome = handle.dal.requests.submit(submission).await?;

    if outcome.is_new {
        println!("{} request {}", "submitted".green().bold(), outcome.request.request_id);
    } else {
        println!(
            "{} request {} already existed",
            "found".yellow().bold(),
            outcome.request.request_id
        );
    }
    println!("  status: {}", outcome.request.status()?.as_str());
    Ok(())
}
