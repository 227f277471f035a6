use anyhow::{bail, Result};
use taskstack_engine::dal::request_queue::RequestFilter;
use taskstack_engine::models::RequestStatus;
use taskstack_engine::EngineHandle;

pub async fn list_pending(handle: &EngineHandle, limit: i64, status: String) -> Result<()> {
    let status = match status.as_str() {
        "pending" => RequestStatus::Pending,
        "blocked" => RequestStatus::Blocked,
        "claimed" => RequestStatus::Claimed,
        "executing" => RequestStatus::Executing,
        "done" => RequestStatus::Done,
        "failed" => RequestStatus::Failed,
        "cancelled" => RequestStatus::Cancelled,
        other => bail!("unknown status '{other}'"),
    };

    let requests = handle
        .dal
        .requests
        .list(RequestFilter {
            status: Some(status),
            limit,
        })
        .await?;

    if requests.is_empty() {
        println!("no requests in status '{}'", status.as_str());
        return Ok(());
    }

    for request in requests {
        println!(
            "{}  {:<10}  priority={}  task={}",
            request.request_id, request.status()?.as_str(), request.priority, request.task_id
        );
    }
    Ok(())
}
