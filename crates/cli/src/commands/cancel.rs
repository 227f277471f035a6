use anyhow::Result;
use colored::Colorize;
use taskstack_engine::EngineHandle;

pub async fn cancel(handle: &EngineHandle, request_id: String) -> Result<()> {
    handle.dal.requests.cancel(request_id.clone()).await?;
    println!("{} request {}", "cancelled".yellow().bold(), request_id);
    Ok(())
}
