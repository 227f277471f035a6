use anyhow::Result;
use colored::Colorize;
use taskstack_engine::EngineHandle;

pub async fn status(handle: &EngineHandle, request_id: String) -> Result<()> {
    let request = handle.dal.requests.get(&request_id).await?;

    println!("request:     {}", request.request_id.cyan());
    println!("task:        {}", request.task_id);
    println!("status:      {}", request.status()?.as_str());
    println!("priority:    {}", request.priority);
    println!("requester:   {}", request.requester);
    println!("created_at:  {}", request.created_at);
    if let Some(claimed_by) = &request.claimed_by {
        println!("claimed_by:  {claimed_by}");
    }
    if let Some(finished_at) = request.finished_at {
        println!("finished_at: {finished_at}");
    }
    if let Some(result_ref) = &request.result_ref {
        println!("result_ref:  {result_ref}");
    }
    if let Some(error) = &request.error {
        println!("error:       {}", error.red());
    }
    Ok(())
}
