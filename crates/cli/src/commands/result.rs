use anyhow::Result;
use taskstack_engine::models::RequestStatus;
use taskstack_engine::EngineHandle;

/// C9 `result`: composes the request's `result_ref` with the corresponding
/// `ExecutionStack` snapshot to return `{output, context, trace?}`.
pub async fn result(handle: &EngineHandle, request_id: String, include_trace: bool) -> Result<()> {
    let request = handle.dal.requests.get(&request_id).await?;

    if request.status()? != RequestStatus::Done && request.status()? != RequestStatus::Failed {
        println!(
            "request {} has not reached a terminal status yet (status: {})",
            request_id,
            request.status()?.as_str()
        );
        return Ok(());
    }

    let Some(stack_id) = request.result_ref.clone() else {
        println!("request {request_id} has no associated stack");
        return Ok(());
    };

    let stack = handle.dal.stacks.get_stack(&stack_id).await?;
    let context = stack.context()?;
    let final_output = stack
        .final_output
        .as_ref()
        .map(|s| serde_json::from_str::<serde_json::Value>(s))
        .transpose()?;

    let mut payload = serde_json::json!({
        "output": final_output,
        "context": context,
    });

    if include_trace {
        let trace = handle.stack_engine.trace(&stack_id).await?;
        payload["trace"] = serde_json::to_value(trace)?;
    }

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
