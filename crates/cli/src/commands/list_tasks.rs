use anyhow::Result;
use colored::Colorize;
use taskstack_engine::EngineHandle;

pub async fn list_tasks(handle: &EngineHandle, all: bool) -> Result<()> {
    let tasks = handle.dal.tasks.list(!all).await?;

    if tasks.is_empty() {
        println!("no tasks registered");
        return Ok(());
    }

    for task in tasks {
        let marker = if task.enabled { "✓".green() } else { "✗".red() };
        println!("{marker} {} ({})", task.task_id, task.kind.as_str());
    }
    Ok(())
}
