use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use taskstack_engine::models::{TaskDefinition, TaskKind};
use taskstack_engine::EngineHandle;

use crate::cli::AdminAction;
use crate::config::defaults::generate_default_config_toml;

pub async fn handle_admin_action(handle: &EngineHandle, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::SeedTask {
            task_id,
            kind,
            code,
            timeout_secs,
        } => seed_task(handle, task_id, kind, code, timeout_secs).await,
        AdminAction::SetTaskEnabled { task_id, enabled } => {
            handle.dal.tasks.set_enabled(&task_id, enabled).await?;
            println!("task {task_id} enabled={enabled}");
            Ok(())
        }
        AdminAction::CreateCascadeRule {
            rule_id,
            source_kind,
            task_id,
            parameter_template,
            priority,
        } => {
            handle
                .dal
                .cascade
                .create_rule(rule_id.clone(), source_kind, task_id, parameter_template, priority)
                .await?;
            println!("{} cascade rule {}", "created".green().bold(), rule_id);
            Ok(())
        }
        AdminAction::SetCascadeRuleEnabled { rule_id, enabled } => {
            handle.dal.cascade.set_enabled(rule_id.clone(), enabled).await?;
            println!("cascade rule {rule_id} enabled={enabled}");
            Ok(())
        }
        AdminAction::ListCascadeRules => {
            let rules = handle.dal.cascade.list_rules().await?;
            if rules.is_empty() {
                println!("no cascade rules registered");
            }
            for rule in rules {
                println!(
                    "{}  source_kind={:?}  task={}  priority={}  enabled={}",
                    rule.rule_id, rule.source_kind, rule.task_id, rule.priority, rule.enabled
                );
            }
            Ok(())
        }
        AdminAction::KillSwitch { engaged } => {
            handle.dal.control.set_kill_switch(engaged).await?;
            println!("kill switch engaged={engaged}");
            Ok(())
        }
        AdminAction::InitConfig { path } => {
            let toml = generate_default_config_toml()?;
            std::fs::write(&path, toml)?;
            println!("{} {}", "wrote".green().bold(), path.display());
            Ok(())
        }
    }
}

async fn seed_task(
    handle: &EngineHandle,
    task_id: String,
    kind: String,
    code: String,
    timeout_secs: u64,
) -> Result<()> {
    let kind = TaskKind::from_str(&kind)?;
    let task = TaskDefinition::new(task_id.clone(), kind, code, Duration::from_secs(timeout_secs));
    handle.dal.tasks.create(task).await?;
    println!("{} task {}", "registered".green().bold(), task_id);
    Ok(())
}
