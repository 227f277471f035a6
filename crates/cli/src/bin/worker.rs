/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! The C7 processor daemon: claims `TaskRequest`s off the graph-backed queue,
//! drives each through an `ExecutionStack` (C1/C2/C5), and settles it back
//! into C6. Also fires C8's two policies on every settlement.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use taskstack_engine::models::{SourceArtifact, StackStatus};
use taskstack_engine::{EngineError, EngineHandle};
use taskstackctl::config::{ConfigLoader, Validate};
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "taskstack-worker", version, about = "Processor daemon for the task stack execution core")]
struct WorkerArgs {
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = WorkerArgs::parse();

    let loader = ConfigLoader::new();
    let mut config = match loader.load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(url) = &args.database_url {
        config.database.url = url.clone();
    }
    if let Err(err) = config.validate() {
        eprintln!("config validation error: {err}");
        return ExitCode::from(2);
    }

    taskstackctl::init_logging(&config.log.level, false, false);

    let handle = match EngineHandle::builder()
        .database_url(config.database.url.clone())
        .pool_size(config.database.pool_size as usize)
        .build()
        .await
    {
        Ok(handle) => handle,
        Err(err) => {
            error!(error = %err, "failed to start engine");
            return ExitCode::from(3);
        }
    };

    let worker_id = format!("{}-{}", hostname(), std::process::id());
    info!(worker_id, "worker starting");

    // Shutdown is only raced against the idle sleep, never against an
    // in-flight tick: a claimed request runs to completion (up to its
    // stack's own timeout budget in C4) before the daemon stops for it.
    let shutting_down = Arc::new(AtomicBool::new(false));
    {
        let shutting_down = shutting_down.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutting_down.store(true, Ordering::SeqCst);
        });
    }

    let mut backoff = Duration::from_millis(config.worker.poll_interval_ms);
    let max_backoff = Duration::from_millis(config.worker.max_backoff_ms);

    while !shutting_down.load(Ordering::SeqCst) {
        match claim_and_run(&handle, &worker_id, &config).await {
            Ok(true) => {
                backoff = Duration::from_millis(config.worker.poll_interval_ms);
            }
            Ok(false) => {
                tokio::select! {
                    _ = sleep(backoff) => {}
                    _ = wait_for(&shutting_down) => {}
                }
                backoff = (backoff * 2).min(max_backoff);
            }
            Err(err) => {
                warn!(worker_id, error = %err, "tick failed");
                sleep(backoff).await;
                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    info!(worker_id, "shutdown signal received, worker stopped accepting claims");
    ExitCode::SUCCESS
}

/// Poll until the flag is set; used only to let an idle sleep wake up early
/// on shutdown rather than to interrupt in-flight work.
async fn wait_for(flag: &AtomicBool) {
    while !flag.load(Ordering::SeqCst) {
        sleep(Duration::from_millis(50)).await;
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

/// One tick: claim a request, drive it, settle it, then fire the two C8
/// policies. Returns `Ok(true)` if a request was claimed (whether it
/// succeeded or failed), `Ok(false)` if the queue was empty.
async fn claim_and_run(
    handle: &EngineHandle,
    worker_id: &str,
    config: &taskstackctl::config::TaskstackConfig,
) -> Result<bool, EngineError> {
    if handle.dal.control.kill_switch_engaged().await? {
        return Ok(false);
    }

    let Some(request) = handle.dal.requests.claim_next(worker_id.to_string()).await? else {
        return Ok(false);
    };

    info!(worker_id, request_id = %request.request_id, "claimed request");
    handle.dal.requests.mark_executing(request.request_id.clone()).await?;

    let parameters: serde_json::Value = serde_json::from_str(&request.parameters)?;
    let stack_id = handle
        .stack_engine
        .create(request.request_id.clone(), request.task_id.clone(), parameters)
        .await?;

    let outcome = handle.stack_engine.run_to_completion(&stack_id).await?;

    settle_with_retry(handle, &request.request_id, &stack_id, &outcome, config).await;

    match outcome.status {
        StackStatus::Done => {
            handle.dal.requests.unblock_dependents(request.request_id.clone()).await?;

            let mut fields = serde_json::Map::new();
            fields.insert("request_id".to_string(), serde_json::json!(request.request_id));
            fields.insert("task_id".to_string(), serde_json::json!(request.task_id));
            if let Some(output) = &outcome.final_output {
                fields.insert("output".to_string(), output.clone());
            }
            let source = SourceArtifact {
                kind: request.task_id.clone(),
                fields,
            };
            handle.dal.cascade.evaluate_source(source).await?;
        }
        StackStatus::Failed | StackStatus::Cancelled => {
            // Errors during cascade/unblock are logged but never roll back
            // the completed upstream request; a failed/cancelled stack
            // simply produces no downstream events.
        }
        StackStatus::Running => unreachable!("run_to_completion always returns a terminal status"),
    }

    Ok(true)
}

/// Settlement retries with exponential backoff until it succeeds; a failed
/// settlement never loses the already-computed stack outcome, since the
/// stack itself is already durably finalized in C2.
async fn settle_with_retry(
    handle: &EngineHandle,
    request_id: &str,
    stack_id: &str,
    outcome: &taskstack_engine::StackOutcome,
    config: &taskstackctl::config::TaskstackConfig,
) {
    let mut delay = Duration::from_millis(config.worker.poll_interval_ms);
    loop {
        let result = match outcome.status {
            StackStatus::Done => handle.dal.requests.mark_done(request_id.to_string(), stack_id.to_string()).await,
            _ => {
                let error = outcome
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("stack ended in status {:?}", outcome.status));
                handle.dal.requests.mark_failed(request_id.to_string(), error).await
            }
        };

        match result {
            Ok(()) => return,
            Err(err) => {
                error!(request_id, error = %err, "settlement failed, retrying");
                sleep(delay).await;
                delay = (delay * 2).min(Duration::from_millis(config.worker.max_backoff_ms));
            }
        }
    }
}
