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

use std::process::ExitCode;

use clap::Parser;
use taskstack_engine::{EngineError, EngineHandle};
use taskstackctl::config::{ConfigLoader, Validate};
use taskstackctl::{commands, init_logging, Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loader = ConfigLoader::new();
    let mut config = match loader.load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::from(2);
        }
    };

    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }

    if let Err(err) = config.validate() {
        eprintln!("config validation error: {err}");
        return ExitCode::from(2);
    }

    init_logging(&config.log.level, cli.verbose, cli.quiet);

    let handle = match EngineHandle::builder()
        .database_url(config.database.url.clone())
        .pool_size(config.database.pool_size as usize)
        .build()
        .await
    {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("failed to start engine: {err}");
            return exit_code_for(&err);
        }
    };

    let result = match cli.command {
        Commands::Submit {
            task_id,
            parameters,
            priority,
            request_id,
            depends_on,
            requester,
        } => commands::submit(&handle, task_id, parameters, priority, request_id, depends_on, requester).await,
        Commands::Status { request_id } => commands::status(&handle, request_id).await,
        Commands::Result { request_id, include_trace } => commands::result(&handle, request_id, include_trace).await,
        Commands::ListTasks { all } => commands::list_tasks(&handle, all).await,
        Commands::Cancel { request_id } => commands::cancel(&handle, request_id).await,
        Commands::ListPending { limit, status } => commands::list_pending(&handle, limit, status).await,
        Commands::Admin { action } => commands::handle_admin_action(&handle, action).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            match err.downcast_ref::<EngineError>() {
                Some(engine_err) => exit_code_for(engine_err),
                None => ExitCode::from(3),
            }
        }
    }
}

/// Validation-shaped engine errors (bad input, missing catalog entry, cycle,
/// non-cancellable state) map to 2; everything else (connection, pool,
/// subprocess, timeout) is a backend/transient failure and maps to 3.
fn exit_code_for(err: &EngineError) -> ExitCode {
    match err {
        EngineError::Validation(_)
        | EngineError::CatalogMissing(_)
        | EngineError::TaskDisabled(_)
        | EngineError::DependencyCycle(_)
        | EngineError::RequestNotFound(_)
        | EngineError::StackNotFound(_)
        | EngineError::NotCancellable(_)
        | EngineError::KillSwitch(_) => ExitCode::from(2),
        _ => ExitCode::from(3),
    }
}
