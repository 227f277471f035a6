use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "taskstackctl",
    version,
    about = "Submission CLI for the task stack execution core",
    long_about = "Submit requests, inspect their state, and administer the task catalog and cascade rules"
)]
pub struct Cli {
    /// Path to a TOML config file; falls back to discovery, then TASKSTACK_CONFIG, then defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured database URL.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a new request against the graph-backed request queue (C9: submit).
    Submit {
        /// Task id from the catalog.
        task_id: String,

        /// JSON parameters object.
        #[arg(long, default_value = "{}")]
        parameters: String,

        /// Priority, 1 (lowest) to 1000 (highest).
        #[arg(long, default_value_t = 100)]
        priority: i32,

        /// Idempotency key; a repeated value returns the existing request.
        #[arg(long)]
        request_id: Option<String>,

        /// Request ids this submission depends on.
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,

        /// Identity recorded as the request's requester.
        #[arg(long, default_value = "cli")]
        requester: String,
    },
    /// Show a request's current status (C9: status).
    Status { request_id: String },
    /// Fetch a request's completed result, including its stack's trace (C9: result).
    Result {
        request_id: String,

        /// Include the full per-node execution trace.
        #[arg(long)]
        include_trace: bool,
    },
    /// List task definitions in the catalog (C9: list_tasks).
    ListTasks {
        /// Include disabled task definitions.
        #[arg(long)]
        all: bool,
    },
    /// Cancel a pending or blocked request (C9: cancel).
    Cancel { request_id: String },
    /// List pending requests (C9: list_pending).
    ListPending {
        #[arg(long, default_value_t = 20)]
        limit: i64,

        #[arg(long, default_value = "pending")]
        status: String,
    },
    /// Operator/admin operations: catalog and cascade-rule management.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
pub enum AdminAction {
    /// Register a task definition in the catalog.
    SeedTask {
        task_id: String,

        /// How the subprocess runner invokes this task's code.
        #[arg(long, default_value = "shell-command")]
        kind: String,

        /// The task's code: a shell command, inline script body, or script path,
        /// depending on `kind`.
        code: String,

        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,
    },
    /// Enable or disable a task definition.
    SetTaskEnabled { task_id: String, enabled: bool },
    /// Create a cascade rule that materializes a request on matching source commits.
    CreateCascadeRule {
        rule_id: String,

        /// Source kind to match; omit to match every committed source.
        #[arg(long)]
        source_kind: Option<String>,

        task_id: String,

        /// Parameter template; `$source.<field>` is substituted before JSON parse.
        parameter_template: String,

        #[arg(long, default_value_t = 100)]
        priority: i32,
    },
    /// Enable or disable a cascade rule.
    SetCascadeRuleEnabled { rule_id: String, enabled: bool },
    /// List cascade rules.
    ListCascadeRules,
    /// Engage or release the global kill switch.
    KillSwitch { engaged: bool },
    /// Write a commented default configuration file to the given path.
    InitConfig {
        #[arg(default_value = "taskstack.toml")]
        path: std::path::PathBuf,
    },
}
