//! Submission CLI and processor daemon wiring for the task stack execution
//! core. `taskstackctl` exposes C9's operations; `taskstack-worker` (in
//! `src/bin/worker.rs`) runs C7's poll loop. Both load configuration the same
//! way, through [`config::ConfigLoader`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod utils;

pub use cli::{AdminAction, Cli, Commands};
pub use utils::init_logging;
