//! Process exit codes. Part of the CLI contract.

use mapbench_core::{ConfigError, EvalError};

pub const SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 1; // Bad registry, task files or selection
pub const RUNTIME_ERROR: i32 = 2; // Anything else that aborted the command

/// Exit code for an error that escaped a command.
pub fn for_error(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return CONFIG_ERROR;
    }
    match err.downcast_ref::<EvalError>() {
        Some(eval) => eval.exit_code(),
        None => RUNTIME_ERROR,
    }
}
