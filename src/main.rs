//! Binary entrypoint for the assistant console.

use std::process::ExitCode;

use meatflow_assistant::start_assistant;

/// Start the console against the platform configured by `MEATFLOW_*` variables.
fn main() -> ExitCode {
    start_assistant::run()
}
