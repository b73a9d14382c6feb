mod commands;
mod terminal;

use std::process::ExitCode;

use tracing::error;

use commands::{CommandLine, scan};
use nscope_common::error::RunError;
use terminal::{logging, print};

/// Exit code for failures that carry no [`RunError`].
const FALLBACK_EXIT_CODE: u8 = 4;

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();

    logging::init(commands.log_level());
    print::banner(commands.quiet);

    match scan::scan(&commands).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            let code = e
                .downcast_ref::<RunError>()
                .map_or(FALLBACK_EXIT_CODE, RunError::exit_code);
            ExitCode::from(code)
        }
    }
}
