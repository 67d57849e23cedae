use air_network::app::{self, Settings};
use std::process::ExitCode;

fn main() -> ExitCode {
    app::setup_logging();

    let settings = Settings::from_cli();
    match app::run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
