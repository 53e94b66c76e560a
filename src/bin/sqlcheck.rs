use std::process::ExitCode;

use sql_script_validator::cli;

#[tokio::main]
async fn main() -> ExitCode {
    match cli::run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("sqlcheck: {:#}", e);
            ExitCode::from(2)
        }
    }
}
