//! Schema bootstrap entry point.
//!
//! # Responsibility
//! - Load configuration from the environment (and `.env`).
//! - Create every table that does not exist yet.
//! - Report success or failure through the process exit code.

use log::error;
use std::error::Error;
use std::process::ExitCode;
use taskhabit_core::{core_version, init_from_config, AppConfig, Engine};

fn main() -> ExitCode {
    match run() {
        Ok(tables) => {
            println!("taskhabit {} schema ready", core_version());
            for table in tables {
                println!("  {table}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=bootstrap module=cli status=error error={err}");
            eprintln!("taskhabit bootstrap failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<Vec<String>, Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    init_from_config(&config)?;

    let engine = Engine::connect(&config.database)?;
    let tables = engine.create_all()?;
    Ok(tables)
}
