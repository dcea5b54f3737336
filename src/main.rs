//! binop - runs every binary operation plugin found in a directory

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = binop_host::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
