use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    blastmc::logging::init();
    let args: Vec<String> = env::args().collect();
    match u8::try_from(blastmc::cli::run_with_args(&args)) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}
