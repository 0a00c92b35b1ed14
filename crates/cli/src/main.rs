use std::process::ExitCode;

fn main() -> ExitCode {
    baja_cli::run()
}
