use std::process::ExitCode;

fn main() -> ExitCode {
    mandi_cli::run()
}
