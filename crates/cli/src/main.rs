use std::process::ExitCode;

fn main() -> ExitCode {
    propquote_cli::run()
}
