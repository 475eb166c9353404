use std::process::ExitCode;

fn main() -> ExitCode {
    quotedesk_cli::run()
}
