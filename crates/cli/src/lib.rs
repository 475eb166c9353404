pub mod commands;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "quotedesk",
    about = "Quotedesk operator CLI",
    long_about = "Inspect configuration, check readiness, and run enquiries through the quotation pipeline.",
    after_help = "Examples:\n  quotedesk doctor --json\n  quotedesk config\n  quotedesk extract --rules-only --file enquiry.txt\n  echo 'Name: Raju ...' | quotedesk quote --sender 919800000000"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Check config, template, PDF converter, model and transport readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Extract and normalize quotation fields from an enquiry without sending")]
    Extract {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, help = "Skip the model and use only the rule-based extractor")]
        rules_only: bool,
    },
    #[command(about = "Run an enquiry through the whole pipeline and print the sender reply")]
    Quote {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, default_value = "cli", help = "Sender id the reply is addressed to")]
        sender: String,
    },
}

#[derive(Debug, Args)]
struct InputArgs {
    #[arg(help = "Enquiry text; read from --file or stdin when omitted")]
    text: Option<String>,
    #[arg(long, conflicts_with = "text", help = "Read the enquiry text from a file")]
    file: Option<PathBuf>,
}

impl InputArgs {
    fn read(self) -> std::io::Result<String> {
        if let Some(text) = self.text {
            return Ok(text);
        }
        if let Some(path) = self.file {
            return std::fs::read_to_string(path);
        }
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Extract { input, rules_only } => match input.read() {
            Ok(text) => commands::extract::run(&text, rules_only),
            Err(error) => {
                commands::CommandResult::failure("extract", "input", error.to_string(), 1)
            }
        },
        Command::Quote { input, sender } => match input.read() {
            Ok(text) => commands::quote::run(&text, &sender),
            Err(error) => {
                commands::CommandResult::failure("quote", "input", error.to_string(), 1)
            }
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
