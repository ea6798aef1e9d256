pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "mandi",
    about = "Mandi operator CLI",
    long_about = "Register shops, apply migrations, and inspect stock and sales recorded from WhatsApp.",
    after_help = "Examples:\n  mandi register +923001234567 --business-name \"Ali Traders\"\n  mandi stock +923001234567\n  mandi doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Register a shop by its WhatsApp number (idempotent)")]
    Register {
        #[arg(help = "Phone number, with or without the `whatsapp:` prefix")]
        phone: String,
        #[arg(long, help = "Display name for the shop")]
        business_name: Option<String>,
    },
    #[command(about = "Print the current stock of every item for a shop")]
    Stock { phone: String },
    #[command(about = "Print the most recent transactions for a shop, newest first")]
    Transactions {
        phone: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    #[command(about = "Validate config, Twilio credentials, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Register { phone, business_name } => {
            commands::register::run(&phone, business_name.as_deref())
        }
        Command::Stock { phone } => commands::ledger::stock(&phone),
        Command::Transactions { phone, limit } => commands::ledger::transactions(&phone, limit),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
