mod cache;
mod cli;
mod commands;
mod config;
mod generate;
mod manifest;
mod media;
mod render;
mod ui;

use clap::Parser;

use ui::prelude::{Level, OutputFormat, emit};

/// Shortform main parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit structured JSON events instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: cli::Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, !cli.json);

    if let Err(err) = commands::handle_command(cli.command).await {
        emit(Level::Error, "shortform.error", &format!("{err:#}"), None);
        std::process::exit(1);
    }
}
