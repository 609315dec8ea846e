use clap::Parser;
use tracing_subscriber::FmtSubscriber;

mod args;
mod commands;

use args::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = &cli.options;
    match &cli.command {
        Command::Get { url } => commands::get(options, url),
        Command::Head { url } => commands::head(options, url),
        Command::Post { url, data, file, json } => {
            commands::post(options, url, data.as_deref(), file.as_deref(), *json)
        }
        Command::Demo { url } => commands::demo(options, url),
    }
}
