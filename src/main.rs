// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use pose_annotator::cli::args::{Cli, Commands};
use pose_annotator::cli::commands::{run_info, run_label, run_show};
use pose_annotator::cli::logging::set_verbose;
use pose_annotator::error;

fn main() {
    let cli = Cli::parse();
    set_verbose(cli.verbose);

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Info(args) => run_info(args),
        Commands::Label(args) => run_label(args),
        Commands::Show(args) => run_show(args),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
