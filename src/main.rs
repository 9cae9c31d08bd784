use clap::Parser;
use tracing_subscriber::EnvFilter;

use statement_risk::cli::{self, Cli, Commands};
use statement_risk::settings::load_settings;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => load_settings().log_level,
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            file,
            format,
            month,
            input_format,
        } => cli::analyze::run(&file, format, month, input_format.as_deref()),
        Commands::Flagged {
            file,
            min_severity,
            input_format,
        } => cli::flagged::run(&file, min_severity, input_format.as_deref()),
        Commands::Summary { file, input_format } => cli::summary::run(&file, input_format.as_deref()),
        Commands::Config { init } => cli::config::run(init),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
