use anyhow::Result;
use nextask::cli::{Args, ConfigDiscovery, execute};
use std::io::{self, Write};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();

    let exit_code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            2
        }
    };
    std::process::exit(exit_code);
}

fn run(args: Args) -> Result<i32> {
    let config = ConfigDiscovery::load(args.config.as_deref())?;

    // RUST_LOG wins over the configured filter
    let filter = if args.verbose {
        EnvFilter::new("nextask=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let Some(command) = args.command.as_ref() else {
        anyhow::bail!("No command specified. Use 'nextask --help' to see available commands.");
    };
    debug!("Running {:?}", command);

    let outcome = execute(command, &config, args.json)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(outcome.output.as_bytes())?;
    stdout.flush()?;

    Ok(outcome.exit_code)
}
