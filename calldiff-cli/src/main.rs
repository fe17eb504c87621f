use std::path::PathBuf;

use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "calldiff",
    version,
    about = "Report function calls added, removed or renamed between two versions of a source file"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (default: ./calldiff.toml when present)
    #[arg(long, global = true, env = "CALLDIFF_CONFIG")]
    config: Option<PathBuf>,
}

/// Classify an error into an exit code.
///
/// Exit codes:
///   0: success
///   1: general/unknown error
///   2: configuration error
///   3: input file not found
///   4: log sink could not be opened or written
///   5: source could not be parsed
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}");
    let lower = msg.to_lowercase();

    if lower.contains("input not found") {
        3 // input not found
    } else if lower.contains("sink") {
        4 // log sink error
    } else if lower.contains("config") {
        2 // config error
    } else if lower.contains("parse error") {
        5 // parse error
    } else {
        1 // general error
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let globals = commands::Globals {
        quiet: cli.quiet,
        config: cli.config,
    };

    match commands::run(cli.command, &globals) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_input_not_found() {
        let err = anyhow::anyhow!("Input not found: /nonexistent/before.c");
        assert_eq!(classify_exit_code(&err), 3);
    }

    #[test]
    fn exit_code_config() {
        let err = anyhow::anyhow!("Configuration error: Cannot parse config: bad toml");
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_log_sink() {
        let err = anyhow::anyhow!("Cannot open log sink /root/x.log: permission denied");
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_parse() {
        let err = anyhow::anyhow!("Parse error: Parse error in <source>: c parser returned no tree");
        assert_eq!(classify_exit_code(&err), 5);
    }

    #[test]
    fn exit_code_general() {
        let err = anyhow::anyhow!("Something unexpected happened");
        assert_eq!(classify_exit_code(&err), 1);
    }
}
