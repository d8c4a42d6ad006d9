//! CLI binary entry point for api-interchange-cli

#[cfg(feature = "cli")]
use api_interchange_sdk::cli::commands::convert::{ConvertArgs, handle_convert};
#[cfg(feature = "cli")]
use api_interchange_sdk::cli::commands::detect::handle_detect;
#[cfg(feature = "cli")]
use api_interchange_sdk::cli::commands::export::{ExportArgs, handle_export};
#[cfg(feature = "cli")]
use api_interchange_sdk::cli::commands::import::{ImportArgs, InputSource, handle_import};
#[cfg(feature = "cli")]
use api_interchange_sdk::cli::error::CliError;
#[cfg(feature = "cli")]
use api_interchange_sdk::config::InterchangeConfig;
#[cfg(feature = "cli")]
use api_interchange_sdk::formats::FormatId;
#[cfg(feature = "cli")]
use clap::{ArgAction, Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "api-interchange-cli")]
#[command(about = "Convert API descriptions and request collections between formats")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding .api-interchange.toml (default: current directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// List the formats that recognise the input
    Detect {
        /// Input file path or '-' for stdin
        #[arg(default_value = "-")]
        input: String,
    },
    /// Import a document and print the import result as JSON
    Import {
        /// Input file path or '-' for stdin
        #[arg(default_value = "-")]
        input: String,
        /// Skip detection and import as this format
        #[arg(short, long, value_parser = parse_format)]
        format: Option<FormatId>,
        /// Pretty-print the JSON result
        #[arg(short, long)]
        pretty: bool,
        /// Replaces {{baseUrl}} in documents that declare no server
        #[arg(long)]
        base_url: Option<String>,
        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Export a JSON bundle (collections, requests, environments) to a format
    Export {
        /// Bundle file path or '-' for stdin
        input: String,
        /// Target format (default from configuration)
        #[arg(short, long, value_parser = parse_format)]
        format: Option<FormatId>,
        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
        /// Compact output
        #[arg(long)]
        compact: bool,
    },
    /// Import a document and export it in another format
    Convert {
        /// Input file path or '-' for stdin
        input: String,
        /// Target format (default from configuration)
        #[arg(short, long, value_parser = parse_format)]
        to: Option<FormatId>,
        /// Source format (default: detected)
        #[arg(long, value_parser = parse_format)]
        from: Option<FormatId>,
        /// Replaces {{baseUrl}} in documents that declare no server
        #[arg(long)]
        base_url: Option<String>,
        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
        /// Compact output
        #[arg(long)]
        compact: bool,
    },
}

#[cfg(feature = "cli")]
fn parse_format(value: &str) -> Result<FormatId, String> {
    value.parse()
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<(), CliError> {
    let config_dir = cli.config_dir.unwrap_or_else(|| PathBuf::from("."));
    let config = InterchangeConfig::load(&config_dir)?;

    match cli.command {
        Commands::Detect { input } => handle_detect(&InputSource::from_arg(&input)).map(|_| ()),
        Commands::Import {
            input,
            format,
            pretty,
            base_url,
            output,
            force,
        } => {
            let mut options = config.import_options();
            if base_url.is_some() {
                options.base_url = base_url;
            }
            let args = ImportArgs {
                input: InputSource::from_arg(&input),
                format,
                options,
                pretty,
                output,
                force,
            };
            handle_import(&args).map(|_| ())
        }
        Commands::Export {
            input,
            format,
            output,
            force,
            compact,
        } => {
            let mut options = config.export_options();
            if compact {
                options.prettify = false;
            }
            let args = ExportArgs {
                input: InputSource::from_arg(&input),
                format: format.unwrap_or(config.default_export_format),
                options,
                output,
                force,
            };
            handle_export(&args).map(|_| ())
        }
        Commands::Convert {
            input,
            to,
            from,
            base_url,
            output,
            force,
            compact,
        } => {
            let mut import_options = config.import_options();
            if base_url.is_some() {
                import_options.base_url = base_url;
            }
            let mut export_options = config.export_options();
            if compact {
                export_options.prettify = false;
            }
            let args = ConvertArgs {
                input: InputSource::from_arg(&input),
                from,
                to: to.unwrap_or(config.default_export_format),
                import_options,
                export_options,
                output,
                force,
            };
            handle_convert(&args).map(|_| ())
        }
    }
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
