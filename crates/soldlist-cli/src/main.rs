use anyhow::Result;
use chrono::FixedOffset;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use soldlist_cli::commands::harvest::HarvestArgs;
use soldlist_cli::{OutputFormat, commands, parse_utc_offset};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "soldlist")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Harvest sold marketplace listings into a spreadsheet report",
    long_about = "Soldlist drives Chrome through a marketplace search page, visits every listing it \
                  links to, and records title, price, seller and listing/sale times for each one."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (default: xlsx for harvest, pretty otherwise)
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest every listing on a search page
    Harvest(HarvestArgs),

    /// Extract one listing from a saved page
    Parse {
        /// Saved listing page
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// URL the page was saved from
        #[arg(long)]
        url: String,

        /// Offset of the page's timestamps, e.g. +09:00 (default: local time)
        #[arg(long, value_name = "OFFSET", value_parser = parse_utc_offset, allow_hyphen_values = true)]
        utc_offset: Option<FixedOffset>,
    },

    /// List the listing links on a saved search page
    Links {
        /// Saved search page
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Base URL that relative links are resolved against
        #[arg(long)]
        base_url: String,

        /// Show at most this many links
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Generate shell completion scripts
    #[command(after_help = "SUPPORTED SHELLS:
    bash, zsh, fish, powershell, elvish

INSTALLATION:
    bash:  soldlist completion --shell bash >> ~/.bashrc
    zsh:   soldlist completion --shell zsh > ~/.zfunc/_soldlist
           (add `fpath+=~/.zfunc` to ~/.zshrc before compinit)
    fish:  soldlist completion --shell fish > ~/.config/fish/completions/soldlist.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Harvest(args) => {
            commands::harvest::execute(&args, cli.format.unwrap_or(OutputFormat::Xlsx))
        }
        Commands::Parse {
            file,
            url,
            utc_offset,
        } => commands::parse::execute(
            &file,
            &url,
            utc_offset,
            cli.format.unwrap_or(OutputFormat::Pretty),
        ),
        Commands::Links {
            file,
            base_url,
            limit,
        } => commands::links::execute(
            &file,
            &base_url,
            limit,
            cli.format.unwrap_or(OutputFormat::Pretty),
        ),
        Commands::Completion { shell } => {
            commands::completion::execute(shell, &mut Cli::command(), &mut std::io::stdout())
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("soldlist=debug,soldlist_cli=debug,soldlist_core=debug,soldlist_browser=debug")
    } else {
        EnvFilter::new("soldlist=info,soldlist_cli=info,soldlist_core=info,soldlist_browser=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
