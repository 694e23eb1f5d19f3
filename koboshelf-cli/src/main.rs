//! koboshelf CLI - kepub conversion and series metadata sync for Kobo readers

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "koboshelf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert EPUBs (files or directories) to kepubs
    Convert(ConvertArgs),

    /// Copy calibre series metadata into a Kobo's database
    Seriesmeta {
        /// Kobo root (auto-detected when omitted)
        kobo_path: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display the series metadata of an EPUB
    Info {
        /// Input file path
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct ConvertArgs {
    /// EPUB files or directories to convert
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Skip books whose kepub already exists
    #[arg(short, long)]
    pub update: bool,

    /// Extra CSS to add to every content document
    #[arg(long, value_name = "CSS")]
    pub css: Option<String>,

    /// Force hyphenation
    #[arg(long)]
    pub hyphenate: bool,

    /// Disable hyphenation
    #[arg(long)]
    pub no_hyphenate: bool,

    /// Inline linked stylesheets
    #[arg(long)]
    pub inline_styles: bool,

    /// Apply fixes for fullscreen reading
    #[arg(long)]
    pub fullscreen_fixes: bool,

    /// Replace text in content documents (repeatable)
    #[arg(short, long = "replace", value_name = "FIND|REPLACE")]
    pub replace: Vec<String>,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "koboshelf_cli=debug,koboshelf_core=debug"
    } else {
        "koboshelf_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Convert(args) => commands::convert(&args),

        Commands::Seriesmeta { kobo_path, json } => {
            commands::seriesmeta(kobo_path.as_deref(), json)
        }

        Commands::Info { input, json } => commands::info(&input, json),
    }
}
