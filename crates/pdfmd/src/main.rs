use crate::prelude::*;
use clap::Parser;

mod convert;
mod error;
mod input;
mod inspect;
mod prelude;
mod tables;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Convert PDF forms and documents to Markdown, rebuilding borderless tables from word positions"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Layout calibration file (TOML)
    #[clap(long, env = "PDFMD_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "PDFMD_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Convert a PDF to Markdown
    Convert(crate::convert::Options),

    /// Show how each page was classified
    Inspect(crate::inspect::Options),

    /// Extract invoice-style tables from each page
    Tables(crate::tables::Options),
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();

    let default_filter = if app.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match app.command {
        SubCommands::Convert(options) => crate::convert::run(options, app.global),
        SubCommands::Inspect(options) => crate::inspect::run(options, app.global),
        SubCommands::Tables(options) => crate::tables::run(options, app.global),
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
