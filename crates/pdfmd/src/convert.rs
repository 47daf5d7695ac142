use colored::Colorize;
use pdf::Converter;

use crate::input::{load_config, read_pdf};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Path to the PDF file
    pub path: std::path::PathBuf,

    /// Write the Markdown to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,

    /// Convert even when the file name does not end in .pdf
    #[arg(long)]
    pub force: bool,
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let config = load_config(&global)?;
    let bytes = read_pdf(&options.path, options.force)?;

    let conversion = Converter::new(config)
        .convert(&bytes)
        .map_err(|e| eyre!(e))?;

    if global.verbose {
        let strategy = conversion
            .strategy
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        eprintln!(
            "{} {} ({} form, {} plain pages)",
            "strategy:".bright_white().bold(),
            strategy.cyan(),
            conversion.tally.form_pages,
            conversion.tally.plain_pages
        );
    }
    if conversion.markdown.is_empty() {
        eprintln!(
            "{}",
            f!("no text found in {}", options.path.display()).yellow()
        );
    }

    match options.output {
        Some(out) => std::fs::write(&out, &conversion.markdown)
            .wrap_err_with(|| f!("cannot write {}", out.display()))?,
        None => println!("{}", conversion.markdown),
    }

    Ok(())
}
