use anstream::print;
use colored::Colorize;
use pdf::render::markdown::render_table;
use pdf::{Converter, PageTables};

use crate::input::{load_config, read_pdf};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Path to the PDF file
    pub path: std::path::PathBuf,

    /// Output cell matrices as JSON
    #[arg(long)]
    pub json: bool,

    /// Read even when the file name does not end in .pdf
    #[arg(long)]
    pub force: bool,
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let config = load_config(&global)?;
    let min_width = config.min_cell_width;
    let bytes = read_pdf(&options.path, options.force)?;

    let pages = Converter::new(config)
        .word_tables(&bytes)
        .map_err(|e| eyre!(e))?;

    if options.json {
        let json = serde_json::to_string_pretty(&pages)
            .map_err(|e| eyre!("JSON serialization failed: {}", e))?;
        println!("{}", json);
    } else {
        print!("{}", format_markdown(&pages, min_width));
    }
    Ok(())
}

fn format_markdown(pages: &[PageTables], min_width: usize) -> String {
    let mut out = String::new();
    for page in pages.iter().filter(|p| !p.tables.is_empty()) {
        out.push_str(&f!("{}\n\n", f!("## Page {}", page.page).bold()));
        for table in &page.tables {
            out.push_str(&render_table(table, min_width));
            out.push_str("\n\n");
        }
    }
    if out.is_empty() {
        out.push_str(&f!("{}\n", "No tables found.".yellow()));
    }
    out
}
