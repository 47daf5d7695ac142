use colored::Colorize;
use pdf::{Converter, PageKind, PageReport, PageTally, Strategy};

use crate::input::{load_config, read_pdf};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Path to the PDF file
    pub path: std::path::PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Inspect even when the file name does not end in .pdf
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, serde::Serialize)]
struct Report<'a> {
    strategy: Option<Strategy>,
    tally: PageTally,
    pages: &'a [PageReport],
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let config = load_config(&global)?;
    let bytes = read_pdf(&options.path, options.force)?;

    let conversion = Converter::new(config)
        .convert(&bytes)
        .map_err(|e| eyre!(e))?;

    let report = Report {
        strategy: conversion.strategy,
        tally: conversion.tally,
        pages: &conversion.pages,
    };

    if options.json {
        println!("{}", format_json(&report)?);
    } else {
        output_table(&report);
    }
    Ok(())
}

fn format_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(|e| eyre!("JSON serialization failed: {}", e))
}

fn output_table(report: &Report) {
    if report.pages.is_empty() {
        println!("{}", "No pages could be analysed.".yellow());
    } else {
        let mut table = new_table();
        table.add_row(prettytable::row![
            "Page", "Kind", "Rows", "Table rows", "Columns", "Tables", "Reason"
        ]);
        for page in report.pages {
            let kind = match page.kind {
                PageKind::Form => page.kind.to_string().green(),
                PageKind::Plain => page.kind.to_string().yellow(),
            };
            table.add_row(prettytable::row![
                page.page,
                kind,
                page.rows,
                page.table_rows,
                page.columns,
                page.tables,
                page.reason.as_deref().unwrap_or("")
            ]);
        }
        table.printstd();
    }

    let strategy = report
        .strategy
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none (empty output)".to_string());
    println!(
        "\n{} {} ({} form, {} plain pages)",
        "Strategy:".bright_white().bold(),
        strategy.cyan(),
        report.tally.form_pages,
        report.tally.plain_pages
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_json_shape() {
        let pages = vec![PageReport {
            page: 1,
            kind: PageKind::Plain,
            rows: 4,
            table_rows: 0,
            columns: 0,
            tables: 0,
            reason: Some("no row has enough separated columns".into()),
        }];
        let report = Report {
            strategy: Some(Strategy::Linear),
            tally: PageTally {
                form_pages: 0,
                plain_pages: 1,
            },
            pages: &pages,
        };
        let value: serde_json::Value = serde_json::from_str(&format_json(&report).unwrap()).unwrap();
        assert_eq!(value["strategy"], "linear");
        assert_eq!(value["tally"]["plain_pages"], 1);
        assert_eq!(value["pages"][0]["kind"], "plain");
        assert_eq!(value["pages"][0]["rows"], 4);
    }
}
