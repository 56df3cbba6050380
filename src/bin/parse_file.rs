use std::path::PathBuf;

use clap::Parser;
use fs_err::read_to_string;
use hwsurvey_scraping::{
    export::{write_table, write_table_to},
    parser::{main_stats, videocard},
    runner::Survey,
    schema::{Table, TableRow},
};
use hwsurvey_scraping_utils::fs_json_util::write_json;
use scraper::Html;
use serde::Serialize;

/// Runs one extractor against a saved copy of a survey page.
#[derive(Parser)]
struct Opts {
    #[arg(value_enum)]
    survey: Survey,
    input_file: PathBuf,
    /// Write the table here instead of printing it.
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    let html = Html::parse_document(&read_to_string(&opts.input_file)?);
    if let Survey::Main = opts.survey {
        match main_stats::parse_survey_period(&html) {
            Ok(period) => eprintln!("Survey period: {period}"),
            Err(e) => eprintln!("Survey period unavailable: {e:#}"),
        }
    }
    match opts.survey {
        Survey::Main => report(&opts, &main_stats::parse(&html)?),
        Survey::Videocard => report(&opts, &videocard::parse(&html)?),
    }
}

fn report<R: TableRow + Serialize>(opts: &Opts, table: &Table<R>) -> anyhow::Result<()> {
    eprintln!("{} rows", table.len());
    if let Some(path) = &opts.json {
        write_json(path, table)?;
    }
    match &opts.csv {
        Some(path) => write_table(table, path),
        None if opts.json.is_none() => write_table_to(std::io::stdout().lock(), table),
        None => Ok(()),
    }
}
