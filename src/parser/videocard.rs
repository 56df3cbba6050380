use anyhow::Context;
use arrayvec::ArrayVec;
use log::info;
use scraper::Html;

use crate::{
    percent::parse_percent_cell,
    query::{ClassRule, Marker, Node},
    schema::{Table, VideocardRow, VIDEOCARD_VALUES},
};

const SUB_STATS: Marker = Marker::div(ClassRule::Id("sub_stats"));
const ROW: Marker = Marker::div(ClassRule::ClassPrefix("substats_row"));
const SUBCATEGORY_HEADER: Marker =
    Marker::div(ClassRule::AllClasses(&["substats_col_left", "col_header"]));
const CELL: Marker = Marker::div(ClassRule::ClassPrefix("substats_col"));
/// The name cell followed by at most [`VIDEOCARD_VALUES`] numeric cells.
const MAX_CELLS: usize = VIDEOCARD_VALUES + 1;

pub fn parse(html: &Html) -> anyhow::Result<Table<VideocardRow>> {
    extract(html.root_element())
}

pub fn extract<'a, N: Node<'a>>(document: N) -> anyhow::Result<Table<VideocardRow>> {
    let sub_stats = document
        .find_descendant(&SUB_STATS)
        .with_context(|| format!("{SUB_STATS} not found"))?;
    let table = sub_stats
        .find_descendants(&ROW)
        .into_iter()
        .map(extract_row)
        .collect::<anyhow::Result<Table<_>>>()?;
    info!("Extracted {} rows from the videocard survey", table.len());
    Ok(table)
}

fn extract_row<'a, N: Node<'a>>(row: N) -> anyhow::Result<VideocardRow> {
    // Looked up for every row so that rows separated from their header by
    // other elements still resolve to it.
    let (siblings, index) = row.siblings().context("Videocard row has no parent")?;
    let (_, header) = siblings
        .nearest_preceding(index, &SUBCATEGORY_HEADER)
        .with_context(|| {
            format!(
                "No {SUBCATEGORY_HEADER} precedes row {:?}",
                row.trimmed_text()
            )
        })?;

    let cells = row.find_descendants(&CELL);
    let (name, numbers) = cells
        .split_first()
        .with_context(|| format!("Videocard row has no {CELL} cells"))?;
    let values = numbers
        .iter()
        .take(MAX_CELLS - 1)
        .map(|&cell| parse_percent_cell(Some(cell)))
        .collect::<ArrayVec<_, VIDEOCARD_VALUES>>();

    Ok(VideocardRow::builder()
        .subcategory(header.trimmed_text().into())
        .entry(name.trimmed_text().into())
        .values(values)
        .build())
}
