use anyhow::{bail, Context};
use hwsurvey_scraping_utils::{regex, selector};
use itertools::Itertools;
use log::{debug, info};
use scraper::{ElementRef, Html};

use crate::{
    percent::parse_percent_cell,
    query::{ClassRule, Marker, Node},
    schema::{Category, GroupName, MainRow, Table},
};

const SURVEY_ROOT: Marker = Marker::div(ClassRule::Id("hws_main"));
const MAIN_STATS: Marker = Marker::div(ClassRule::Id("main_stats"));
/// A category heading when it is a direct child of `#main_stats`,
/// a group heading when it sits among the entry cells.
const STATS_ROW: Marker = Marker::div(ClassRule::Class("stats_row"));
const CATEGORY_LABEL: Marker = Marker::div(ClassRule::Class("stats_col_left"));
const DETAILS: Marker = Marker::div(ClassRule::Class("stats_row_details"));
const ENTRY_CELL: Marker = Marker::div(ClassRule::AllClasses(&["stats_col_mid", "data_row"]));
const GROUP_LABEL: Marker = Marker::div(ClassRule::Class("stats_col_mid"));
const ANY_DIV: Marker = Marker::div(ClassRule::Any);

pub fn parse(html: &Html) -> anyhow::Result<Table<MainRow>> {
    extract(html.root_element())
}

pub fn extract<'a, N: Node<'a>>(document: N) -> anyhow::Result<Table<MainRow>> {
    let main_stats = document
        .find_descendant(&SURVEY_ROOT)
        .with_context(|| format!("{SURVEY_ROOT} not found"))?
        .find_descendant(&MAIN_STATS)
        .with_context(|| format!("{MAIN_STATS} not found in {SURVEY_ROOT}"))?;

    let categories = main_stats
        .element_children()
        .into_iter()
        .filter(|x| STATS_ROW.matches(x))
        .collect_vec();
    let mut rows = vec![];
    for block in &categories {
        let category: Category = block
            .find_descendant(&CATEGORY_LABEL)
            .with_context(|| format!("{CATEGORY_LABEL} not found in category block"))?
            .trimmed_text()
            .into();
        let details = block
            .find_following(&DETAILS)
            .with_context(|| format!("{DETAILS} not found for category {category:?}"))?;
        let before = rows.len();
        for cell in details.find_descendants(&ENTRY_CELL) {
            rows.push(extract_entry(&category, cell)?);
        }
        debug!("{category}: {} entries", rows.len() - before);
    }
    info!(
        "Extracted {} rows from {} categories of the main survey",
        rows.len(),
        categories.len()
    );
    Ok(rows.into_iter().collect())
}

fn extract_entry<'a, N: Node<'a>>(category: &Category, cell: N) -> anyhow::Result<MainRow> {
    let (siblings, index) = cell.siblings().context("Entry cell has no parent")?;
    let usage = siblings.next_matching(index, &ANY_DIV);
    let change = usage.and_then(|(i, _)| siblings.next_matching(i, &ANY_DIV));
    let group: Option<GroupName> = siblings
        .nearest_preceding(index, &STATS_ROW)
        .map(|(_, row)| {
            row.find_descendant(&GROUP_LABEL)
                .map(|label| label.trimmed_text().into())
                .with_context(|| format!("{GROUP_LABEL} not found in group row of {category:?}"))
        })
        .transpose()?;
    Ok(MainRow::builder()
        .category(category.clone())
        .group(group)
        .entry(cell.trimmed_text().into())
        .usage(parse_percent_cell(usage.map(|(_, x)| x)))
        .change(parse_percent_cell(change.map(|(_, x)| x)))
        .build())
}

/// Survey month shown above the main statistics, e.g. `April_2024`.
///
/// The header's first `span` holds auxiliary text and is left out.
pub fn parse_survey_period(html: &Html) -> anyhow::Result<String> {
    let header = html
        .select(selector!("div#main_stats_header"))
        .next()
        .context("div#main_stats_header not found")?;
    let skipped = header.select(selector!("span")).next();
    let mut text = String::new();
    collect_text(header, skipped, &mut text);
    let period = regex!(r"\s+").replace_all(text.trim(), "_");
    if period.is_empty() {
        bail!("Survey header is empty: {}", header.html());
    }
    Ok(period.into_owned())
}

fn collect_text(element: ElementRef, skipped: Option<ElementRef>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if Some(child) != skipped {
                collect_text(child, skipped, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::{parse, parse_survey_period};
    use crate::schema::MainRow;

    const SURVEY: &str = r#"
<html><body>
<div id="hws_main">
  <div id="main_stats_header">April 2024 <span>Steam Hardware &amp; Software Survey</span></div>
  <div id="main_stats">
    <div class="stats_row">
      <div class="stats_col_left"> GPU </div>
      <div class="stats_col_mid"></div>
    </div>
    <div class="stats_row_details">
      <div class="stats_col_left">&nbsp;</div>
      <div class="stats_col_mid data_row">Integrated</div>
      <div class="stats_col_right data_row">2.50%</div>
      <div class="stats_col_right2 data_row">-0.10%</div>
      <div class="stats_row">
        <div class="stats_col_left">&nbsp;</div>
        <div class="stats_col_mid"> Nvidia </div>
      </div>
      <div class="stats_col_left">&nbsp;</div>
      <div class="stats_col_mid data_row">RTX 4090</div>
      <div class="stats_col_right data_row">1.23%</div>
      <div class="stats_col_right2 data_row">0.05%</div>
      <div class="stats_col_mid data_row"> RTX 3060 </div>
      <div class="stats_col_right data_row">5.00%</div>
      <div class="stats_col_right2 data_row">-1.5%</div>
    </div>
    <div class="stats_row">
      <div class="stats_col_left">CPU</div>
    </div>
    <div class="stats_row_details">
      <div class="stats_col_mid data_row">8 cpus</div>
      <div class="stats_col_right data_row">33.3%</div>
      <div class="stats_col_right2 data_row">n/a</div>
      <div class="stats_col_mid data_row">8 cpus</div>
      <div class="stats_col_right data_row">33.3%</div>
    </div>
    <div class="stats_row">
      <div class="stats_col_left">Empty</div>
    </div>
    <div class="stats_row_details"></div>
  </div>
</div>
</body></html>
"#;

    fn row(row: &MainRow) -> (&str, Option<&str>, &str, f64, f64) {
        (
            row.category().as_ref(),
            row.group().as_ref().map(AsRef::as_ref),
            row.entry().as_ref(),
            row.usage(),
            row.change(),
        )
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-12, "{actual} != {expected}");
    }

    #[test]
    fn rows_follow_category_then_entry_order() {
        let table = parse(&Html::parse_document(SURVEY)).unwrap();
        let rows = table.iter().map(row).collect::<Vec<_>>();
        let keys = rows
            .iter()
            .map(|&(category, group, entry, _, _)| (category, group, entry))
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            [
                ("GPU", None, "Integrated"),
                ("GPU", Some("Nvidia"), "RTX 4090"),
                ("GPU", Some("Nvidia"), "RTX 3060"),
                ("CPU", None, "8 cpus"),
                ("CPU", None, "8 cpus"),
            ]
        );
    }

    #[test]
    fn grouped_entry_values() {
        let table = parse(&Html::parse_document(SURVEY)).unwrap();
        let (category, group, entry, usage, change) = row(&table.rows()[1]);
        assert_eq!((category, group, entry), ("GPU", Some("Nvidia"), "RTX 4090"));
        assert_close(usage, 0.0123);
        assert_close(change, 0.0005);
        assert_close(table.rows()[2].change(), -0.015);
    }

    #[test]
    fn unreadable_or_missing_percentages_become_zero() {
        let table = parse(&Html::parse_document(SURVEY)).unwrap();
        let (_, _, _, usage, change) = row(&table.rows()[3]);
        assert_close(usage, 0.333);
        assert_eq!(change, 0.0);
        let (_, _, _, usage, change) = row(&table.rows()[4]);
        assert_close(usage, 0.333);
        assert_eq!(change, 0.0);
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = Html::parse_document(SURVEY);
        assert_eq!(parse(&html).unwrap(), parse(&html).unwrap());
    }

    #[test]
    fn missing_containers_abort_the_run() {
        let html = Html::parse_document(r#"<div id="hws_main"></div>"#);
        let e = parse(&html).unwrap_err();
        assert!(e.to_string().contains("div#main_stats"), "{e}");
        assert!(parse(&Html::parse_document("<p>moved</p>")).is_err());
    }

    #[test]
    fn category_without_details_is_an_error() {
        let html = Html::parse_document(
            r#"<div id="hws_main"><div id="main_stats">
                <div class="stats_row"><div class="stats_col_left">Lonely</div></div>
            </div></div>"#,
        );
        assert!(parse(&html).is_err());
    }

    #[test]
    fn survey_period_drops_span() {
        let html = Html::parse_document(SURVEY);
        assert_eq!(parse_survey_period(&html).unwrap(), "April_2024");
        assert!(parse_survey_period(&Html::parse_document("<p></p>")).is_err());
    }
}
