use arrayvec::ArrayVec;
use derive_more::{AsRef, Display, From};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Top-level heading on the main survey page, e.g. `Processor Vendor`.
#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct Category(String);

/// Optional sub-heading inside a category, e.g. `Nvidia`.
#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct GroupName(String);

/// Heading of a block of rows on the videocard page.
#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct Subcategory(String);

#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct EntryName(String);

/// Most numeric cells a videocard row can carry: five monthly shares and the change.
pub const VIDEOCARD_VALUES: usize = 6;
/// Months of history in a full videocard row.
pub const VIDEOCARD_HISTORY: usize = VIDEOCARD_VALUES - 1;

#[derive(Clone, PartialEq, Debug, Getters, CopyGetters, TypedBuilder, Serialize)]
pub struct MainRow {
    #[getset(get = "pub")]
    category: Category,
    #[getset(get = "pub")]
    group: Option<GroupName>,
    #[getset(get = "pub")]
    entry: EntryName,
    #[getset(get_copy = "pub")]
    usage: f64,
    #[getset(get_copy = "pub")]
    change: f64,
}

#[derive(Clone, PartialEq, Debug, Getters, TypedBuilder, Serialize)]
#[getset(get = "pub")]
pub struct VideocardRow {
    subcategory: Subcategory,
    entry: EntryName,
    /// Fractions in page order; the last one is the month-over-month change.
    values: ArrayVec<f64, VIDEOCARD_VALUES>,
}

impl VideocardRow {
    /// Monthly shares, oldest first.
    pub fn history(&self) -> &[f64] {
        self.values
            .split_last()
            .map_or(&[][..], |(_, history)| history)
    }

    /// `None` only when the row had nothing but its name cell.
    pub fn month_change(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Rows of one extraction run, in page order.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(transparent)]
pub struct Table<R> {
    rows: Vec<R>,
}

impl<R> Table<R> {
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }
}

impl<R> FromIterator<R> for Table<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'t, R> IntoIterator for &'t Table<R> {
    type Item = &'t R;
    type IntoIter = std::slice::Iter<'t, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// A row that knows its place in a delimited export.
pub trait TableRow {
    const HEADER: &'static [&'static str];

    /// One field per [`Self::HEADER`] column; absent values are empty strings.
    fn record(&self) -> Vec<String>;
}

impl TableRow for MainRow {
    const HEADER: &'static [&'static str] =
        &["Category", "Group", "Entry", "Usage_%", "Evolution_%"];

    fn record(&self) -> Vec<String> {
        vec![
            self.category.to_string(),
            self.group.as_ref().map_or_else(String::new, ToString::to_string),
            self.entry.to_string(),
            format_fraction(self.usage),
            format_fraction(self.change),
        ]
    }
}

impl TableRow for VideocardRow {
    const HEADER: &'static [&'static str] = &[
        "Subcategory",
        "Entry",
        "Month-4",
        "Month-3",
        "Month-2",
        "Month-1",
        "Month",
        "MonthChange_%",
    ];

    /// A short history is aligned to the newest month; older months stay empty.
    fn record(&self) -> Vec<String> {
        let history = self.history();
        let mut ret = Vec::with_capacity(Self::HEADER.len());
        ret.push(self.subcategory.to_string());
        ret.push(self.entry.to_string());
        ret.extend((history.len()..VIDEOCARD_HISTORY).map(|_| String::new()));
        ret.extend(history.iter().copied().map(format_fraction));
        ret.push(self.month_change().map_or_else(String::new, format_fraction));
        ret
    }
}

/// Shortest text that reads back as the same `f64`, always with a decimal point.
fn format_fraction(value: f64) -> String {
    format!("{value:?}")
}
