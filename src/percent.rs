use log::debug;

use crate::query::Node;

/// Value reported for a cell whose text cannot be read as a percentage.
///
/// It coincides with a genuine `0%`, so callers of [`parse_percent`] cannot
/// tell the two apart. Use [`try_parse_percent`] where that matters.
pub const FALLBACK_FRACTION: f64 = 0.0;

#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum PercentError {
    #[error("The percentage cell is missing")]
    Missing,
    #[error("The percentage text is empty")]
    Empty,
    #[error("Not a percentage: {0:?}")]
    NotANumber(String),
}

/// Reads text such as `"45.67%"` or `" -2.34 % "` as a fraction (`0.4567`, `-0.0234`).
pub fn try_parse_percent(text: &str) -> Result<f64, PercentError> {
    let number = text.trim().trim_end_matches('%').trim_end();
    if number.is_empty() {
        return Err(PercentError::Empty);
    }
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value / 100.0),
        _ => Err(PercentError::NotANumber(text.to_owned())),
    }
}

pub fn parse_percent(text: &str) -> f64 {
    fallback(try_parse_percent(text))
}

/// Like [`parse_percent`], for a cell that may not exist at all.
pub fn parse_percent_cell<'a, N: Node<'a>>(cell: Option<N>) -> f64 {
    fallback(
        cell.ok_or(PercentError::Missing)
            .and_then(|cell| try_parse_percent(&cell.text_content())),
    )
}

fn fallback(result: Result<f64, PercentError>) -> f64 {
    result.unwrap_or_else(|e| {
        debug!("{e}; using {FALLBACK_FRACTION}");
        FALLBACK_FRACTION
    })
}
