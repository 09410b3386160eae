use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("numeric pattern should compile"));

/// Trim whitespace; an all-whitespace cell becomes the missing value `""`.
pub fn clean_str(raw: &str) -> String {
    raw.trim().to_string()
}

pub fn is_missing(cell: &str) -> bool {
    cell.trim().is_empty()
}

/// First ASCII `<digits>(.<digits>)?` run in `s`, parsed as `f64`.
///
/// `"33.5 MJup"` → `Some(33.5)`, `"~0.97±0.02"` → `Some(0.97)`, `"?"` → `None`.
pub fn extract_number(s: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
