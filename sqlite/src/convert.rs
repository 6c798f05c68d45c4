//! Conversion of engine values and rows into text.
//!
//! Every value leaves the store as text, whatever its storage class. Reals
//! are rendered the way SQLite renders them when cast to text: fifteen
//! significant digits, trailing zeros trimmed, and always a fractional part
//! (`40.0`, `30.3`). SQL `NULL` becomes `None`.

use std::collections::HashMap;

use rusqlite::Rows;
use rusqlite::types::ValueRef;

use crate::error::Result;

/// One selected row: column name (as reported by the statement) → text.
pub type ResultRow = HashMap<String, Option<String>>;

/// Renders a single engine value as text.
pub(crate) fn value_to_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(format_real(f)),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Renders a real with fifteen significant digits.
pub(crate) fn format_real(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return "0.0".to_string();
    }

    let scientific = format!("{value:.14e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };
    let sign = if mantissa.starts_with('-') { "-" } else { "" };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_end_matches('0');

    if !(-4..15).contains(&exponent) {
        let (head, tail) = digits.split_at(1);
        let tail = if tail.is_empty() { "0" } else { tail };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{sign}{head}.{tail}e{exp_sign}{:02}", exponent.abs());
    }

    if exponent < 0 {
        let zeros = "0".repeat((-exponent - 1) as usize);
        return format!("{sign}0.{zeros}{digits}");
    }

    let int_len = exponent as usize + 1;
    if digits.len() <= int_len {
        let padding = "0".repeat(int_len - digits.len());
        format!("{sign}{digits}{padding}.0")
    } else {
        let (int_part, frac_part) = digits.split_at(int_len);
        format!("{sign}{int_part}.{frac_part}")
    }
}

/// Materializes every row of a query as a [`ResultRow`].
///
/// Any read error aborts the whole conversion; no partial row is returned.
pub(crate) fn collect_rows(mut rows: Rows<'_>, columns: &[String]) -> Result<Vec<ResultRow>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut mapped = ResultRow::with_capacity(columns.len());
        for (index, name) in columns.iter().enumerate() {
            mapped.insert(name.clone(), value_to_text(row.get_ref(index)?));
        }
        out.push(mapped);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_format_real_matches_engine_text() {
        assert_eq!(format_real(40.0), "40.0");
        assert_eq!(format_real(30.3), "30.3");
        assert_eq!(format_real(10.0 + 20.0 + 40.0 + 30.3), "100.3");
        assert_eq!(format_real(-2.5), "-2.5");
        assert_eq!(format_real(0.001), "0.001");
        assert_eq!(format_real(0.0), "0.0");
        assert_eq!(format_real(1.0e20), "1.0e+20");
        assert_eq!(format_real(1.5e-7), "1.5e-07");
        assert_eq!(format_real(123456789012345.0), "123456789012345.0");
    }

    #[test]
    fn test_format_real_agrees_with_sqlite_cast() {
        let conn = Connection::open_in_memory().unwrap();
        for value in [40.0, 30.3, 100.3, -2.5, 0.001, 1234.5678] {
            let cast: String = conn
                .query_row("SELECT CAST(?1 AS TEXT)", [value], |row| row.get(0))
                .unwrap();
            assert_eq!(format_real(value), cast, "value {value}");
        }
    }

    #[test]
    fn test_value_to_text_storage_classes() {
        assert_eq!(value_to_text(ValueRef::Null), None);
        assert_eq!(value_to_text(ValueRef::Integer(33)), Some("33".into()));
        assert_eq!(value_to_text(ValueRef::Real(40.0)), Some("40.0".into()));
        assert_eq!(value_to_text(ValueRef::Text(b"Test_4")), Some("Test_4".into()));
        assert_eq!(value_to_text(ValueRef::Blob(b"raw")), Some("raw".into()));
    }

    #[test]
    fn test_collect_rows_uses_statement_column_names() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT 1 AS a, NULL AS b, 2.0 AS c").unwrap();
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = collect_rows(stmt.query([]).unwrap(), &columns).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["a"], Some("1".to_string()));
        assert_eq!(rows[0]["b"], None);
        assert_eq!(rows[0]["c"], Some("2.0".to_string()));
    }
}
