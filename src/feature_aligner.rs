//! Coercion of loosely typed client features and alignment to the model's
//! expected columns.
//!
//! Clients send numbers as strings, often decorated ("₹12,000", "45%"). Those
//! become numbers; anything else that is not numeric is kept as a category.

use crate::types::feature::{AlignedRow, Cell, FeatureMap, FeatureValue};

/// Coerce one client value into a cell.
pub fn coerce_value(value: &FeatureValue) -> Cell {
    match value {
        FeatureValue::Null => Cell::Missing,
        FeatureValue::Number(v) => Cell::Number(*v),
        FeatureValue::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        FeatureValue::Text(s) => coerce_text(s),
    }
}

/// Coerce an already coerced cell again. Numbers and missing cells are fixed
/// points.
pub fn coerce_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(s) => coerce_text(s),
        other => other.clone(),
    }
}

fn coerce_text(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Missing;
    }

    let stripped: String = trimmed.chars().filter(|c| !is_decoration(*c)).collect();
    match stripped.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Cell::Number(v),
        _ => Cell::Text(trimmed.to_string()),
    }
}

/// Percent, thousands separator and currency signs.
fn is_decoration(c: char) -> bool {
    matches!(c, '%' | ',' | '$' | '¢' | '£' | '¤' | '¥' | '€' | '₹' | '₩' | '₽' | '₺' | '₦')
        || ('\u{20A0}'..='\u{20CF}').contains(&c)
}

/// Build the single-row table handed to the model.
///
/// With a known schema the row has exactly the schema's columns in order:
/// absent columns are `Missing` and unknown input columns are dropped.
/// Without one the caller's columns are kept in the order they were sent.
pub fn align_row(features: &FeatureMap, expected: Option<&[String]>) -> AlignedRow {
    let mut row = AlignedRow::new();
    match expected {
        Some(columns) => {
            for column in columns {
                let cell = features.get(column).map(coerce_value).unwrap_or(Cell::Missing);
                row.push(column.clone(), cell);
            }
        }
        None => {
            for (name, value) in features.iter() {
                row.push(name, coerce_value(value));
            }
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FeatureValue {
        FeatureValue::Text(s.to_string())
    }

    #[test]
    fn test_decorated_numbers() {
        assert_eq!(coerce_value(&text("₹12,000")), Cell::Number(12000.0));
        assert_eq!(coerce_value(&text("45%")), Cell::Number(45.0));
        assert_eq!(coerce_value(&text(" $1,250.50 ")), Cell::Number(1250.5));
        assert_eq!(coerce_value(&text("-€300")), Cell::Number(-300.0));
        assert_eq!(coerce_value(&text("34")), Cell::Number(34.0));
    }

    #[test]
    fn test_categorical_strings_unchanged() {
        assert_eq!(
            coerce_value(&text("self-employed")),
            Cell::Text("self-employed".to_string())
        );
        assert_eq!(coerce_value(&text("  salaried ")), Cell::Text("salaried".to_string()));
        // decoration alone is not a number
        assert_eq!(coerce_value(&text("%")), Cell::Text("%".to_string()));
        assert_eq!(coerce_value(&text("inf")), Cell::Text("inf".to_string()));
        assert_eq!(coerce_value(&text("NaN")), Cell::Text("NaN".to_string()));
    }

    #[test]
    fn test_missing_values() {
        assert_eq!(coerce_value(&FeatureValue::Null), Cell::Missing);
        assert_eq!(coerce_value(&text("")), Cell::Missing);
        assert_eq!(coerce_value(&text("   ")), Cell::Missing);
    }

    #[test]
    fn test_numbers_and_booleans() {
        assert_eq!(coerce_value(&FeatureValue::Number(0.0)), Cell::Number(0.0));
        assert_eq!(coerce_value(&FeatureValue::Bool(true)), Cell::Number(1.0));
        assert_eq!(coerce_value(&FeatureValue::Bool(false)), Cell::Number(0.0));
    }

    #[test]
    fn test_coercion_idempotent() {
        for value in [
            text("₹12,000"),
            text(""),
            text("self-employed"),
            FeatureValue::Null,
            FeatureValue::Number(7.5),
        ] {
            let once = coerce_value(&value);
            assert_eq!(coerce_cell(&once), once);
        }
    }

    #[test]
    fn test_align_to_expected_schema() {
        let features: FeatureMap = [
            ("age", text("34")),
            ("salary", FeatureValue::Number(5000.0)),
        ]
        .into_iter()
        .collect();
        let schema = vec!["age".to_string(), "income".to_string()];

        let row = align_row(&features, Some(schema.as_slice()));

        assert_eq!(row.columns(), &["age".to_string(), "income".to_string()]);
        assert_eq!(row.cells(), &[Cell::Number(34.0), Cell::Missing]);
        assert_eq!(row.get("salary"), None);
    }

    #[test]
    fn test_align_reorders_to_schema() {
        let features: FeatureMap = [
            ("income", FeatureValue::Number(1.0)),
            ("age", FeatureValue::Number(2.0)),
        ]
        .into_iter()
        .collect();
        let schema = vec!["age".to_string(), "income".to_string()];

        let row = align_row(&features, Some(schema.as_slice()));

        assert_eq!(row.cells(), &[Cell::Number(2.0), Cell::Number(1.0)]);
    }

    #[test]
    fn test_align_without_schema_keeps_input_order() {
        let features: FeatureMap = serde_json::from_str(
            r#"{"zeta": "10%", "alpha": null, "employment": "self-employed"}"#,
        )
        .unwrap();

        let row = align_row(&features, None);

        assert_eq!(
            row.columns(),
            &["zeta".to_string(), "alpha".to_string(), "employment".to_string()]
        );
        assert_eq!(
            row.cells(),
            &[
                Cell::Number(10.0),
                Cell::Missing,
                Cell::Text("self-employed".to_string())
            ]
        );
    }
}
