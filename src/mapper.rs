use tracing::warn;

use crate::error::{MapError, NumberParseError};
use crate::normalize::{parse_locale_number, parse_locale_percent};
use crate::types::{FundRecord, RawRow};

pub const COL_CODE: &str = "Fundos";
pub const COL_CATEGORY: &str = "Setor";
pub const COL_PRICE: &str = "Preço Atual (R$)";
pub const COL_LIQUIDITY: &str = "Liquidez Diária (R$)";
pub const COL_PVPA: &str = "P/VPA";
pub const COL_DY: &str = "DY (12M) Acumulado";

/// Header labels the ranking table must carry, one per `FundRecord` field.
pub const FIELD_COLUMNS: [(&str, &str); 6] = [
    ("code", COL_CODE),
    ("category", COL_CATEGORY),
    ("price", COL_PRICE),
    ("liquidity", COL_LIQUIDITY),
    ("pvpa", COL_PVPA),
    ("dy", COL_DY),
];

/// Labels from `FIELD_COLUMNS` absent from `headers`, in table order.
pub fn missing_columns(headers: &[String]) -> Vec<String> {
    FIELD_COLUMNS
        .iter()
        .filter(|(_, label)| !headers.iter().any(|h| h == label))
        .map(|(_, label)| label.to_string())
        .collect()
}

pub fn map_row(raw: &RawRow) -> Result<FundRecord, MapError> {
    let row = raw.index;
    let field = |name: &'static str, label: &str| {
        raw.get(label)
            .ok_or(MapError::MissingField { row, field: name })
    };
    let numeric = |name: &'static str,
                   label: &str,
                   parse: fn(&str) -> Result<f64, NumberParseError>| {
        let text = field(name, label)?;
        parse(text).map_err(|source| MapError::InvalidNumber {
            row,
            field: name,
            source,
        })
    };

    let code = clean_text(field("code", COL_CODE)?);
    if code.is_empty() {
        return Err(MapError::EmptyCode { row });
    }

    Ok(FundRecord {
        code,
        category: clean_text(field("category", COL_CATEGORY)?),
        price: numeric("price", COL_PRICE, parse_locale_number)?,
        liquidity: numeric("liquidity", COL_LIQUIDITY, parse_locale_number)?,
        pvpa: numeric("pvpa", COL_PVPA, parse_locale_percent)?,
        dy: numeric("dy", COL_DY, parse_locale_percent)?,
    })
}

#[derive(Debug, Default)]
pub struct MappedRows {
    pub records: Vec<FundRecord>,
    pub rejected: Vec<MapError>,
}

/// Maps every row; rows that fail are logged and left out of `records`.
pub fn map_rows(rows: &[RawRow]) -> MappedRows {
    let mut out = MappedRows {
        records: Vec::with_capacity(rows.len()),
        rejected: Vec::new(),
    };
    for raw in rows {
        match map_row(raw) {
            Ok(record) => out.records.push(record),
            Err(e) => {
                warn!(row = raw.index, "skipping row: {e}");
                out.rejected.push(e);
            }
        }
    }
    out
}

/// Trim and collapse internal whitespace runs to one space.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn header() -> Arc<[String]> {
        FIELD_COLUMNS
            .iter()
            .map(|(_, l)| l.to_string())
            .collect::<Vec<_>>()
            .into()
    }

    fn row(index: usize, cells: [&str; 6]) -> RawRow {
        RawRow::new(index, header(), cells.iter().map(|c| c.to_string()).collect())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn maps_populated_row() {
        let r = map_row(&row(0, ["ABCD11", "Shoppings", "100,50", "1.000.000,00", "1,02", "8,75%"]))
            .unwrap();
        assert_eq!(r.code, "ABCD11");
        assert_eq!(r.category, "Shoppings");
        assert!(close(r.price, 100.50));
        assert!(close(r.liquidity, 1_000_000.0));
        assert!(close(r.pvpa, 0.0102));
        assert!(close(r.dy, 0.0875));
    }

    #[test]
    fn maps_not_available_row_to_zeros() {
        let r = map_row(&row(1, ["WXYZ11", "N/A", "N/A", "N/A", "N/A", "N/A"])).unwrap();
        assert_eq!(r.code, "WXYZ11");
        assert_eq!(r.category, "N/A");
        assert_eq!((r.price, r.liquidity, r.pvpa, r.dy), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn mapping_is_deterministic() {
        let raw = row(0, ["HGLG11", "Logística", "160,10", "5.432,10", "0,98", "9,1%"]);
        assert_eq!(map_row(&raw).unwrap(), map_row(&raw).unwrap());
    }

    #[test]
    fn text_fields_are_whitespace_normalized() {
        let r = map_row(&row(0, ["\n  KNRI11 ", " Híbrido\n ", "1", "1", "1", "1"])).unwrap();
        assert_eq!(r.code, "KNRI11");
        assert_eq!(r.category, "Híbrido");
    }

    #[test]
    fn missing_column_is_named() {
        let cols: Arc<[String]> = vec!["Fundos".to_string(), "Setor".to_string()].into();
        let raw = RawRow::new(3, cols, vec!["ABCD11".into(), "Lajes".into()]);
        assert_eq!(
            map_row(&raw).unwrap_err(),
            MapError::MissingField { row: 3, field: "price" }
        );
    }

    #[test]
    fn malformed_number_names_field() {
        let err = map_row(&row(2, ["ABCD11", "Lajes", "1,0", "x", "1", "1"])).unwrap_err();
        match err {
            MapError::InvalidNumber { row, field, source } => {
                assert_eq!(row, 2);
                assert_eq!(field, "liquidity");
                assert_eq!(source.input, "x");
            }
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
    }

    #[test]
    fn empty_code_rejected() {
        let err = map_row(&row(5, ["  ", "Lajes", "1", "1", "1", "1"])).unwrap_err();
        assert_eq!(err, MapError::EmptyCode { row: 5 });
    }

    #[test]
    fn map_rows_preserves_order_and_count() {
        let rows: Vec<RawRow> = (0..5)
            .map(|i| {
                let code = format!("FND{i}11");
                RawRow::new(
                    i,
                    header(),
                    vec![code, "Lajes".into(), "1".into(), "1".into(), "1".into(), "1".into()],
                )
            })
            .collect();
        let mapped = map_rows(&rows);
        assert!(mapped.rejected.is_empty());
        let codes: Vec<&str> = mapped.records.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["FND011", "FND111", "FND211", "FND311", "FND411"]);
    }

    #[test]
    fn map_rows_skips_bad_rows() {
        let rows = vec![
            row(0, ["AAAA11", "Lajes", "1", "1", "1", "1"]),
            row(1, ["BBBB11", "Lajes", "??", "1", "1", "1"]),
            row(2, ["CCCC11", "Lajes", "2", "2", "2", "2"]),
        ];
        let mapped = map_rows(&rows);
        assert_eq!(mapped.records.len(), 2);
        assert_eq!(mapped.records[1].code, "CCCC11");
        assert_eq!(mapped.rejected.len(), 1);
    }

    #[test]
    fn missing_columns_reports_absent_labels() {
        let headers = vec!["Fundos".to_string(), "Setor".to_string(), "P/VPA".to_string()];
        assert_eq!(
            missing_columns(&headers),
            vec![COL_PRICE.to_string(), COL_LIQUIDITY.to_string(), COL_DY.to_string()]
        );
        assert!(missing_columns(&header()).is_empty());
    }
}
