use crate::config::ColumnMap;
use crate::error::LoadError;
use crate::types::{ColumnPresence, Hour, OrderRecord, RawOrderTable};
use crate::util::{canonical_number, hour_from_f64, normalize_hour, parse_f64_safe};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Xls,
    Csv,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Ok(SheetFormat::Xlsx),
            "xls" => Ok(SheetFormat::Xls),
            "csv" => Ok(SheetFormat::Csv),
            _ => Err(LoadError::UnsupportedFormat { extension: ext }),
        }
    }
}

/// A cell as it came out of the file, before any column typing.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
}

/// First sheet of the upload: header row plus data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    /// Malformed cell count per column header.
    pub malformed: BTreeMap<String, usize>,
}

impl LoadReport {
    pub fn malformed_cells(&self) -> usize {
        self.malformed.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub table: RawOrderTable,
    pub report: LoadReport,
}

pub fn load_table(bytes: &[u8], format: SheetFormat, columns: &ColumnMap) -> Result<Loaded, LoadError> {
    let sheet = read_sheet(bytes, format)?;
    debug!(
        "Read {} header cells and {} rows from {:?} upload",
        sheet.headers.len(),
        sheet.rows.len(),
        format
    );
    build_table(&sheet, columns)
}

pub fn read_sheet(bytes: &[u8], format: SheetFormat) -> Result<Sheet, LoadError> {
    match format {
        SheetFormat::Xlsx => {
            let mut wb = open_workbook_from_rs::<Xlsx<_>, _>(Cursor::new(bytes))
                .map_err(|e| LoadError::Workbook(e.to_string()))?;
            let range = wb
                .worksheet_range_at(0)
                .ok_or(LoadError::EmptySheet)?
                .map_err(|e| LoadError::Workbook(e.to_string()))?;
            Ok(sheet_from_range(&range))
        }
        SheetFormat::Xls => {
            let mut wb = open_workbook_from_rs::<Xls<_>, _>(Cursor::new(bytes))
                .map_err(|e| LoadError::Workbook(e.to_string()))?;
            let range = wb
                .worksheet_range_at(0)
                .ok_or(LoadError::EmptySheet)?
                .map_err(|e| LoadError::Workbook(e.to_string()))?;
            Ok(sheet_from_range(&range))
        }
        SheetFormat::Csv => read_csv(bytes),
    }
}

fn sheet_from_range(range: &Range<Data>) -> Sheet {
    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|r| r.iter().map(|c| header_text(&to_cell(c))).collect())
        .unwrap_or_default();
    let rows = rows.map(|r| r.iter().map(to_cell).collect()).collect();
    Sheet { headers, rows }
}

fn to_cell(d: &Data) -> Cell {
    match d {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::Error(e) => Cell::Error(format!("{:?}", e)),
        other => Cell::Text(other.to_string()),
    }
}

fn header_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => canonical_number(*n),
        Cell::Bool(b) => b.to_string(),
        Cell::Empty | Cell::Error(_) => String::new(),
    }
}

fn read_csv(bytes: &[u8]) -> Result<Sheet, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(bytes);
    let mut records = rdr.records();
    let headers = match records.next() {
        Some(h) => h?.iter().map(|s| s.trim().to_string()).collect(),
        None => Vec::new(),
    };
    let mut rows = Vec::new();
    for result in records {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|s| {
                    if s.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(s.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(Sheet { headers, rows })
}

/// Column positions resolved against the header row.
struct Layout {
    order_id: usize,
    status: usize,
    net_order_value: Option<usize>,
    rider_name: Option<usize>,
    payment_code: Option<usize>,
    hours: Option<usize>,
    sla_status: Option<usize>,
}

fn resolve_layout(headers: &[String], columns: &ColumnMap) -> Result<Layout, LoadError> {
    let find = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| {
        find(name).ok_or_else(|| LoadError::MissingColumn {
            column: name.to_string(),
        })
    };
    Ok(Layout {
        order_id: require(&columns.order_id)?,
        status: require(&columns.status)?,
        net_order_value: find(&columns.net_order_value),
        rider_name: find(&columns.rider_name),
        payment_code: find(&columns.payment_code),
        hours: find(&columns.hours),
        sla_status: find(&columns.sla_status),
    })
}

/// Types each row against the column map. Cells that cannot be read as their
/// column's type are stored as missing and counted in the report.
pub fn build_table(sheet: &Sheet, columns: &ColumnMap) -> Result<Loaded, LoadError> {
    if sheet.headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::EmptySheet);
    }
    let layout = resolve_layout(&sheet.headers, columns)?;
    let mut report = LoadReport::default();

    let empty = Cell::Empty;
    let mut records = Vec::with_capacity(sheet.rows.len());
    for row in &sheet.rows {
        if row.iter().all(|c| *c == empty) {
            continue;
        }
        report.total_rows += 1;
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or(&empty);
        let mut text = |idx: Option<usize>, name: &str| {
            text_value(cell(idx)).unwrap_or_else(|| {
                *report.malformed.entry(name.to_string()).or_default() += 1;
                None
            })
        };

        let order_id = text(Some(layout.order_id), &columns.order_id);
        let status = text(Some(layout.status), &columns.status);
        let rider_name = text(layout.rider_name, &columns.rider_name);
        let payment_code = text(layout.payment_code, &columns.payment_code);
        let sla_status = text(layout.sla_status, &columns.sla_status);

        let net_order_value = number_value(cell(layout.net_order_value)).unwrap_or_else(|| {
            *report
                .malformed
                .entry(columns.net_order_value.clone())
                .or_default() += 1;
            None
        });
        let hour = hour_value(cell(layout.hours)).unwrap_or_else(|| {
            *report.malformed.entry(columns.hours.clone()).or_default() += 1;
            None
        });

        records.push(OrderRecord {
            order_id,
            net_order_value,
            status,
            rider_name,
            payment_code,
            hour,
            sla_status,
        });
    }

    let table = RawOrderTable {
        records,
        columns: ColumnPresence {
            net_order_value: layout.net_order_value.is_some(),
            rider_name: layout.rider_name.is_some(),
            payment_code: layout.payment_code.is_some(),
            hours: layout.hours.is_some(),
            sla_status: layout.sla_status.is_some(),
        },
    };
    Ok(Loaded { table, report })
}

// Each reader returns `None` for a malformed cell and `Some(None)` for an
// empty one.

fn text_value(cell: &Cell) -> Option<Option<String>> {
    match cell {
        Cell::Empty => Some(None),
        Cell::Text(s) => {
            let s = s.trim();
            Some((!s.is_empty()).then(|| s.to_string()))
        }
        Cell::Number(n) => Some(Some(canonical_number(*n))),
        Cell::Bool(b) => Some(Some(b.to_string())),
        Cell::Error(_) => None,
    }
}

fn number_value(cell: &Cell) -> Option<Option<f64>> {
    match cell {
        Cell::Empty => Some(None),
        Cell::Number(n) if n.is_finite() => Some(Some(*n)),
        Cell::Text(s) if s.trim().is_empty() => Some(None),
        Cell::Text(s) => parse_f64_safe(Some(s)).map(Some),
        _ => None,
    }
}

fn hour_value(cell: &Cell) -> Option<Option<Hour>> {
    match cell {
        Cell::Empty => Some(None),
        Cell::Number(n) => hour_from_f64(*n).map(|h| Some(Hour(h))),
        Cell::Text(s) if s.trim().is_empty() => Some(None),
        Cell::Text(s) => normalize_hour(s).map(|h| Some(Hour(h))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn headers() -> Vec<String> {
        [
            "Order ID",
            "Net Order Value",
            "Status",
            "Rider Name",
            "Payment Code",
            "Hours",
            "SLA STS",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SheetFormat::from_path(Path::new("orders.XLSX")).unwrap(), SheetFormat::Xlsx);
        assert_eq!(SheetFormat::from_path(Path::new("orders.xls")).unwrap(), SheetFormat::Xls);
        assert_eq!(SheetFormat::from_path(Path::new("orders.csv")).unwrap(), SheetFormat::Csv);
        assert!(matches!(
            SheetFormat::from_path(Path::new("orders.pdf")),
            Err(LoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn typed_rows_from_sheet() {
        let sheet = Sheet {
            headers: headers(),
            rows: vec![vec![
                Cell::Number(1.0),
                text("1,250.50"),
                text("COMPLETE"),
                text(" A "),
                text("CASH"),
                text("08"),
                text("Within SLA"),
            ]],
        };
        let loaded = build_table(&sheet, &ColumnMap::default()).unwrap();
        assert_eq!(
            loaded.table.records,
            vec![OrderRecord {
                order_id: Some("1".to_string()),
                net_order_value: Some(1250.5),
                status: Some("COMPLETE".to_string()),
                rider_name: Some("A".to_string()),
                payment_code: Some("CASH".to_string()),
                hour: Some(Hour(8)),
                sla_status: Some("Within SLA".to_string()),
            }]
        );
        assert_eq!(loaded.table.columns, ColumnPresence::all());
        assert_eq!(loaded.report.total_rows, 1);
        assert_eq!(loaded.report.malformed_cells(), 0);
    }

    #[test]
    fn malformed_cells_are_counted_not_coerced() {
        let sheet = Sheet {
            headers: headers(),
            rows: vec![vec![
                text("7"),
                text("n/a"),
                text("COMPLETE"),
                Cell::Empty,
                Cell::Error("NA".to_string()),
                text("8:30"),
                text("Over SLA"),
            ]],
        };
        let loaded = build_table(&sheet, &ColumnMap::default()).unwrap();
        let record = &loaded.table.records[0];
        assert_eq!(record.net_order_value, None);
        assert_eq!(record.payment_code, None);
        assert_eq!(record.hour, None);
        assert_eq!(record.rider_name, None);
        assert_eq!(loaded.report.malformed.get("Net Order Value"), Some(&1));
        assert_eq!(loaded.report.malformed.get("Payment Code"), Some(&1));
        assert_eq!(loaded.report.malformed.get("Hours"), Some(&1));
        assert_eq!(loaded.report.malformed.get("Rider Name"), None);
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let sheet = Sheet {
            headers: vec!["Order ID".to_string(), "Status".to_string()],
            rows: vec![vec![text("1"), text("COMPLETE")], vec![Cell::Empty, Cell::Empty]],
        };
        let loaded = build_table(&sheet, &ColumnMap::default()).unwrap();
        assert_eq!(loaded.table.records.len(), 1);
        assert!(!loaded.table.columns.hours);
        assert!(!loaded.table.columns.sla_status);
        assert!(!loaded.table.columns.net_order_value);
        assert_eq!(loaded.report.malformed_cells(), 0);
    }

    #[test]
    fn required_column_missing_is_an_error() {
        let sheet = Sheet {
            headers: vec!["Order ID".to_string(), "Rider Name".to_string()],
            rows: vec![],
        };
        match build_table(&sheet, &ColumnMap::default()) {
            Err(LoadError::MissingColumn { column }) => assert_eq!(column, "Status"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn custom_header_names() {
        let columns = ColumnMap {
            order_id: "order".to_string(),
            status: "state".to_string(),
            ..ColumnMap::default()
        };
        let sheet = Sheet {
            headers: vec!["order".to_string(), "state".to_string()],
            rows: vec![vec![text("9"), text("CANCEL")]],
        };
        let loaded = build_table(&sheet, &columns).unwrap();
        assert_eq!(loaded.table.records[0].order_id.as_deref(), Some("9"));
    }

    #[test]
    fn csv_upload_loads_like_a_sheet() {
        let csv = "Order ID,Net Order Value,Status,Rider Name,Payment Code,Hours,SLA STS\n\
                   1,100,COMPLETE,A,CASH,08,Within SLA\n\
                   1,100,COMPLETE,A,CASH,08,Within SLA\n\
                   2,50,CANCEL,,CARD,09,Cancel\n";
        let loaded = load_table(csv.as_bytes(), SheetFormat::Csv, &ColumnMap::default()).unwrap();
        assert_eq!(loaded.report.total_rows, 3);
        let last = &loaded.table.records[2];
        assert_eq!(last.rider_name, None);
        assert_eq!(last.hour, Some(Hour(9)));
        assert_eq!(last.net_order_value, Some(50.0));
    }

    #[test]
    fn workbook_range_loads_like_csv() {
        let mut range: Range<Data> = Range::new((0, 0), (3, 6));
        for (col, h) in headers().into_iter().enumerate() {
            range.set_value((0, col as u32), Data::String(h));
        }
        let rows = [
            [
                Data::Float(1.0),
                Data::Float(100.0),
                Data::String("COMPLETE".into()),
                Data::String("A".into()),
                Data::String("CASH".into()),
                Data::Float(8.0),
                Data::String("Within SLA".into()),
            ],
            [
                Data::Int(2),
                Data::Error(CellErrorType::NA),
                Data::String("CANCEL".into()),
                Data::Empty,
                Data::String("CARD".into()),
                Data::String("09".into()),
                Data::String("Cancel".into()),
            ],
            [
                Data::String("3".into()),
                Data::Float(42.5),
                Data::String("UNSUCCESSFUL ON DEMAND DELIVERY".into()),
                Data::String("B".into()),
                Data::Empty,
                Data::Float(23.0),
                Data::String("Over SLA".into()),
            ],
        ];
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                range.set_value((r as u32 + 1, c as u32), value);
            }
        }

        let from_workbook = build_table(&sheet_from_range(&range), &ColumnMap::default()).unwrap();

        let csv = "Order ID,Net Order Value,Status,Rider Name,Payment Code,Hours,SLA STS\n\
                   1,100,COMPLETE,A,CASH,08,Within SLA\n\
                   2,#N/A,CANCEL,,CARD,09,Cancel\n\
                   3,42.5,UNSUCCESSFUL ON DEMAND DELIVERY,B,,23,Over SLA\n";
        let from_csv = load_table(csv.as_bytes(), SheetFormat::Csv, &ColumnMap::default()).unwrap();

        assert_eq!(from_workbook.table, from_csv.table);
        assert_eq!(from_workbook.report, from_csv.report);
        assert_eq!(from_workbook.table.records[0].order_id.as_deref(), Some("1"));
        assert_eq!(from_workbook.table.records[0].hour, Some(Hour(8)));
        assert_eq!(from_workbook.report.malformed.get("Net Order Value"), Some(&1));
    }

    #[test]
    fn empty_csv_is_rejected() {
        assert!(matches!(
            load_table(b"", SheetFormat::Csv, &ColumnMap::default()),
            Err(LoadError::EmptySheet)
        ));
    }

    #[test]
    fn garbage_workbook_is_a_parse_error() {
        let result = load_table(b"definitely not a zip", SheetFormat::Xlsx, &ColumnMap::default());
        assert!(matches!(result, Err(LoadError::Workbook(_))));
    }
}
