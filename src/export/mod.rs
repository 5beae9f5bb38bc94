use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::dates::iso;
use crate::model::{DateKeyedResults, ItineraryRecord};

/// Header written at the top of every date sheet.
pub const HEADERS: [&str; 9] = [
    "Origen ID",
    "Origen",
    "Destino ID",
    "Destino",
    "Hora Salida",
    "Servicio",
    "Tarifas Primer Piso",
    "Tarifas Segundo Piso",
    "Asientos Precio Cero",
];

/// Directory exports land in unless the caller chooses another one.
pub const DEFAULT_EXPORT_DIR: &str = "exports";

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Represents all tables required to materialise the Excel workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

impl WorkbookData {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.tables
            .iter()
            .map(|table| table.sheet_name.as_str())
            .collect()
    }
}

/// Lays the results out as one sheet per date, oldest first.
///
/// Dates without records are never present in [`DateKeyedResults`], so no
/// empty sheet can be produced.
pub fn build_workbook(results: &DateKeyedResults) -> WorkbookData {
    let tables = results
        .iter()
        .filter(|(_, records)| !records.is_empty())
        .map(|(date, records)| date_table(*date, records))
        .collect();

    WorkbookData { tables }
}

fn date_table(date: NaiveDate, records: &[ItineraryRecord]) -> SheetTable {
    SheetTable {
        sheet_name: iso(date),
        columns: HEADERS.iter().map(|header| header.to_string()).collect(),
        rows: records.iter().map(record_row).collect(),
    }
}

fn record_row(record: &ItineraryRecord) -> Vec<Cell> {
    vec![
        Cell::Number(record.origin.id as f64),
        Cell::Text(record.origin.name.clone()),
        Cell::Number(record.destination.id as f64),
        Cell::Text(record.destination.name.clone()),
        Cell::Text(record.departure_time.clone()),
        Cell::Text(record.service.clone()),
        Cell::Text(record.fares.first_floor.clone()),
        Cell::Text(record.fares.second_floor.clone().unwrap_or_default()),
        Cell::Text(record.seats_with_zero_price.clone().unwrap_or_default()),
    ]
}

/// Builds `<dir>/<provider>-itinerarios-<start>-<end>.xlsx`.
pub fn export_path(dir: &Path, provider: &str, start: NaiveDate, end: NaiveDate) -> PathBuf {
    dir.join(format!(
        "{provider}-itinerarios-{}-{}.xlsx",
        iso(start),
        iso(end)
    ))
}
