//! Workbook loading
//!
//! A workbook maps sheet names (`unit1`, `unit2`, ...) to rows of cells. It is
//! read from a spreadsheet (`.xlsx`, `.xls`, `.ods`) or from a JSON object of
//! the same shape. The first row of every sheet is a header and is skipped.
//! Cell order: word, translation, phonetic, segments, pronunciation, must-learn.

use super::card::{split_segments, CardId, CardRecord};
use crate::{Result, WordCardError};
use calamine::{open_workbook_auto, Data, Range, Reader};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Minimum number of cells a row needs to be considered
const MIN_ROW_CELLS: usize = 6;

/// Number of leading cells that must be non-empty
const REQUIRED_CELLS: usize = 5;

/// Raw sheets keyed by name
pub type Workbook = HashMap<String, Vec<Vec<Value>>>;

/// Sheet name for a unit number
pub fn sheet_name(unit: u32) -> String {
    format!("unit{}", unit)
}

/// Read and parse a workbook file, by extension
///
/// `.json` files are parsed as JSON; anything else goes to the spreadsheet
/// reader.
pub fn load_workbook(path: &Path) -> Result<Workbook> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let bytes = std::fs::read(path).map_err(|e| {
            WordCardError::DataFailure(format!("Cannot read {}: {}", path.display(), e))
        })?;
        return parse_workbook(&bytes);
    }
    read_spreadsheet(path)
}

/// Read every sheet of a spreadsheet file
pub fn read_spreadsheet(path: &Path) -> Result<Workbook> {
    let mut sheets = open_workbook_auto(path).map_err(|e| {
        WordCardError::DataFailure(format!("Cannot open {}: {}", path.display(), e))
    })?;

    let mut workbook = Workbook::new();
    for name in sheets.sheet_names() {
        let range = sheets.worksheet_range(&name).map_err(|e| {
            WordCardError::DataFailure(format!("Cannot read sheet {}: {}", name, e))
        })?;
        workbook.insert(name, sheet_rows(&range));
    }
    debug!("Spreadsheet {} has {} sheets", path.display(), workbook.len());
    Ok(workbook)
}

/// Rows of a sheet as anchored at A1, each cut after its last non-empty cell
fn sheet_rows(range: &Range<Data>) -> Vec<Vec<Value>> {
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let mut rows = vec![Vec::new(); first_row as usize];

    for row in range.rows() {
        let mut cells = vec![Value::Null; first_col as usize];
        cells.extend(row.iter().map(data_value));
        while cells.last().is_some_and(Value::is_null) {
            cells.pop();
        }
        rows.push(cells);
    }
    rows
}

fn data_value(data: &Data) -> Value {
    match data {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(*f as i64),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}

/// Parse workbook JSON
pub fn parse_workbook(bytes: &[u8]) -> Result<Workbook> {
    let workbook: Workbook = serde_json::from_slice(bytes)?;
    debug!("Workbook has {} sheets", workbook.len());
    Ok(workbook)
}

/// Load the cards of one unit from a workbook file
pub fn load_unit(path: &Path, unit: u32) -> Result<Vec<CardRecord>> {
    let workbook = load_workbook(path)?;
    cards_for_unit(&workbook, unit)
}

/// Build the cards of one unit, failing when the unit has no valid card
pub fn cards_for_unit(workbook: &Workbook, unit: u32) -> Result<Vec<CardRecord>> {
    let name = sheet_name(unit);
    let rows = workbook
        .get(&name)
        .ok_or_else(|| WordCardError::DataFailure(format!("Sheet {} not found", name)))?;

    let mut cards = Vec::new();
    for (row_number, row) in rows.iter().enumerate().skip(1) {
        let Some(cells) = row_cells(row) else {
            continue;
        };

        let segments = split_segments(&cells[3]);
        if segments.is_empty() {
            warn!("{} row {}: segment field has no segments, skipping", name, row_number + 1);
            continue;
        }

        let card = CardRecord::new(CardId::new(unit, cards.len()), &cells[0], segments)
            .with_translation(&cells[1])
            .with_phonetic(&cells[2])
            .with_pronunciation(&cells[4])
            .with_must_learn(is_must_learn(&cells[5]));
        cards.push(card);
    }

    if cards.is_empty() {
        return Err(WordCardError::DataFailure(format!(
            "Unit {} has no valid word cards",
            unit
        )));
    }

    info!("Loaded {} cards for unit {}", cards.len(), unit);
    Ok(cards)
}

/// Text of each cell, or `None` when the row is incomplete
fn row_cells(row: &[Value]) -> Option<Vec<String>> {
    if row.len() < MIN_ROW_CELLS {
        return None;
    }
    let cells: Vec<String> = row.iter().map(cell_text).collect();
    if cells[..REQUIRED_CELLS].iter().any(|c| c.is_empty()) {
        return None;
    }
    Some(cells)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn is_must_learn(cell: &str) -> bool {
    matches!(cell, "是" | "yes" | "Yes" | "true" | "1")
}
