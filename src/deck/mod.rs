//! Card supply: card records and the workbook loader

pub mod card;
pub mod loader;

pub use card::{split_pronunciation, split_segments, CardId, CardRecord, SEGMENT_DELIMITER};
pub use loader::{cards_for_unit, load_unit, load_workbook, parse_workbook, sheet_name, Workbook};
