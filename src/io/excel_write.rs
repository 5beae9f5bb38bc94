use std::fs;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, info};

use crate::error::Result;
use crate::export::{Cell, WorkbookData};

/// Renders the workbook into an in-memory `.xlsx` buffer.
pub fn workbook_to_buffer(workbook: &WorkbookData) -> Result<Vec<u8>> {
    let mut workbook_writer = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in &workbook.tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col_idx as u16, header, &header_format)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let excel_row = (row_idx + 1) as u32;
            for (col_idx, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Number(value) => {
                        worksheet.write_number(excel_row, col_idx as u16, *value)?;
                    }
                    Cell::Text(value) => {
                        worksheet.write_string(excel_row, col_idx as u16, value)?;
                    }
                }
            }
        }

        let col_end = (table.columns.len() as u16).saturating_sub(1);
        worksheet.autofilter(0, 0, table.rows.len() as u32, col_end)?;
        worksheet.autofit();
    }

    Ok(workbook_writer.save_to_buffer()?)
}

/// Writes the provided workbook data to the given path, creating the parent
/// directory when needed.
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let buffer = workbook_to_buffer(workbook)?;
    debug!(bytes = buffer.len(), sheets = workbook.tables.len(), "workbook rendered");

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, buffer)?;
    info!(path = %path.display(), "workbook written");
    Ok(())
}
