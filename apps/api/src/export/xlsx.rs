// Workbook rendering: one worksheet per `Sheet`, bold header row, no index column.

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use super::{Cell, ExportError, Sheet};

/// Renders sheets into an .xlsx workbook held in memory.
pub fn write_xlsx(sheets: &[Sheet]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_sheet(worksheet, sheet, &header_format)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    header_format: &Format,
) -> Result<(), ExportError> {
    for (col, title) in sheet.header.iter().enumerate() {
        worksheet.write_string_with_format(0, column(col)?, title, header_format)?;
    }

    for (i, row) in sheet.rows.iter().enumerate() {
        let row_idx = u32::try_from(i + 1).map_err(|_| ExportError::TooLarge)?;
        for (col, cell) in row.iter().enumerate() {
            let col = column(col)?;
            match cell {
                // Missing heatmap pairs stay blank rather than holding "".
                Cell::Text(text) if text.is_empty() => {}
                Cell::Text(text) => {
                    worksheet.write_string(row_idx, col, text)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row_idx, col, *n as f64)?;
                }
            }
        }
    }

    Ok(())
}

fn column(index: usize) -> Result<u16, ExportError> {
    u16::try_from(index).map_err(|_| ExportError::TooLarge)
}
