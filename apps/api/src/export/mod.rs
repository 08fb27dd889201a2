//! Spreadsheet export: turns a `PipelineResult` into "Results" and "Heatmap" sheets.

mod xlsx;

use thiserror::Error;

use crate::matching::models::PipelineResult;

pub use xlsx::write_xlsx;

pub const XLSX_FILENAME: &str = "jd_cv_match.xlsx";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Separator for list-valued cells (strengths, gaps).
const LIST_SEPARATOR: &str = "; ";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("sheet exceeds the workbook row or column limit")]
    TooLarge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(i64),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<u8> for Cell {
    fn from(n: u8) -> Self {
        Cell::Number(i64::from(n))
    }
}

/// One worksheet: a header row followed by data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Builds the two export sheets. Heatmap columns follow result order; pairs the
/// model did not label become empty cells.
pub fn tabulate(result: &PipelineResult) -> Vec<Sheet> {
    let results = Sheet {
        name: "Results".to_string(),
        header: [
            "name",
            "weighted_match_pct",
            "palantir_knowledge_pct",
            "strengths",
            "gaps",
        ]
        .map(String::from)
        .to_vec(),
        rows: result
            .results
            .iter()
            .map(|r| {
                vec![
                    Cell::from(r.name.as_str()),
                    Cell::from(r.weighted_match_pct),
                    Cell::from(r.palantir_knowledge_pct),
                    Cell::from(r.strengths.join(LIST_SEPARATOR)),
                    Cell::from(r.gaps.join(LIST_SEPARATOR)),
                ]
            })
            .collect(),
    };

    let candidates: Vec<&str> = result.results.iter().map(|r| r.name.as_str()).collect();
    let mut heat_header = vec!["Competency".to_string()];
    heat_header.extend(candidates.iter().map(|c| c.to_string()));

    let heatmap = Sheet {
        name: "Heatmap".to_string(),
        header: heat_header,
        rows: result
            .competencies
            .iter()
            .map(|comp| {
                let mut row = vec![Cell::from(comp.name.as_str())];
                row.extend(
                    candidates
                        .iter()
                        .map(|cand| Cell::from(result.heatmap.cell(&comp.name, cand))),
                );
                row
            })
            .collect(),
    };

    vec![results, heatmap]
}

/// Renders a result straight to workbook bytes.
pub fn export_xlsx(result: &PipelineResult) -> Result<Vec<u8>, ExportError> {
    write_xlsx(&tabulate(result))
}
