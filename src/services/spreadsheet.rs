// src/services/spreadsheet.rs
//
// Leitura de planilhas enviadas por upload (.csv / .xlsx / .xls).

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Reader};
use csv::ReaderBuilder;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Csv,
    Excel,
}

// Uma linha de dados; `line` conta a partir de 1, sem o cabeçalho.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub line: usize,
    pub fields: HashMap<String, String>,
}

impl SheetRow {
    /// Valor da coluna, já aparado. Vazio se a coluna não existir.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(|v| v.as_str()).unwrap_or("")
    }

    pub fn get_opt(&self, column: &str) -> Option<&str> {
        Some(self.get(column)).filter(|v| !v.is_empty())
    }
}

pub fn detect_format(file_name: &str) -> Result<SpreadsheetFormat, AppError> {
    let lower = file_name.trim().to_lowercase();
    let ext = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext {
        "csv" => Ok(SpreadsheetFormat::Csv),
        "xlsx" | "xls" => Ok(SpreadsheetFormat::Excel),
        _ => Err(AppError::UnsupportedFormat(ext.to_string())),
    }
}

pub fn parse_rows(file_name: &str, bytes: &[u8]) -> Result<Vec<SheetRow>, AppError> {
    if bytes.is_empty() {
        return Err(AppError::EmptyUpload);
    }

    let table = match detect_format(file_name)? {
        SpreadsheetFormat::Csv => read_csv(bytes)?,
        SpreadsheetFormat::Excel => read_excel(bytes)?,
    };
    Ok(into_rows(table))
}

// Cabeçalho em minúsculas e aparado; linhas totalmente vazias são puladas
fn into_rows(table: Vec<Vec<String>>) -> Vec<SheetRow> {
    let mut iter = table.into_iter();
    let headers: Vec<String> = match iter.next() {
        Some(header_row) => header_row.iter().map(|h| h.trim().to_lowercase()).collect(),
        None => return Vec::new(),
    };

    iter.enumerate()
        .filter_map(|(idx, cells)| {
            let fields: HashMap<String, String> = headers
                .iter()
                .zip(cells)
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, value)| (header.clone(), value.trim().to_string()))
                .collect();

            if fields.values().all(|v| v.is_empty()) {
                return None;
            }
            Some(SheetRow { line: idx + 1, fields })
        })
        .collect()
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, AppError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| AppError::SpreadsheetError("o CSV precisa estar em UTF-8".to_string()))?;
    let text = text.trim_start_matches('\u{feff}');

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // permite linhas de tamanhos diferentes
        .from_reader(text.as_bytes());

    let mut table = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::SpreadsheetError(e.to_string()))?;
        table.push(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

// Lê somente a primeira aba
fn read_excel(bytes: &[u8]) -> Result<Vec<Vec<String>>, AppError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::SpreadsheetError(e.to_string()))?;

    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::SpreadsheetError("a planilha não tem abas".to_string()))?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| AppError::SpreadsheetError(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(detect_format("estoque.CSV").unwrap(), SpreadsheetFormat::Csv);
        assert_eq!(detect_format("estoque.xlsx").unwrap(), SpreadsheetFormat::Excel);
        assert!(matches!(detect_format("estoque.pdf"), Err(AppError::UnsupportedFormat(ext)) if ext == "pdf"));
        assert!(matches!(detect_format("estoque"), Err(AppError::UnsupportedFormat(_))));
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert!(matches!(parse_rows("estoque.csv", b""), Err(AppError::EmptyUpload)));
    }

    #[test]
    fn csv_headers_are_normalized() {
        let csv = "\u{feff} EAN ,Validade,QUANTIDADE\n7891000100103, 2025-09-30 ,12\n";
        let rows = parse_rows("estoque.csv", csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[0].get("ean"), "7891000100103");
        assert_eq!(rows[0].get("validade"), "2025-09-30");
        assert_eq!(rows[0].get("quantidade"), "12");
        assert_eq!(rows[0].get("marca"), "");
        assert_eq!(rows[0].get_opt("marca"), None);
    }

    #[test]
    fn blank_rows_are_skipped_but_keep_line_numbers() {
        let csv = "ean,quantidade\n7891000100103,1\n,\n7891000100104,2\n";
        let rows = parse_rows("estoque.csv", csv.as_bytes()).unwrap();

        let lines: Vec<usize> = rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, [1, 3]);
    }

    #[test]
    fn short_rows_are_tolerated() {
        let csv = "ean,validade,quantidade\n7891000100103\n";
        let rows = parse_rows("estoque.csv", csv.as_bytes()).unwrap();
        assert_eq!(rows[0].get("ean"), "7891000100103");
        assert_eq!(rows[0].get("quantidade"), "");
    }

    #[test]
    fn garbage_excel_is_a_spreadsheet_error() {
        let result = parse_rows("estoque.xlsx", b"isto nao e um xlsx");
        assert!(matches!(result, Err(AppError::SpreadsheetError(_))));
    }
}
