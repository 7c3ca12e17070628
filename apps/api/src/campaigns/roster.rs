//! Employee roster parsing for campaign uploads.
//!
//! Accepts CSV, XLS and XLSX. Columns are resolved by header name rather
//! than position, so reordered exports still import; `BAGIAN` appears twice
//! in HR exports and maps to job description (first) and job position
//! (second). Missing headers fail the whole upload before any row is read;
//! after that, a bad row is skipped and reported, never fatal. Unparseable
//! birthdates import as null, like the rest of the nullable fields.

use std::io::Cursor;

use calamine::{Data, DataType, Range, Reader, Xls, Xlsx};
use chrono::NaiveDate;

use crate::errors::AppError;

/// One parsed roster line, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    pub contract_num_detail: String,
    pub nip: Option<String>,
    pub name: String,
    pub job_description: String,
    pub location: String,
    pub birthplace: String,
    pub birthdate: Option<NaiveDate>,
    pub marriage_status: String,
    pub gender: String,
    pub address: String,
    pub nik: String,
    pub tax_status: String,
    pub npwp: String,
    pub mobile_number: String,
    pub email: String,
    pub mothers_name: String,
    pub bank_account: String,
    pub gt: i32,
    pub job_position: String,
}

/// A data row the parser could not turn into a `RosterRow`.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based spreadsheet row number (header is row 1).
    pub row_number: usize,
    pub reason: String,
}

/// Parse outcome: importable rows plus the rows that were dropped.
#[derive(Debug, Default)]
pub struct RosterParse {
    pub rows: Vec<RosterRow>,
    pub skipped: Vec<SkippedRow>,
}

/// Header names as they appear in the HR export, uppercase-normalized.
/// `BAGIAN` is listed twice on purpose; occurrences map in order.
const REQUIRED_HEADERS: [&str; 19] = [
    "PKWT NO",
    "NIP",
    "NAMA",
    "BAGIAN",
    "LOKASI KERJA",
    "TTL",
    "TGL.LAHIR",
    "STATUS",
    "GENDER",
    "ALAMAT",
    "NIK",
    "STATUS TAX",
    "NPWP",
    "HP",
    "EMAIL TERBARU",
    "NAMA LENGKAP IBU KANDUNG",
    "NOREK BRI",
    "GT",
    "BAGIAN",
];

pub fn parse_roster(data: &[u8], filename: &str) -> Result<RosterParse, AppError> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".csv") {
        parse_csv(data)
    } else if lower.ends_with(".xlsx") {
        let workbook = Xlsx::new(Cursor::new(data))
            .map_err(|e| AppError::Validation(format!("Could not read XLSX file: {e}")))?;
        parse_workbook(workbook)
    } else if lower.ends_with(".xls") {
        let workbook = Xls::new(Cursor::new(data))
            .map_err(|e| AppError::Validation(format!("Could not read XLS file: {e}")))?;
        parse_workbook(workbook)
    } else {
        Err(AppError::Validation("Unsupported file format".to_string()))
    }
}

/// Maps each required header to its column index, honoring duplicates by
/// occurrence order.
fn resolve_columns(headers: &[String]) -> Result<Vec<usize>, AppError> {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_uppercase()).collect();

    let mut used = vec![false; normalized.len()];
    let mut indices = Vec::with_capacity(REQUIRED_HEADERS.len());
    let mut missing = Vec::new();

    for required in REQUIRED_HEADERS {
        let found = normalized
            .iter()
            .enumerate()
            .find(|(i, h)| !used[*i] && h.as_str() == required);
        match found {
            Some((i, _)) => {
                used[i] = true;
                indices.push(i);
            }
            None => missing.push(required),
        }
    }

    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }
    Ok(indices)
}

fn build_row(cells: &[String], columns: &[usize]) -> Result<RosterRow, String> {
    let cell = |slot: usize| -> String {
        cells
            .get(columns[slot])
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    // Birthdate the parser can't read imports as null, matching the other
    // nullable roster fields.
    let birthdate = parse_flexible_date(&cell(6));

    let gt_raw = cell(17);
    let gt: i32 = gt_raw
        .replace('.', "")
        .replace(',', "")
        .parse()
        .map_err(|_| format!("invalid GT value '{gt_raw}'"))?;

    let nip = {
        let value = cell(1);
        if value.is_empty() { None } else { Some(value) }
    };

    Ok(RosterRow {
        contract_num_detail: cell(0),
        nip,
        name: cell(2),
        job_description: cell(3),
        location: cell(4),
        birthplace: cell(5),
        birthdate,
        marriage_status: cell(7),
        gender: cell(8),
        address: cell(9),
        nik: cell(10),
        tax_status: cell(11),
        npwp: cell(12),
        mobile_number: cell(13),
        email: cell(14),
        mothers_name: cell(15),
        bank_account: cell(16),
        gt,
        job_position: cell(18),
    })
}

fn collect_row(
    parse: &mut RosterParse,
    cells: Vec<String>,
    columns: &[usize],
    row_number: usize,
) {
    if cells.iter().all(|c| c.trim().is_empty()) {
        return;
    }
    match build_row(&cells, columns) {
        Ok(row) => parse.rows.push(row),
        Err(reason) => parse.skipped.push(SkippedRow { row_number, reason }),
    }
}

fn parse_csv(data: &[u8]) -> Result<RosterParse, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("Could not read CSV header: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let columns = resolve_columns(&headers)?;

    let mut parse = RosterParse::default();
    for (i, record) in reader.records().enumerate() {
        let row_number = i + 2;
        match record {
            Ok(record) => {
                let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
                collect_row(&mut parse, cells, &columns, row_number);
            }
            Err(e) => parse.skipped.push(SkippedRow {
                row_number,
                reason: e.to_string(),
            }),
        }
    }
    Ok(parse)
}

fn parse_workbook<RS, R>(mut workbook: R) -> Result<RosterParse, AppError>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let range: Range<Data> = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Validation("Workbook has no sheets".to_string()))?
        .map_err(|e| AppError::Validation(format!("Could not read first sheet: {e}")))?;

    let mut iter = range.rows();
    let headers: Vec<String> = iter
        .next()
        .ok_or_else(|| AppError::Validation("Sheet is empty".to_string()))?
        .iter()
        .map(cell_to_string)
        .collect();
    let columns = resolve_columns(&headers)?;

    let mut parse = RosterParse::default();
    for (i, row) in iter.enumerate() {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        collect_row(&mut parse, cells, &columns, i + 2);
    }
    Ok(parse)
}

/// Renders a spreadsheet cell as the text the CSV path would have seen.
/// Numeric ids (NIK, account numbers) must not pick up a ".0" suffix, and
/// native Excel dates come out ISO so the shared date parser accepts them.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Accepts the date shapes seen across HR exports; anything else is None.
fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV_HEADER: &str = "NO,PKWT NO,NIP,NAMA,BAGIAN,LOKASI KERJA,TTL,TGL.LAHIR,STATUS,GENDER,ALAMAT,NIK,STATUS TAX,NPWP,HP,EMAIL TERBARU,NAMA LENGKAP IBU KANDUNG,NOREK BRI,GT,BAGIAN";

    fn data_row(pkwt: &str, name: &str, birthdate: &str, gt: &str) -> String {
        format!(
            "1,{pkwt},NIP01,{name},Operator Produksi,Cibitung,Bekasi,{birthdate},TK/0,L,Jl. Melati No. 3,3216051234560001,TK0,-,081234567890,budi@example.com,Siti Aminah,123456789,{gt},Produksi"
        )
    }

    fn sample_csv() -> String {
        format!(
            "{CSV_HEADER}\n{}\n",
            data_row("001/PKWT/2025", "Budi Santoso", "1999-05-02", "5100000")
        )
    }

    #[test]
    fn test_csv_happy_path() {
        let parse = parse_roster(sample_csv().as_bytes(), "roster.csv").unwrap();
        assert_eq!(parse.rows.len(), 1);
        assert!(parse.skipped.is_empty());
        let row = &parse.rows[0];
        assert_eq!(row.contract_num_detail, "001/PKWT/2025");
        assert_eq!(row.nip.as_deref(), Some("NIP01"));
        assert_eq!(row.name, "Budi Santoso");
        assert_eq!(row.birthdate, NaiveDate::from_ymd_opt(1999, 5, 2));
        assert_eq!(row.gt, 5_100_000);
    }

    #[test]
    fn test_duplicate_bagian_maps_description_then_position() {
        let parse = parse_roster(sample_csv().as_bytes(), "roster.csv").unwrap();
        assert_eq!(parse.rows[0].job_description, "Operator Produksi");
        assert_eq!(parse.rows[0].job_position, "Produksi");
    }

    #[test]
    fn test_missing_headers_named_in_error() {
        let csv = "NO,PKWT NO,NIP,NAMA\n1,001,NIP01,Budi\n";
        let err = parse_roster(csv.as_bytes(), "roster.csv").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Missing required columns"));
        assert!(message.contains("GT"));
        assert!(message.contains("TGL.LAHIR"));
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = parse_roster(b"whatever", "roster.pdf").unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }

    #[test]
    fn test_one_bad_date_does_not_reject_the_upload() {
        let csv = format!(
            "{CSV_HEADER}\n{}\n{}\n",
            data_row("001/PKWT/2025", "Budi", "1999-05-02", "5100000"),
            data_row("002/PKWT/2025", "Citra", "31/31/1999", "4900000"),
        );
        let parse = parse_roster(csv.as_bytes(), "roster.csv").unwrap();
        assert_eq!(parse.rows.len(), 2);
        assert!(parse.skipped.is_empty());
        assert_eq!(parse.rows[0].birthdate, NaiveDate::from_ymd_opt(1999, 5, 2));
        assert_eq!(parse.rows[1].birthdate, None);
    }

    #[test]
    fn test_bad_gt_row_skipped_others_kept() {
        let csv = format!(
            "{CSV_HEADER}\n{}\n{}\n{}\n",
            data_row("001/PKWT/2025", "Budi", "1999-05-02", "5100000"),
            data_row("002/PKWT/2025", "Citra", "2000-01-15", "abc"),
            data_row("003/PKWT/2025", "Dewi", "2001-03-20", "4800000"),
        );
        let parse = parse_roster(csv.as_bytes(), "roster.csv").unwrap();
        assert_eq!(parse.rows.len(), 2);
        assert_eq!(parse.rows[0].name, "Budi");
        assert_eq!(parse.rows[1].name, "Dewi");
        assert_eq!(parse.skipped.len(), 1);
        assert_eq!(parse.skipped[0].row_number, 3);
        assert!(parse.skipped[0].reason.contains("GT"));
    }

    #[test]
    fn test_empty_birthdate_is_none() {
        let csv = sample_csv().replace("1999-05-02", "");
        let parse = parse_roster(csv.as_bytes(), "roster.csv").unwrap();
        assert_eq!(parse.rows[0].birthdate, None);
    }

    #[test]
    fn test_parse_flexible_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1999, 5, 2);
        assert_eq!(parse_flexible_date("1999-05-02"), expected);
        assert_eq!(parse_flexible_date("02/05/1999"), expected);
        assert_eq!(parse_flexible_date("02-05-1999"), expected);
        assert_eq!(parse_flexible_date("05/02/1999x"), None);
    }

    #[test]
    fn test_gt_accepts_thousand_separators() {
        let csv = sample_csv().replace(",5100000,", ",\"5.100.000\",");
        let parse = parse_roster(csv.as_bytes(), "roster.csv").unwrap();
        assert_eq!(parse.rows[0].gt, 5_100_000);
    }

    #[test]
    fn test_cell_to_string_integral_float_has_no_decimal() {
        assert_eq!(cell_to_string(&Data::Float(3216051234560001.0)), "3216051234560001");
        assert_eq!(cell_to_string(&Data::String("abc".to_string())), "abc");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
