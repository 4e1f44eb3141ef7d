//! Reading delimited email exports into a raw, header-keyed table

use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::{LoadError, Result};

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];
const SNIFF_RECORDS: usize = 10;
const NULL_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A parsed file before any column semantics are applied.
///
/// Empty fields and null markers such as `NA` or `null` are stored as
/// `None` so that later stages can treat them as nulls. Rows shorter than the header are padded with `None`.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub delimiter: u8,
    pub malformed_rows: usize,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

pub fn load_file(path: &Path) -> Result<RawTable> {
    let start_time = Instant::now();
    info!(action = "start", component = "loader", file_path = ?path, "Reading email export");

    let bytes = fs::read(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let table = load_bytes(&bytes)?;
    info!(
        action = "complete",
        component = "loader",
        row_count = table.rows.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Email export loaded"
    );
    Ok(table)
}

pub fn load_reader<R: Read>(mut reader: R) -> Result<RawTable> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|source| LoadError::Unreadable {
        path: "<stream>".into(),
        source,
    })?;
    load_bytes(&bytes)
}

pub fn load_bytes(bytes: &[u8]) -> Result<RawTable> {
    let content = decode(bytes);
    if content.trim().is_empty() {
        return Err(LoadError::Empty.into());
    }

    let delimiter = detect_delimiter(&content);
    info!(
        action = "detect",
        component = "loader",
        delimiter = %(delimiter as char).escape_default(),
        "Detected delimiter"
    );

    parse_content(&content, delimiter)
}

/// UTF-8 when the bytes are valid UTF-8, otherwise Latin-1 compatible decoding.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(content) => content.to_string(),
        Err(_) => {
            info!(
                action = "decode",
                component = "loader",
                encoding = WINDOWS_1252.name(),
                "Input is not UTF-8, falling back"
            );
            let (content, _, _) = WINDOWS_1252.decode(bytes);
            content.into_owned()
        }
    }
}

/// Pick the candidate delimiter that appears most consistently across the
/// first records of the file. Falls back to a comma.
pub fn detect_delimiter(content: &str) -> u8 {
    let sample = sample_records(content, SNIFF_RECORDS);

    let mut best_delimiter = b',';
    let mut best_score = 0.0f64;

    if sample.is_empty() {
        return best_delimiter;
    }

    for &delimiter in &DELIMITER_CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|record| count_unquoted(record, delimiter))
            .collect();

        let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let variance = counts
            .iter()
            .map(|&c| (c as f64 - avg).powi(2))
            .sum::<f64>()
            / counts.len() as f64;

        let score = avg / (1.0 + variance.sqrt());
        if score > best_score {
            best_score = score;
            best_delimiter = delimiter;
        }
    }

    best_delimiter
}

/// Split off up to `limit` non-blank records. Line breaks inside double
/// quotes belong to the current record, so multi-line fields stay whole.
fn sample_records(content: &str, limit: usize) -> Vec<&str> {
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, byte) in content.bytes().enumerate() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'\n' if !in_quotes => {
                let record = &content[start..i];
                if !record.trim().is_empty() {
                    records.push(record);
                    if records.len() == limit {
                        return records;
                    }
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    let tail = &content[start..];
    if !tail.trim().is_empty() && records.len() < limit {
        records.push(tail);
    }
    records
}

fn count_unquoted(record: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in record.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Markers a spreadsheet or dataframe export writes for a missing value
fn is_null_marker(field: &str) -> bool {
    field.is_empty() || NULL_MARKERS.contains(&field)
}

fn parse_content(content: &str, delimiter: u8) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(LoadError::Csv)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut malformed_rows = 0;

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                malformed_rows += 1;
                warn!(action = "skip", component = "loader", error = %e, "Skipping unreadable row");
                continue;
            }
        };

        if record.len() > headers.len() {
            malformed_rows += 1;
            continue;
        }

        let mut row: Vec<Option<String>> = record
            .iter()
            .map(|field| (!is_null_marker(field)).then(|| field.to_string()))
            .collect();
        row.resize(headers.len(), None);
        rows.push(row);
    }

    if malformed_rows > 0 {
        warn!(
            action = "skip",
            component = "loader",
            malformed_rows,
            "Skipped malformed rows"
        );
    }

    if rows.is_empty() {
        return Err(LoadError::NoRows.into());
    }

    Ok(RawTable {
        headers,
        rows,
        delimiter,
        malformed_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Cursor;

    #[test]
    fn test_detect_comma() {
        let content = "Subject,Sender,Date,Body\na,b,c,d\ne,f,g,h\n";
        assert_eq!(detect_delimiter(content), b',');
    }

    #[test]
    fn test_detect_tab() {
        let content = "Subject\tSender\tDate\tBody\nHi, there\ta@x.com\t01/03/2024 09:15:00 AM\tx, y\n";
        assert_eq!(detect_delimiter(content), b'\t');
    }

    #[test]
    fn test_detect_ignores_quoted_commas() {
        let content = "Subject;Sender;Date;Body\n\"a, b, c\";s;d;\"x, y, z\"\n";
        assert_eq!(detect_delimiter(content), b';');
    }

    #[test]
    fn test_detect_comma_with_multiline_quoted_bodies() {
        let mut content = String::from("Subject,Sender,Date,Body\n");
        for i in 0..3 {
            content.push_str(&format!(
                "Update {i},jane@acme.com,0{d}/03/2024 09:15:00 AM,\"Hi team\n\
                 Jane Doe | Sales | Acme | +1 555\n\
                 Acme Corp | 1 Main St | Springfield | USA\n\
                 www.acme.com | @acme | fax 555\"\n",
                d = i + 1
            ));
        }
        assert_eq!(detect_delimiter(&content), b',');

        let table = load_bytes(content.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Subject", "Sender", "Date", "Body"]);
        assert_eq!(table.rows.len(), 3);
        let body = table.rows[0][3].as_deref().unwrap();
        assert!(body.starts_with("Hi team\nJane Doe | Sales"));
    }

    #[test]
    fn test_sample_records_keeps_quoted_newlines() {
        let records = sample_records("a,b\n\"x\ny\",z\n\n\"q\",r", 10);
        assert_eq!(records, vec!["a,b", "\"x\ny\",z", "\"q\",r"]);
        assert_eq!(sample_records("a\nb\nc\n", 2), vec!["a", "b"]);
    }

    #[test]
    fn test_load_reader_from_cursor() {
        let data = "Subject\tSender\tDate\tBody\nHi\ta@x.com\t01/03/2024 09:15:00 AM\tHello\n";
        let table = load_reader(Cursor::new(data.as_bytes())).unwrap();
        assert_eq!(table.delimiter, b'\t');
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][3].as_deref(), Some("Hello"));
    }

    #[test]
    fn test_null_markers_are_null() {
        let data = "Subject,Sender,Date,Body\nNA,b,c,d\na,N/A,c,d\na,b,c,null\na,b,NaN,d\nNAB,b,c,d\n";
        let table = load_bytes(data.as_bytes()).unwrap();
        assert_eq!(table.rows[0][0], None);
        assert_eq!(table.rows[1][1], None);
        assert_eq!(table.rows[2][3], None);
        assert_eq!(table.rows[3][2], None);
        assert_eq!(table.rows[4][0].as_deref(), Some("NAB"));
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let bytes = b"caf\xe9";
        assert_eq!(decode(bytes), "caf\u{e9}");
    }

    #[test]
    fn test_decode_strips_bom() {
        assert_eq!(decode(b"\xEF\xBB\xBFSubject"), "Subject");
    }

    #[test]
    fn test_load_pads_short_rows_and_skips_long_rows() {
        let data = "Subject,Sender,Date,Body\na,b,c,d\nshort,row\nx,y,z,w,extra\n";
        let table = load_bytes(data.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Subject", "Sender", "Date", "Body"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][3], None);
        assert_eq!(table.malformed_rows, 1);
    }

    #[test]
    fn test_empty_fields_are_null() {
        let data = "Subject,Sender,Date,Body\n,b,c,d\n";
        let table = load_bytes(data.as_bytes()).unwrap();
        assert_eq!(table.rows[0][0], None);
        assert_eq!(table.rows[0][1].as_deref(), Some("b"));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            load_bytes(b"  \n"),
            Err(Error::Load(LoadError::Empty))
        ));
    }

    #[test]
    fn test_header_only_has_no_rows() {
        assert!(matches!(
            load_bytes(b"Subject,Sender,Date,Body\n"),
            Err(Error::Load(LoadError::NoRows))
        ));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let result = load_file(Path::new("/definitely/not/here.csv"));
        assert!(matches!(
            result,
            Err(Error::Load(LoadError::Unreadable { .. }))
        ));
    }
}
