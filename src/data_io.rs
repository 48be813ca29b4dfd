//! Reading SMILES datasets and writing prediction tables.
//!
//! Input helpers return plain `Vec` types so they can be fed to
//! [`crate::models::to_ndarrays`] or straight into a
//! [`ModelContext`](crate::pipeline::ModelContext) batch. Output goes through
//! [`ResultTable`], which fixes the column set and the number formatting.
use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{BbbError, Result};
use crate::pipeline::PredictionResult;

/// Shown in numeric and verdict columns of rows without a prediction.
pub const PLACEHOLDER: &str = "-";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Split newline-separated text into SMILES strings.
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
///
/// ```
/// use bbbp::data_io::read_smiles_lines;
/// let smiles = read_smiles_lines("CCO\n\n# solvents\n  c1ccccc1  \n");
/// assert_eq!(smiles, vec!["CCO", "c1ccccc1"]);
/// ```
pub fn read_smiles_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// [`read_smiles_lines`] over a file.
pub fn read_smiles_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    Ok(read_smiles_lines(&fs::read_to_string(path)?))
}

/// Read a CSV file and extract a SMILES column and a numeric target column.
///
/// Returns `(smiles, targets)` in file order. Errors are returned if the CSV
/// cannot be read, a column is missing, or a target fails to parse as `f64`.
///
/// ```no_run
/// use bbbp::data_io::read_labelled_smiles;
/// let (smiles, logbb) = read_labelled_smiles("data/bbbp.csv", "smiles", "logBB")?;
/// # Ok::<(), bbbp::BbbError>(())
/// ```
pub fn read_labelled_smiles<P: AsRef<Path>>(
    path: P,
    smiles_col: &str,
    target_col: &str,
) -> Result<(Vec<String>, Vec<f64>)> {
    read_labelled_smiles_from_reader(fs::File::open(path)?, smiles_col, target_col)
}

/// Convenience: load labelled SMILES from a reader (useful for tests and in-memory data).
pub fn read_labelled_smiles_from_reader(
    reader: impl Read,
    smiles_col: &str,
    target_col: &str,
) -> Result<(Vec<String>, Vec<f64>)> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let smiles_idx = column_index(&headers, smiles_col)?;
    let target_idx = column_index(&headers, target_col)?;

    let mut smiles = Vec::new();
    let mut targets = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let s = field(&record, smiles_idx, row)?;
        let t = field(&record, target_idx, row)?;
        let parsed: f64 = t.trim().parse().map_err(|e| {
            BbbError::InvalidInput(format!(
                "failed to parse target '{t}' in row {}: {e}",
                row + 1
            ))
        })?;
        smiles.push(s.trim().to_string());
        targets.push(parsed);
    }
    Ok((smiles, targets))
}

/// Read just one SMILES column from a CSV file.
pub fn read_smiles_column<P: AsRef<Path>>(path: P, smiles_col: &str) -> Result<Vec<String>> {
    read_smiles_column_from_reader(fs::File::open(path)?, smiles_col)
}

/// [`read_smiles_column`] over any reader.
pub fn read_smiles_column_from_reader(reader: impl Read, smiles_col: &str) -> Result<Vec<String>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let idx = column_index(&headers, smiles_col)?;
    rdr.records()
        .enumerate()
        .map(|(row, result)| -> Result<String> {
            let record = result?;
            Ok(field(&record, idx, row)?.trim().to_string())
        })
        .collect()
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| BbbError::InvalidInput(format!("column '{name}' not found in CSV headers")))
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, row: usize) -> Result<&'r str> {
    record
        .get(idx)
        .ok_or_else(|| BbbError::InvalidInput(format!("missing field {idx} in row {}", row + 1)))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Round to four decimals for display.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// One formatted output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    /// Input as supplied.
    pub input: String,
    /// Canonical SMILES or placeholder.
    pub canonical: String,
    /// `OK`, `Invalid`, `PreprocessingError` or `ModelsUnavailable`.
    pub status: String,
    /// Probability to four decimals or placeholder.
    pub probability: String,
    /// logBB to four decimals or placeholder.
    pub logbb: String,
    /// `Yes`, `No` or placeholder.
    pub verdict: String,
}

impl From<&PredictionResult> for ResultRow {
    fn from(r: &PredictionResult) -> Self {
        let number = |v: Option<f64>| match (r.is_ok(), v) {
            (true, Some(v)) => format!("{:.4}", round4(v)),
            _ => PLACEHOLDER.to_string(),
        };
        Self {
            input: r.input.clone(),
            canonical: r
                .canonical
                .as_ref()
                .map_or_else(|| PLACEHOLDER.to_string(), |c| c.to_string()),
            status: r.status.to_string(),
            probability: number(r.probability),
            logbb: number(r.logbb),
            verdict: r
                .verdict
                .filter(|_| r.is_ok())
                .map_or_else(|| PLACEHOLDER.to_string(), |v| v.to_string()),
        }
    }
}

const HEADERS: [&str; 6] = ["input", "canonical", "status", "probability", "logbb", "verdict"];

/// Prediction results ready for output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Format a batch of results.
    pub fn new(results: &[PredictionResult]) -> Self {
        Self {
            rows: results.iter().map(ResultRow::from).collect(),
        }
    }

    /// Formatted rows.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Write as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        if self.rows.is_empty() {
            wtr.write_record(HEADERS)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write CSV to a file.
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(fs::File::create(path)?)
    }

    fn cells(row: &ResultRow) -> [&str; 6] {
        [
            row.input.as_str(),
            row.canonical.as_str(),
            row.status.as_str(),
            row.probability.as_str(),
            row.logbb.as_str(),
            row.verdict.as_str(),
        ]
    }
}

impl fmt::Display for ResultTable {
    /// Left-aligned text table, columns padded to their widest cell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths = HEADERS.map(str::len);
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(Self::cells(row)) {
                *w = (*w).max(cell.chars().count());
            }
        }
        write_line(f, HEADERS, &widths)?;
        let rule = widths.map(|w| "-".repeat(w));
        write_line(f, rule.each_ref().map(String::as_str), &widths)?;
        for row in &self.rows {
            write_line(f, Self::cells(row), &widths)?;
        }
        Ok(())
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: [&str; 6], widths: &[usize; 6]) -> fmt::Result {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{c:<w$}"))
        .collect();
    writeln!(f, "{}", padded.join("  ").trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ModelContext, PredictionStatus};

    #[test]
    fn read_labelled_from_reader_example() {
        let data = "name,smiles,logBB\nethanol, CCO ,-0.16\nbenzene,c1ccccc1,0.37\n";
        let (smiles, y) = read_labelled_smiles_from_reader(data.as_bytes(), "smiles", "logBB")
            .expect("read CSV");
        assert_eq!(smiles, vec!["CCO", "c1ccccc1"]);
        assert_eq!(y.len(), 2);
        assert!((y[0] + 0.16).abs() < 1e-12);
    }

    #[test]
    fn missing_column_and_bad_target_are_errors() {
        let data = "smiles,logBB\nCCO,abc\n";
        assert!(read_labelled_smiles_from_reader(data.as_bytes(), "smiles", "p_np").is_err());
        assert!(read_labelled_smiles_from_reader(data.as_bytes(), "smiles", "logBB").is_err());
    }

    #[test]
    fn smiles_column_only() {
        let data = "smiles,label\nCCO,1\nCCN,0\n";
        let smiles = read_smiles_column_from_reader(data.as_bytes(), "smiles").unwrap();
        assert_eq!(smiles, vec!["CCO", "CCN"]);
    }

    #[test]
    fn rounding() {
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(-0.000_04), -0.0);
        assert_eq!(format!("{:.4}", round4(0.5)), "0.5000");
    }

    fn ok_row() -> PredictionResult {
        let mut r = ModelContext::from_parts(None, None, None).predict_one("CCO");
        r.status = PredictionStatus::Ok;
        r.message = None;
        r.probability = Some(0.912_345);
        r.logbb = Some(-0.25);
        r.verdict = Some(crate::decision::Verdict::Yes);
        r
    }

    #[test]
    fn error_rows_use_placeholders() {
        let rows = ModelContext::from_parts(None, None, None).predict_batch(&["CCO"]);
        let table = ResultTable::new(&rows);
        let row = &table.rows()[0];
        assert_eq!(row.status, "ModelsUnavailable");
        assert_eq!(row.probability, PLACEHOLDER);
        assert_eq!(row.logbb, PLACEHOLDER);
        assert_eq!(row.verdict, PLACEHOLDER);
        assert_eq!(row.canonical, PLACEHOLDER);
    }

    #[test]
    fn ok_rows_are_rounded() {
        let table = ResultTable::new(&[ok_row()]);
        let row = &table.rows()[0];
        assert_eq!(row.probability, "0.9123");
        assert_eq!(row.logbb, "-0.2500");
        assert_eq!(row.verdict, "Yes");
    }

    #[test]
    fn csv_and_text_output() {
        let table = ResultTable::new(&[ok_row()]);
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "input,canonical,status,probability,logbb,verdict\nCCO,-,OK,0.9123,-0.2500,Yes\n"
        );

        let rendered = table.to_string();
        let mut lines = rendered.lines();
        assert!(lines.next().unwrap().starts_with("input  canonical  status"));
        assert!(lines.next().unwrap().starts_with("-----"));
        assert!(lines.next().unwrap().contains("0.9123"));
    }

    #[test]
    fn empty_table_still_has_a_header() {
        let mut buf = Vec::new();
        ResultTable::default().write_csv(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "input,canonical,status,probability,logbb,verdict\n"
        );
    }
}
