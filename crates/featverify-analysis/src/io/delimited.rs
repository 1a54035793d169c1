//! CSV/TSV reader and writer for `Frame`.
use std::path::Path;

use csv::StringRecord;
use ndarray::Array2;

use crate::data_handling::Frame;
use crate::error::{AnalysisError, Result};

/// Configuration for reading delimited tables.
#[derive(Debug, Clone)]
pub struct TableReaderConfig {
    /// Field delimiter. `None` picks tab for `.tsv` files and comma otherwise.
    pub delimiter: Option<u8>,
    /// Cell values (case-insensitive) treated as missing.
    pub missing_values: Vec<String>,
    /// Columns to skip entirely (e.g. free-text notes).
    pub ignore_columns: Vec<String>,
}

impl Default for TableReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            missing_values: vec![
                "".to_string(),
                "na".to_string(),
                "nan".to_string(),
                "null".to_string(),
                "none".to_string(),
            ],
            ignore_columns: Vec::new(),
        }
    }
}

fn delimiter_for(path: &Path, config: &TableReaderConfig) -> u8 {
    config.delimiter.unwrap_or_else(|| {
        let is_tsv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("tsv"))
            .unwrap_or(false);
        if is_tsv {
            b'\t'
        } else {
            b','
        }
    })
}

/// Read a CSV/TSV file into a frame using the default configuration.
pub fn read_frame<P: AsRef<Path>>(path: P) -> Result<Frame> {
    read_frame_with_config(path, &TableReaderConfig::default())
}

/// Read a CSV/TSV file into a frame. Every kept column must be numeric;
/// cells matching `missing_values` become `NaN`.
pub fn read_frame_with_config<P: AsRef<Path>>(path: P, config: &TableReaderConfig) -> Result<Frame> {
    let path = path.as_ref();
    let csv_err = |source| AnalysisError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path, config))
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers: StringRecord = reader.headers().map_err(csv_err)?.clone();
    let kept: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !config.ignore_columns.iter().any(|c| c == h.trim()))
        .map(|(i, _)| i)
        .collect();
    if kept.is_empty() {
        return Err(AnalysisError::InvalidData(format!(
            "no columns found in {}",
            path.display()
        )));
    }

    let mut values = Vec::new();
    let mut nrows = 0;
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;
        for &idx in &kept {
            let raw = record.get(idx).unwrap_or("").trim();
            let value = if config
                .missing_values
                .iter()
                .any(|m| m.eq_ignore_ascii_case(raw))
            {
                f64::NAN
            } else {
                raw.parse::<f64>().map_err(|_| {
                    AnalysisError::InvalidData(format!(
                        "non-numeric value '{}' in column '{}' at row {}",
                        raw,
                        headers.get(idx).unwrap_or(""),
                        row_idx + 1
                    ))
                })?
            };
            values.push(value);
        }
        nrows += 1;
    }

    let columns = kept
        .iter()
        .map(|&i| headers.get(i).unwrap_or("").trim().to_string())
        .collect();
    let data = Array2::from_shape_vec((nrows, kept.len()), values)
        .map_err(|e| AnalysisError::Shape(e.to_string()))?;
    let frame = Frame::new(columns, data)?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        frame.nrows(),
        frame.ncols(),
        path.display()
    );
    Ok(frame)
}

/// Write a frame as CSV (or TSV for a `.tsv` path). `NaN` is written as an empty cell.
pub fn write_frame<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<()> {
    let path = path.as_ref();
    let csv_err = |source| AnalysisError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter_for(path, &TableReaderConfig::default()))
        .from_path(path)
        .map_err(csv_err)?;

    writer.write_record(frame.columns()).map_err(csv_err)?;
    for row in frame.data().rows() {
        let record: Vec<String> = row
            .iter()
            .map(|v| if v.is_nan() { String::new() } else { v.to_string() })
            .collect();
        writer.write_record(&record).map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|e| AnalysisError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_frame_parses_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "subject,a,b,y").unwrap();
        writeln!(f, "1,0.5,NA,1").unwrap();
        writeln!(f, "2,1.5,2.0,0").unwrap();
        drop(f);

        let frame = read_frame(&path).unwrap();
        assert_eq!(frame.nrows(), 2);
        assert_eq!(frame.columns(), &["subject", "a", "b", "y"]);
        assert!(frame.column("b").unwrap()[0].is_nan());
        assert_eq!(frame.column("a").unwrap()[1], 1.5);
    }

    #[test]
    fn test_read_frame_rejects_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        std::fs::write(&path, "a\tb\n1\tfoo\n").unwrap();
        let err = read_frame(&path).unwrap_err();
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn test_write_then_read_keeps_nan_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let frame = Frame::from_columns(vec![("a", vec![1.0, f64::NAN]), ("b", vec![2.0, 3.0])]).unwrap();
        write_frame(&frame, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("a,b\n1,2\n,3"));
        let back = read_frame(&path).unwrap();
        assert!(back.column("a").unwrap()[1].is_nan());
    }
}
