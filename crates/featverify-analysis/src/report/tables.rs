use std::path::Path;

use chrono::Local;
use maud::{html, PreEscaped, DOCTYPE};
use ndarray::Array2;

use crate::data_handling::Frame;
use crate::error::{AnalysisError, Result};

const TABLE_CSS: &str = r#"
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; font-size: 0.85em; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: right; }
th { background: #f0f0f0; position: sticky; top: 0; }
td.flagged { background: #e74c3c; color: white; }
"#;

fn format_cell(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{}", v)
    }
}

/// Render a frame as an HTML table, highlighting the cells set in `flags`.
pub fn highlighted_table(frame: &Frame, flags: &Array2<bool>, title: &str) -> Result<String> {
    if flags.dim() != frame.data().dim() {
        return Err(AnalysisError::Shape(format!(
            "{:?} highlight mask for a {:?} table",
            flags.dim(),
            frame.data().dim()
        )));
    }
    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (title) }
                style { (PreEscaped(TABLE_CSS)) }
            }
            body {
                h1 { (title) }
                p class="generated" { "Generated " (Local::now().format("%Y-%m-%d %H:%M:%S").to_string()) }
                table {
                    thead {
                        tr {
                            @for column in frame.columns() {
                                th { (column) }
                            }
                        }
                    }
                    tbody {
                        @for (i, row) in frame.data().rows().into_iter().enumerate() {
                            tr {
                                @for (j, value) in row.iter().enumerate() {
                                    @if flags[(i, j)] {
                                        td class="flagged" { (format_cell(*value)) }
                                    } @else {
                                        td { (format_cell(*value)) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };
    Ok(markup.into_string())
}

/// Write string records as CSV under a header row.
pub fn write_records<P: AsRef<Path>>(path: P, header: &[&str], records: &[Vec<String>]) -> Result<()> {
    let path = path.as_ref();
    let csv_err = |source| AnalysisError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(header).map_err(csv_err)?;
    for record in records {
        writer.write_record(record).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| AnalysisError::io(path, e))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flagged_cells_get_class() {
        let frame = Frame::from_columns(vec![("a", vec![1.0, 50.0]), ("b", vec![f64::NAN, 2.0])]).unwrap();
        let mut flags = Array2::from_elem((2, 2), false);
        flags[(1, 0)] = true;
        let html = highlighted_table(&frame, &flags, "Outliers").unwrap();
        assert_eq!(html.matches("class=\"flagged\"").count(), 1);
        assert!(html.contains("<td class=\"flagged\">50</td>"));
        assert!(html.contains("<th>b</th>"));
    }

    #[test]
    fn test_mask_shape_checked() {
        let frame = Frame::from_columns(vec![("a", vec![1.0])]).unwrap();
        let flags = Array2::from_elem((2, 1), false);
        assert!(highlighted_table(&frame, &flags, "x").is_err());
    }
}
