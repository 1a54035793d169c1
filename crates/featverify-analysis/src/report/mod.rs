//! Persisting plots and tables.
//!
//! Plots are written as self-contained plotly HTML documents; tables are
//! CSV or highlighted HTML.
pub mod plots;
pub mod tables;

use std::path::Path;

use plotly::Plot;

use crate::error::{AnalysisError, Result};

/// Create `dir` and its parents if missing.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| AnalysisError::io(dir, e))
}

pub fn write_plot<P: AsRef<Path>>(plot: &Plot, path: P) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, plot.to_html()).map_err(|e| AnalysisError::io(path, e))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

pub fn write_html<P: AsRef<Path>>(html: &str, path: P) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, html).map_err(|e| AnalysisError::io(path, e))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// File-name friendly version of a label (`"3-item score"` -> `"3-item_score"`).
pub fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("3-item score"), "3-item_score");
        assert_eq!(file_stem("lv/ef (%)"), "lv_ef____");
    }
}
