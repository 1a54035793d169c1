//! Interquartile-range outlier detection.
//!
//! Bounds are computed once per feature column and shared by both handling
//! modes: masking outliers to `NaN` (drop) or highlighting them in an HTML
//! table for manual review (investigate). Metadata columns and the target
//! label are never flagged.
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::config::OutlierMode;
use crate::data_handling::Frame;
use crate::error::Result;
use crate::io::write_frame;
use crate::report::tables::highlighted_table;
use crate::report::write_html;
use crate::stats::nan_percentile;

/// Distance of the fences from the quartiles, in interquartile ranges.
pub const WHISKER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    pub fn from_quartiles(q1: f64, q3: f64) -> Self {
        let iqr = q3 - q1;
        IqrBounds {
            q1,
            q3,
            lower: q1 - WHISKER * iqr,
            upper: q3 + WHISKER * iqr,
        }
    }

    /// `NaN` is never an outlier.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// IQR bounds for every column that is not metadata or the target.
pub fn iqr_bounds(frame: &Frame, target_label: &str, metadata: &[String]) -> Result<Vec<(String, IqrBounds)>> {
    frame
        .feature_names(target_label, metadata)
        .into_iter()
        .map(|name| {
            let col = frame.column(&name)?;
            let bounds = IqrBounds::from_quartiles(nan_percentile(col, 25.0), nan_percentile(col, 75.0));
            Ok((name, bounds))
        })
        .collect()
}

/// Cell-level outlier mask with the same shape as the frame.
pub fn outlier_mask(frame: &Frame, bounds: &[(String, IqrBounds)]) -> Array2<bool> {
    let mut mask = Array2::from_elem(frame.data().dim(), false);
    for (name, b) in bounds {
        let Some(j) = frame.column_index(name) else {
            continue;
        };
        for (i, v) in frame.data().column(j).iter().enumerate() {
            mask[(i, j)] = b.is_outlier(*v);
        }
    }
    mask
}

/// Result of an outlier pass.
#[derive(Debug, Clone)]
pub struct OutlierReport {
    /// The frame to continue with: masked in drop mode, unchanged otherwise.
    pub frame: Frame,
    pub bounds: Vec<(String, IqrBounds)>,
    /// Number of flagged cells per feature, in column order.
    pub counts: Vec<(String, usize)>,
    pub artifact: Option<PathBuf>,
}

impl OutlierReport {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

/// IQR outlier pass over the feature columns of a frame.
#[derive(Debug, Clone)]
pub struct OutlierDetector {
    pub target_label: String,
    pub metadata: Vec<String>,
    pub subject_column: Option<String>,
}

impl OutlierDetector {
    pub fn new(target_label: &str, metadata: &[String]) -> Self {
        OutlierDetector {
            target_label: target_label.to_string(),
            metadata: metadata.to_vec(),
            subject_column: None,
        }
    }

    pub fn with_subject_column(mut self, column: Option<String>) -> Self {
        self.subject_column = column;
        self
    }

    /// Apply `mode`, writing its artifact into `out_dir`.
    pub fn run(&self, frame: &Frame, mode: OutlierMode, out_dir: &Path) -> Result<OutlierReport> {
        let bounds = iqr_bounds(frame, &self.target_label, &self.metadata)?;
        let mask = outlier_mask(frame, &bounds);
        let counts: Vec<(String, usize)> = bounds
            .iter()
            .filter_map(|(name, _)| frame.column_index(name).map(|j| (name.clone(), j)))
            .map(|(name, j)| (name, mask.column(j).iter().filter(|f| **f).count()))
            .collect();
        for (name, n) in counts.iter().filter(|(_, n)| *n > 0) {
            log::debug!("{}: {} values outside the IQR fences", name, n);
        }

        let (out, artifact) = match mode {
            OutlierMode::Off => (frame.clone(), None),
            OutlierMode::Drop => {
                let masked = mask_outliers(frame, &mask)?;
                let path = out_dir.join("outliers_removed.csv");
                write_frame(&masked, &path)?;
                (masked, Some(path))
            }
            OutlierMode::Investigate => {
                let path = out_dir.join("investigate_outliers.html");
                self.write_investigation(frame, &mask, &path)?;
                (frame.clone(), Some(path))
            }
        };

        let report = OutlierReport {
            frame: out,
            bounds,
            counts,
            artifact,
        };
        log::info!("Flagged {} outlier values ({:?} mode)", report.total(), mode);
        Ok(report)
    }

    fn write_investigation(&self, frame: &Frame, mask: &Array2<bool>, path: &Path) -> Result<()> {
        let (frame, mask) = match self.subject_column.as_deref().filter(|c| frame.has_column(c)) {
            Some(subject) => {
                let order = frame.sorted_row_order(subject)?;
                (frame.select_rows(&order), mask.select(ndarray::Axis(0), &order))
            }
            None => (frame.clone(), mask.clone()),
        };
        let html = highlighted_table(&frame, &mask, "Outliers outside 1.5 × IQR")?;
        write_html(&html, path)
    }
}

/// Copy of `frame` with every flagged cell set to `NaN`. Rows are kept.
pub fn mask_outliers(frame: &Frame, mask: &Array2<bool>) -> Result<Frame> {
    let mut data = frame.data().clone();
    ndarray::Zip::from(&mut data).and(mask).for_each(|v, flagged| {
        if *flagged {
            *v = f64::NAN;
        }
    });
    Frame::new(frame.columns().to_vec(), data)
}
