//! Data structures and helpers for holding and slicing tabular datasets.
//!
//! A `Frame` is a set of named `f64` columns stored row-major in an
//! `ndarray::Array2`. Missing values are `NaN`. Every analysis pass takes a
//! frame plus the names of the target label and metadata columns, and
//! returns a new frame rather than mutating shared state.
use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    data: Array2<f64>,
}

impl Frame {
    pub fn new(columns: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if columns.len() != data.ncols() {
            return Err(AnalysisError::Shape(format!(
                "{} column names for {} data columns",
                columns.len(),
                data.ncols()
            )));
        }
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(AnalysisError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Frame { columns, data })
    }

    /// Build a frame from `(name, values)` pairs. All columns must share a length.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self> {
        let nrows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let ncols = columns.len();
        let mut names = Vec::with_capacity(ncols);
        let mut data = Array2::<f64>::zeros((nrows, ncols));
        for (c, (name, values)) in columns.into_iter().enumerate() {
            let name = name.into();
            if values.len() != nrows {
                return Err(AnalysisError::Shape(format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    values.len(),
                    nrows
                )));
            }
            data.column_mut(c).assign(&Array1::from_vec(values));
            names.push(name);
        }
        Frame::new(names, data)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))?;
        Ok(self.data.column(idx))
    }

    /// Keep only the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Frame> {
        let indices = names
            .iter()
            .map(|n| {
                self.column_index(n.as_ref())
                    .ok_or_else(|| AnalysisError::MissingColumn(n.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let data = self.data.select(Axis(1), &indices);
        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        Frame::new(columns, data)
    }

    /// Remove the named columns. Names that are absent are ignored.
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Frame {
        let to_drop: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        let keep: Vec<usize> = (0..self.ncols())
            .filter(|&i| !to_drop.contains(self.columns[i].as_str()))
            .collect();
        Frame {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            data: self.data.select(Axis(1), &keep),
        }
    }

    pub fn select_rows(&self, indices: &[usize]) -> Frame {
        Frame {
            columns: self.columns.clone(),
            data: self.data.select(Axis(0), indices),
        }
    }

    /// Names of the columns that are neither metadata nor the target label.
    pub fn feature_names(&self, target_label: &str, metadata: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.as_str() != target_label && !metadata.contains(c))
            .cloned()
            .collect()
    }

    /// Overwrite a column in place.
    pub fn set_column(&mut self, name: &str, values: &Array1<f64>) -> Result<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))?;
        if values.len() != self.nrows() {
            return Err(AnalysisError::Shape(format!(
                "column '{}' has {} rows, got {} values",
                name,
                self.nrows(),
                values.len()
            )));
        }
        self.data.column_mut(idx).assign(values);
        Ok(())
    }

    /// Row indices ordering a column ascending, NaN last.
    pub fn sorted_row_order(&self, name: &str) -> Result<Vec<usize>> {
        let col = self.column(name)?;
        let mut order: Vec<usize> = (0..self.nrows()).collect();
        order.sort_by(|&a, &b| {
            let (va, vb) = (col[a], col[b]);
            match (va.is_nan(), vb.is_nan()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) => va.total_cmp(&vb),
            }
        });
        Ok(order)
    }

    /// Reorder rows by the values of a column (ascending, NaN last).
    pub fn sort_by_column(&self, name: &str) -> Result<Frame> {
        let order = self.sorted_row_order(name)?;
        Ok(self.select_rows(&order))
    }
}

/// Features and labels of one split, ready to hand to an estimator.
#[derive(Debug, Clone)]
pub struct XyData {
    pub feature_names: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl XyData {
    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn select_rows(&self, indices: &[usize]) -> XyData {
        XyData {
            feature_names: self.feature_names.clone(),
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        }
    }
}

/// Split a frame into the feature matrix for `features` and the target vector.
///
/// The target label never ends up on the feature side: if it is listed in
/// `features` it is removed and a warning is logged, since that indicates a
/// leak in the configured feature list.
pub fn split_xy<S: AsRef<str>>(frame: &Frame, features: &[S], target_label: &str) -> Result<XyData> {
    let mut feature_names: Vec<String> = features.iter().map(|f| f.as_ref().to_string()).collect();
    if feature_names.iter().any(|f| f == target_label) {
        log::warn!(
            "{} was found in the top features for validation, dropping it from the feature matrix",
            target_label
        );
        feature_names.retain(|f| f != target_label);
    }
    if feature_names.is_empty() {
        return Err(AnalysisError::InvalidData(
            "no feature columns left after removing the target label".to_string(),
        ));
    }
    let x = frame.select(&feature_names)?.data;
    let y = frame.column(target_label)?.to_owned();
    Ok(XyData { feature_names, x, y })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::from_columns(vec![
            ("a", vec![1.0, 2.0, 3.0]),
            ("b", vec![4.0, 5.0, 6.0]),
            ("y", vec![0.0, 1.0, 0.0]),
            ("subject", vec![3.0, 1.0, 2.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_select_and_drop() {
        let f = frame();
        let sel = f.select(&["b", "a"]).unwrap();
        assert_eq!(sel.columns(), &["b".to_string(), "a".to_string()]);
        assert_eq!(sel.data()[(0, 0)], 4.0);

        let dropped = f.drop_columns(&["b", "missing"]);
        assert_eq!(dropped.columns().len(), 3);
        assert!(!dropped.has_column("b"));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let res = Frame::from_columns(vec![("a", vec![1.0]), ("a", vec![2.0])]);
        assert!(matches!(res, Err(AnalysisError::DuplicateColumn(_))));
    }

    #[test]
    fn test_split_xy_drops_leaked_target() {
        let f = frame();
        let xy = split_xy(&f, &["a", "y"], "y").unwrap();
        assert_eq!(xy.feature_names, vec!["a".to_string()]);
        assert_eq!(xy.x.ncols(), 1);
        assert_eq!(xy.y.to_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_feature_names_excludes_target_and_metadata() {
        let f = frame();
        let names = f.feature_names("y", &["subject".to_string()]);
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_sort_by_column() {
        let f = frame().sort_by_column("subject").unwrap();
        assert_eq!(f.column("subject").unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(f.column("a").unwrap().to_vec(), vec![2.0, 3.0, 1.0]);
    }
}
