use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{AnalysisError, Result};

/// A single hyperparameter value as written in the configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// One concrete hyperparameter assignment.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Candidate values per hyperparameter.
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Render a parameter set as `key=value, key=value` for logs and tables.
pub fn describe(params: &ParamSet) -> String {
    if params.is_empty() {
        return "defaults".to_string();
    }
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Typed access to a parameter set, rejecting names the model does not know.
pub(crate) struct ParamReader<'a> {
    model: &'a str,
    params: &'a ParamSet,
}

impl<'a> ParamReader<'a> {
    pub(crate) fn new(model: &'a str, params: &'a ParamSet, known: &[&str]) -> Result<Self> {
        if let Some(unknown) = params.keys().find(|k| !known.contains(&k.as_str())) {
            return Err(AnalysisError::Config(format!(
                "unknown parameter '{}' for {} (expected one of: {})",
                unknown,
                model,
                known.join(", ")
            )));
        }
        Ok(Self { model, params })
    }

    fn invalid(&self, key: &str, expected: &str, got: &ParamValue) -> AnalysisError {
        AnalysisError::Config(format!(
            "parameter '{}' of {} must be {}, got {}",
            key, self.model, expected, got
        ))
    }

    pub(crate) fn f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.params.get(key) {
            None => Ok(default),
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(self.invalid(key, "a number", other)),
        }
    }

    pub(crate) fn positive_f64(&self, key: &str, default: f64) -> Result<f64> {
        let v = self.f64(key, default)?;
        if v <= 0.0 {
            return Err(self.invalid(key, "positive", &ParamValue::Float(v)));
        }
        Ok(v)
    }

    pub(crate) fn usize(&self, key: &str, default: usize) -> Result<usize> {
        match self.params.get(key) {
            None => Ok(default),
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(*v as usize),
            Some(other) => Err(self.invalid(key, "a non-negative integer", other)),
        }
    }

    pub(crate) fn bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.params.get(key) {
            None => Ok(default),
            Some(ParamValue::Bool(v)) => Ok(*v),
            Some(other) => Err(self.invalid(key, "true or false", other)),
        }
    }

    pub(crate) fn str(&self, key: &str, default: &'a str) -> Result<&'a str> {
        match self.params.get(key) {
            None => Ok(default),
            Some(ParamValue::Str(v)) => Ok(v.as_str()),
            Some(other) => Err(self.invalid(key, "a string", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_values_from_json() {
        let grid: ParamGrid =
            serde_json::from_str(r#"{"max_depth": [3, 6], "learning_rate": [0.1], "kernel": ["linear"], "debug": [false]}"#)
                .unwrap();
        assert_eq!(grid["max_depth"], vec![ParamValue::Int(3), ParamValue::Int(6)]);
        assert_eq!(grid["learning_rate"], vec![ParamValue::Float(0.1)]);
        assert_eq!(grid["kernel"], vec![ParamValue::Str("linear".to_string())]);
        assert_eq!(grid["debug"], vec![ParamValue::Bool(false)]);
    }

    #[test]
    fn test_reader_rejects_unknown_and_mistyped() {
        let params = ParamSet::from([("depth".to_string(), ParamValue::Int(3))]);
        assert!(ParamReader::new("gbdt", &params, &["max_depth"]).is_err());

        let params = ParamSet::from([("max_depth".to_string(), ParamValue::Str("deep".into()))]);
        let reader = ParamReader::new("gbdt", &params, &["max_depth"]).unwrap();
        assert!(reader.usize("max_depth", 6).is_err());
    }

    #[test]
    fn test_reader_defaults_and_int_as_float() {
        let params = ParamSet::from([("c".to_string(), ParamValue::Int(2))]);
        let reader = ParamReader::new("svm", &params, &["c", "eps"]).unwrap();
        assert_eq!(reader.f64("c", 1.0).unwrap(), 2.0);
        assert_eq!(reader.f64("eps", 0.1).unwrap(), 0.1);
        assert_eq!(describe(&params), "c=2");
    }
}
