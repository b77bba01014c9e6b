//! The set of values a single site may take.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::InvalidInput;

/// Sorted, non-empty set of allowed per-site values.
///
/// Proposal generation maps a contiguous random index onto "any value but
/// the current one", which only works on an ascending sequence without
/// repeats. The constructor sorts and deduplicates whatever it receives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct LocalStates {
    values: Vec<f64>,
}

impl LocalStates {
    pub fn new(mut values: Vec<f64>) -> Result<Self, InvalidInput> {
        if values.is_empty() {
            return Err(InvalidInput("invalid local states: []".to_string()));
        }
        if values.iter().any(|v| v.is_nan()) {
            return Err(InvalidInput(format!(
                "invalid local states: {values:?}; NaN is not orderable"
            )));
        }
        values.sort_by(f64::total_cmp);
        values.dedup();
        Ok(Self { values })
    }

    /// Spin one-half in the `±1` convention.
    pub fn spin_half() -> Self {
        Self { values: vec![-1.0, 1.0] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn get(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    /// Index of `value` in the sorted set, if present.
    pub fn position(&self, value: f64) -> Option<usize> {
        self.values
            .binary_search_by(|probe| probe.partial_cmp(&value).unwrap_or(Ordering::Less))
            .ok()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.position(value).is_some()
    }
}

impl TryFrom<Vec<f64>> for LocalStates {
    type Error = InvalidInput;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<LocalStates> for Vec<f64> {
    fn from(states: LocalStates) -> Self {
        states.values
    }
}
