//! Parameter Axes
//!
//! A definition declares ordered axes, each with ordered literal values. The
//! run driver enumerates their Cartesian product with the first axis varying
//! slowest, so the order of combinations is fully determined by the
//! declaration.

use crate::{BenchError, WorkloadError};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use steadybench_ipc::Assignment;

/// One named axis and its ordered values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterAxis {
    name: String,
    values: Vec<String>,
}

impl ParameterAxis {
    /// Create an axis
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Axis name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values in declaration order
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Ordered set of axes belonging to one definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSpace {
    axes: Vec<ParameterAxis>,
}

impl ParameterSpace {
    /// Space with no axes (a single, empty combination)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an axis
    pub fn push(&mut self, axis: ParameterAxis) {
        self.axes.push(axis);
    }

    /// Axes in declaration order
    pub fn axes(&self) -> &[ParameterAxis] {
        &self.axes
    }

    /// Reject empty axes, blank or duplicate axis names, and duplicate values.
    pub fn validate(&self) -> Result<(), BenchError> {
        for (i, axis) in self.axes.iter().enumerate() {
            if axis.name.trim().is_empty() {
                return Err(BenchError::InvalidParameterCombination(
                    "axis name must not be empty".to_string(),
                ));
            }
            if self.axes[..i].iter().any(|a| a.name == axis.name) {
                return Err(BenchError::InvalidParameterCombination(format!(
                    "duplicate axis `{}`",
                    axis.name
                )));
            }
            if axis.values.is_empty() {
                return Err(BenchError::InvalidParameterCombination(format!(
                    "axis `{}` has no values",
                    axis.name
                )));
            }
            for (j, value) in axis.values.iter().enumerate() {
                if axis.values[..j].contains(value) {
                    return Err(BenchError::InvalidParameterCombination(format!(
                        "axis `{}` lists value `{value}` twice",
                        axis.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of combinations (1 when there are no axes)
    pub fn combination_count(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }

    /// Cartesian product of all axes; the last axis varies fastest.
    pub fn combinations(&self) -> Vec<ParameterCombination> {
        let total = self.combination_count();
        let mut out = Vec::with_capacity(total);
        if total == 0 {
            return out;
        }

        let mut cursor = vec![0usize; self.axes.len()];
        loop {
            out.push(ParameterCombination {
                assignments: self
                    .axes
                    .iter()
                    .zip(&cursor)
                    .map(|(axis, &i)| (axis.name.clone(), axis.values[i].clone()))
                    .collect(),
            });

            // Odometer increment from the rightmost axis
            let mut pos = self.axes.len();
            loop {
                if pos == 0 {
                    return out;
                }
                pos -= 1;
                cursor[pos] += 1;
                if cursor[pos] < self.axes[pos].values.len() {
                    break;
                }
                cursor[pos] = 0;
            }
        }
    }

    /// Check that `combination` assigns exactly one value to every axis, in
    /// declaration order. Values themselves are free-form literals.
    pub fn check(&self, combination: &ParameterCombination) -> Result<(), BenchError> {
        if combination.len() != self.axes.len() {
            return Err(BenchError::InvalidParameterCombination(format!(
                "expected {} assignments, got {} ({combination})",
                self.axes.len(),
                combination.len()
            )));
        }
        for (axis, (name, _)) in self.axes.iter().zip(combination.iter()) {
            if axis.name != name {
                return Err(BenchError::InvalidParameterCombination(format!(
                    "expected axis `{}`, found `{name}`",
                    axis.name
                )));
            }
        }
        Ok(())
    }

    /// Replace the values of an existing axis
    pub fn override_values(&mut self, axis: &str, values: Vec<String>) -> Result<(), BenchError> {
        match self.axes.iter_mut().find(|a| a.name == axis) {
            Some(found) => {
                found.values = values;
                Ok(())
            }
            None => Err(BenchError::InvalidParameterCombination(format!(
                "unknown axis `{axis}`"
            ))),
        }
    }
}

/// One concrete value per axis, in axis order.
///
/// Serializes as a map from axis name to value, keeping declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParameterCombination {
    assignments: Vec<(String, String)>,
}

impl ParameterCombination {
    /// Build from `(axis, value)` pairs
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            assignments: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Literal value of `axis`
    pub fn get(&self, axis: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| value.as_str())
    }

    /// Parse the value of `axis`
    pub fn parse<T>(&self, axis: &str) -> Result<T, WorkloadError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let value = self
            .get(axis)
            .ok_or_else(|| WorkloadError::MissingParameter(axis.to_string()))?;
        value.parse().map_err(|e: T::Err| WorkloadError::InvalidParameter {
            axis: axis.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
    }

    /// `(axis, value)` pairs in axis order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.assignments.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of assignments
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// True for the combination of a definition without axes
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Wire form for the worker protocol
    pub fn to_assignments(&self) -> Vec<Assignment> {
        self.assignments
            .iter()
            .map(|(axis, value)| Assignment {
                axis: axis.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

impl From<Vec<Assignment>> for ParameterCombination {
    fn from(assignments: Vec<Assignment>) -> Self {
        Self {
            assignments: assignments.into_iter().map(|a| (a.axis, a.value)).collect(),
        }
    }
}

impl Serialize for ParameterCombination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.assignments.len()))?;
        for (axis, value) in &self.assignments {
            map.serialize_entry(axis, value)?;
        }
        map.end()
    }
}

struct CombinationVisitor;

impl<'de> Visitor<'de> for CombinationVisitor {
    type Value = ParameterCombination;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from axis name to value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut assignments = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((axis, value)) = access.next_entry::<String, String>()? {
            assignments.push((axis, value));
        }
        Ok(ParameterCombination { assignments })
    }
}

impl<'de> Deserialize<'de> for ParameterCombination {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CombinationVisitor)
    }
}

impl fmt::Display for ParameterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (axis, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{axis}={value}")?;
        }
        f.write_str("}")
    }
}
