//! Benchmark Definitions and Suites

use crate::{BenchError, ParameterAxis, ParameterCombination, ParameterSpace, Runnable, Workload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use steadybench_stats::TimeUnit;

/// Measurement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Average time per operation
    #[default]
    #[serde(rename = "avgt")]
    AverageTime,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::AverageTime => f.write_str("avgt"),
        }
    }
}

/// Named workload with its parameter axes, mode and output unit
#[derive(Clone)]
pub struct BenchmarkDefinition {
    name: String,
    space: ParameterSpace,
    mode: Mode,
    unit: TimeUnit,
    runnable: Arc<dyn Runnable>,
}

impl BenchmarkDefinition {
    /// Define a benchmark with no axes, reported in nanoseconds
    pub fn new(name: impl Into<String>, workload: impl Workload) -> Self {
        Self {
            name: name.into(),
            space: ParameterSpace::new(),
            mode: Mode::AverageTime,
            unit: TimeUnit::Nanoseconds,
            runnable: Arc::new(workload),
        }
    }

    /// Declare the next axis
    pub fn param<I, V>(mut self, axis: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.space.push(ParameterAxis::new(axis, values));
        self
    }

    /// Output time unit
    pub fn unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Same definition with the values of `axis` replaced
    pub fn with_axis_values(mut self, axis: &str, values: Vec<String>) -> Result<Self, BenchError> {
        self.space.override_values(axis, values)?;
        Ok(self)
    }

    /// Definition name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared axes
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Measurement mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Declared output unit
    pub fn time_unit(&self) -> TimeUnit {
        self.unit
    }

    /// Erased workload
    pub fn runnable(&self) -> &dyn Runnable {
        &*self.runnable
    }

    /// Cartesian product of the axes in enumeration order
    pub fn combinations(&self) -> Vec<ParameterCombination> {
        self.space.combinations()
    }

    /// Validate name and axes
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.name.trim().is_empty() {
            return Err(BenchError::InvalidParameterCombination(
                "benchmark name must not be empty".to_string(),
            ));
        }
        self.space.validate().map_err(|e| match e {
            BenchError::InvalidParameterCombination(msg) => {
                BenchError::InvalidParameterCombination(format!("{}: {msg}", self.name))
            }
            other => other,
        })
    }
}

impl fmt::Debug for BenchmarkDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkDefinition")
            .field("name", &self.name)
            .field("space", &self.space)
            .field("mode", &self.mode)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of definitions
#[derive(Debug, Clone, Default)]
pub struct Suite {
    definitions: Vec<BenchmarkDefinition>,
}

impl Suite {
    /// Empty suite
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition (builder style)
    pub fn with(mut self, definition: BenchmarkDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Append a definition
    pub fn add(&mut self, definition: BenchmarkDefinition) {
        self.definitions.push(definition);
    }

    /// Append every definition of another suite
    pub fn extend(&mut self, other: Suite) {
        self.definitions.extend(other.definitions);
    }

    /// Definitions in declaration order
    pub fn definitions(&self) -> &[BenchmarkDefinition] {
        &self.definitions
    }

    /// Look a definition up by name
    pub fn find(&self, name: &str) -> Option<&BenchmarkDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when no definitions were added
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Validate every definition and reject duplicate names
    pub fn validate(&self) -> Result<(), BenchError> {
        for (i, def) in self.definitions.iter().enumerate() {
            def.validate()?;
            if self.definitions[..i].iter().any(|d| d.name == def.name) {
                return Err(BenchError::InvalidParameterCombination(format!(
                    "duplicate benchmark name `{}`",
                    def.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WorkloadError, workload};

    fn noop() -> impl Workload {
        workload(|_: &ParameterCombination| Ok::<_, WorkloadError>(()), |_: &mut ()| ())
    }

    #[test]
    fn test_builder() {
        let def = BenchmarkDefinition::new("put", noop())
            .param("numEntries", ["30"])
            .param("numPuts", ["100", "10000"])
            .unit(TimeUnit::Microseconds);
        assert_eq!(def.name(), "put");
        assert_eq!(def.space().axes().len(), 2);
        assert_eq!(def.combinations().len(), 2);
        assert_eq!(def.time_unit(), TimeUnit::Microseconds);
        assert_eq!(def.mode().to_string(), "avgt");
    }

    #[test]
    fn test_suite_rejects_duplicate_names() {
        let suite = Suite::new()
            .with(BenchmarkDefinition::new("a", noop()))
            .with(BenchmarkDefinition::new("a", noop()));
        assert!(suite.validate().is_err());
    }

    #[test]
    fn test_suite_find() {
        let suite = Suite::new()
            .with(BenchmarkDefinition::new("a", noop()))
            .with(BenchmarkDefinition::new("b", noop()));
        assert!(suite.validate().is_ok());
        assert_eq!(suite.find("b").map(|d| d.name()), Some("b"));
        assert!(suite.find("c").is_none());
    }

    #[test]
    fn test_invalid_axis_names_definition() {
        let def = BenchmarkDefinition::new("put", noop()).param("n", Vec::<String>::new());
        match def.validate() {
            Err(BenchError::InvalidParameterCombination(msg)) => assert!(msg.starts_with("put:")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_axis_override() {
        let def = BenchmarkDefinition::new("put", noop())
            .param("n", ["1", "2", "3"])
            .with_axis_values("n", vec!["7".to_string()])
            .unwrap();
        assert_eq!(def.combinations().len(), 1);
        assert_eq!(def.combinations()[0].get("n"), Some("7"));
    }
}
