//! Benchmark Planner
//!
//! Builds the execution plan: selects definitions whose name matches the
//! filter, applies `-p axis=v1,v2` overrides, validates every selected
//! definition and expands each into its combinations.
//!
//! Ordering: definitions keep their declaration order and combinations keep
//! enumeration order, so the plan is identical across runs.

use std::fmt;
use std::str::FromStr;
use steadybench_core::{BenchError, BenchmarkDefinition, ParameterCombination, Suite};

/// Replacement values for one axis, parsed from `axis=v1,v2`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamOverride {
    /// Axis name
    pub axis: String,
    /// Replacement values, in order
    pub values: Vec<String>,
}

impl FromStr for ParamOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (axis, values) = s
            .split_once('=')
            .ok_or_else(|| format!("expected axis=v1,v2, got `{s}`"))?;
        let axis = axis.trim();
        if axis.is_empty() {
            return Err(format!("missing axis name in `{s}`"));
        }
        let values: Vec<String> = values
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return Err(format!("no values for axis `{axis}`"));
        }
        Ok(Self {
            axis: axis.to_string(),
            values,
        })
    }
}

impl fmt::Display for ParamOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.axis, self.values.join(","))
    }
}

/// One combination of one selected definition
#[derive(Debug, Clone)]
pub struct PlannedRun {
    /// Index into [`ExecutionPlan::definitions`]
    pub definition: usize,
    /// Values to measure
    pub combination: ParameterCombination,
}

/// Execution plan for benchmarks
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Selected definitions with overrides applied
    pub definitions: Vec<BenchmarkDefinition>,
    /// Combinations to run, in enumeration order
    pub runs: Vec<PlannedRun>,
}

impl ExecutionPlan {
    /// Definition a run belongs to
    pub fn definition_of(&self, run: &PlannedRun) -> &BenchmarkDefinition {
        &self.definitions[run.definition]
    }

    /// Number of combinations to run
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether nothing was selected
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Build execution plan from a suite.
///
/// Fails before anything runs if any definition in the suite has an invalid
/// parameter space, or an override names an axis no selected definition
/// declares or leaves an axis invalid.
pub fn build_plan(
    suite: &Suite,
    filter: Option<&regex::Regex>,
    overrides: &[ParamOverride],
) -> Result<ExecutionPlan, BenchError> {
    suite.validate()?;

    let mut definitions: Vec<BenchmarkDefinition> = suite
        .definitions()
        .iter()
        .filter(|d| filter.is_none_or(|re| re.is_match(d.name())))
        .cloned()
        .collect();

    for o in overrides {
        let mut applied = false;
        for definition in definitions.iter_mut() {
            if definition.space().axes().iter().any(|a| a.name() == o.axis) {
                *definition = definition.clone().with_axis_values(&o.axis, o.values.clone())?;
                applied = true;
            }
        }
        if !applied {
            return Err(BenchError::InvalidParameterCombination(format!(
                "override `{o}` matches no axis of the selected benchmarks"
            )));
        }
    }

    for definition in &definitions {
        definition.validate()?;
    }

    let mut runs = Vec::new();
    for (index, definition) in definitions.iter().enumerate() {
        runs.extend(
            definition
                .combinations()
                .into_iter()
                .map(|combination| PlannedRun {
                    definition: index,
                    combination,
                }),
        );
    }

    Ok(ExecutionPlan { definitions, runs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use steadybench_core::workload;

    fn bench(name: &str) -> BenchmarkDefinition {
        BenchmarkDefinition::new(name, workload(|_| Ok(0u64), |n: &mut u64| *n))
    }

    fn suite() -> Suite {
        Suite::new()
            .with(
                bench("put")
                    .param("numPuts", ["100", "10000"])
                    .param("mapType", ["hashMap", "fx"]),
            )
            .with(bench("put_compute").param("numPuts", ["100", "10000"]))
            .with(bench("builder"))
    }

    fn names(plan: &ExecutionPlan) -> Vec<String> {
        plan.runs
            .iter()
            .map(|r| format!("{} {}", plan.definition_of(r).name(), r.combination))
            .collect()
    }

    #[test]
    fn test_no_filter_keeps_declaration_order() {
        let plan = build_plan(&suite(), None, &[]).unwrap();
        assert_eq!(plan.definitions.len(), 3);
        assert_eq!(plan.len(), 4 + 2 + 1);
        assert_eq!(
            names(&plan)[..4],
            [
                "put {numPuts=100, mapType=hashMap}",
                "put {numPuts=100, mapType=fx}",
                "put {numPuts=10000, mapType=hashMap}",
                "put {numPuts=10000, mapType=fx}",
            ]
        );
        assert_eq!(names(&plan)[6], "builder {}");
    }

    #[test]
    fn test_regex_filter() {
        let re = regex::Regex::new("^put").unwrap();
        let plan = build_plan(&suite(), Some(&re), &[]).unwrap();
        let selected: Vec<&str> = plan.definitions.iter().map(|d| d.name()).collect();
        assert_eq!(selected, ["put", "put_compute"]);

        let re = regex::Regex::new("nothing").unwrap();
        assert!(build_plan(&suite(), Some(&re), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_override_replaces_values() {
        let o: ParamOverride = "numPuts=7".parse().unwrap();
        let plan = build_plan(&suite(), None, &[o]).unwrap();
        assert_eq!(plan.len(), 2 + 1 + 1);
        assert!(plan.runs[..3].iter().all(|r| r.combination.get("numPuts") == Some("7")));
    }

    #[test]
    fn test_unknown_override_axis_fails() {
        let o: ParamOverride = "numGets=1".parse().unwrap();
        assert!(matches!(
            build_plan(&suite(), None, &[o]),
            Err(BenchError::InvalidParameterCombination(_))
        ));
    }

    #[test]
    fn test_invalid_definition_fails_before_planning() {
        let bad = Suite::new()
            .with(bench("ok").param("n", ["1"]))
            .with(bench("bad").param("n", Vec::<String>::new()));
        assert!(matches!(
            build_plan(&bad, None, &[]),
            Err(BenchError::InvalidParameterCombination(_))
        ));
        // Filtering does not hide declaration errors
        let re = regex::Regex::new("^ok$").unwrap();
        assert!(build_plan(&bad, Some(&re), &[]).is_err());
    }

    #[test]
    fn test_parse_override() {
        let o: ParamOverride = "mapType = hashMap, fx".parse().unwrap();
        assert_eq!(o.axis, "mapType");
        assert_eq!(o.values, ["hashMap", "fx"]);
        assert_eq!(o.to_string(), "mapType=hashMap,fx");
        assert!("mapType".parse::<ParamOverride>().is_err());
        assert!("=1".parse::<ParamOverride>().is_err());
        assert!("n=".parse::<ParamOverride>().is_err());
    }
}
