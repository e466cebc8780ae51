//! Workload Interface
//!
//! A workload is the unit of work under test. `setup` builds the mutable
//! fixture for one parameter combination; `invoke` is the timed call.

use crate::measure::SystemClock;
use crate::scheduler::collect_samples;
use crate::{BenchError, ParameterCombination, WorkloadError};
use std::marker::PhantomData;
use steadybench_ipc::{IterationPlan, Sample};

/// The operation being measured.
///
/// `Context` lives for exactly one combination: it is created by `setup`
/// before timing starts and dropped after the last measurement iteration.
pub trait Workload: Send + Sync + 'static {
    /// Fixture state consumed by every timed invocation
    type Context;
    /// Observable value of one invocation (black-boxed by the harness)
    type Output;

    /// Build the fixture for `combination`
    fn setup(&self, combination: &ParameterCombination) -> Result<Self::Context, WorkloadError>;

    /// One timed invocation
    fn invoke(&self, context: &mut Self::Context) -> Self::Output;
}

/// Workload assembled from a setup closure and an invoke closure
pub struct FnWorkload<C, O, S, I> {
    setup: S,
    invoke: I,
    _marker: PhantomData<fn() -> (C, O)>,
}

/// Build a [`Workload`] from two closures.
///
/// ```
/// use steadybench_core::{Workload, workload};
///
/// let w = workload(
///     |combo| Ok(combo.parse::<u64>("n")?),
///     |n: &mut u64| *n * 2,
/// );
/// # let _ = &w;
/// ```
pub fn workload<C, O, S, I>(setup: S, invoke: I) -> FnWorkload<C, O, S, I>
where
    S: Fn(&ParameterCombination) -> Result<C, WorkloadError> + Send + Sync + 'static,
    I: Fn(&mut C) -> O + Send + Sync + 'static,
    C: 'static,
    O: 'static,
{
    FnWorkload {
        setup,
        invoke,
        _marker: PhantomData,
    }
}

impl<C, O, S, I> Workload for FnWorkload<C, O, S, I>
where
    S: Fn(&ParameterCombination) -> Result<C, WorkloadError> + Send + Sync + 'static,
    I: Fn(&mut C) -> O + Send + Sync + 'static,
    C: 'static,
    O: 'static,
{
    type Context = C;
    type Output = O;

    fn setup(&self, combination: &ParameterCombination) -> Result<C, WorkloadError> {
        (self.setup)(combination)
    }

    #[inline(always)]
    fn invoke(&self, context: &mut C) -> O {
        (self.invoke)(context)
    }
}

/// Type-erased workload stored in a definition.
///
/// Erasure happens once per definition; inside `collect` the timed call is
/// statically dispatched.
pub trait Runnable: Send + Sync {
    /// Run setup, warm-up and measurement, returning the retained samples
    fn collect(
        &self,
        combination: &ParameterCombination,
        plan: &IterationPlan,
    ) -> Result<Vec<Sample>, BenchError>;
}

impl<W: Workload> Runnable for W {
    fn collect(
        &self,
        combination: &ParameterCombination,
        plan: &IterationPlan,
    ) -> Result<Vec<Sample>, BenchError> {
        collect_samples(self, combination, plan, &SystemClock::new())
    }
}
