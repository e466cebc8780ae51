//! Iteration Controller
//!
//! Times one iteration of a workload against a monotonic [`Clock`]. The start
//! timestamp is taken immediately before the first invocation and the stop
//! timestamp immediately after the last; setup and teardown never fall inside
//! the window.

use crate::Workload;
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use steadybench_ipc::{IterationLength, Sample};

/// Monotonic nanosecond clock
pub trait Clock {
    /// Nanoseconds since an arbitrary fixed origin
    fn now_nanos(&self) -> u64;
}

/// Clock backed by [`std::time::Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline(always)]
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Clock that only moves when told to; lets tests script exact timings.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Clock starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, nanos: u64) {
        self.now.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Running stopwatch over a clock
pub struct Timer<'c, C: Clock + ?Sized> {
    clock: &'c C,
    start: u64,
}

impl<'c, C: Clock + ?Sized> Timer<'c, C> {
    /// Start timing now
    #[inline(always)]
    pub fn start(clock: &'c C) -> Self {
        Self {
            clock,
            start: clock.now_nanos(),
        }
    }

    /// Nanoseconds since `start`
    #[inline(always)]
    pub fn elapsed(&self) -> u64 {
        self.clock.now_nanos().saturating_sub(self.start)
    }
}

/// Time a single invocation. Its output is dropped after the stop timestamp.
#[inline]
pub fn measure<W, C>(workload: &W, context: &mut W::Context, clock: &C) -> Sample
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    let timer = Timer::start(clock);
    let output = black_box(workload.invoke(black_box(&mut *context)));
    let elapsed = timer.elapsed();
    drop(output);
    Sample::single(elapsed)
}

/// Time `invocations` back-to-back calls as one window
#[inline]
pub fn measure_batch<W, C>(
    workload: &W,
    context: &mut W::Context,
    clock: &C,
    invocations: u64,
) -> Sample
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    let timer = Timer::start(clock);
    for _ in 0..invocations {
        black_box(workload.invoke(black_box(&mut *context)));
    }
    Sample::new(timer.elapsed(), invocations)
}

/// Invoke repeatedly until at least `target_nanos` have elapsed (at least once)
#[inline]
pub fn measure_for<W, C>(
    workload: &W,
    context: &mut W::Context,
    clock: &C,
    target_nanos: u64,
) -> Sample
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    let timer = Timer::start(clock);
    let mut invocations = 0u64;
    let mut elapsed;
    loop {
        black_box(workload.invoke(black_box(&mut *context)));
        invocations += 1;
        elapsed = timer.elapsed();
        if elapsed >= target_nanos {
            break;
        }
    }
    Sample::new(elapsed, invocations)
}

/// Run one warm-up or measurement iteration
#[inline]
pub fn run_iteration<W, C>(
    workload: &W,
    context: &mut W::Context,
    clock: &C,
    length: IterationLength,
) -> Sample
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    match length {
        IterationLength::Invocations(1) => measure(workload, context, clock),
        IterationLength::Invocations(n) => measure_batch(workload, context, clock, n),
        IterationLength::Time { nanos } => measure_for(workload, context, clock, nanos),
    }
}

/// Pin the current thread to one CPU core
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    // SAFETY: cpu_set_t is plain data; zeroed is a valid empty set.
    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();
        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref) == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// Pin the current thread to one CPU core (no-op off Linux)
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}
