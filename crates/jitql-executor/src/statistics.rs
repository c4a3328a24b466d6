//! Dispatch counters for the query executor.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the executor on every request.
#[derive(Debug, Default)]
pub(crate) struct ExecutorStats {
    requests: AtomicU64,
    compiled_hits: AtomicU64,
    compiled_races: AtomicU64,
    compilations: AtomicU64,
    compile_failures: AtomicU64,
    interpreted: AtomicU64,
    validation_failures: AtomicU64,
    failures: AtomicU64,
}

/// Which way a request was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    CompiledHit,
    /// Missed the fast path but found an artifact stored after validation.
    CompiledRace,
    Compiled,
    Interpreted,
    ValidationFailed,
    Failed,
}

impl ExecutorStats {
    pub(crate) fn record(&self, outcome: Outcome) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            Outcome::CompiledHit => &self.compiled_hits,
            Outcome::CompiledRace => &self.compiled_races,
            Outcome::Compiled => &self.compilations,
            Outcome::Interpreted => &self.interpreted,
            Outcome::ValidationFailed => &self.validation_failures,
            Outcome::Failed => &self.failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compile_failure(&self) {
        self.compile_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    pub(crate) fn snapshot(&self) -> ExecutorStatsSnapshot {
        ExecutorStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            compiled_hits: self.compiled_hits.load(Ordering::Relaxed),
            compiled_races: self.compiled_races.load(Ordering::Relaxed),
            compilations: self.compilations.load(Ordering::Relaxed),
            compile_failures: self.compile_failures.load(Ordering::Relaxed),
            interpreted: self.interpreted.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of an executor's dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStatsSnapshot {
    /// Requests handled.
    pub requests: u64,
    /// Requests answered from a cached compiled artifact on the fast path.
    pub compiled_hits: u64,
    /// Requests that parsed and validated, then ran an artifact a concurrent
    /// request stored in the meantime.
    pub compiled_races: u64,
    /// Requests that compiled their query and ran the new artifact.
    pub compilations: u64,
    /// Compile attempts that reported the query as not compilable.
    pub compile_failures: u64,
    /// Requests answered by the reference interpreter.
    pub interpreted: u64,
    /// Requests rejected by validation.
    pub validation_failures: u64,
    /// Requests that ended in a top-level error.
    pub failures: u64,
}

impl ExecutorStatsSnapshot {
    /// Share of requests served from the compiled cache, as a percentage.
    pub fn compiled_hit_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            (self.compiled_hits as f64 / self.requests as f64) * 100.0
        }
    }
}

impl fmt::Display for ExecutorStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Query Executor Statistics:")?;
        writeln!(f, "  Requests:            {}", self.requests)?;
        writeln!(f, "  Compiled hits:       {}", self.compiled_hits)?;
        writeln!(f, "  Compiled races:      {}", self.compiled_races)?;
        writeln!(f, "  Compilations:        {}", self.compilations)?;
        writeln!(f, "  Compile failures:    {}", self.compile_failures)?;
        writeln!(f, "  Interpreted:         {}", self.interpreted)?;
        writeln!(f, "  Validation failures: {}", self.validation_failures)?;
        writeln!(f, "  Failures:            {}", self.failures)?;
        writeln!(f, "  Hit rate:            {:.1}%", self.compiled_hit_rate())?;
        Ok(())
    }
}
