//! Named extras passed to test functions.

use crate::coverage::CoverageProbe;
use crate::result::{FuzzError, FuzzResult};
use crate::test_fn::FuzzTest;

/// Extras a test function may declare, besides its context
pub const RECOGNIZED_PARAMS: &[&str] = &["coverage"];

/// Which extras a test asked for, validated once per worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentPlan {
    wants_coverage: bool,
}

impl ArgumentPlan {
    /// Check the test's declared extras against [`RECOGNIZED_PARAMS`]
    pub fn resolve(test: &FuzzTest) -> FuzzResult<Self> {
        if let Some(unknown) = test.params.iter().find(|p| !RECOGNIZED_PARAMS.contains(p)) {
            return Err(FuzzError::configuration(format!(
                "Unable to set value for '{unknown}' argument in '{}' function.",
                test.name
            )));
        }
        Ok(Self {
            wants_coverage: test.params.contains(&"coverage"),
        })
    }

    /// Whether the test declared a `coverage` parameter
    #[must_use]
    pub fn wants_coverage(&self) -> bool {
        self.wants_coverage
    }

    /// Bind values for the declared extras
    #[must_use]
    pub fn build(&self, coverage: Option<CoverageProbe>) -> TestArgs {
        TestArgs {
            coverage: coverage.filter(|_| self.wants_coverage),
        }
    }
}

/// Values bound to a test's extras
#[derive(Debug, Default)]
pub struct TestArgs {
    coverage: Option<CoverageProbe>,
}

impl TestArgs {
    /// Take the value of extra `name`
    pub fn take<T: TestArg>(&mut self, name: &str) -> FuzzResult<T> {
        T::from_args(self, name)
    }
}

/// A type a test function may use for a named extra
pub trait TestArg: Sized {
    /// Extract the value for `name`
    fn from_args(args: &mut TestArgs, name: &str) -> FuzzResult<Self>;
}

impl TestArg for Option<CoverageProbe> {
    fn from_args(args: &mut TestArgs, name: &str) -> FuzzResult<Self> {
        match name {
            "coverage" => Ok(args.coverage.take()),
            other => Err(FuzzError::configuration(format!(
                "'{other}' cannot be bound to a coverage probe"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::protocol::channel_pair;
    use crate::test_fn::TestResult;
    use crate::worker::FuzzContext;
    use std::sync::Arc;

    fn noop(_: &mut FuzzContext, _: &mut TestArgs) -> TestResult {
        Ok(())
    }

    #[test]
    fn test_no_extras() {
        let test = FuzzTest::new("demo", "fuzz", &[], noop);
        let plan = ArgumentPlan::resolve(&test).unwrap();
        assert!(!plan.wants_coverage());
    }

    #[test]
    fn test_coverage_recognized() {
        let test = FuzzTest::new("demo", "fuzz", &["coverage"], noop);
        assert!(ArgumentPlan::resolve(&test).unwrap().wants_coverage());
    }

    #[test]
    fn test_unknown_parameter_is_named() {
        let test = FuzzTest::new("demo", "fuzz_mint", &["coverage", "accounts"], noop);
        let err = ArgumentPlan::resolve(&test).unwrap_err();
        assert!(matches!(err, FuzzError::Configuration { .. }));
        assert!(err
            .to_string()
            .contains("Unable to set value for 'accounts' argument in 'fuzz_mint' function."));
    }

    #[test]
    fn test_probe_only_bound_when_declared() {
        let (uplink, _channels) = channel_pair();
        let probe = CoverageProbe::new(0, Arc::new(uplink));
        let test = FuzzTest::new("demo", "fuzz", &[], noop);
        let mut args = ArgumentPlan::resolve(&test).unwrap().build(Some(probe));
        let bound: Option<CoverageProbe> = args.take("coverage").unwrap();
        assert!(bound.is_none());
    }

    #[test]
    fn test_absent_probe_is_none() {
        let test = FuzzTest::new("demo", "fuzz", &["coverage"], noop);
        let mut args = ArgumentPlan::resolve(&test).unwrap().build(None);
        let bound: Option<CoverageProbe> = args.take("coverage").unwrap();
        assert!(bound.is_none());
    }
}
