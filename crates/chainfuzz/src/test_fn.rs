//! Fuzz test registration.
//!
//! A fuzz test is a plain function taking `&mut FuzzContext` followed by any
//! named extras it wants. The `#[fuzz_test]` attribute records the extras'
//! names and generates the glue that pulls them out of [`TestArgs`].

use crate::result::{FuzzError, FuzzResult};
use crate::worker::{FuzzContext, TestArgs};
use std::error::Error;
use std::fmt;

/// What a test body returns once normalised
pub type TestResult = Result<(), Box<dyn Error + Send + Sync + 'static>>;

/// Entry point generated for a test
pub type TestBody = fn(&mut FuzzContext, &mut TestArgs) -> TestResult;

/// A registered fuzz test
#[derive(Clone, Copy)]
pub struct FuzzTest {
    /// Module path of the test function
    pub module: &'static str,
    /// Function name
    pub name: &'static str,
    /// Declared named extras, in signature order
    pub params: &'static [&'static str],
    /// Generated entry point
    pub body: TestBody,
}

impl FuzzTest {
    /// Register a test
    #[must_use]
    pub const fn new(
        module: &'static str,
        name: &'static str,
        params: &'static [&'static str],
        body: TestBody,
    ) -> Self {
        Self {
            module,
            name,
            params,
            body,
        }
    }

    /// `module::name`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }

    /// Whether `query` names this test, bare or qualified
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        query == self.name || query == self.qualified_name()
    }
}

impl fmt::Debug for FuzzTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuzzTest")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Find a test by bare or qualified name.
///
/// A bare name shared by tests in different modules is ambiguous and must
/// be qualified.
pub fn find_test<'a>(tests: &[&'a FuzzTest], query: &str) -> FuzzResult<&'a FuzzTest> {
    let mut matching = tests.iter().copied().filter(|t| t.matches(query));
    match (matching.next(), matching.next()) {
        (Some(test), None) => Ok(test),
        (Some(_), Some(_)) => Err(FuzzError::configuration(format!(
            "Test name '{query}' is ambiguous; use the qualified name"
        ))),
        (None, _) => Err(FuzzError::UnknownTest {
            name: query.to_string(),
        }),
    }
}

/// Conversion of a test function's return value into [`TestResult`]
pub trait IntoTestResult {
    /// Normalise
    fn into_test_result(self) -> TestResult;
}

impl IntoTestResult for () {
    fn into_test_result(self) -> TestResult {
        Ok(())
    }
}

impl<E> IntoTestResult for Result<(), E>
where
    E: Into<Box<dyn Error + Send + Sync + 'static>>,
{
    fn into_test_result(self) -> TestResult {
        self.map_err(Into::into)
    }
}
