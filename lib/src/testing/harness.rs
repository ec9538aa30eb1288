// Test harness types: TestSuiteResult, TestSuiteDesc, TestRunSummary.
// Suites are declared with define_test_suite! and handed to run_suites as a slice.

use super::config::{TestConfig, Verbosity};

/// Maximum number of suites recorded individually in a [`TestRunSummary`].
pub const HARNESS_MAX_SUITES: usize = 16;

/// Result of executing a single test suite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestSuiteResult {
    pub name: &'static str,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

impl TestSuiteResult {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            total: 0,
            passed: 0,
            failed: 0,
        }
    }

    pub fn fill(&mut self, passed: u32, total: u32) {
        self.total = total;
        self.passed = passed;
        self.failed = total.saturating_sub(passed);
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub type SuiteRunnerFn = fn(&mut TestSuiteResult) -> bool;

#[derive(Clone, Copy)]
pub struct TestSuiteDesc {
    pub name: &'static str,
    pub run: SuiteRunnerFn,
}

/// Aggregated results from running all test suites.
#[derive(Clone, Copy, Debug)]
pub struct TestRunSummary {
    pub suites: [TestSuiteResult; HARNESS_MAX_SUITES],
    pub suite_count: usize,
    pub total_tests: u32,
    pub passed: u32,
    pub failed: u32,
}

impl Default for TestRunSummary {
    fn default() -> Self {
        Self {
            suites: [TestSuiteResult::default(); HARNESS_MAX_SUITES],
            suite_count: 0,
            total_tests: 0,
            passed: 0,
            failed: 0,
        }
    }
}

impl TestRunSummary {
    pub fn add_suite_result(&mut self, result: &TestSuiteResult) {
        if self.suite_count < HARNESS_MAX_SUITES {
            self.suites[self.suite_count] = *result;
            self.suite_count += 1;
        }
        self.total_tests = self.total_tests.saturating_add(result.total);
        self.passed = self.passed.saturating_add(result.passed);
        self.failed = self.failed.saturating_add(result.failed);
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn recorded(&self) -> &[TestSuiteResult] {
        &self.suites[..self.suite_count]
    }
}

/// Run every suite in order and aggregate the results.
///
/// Suites run even when `config.enabled` is false; gating on the command line
/// is the caller's decision.
pub fn run_suites(suites: &[&TestSuiteDesc], config: &TestConfig) -> TestRunSummary {
    let mut summary = TestRunSummary::default();
    for desc in suites {
        let mut result = TestSuiteResult::new(desc.name);
        (desc.run)(&mut result);
        if config.verbosity == Verbosity::Verbose || !result.all_passed() {
            crate::klog_info!(
                "SUITE {}: {}/{} passed",
                result.name,
                result.passed,
                result.total
            );
        }
        summary.add_suite_result(&result);
    }
    if config.verbosity != Verbosity::Quiet {
        crate::klog_info!(
            "TESTS: {} suites, {} passed, {} failed",
            summary.suite_count,
            summary.passed,
            summary.failed
        );
    }
    summary
}
