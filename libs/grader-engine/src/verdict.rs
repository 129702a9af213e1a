/// Verdict Aggregator
///
/// Turns evaluator output into one terminal state:
/// - no failure  -> `passed`
/// - mismatch    -> `failed` (the code ran, the answer is wrong)
/// - anything else (compile, runtime, timeout, internal) -> `error`
///
/// The `Display` of `Failure` is the exact caller-visible error text; each
/// category has its own prefix so callers can tell them apart.

use grader_common::types::{TestCaseResult, Verdict};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    #[error("Compilation Error: {0}")]
    Compile(String),

    #[error("Runtime Error in Test Case {case}: {message}")]
    Runtime { case: usize, message: String },

    #[error("Test Case {case} Failed: {detail}")]
    Mismatch { case: usize, detail: String },

    #[error("Internal Error: grading could not be completed")]
    Internal,
}

impl Failure {
    /// Mismatches mean wrong output from working code; every other
    /// failure means the code could not be run to completion.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Failure::Mismatch { .. })
    }
}

/// "Test Case i: Passed" for each passing case, one per line
pub fn passed_summary(results: &[TestCaseResult]) -> String {
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.passed)
        .map(|(idx, _)| format!("Test Case {}: Passed", idx + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn aggregate(
    test_case_results: Vec<TestCaseResult>,
    failure: Option<Failure>,
    execution_time_ms: u64,
) -> Verdict {
    match failure {
        None => Verdict::passed(
            format!("All {} test cases passed!", test_case_results.len()),
            execution_time_ms,
            test_case_results,
        ),
        Some(failure) if failure.is_mismatch() => Verdict::failed(
            passed_summary(&test_case_results),
            failure.to_string(),
            execution_time_ms,
            test_case_results,
        ),
        Some(failure) => Verdict::error(
            passed_summary(&test_case_results),
            failure.to_string(),
            execution_time_ms,
            test_case_results,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grader_common::types::VerdictStatus;

    fn result(passed: bool) -> TestCaseResult {
        TestCaseResult {
            input: String::new(),
            expected_output: "x".to_string(),
            actual_output: if passed { "x" } else { "y" }.to_string(),
            passed,
        }
    }

    #[test]
    fn test_all_passed() {
        let verdict = aggregate(vec![result(true), result(true)], None, 40);
        assert_eq!(verdict.status(), VerdictStatus::Passed);
        assert_eq!(verdict.output(), "All 2 test cases passed!");
        assert!(verdict.error_message().is_none());
        assert_eq!(verdict.execution_time_ms(), 40);
    }

    #[test]
    fn test_mismatch_is_failed() {
        let failure = Failure::Mismatch {
            case: 3,
            detail: "Expected 1 line(s) but got 2 line(s)".to_string(),
        };
        let verdict = aggregate(
            vec![result(true), result(true), result(false)],
            Some(failure),
            10,
        );

        assert_eq!(verdict.status(), VerdictStatus::Failed);
        assert_eq!(verdict.output(), "Test Case 1: Passed\nTest Case 2: Passed");
        assert!(verdict.error_message().unwrap().starts_with("Test Case 3 Failed"));
        assert_eq!(verdict.test_case_results().len(), 3);
    }

    #[test]
    fn test_runtime_is_error() {
        let failure = Failure::Runtime {
            case: 1,
            message: "Exception in thread \"main\"".to_string(),
        };
        let verdict = aggregate(vec![result(false)], Some(failure), 5);

        assert_eq!(verdict.status(), VerdictStatus::Error);
        assert_eq!(verdict.output(), "");
        assert_eq!(
            verdict.error_message(),
            Some("Runtime Error in Test Case 1: Exception in thread \"main\"")
        );
    }

    #[test]
    fn test_prefixes_are_distinct() {
        let compile = Failure::Compile("x".into()).to_string();
        let runtime = Failure::Runtime { case: 1, message: "x".into() }.to_string();
        let internal = Failure::Internal.to_string();

        assert!(compile.starts_with("Compilation Error:"));
        assert!(runtime.starts_with("Runtime Error"));
        assert!(internal.starts_with("Internal Error:"));
    }

    #[test]
    fn test_compile_error_has_no_results() {
        let verdict = aggregate(Vec::new(), Some(Failure::Compile("';' expected".into())), 0);
        assert_eq!(verdict.status(), VerdictStatus::Error);
        assert_eq!(verdict.error_message(), Some("Compilation Error: ';' expected"));
        assert!(verdict.test_case_results().is_empty());
    }
}
