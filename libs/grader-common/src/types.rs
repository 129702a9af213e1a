use serde::{Deserialize, Serialize};

/// A single input / expected-output pair.
///
/// Order within a submission matters; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// What a caller hands to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    pub source_code: String,
    pub test_cases: Vec<TestCase>,
    /// Per-case timeout override for this submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Per-test-case record, kept even when grading stops early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Passed,
    Failed,
    Error,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Passed => "passed",
            VerdictStatus::Failed => "failed",
            VerdictStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final grading result, the only object that crosses the engine boundary.
///
/// Fields are private so a verdict can only be built through the
/// constructors below, which keep `status` and `error` consistent:
/// `error` is absent exactly when `status` is `Passed`. Deserialization
/// goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VerdictRecord")]
pub struct Verdict {
    status: VerdictStatus,
    output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    execution_time_ms: u64,
    test_case_results: Vec<TestCaseResult>,
}

/// Unchecked wire form of a `Verdict`
#[derive(Deserialize)]
struct VerdictRecord {
    status: VerdictStatus,
    output: String,
    #[serde(default)]
    error: Option<String>,
    execution_time_ms: u64,
    #[serde(default)]
    test_case_results: Vec<TestCaseResult>,
}

impl TryFrom<VerdictRecord> for Verdict {
    type Error = String;

    fn try_from(record: VerdictRecord) -> Result<Self, Self::Error> {
        let VerdictRecord {
            status,
            output,
            error,
            execution_time_ms,
            test_case_results,
        } = record;

        match (status, error) {
            (VerdictStatus::Passed, None) => {
                Ok(Self::passed(output, execution_time_ms, test_case_results))
            }
            (VerdictStatus::Passed, Some(_)) => {
                Err("a passed verdict cannot carry an error".to_string())
            }
            (VerdictStatus::Failed, Some(error)) => {
                Ok(Self::failed(output, error, execution_time_ms, test_case_results))
            }
            (VerdictStatus::Error, Some(error)) => {
                Ok(Self::error(output, error, execution_time_ms, test_case_results))
            }
            (status, None) => Err(format!("a {} verdict requires an error", status)),
        }
    }
}

impl Verdict {
    pub fn passed(
        output: impl Into<String>,
        execution_time_ms: u64,
        test_case_results: Vec<TestCaseResult>,
    ) -> Self {
        Self {
            status: VerdictStatus::Passed,
            output: output.into(),
            error: None,
            execution_time_ms,
            test_case_results,
        }
    }

    pub fn failed(
        output: impl Into<String>,
        error: impl Into<String>,
        execution_time_ms: u64,
        test_case_results: Vec<TestCaseResult>,
    ) -> Self {
        Self {
            status: VerdictStatus::Failed,
            output: output.into(),
            error: Some(error.into()),
            execution_time_ms,
            test_case_results,
        }
    }

    pub fn error(
        output: impl Into<String>,
        error: impl Into<String>,
        execution_time_ms: u64,
        test_case_results: Vec<TestCaseResult>,
    ) -> Self {
        Self {
            status: VerdictStatus::Error,
            output: output.into(),
            error: Some(error.into()),
            execution_time_ms,
            test_case_results,
        }
    }

    pub fn status(&self) -> VerdictStatus {
        self.status
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }

    pub fn test_case_results(&self) -> &[TestCaseResult] {
        &self.test_case_results
    }

    pub fn is_passed(&self) -> bool {
        self.status == VerdictStatus::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&VerdictStatus::Passed).unwrap(), "\"passed\"");
        assert_eq!(serde_json::to_string(&VerdictStatus::Failed).unwrap(), "\"failed\"");
        assert_eq!(serde_json::to_string(&VerdictStatus::Error).unwrap(), "\"error\"");
    }

    #[test]
    fn test_passed_verdict_has_no_error() {
        let verdict = Verdict::passed("All 1 test cases passed!", 12, vec![]);
        assert_eq!(verdict.status(), VerdictStatus::Passed);
        assert!(verdict.error_message().is_none());

        let json = serde_json::to_value(&verdict).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["status"], "passed");
        assert_eq!(json["execution_time_ms"], 12);
    }

    #[test]
    fn test_failed_and_error_carry_message() {
        let failed = Verdict::failed("", "Test Case 1 Failed", 3, vec![]);
        assert_eq!(failed.error_message(), Some("Test Case 1 Failed"));

        let error = Verdict::error("", "Compilation Error: boom", 0, vec![]);
        assert_eq!(error.status(), VerdictStatus::Error);
        assert!(!error.is_passed());
    }

    #[test]
    fn test_test_case_input_defaults_to_empty() {
        let tc: TestCase = serde_json::from_str(r#"{"expected_output": "Hello"}"#).unwrap();
        assert_eq!(tc.input, "");
        assert_eq!(tc.expected_output, "Hello");
    }

    #[test]
    fn test_grade_request_roundtrip_keeps_order() {
        let json = r#"{
            "source_code": "public class Main {}",
            "test_cases": [
                {"input": "1", "expected_output": "a"},
                {"input": "1", "expected_output": "a"},
                {"input": "2", "expected_output": "b"}
            ]
        }"#;
        let req: GradeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.test_cases.len(), 3);
        assert_eq!(req.test_cases[0], req.test_cases[1]);
        assert_eq!(req.test_cases[2].input, "2");
        assert!(req.timeout_ms.is_none());
    }

    #[test]
    fn test_verdict_deserialize_enforces_error_invariant() {
        let passed_with_error = r#"{
            "status": "passed",
            "output": "All 1 test cases passed!",
            "error": "Test Case 1 Failed",
            "execution_time_ms": 4,
            "test_case_results": []
        }"#;
        assert!(serde_json::from_str::<Verdict>(passed_with_error).is_err());

        let failed_without_error =
            r#"{"status": "failed", "output": "", "execution_time_ms": 4}"#;
        assert!(serde_json::from_str::<Verdict>(failed_without_error).is_err());
    }

    #[test]
    fn test_verdict_reads_back_what_it_wrote() {
        let verdict = Verdict::failed("Test Case 1: Passed", "Test Case 2 Failed: x", 9, vec![]);
        let json = serde_json::to_string(&verdict).unwrap();
        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, verdict);
    }
}
