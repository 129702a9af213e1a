/// Test Case Evaluator - ordered, short-circuiting output comparison
///
/// **Core Responsibility:**
/// Run the compiled artifact once per test case, in order, and judge each
/// output against its expectation. Evaluation stops at the first case that
/// errors or mismatches; later cases are never executed.
///
/// **Normalization Rules:**
/// - Trailing newline characters (`\n`, `\r`): stripped
/// - Trailing spaces/tabs: significant
/// - Leading whitespace: significant
/// - Internal whitespace and blank lines: significant
/// - Case sensitivity: YES (exact match required)

use crate::error::EngineError;
use crate::runner::{self, ExecutionResult, Limits};
use crate::toolchain::Toolchain;
use crate::verdict::Failure;
use crate::workspace::Workspace;
use grader_common::types::{TestCase, TestCaseResult};
use tracing::{debug, info, instrument, warn};

/// Results gathered so far plus the failure that stopped evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub results: Vec<TestCaseResult>,
    pub failure: Option<Failure>,
}

/// Strip trailing newline characters only
pub fn normalize_output(output: &str) -> &str {
    output.trim_end_matches(['\n', '\r'])
}

/// Describe how `actual` differs from `expected` (both normalized).
///
/// A line-count difference wins over content; otherwise the first differing
/// line is reported with both versions verbatim.
pub fn describe_mismatch(expected: &str, actual: &str) -> String {
    let expected_lines: Vec<&str> = expected.split('\n').collect();
    let actual_lines: Vec<&str> = actual.split('\n').collect();

    if expected_lines.len() != actual_lines.len() {
        return format!(
            "Expected {} line(s) but got {} line(s)",
            expected_lines.len(),
            actual_lines.len()
        );
    }

    for (idx, (exp, act)) in expected_lines.iter().zip(&actual_lines).enumerate() {
        if exp != act {
            return format!(
                "Line {} differs\nExpected: {}\nActual: {}",
                idx + 1,
                exp,
                act
            );
        }
    }

    "Output mismatch".to_string()
}

/// Message recorded for a case that did not exit cleanly
fn runtime_message(execution: &ExecutionResult) -> String {
    let stderr = normalize_output(&execution.stderr);
    if stderr.trim().is_empty() {
        format!("Process exited with code {}", execution.exit_code)
    } else {
        stderr.to_string()
    }
}

/// Judge one finished execution against its test case.
///
/// Returns the per-case record and, when the case did not pass, the failure
/// that should stop evaluation.
pub fn evaluate_case(
    case: usize,
    test_case: &TestCase,
    execution: &ExecutionResult,
) -> (TestCaseResult, Option<Failure>) {
    if !execution.succeeded() {
        let message = runtime_message(execution);
        let result = TestCaseResult {
            input: test_case.input.clone(),
            expected_output: test_case.expected_output.clone(),
            actual_output: message.clone(),
            passed: false,
        };
        return (result, Some(Failure::Runtime { case, message }));
    }

    let actual = normalize_output(&execution.stdout);
    let expected = normalize_output(&test_case.expected_output);
    let passed = actual == expected;

    let result = TestCaseResult {
        input: test_case.input.clone(),
        expected_output: test_case.expected_output.clone(),
        actual_output: actual.to_string(),
        passed,
    };

    if passed {
        (result, None)
    } else {
        let detail = describe_mismatch(expected, actual);
        (result, Some(Failure::Mismatch { case, detail }))
    }
}

/// Run every test case against the artifact in `workspace`, in order.
///
/// Fails only when the runtime itself cannot be launched.
#[instrument(skip_all, fields(token = %workspace.token(), test_count = test_cases.len(), timeout_ms = limits.timeout_ms))]
pub async fn evaluate(
    toolchain: &dyn Toolchain,
    workspace: &Workspace,
    test_cases: &[TestCase],
    limits: Limits,
) -> Result<Evaluation, EngineError> {
    let command = toolchain.run_command(workspace);
    let mut results = Vec::with_capacity(test_cases.len());

    for (idx, test_case) in test_cases.iter().enumerate() {
        let case = idx + 1;
        let execution = runner::run(&command, &test_case.input, limits).await;

        if execution.spawn_failed {
            return Err(EngineError::Spawn {
                program: command.program.clone(),
                message: execution.stderr,
            });
        }

        let (result, failure) = evaluate_case(case, test_case, &execution);
        results.push(result);

        match failure {
            None => {
                debug!(case, duration_ms = execution.duration_ms, "Test case passed");
            }
            Some(failure) => {
                if failure.is_mismatch() {
                    info!(case, duration_ms = execution.duration_ms, "Test case output mismatch");
                } else {
                    warn!(
                        case,
                        exit_code = execution.exit_code,
                        timed_out = execution.timed_out,
                        output_exceeded = execution.output_exceeded,
                        "Test case did not run to completion"
                    );
                }
                return Ok(Evaluation {
                    results,
                    failure: Some(failure),
                });
            }
        }
    }

    Ok(Evaluation {
        results,
        failure: None,
    })
}
