//! Integration tests for the javac/java toolchain
//!
//! These exercise the real compiler and JVM:
//! 1. Hello world passes
//! 2. Syntax errors surface as compilation errors
//! 3. Stdin-driven programs are graded per test case
//! 4. Concurrent runs with the same class name do not collide
//!
//! Run with `cargo test -- --ignored` on a host with a JDK on PATH.

use grader_common::config::EngineConfig;
use grader_common::types::{TestCase, VerdictStatus};
use grader_engine::Grader;
use std::path::Path;

fn java_grader(scratch_root: &Path) -> Grader {
    Grader::new(EngineConfig {
        scratch_root: scratch_root.to_path_buf(),
        ..EngineConfig::default()
    })
}

#[tokio::test]
#[ignore] // Requires a JDK
async fn test_java_hello() {
    let root = tempfile::tempdir().unwrap();
    let source = r#"
public class Main {
    public static void main(String[] args) {
        System.out.println("Hello");
    }
}
"#;

    let verdict = java_grader(root.path())
        .grade(source, &[TestCase::new("", "Hello")])
        .await
        .unwrap();

    assert_eq!(verdict.status(), VerdictStatus::Passed);
    assert_eq!(verdict.output(), "All 1 test cases passed!");
}

#[tokio::test]
#[ignore] // Requires a JDK
async fn test_java_compilation_error() {
    let root = tempfile::tempdir().unwrap();
    let source = r#"
public class Main {
    public static void main(String[] args) {
        // Missing semicolon - compilation error
        System.out.println("test")
    }
}
"#;

    let verdict = java_grader(root.path())
        .grade(source, &[TestCase::new("", "test")])
        .await
        .unwrap();

    assert_eq!(verdict.status(), VerdictStatus::Error);
    let error = verdict.error_message().unwrap();
    assert!(error.starts_with("Compilation Error:"));
    assert!(!error.contains(&root.path().to_string_lossy().into_owned()));
}

#[tokio::test]
#[ignore] // Requires a JDK
async fn test_java_scanner_uppercase() {
    let root = tempfile::tempdir().unwrap();
    // Scanner comes from the injected preamble
    let source = r#"
public class Echo {
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        System.out.println(in.nextLine().toUpperCase());
    }
}
"#;

    let verdict = java_grader(root.path())
        .grade(
            source,
            &[TestCase::new("abc", "ABC"), TestCase::new("Hi there\n", "HI THERE")],
        )
        .await
        .unwrap();

    assert_eq!(verdict.status(), VerdictStatus::Passed);
    assert_eq!(verdict.test_case_results().len(), 2);
}

#[tokio::test]
#[ignore] // Requires a JDK
async fn test_java_runtime_exception() {
    let root = tempfile::tempdir().unwrap();
    let source = r#"
public class Main {
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        int n = in.nextInt();
        System.out.println(100 / n);
    }
}
"#;

    let verdict = java_grader(root.path())
        .grade(source, &[TestCase::new("10", "10"), TestCase::new("0", "0")])
        .await
        .unwrap();

    assert_eq!(verdict.status(), VerdictStatus::Error);
    let error = verdict.error_message().unwrap();
    assert!(error.starts_with("Runtime Error in Test Case 2:"));
    assert!(error.contains("ArithmeticException"));
}

#[tokio::test]
#[ignore] // Requires a JDK
async fn test_java_concurrent_same_class_name() {
    let root = tempfile::tempdir().unwrap();
    let grader = java_grader(root.path());

    let source_for = |word: &str| {
        format!(
            "public class Main {{ public static void main(String[] a) {{ System.out.println(\"{}\"); }} }}",
            word
        )
    };
    let first = source_for("first");
    let second = source_for("second");

    let first_cases = [TestCase::new("", "first")];
    let second_cases = [TestCase::new("", "second")];
    let (a, b) = tokio::join!(
        grader.grade(&first, &first_cases),
        grader.grade(&second, &second_cases),
    );

    assert_eq!(a.unwrap().status(), VerdictStatus::Passed);
    assert_eq!(b.unwrap().status(), VerdictStatus::Passed);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
