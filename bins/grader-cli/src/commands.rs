// CLI commands for local grading
use anyhow::{bail, Context, Result};
use grader_common::config::EngineConfig;
use grader_common::types::{TestCase, Verdict, VerdictStatus};
use grader_engine::runner::{self, Limits};
use grader_engine::{CommandSpec, Grader};
use std::fs;
use std::path::Path;

/// Time allowed for `-version` probes
const CHECK_TIMEOUT_MS: u64 = 10_000;
/// Version banners are a few lines
const CHECK_OUTPUT_BYTES: usize = 64 * 1024;

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_default()?,
    };
    config.with_env_overrides()
}

fn load_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cases: Vec<TestCase> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if cases.is_empty() {
        bail!("No test cases in {}", path.display());
    }
    Ok(cases)
}

/// Process exit status for a verdict: 0 passed, 1 failed, 2 error
pub fn exit_code(verdict: &Verdict) -> u8 {
    match verdict.status() {
        VerdictStatus::Passed => 0,
        VerdictStatus::Failed => 1,
        VerdictStatus::Error => 2,
    }
}

/// Grade a submission and print the verdict as JSON
pub async fn grade(
    source: &Path,
    cases: &Path,
    timeout_ms: Option<u64>,
    config: Option<&Path>,
) -> Result<u8> {
    let config = load_config(config)?;
    let source_code = fs::read_to_string(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    let test_cases = load_cases(cases)?;

    if source_code.trim().is_empty() {
        bail!("Source file {} is empty", source.display());
    }
    if timeout_ms == Some(0) {
        bail!("--timeout-ms must be greater than zero");
    }

    let timeout_ms = timeout_ms.unwrap_or(config.test_timeout_ms);
    let grader = Grader::new(config);
    let verdict = grader
        .grade_with_timeout(&source_code, &test_cases, timeout_ms)
        .await?;

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(exit_code(&verdict))
}

/// Launch `<program> -version` and report whether it answered
async fn probe(label: &str, program: &str) -> bool {
    let spec = CommandSpec::new(program, std::env::temp_dir()).arg("-version");
    let result = runner::run(&spec, "", Limits::new(CHECK_TIMEOUT_MS, CHECK_OUTPUT_BYTES)).await;

    if result.succeeded() {
        // javac and java print their version on stderr
        let banner = if result.stderr.trim().is_empty() {
            result.stdout.trim()
        } else {
            result.stderr.trim()
        };
        println!("✓ {} ({}): {}", label, program, banner.lines().next().unwrap_or(""));
        true
    } else {
        println!(
            "✗ {} ({}): {}",
            label,
            program,
            result.stderr.trim().lines().next().unwrap_or("no output")
        );
        false
    }
}

/// Check that the configured compiler and runtime can be launched
pub async fn check(config: Option<&Path>) -> Result<u8> {
    let config = load_config(config)?;

    println!("Scratch root: {}", config.scratch_root.display());
    let compiler_ok = probe("compiler", &config.compiler).await;
    let runtime_ok = probe("runtime", &config.runtime).await;

    if compiler_ok && runtime_ok {
        println!("Toolchain ready");
        Ok(0)
    } else {
        println!("Toolchain unavailable");
        Ok(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Verdict::passed("ok", 1, vec![])), 0);
        assert_eq!(exit_code(&Verdict::failed("", "Test Case 1 Failed: x", 1, vec![])), 1);
        assert_eq!(exit_code(&Verdict::error("", "Compilation Error: x", 0, vec![])), 2);
    }

    #[test]
    fn test_load_cases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.json");
        fs::write(
            &path,
            r#"[{"input": "abc", "expected_output": "ABC"}, {"expected_output": "x"}]"#,
        )
        .unwrap();

        let cases = load_cases(&path).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0], TestCase::new("abc", "ABC"));
        assert_eq!(cases[1].input, "");
    }

    #[test]
    fn test_load_cases_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.json");
        fs::write(&path, "[]").unwrap();

        assert!(load_cases(&path).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_missing_program() {
        assert!(!probe("compiler", "/nonexistent/javac").await);
    }
}
