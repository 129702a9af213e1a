/// Grader - High-Level Orchestration
///
/// **Responsibility:**
/// Drive one submission through the pipeline and hand back a complete
/// `Verdict`:
/// 1. Acquire a workspace (workspace.rs)
/// 2. Compile the source (compiler.rs)
/// 3. Evaluate test cases in order (evaluator.rs)
/// 4. Aggregate into a verdict (verdict.rs)
/// 5. Release the workspace, on every path
///
/// This module is the glue layer; it knows nothing about how processes run
/// or how outputs are compared.

use crate::compiler;
use crate::error::EngineError;
use crate::evaluator;
use crate::runner::Limits;
use crate::toolchain::{JavaToolchain, Toolchain};
use crate::verdict::{self, Failure};
use crate::workspace::Workspace;
use grader_common::config::EngineConfig;
use grader_common::types::{GradeRequest, TestCase, Verdict};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Grading engine entry point. Cheap to clone and safe to share across
/// concurrent gradings; runs share nothing but the scratch root.
#[derive(Clone)]
pub struct Grader {
    config: Arc<EngineConfig>,
    toolchain: Arc<dyn Toolchain>,
}

impl Grader {
    /// Grader using the `javac`/`java` toolchain from `config`
    pub fn new(config: EngineConfig) -> Self {
        let toolchain = Arc::new(JavaToolchain::from_config(&config));
        Self::with_toolchain(config, toolchain)
    }

    pub fn with_toolchain(config: EngineConfig, toolchain: Arc<dyn Toolchain>) -> Self {
        Self {
            config: Arc::new(config),
            toolchain,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Grade with the configured per-case timeout.
    ///
    /// Only workspace allocation failures and a zero timeout are returned as
    /// `Err`; every other failure is reported inside the verdict.
    pub async fn grade(&self, source_code: &str, test_cases: &[TestCase]) -> Result<Verdict, EngineError> {
        self.grade_with_timeout(source_code, test_cases, self.config.test_timeout_ms)
            .await
    }

    pub async fn grade_request(&self, request: &GradeRequest) -> Result<Verdict, EngineError> {
        let timeout_ms = request.timeout_ms.unwrap_or(self.config.test_timeout_ms);
        self.grade_with_timeout(&request.source_code, &request.test_cases, timeout_ms)
            .await
    }

    #[instrument(
        skip(self, source_code, test_cases),
        fields(source_size = source_code.len(), test_count = test_cases.len())
    )]
    pub async fn grade_with_timeout(
        &self,
        source_code: &str,
        test_cases: &[TestCase],
        timeout_ms: u64,
    ) -> Result<Verdict, EngineError> {
        if timeout_ms == 0 {
            return Err(EngineError::InvalidTimeout);
        }

        let mut workspace = Workspace::acquire(&self.config.scratch_root).map_err(|e| {
            error!(error = %e, "Failed to allocate workspace");
            e
        })?;

        info!(token = %workspace.token(), "Grading submission");

        let verdict = match self
            .grade_in(&workspace, source_code, test_cases, timeout_ms)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(token = %workspace.token(), error = %e, "Grading aborted by infrastructure failure");
                verdict::aggregate(Vec::new(), Some(Failure::Internal), 0)
            }
        };

        // Drop would do this too; releasing here keeps the log ordering sane
        workspace.release();

        info!(
            status = %verdict.status(),
            execution_ms = verdict.execution_time_ms(),
            results = verdict.test_case_results().len(),
            "Grading completed"
        );

        Ok(verdict)
    }

    async fn grade_in(
        &self,
        workspace: &Workspace,
        source_code: &str,
        test_cases: &[TestCase],
        timeout_ms: u64,
    ) -> Result<Verdict, EngineError> {
        if source_code.len() > self.config.max_source_bytes {
            warn!(
                source_size = source_code.len(),
                limit = self.config.max_source_bytes,
                "Source code too large"
            );
            let failure = Failure::Compile(format!(
                "Source code exceeds maximum size of {} bytes",
                self.config.max_source_bytes
            ));
            return Ok(verdict::aggregate(Vec::new(), Some(failure), 0));
        }

        let outcome = compiler::compile(
            self.toolchain.as_ref(),
            workspace,
            source_code,
            Limits::new(self.config.compile_timeout_ms, self.config.max_output_bytes),
        )
        .await?;

        if !outcome.success {
            let failure = Failure::Compile(outcome.diagnostics);
            return Ok(verdict::aggregate(Vec::new(), Some(failure), 0));
        }

        // Timing covers test execution only, not compilation
        let start = Instant::now();
        let limits = Limits::new(timeout_ms, self.config.max_output_bytes);
        let evaluation =
            evaluator::evaluate(self.toolchain.as_ref(), workspace, test_cases, limits).await?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        Ok(verdict::aggregate(
            evaluation.results,
            evaluation.failure,
            execution_time_ms,
        ))
    }
}
