/// Compiler Invoker
///
/// Writes the prepared source into the workspace and runs the toolchain's
/// compile command under the bounded runner. A rejected source, a nonzero
/// compiler exit or a compiler timeout all yield `success = false` with the
/// diagnostics to show the submitter.

use crate::error::EngineError;
use crate::runner::{self, Limits};
use crate::toolchain::Toolchain;
use crate::workspace::Workspace;
use std::path::MAIN_SEPARATOR;
use tracing::{info, instrument, warn};

pub const COMPILE_TIMEOUT_MESSAGE: &str = "Timeout: Compilation took too long";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    pub success: bool,
    pub diagnostics: String,
}

impl CompileOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            diagnostics: String::new(),
        }
    }

    pub fn failure(diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostics: diagnostics.into(),
        }
    }
}

/// Strip the workspace location out of compiler output so host paths never
/// reach the submitter.
pub fn scrub_paths(text: &str, workspace: &Workspace) -> String {
    let dir = workspace.dir().to_string_lossy();
    text.replace(&format!("{}{}", dir, MAIN_SEPARATOR), "")
        .replace(&*dir, ".")
}

#[instrument(skip_all, fields(token = %workspace.token(), source_size = source_code.len()))]
pub async fn compile(
    toolchain: &dyn Toolchain,
    workspace: &Workspace,
    source_code: &str,
    limits: Limits,
) -> Result<CompileOutcome, EngineError> {
    let prepared = match toolchain.prepare_source(source_code, workspace) {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!(error = %e, "Source rejected before compilation");
            return Ok(CompileOutcome::failure(e.to_string()));
        }
    };

    workspace.write_file(&toolchain.source_file_name(workspace), &prepared)?;

    let command = toolchain.compile_command(workspace);
    let result = runner::run(&command, "", limits).await;

    if result.spawn_failed {
        return Err(EngineError::Spawn {
            program: command.program,
            message: result.stderr,
        });
    }

    if result.timed_out {
        warn!(timeout_ms = limits.timeout_ms, "Compilation timed out");
        return Ok(CompileOutcome::failure(COMPILE_TIMEOUT_MESSAGE));
    }

    if result.exit_code != 0 {
        // javac reports on stderr; some compilers use stdout
        let raw = if result.stderr.trim().is_empty() {
            &result.stdout
        } else {
            &result.stderr
        };
        let diagnostics = scrub_paths(raw.trim_end(), workspace);

        warn!(
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            error_preview = diagnostics.lines().next().unwrap_or(""),
            "Compilation failed"
        );
        return Ok(CompileOutcome::failure(diagnostics));
    }

    info!(duration_ms = result.duration_ms, "Compilation succeeded");
    Ok(CompileOutcome::success())
}
