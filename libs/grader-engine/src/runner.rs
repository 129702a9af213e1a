/// Bounded Process Runner
///
/// Spawns one child process in its own process group, feeds it stdin,
/// drains stdout/stderr concurrently and races the whole thing against a
/// wall-clock timer.
///
/// **Outcomes (exactly one per call):**
/// - Process finishes first: real exit code and streams
/// - Timer fires first: the process group is SIGKILLed, partial output
///   discarded, `timed_out = true`, exit code `TIMEOUT_EXIT_CODE`
/// - A stream passes `max_output_bytes`: the process group is SIGKILLed,
///   `output_exceeded = true`, stderr `OUTPUT_LIMIT_MESSAGE`
/// - Spawn fails: `spawn_failed = true`, OS error as stderr

use crate::toolchain::CommandSpec;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, instrument, warn};

pub const TIMEOUT_MESSAGE: &str = "Timeout: Code execution took too long";
pub const OUTPUT_LIMIT_MESSAGE: &str = "Output limit exceeded";
pub const TIMEOUT_EXIT_CODE: i32 = 124;
pub const KILLED_EXIT_CODE: i32 = 128 + 9;
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

/// Wall-clock and output bounds for one process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub timeout_ms: u64,
    /// Applied to stdout and stderr separately
    pub max_output_bytes: usize,
}

impl Limits {
    pub fn new(timeout_ms: u64, max_output_bytes: usize) -> Self {
        Self {
            timeout_ms,
            max_output_bytes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub output_exceeded: bool,
    /// The process could not be started or waited on; nothing the
    /// submission did caused this
    pub spawn_failed: bool,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.timed_out && !self.output_exceeded && !self.spawn_failed
    }

    fn timeout(duration_ms: u64) -> Self {
        Self {
            exit_code: TIMEOUT_EXIT_CODE,
            stderr: TIMEOUT_MESSAGE.to_string(),
            timed_out: true,
            duration_ms,
            ..Self::default()
        }
    }

    fn output_exceeded(limit: usize, duration_ms: u64) -> Self {
        Self {
            exit_code: KILLED_EXIT_CODE,
            stderr: format!("{} ({} bytes)", OUTPUT_LIMIT_MESSAGE, limit),
            output_exceeded: true,
            duration_ms,
            ..Self::default()
        }
    }

    fn spawn_failure(message: String, duration_ms: u64) -> Self {
        Self {
            exit_code: SPAWN_FAILURE_EXIT_CODE,
            stderr: message,
            spawn_failed: true,
            duration_ms,
            ..Self::default()
        }
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

#[derive(Debug)]
struct OutputLimitExceeded;

async fn drain<R: AsyncRead + Unpin>(
    pipe: Option<&mut R>,
    limit: usize,
) -> Result<String, OutputLimitExceeded> {
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        // one byte past the limit separates an exact fit from an overflow
        let mut bounded = pipe.take(limit as u64 + 1);
        if let Err(e) = bounded.read_to_end(&mut buf).await {
            debug!(error = %e, "Failed to read child output");
        }
    }
    if buf.len() > limit {
        return Err(OutputLimitExceeded);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// SIGKILL every process in the group led by `pid`
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_group(pid);
    // reaps the direct child; a no-op signal if the group kill got it
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill process");
    }
}

enum Completion {
    Exited {
        stdout: String,
        stderr: String,
        status: std::io::Result<ExitStatus>,
    },
    OutputExceeded,
}

/// Run `spec` with `stdin` as its input, bounded by `limits`.
///
/// Never fails: every problem is folded into the returned result.
#[instrument(skip(spec, stdin), fields(program = %spec.program, stdin_len = stdin.len()))]
pub async fn run(spec: &CommandSpec, stdin: &str, limits: Limits) -> ExecutionResult {
    let start = Instant::now();

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Leader of a fresh group, so descendants die with it
    #[cfg(unix)]
    command.process_group(0);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, "Failed to spawn process");
            return ExecutionResult::spawn_failure(e.to_string(), start.elapsed().as_millis() as u64);
        }
    };
    let pid = child.id();

    let stdin_pipe = child.stdin.take();
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let input = stdin.as_bytes();
    let limit = limits.max_output_bytes;

    let feed = async move {
        if let Some(mut pipe) = stdin_pipe {
            if !input.is_empty() {
                // The child may exit without reading everything
                if let Err(e) = pipe.write_all(input).await {
                    debug!(error = %e, "Child closed stdin early");
                }
            }
            // dropping the pipe delivers EOF
        }
        Ok::<(), OutputLimitExceeded>(())
    };

    let completion = async {
        // try_join stops draining as soon as either stream overflows
        match tokio::try_join!(
            feed,
            drain(stdout_pipe.as_mut(), limit),
            drain(stderr_pipe.as_mut(), limit),
        ) {
            Ok(((), stdout, stderr)) => Completion::Exited {
                stdout,
                stderr,
                status: child.wait().await,
            },
            Err(OutputLimitExceeded) => Completion::OutputExceeded,
        }
    };

    // `timeout` resolves once, either with the completed future or with
    // the elapsed error; the losing side is dropped, never observed.
    let outcome = tokio::time::timeout(Duration::from_millis(limits.timeout_ms), completion).await;

    match outcome {
        Ok(Completion::Exited {
            stdout,
            stderr,
            status: Ok(status),
        }) => {
            // background descendants do not outlive the run
            kill_group(pid);
            let result = ExecutionResult {
                exit_code: exit_code_of(status),
                stdout,
                stderr,
                duration_ms: start.elapsed().as_millis() as u64,
                ..ExecutionResult::default()
            };
            debug!(
                exit_code = result.exit_code,
                duration_ms = result.duration_ms,
                "Process exited"
            );
            result
        }
        Ok(Completion::Exited { status: Err(e), .. }) => {
            warn!(error = %e, "Failed to wait for process");
            terminate(&mut child, pid).await;
            ExecutionResult::spawn_failure(e.to_string(), start.elapsed().as_millis() as u64)
        }
        Ok(Completion::OutputExceeded) => {
            terminate(&mut child, pid).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            warn!(limit, duration_ms, "Process exceeded output limit and was killed");
            ExecutionResult::output_exceeded(limit, duration_ms)
        }
        Err(_) => {
            terminate(&mut child, pid).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            warn!(timeout_ms = limits.timeout_ms, duration_ms, "Process timed out and was killed");
            ExecutionResult::timeout(duration_ms)
        }
    }
}
