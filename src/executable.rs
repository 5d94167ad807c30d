use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Locates toolchain executables on a fixed list of search directories.
///
/// Detectors probe through this instead of the ambient `PATH` so tests can
/// simulate a missing toolchain by handing in an empty list.
#[derive(Debug, Clone)]
pub struct ExecutableFinder {
    paths: Vec<PathBuf>,
}

impl ExecutableFinder {
    /// Build a finder from the current `PATH`.
    pub fn from_env() -> Self {
        let paths = std::env::var_os("PATH")
            .map(|raw| std::env::split_paths(&raw).collect())
            .unwrap_or_default();
        ExecutableFinder { paths }
    }

    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        ExecutableFinder { paths }
    }

    /// Find the first directory on the search path containing `name`.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        self.paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

/// One external process invocation: program, working directory, argument
/// list, and environment overrides.
#[derive(Debug, Clone)]
pub struct Executable {
    pub program: PathBuf,
    pub working_directory: PathBuf,
    pub arguments: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Executable {
    pub fn new(program: impl Into<PathBuf>, working_directory: &Path) -> Self {
        Executable {
            program: program.into(),
            working_directory: working_directory.to_path_buf(),
            arguments: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Captured result of an external process run.
#[derive(Debug, Clone)]
pub struct ExecutableOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ExecutableOutput {
    /// Exit code zero and no timeout. Anything else signals a failed
    /// extraction, never a fault.
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs external processes with a caller-supplied timeout.
///
/// On timeout the child is killed and the captured output so far is
/// returned with `timed_out` set; the caller records a failed extraction.
#[derive(Debug, Clone)]
pub struct ExecutableRunner {
    pub timeout: Duration,
}

impl ExecutableRunner {
    pub fn new(timeout: Duration) -> Self {
        ExecutableRunner { timeout }
    }

    pub fn run(&self, executable: &Executable) -> Result<ExecutableOutput, String> {
        let mut command = Command::new(&executable.program);
        command
            .args(&executable.arguments)
            .current_dir(&executable.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &executable.env {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| format!("failed to start {}: {}", executable.program.display(), e))?;

        let stdout_handle = child.stdout.take().map(spawn_reader);
        let stderr_handle = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + self.timeout;
        let mut timed_out = false;
        let exit_status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        timed_out = true;
                        break None;
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
                Err(e) => return Err(format!("failed to wait on child: {}", e)),
            }
        };

        let stdout = stdout_handle.map(join_reader).unwrap_or_default();
        let stderr = stderr_handle.map(join_reader).unwrap_or_default();

        Ok(ExecutableOutput {
            exit_code: exit_status.and_then(|s| s.code()),
            stdout,
            stderr,
            timed_out,
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = source.read_to_end(&mut buffer);
        buffer
    })
}

fn join_reader(handle: std::thread::JoinHandle<Vec<u8>>) -> String {
    handle
        .join()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finder_empty_paths_finds_nothing() {
        let finder = ExecutableFinder::with_paths(Vec::new());
        assert!(finder.find("sh").is_none());
    }

    #[test]
    fn test_finder_locates_file_on_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sometool"), "#!/bin/sh\n").unwrap();
        let finder = ExecutableFinder::with_paths(vec![dir.path().to_path_buf()]);
        assert!(finder.find("sometool").is_some());
        assert!(finder.find("othertool").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ExecutableRunner::new(Duration::from_secs(10));
        let exe = Executable::new("/bin/sh", dir.path())
            .arg("-c")
            .arg("printf out; printf err 1>&2");
        let output = runner.run(&exe).unwrap();
        assert!(output.succeeded());
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_nonzero_exit_is_not_success() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ExecutableRunner::new(Duration::from_secs(10));
        let exe = Executable::new("/bin/sh", dir.path()).arg("-c").arg("exit 3");
        let output = runner.run(&exe).unwrap();
        assert!(!output.succeeded());
        assert_eq!(output.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_kills_on_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ExecutableRunner::new(Duration::from_millis(100));
        let exe = Executable::new("/bin/sh", dir.path()).arg("-c").arg("sleep 30");
        let output = runner.run(&exe).unwrap();
        assert!(output.timed_out);
        assert!(!output.succeeded());
    }
}
