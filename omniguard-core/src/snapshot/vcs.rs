//! Version-control queries used to avoid copying tracked files.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{path} is outside repository root {root}")]
    OutsideRepository { path: PathBuf, root: PathBuf },
}

/// Queries against the repository that contains a file.
pub trait VersionControl {
    /// Whether the file is tracked. `Ok(false)` outside a repository.
    fn is_tracked(&self, path: &Path) -> Result<bool, VcsError>;

    /// Object id of the file's committed version at `HEAD`, if it has one.
    fn blob_ref(&self, path: &Path) -> Result<Option<String>, VcsError>;

    /// Bytes of a stored object, looked up from `cwd` when given.
    fn cat_blob(&self, blob_ref: &str, cwd: Option<&Path>) -> Result<Vec<u8>, VcsError>;
}

/// The `git` command line, each call bounded by a timeout.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
}

struct GitOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<GitOutput, VcsError> {
        let command = format!("git {}", args.join(" "));
        let mut cmd = Command::new("git");
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| VcsError::Spawn {
            command: command.clone(),
            source,
        })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_deadline(&mut child, self.timeout).map_err(|source| {
            VcsError::Spawn {
                command: command.clone(),
                source,
            }
        })?;
        let Some(status) = status else {
            debug!(%command, timeout = ?self.timeout, "git command timed out");
            return Err(VcsError::TimedOut {
                command,
                timeout: self.timeout,
            });
        };

        Ok(GitOutput {
            status,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }

    fn repository_root(&self, dir: &Path) -> Result<Option<PathBuf>, VcsError> {
        let output = self.run(&["rev-parse", "--show-toplevel"], Some(dir))?;
        if !output.status.success() {
            return Ok(None);
        }
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!root.is_empty()).then(|| PathBuf::from(root)))
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl VersionControl for GitCli {
    fn is_tracked(&self, path: &Path) -> Result<bool, VcsError> {
        let path_arg = path.to_string_lossy();
        let output = self.run(
            &["ls-files", "--error-unmatch", path_arg.as_ref()],
            Some(parent_dir(path)),
        )?;
        Ok(output.status.success())
    }

    fn blob_ref(&self, path: &Path) -> Result<Option<String>, VcsError> {
        let Some(root) = self.repository_root(parent_dir(path))? else {
            return Ok(None);
        };
        let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let root = root.canonicalize().unwrap_or(root);
        let relative = resolved
            .strip_prefix(&root)
            .map_err(|_| VcsError::OutsideRepository {
                path: resolved.clone(),
                root: root.clone(),
            })?;

        let spec = format!("HEAD:{}", relative.to_string_lossy());
        let output = self.run(&["rev-parse", &spec], Some(&root))?;
        if !output.status.success() {
            return Ok(None);
        }
        let blob = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!blob.is_empty()).then_some(blob))
    }

    fn cat_blob(&self, blob_ref: &str, cwd: Option<&Path>) -> Result<Vec<u8>, VcsError> {
        let output = self.run(&["cat-file", "-p", blob_ref], cwd)?;
        if !output.status.success() {
            return Err(VcsError::Failed {
                command: format!("git cat-file -p {blob_ref}"),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Read a pipe to the end on a helper thread so a chatty child never blocks
/// on a full pipe while we poll it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}

/// `Ok(None)` when the deadline passed; the child is killed and reaped.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
