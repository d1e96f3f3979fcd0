use std::io::{BufRead as _, BufReader, Read};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::command::contract::ExecutionContract;
use crate::foundation::error::{ProcessFailure, RenderError, RenderResult};

/// Forward-only stream of renderer output lines.
///
/// Each item is a line or the terminal failure. After the last item the stream returns
/// `None` forever.
pub type RenderLines = Box<dyn Iterator<Item = RenderResult<String>> + Send>;

/// Seam between the dispatcher and whatever actually runs a contract.
pub trait ContractRunner: Send + Sync {
    /// Start the contract and return its output stream.
    ///
    /// Consuming the stream to the end blocks until the work finishes; a failure is reported
    /// as the final item.
    fn run(&self, contract: &ExecutionContract) -> RenderResult<RenderLines>;
}

/// Runs contracts as child processes on this machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create an executor.
    pub fn new() -> Self {
        Self
    }

    /// Spawn exactly one child process for `contract`.
    pub fn spawn(&self, contract: &ExecutionContract) -> RenderResult<OutputLines> {
        tracing::info!(program = %contract.program, "starting local renderer");
        tracing::debug!(command = %contract.shell_line(), "renderer command");

        let mut cmd = contract.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so cancellation also reaches wrapper-script grandchildren.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

        let mut child = cmd.spawn().map_err(|e| {
            let failure = if e.kind() == std::io::ErrorKind::NotFound {
                ProcessFailure::ExecutableMissing(contract.program.clone())
            } else {
                ProcessFailure::Io(format!("failed to spawn '{}': {e}", contract.program))
            };
            RenderError::RenderProcess(failure)
        })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx.clone()));
        }
        drop(tx);

        Ok(OutputLines {
            program: contract.program.clone(),
            child: Arc::new(Mutex::new(Some(child))),
            rx,
            readers,
            finished: false,
        })
    }
}

impl ContractRunner for LocalExecutor {
    fn run(&self, contract: &ExecutionContract) -> RenderResult<RenderLines> {
        Ok(Box::new(self.spawn(contract)?))
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    tx: Sender<std::io::Result<String>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    })
}

/// Merged stdout/stderr of one renderer process, in arrival order.
///
/// Dropping the stream before it is exhausted kills the process.
pub struct OutputLines {
    program: String,
    child: Arc<Mutex<Option<Child>>>,
    rx: Receiver<std::io::Result<String>>,
    readers: Vec<JoinHandle<()>>,
    finished: bool,
}

impl std::fmt::Debug for OutputLines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputLines")
            .field("program", &self.program)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Handle that terminates a running renderer from another thread.
#[derive(Clone)]
pub struct CancelHandle {
    child: Arc<Mutex<Option<Child>>>,
}

impl CancelHandle {
    /// Kill the renderer and everything it started. The stream then ends with a process
    /// failure.
    pub fn cancel(&self) {
        if let Some(child) = lock(&self.child).as_mut() {
            kill_tree(child);
            tracing::info!(pid = child.id(), "renderer cancelled");
        }
    }
}

/// Kill the child's process group, then the child itself.
///
/// The caller holds the child lock, so the group leader is not reaped yet and its id cannot
/// have been reused.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child.id());
    if let Err(e) = child.kill() {
        tracing::debug!("renderer already exited: {e}");
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let result = std::process::Command::new("kill")
        .args(["-KILL", "--", &format!("-{pgid}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match result {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::debug!(pgid, %status, "process group already gone"),
        Err(e) => tracing::warn!(pgid, error = %e, "failed to signal renderer process group"),
    }
}

impl OutputLines {
    /// Handle for cancelling this process while the stream is being consumed.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            child: Arc::clone(&self.child),
        }
    }

    /// Kill the child process.
    pub fn cancel(&self) {
        self.cancel_handle().cancel();
    }

    fn finish(&mut self) -> RenderResult<()> {
        for reader in self.readers.drain(..) {
            if reader.join().is_err() {
                tracing::warn!("renderer output reader panicked");
            }
        }
        let Some(mut child) = lock(&self.child).take() else {
            return Err(RenderError::RenderProcess(ProcessFailure::Io(
                "renderer process already reaped".to_owned(),
            )));
        };
        let status = child.wait().map_err(|e| {
            RenderError::RenderProcess(ProcessFailure::Io(format!(
                "failed to wait for '{}': {e}",
                self.program
            )))
        })?;
        exit_status_to_result(status)
    }
}

fn exit_status_to_result(status: ExitStatus) -> RenderResult<()> {
    if status.success() {
        tracing::info!("renderer finished");
        return Ok(());
    }
    let failure = match status.code() {
        Some(code) => ProcessFailure::ExitCode(code),
        None => ProcessFailure::Signalled,
    };
    tracing::error!(%failure, "renderer failed");
    Err(RenderError::RenderProcess(failure))
}

impl Iterator for OutputLines {
    type Item = RenderResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.rx.recv() {
                Ok(Ok(line)) => {
                    let line = line.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    tracing::info!(target: "shotrender::renderer", "{line}");
                    return Some(Ok(line.to_owned()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("failed to read renderer output: {e}");
                }
                Err(_) => {
                    self.finished = true;
                    return self.finish().err().map(Err);
                }
            }
        }
    }
}

impl Drop for OutputLines {
    fn drop(&mut self) {
        let mut guard = lock(&self.child);
        if let Some(child) = guard.as_mut() {
            kill_tree(child);
            let _ = child.wait();
        }
        guard.take();
    }
}

fn lock(child: &Mutex<Option<Child>>) -> MutexGuard<'_, Option<Child>> {
    child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
