use std::process::Command;

use serde::Serialize;

/// Fully resolved renderer invocation.
///
/// The same contract is spawned locally or embedded into a VM startup script; only the paths
/// inside it differ.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ExecutionContract {
    /// Renderer executable.
    pub program: String,
    /// Scene/base file opened before the script runs, if any.
    pub scene: Option<String>,
    /// Script run by the renderer.
    pub script: String,
    /// Flags passed to the script after `--`.
    pub script_args: Vec<String>,
}

impl ExecutionContract {
    /// Arguments after the program, in invocation order.
    pub fn args(&self) -> Vec<&str> {
        let mut args = Vec::with_capacity(4 + self.script_args.len());
        if let Some(scene) = self.scene.as_deref() {
            args.push(scene);
        }
        args.extend(["--background", "--python", self.script.as_str(), "--"]);
        args.extend(self.script_args.iter().map(String::as_str));
        args
    }

    /// Build a process command for local execution. Stdio is left to the caller.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args());
        cmd
    }

    /// Render as a single POSIX shell line with every word quoted as needed.
    pub fn shell_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args())
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Quote a word for POSIX `sh`, leaving plain words untouched.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(b, b'-' | b'_' | b'.' | b'/' | b'=' | b':' | b',' | b'+' | b'@' | b'%')
        });
    if plain {
        return word.to_owned();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}
