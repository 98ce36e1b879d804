//! External tool invocation.
//!
//! Every tool call is an explicit argument vector; nothing passes through a
//! shell. Exit status, stdout and stderr come back as separate observables
//! and each caller decides what counts as failure for its tool.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Value of a `--name=value` style argument, if present.
    pub fn flag_value(&self, name: &str) -> Option<&str> {
        let prefix = format!("{name}=");
        self.args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn exited_ok(&self) -> bool {
        self.code == Some(0)
    }

    /// Fail on a non-zero exit, or on any stderr text even after a clean exit.
    pub fn require_clean(self, program: &str) -> Result<Self, ToolError> {
        if !self.exited_ok() {
            return Err(ToolError::ExitStatus {
                program: program.to_string(),
                code: self.code,
                stderr: self.stderr,
            });
        }
        if !self.stderr.trim().is_empty() {
            return Err(ToolError::Stderr {
                program: program.to_string(),
                stderr: self.stderr,
            });
        }
        Ok(self)
    }

    /// Fail only on a non-zero exit.
    pub fn require_success(self, program: &str) -> Result<Self, ToolError> {
        if self.exited_ok() {
            Ok(self)
        } else {
            Err(ToolError::ExitStatus {
                program: program.to_string(),
                code: self.code,
                stderr: self.stderr,
            })
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    ExitStatus {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} reported errors")]
    Stderr { program: String, stderr: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Raw text from the failing process, for the caller to show.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            ToolError::ExitStatus { stderr, .. } | ToolError::Stderr { stderr, .. } => {
                let trimmed = stderr.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            ToolError::Spawn { .. } | ToolError::Io { .. } => None,
        }
    }
}

/// Runs external programs to completion.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}
