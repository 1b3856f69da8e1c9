//! # Worker specification.
//!
//! [`WorkerSpec`] bundles everything needed to launch the worker: the
//! executable path and its argument list. A spec is immutable for the lifetime
//! of one process; swapping arguments (donation window) builds a new spec.
//!
//! [`ArgSnapshot`] is the depth-one stack used to put the user's arguments
//! back after the donation window.

use std::fmt;
use std::path::{Path, PathBuf};

/// Executable + arguments of the supervised worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSpec {
    path: PathBuf,
    args: Vec<String>,
}

impl WorkerSpec {
    /// Creates a spec from an already split argument list.
    pub fn new(path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }

    /// Creates a spec from a single argument string.
    ///
    /// The string is split on spaces, empty pieces are dropped. Quoting is not
    /// interpreted.
    ///
    /// ```
    /// use rigvisor::WorkerSpec;
    ///
    /// let spec = WorkerSpec::from_arg_string("/opt/rigs/ethash.rn", "-P  stratum://pool:4444 -R");
    /// assert_eq!(spec.args(), ["-P", "stratum://pool:4444", "-R"]);
    /// ```
    pub fn from_arg_string(path: impl Into<PathBuf>, args: &str) -> Self {
        Self::new(path, split_args(args))
    }

    /// Executable path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Argument list.
    #[inline]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Same executable, different arguments.
    pub fn with_args(&self, args: Vec<String>) -> Self {
        Self {
            path: self.path.clone(),
            args,
        }
    }
}

impl fmt::Display for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Splits a space-separated argument string, dropping empty pieces.
pub fn split_args(args: &str) -> Vec<String> {
    args.split(' ')
        .filter(|a| !a.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Depth-one stack of saved arguments.
///
/// `save` refuses to overwrite an existing snapshot, so a second donation
/// window can never clobber the user's original arguments.
#[derive(Debug, Default)]
pub struct ArgSnapshot {
    saved: Option<Vec<String>>,
}

impl ArgSnapshot {
    /// Saves `args`; returns `false` (and keeps the old snapshot) if one is held.
    pub fn save(&mut self, args: &[String]) -> bool {
        if self.saved.is_some() {
            return false;
        }
        self.saved = Some(args.to_vec());
        true
    }

    /// Takes the saved arguments, leaving the stack empty.
    pub fn restore(&mut self) -> Option<Vec<String>> {
        self.saved.take()
    }

    /// Drops the snapshot without restoring it.
    pub fn clear(&mut self) {
        self.saved = None;
    }

    #[inline]
    pub fn is_saved(&self) -> bool {
        self.saved.is_some()
    }
}
