//! Frame and thread records built by the dump parser.
//!
//! Records are immutable once constructed. The parser folds a trace before
//! it builds the [`ThreadRecord`] that holds it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use strum::{Display, EnumString};

/// Priority recorded when the header line carries none.
pub const UNKNOWN_PRIORITY: &str = "0";
/// Native id recorded for managed-bean dumps, which never print one.
pub const UNKNOWN_NATIVE_ID: &str = "x";

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new("[0-9]+").expect("digit pattern"));

// ---------------------------------------------------------------------------
// LockRef
// ---------------------------------------------------------------------------

/// A monitor or synchronizer named by a `- locked` or `- parking to wait for`
/// annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LockRef {
    pub lock_id: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl LockRef {
    pub fn new(lock_id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            lock_id: lock_id.into(),
            type_name: type_name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// VmState
// ---------------------------------------------------------------------------

/// Thread lifecycle state as printed on the `java.lang.Thread.State:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VmState {
    New,
    Runnable,
    Blocked,
    Waiting,
    TimedWaiting,
    Terminated,
}

// ---------------------------------------------------------------------------
// StackElement
// ---------------------------------------------------------------------------

/// One call frame.
///
/// Equality and hashing only look at the class and method name. File, line
/// and held locks are cosmetic, so folding rules written without them still
/// match real frames and threads that differ only in line numbers group
/// together.
#[derive(Debug, Clone, Serialize)]
pub struct StackElement {
    class_name: String,
    method: String,
    file: Option<String>,
    line_number: Option<u64>,
    locks: Vec<LockRef>,
}

impl StackElement {
    pub fn new(
        class_name: impl Into<String>,
        method: impl Into<String>,
        file: Option<String>,
        line_number: Option<u64>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method: method.into(),
            file,
            line_number,
            locks: Vec::new(),
        }
    }

    /// Attach the locks held while executing this frame.
    pub fn with_locks(mut self, locks: Vec<LockRef>) -> Self {
        self.locks = locks;
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn line_number(&self) -> Option<u64> {
        self.line_number
    }

    pub fn locks(&self) -> &[LockRef] {
        &self.locks
    }
}

impl PartialEq for StackElement {
    fn eq(&self, other: &Self) -> bool {
        self.class_name == other.class_name && self.method == other.method
    }
}

impl Eq for StackElement {}

impl Hash for StackElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class_name.hash(state);
        self.method.hash(state);
    }
}

/// Prints `class.method(file:line)`, dropping whatever parts are unknown.
impl fmt::Display for StackElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class_name, self.method)?;
        if let Some(file) = &self.file {
            write!(f, "({}", file)?;
            if let Some(line) = self.line_number {
                write!(f, ":{}", line)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ThreadRecord
// ---------------------------------------------------------------------------

/// Metadata captured from a thread header line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ThreadHeader {
    pub name: String,
    pub daemon: bool,
    pub priority: String,
    pub thread_id: String,
    pub native_id: String,
    pub state_message: String,
}

/// One thread from the dump: header metadata plus its (folded) trace.
///
/// Unlike [`StackElement`], equality covers every field, trace included, so
/// a set of records only collapses byte-identical threads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ThreadRecord {
    #[serde(flatten)]
    header: ThreadHeader,
    vm_state: Option<VmState>,
    waiting_on: Option<LockRef>,
    trace: Vec<StackElement>,
}

impl ThreadRecord {
    pub fn new(
        header: ThreadHeader,
        vm_state: Option<VmState>,
        waiting_on: Option<LockRef>,
        trace: Vec<StackElement>,
    ) -> Self {
        Self {
            header,
            vm_state,
            waiting_on,
            trace,
        }
    }

    pub fn header(&self) -> &ThreadHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn is_daemon(&self) -> bool {
        self.header.daemon
    }

    pub fn vm_state(&self) -> Option<VmState> {
        self.vm_state
    }

    pub fn waiting_on(&self) -> Option<&LockRef> {
        self.waiting_on.as_ref()
    }

    pub fn trace(&self) -> &[StackElement] {
        &self.trace
    }

    /// The thread name with every run of ASCII digits replaced by `*`.
    ///
    /// `worker-3` and `worker-17` both become `worker-*`.
    pub fn name_pattern(&self) -> String {
        name_pattern(&self.header.name)
    }
}

/// Mask digit runs in a thread name; see [`ThreadRecord::name_pattern`].
pub fn name_pattern(name: &str) -> String {
    DIGIT_RUN.replace_all(name, "*").into_owned()
}
