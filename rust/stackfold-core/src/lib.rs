//! Stackfold Core
//!
//! Parses JVM thread dumps (`jstack` output or `ThreadMXBean` dumps), folds
//! known stack segments into single synthetic frames, and renders a report
//! where threads with identical traces are printed once.

pub mod folding;
pub mod grammar;
pub mod model;
pub mod parser;
pub mod render;

pub use folding::{FoldingRule, RuleSet};
pub use model::{LockRef, StackElement, ThreadHeader, ThreadRecord, VmState};
pub use parser::{parse_dump, parse_dump_str};
pub use render::{build_report, render_report, render_text, RenderOptions, TraceGroup};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackfoldError {
    #[error("line {line}: expected stack frame but got: {text}")]
    MalformedFrame { line: usize, text: String },
    #[error("line {line}: thread \"{thread}\" is waiting on multiple locks")]
    MultipleWaitTargets { thread: String, line: usize },
    #[error("rule line {line}: expected stack frame but got: {text}")]
    MalformedRule { line: usize, text: String },
    #[error("rule line {line}: replacement frame '{text}' has no segment")]
    EmptyRule { line: usize, text: String },
}

/// Parse `dump`, fold it with `rules`, and render the text report.
pub fn fold_dump(
    dump: &str,
    rules: &RuleSet,
    options: &RenderOptions,
) -> Result<String, StackfoldError> {
    let threads = parse_dump_str(dump, rules)?;
    Ok(render_report(&threads, options))
}
