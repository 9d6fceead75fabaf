//! Thread dump parser.
//!
//! Walks the dump with a one-line lookahead cursor. Every header line opens
//! a thread block; the block runs until a blank line or the next header.
//! Lines outside any block (banners, `JNI global references`, lock summaries)
//! are skipped.

use crate::folding::RuleSet;
use crate::grammar;
use crate::model::{ThreadHeader, ThreadRecord};
use crate::StackfoldError;
use indexmap::IndexSet;
use tracing::{debug, trace};

/// Thread name fragment whose blocks carry one extra non-frame line
/// (`No compile task`) right after the header.
const COMPILER_THREAD: &str = "CompilerThread";

/// Cursor over dump lines with one line of lookahead. Line numbers are
/// 1-based.
struct LineCursor<'a, S> {
    lines: &'a [S],
    pos: usize,
}

impl<'a, S: AsRef<str>> LineCursor<'a, S> {
    fn new(lines: &'a [S]) -> Self {
        Self { lines, pos: 0 }
    }

    fn peek(&self) -> Option<(usize, &'a str)> {
        self.lines.get(self.pos).map(|l| (self.pos + 1, l.as_ref()))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let line = self.peek()?;
        self.advance();
        Some(line)
    }
}

/// Parse a whole dump, folding each trace with `rules`.
///
/// Records are kept in first-seen order; a thread identical in every field
/// to one already seen is dropped.
pub fn parse_dump<S: AsRef<str>>(
    lines: &[S],
    rules: &RuleSet,
) -> Result<IndexSet<ThreadRecord>, StackfoldError> {
    let mut cursor = LineCursor::new(lines);
    let mut threads = IndexSet::new();
    let mut skipped = 0usize;

    while let Some((line_no, line)) = cursor.next_line() {
        let Some(header) = grammar::parse_header(line.trim_end()) else {
            if !line.trim().is_empty() {
                trace!(line = line_no, "skipping line outside thread block");
                skipped += 1;
            }
            continue;
        };
        let record = extract_thread(header, &mut cursor, rules)?;
        if !threads.insert(record) {
            debug!(line = line_no, "collapsed identical thread");
        }
    }

    debug!(threads = threads.len(), skipped, "parsed thread dump");
    Ok(threads)
}

/// Convenience wrapper over [`parse_dump`] for a dump held in one string.
pub fn parse_dump_str(
    text: &str,
    rules: &RuleSet,
) -> Result<IndexSet<ThreadRecord>, StackfoldError> {
    let lines: Vec<&str> = text.lines().collect();
    parse_dump(&lines, rules)
}

fn extract_thread<S: AsRef<str>>(
    header: ThreadHeader,
    cursor: &mut LineCursor<'_, S>,
    rules: &RuleSet,
) -> Result<ThreadRecord, StackfoldError> {
    let mut vm_state = None;
    if let Some((_, line)) = cursor.peek() {
        if let Some(state) = grammar::parse_state_line(line.trim()) {
            if state.is_none() {
                debug!(thread = %header.name, line = line.trim(), "unrecognized thread state");
            }
            vm_state = state;
            cursor.advance();
        }
    }

    let stop_after_state = header.name.contains(COMPILER_THREAD);
    let mut waiting_on = None;
    let mut pending_locks = Vec::new();
    let mut raw_trace = Vec::new();

    while let Some((line_no, line)) = cursor.peek() {
        let line = line.trim();
        if stop_after_state || line.is_empty() || grammar::is_header(line) {
            break;
        }

        if !line.starts_with('-') {
            let frame = grammar::parse_frame(line).ok_or_else(|| StackfoldError::MalformedFrame {
                line: line_no,
                text: line.to_string(),
            })?;
            raw_trace.push(frame.with_locks(std::mem::take(&mut pending_locks)));
        } else if let Some(target) = grammar::parse_wait_on(line) {
            if waiting_on.is_some() {
                return Err(StackfoldError::MultipleWaitTargets {
                    thread: header.name,
                    line: line_no,
                });
            }
            waiting_on = Some(target);
        } else if let Some(lock) = grammar::parse_locked(line) {
            pending_locks.push(lock);
        } else {
            trace!(line = line_no, "ignoring annotation");
        }

        cursor.advance();
    }

    let trace = rules.apply(raw_trace);
    Ok(ThreadRecord::new(header, vm_state, waiting_on, trace))
}
