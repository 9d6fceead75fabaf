//! Line grammars shared by the dump parser and the rule loader.
//!
//! Two header formats are recognized:
//!
//! ```text
//! "Signal Dispatcher" #4 daemon prio=9 os_prio=31 tid=0x00007fda14895800 nid=0x5003 runnable [0x0000000000000000]
//! "http-worker-560" Id=560 TIMED_WAITING on java.util.concurrent.SynchronousQueue$TransferStack@2a283975
//! ```
//!
//! The first is what `jstack` prints, the second what
//! `ThreadMXBean.dumpAllThreads` produces through `ThreadInfo.toString`.

use crate::model::{
    LockRef, StackElement, ThreadHeader, VmState, UNKNOWN_NATIVE_ID, UNKNOWN_PRIORITY,
};
use once_cell::sync::Lazy;
use regex::Regex;

const STATE_LABEL: &str = "java.lang.Thread.State:";

static JSTACK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^"(?P<name>.*)"\s*
        (?:\#\d+)?\s*
        (?P<daemon>daemon)?\s*
        (?:prio=(?P<priority>\d+))?\s*
        (?:os_prio=-?\d+)?\s*
        (?:cpu=\S+)?\s*
        (?:elapsed=\S+)?\s*
        tid=(?P<thread_id>\w+)\s*
        nid=(?P<native_id>\w+)\s*
        (?P<state_message>[^\[]*)
        (?:\[[^\]]*\])?$"#,
    )
    .expect("jstack header pattern")
});

static MXBEAN_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^"(?P<name>.*?)"\s+Id=(?P<thread_id>\d+)\s+(?P<state_message>.*)$"#)
        .expect("thread mxbean header pattern")
});

static FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        concat!(
            r"^(?:at\s+)?(?P<class>[^(]+)\.(?P<method>[^(]+)",
            r"(?:\((?P<file>[^:]+)(?::(?P<line>\d+))?\))?$",
        ),
    )
    .expect("stack frame pattern")
});

static WAIT_ON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^- parking to wait for\s+<(?P<id>\w+)> \(a (?P<type>\S+)\)$")
        .expect("wait annotation pattern")
});

static LOCKED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^- locked <(?P<id>\w+)> \(a (?P<type>\S+)\)$").expect("lock annotation pattern")
});

/// Match a thread header in either format.
pub fn parse_header(line: &str) -> Option<ThreadHeader> {
    if let Some(caps) = JSTACK_HEADER.captures(line) {
        return Some(ThreadHeader {
            name: caps["name"].to_string(),
            daemon: caps.name("daemon").is_some(),
            priority: caps
                .name("priority")
                .map_or(UNKNOWN_PRIORITY, |m| m.as_str())
                .to_string(),
            thread_id: caps["thread_id"].to_string(),
            native_id: caps["native_id"].to_string(),
            state_message: caps["state_message"].to_string(),
        });
    }
    MXBEAN_HEADER.captures(line).map(|caps| ThreadHeader {
        name: caps["name"].to_string(),
        daemon: false,
        priority: UNKNOWN_PRIORITY.to_string(),
        thread_id: caps["thread_id"].to_string(),
        native_id: UNKNOWN_NATIVE_ID.to_string(),
        state_message: caps["state_message"].to_string(),
    })
}

pub fn is_header(line: &str) -> bool {
    JSTACK_HEADER.is_match(line) || MXBEAN_HEADER.is_match(line)
}

/// Parse `class.method(file:line)` with the file and line optional.
///
/// Returns `None` when the line does not have the shape of a frame or the
/// line number does not fit in a `u64`.
pub fn parse_frame(line: &str) -> Option<StackElement> {
    let caps = FRAME.captures(line)?;
    let line_number = match caps.name("line") {
        Some(m) => Some(m.as_str().parse::<u64>().ok()?),
        None => None,
    };
    Some(StackElement::new(
        &caps["class"],
        &caps["method"],
        caps.name("file").map(|m| m.as_str().to_string()),
        line_number,
    ))
}

pub fn parse_wait_on(line: &str) -> Option<LockRef> {
    WAIT_ON
        .captures(line)
        .map(|caps| LockRef::new(&caps["id"], &caps["type"]))
}

pub fn parse_locked(line: &str) -> Option<LockRef> {
    LOCKED
        .captures(line)
        .map(|caps| LockRef::new(&caps["id"], &caps["type"]))
}

/// Recognize the `java.lang.Thread.State: NAME` line.
///
/// The outer `Option` says whether the line is a state line at all; the
/// inner one is `None` when the state name is not one we know.
pub fn parse_state_line(line: &str) -> Option<Option<VmState>> {
    let rest = line.strip_prefix(STATE_LABEL)?;
    let word = rest.split_whitespace().next().unwrap_or("");
    Some(word.parse::<VmState>().ok())
}
