//! Grouping and report rendering.
//!
//! Threads are first grouped by folded trace, then inside each trace group by
//! name pattern (digit runs masked). The text report prints each trace group
//! as a block of names followed by the shared frames:
//!
//! ```text
//! http-worker-* (3 threads)
//! main
//!     at java.lang.Thread.sleep(Native Method)
//!     at com.example.Main.main(Main.java:12)
//!
//! ```

use crate::model::{StackElement, ThreadRecord};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::hash::Hash;

/// A trace group with this many distinct name patterns is summarized as a
/// bare thread count.
pub const DEFAULT_MAX_NAME_PATTERNS: usize = 50;

/// Knobs for report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub max_name_patterns: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_name_patterns: DEFAULT_MAX_NAME_PATTERNS,
        }
    }
}

/// Threads sharing one name pattern inside a trace group.
#[derive(Debug, Clone, Serialize)]
pub struct NameGroup<'a> {
    pub pattern: String,
    pub threads: Vec<&'a str>,
}

impl NameGroup<'_> {
    /// The line printed for this group: the literal name for a single
    /// thread, `pattern (N threads)` otherwise.
    pub fn label(&self) -> String {
        match self.threads.as_slice() {
            [single] => (*single).to_string(),
            threads => format!("{} ({} threads)", self.pattern, threads.len()),
        }
    }
}

/// Threads sharing one folded trace.
#[derive(Debug, Clone, Serialize)]
pub struct TraceGroup<'a> {
    pub thread_count: usize,
    /// True when the group had too many name patterns to list.
    pub summarized: bool,
    /// Ordered by pattern; empty when `summarized` is set.
    pub name_groups: Vec<NameGroup<'a>>,
    pub trace: &'a [StackElement],
}

/// Group items by a key, keeping keys in first-seen order and items in
/// input order within each key.
pub fn group_by<'a, T, K, F>(
    items: impl IntoIterator<Item = &'a T>,
    key: F,
) -> IndexMap<K, Vec<&'a T>>
where
    T: 'a,
    K: Hash + Eq,
    F: Fn(&'a T) -> K,
{
    let mut groups: IndexMap<K, Vec<&'a T>> = IndexMap::new();
    for item in items {
        groups.entry(key(item)).or_default().push(item);
    }
    groups
}

/// Build the grouped report model for a set of threads.
///
/// Trace groups come out in the order their first thread appears in
/// `threads`.
pub fn build_report<'a>(
    threads: impl IntoIterator<Item = &'a ThreadRecord>,
    options: &RenderOptions,
) -> Vec<TraceGroup<'a>> {
    group_by(threads, ThreadRecord::trace)
        .into_iter()
        .map(|(trace, members)| {
            let by_pattern: BTreeMap<String, Vec<&'a ThreadRecord>> =
                members.iter().fold(BTreeMap::new(), |mut acc, thread| {
                    acc.entry(thread.name_pattern()).or_default().push(*thread);
                    acc
                });

            let summarized = by_pattern.len() >= options.max_name_patterns;
            let name_groups = if summarized {
                Vec::new()
            } else {
                by_pattern
                    .into_iter()
                    .map(|(pattern, threads)| {
                        let mut names: Vec<&'a str> = threads.iter().map(|t| t.name()).collect();
                        names.sort_unstable();
                        NameGroup {
                            pattern,
                            threads: names,
                        }
                    })
                    .collect()
            };

            TraceGroup {
                thread_count: members.len(),
                summarized,
                name_groups,
                trace,
            }
        })
        .collect()
}

/// Render the text report. Every group, the last one included, ends with a
/// blank line.
pub fn render_text(groups: &[TraceGroup<'_>]) -> String {
    let mut out = String::new();
    for group in groups {
        if group.summarized {
            let _ = writeln!(out, "{} threads", group.thread_count);
        } else {
            for names in &group.name_groups {
                let _ = writeln!(out, "{}", names.label());
            }
        }
        for element in group.trace {
            let _ = writeln!(out, "    at {}", element);
        }
        out.push('\n');
    }
    out
}

/// Group `threads` and render the text report in one step.
pub fn render_report<'a>(
    threads: impl IntoIterator<Item = &'a ThreadRecord>,
    options: &RenderOptions,
) -> String {
    render_text(&build_report(threads, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_frame;
    use crate::model::ThreadHeader;

    fn thread(name: &str, id: &str, trace: &[&str]) -> ThreadRecord {
        ThreadRecord::new(
            ThreadHeader {
                name: name.to_string(),
                daemon: false,
                priority: "5".to_string(),
                thread_id: id.to_string(),
                native_id: "0x0".to_string(),
                state_message: "runnable".to_string(),
            },
            None,
            None,
            trace.iter().map(|f| parse_frame(f).expect("frame")).collect(),
        )
    }

    #[test]
    fn group_by_keeps_first_seen_order() {
        let items = vec![3, 1, 4, 1, 5, 9, 2, 6];
        let groups = group_by(&items, |n| n % 2);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec![1, 0]);
        assert_eq!(groups[&1], vec![&3, &1, &1, &5, &9]);
        assert_eq!(groups[&0], vec![&4, &2, &6]);
    }

    #[test]
    fn pool_threads_collapse_into_pattern() {
        let threads = vec![
            thread("worker-3", "1", &["a.W.run(W.java:1)"]),
            thread("worker-17", "2", &["a.W.run(W.java:1)"]),
        ];
        let report = render_report(&threads, &RenderOptions::default());
        assert_eq!(report, "worker-* (2 threads)\n    at a.W.run(W.java:1)\n\n");
    }

    #[test]
    fn single_thread_prints_literal_name() {
        let threads = vec![thread("worker-3", "1", &["a.W.run"])];
        let report = render_report(&threads, &RenderOptions::default());
        assert_eq!(report, "worker-3\n    at a.W.run\n\n");
    }

    #[test]
    fn patterns_are_sorted_within_group() {
        let threads = vec![
            thread("main", "1", &[]),
            thread("Signal Dispatcher", "2", &[]),
            thread("C2 CompilerThread1", "3", &[]),
            thread("C1 CompilerThread0", "4", &[]),
            thread("Attach Listener", "5", &[]),
        ];
        let report = render_report(&threads, &RenderOptions::default());
        assert_eq!(
            report,
            "Attach Listener\nC* CompilerThread* (2 threads)\nSignal Dispatcher\nmain\n\n"
        );
    }

    #[test]
    fn different_traces_never_share_a_group() {
        let threads = vec![
            thread("a-1", "1", &["x.A.run"]),
            thread("b-1", "2", &["x.B.run"]),
            thread("a-2", "3", &["x.A.run(A.java:9)"]),
        ];
        let groups = build_report(&threads, &RenderOptions::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].thread_count, 2);
        assert_eq!(groups[0].name_groups[0].threads, vec!["a-1", "a-2"]);
        assert_eq!(groups[1].thread_count, 1);
        assert_eq!(
            render_text(&groups),
            "a-* (2 threads)\n    at x.A.run\n\nb-1\n    at x.B.run\n\n"
        );
    }

    #[test]
    fn many_patterns_are_summarized() {
        let names: Vec<String> = (0..60).map(|i| format!("t{}", "x".repeat(i + 1))).collect();
        let threads: Vec<ThreadRecord> = names
            .iter()
            .enumerate()
            .map(|(i, name)| thread(name, &i.to_string(), &["x.A.run"]))
            .collect();
        let groups = build_report(&threads, &RenderOptions::default());
        assert_eq!(groups.len(), 1);
        assert!(groups[0].summarized);
        assert!(groups[0].name_groups.is_empty());
        assert_eq!(render_text(&groups), "60 threads\n    at x.A.run\n\n");
    }

    #[test]
    fn threshold_is_inclusive() {
        let names: Vec<String> = (0..3).map(|i| format!("t{}", "x".repeat(i + 1))).collect();
        let threads: Vec<ThreadRecord> = names
            .iter()
            .enumerate()
            .map(|(i, name)| thread(name, &i.to_string(), &[]))
            .collect();

        let at_limit = RenderOptions { max_name_patterns: 3 };
        assert_eq!(render_report(&threads, &at_limit), "3 threads\n\n");

        let above = RenderOptions { max_name_patterns: 4 };
        assert_eq!(render_report(&threads, &above), "tx\ntxx\ntxxx\n\n");
    }

    #[test]
    fn empty_input_renders_nothing() {
        let threads: Vec<ThreadRecord> = Vec::new();
        assert_eq!(render_report(&threads, &RenderOptions::default()), "");
    }

    #[test]
    fn report_model_serializes() {
        let threads = vec![
            thread("w-1", "1", &["a.W.run(W.java:4)"]),
            thread("w-2", "2", &["a.W.run"]),
        ];
        let groups = build_report(&threads, &RenderOptions::default());
        let json = serde_json::to_value(&groups).expect("serializes");
        assert_eq!(json[0]["thread_count"], 2);
        assert_eq!(json[0]["summarized"], false);
        assert_eq!(json[0]["name_groups"][0]["pattern"], "w-*");
        assert_eq!(json[0]["trace"][0]["class_name"], "a.W");
        assert_eq!(json[0]["trace"][0]["line_number"], 4);
    }
}
