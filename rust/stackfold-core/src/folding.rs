//! Folding rules: collapse a known run of frames into one synthetic frame.
//!
//! A rule file is a sequence of blocks separated by blank lines. The first
//! line of a block is the replacement frame, the remaining lines are the
//! segment it stands in for, outermost call first:
//!
//! ```text
//! # idle pool worker
//! java.util.concurrent.ThreadPoolExecutor$Worker.run
//! java.util.concurrent.LinkedBlockingQueue.take
//! java.util.concurrent.ThreadPoolExecutor.getTask
//! java.util.concurrent.ThreadPoolExecutor.runWorker
//! java.util.concurrent.ThreadPoolExecutor$Worker.run
//! java.lang.Thread.run
//! ```
//!
//! Lines starting with `#` are comments.

use crate::grammar;
use crate::model::StackElement;
use crate::StackfoldError;
use std::fmt;
use tracing::debug;

const BUNDLED_RULES: &str = include_str!("../resources/folding.txt");

// ---------------------------------------------------------------------------
// FoldingRule
// ---------------------------------------------------------------------------

/// A non-empty frame segment and the frame that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldingRule {
    segment: Vec<StackElement>,
    replacement: StackElement,
}

impl FoldingRule {
    /// Build a rule; `None` if `segment` is empty.
    pub fn new(segment: Vec<StackElement>, replacement: StackElement) -> Option<Self> {
        if segment.is_empty() {
            return None;
        }
        Some(Self {
            segment,
            replacement,
        })
    }

    /// Replace the leftmost run of frames matching the segment with the
    /// replacement frame. At most one run is folded per call; a trace
    /// without a match comes back unchanged.
    pub fn fold_trace(&self, mut trace: Vec<StackElement>) -> Vec<StackElement> {
        let width = self.segment.len();
        let start = trace
            .windows(width)
            .position(|window| window == self.segment.as_slice());
        if let Some(start) = start {
            debug!(rule = %self.replacement, start, "folded segment");
            trace.splice(start..start + width, std::iter::once(self.replacement.clone()));
        }
        trace
    }
}

/// Writes the rule back in rule-file form, without a trailing blank line.
impl fmt::Display for FoldingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.replacement)?;
        for element in &self.segment {
            writeln!(f, "{}", element)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// An ordered list of folding rules. Rule order matters: each rule sees the
/// trace as left by the rules before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<FoldingRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rules shipped with the crate.
    pub fn bundled() -> Result<Self, StackfoldError> {
        Self::parse_str(BUNDLED_RULES)
    }

    pub fn parse_str(text: &str) -> Result<Self, StackfoldError> {
        let lines: Vec<&str> = text.lines().collect();
        Self::parse(&lines)
    }

    /// Parse rule-file lines into a rule set.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Self, StackfoldError> {
        let mut rules = Vec::new();
        let mut numbered = lines
            .iter()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.as_ref().trim()))
            .filter(|(_, line)| !line.starts_with('#'));

        while let Some((line_no, line)) = numbered.next() {
            if line.is_empty() {
                continue;
            }
            let replacement = parse_rule_frame(line_no, line)?;

            let mut segment = Vec::new();
            for (seg_no, seg_line) in numbered.by_ref() {
                if seg_line.is_empty() {
                    break;
                }
                segment.push(parse_rule_frame(seg_no, seg_line)?);
            }

            let rule =
                FoldingRule::new(segment, replacement).ok_or_else(|| StackfoldError::EmptyRule {
                    line: line_no,
                    text: line.to_string(),
                })?;
            rules.push(rule);
        }

        debug!(rules = rules.len(), "loaded folding rules");
        Ok(Self { rules })
    }

    /// Append every rule of `other` after the rules already present.
    pub fn extend(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule over `trace` in order.
    pub fn apply(&self, trace: Vec<StackElement>) -> Vec<StackElement> {
        self.rules.iter().fold(trace, |trace, rule| rule.fold_trace(trace))
    }
}

/// Rule-file form: blocks separated by one blank line.
impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, rule) in self.rules.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", rule)?;
        }
        Ok(())
    }
}

fn parse_rule_frame(line_no: usize, line: &str) -> Result<StackElement, StackfoldError> {
    grammar::parse_frame(line).ok_or_else(|| StackfoldError::MalformedRule {
        line: line_no,
        text: line.to_string(),
    })
}
