//! Error context chaining for CLI diagnostics.
//!
//! Collects an error and its `source()` chain and prints them as one primary
//! line followed by indented "caused by:" lines.

// =============================================================================
// ErrorChain
// =============================================================================

/// A primary error message plus its underlying causes, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorChain {
    pub primary: String,
    pub causes: Vec<String>,
}

impl ErrorChain {
    /// Render the chain under `prefix`:
    ///
    /// ```text
    /// error: <primary message>
    ///   caused by: <cause 1>
    ///   caused by: <cause 2>
    /// ```
    pub fn format_with_prefix(&self, prefix: &str) -> String {
        let mut out = format!("{} {}", prefix, self.primary);
        for cause in &self.causes {
            out.push_str(&format!("\n  caused by: {}", cause));
        }
        out
    }
}

/// Walk a `std::error::Error` source chain and collect all messages into
/// an `ErrorChain`.
pub fn chain_from_error(err: &dyn std::error::Error) -> ErrorChain {
    let mut causes = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    ErrorChain {
        primary: err.to_string(),
        causes,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::CliError;
    use stackfold_core::StackfoldError;
    use std::path::PathBuf;

    #[test]
    fn chain_walks_thiserror_sources() {
        let err = CliError::Rules {
            path: PathBuf::from("pool.txt"),
            source: StackfoldError::EmptyRule {
                line: 3,
                text: "a.B.c".to_string(),
            },
        };
        let chain = chain_from_error(&err);
        assert_eq!(chain.primary, "invalid rule file 'pool.txt'");
        assert_eq!(chain.causes.len(), 1);
        assert_eq!(
            chain.format_with_prefix("error:"),
            "error: invalid rule file 'pool.txt'\n  \
             caused by: rule line 3: replacement frame 'a.B.c' has no segment"
        );
    }

    #[test]
    fn transparent_config_error_keeps_io_cause() {
        let err = CliError::from(ConfigError::Read {
            path: PathBuf::from("stackfold.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing file"),
        });
        let chain = chain_from_error(&err);
        assert_eq!(chain.primary, "cannot read config 'stackfold.toml'");
        assert_eq!(chain.causes, vec!["missing file".to_string()]);
    }

    #[test]
    fn io_error_without_source_is_single_line() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let chain = chain_from_error(&err);
        assert!(chain.causes.is_empty());
        assert_eq!(chain.format_with_prefix("warning:"), "warning: missing file");
    }
}
