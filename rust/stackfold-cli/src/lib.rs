//! Stackfold CLI: read a thread dump, fold it, print the grouped report.
//!
//! [`run`] does all the work against caller-supplied input and output
//! streams; the `stackfold` binary wires it to stdin/stdout.

pub mod colors;
pub mod config;
pub mod error_chain;

use clap::Parser as ClapParser;
use config::{ConfigError, ReportFormat, StackfoldConfig};
use stackfold_core::{
    build_report, parse_dump_str, render_text, RenderOptions, RuleSet, StackfoldError, TraceGroup,
};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid rule file '{}'", path.display())]
    Rules {
        path: PathBuf,
        #[source]
        source: StackfoldError,
    },
    #[error("cannot fold thread dump")]
    Stackfold(#[from] StackfoldError),
    #[error("cannot encode json report")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

#[derive(Debug, ClapParser)]
#[command(
    name = "stackfold",
    version,
    about = "Collapse a JVM thread dump into one entry per distinct stack trace"
)]
pub struct Cli {
    /// Thread dump to read; standard input when omitted or `-`
    #[arg()]
    pub dump: Option<PathBuf>,

    /// Extra folding rule file, applied after the bundled and configured rules
    #[arg(short = 'r', long = "rules", value_name = "FILE")]
    pub rules: Vec<PathBuf>,

    /// Do not load the bundled folding rules
    #[arg(long)]
    pub no_default_rules: bool,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Trace groups with at least this many name patterns print only a count
    #[arg(long, value_name = "N")]
    pub max_name_patterns: Option<usize>,

    /// Use this config file instead of searching for stackfold.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the effective folding rules and exit
    #[arg(long)]
    pub print_rules: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

// =============================================================================
// Entry point
// =============================================================================

/// Run one invocation. The dump is read from `input` unless `cli.dump`
/// names a file; the report is written to `output`.
pub fn run(cli: &Cli, input: &mut dyn Read, output: &mut dyn Write) -> Result<(), CliError> {
    let (config, config_dir) = resolve_config(cli)?;
    let rules = load_rules(cli, &config, config_dir.as_deref())?;

    if cli.print_rules {
        write!(output, "{}", rules).map_err(|e| CliError::io("cannot write rules", e))?;
        return Ok(());
    }

    let dump = read_dump(cli.dump.as_deref(), input)?;
    let threads = parse_dump_str(&dump, &rules)?;
    if threads.is_empty() {
        warn!("no thread headers found in input");
    }

    let options = RenderOptions {
        max_name_patterns: cli.max_name_patterns.unwrap_or(config.report.max_name_patterns),
    };
    let groups = build_report(&threads, &options);
    debug!(threads = threads.len(), groups = groups.len(), "built report");

    let report = match cli.format.unwrap_or(config.report.format) {
        ReportFormat::Text => render_text(&groups),
        ReportFormat::Json => render_json(&groups)?,
    };
    output
        .write_all(report.as_bytes())
        .and_then(|()| output.flush())
        .map_err(|e| CliError::io("cannot write report", e))
}

/// The report as a pretty-printed JSON array, newline terminated.
pub fn render_json(groups: &[TraceGroup<'_>]) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(groups)?;
    json.push('\n');
    Ok(json)
}

// =============================================================================
// Inputs
// =============================================================================

fn resolve_config(cli: &Cli) -> Result<(StackfoldConfig, Option<PathBuf>), CliError> {
    let found = match &cli.config {
        Some(path) => Some((path.clone(), StackfoldConfig::load_from(path)?)),
        None => StackfoldConfig::load_with_path()?,
    };
    Ok(match found {
        Some((path, config)) => {
            debug!(path = %path.display(), "loaded config");
            let dir = path.parent().map(Path::to_path_buf);
            (config, dir)
        }
        None => (StackfoldConfig::default(), None),
    })
}

/// Bundled rules (unless disabled), then configured rule files, then
/// `--rules` files, in that order.
pub fn load_rules(
    cli: &Cli,
    config: &StackfoldConfig,
    config_dir: Option<&Path>,
) -> Result<RuleSet, CliError> {
    let mut rules = if cli.no_default_rules || !config.rules.bundled {
        RuleSet::new()
    } else {
        RuleSet::bundled()?
    };

    for path in config.rule_files(config_dir).iter().chain(&cli.rules) {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read rule file '{}'", path.display()), e))?;
        let extra = RuleSet::parse_str(&text).map_err(|source| CliError::Rules {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), rules = extra.len(), "loaded rule file");
        rules.extend(extra);
    }
    Ok(rules)
}

/// Dump text with invalid UTF-8 sequences replaced.
fn read_dump(path: Option<&Path>, input: &mut dyn Read) -> Result<String, CliError> {
    let bytes = match path {
        Some(p) if p != Path::new("-") => std::fs::read(p)
            .map_err(|e| CliError::io(format!("cannot read dump '{}'", p.display()), e))?,
        _ => {
            let mut bytes = Vec::new();
            input
                .read_to_end(&mut bytes)
                .map_err(|e| CliError::io("cannot read dump from standard input", e))?;
            bytes
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["stackfold"]).expect("parses");
        assert!(cli.dump.is_none());
        assert!(cli.rules.is_empty());
        assert!(!cli.no_default_rules);
        assert!(cli.format.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn cli_repeated_rules_and_verbosity() {
        let cli = Cli::try_parse_from([
            "stackfold", "-r", "a.txt", "--rules", "b.txt", "-vv", "-f", "json", "dump.txt",
        ])
        .expect("parses");
        assert_eq!(cli.rules, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, Some(ReportFormat::Json));
        assert_eq!(cli.dump, Some(PathBuf::from("dump.txt")));
    }

    #[test]
    fn cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["stackfold", "--format", "xml"]).is_err());
    }

    #[test]
    fn read_dump_replaces_invalid_utf8() {
        let mut input: &[u8] = b"\"t\xff1\" Id=1 RUNNABLE\n";
        let text = read_dump(None, &mut input).expect("reads");
        assert_eq!(text, "\"t\u{fffd}1\" Id=1 RUNNABLE\n");
    }

    #[test]
    fn dash_means_standard_input() {
        let mut input: &[u8] = b"hello";
        let text = read_dump(Some(Path::new("-")), &mut input).expect("reads");
        assert_eq!(text, "hello");
    }

    #[test]
    fn disabling_bundled_rules_in_config() {
        let cli = Cli::try_parse_from(["stackfold"]).expect("parses");
        let config = StackfoldConfig::from_str("[rules]\nbundled = false\n").expect("config");
        let rules = load_rules(&cli, &config, None).expect("rules");
        assert!(rules.is_empty());
    }
}
