//! Configuration management for sqlcheck.
//!
//! Handles:
//! - Command-line argument parsing
//! - Optional TOML config file (explicit path, project file, or user config dir)
//! - Precedence: command line > config file > built-in defaults

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::validation::Dialect;

/// Config file looked up in the current directory
pub const PROJECT_CONFIG_FILE: &str = ".sqlcheck.toml";

/// Largest script accepted unless configured otherwise
pub const DEFAULT_MAX_SCRIPT_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Command-line arguments for sqlcheck
#[derive(Debug, Parser)]
#[command(name = "sqlcheck")]
#[command(about = "Split SQL scripts into statements and validate each one")]
#[command(version)]
pub struct Args {
    /// Script files to validate; `-` reads standard input
    #[arg(help = "SQL script files ('-' for stdin)")]
    pub files: Vec<PathBuf>,

    /// Inline SQL to validate instead of (or in addition to) files
    #[arg(long, short = 'q', help = "Validate an inline SQL string")]
    pub query: Option<String>,

    /// SQL dialect used by the grammar validator
    #[arg(long, value_enum, help = "SQL dialect (mysql, generic, postgres, ...)")]
    pub dialect: Option<Dialect>,

    /// Output format
    #[arg(long, value_enum, help = "Report format (json, text)")]
    pub format: Option<OutputFormat>,

    /// Explicit config file
    #[arg(long, help = "Path to a sqlcheck TOML config file")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,
}

/// How reports are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Contents of a TOML config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub dialect: Option<Dialect>,
    pub format: Option<OutputFormat>,
    pub log_level: Option<String>,
    pub max_script_bytes: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// One script source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Inline(String),
    Stdin,
    File(PathBuf),
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Inline(_) => write!(f, "<query>"),
            Input::Stdin => write!(f, "<stdin>"),
            Input::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<Input>,
    pub dialect: Dialect,
    pub format: OutputFormat,
    pub log_level: String,
    pub max_script_bytes: u64,
    /// Config file that was applied, if any
    pub config_path: Option<PathBuf>,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let path = match &args.config {
            Some(explicit) => {
                if !explicit.is_file() {
                    bail!("config file {} does not exist", explicit.display());
                }
                Some(explicit.clone())
            }
            None => discover_config_file(),
        };

        let file = match &path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        Ok(Self::resolve(args, file, path))
    }

    /// Merge arguments over a loaded config file
    pub fn resolve(args: Args, file: FileConfig, config_path: Option<PathBuf>) -> Self {
        let mut inputs = Vec::new();

        if let Some(query) = args.query {
            inputs.push(Input::Inline(query));
        }

        for path in args.files {
            if path.as_os_str() == "-" {
                inputs.push(Input::Stdin);
            } else {
                inputs.push(Input::File(path));
            }
        }

        if inputs.is_empty() {
            inputs.push(Input::Stdin);
        }

        Config {
            inputs,
            dialect: args.dialect.or(file.dialect).unwrap_or_default(),
            format: args.format.or(file.format).unwrap_or_default(),
            log_level: args
                .log_level
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            max_script_bytes: file.max_script_bytes.unwrap_or(DEFAULT_MAX_SCRIPT_BYTES),
            config_path,
        }
    }
}

/// Project config in the working directory, else the user config directory
fn discover_config_file() -> Option<PathBuf> {
    let project = PathBuf::from(PROJECT_CONFIG_FILE);
    if project.is_file() {
        return Some(project);
    }

    dirs::config_dir()
        .map(|dir| dir.join("sqlcheck").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("sqlcheck").chain(argv.iter().copied()))
    }

    #[test]
    fn test_defaults_read_stdin() {
        let config = Config::resolve(args(&[]), FileConfig::default(), None);

        assert_eq!(config.inputs, vec![Input::Stdin]);
        assert_eq!(config.dialect, Dialect::MySql);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.max_script_bytes, DEFAULT_MAX_SCRIPT_BYTES);
    }

    #[test]
    fn test_inputs_in_order() {
        let config = Config::resolve(
            args(&["--query", "SELECT 1;", "a.sql", "-"]),
            FileConfig::default(),
            None,
        );

        assert_eq!(
            config.inputs,
            vec![
                Input::Inline("SELECT 1;".to_string()),
                Input::File(PathBuf::from("a.sql")),
                Input::Stdin,
            ]
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig {
            dialect: Some(Dialect::PostgreSql),
            format: Some(OutputFormat::Text),
            log_level: Some("debug".to_string()),
            max_script_bytes: Some(64),
        };
        let config = Config::resolve(args(&["--dialect", "sqlite"]), file, None);

        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_script_bytes, 64);
    }

    #[test]
    fn test_input_labels() {
        assert_eq!(Input::Stdin.to_string(), "<stdin>");
        assert_eq!(Input::Inline("x".into()).to_string(), "<query>");
        assert_eq!(Input::File(PathBuf::from("db/init.sql")).to_string(), "db/init.sql");
    }
}
