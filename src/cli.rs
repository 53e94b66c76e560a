//! Command-line front end
//!
//! Reads every configured input, validates them concurrently (one blocking
//! task and one orchestrator per input), and prints the reports in input order.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::config::{Config, Input, OutputFormat};
use crate::validation::{Orchestrator, QueryEntry, SqlParserValidator, ValidationReport};

/// Report for one input, labelled with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub report: ValidationReport,
}

/// Parse configuration, validate every input and print the reports.
///
/// Returns whether every statement of every input was valid.
pub async fn run() -> Result<bool> {
    let config = Config::from_args_and_env()?;
    init_logging(&config.log_level);

    if let Some(path) = &config.config_path {
        log::debug!("using config file {}", path.display());
    }

    let reports = validate_inputs(&config).await?;
    println!("{}", render(&reports, config.format)?);

    Ok(reports.iter().all(|r| r.report.success))
}

/// Logs go to stderr; `RUST_LOG` overrides the configured level
pub fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

/// Validate every configured input, preserving input order
pub async fn validate_inputs(config: &Config) -> Result<Vec<SourceReport>> {
    let mut tasks = Vec::with_capacity(config.inputs.len());

    for input in &config.inputs {
        let script = read_input(input, config.max_script_bytes).await?;
        let orchestrator = Orchestrator::new(SqlParserValidator::new(config.dialect));
        let source = input.to_string();
        let inline = matches!(input, Input::Inline(_));

        tasks.push(tokio::task::spawn_blocking(move || {
            // Inline queries are checked as a single entry, like a raw query string
            let report = if inline {
                ValidationReport::new(orchestrator.validate_queries(&[QueryEntry::new(script, 1)]))
            } else {
                orchestrator.report_script(&script)
            };
            log::info!(
                "{}: {} of {} statements valid",
                source,
                report.valid_queries,
                report.total_queries
            );
            SourceReport { source, report }
        }));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reports.push(task.await.context("validation task failed")?);
    }
    Ok(reports)
}

/// Read one input, refusing anything larger than `limit` bytes
pub async fn read_input(input: &Input, limit: u64) -> Result<String> {
    let script = match input {
        Input::Inline(query) => query.clone(),
        Input::Stdin => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .take(limit.saturating_add(1))
                .read_to_string(&mut buffer)
                .await
                .context("failed to read standard input")?;
            buffer
        }
        Input::File(path) => {
            let metadata = tokio::fs::metadata(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            if metadata.len() > limit {
                bail!(
                    "{} is {} bytes, larger than the {} byte limit",
                    path.display(),
                    metadata.len(),
                    limit
                );
            }
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?
        }
    };

    if script.len() as u64 > limit {
        bail!("{} is larger than the {} byte limit", input, limit);
    }
    Ok(script)
}

/// Render reports; a single input prints its bare report
pub fn render(reports: &[SourceReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let json = match reports {
                [single] => serde_json::to_string_pretty(&single.report),
                _ => serde_json::to_string_pretty(reports),
            };
            json.context("failed to serialize report")
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for source in reports {
                if reports.len() > 1 {
                    out.push_str(&format!("== {} ==\n", source.source));
                }
                out.push_str(&source.report.render_text());
            }
            Ok(out.trim_end().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationResult;

    fn sample(source: &str, valid: bool) -> SourceReport {
        let result = if valid {
            ValidationResult::ok("SELECT 1", 1)
        } else {
            ValidationResult::failed("SELEC 1", 1, "line 1:0 bad")
        };
        SourceReport {
            source: source.to_string(),
            report: ValidationReport::new(vec![result]),
        }
    }

    #[test]
    fn test_render_single_json_is_bare_report() {
        let out = render(&[sample("a.sql", true)], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["success"], true);
        assert!(value.get("source").is_none());
    }

    #[test]
    fn test_render_many_json_keeps_order() {
        let out = render(
            &[sample("a.sql", true), sample("b.sql", false)],
            OutputFormat::Json,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["source"], "a.sql");
        assert_eq!(value[1]["source"], "b.sql");
        assert_eq!(value[1]["report"]["success"], false);
    }

    #[test]
    fn test_render_text_headers_only_for_many() {
        let single = render(&[sample("a.sql", true)], OutputFormat::Text).unwrap();
        assert!(!single.contains("== a.sql =="));

        let many = render(
            &[sample("a.sql", true), sample("b.sql", false)],
            OutputFormat::Text,
        )
        .unwrap();
        assert!(many.contains("== a.sql =="));
        assert!(many.contains("== b.sql =="));
    }

    #[tokio::test]
    async fn test_read_input_enforces_limit() {
        let input = Input::Inline("SELECT 1;".to_string());
        assert!(read_input(&input, 100).await.is_ok());
        assert!(read_input(&input, 4).await.is_err());
    }
}
