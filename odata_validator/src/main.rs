use clap::Parser;
use odata_validator::config::runtime::{LoggingPreferences, ValidationPreferences};
use odata_validator::query::QueryLoadError;
use odata_validator::validation::init_validation_preferences;
use odata_validator::{
    log_info, logging, ParsedQuery, QueryValidator, SettingsError, ValidationError,
    ValidationSettings,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Every query passed
const EXIT_PASSED: u8 = 0;
/// At least one query was rejected
const EXIT_REJECTED: u8 = 1;
/// Bad arguments, unreadable settings or unreadable query documents
const EXIT_USAGE: u8 = 2;

/// Checks parsed OData query options against an allow-list policy
#[derive(Parser, Debug)]
#[command(
    name = "odata_validator",
    version,
    after_help = "EXIT STATUS:\n    0    every query passed\n    1    at least one query was rejected\n    2    usage error or unreadable input"
)]
struct Cli {
    /// Parsed query documents (JSON) to validate
    #[arg(required = true, value_name = "QUERY_JSON")]
    queries: Vec<PathBuf>,

    /// Validation settings (TOML); everything is allowed when omitted
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Emit log events as JSON
    #[arg(long)]
    structured: bool,

    /// Only print failures and the summary
    #[arg(long)]
    quiet: bool,

    /// Print the logging configuration before validating
    #[arg(long)]
    diagnostics: bool,
}

/// Outcome of one query document
enum FileOutcome {
    Passed,
    Rejected(ValidationError),
    Unreadable(QueryLoadError),
}

#[derive(Debug, Default)]
struct RunSummary {
    passed: usize,
    rejected: usize,
    unreadable: usize,
}

impl RunSummary {
    fn total(&self) -> usize {
        self.passed + self.rejected + self.unreadable
    }

    fn exit_status(&self) -> u8 {
        if self.unreadable > 0 {
            EXIT_USAGE
        } else if self.rejected > 0 {
            EXIT_REJECTED
        } else {
            EXIT_PASSED
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_USAGE);
    }

    let settings = match load_settings(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if cli.diagnostics {
        eprintln!("{}\n", logging::get_system_diagnostics());
    }

    let summary = run(&cli, &settings);

    println!(
        "\n{} queries: {} passed, {} rejected, {} unreadable",
        summary.total(),
        summary.passed,
        summary.rejected,
        summary.unreadable
    );

    ExitCode::from(summary.exit_status())
}

fn init_logging(cli: &Cli) -> Result<(), String> {
    let defaults = LoggingPreferences::default();
    let preferences = LoggingPreferences {
        use_structured_logging: cli.structured || defaults.use_structured_logging,
        enable_console_logging: !cli.quiet && defaults.enable_console_logging,
        ..defaults
    };

    logging::config::init_runtime_preferences(preferences)?;
    logging::init_global_logging()?;

    // Rejections are printed per file below
    init_validation_preferences(ValidationPreferences {
        log_rejections: false,
        ..ValidationPreferences::default()
    })
}

fn load_settings(path: Option<&Path>) -> Result<ValidationSettings, SettingsError> {
    match path {
        Some(path) => ValidationSettings::load(path),
        None => Ok(ValidationSettings::default()),
    }
}

fn run(cli: &Cli, settings: &ValidationSettings) -> RunSummary {
    let validator = QueryValidator::new();
    let mut summary = RunSummary::default();

    log_info!("Validating query documents", "count" => cli.queries.len());

    for path in &cli.queries {
        let outcome = logging::with_request_context(path.display().to_string(), || {
            validate_file(&validator, path, settings)
        });

        match outcome {
            FileOutcome::Passed => {
                summary.passed += 1;
                if !cli.quiet {
                    println!("{}: OK", path.display());
                }
            }
            FileOutcome::Rejected(error) => {
                summary.rejected += 1;
                println!("{}: FAILED [{}] {}", path.display(), error.error_code(), error);
            }
            FileOutcome::Unreadable(error) => {
                summary.unreadable += 1;
                eprintln!("{}: ERROR [{}] {}", path.display(), error.error_code(), error);
            }
        }
    }

    summary
}

fn validate_file(validator: &QueryValidator, path: &Path, settings: &ValidationSettings) -> FileOutcome {
    let query = match ParsedQuery::load_within(path, settings.effective_max_depth()) {
        Ok(query) => query,
        Err(QueryLoadError::TooDeep { max_depth, .. }) => {
            return FileOutcome::Rejected(ValidationError::expression_too_complex(
                max_depth + 1,
                max_depth,
            ));
        }
        Err(error) => {
            logging::safe_log_error(error.error_code(), &error.to_string());
            return FileOutcome::Unreadable(error);
        }
    };

    match validator.validate(&query, settings) {
        Ok(()) => FileOutcome::Passed,
        Err(error) => FileOutcome::Rejected(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "odata_validator",
            "a.json",
            "--settings",
            "policy.toml",
            "b.json",
            "--structured",
            "--quiet",
            "--diagnostics",
        ])
        .unwrap();

        assert_eq!(
            cli.queries,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
        assert_eq!(cli.settings, Some(PathBuf::from("policy.toml")));
        assert!(cli.structured);
        assert!(cli.quiet);
        assert!(cli.diagnostics);
    }

    #[test]
    fn test_parse_arguments_invalid() {
        assert!(Cli::try_parse_from(["odata_validator"]).is_err());
        assert!(Cli::try_parse_from(["odata_validator", "a.json", "--settings"]).is_err());
        assert!(Cli::try_parse_from(["odata_validator", "a.json", "--threads", "4"]).is_err());
    }

    #[test]
    fn test_exit_status() {
        let mut summary = RunSummary {
            passed: 2,
            ..Default::default()
        };
        assert_eq!(summary.exit_status(), EXIT_PASSED);

        summary.rejected = 1;
        assert_eq!(summary.exit_status(), EXIT_REJECTED);

        summary.unreadable = 1;
        assert_eq!(summary.exit_status(), EXIT_USAGE);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_validate_file_outcomes() {
        let validator = QueryValidator::new();
        let settings = ValidationSettings::builder().max_top(10).build();

        let mut passing = tempfile::NamedTempFile::new().unwrap();
        write!(passing, r#"{{"top": 10}}"#).unwrap();
        assert!(matches!(
            validate_file(&validator, passing.path(), &settings),
            FileOutcome::Passed
        ));

        let mut failing = tempfile::NamedTempFile::new().unwrap();
        write!(failing, r#"{{"top": 11}}"#).unwrap();
        assert!(matches!(
            validate_file(&validator, failing.path(), &settings),
            FileOutcome::Rejected(ValidationError::TopExceedsMaximum { .. })
        ));

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        write!(broken, "not json").unwrap();
        assert!(matches!(
            validate_file(&validator, broken.path(), &settings),
            FileOutcome::Unreadable(QueryLoadError::Parse { .. })
        ));
    }

    fn not_chain_document(nodes: usize) -> String {
        let nots = nodes - 1;
        format!(
            r#"{{"filter":{{"expression":{}{{"kind":"constant","value":true}}{}}}}}"#,
            r#"{"kind":"unary_operator","operator":"not","operand":"#.repeat(nots),
            "}".repeat(nots)
        )
    }

    #[test]
    fn test_deep_filter_document_rejected_as_too_complex() {
        let validator = QueryValidator::new();
        let settings = ValidationSettings::builder().max_expression_depth(128).build();

        let mut at_limit = tempfile::NamedTempFile::new().unwrap();
        write!(at_limit, "{}", not_chain_document(128)).unwrap();
        assert!(matches!(
            validate_file(&validator, at_limit.path(), &settings),
            FileOutcome::Passed
        ));

        let mut past_limit = tempfile::NamedTempFile::new().unwrap();
        write!(past_limit, "{}", not_chain_document(129)).unwrap();
        assert!(matches!(
            validate_file(&validator, past_limit.path(), &settings),
            FileOutcome::Rejected(ValidationError::ExpressionTooComplex { depth: 129, max: 128 })
        ));

        let mut far_past_limit = tempfile::NamedTempFile::new().unwrap();
        write!(far_past_limit, "{}", not_chain_document(1000)).unwrap();
        assert!(matches!(
            validate_file(&validator, far_past_limit.path(), &settings),
            FileOutcome::Rejected(ValidationError::ExpressionTooComplex { depth: 129, max: 128 })
        ));
    }
}
