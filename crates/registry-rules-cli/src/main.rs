//! Registry Rules CLI
//!
//! The `registry-rules` command checks candidate content against the rules
//! configured in a JSON registry fixture.
//!
//! ## Commands
//!
//! - `check`: apply the effective rules (or one explicit rule) to a candidate
//! - `resolve`: print the effective rule set for an artifact
//!
//! Exit status: 0 when all rules pass, 2 on a rule violation, 1 on error.

mod fixture;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};

use registry_rules::{
    RuleApplicationSpan, RuleApplicationType, RuleOutcome, RuleRequest, RuleViolation,
    RulesProperties, RulesService,
};
use registry_storage::{
    ArtifactReference, ContentHandle, RegistryStorage, RuleConfiguration, RuleType, StorageError,
};

use fixture::Fixture;

#[derive(Parser)]
#[command(name = "registry-rules")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check artifacts against registry rules", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply rules to candidate content
    Check {
        #[command(flatten)]
        target: Target,

        /// Artifact type of the candidate
        #[arg(short = 't', long = "type", default_value = "JSON")]
        artifact_type: String,

        /// File holding the candidate content
        #[arg(short, long)]
        content: PathBuf,

        /// Compare against this stored version instead of the enabled history
        #[arg(long, conflicts_with = "rule")]
        version: Option<String>,

        /// Canonicalize the stored version before comparing
        #[arg(long, requires = "version")]
        canonical: bool,

        /// JSON file holding the candidate's artifact references
        #[arg(long)]
        references: Option<PathBuf>,

        /// Apply only this rule, e.g. `VALIDITY=FULL`
        #[arg(long, value_parser = parse_rule)]
        rule: Option<(RuleType, RuleConfiguration)>,

        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print the effective rules for an artifact
    Resolve {
        #[command(flatten)]
        target: Target,

        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(clap::Args)]
struct Target {
    /// Registry fixture (JSON)
    #[arg(short, long, env = "REGISTRY_RULES_FIXTURE")]
    fixture: PathBuf,

    /// Group id
    #[arg(short, long, default_value = "default")]
    group: String,

    /// Artifact id
    #[arg(short, long)]
    artifact: String,

    /// Whether the artifact is being created or updated
    #[arg(short, long, value_enum, default_value_t = Mode::Update)]
    mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Create,
    Update,
}

impl From<Mode> for RuleApplicationType {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Create => RuleApplicationType::Create,
            Mode::Update => RuleApplicationType::Update,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// How a `check` ended, when it ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    Pass,
    Violation,
}

fn parse_rule(s: &str) -> Result<(RuleType, RuleConfiguration), String> {
    let (rule_type, configuration) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=CONFIG, got '{}'", s))?;
    let rule_type = rule_type.parse::<RuleType>().map_err(|e| e.to_string())?;
    Ok((rule_type, RuleConfiguration::new(configuration.trim())))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    registry_rules::telemetry::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Check {
            target,
            artifact_type,
            content,
            version,
            canonical,
            references,
            rule,
            format,
        } => {
            let options = CheckOptions {
                artifact_type,
                content,
                version,
                canonical,
                references,
                rule,
            };
            cmd_check(&target, &options, format)
        }
        Commands::Resolve { target, format } => cmd_resolve(&target, format).map(|_| Verdict::Pass),
    };

    match result {
        Ok(Verdict::Pass) => ExitCode::SUCCESS,
        Ok(Verdict::Violation) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

struct CheckOptions {
    artifact_type: String,
    content: PathBuf,
    version: Option<String>,
    canonical: bool,
    references: Option<PathBuf>,
    rule: Option<(RuleType, RuleConfiguration)>,
}

fn load_registry(fixture_path: &Path) -> Result<(Arc<dyn RegistryStorage>, RulesService)> {
    let fixture = Fixture::load(fixture_path)?;
    let storage: Arc<dyn RegistryStorage> = Arc::new(fixture.to_storage()?);
    let defaults = RulesProperties::from_env().merged_with(&fixture.defaults);
    let service = RulesService::with_builtin(storage.clone(), Arc::new(defaults));
    Ok((storage, service))
}

fn cmd_check(target: &Target, options: &CheckOptions, format: Format) -> Result<Verdict> {
    let (storage, service) = load_registry(&target.fixture)?;

    let content = std::fs::read(&options.content)
        .with_context(|| format!("Failed to read content: {:?}", options.content))?;
    let references = match &options.references {
        Some(path) => read_references(path)?,
        None => Vec::new(),
    };
    let resolved = resolve_references(storage.as_ref(), &target.group, &references)?;

    let request = RuleRequest::new(
        target.group.as_str(),
        target.artifact.as_str(),
        options.artifact_type.as_str(),
        content,
    )
    .with_references(references, resolved);

    let mode = RuleApplicationType::from(target.mode);
    let _span = RuleApplicationSpan::enter(&target.group, &target.artifact, mode.as_str());

    let outcome = match (&options.rule, &options.version) {
        (Some((rule_type, configuration)), _) => {
            service.apply_rule(&request, *rule_type, configuration, mode)?
        }
        (None, Some(version)) if options.canonical => service.apply_rules_compat(&request, version)?,
        (None, Some(version)) => service.apply_rules_for_version(&request, version)?,
        (None, None) => service.apply_rules(&request, mode)?,
    };

    print_outcome(&outcome, format)?;
    Ok(match outcome {
        RuleOutcome::Satisfied => Verdict::Pass,
        RuleOutcome::Violated(_) => Verdict::Violation,
    })
}

fn cmd_resolve(target: &Target, format: Format) -> Result<()> {
    let (_, service) = load_registry(&target.fixture)?;
    let rules = service.resolve_rules(&target.group, &target.artifact, target.mode.into())?;
    info!(tier = rules.tier().as_str(), count = rules.len(), "Resolved rules");

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&rules)?),
        Format::Text => {
            if rules.is_empty() {
                println!("No rules apply");
            }
            for (rule_type, configuration) in &rules {
                println!("{} = {} ({})", rule_type, configuration, rules.tier().as_str());
            }
        }
    }
    Ok(())
}

fn read_references(path: &Path) -> Result<Vec<ArtifactReference>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read references: {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid references JSON in {:?}", path))
}

/// Look up each reference in the registry.
///
/// A reference without a group resolves in `default_group`; one without a
/// version resolves to the newest enabled version. References that do not
/// exist are left out of the map.
fn resolve_references(
    storage: &dyn RegistryStorage,
    default_group: &str,
    references: &[ArtifactReference],
) -> Result<HashMap<String, ContentHandle>> {
    let mut resolved = HashMap::new();
    for reference in references {
        let group_id = reference.group_id.as_deref().unwrap_or(default_group);
        let lookup = match &reference.version {
            Some(version) => storage
                .artifact_version(group_id, &reference.artifact_id, version)
                .map(|stored| Some(stored.content)),
            None => storage
                .enabled_content_ids(group_id, &reference.artifact_id)
                .and_then(|ids| ids.last().map(|id| storage.content_by_id(*id)).transpose()),
        };
        match lookup {
            Ok(Some(content)) => {
                resolved.insert(reference.name.clone(), content);
            }
            Ok(None)
            | Err(StorageError::ArtifactNotFound { .. })
            | Err(StorageError::VersionNotFound { .. }) => {
                info!(name = %reference.name, "Reference not found in registry");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to resolve reference {}", reference.name))
            }
        }
    }
    Ok(resolved)
}

#[derive(Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
enum Report<'a> {
    Pass,
    Violation { violation: &'a RuleViolation },
}

fn print_outcome(outcome: &RuleOutcome, format: Format) -> Result<()> {
    let report = match outcome {
        RuleOutcome::Satisfied => Report::Pass,
        RuleOutcome::Violated(violation) => Report::Violation { violation },
    };
    match (format, &report) {
        (Format::Json, _) => println!("{}", serde_json::to_string_pretty(&report)?),
        (Format::Text, Report::Pass) => println!("PASS"),
        (Format::Text, Report::Violation { violation }) => println!("FAIL: {}", violation),
    }
    Ok(())
}
