mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, FieldCommands};
use rotaplan::logic::{CompatibilityModel, RulesEngine, SearchBudget, YieldOverrides};
use rotaplan::models::{FieldCharacteristics, FieldProfile, RotationConstraint};
use rotaplan::{Config, Database, GenerateRequest, RotationEngine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldsFile {
    Many(Vec<FieldProfile>),
    One(Box<FieldProfile>),
}

fn main() -> Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.clone()).context(
        "Failed to load configuration (see config/config.yaml.example for the format)",
    )?;
    let db_path = config.db_path(cli.data_dir.as_deref())?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let model = load_catalog(&config)?;
    let engine = RotationEngine::new(Arc::new(model), Arc::new(config), Arc::new(db.clone()));

    match cli.command {
        Commands::Generate {
            field,
            horizon,
            crops,
            hint,
            constraints,
            overrides,
            top_n,
            max_nodes,
            deadline_ms,
        } => {
            let mut request = GenerateRequest::new(field, horizon);
            request.candidates = crops;
            request.hint = hint;
            request.top_n = top_n;
            if let Some(path) = constraints {
                request.constraints = read_document::<Vec<RotationConstraint>>(&path)?;
            }
            if let Some(path) = overrides {
                request.yield_overrides = read_document::<YieldOverrides>(&path)?;
            }
            if max_nodes.is_some() || deadline_ms.is_some() {
                let mut budget = SearchBudget::new(
                    max_nodes.unwrap_or(engine.config().search.max_nodes),
                );
                if let Some(ms) = deadline_ms.or(engine.config().search.deadline_ms) {
                    budget = budget.with_deadline(Duration::from_millis(ms));
                }
                request.budget = Some(budget);
            }

            let outcome = engine.generate(&request)?;
            print_json(&outcome)?;
        }
        Commands::Score { field, sequence } => {
            print_json(&engine.score_sequence(&field, &sequence)?)?;
        }
        Commands::Risk {
            field,
            sequence,
            characteristics,
        } => {
            let characteristics = match characteristics {
                Some(path) => read_document::<FieldCharacteristics>(&path)?,
                None => FieldCharacteristics::default(),
            };
            print_json(&engine.risk_assessment(&field, &sequence, &characteristics)?)?;
        }
        Commands::Validate {
            sequence,
            constraints,
        } => {
            let constraints = match constraints {
                Some(path) => read_document::<Vec<RotationConstraint>>(&path)?,
                None => Vec::new(),
            };
            let report = engine.validate_constraints(&sequence, &constraints)?;
            print_json(&report)?;
            if !report.valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Compare { field, sequences } => {
            if sequences.len() < 2 {
                bail!("compare needs at least two --sequence arguments");
            }
            let overrides = YieldOverrides::default();
            let plans = sequences
                .iter()
                .map(|s| {
                    let crops: Vec<String> = s.split(',').map(|c| c.trim().to_string()).collect();
                    engine.build_plan(&field, &crops, &overrides)
                })
                .collect::<rotaplan::Result<Vec<_>>>()?;
            print_json(&engine.compare_plans(&plans)?)?;
        }
        Commands::Check => {
            let summary = CheckSummary {
                catalog_version: engine.model().version().to_string(),
                crops: engine.model().names().map(str::to_string).collect(),
                database: db.path().display().to_string(),
                fields: db.list_fields()?.len(),
                search_max_nodes: engine.config().search.max_nodes,
                parallel_search: engine.config().search.parallel,
                advisory_rules: RulesEngine::new()
                    .list_rules()
                    .into_iter()
                    .map(|(id, name)| RuleSummary { id, name })
                    .collect(),
            };
            print_json(&summary)?;
        }
        Commands::Catalog => {
            print!("{}", engine.model().to_yaml()?);
        }
        Commands::Fields { command } => return run_fields(&db, &command),
    }

    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct CheckSummary {
    catalog_version: String,
    crops: Vec<String>,
    database: String,
    fields: usize,
    search_max_nodes: usize,
    parallel_search: bool,
    advisory_rules: Vec<RuleSummary>,
}

#[derive(Serialize)]
struct RuleSummary {
    id: &'static str,
    name: &'static str,
}

fn run_fields(db: &Database, command: &FieldCommands) -> Result<ExitCode> {
    match command {
        FieldCommands::Import { path } => {
            let fields = match read_document::<FieldsFile>(path)? {
                FieldsFile::Many(fields) => fields,
                FieldsFile::One(field) => vec![*field],
            };
            for field in &fields {
                db.upsert_field(field)
                    .with_context(|| format!("Failed to import field '{}'", field.field_id))?;
            }
            tracing::info!(count = fields.len(), "Imported fields");
            print_json(&fields.iter().map(|f| &f.field_id).collect::<Vec<_>>())?;
        }
        FieldCommands::List => {
            print_json(&db.list_fields()?)?;
        }
        FieldCommands::Show { field_id } => match db.get_field(field_id)? {
            Some(field) => print_json(&field)?,
            None => bail!("Unknown field: {}", field_id),
        },
        FieldCommands::Remove { field_id } => {
            if !db.delete_field(field_id)? {
                bail!("Unknown field: {}", field_id);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_catalog(config: &Config) -> Result<CompatibilityModel> {
    match &config.catalog.path {
        Some(path) => CompatibilityModel::load(path)
            .with_context(|| format!("Failed to load crop catalog from {}", path.display())),
        None => Ok(CompatibilityModel::builtin()),
    }
}

/// Reads a YAML document; JSON input parses as YAML too.
fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
