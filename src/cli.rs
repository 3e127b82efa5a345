use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rotaplan",
    version,
    about = "Crop rotation planning and sustainability scoring"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override SQLite data directory
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for the best rotations for a field
    Generate {
        #[arg(short, long)]
        field: String,

        /// Planning horizon in years
        #[arg(long)]
        horizon: usize,

        /// Candidate crops (default: whole catalog)
        #[arg(long, value_delimiter = ',')]
        crops: Vec<String>,

        /// Crops pinned to the first years
        #[arg(long, value_delimiter = ',')]
        hint: Vec<String>,

        /// YAML or JSON list of rotation constraints
        #[arg(long)]
        constraints: Option<PathBuf>,

        /// YAML or JSON yield and nitrogen-credit overrides
        #[arg(long)]
        overrides: Option<PathBuf>,

        #[arg(long)]
        top_n: Option<usize>,

        #[arg(long)]
        max_nodes: Option<usize>,

        #[arg(long)]
        deadline_ms: Option<u64>,
    },
    /// Sustainability scores for a sequence
    Score {
        #[arg(short, long)]
        field: String,

        #[arg(short, long, value_delimiter = ',', required = true)]
        sequence: Vec<String>,
    },
    /// Risk profile for a sequence
    Risk {
        #[arg(short, long)]
        field: String,

        #[arg(short, long, value_delimiter = ',', required = true)]
        sequence: Vec<String>,

        /// YAML or JSON field characteristics overriding the stored profile
        #[arg(long)]
        characteristics: Option<PathBuf>,
    },
    /// Check a sequence against constraints and catalog rules
    Validate {
        #[arg(short, long, value_delimiter = ',', required = true)]
        sequence: Vec<String>,

        #[arg(long)]
        constraints: Option<PathBuf>,
    },
    /// Build plans for two or more sequences and compare them
    Compare {
        #[arg(short, long)]
        field: String,

        /// Repeat once per plan, e.g. -s corn,soybean -s corn,soybean,wheat
        #[arg(short, long = "sequence", required = true)]
        sequences: Vec<String>,
    },
    /// Manage stored field profiles
    Fields {
        #[command(subcommand)]
        command: FieldCommands,
    },
    /// Validate config, catalog and database
    Check,
    /// Print the active crop catalog as YAML
    Catalog,
}

#[derive(Subcommand)]
pub enum FieldCommands {
    /// Import one field or a list of fields from YAML or JSON
    Import { path: PathBuf },
    List,
    Show { field_id: String },
    Remove { field_id: String },
}
