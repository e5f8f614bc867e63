//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Typed reactive object graph: evaluate geodetic poses and inspect node types
#[derive(Parser, Debug)]
#[command(name = "posegraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a geodetic position against the configured frame
    Eval(EvalArgs),

    /// Show the registered node type hierarchy
    Types,

    /// List the units of a measure type
    Units {
        /// Measure type name (angle, distance, size, time)
        type_name: String,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct EvalArgs {
    /// Longitude in degrees [-180, 180]
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Latitude in degrees [-90, 90]
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Altitude in meters
    #[arg(long, allow_hyphen_values = true)]
    pub alt: Option<f64>,

    /// Equatorial radius override in meters
    #[arg(long)]
    pub equatorial_radius: Option<f64>,

    /// Polar radius override in meters
    #[arg(long)]
    pub polar_radius: Option<f64>,

    /// Scene payload: CSV record or JSON, e.g. '{"position": {"latitude": 45}}'
    #[arg(short, long, conflicts_with = "file")]
    pub payload: Option<String>,

    /// Read the scene payload from a file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Print the scene as a tree instead of JSON
    #[arg(long)]
    pub tree: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a config template
    Template,

    /// Write the template to the global config path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show config paths
    Path,
}
