//! Command dispatch

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::application::codec::number_to_json;
use crate::application::Outcome;
use crate::cli::args::{Cli, Commands, ConfigCommands, EvalArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{expand_path, global_config_path, Settings};
use crate::domain::{Blueprint, Graph, LeafTemplate};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Eval(args)) => cmd_eval(cli, args),
        Some(Commands::Types) => cmd_types(),
        Some(Commands::Units { type_name }) => cmd_units(type_name),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()
                .map_err(|e| InfraError::io("print help", e))?;
            Ok(())
        }
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    Ok(Settings::load(cli.config.as_deref())?)
}

#[instrument(skip(cli))]
fn cmd_eval(cli: &Cli, args: &EvalArgs) -> CliResult<()> {
    let mut settings = load_settings(cli)?;
    if let Some(radius) = args.equatorial_radius {
        settings.frame.equatorial_radius = radius;
    }
    if let Some(radius) = args.polar_radius {
        settings.frame.polar_radius = radius;
    }
    let pretty = args.pretty || settings.output.pretty;
    debug!("eval with frame {:?}", settings.frame);

    let container = ServiceContainer::new(settings);
    let mut service = container.pose_service()?;

    let outcome = match (&args.file, &args.payload) {
        (Some(file), _) => Some(service.apply_file(&expand_path(file))?),
        (None, Some(payload)) => Some(service.apply_text(payload)?),
        (None, None) => None,
    };
    if outcome == Some(Outcome::Ignored) {
        output::warning("payload is neither a CSV record nor JSON, ignored");
    }

    let mut geodetic = Map::new();
    for (key, value) in [
        ("longitude", args.lon),
        ("latitude", args.lat),
        ("altitude", args.alt),
    ] {
        if let Some(v) = value {
            geodetic.insert(key.to_string(), number_to_json(v));
        }
    }
    if !geodetic.is_empty() {
        service.apply_to_position(&Value::Object(geodetic))?;
    }

    let report = service.evaluate()?;
    if args.tree {
        output::data(&service.graph().to_tree(service.root()));
        return Ok(());
    }
    let rendered = if pretty {
        serde_json::to_string_pretty(&report.scene)
    } else {
        serde_json::to_string(&report.scene)
    }
    .map_err(|e| InfraError::render("scene", e))?;
    output::data(&rendered);
    Ok(())
}

fn cmd_types() -> CliResult<()> {
    let graph = Graph::new();
    let registry = graph.registry();
    for root in registry.roots() {
        output::data(&registry.to_tree(root));
    }
    Ok(())
}

fn cmd_units(type_name: &str) -> CliResult<()> {
    let graph = Graph::new();
    let registry = graph.registry();
    let type_id = registry
        .get(type_name)
        .ok_or_else(|| CliError::InvalidArgs(format!("unknown type: {type_name}")))?;
    let units = match registry.blueprint(type_id) {
        Some(Blueprint::Leaf(LeafTemplate::Measure { units })) if !units.is_empty() => units,
        _ => {
            return Err(CliError::InvalidArgs(format!(
                "'{type_name}' is not a measure type with units"
            )))
        }
    };

    output::header(&format!("{type_name} units"));
    for (index, unit) in units.iter().enumerate() {
        output::unit_row(unit, index == 0);
    }
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::data(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::data(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => {
                    let state = if path.exists() { "exists" } else { "not found" };
                    output::labelled("Global", &format!("{} ({})", path.display(), state));
                }
                None => output::warning("no config directory available on this platform"),
            }
            if let Some(local) = &cli.config {
                output::labelled("Local", &expand_path(local).display());
            }
        }
        ConfigCommands::Init { force } => {
            let path = global_config_path().ok_or_else(|| {
                CliError::Usage("no config directory available on this platform".into())
            })?;
            let container = ServiceContainer::new(Settings::default());
            if container.fs.exists(&path) && !force {
                return Err(CliError::Usage(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            container
                .fs
                .ensure_parent(&path)
                .and_then(|_| container.fs.write(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("created {}", path.display()));
        }
    }
    Ok(())
}
