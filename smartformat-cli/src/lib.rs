//! # smart-format
//!
//! Command-line host for the Smart Format Engine. Commands print JSON on
//! stdout (except `formats`, which prints a table); logs go to stderr.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use smartformat_core::formats::lookup_key;
use smartformat_core::{
    elements_from_json, validate, Element, FileBackend, FormatEngine, LayoutContext,
    ProjectLayout, ProjectStore, TransformOptions, FORMATS,
};
use smartformat_worker::{advise, AdvisorConfig, HttpLayoutAdvisor, OffloadHandle};

/// Command-line arguments for smart-format.
#[derive(Debug, Clone, Parser)]
#[command(name = "smart-format")]
#[command(about = "Re-layout designs across social media formats")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding saved projects
    #[arg(long, env = "SMART_FORMAT_DATA_DIR", default_value = ".smart-format")]
    pub data_dir: PathBuf,

    /// Layout advisor JSON-RPC endpoint (e.g., <http://localhost:8700/rpc>)
    #[arg(long, env = "SMART_FORMAT_ADVISOR_URL")]
    pub advisor_url: Option<String>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the known platform formats
    Formats,
    /// List saved projects
    List,
    /// Transform elements or a project's master layout to another format
    Transform(TransformArgs),
    /// Check a layout for readability and placement problems
    Validate(ValidateArgs),
    /// Show a project's layout for one format, overrides applied
    Resolve {
        /// Project id
        #[arg(long)]
        project: String,
        /// Format key, e.g. `instagram:story`
        #[arg(long)]
        format: String,
    },
    /// Manage per-format overrides
    Override {
        /// Override action
        #[command(subcommand)]
        action: OverrideAction,
    },
    /// Import a project record (current or legacy shape)
    Import {
        /// JSON file, or `-` for stdin
        #[arg(long)]
        input: PathBuf,
    },
    /// Print a saved project as JSON
    Export {
        /// Project id
        #[arg(long)]
        project: String,
    },
}

/// Arguments of `transform`.
#[derive(Debug, Clone, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct TransformArgs {
    /// Elements JSON array, or `-` for stdin
    #[arg(long, conflicts_with = "project", required_unless_present = "project")]
    pub input: Option<PathBuf>,
    /// Transform this project's layout for the target format instead
    #[arg(long)]
    pub project: Option<String>,
    /// Source format (`platform:name` or `WIDTHxHEIGHT`)
    #[arg(long, value_parser = parse_context)]
    pub from: Option<LayoutContext>,
    /// Target format (`platform:name` or `WIDTHxHEIGHT`)
    #[arg(long, value_parser = parse_context)]
    pub to: LayoutContext,
    /// Skip layout presets
    #[arg(long)]
    pub no_presets: bool,
    /// Force a specific preset
    #[arg(long)]
    pub preset: Option<String>,
    /// Run on the background worker
    #[arg(long)]
    pub offload: bool,
    /// Ask the layout advisor for a suggestion
    #[arg(long)]
    pub advise: bool,
    /// Include a validation report
    #[arg(long)]
    pub validate: bool,
}

/// Arguments of `validate`.
#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Elements JSON array, or `-` for stdin
    #[arg(long, conflicts_with = "project", required_unless_present = "project")]
    pub input: Option<PathBuf>,
    /// Validate this project's resolved layout instead
    #[arg(long)]
    pub project: Option<String>,
    /// Format to validate against (`platform:name` or `WIDTHxHEIGHT`)
    #[arg(long, value_parser = parse_context)]
    pub format: LayoutContext,
}

/// `override` actions.
#[derive(Debug, Clone, Subcommand)]
pub enum OverrideAction {
    /// Record a format's layout as an override of the master
    Set {
        /// Project id
        #[arg(long)]
        project: String,
        /// Format key
        #[arg(long)]
        format: String,
        /// Elements JSON array, or `-` for stdin
        #[arg(long)]
        input: PathBuf,
    },
    /// Drop a format's override
    Reset {
        /// Project id
        #[arg(long)]
        project: String,
        /// Format key
        #[arg(long)]
        format: String,
    },
}

/// Parse a catalogue key (`instagram:story`) or a custom size (`800x600`).
///
/// # Errors
///
/// Returns a message for unknown keys and unusable sizes.
pub fn parse_context(value: &str) -> Result<LayoutContext, String> {
    if let Some(context) = lookup_key(value) {
        return Ok(context);
    }
    let Some((w, h)) = value.split_once(['x', 'X']) else {
        return Err(format!("unknown format '{value}'"));
    };
    let width: f32 = w.trim().parse().map_err(|_| format!("bad width in '{value}'"))?;
    let height: f32 = h.trim().parse().map_err(|_| format!("bad height in '{value}'"))?;
    LayoutContext::new(width, height, "custom", format!("{w}x{h}")).map_err(|e| e.to_string())
}

/// Run a command and return what should be printed.
///
/// # Errors
///
/// Returns an error for unreadable input, unknown projects and store failures.
pub async fn run(args: CliArgs) -> anyhow::Result<String> {
    match args.command {
        Command::Formats => Ok(formats_table()),
        Command::List => {
            let store = open_store(&args.data_dir)?;
            Ok(serde_json::to_string_pretty(&store.list()?)?)
        }
        Command::Transform(transform) => {
            run_transform(&args.data_dir, args.advisor_url.as_deref(), transform).await
        }
        Command::Validate(validate_args) => run_validate(&args.data_dir, &validate_args),
        Command::Resolve { project, format } => {
            let store = open_store(&args.data_dir)?;
            let project = load_project(&store, &project)?;
            Ok(serde_json::to_string_pretty(&project.resolve(&format))?)
        }
        Command::Override { action } => run_override(&args.data_dir, action),
        Command::Import { input } => {
            let mut store = open_store(&args.data_dir)?;
            let project = store.import(&read_input(&input)?)?;
            tracing::info!(project = %project.id, "Imported project");
            Ok(serde_json::to_string_pretty(&json!({
                "id": &project.id,
                "name": &project.name,
                "formats": project.format_keys().collect::<Vec<_>>(),
            }))?)
        }
        Command::Export { project } => {
            let store = open_store(&args.data_dir)?;
            Ok(store.export(&project)?)
        }
    }
}

fn formats_table() -> String {
    FORMATS
        .iter()
        .map(|f| {
            let context = f.context();
            format!(
                "{:<22} {:>5}x{:<5} {:?}",
                context.format_key(),
                f.width,
                f.height,
                context.orientation()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn run_transform(
    data_dir: &Path,
    advisor_url: Option<&str>,
    args: TransformArgs,
) -> anyhow::Result<String> {
    let (elements, from, pinned_preset) = match (&args.input, &args.project) {
        (Some(input), _) => {
            let from = args
                .from
                .clone()
                .ok_or_else(|| anyhow!("--from is required with --input"))?;
            (read_elements(input, Some(&from))?, from, None)
        }
        (None, Some(id)) => {
            let store = open_store(data_dir)?;
            let project = load_project(&store, id)?;
            let from = match (&args.from, project.master_format.as_deref()) {
                (Some(from), _) => from.clone(),
                (None, Some(key)) => parse_context(key).map_err(|e| anyhow!(e))?,
                (None, None) => bail!("project {id} has no master format, pass --from"),
            };
            let resolved = project.resolve(&args.to.format_key());
            (resolved.elements, from, resolved.preset_id)
        }
        (None, None) => bail!("pass --input or --project"),
    };

    let options = TransformOptions {
        use_presets: !args.no_presets,
        use_offload: args.offload,
        preset_id: args.preset.or(pinned_preset),
        ..TransformOptions::default()
    };
    let engine = FormatEngine::builtin();

    let (out, source) = if args.advise {
        let url = advisor_url.ok_or_else(|| anyhow!("--advise needs SMART_FORMAT_ADVISOR_URL"))?;
        let advisor = HttpLayoutAdvisor::new(AdvisorConfig::new(url))?;
        let advice = advise(&engine, &advisor, &elements, &from, &args.to, &options).await;
        (advice.elements, format!("{:?}", advice.source).to_lowercase())
    } else if args.offload {
        let handle = OffloadHandle::spawn(engine);
        let out = handle.transform(&elements, &from, &args.to, &options).await;
        handle.shutdown().await;
        (out, "engine".to_string())
    } else {
        (engine.transform(&elements, &from, &args.to, &options), "engine".to_string())
    };

    tracing::debug!(
        from = %from.format_key(),
        to = %args.to.format_key(),
        elements = out.len(),
        source = %source,
        "Transformed layout"
    );

    if args.validate {
        let report = validate(&out, &args.to);
        Ok(serde_json::to_string_pretty(&json!({
            "elements": out,
            "validation": report,
        }))?)
    } else {
        Ok(serde_json::to_string_pretty(&out)?)
    }
}

fn run_validate(data_dir: &Path, args: &ValidateArgs) -> anyhow::Result<String> {
    let elements = match (&args.input, &args.project) {
        (Some(input), _) => read_elements(input, Some(&args.format))?,
        (None, Some(id)) => {
            let store = open_store(data_dir)?;
            load_project(&store, id)?
                .resolve(&args.format.format_key())
                .elements
        }
        (None, None) => bail!("pass --input or --project"),
    };
    let report = validate(&elements, &args.format);
    Ok(serde_json::to_string_pretty(&report)?)
}

fn run_override(data_dir: &Path, action: OverrideAction) -> anyhow::Result<String> {
    let mut store = open_store(data_dir)?;
    match action {
        OverrideAction::Set {
            project,
            format,
            input,
        } => {
            let mut project = load_project(&store, &project)?;
            let current = read_elements(&input, lookup_key(&format).as_ref())?;
            let set = project.set_override(&format, &current);
            store.save(&project)?;
            Ok(serde_json::to_string_pretty(&set)?)
        }
        OverrideAction::Reset { project, format } => {
            let mut project = load_project(&store, &project)?;
            let removed = project.reset_override(&format);
            if removed {
                store.save(&project)?;
            }
            Ok(serde_json::to_string_pretty(&json!({ "reset": removed }))?)
        }
    }
}

fn open_store(data_dir: &Path) -> anyhow::Result<ProjectStore<FileBackend>> {
    let backend = FileBackend::new(data_dir)
        .with_context(|| format!("opening project store at {}", data_dir.display()))?;
    Ok(ProjectStore::new(backend))
}

fn load_project(store: &ProjectStore<FileBackend>, id: &str) -> anyhow::Result<ProjectLayout> {
    store
        .load(id)
        .ok_or_else(|| anyhow!("project {id} not found"))
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("reading stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_elements(path: &Path, canvas: Option<&LayoutContext>) -> anyhow::Result<Vec<Element>> {
    let json = read_input(path)?;
    elements_from_json(&json, canvas)
        .with_context(|| format!("parsing elements from {}", path.display()))
}
