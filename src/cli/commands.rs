use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "story-tracker", about = concat!("story-tracker v", env!("CARGO_PKG_VERSION"), " - structured story state for chat companions"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Storage directory holding settings, chat data and presets
    #[arg(short = 'C', long = "store-dir", global = true, default_value = ".story-tracker")]
    pub store_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fill an empty tracker from the default template
    Init,
    /// Show the tracker tree
    Show(ShowArgs),
    /// Show the current settings
    Settings,
    /// Export tracker data
    Export(ExportArgs),
    /// Replace tracker data with the contents of a file
    Import(ImportArgs),
    /// Set the preferred interchange format (json, yaml)
    Format(FormatArgs),
    /// Set how many recent messages a tracker update considers (1-20)
    Depth(DepthArgs),
    /// Set the generation mode (together, separate)
    Mode(ModeArgs),
    /// Show or set the system prompt
    Prompt(PromptArgs),
    /// Manage sections
    Section(SectionCmd),
    /// Manage subsections
    Subsection(SubsectionCmd),
    /// Manage fields
    Field(FieldCmd),
    /// Manage presets
    Preset(PresetCmd),
}

// ---------------------------------------------------------------------------
// Read / settings args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// Include element IDs
    #[arg(long)]
    pub ids: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output format (default: the preferred format from settings)
    #[arg(long)]
    pub format: Option<String>,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// File to import (.json, .yaml or .yml)
    pub file: PathBuf,
}

#[derive(Args)]
pub struct FormatArgs {
    pub format: String,
}

#[derive(Args)]
pub struct DepthArgs {
    pub value: String,
}

#[derive(Args)]
pub struct ModeArgs {
    pub mode: String,
}

#[derive(Args)]
pub struct PromptArgs {
    /// New system prompt (omit to print the current one)
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// Structure args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SectionCmd {
    #[command(subcommand)]
    pub action: SectionAction,
}

#[derive(Subcommand)]
pub enum SectionAction {
    /// Add a section at the end
    Add { name: String },
    /// Remove a section and everything in it
    Rm { id: String },
}

#[derive(Args)]
pub struct SubsectionCmd {
    #[command(subcommand)]
    pub action: SubsectionAction,
}

#[derive(Subcommand)]
pub enum SubsectionAction {
    /// Add a subsection to a section
    Add { section_id: String, name: String },
    /// Remove a subsection and its fields
    Rm { id: String },
}

#[derive(Args)]
pub struct FieldCmd {
    #[command(subcommand)]
    pub action: FieldAction,
}

#[derive(Subcommand)]
pub enum FieldAction {
    /// Add a field to a subsection
    Add {
        subsection_id: String,
        name: String,
        /// Field type: text, number, boolean
        #[arg(long = "type", default_value = "text")]
        kind: String,
    },
    /// Set a field's value (and optionally rename it)
    Set {
        id: String,
        value: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove a field
    Rm { id: String },
}

// ---------------------------------------------------------------------------
// Preset args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct PresetCmd {
    #[command(subcommand)]
    pub action: PresetAction,
}

#[derive(Subcommand)]
pub enum PresetAction {
    /// List saved presets
    List,
    /// Save the current prompt and tracker data under a name
    Save { name: String },
    /// Make a saved preset live
    Load { name: String },
    /// Delete a saved preset
    Delete { name: String },
}
