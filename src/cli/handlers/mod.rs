use std::path::Path;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::storage::DirStorage;
use crate::io::store::SettingsStore;
use crate::model::settings::GenerationMode;
use crate::model::tracker::{FieldKind, FieldValue};
use crate::ops::data_manager::{DataManager, InitOutcome};
use crate::ops::preset_manager::PresetManager;
use crate::parse::DataFormat;
use crate::ui::render::{Renderer, TextRenderer};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs, opened from one storage directory
struct Session {
    store: SettingsStore,
    data: DataManager,
    presets: PresetManager<DirStorage>,
}

impl Session {
    fn open(store_dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let config = config_io::read_config(store_dir)?;
        let storage = DirStorage::new(store_dir, config.chat_id.clone());
        Ok(Session {
            store: SettingsStore::load(storage.clone())?,
            data: DataManager::new(config_io::template_source(&config, store_dir)),
            presets: PresetManager::new(storage),
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let mut session = Session::open(&cli.store_dir)?;

    // Every command sees initialized data, the way the panel does on startup
    let outcome = session.data.ensure_initialized(&mut session.store).await;
    tracing::debug!(?outcome, "tracker ready");

    match cli.command {
        Commands::Init => cmd_init(&session, outcome),
        Commands::Show(args) => cmd_show(&session, args, json),
        Commands::Settings => cmd_settings(&session, json),
        Commands::Export(args) => cmd_export(&session, args),
        Commands::Import(args) => cmd_import(&mut session, args).await,
        Commands::Format(args) => cmd_format(&mut session, args),
        Commands::Depth(args) => cmd_depth(&mut session, args),
        Commands::Mode(args) => cmd_mode(&mut session, args),
        Commands::Prompt(args) => cmd_prompt(&mut session, args),
        Commands::Section(cmd) => cmd_section(&mut session, cmd),
        Commands::Subsection(cmd) => cmd_subsection(&mut session, cmd),
        Commands::Field(cmd) => cmd_field(&mut session, cmd),
        Commands::Preset(cmd) => cmd_preset(&mut session, cmd, json),
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_init(session: &Session, outcome: InitOutcome) -> CmdResult {
    let fields = session.store.settings().tracker_data.field_count();
    match outcome {
        InitOutcome::AlreadyInitialized => println!("already initialized ({} fields)", fields),
        InitOutcome::FromTemplate => println!("initialized from template ({} fields)", fields),
        InitOutcome::Empty => println!("template unavailable, started with an empty tracker"),
        InitOutcome::InFlight => println!("initialization already running"),
    }
    Ok(())
}

fn cmd_show(session: &Session, args: ShowArgs, json: bool) -> CmdResult {
    if json {
        println!("{}", session.data.export_tracker_data(&session.store)?);
        return Ok(());
    }
    let mut renderer = TextRenderer::new(args.ids);
    renderer.render_tracker(&session.store.settings().tracker_data);
    println!("{}", renderer.text());
    Ok(())
}

fn cmd_settings(session: &Session, json: bool) -> CmdResult {
    let summary = settings_json(session.store.settings());
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", format_settings(&summary));
    }
    Ok(())
}

fn cmd_export(session: &Session, args: ExportArgs) -> CmdResult {
    let format = match args.format.as_deref() {
        Some(tag) => parse_format(tag)?,
        None => session.store.settings().data_format,
    };
    let file = session.data.export_tracker_file(&session.store, format)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, &file.contents)
                .map_err(|e| format!("could not write {}: {}", path.display(), e))?;
            println!("exported {}", path.display());
        }
        None => println!("{}", file.contents),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings commands
// ---------------------------------------------------------------------------

async fn cmd_import(session: &mut Session, args: ImportArgs) -> CmdResult {
    let mut renderer = TextRenderer::new(false);
    let count = session
        .data
        .import_tracker_file(&mut session.store, &mut renderer, &args.file)
        .await?;
    println!("imported {} sections from {}", count, args.file.display());
    Ok(())
}

fn cmd_format(session: &mut Session, args: FormatArgs) -> CmdResult {
    let format = parse_format(&args.format)?;
    session.data.set_data_format(&mut session.store, format)?;
    println!("format: {}", format);
    Ok(())
}

fn cmd_depth(session: &mut Session, args: DepthArgs) -> CmdResult {
    let depth = session.store.set_update_depth_str(&args.value)?;
    println!("update depth: {}", depth);
    Ok(())
}

fn cmd_mode(session: &mut Session, args: ModeArgs) -> CmdResult {
    let mode = GenerationMode::parse_mode(&args.mode)?;
    session.store.set_generation_mode(mode)?;
    println!("generation mode: {}", mode);
    Ok(())
}

fn cmd_prompt(session: &mut Session, args: PromptArgs) -> CmdResult {
    match args.text {
        Some(text) => session.data.set_system_prompt(&mut session.store, &text)?,
        None => println!("{}", session.store.settings().system_prompt),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Structure commands
// ---------------------------------------------------------------------------

fn cmd_section(session: &mut Session, cmd: SectionCmd) -> CmdResult {
    let mut renderer = TextRenderer::new(false);
    match cmd.action {
        SectionAction::Add { name } => {
            let section = session
                .data
                .add_section(&mut session.store, &mut renderer, &name)?;
            println!("{}", section.id);
        }
        SectionAction::Rm { id } => {
            let removed = session
                .data
                .delete_section(&mut session.store, &mut renderer, &id)?;
            println!("removed section {}", removed.name);
        }
    }
    Ok(())
}

fn cmd_subsection(session: &mut Session, cmd: SubsectionCmd) -> CmdResult {
    let mut renderer = TextRenderer::new(false);
    match cmd.action {
        SubsectionAction::Add { section_id, name } => {
            let subsection = session.data.add_subsection(
                &mut session.store,
                &mut renderer,
                &section_id,
                &name,
            )?;
            println!("{}", subsection.id);
        }
        SubsectionAction::Rm { id } => {
            let removed = session
                .data
                .delete_subsection(&mut session.store, &mut renderer, &id)?;
            println!("removed subsection {}", removed.name);
        }
    }
    Ok(())
}

fn cmd_field(session: &mut Session, cmd: FieldCmd) -> CmdResult {
    let mut renderer = TextRenderer::new(false);
    match cmd.action {
        FieldAction::Add {
            subsection_id,
            name,
            kind,
        } => {
            let kind = FieldKind::parse_kind(&kind)
                .ok_or_else(|| format!("unknown field type: {}", kind))?;
            let field = session.data.add_field(
                &mut session.store,
                &mut renderer,
                &subsection_id,
                &name,
                kind,
            )?;
            println!("{}", field.id);
        }
        FieldAction::Set { id, value, name } => {
            let current = session
                .store
                .settings()
                .tracker_data
                .get_field_by_id(&id)
                .cloned()
                .ok_or_else(|| format!("field not found: {}", id))?;
            let value = FieldValue::coerce(current.kind(), &serde_json::Value::String(value))
                .map_err(|e| format!("invalid value: {}", e))?;
            let name = name.unwrap_or(current.name);
            let field =
                session
                    .data
                    .update_field(&mut session.store, &mut renderer, &id, &name, value)?;
            println!("{}: {}", field.name, field.value);
        }
        FieldAction::Rm { id } => {
            let removed = session
                .data
                .delete_field(&mut session.store, &mut renderer, &id)?;
            println!("removed field {}", removed.name);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Preset commands
// ---------------------------------------------------------------------------

fn cmd_preset(session: &mut Session, cmd: PresetCmd, json: bool) -> CmdResult {
    match cmd.action {
        PresetAction::List => {
            let catalog = session.presets.list_presets();
            let dropdown = session.presets.populate_preset_dropdown(&session.store);
            let presets = preset_list_json(&catalog, dropdown);
            if json {
                println!("{}", serde_json::to_string_pretty(&presets)?);
            } else {
                println!("{}", format_preset_list(&presets));
            }
        }
        PresetAction::Save { name } => {
            if !session.presets.save_preset(&session.store, &name)? {
                return Err("preset name must not be empty".into());
            }
            println!("saved preset {}", name.trim());
        }
        PresetAction::Load { name } => {
            let mut renderer = TextRenderer::new(false);
            if !session
                .presets
                .load_preset(&mut session.store, &mut renderer, &name)?
            {
                return Err(format!("preset not found: {}", name).into());
            }
            println!("loaded preset {}", name.trim());
        }
        PresetAction::Delete { name } => {
            if !session.presets.delete_preset(&session.store, &name)? {
                return Err(format!("preset not found: {}", name).into());
            }
            println!("deleted preset {}", name.trim());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strict format parsing for user input; unknown names are an error here
fn parse_format(tag: &str) -> Result<DataFormat, String> {
    DataFormat::ALL
        .iter()
        .copied()
        .find(|f| f.tag().eq_ignore_ascii_case(tag.trim()))
        .ok_or_else(|| format!("unknown format: {} (expected json or yaml)", tag))
}
