use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use property_wizard::api::{HttpPropertiesService, PropertiesService};
use property_wizard::config::Config;
use property_wizard::logging;
use property_wizard::services::{SessionError, WizardSession};
use property_wizard::wizard::persist::DraftFile;
use property_wizard::wizard::{
    step_order, FormPatch, PropertyType, RoomPatch, SyncStatus, WizardMode, WizardStep,
    WizardStore,
};

#[derive(Parser)]
#[command(name = "property-wizard")]
#[command(about = "Guided creation of rental property listings")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the step order for a property type
    Steps {
        /// Property type (defaults to the draft's type)
        #[arg(short = 't', long = "type")]
        property_type: Option<String>,

        /// Wizard mode: fast or full (defaults to the draft's mode)
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Show the current draft
    Status,

    /// Merge a JSON object into the form data
    Set {
        /// Patch, e.g. '{"type":"maison","ville":"Nantes"}'
        patch: String,
    },

    /// Go to the next step
    Next {
        /// Move on even if the current step has issues
        #[arg(short, long)]
        force: bool,
    },

    /// Go back one step
    Prev,

    /// Jump to a step by key
    Goto { step: String },

    /// Switch between fast and full mode
    Mode { mode: String },

    /// Manage rooms
    Room {
        #[command(subcommand)]
        action: RoomCommand,
    },

    /// Manage photos
    Photos {
        #[command(subcommand)]
        action: PhotosCommand,
    },

    /// Discard the local draft
    Reset,

    /// Start a new draft on the properties service
    New,

    /// Load an existing property from the service
    Resume { id: String },

    /// Push the local draft to the properties service
    Sync,

    /// Write the effective configuration to .property-wizard/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum RoomCommand {
    /// Add a room
    Add {
        /// Room kind (e.g. chambre, cuisine)
        #[arg(short = 't', long = "type")]
        type_piece: Option<String>,

        /// Surface in m²
        #[arg(short, long)]
        surface: Option<f64>,

        #[arg(short, long)]
        label: Option<String>,
    },

    /// Update a room
    Update {
        id: Uuid,

        #[arg(short = 't', long = "type")]
        type_piece: Option<String>,

        #[arg(short, long)]
        surface: Option<f64>,

        #[arg(short, long)]
        label: Option<String>,

        /// Fields to clear (type, surface, label)
        #[arg(long, value_enum)]
        clear: Vec<RoomField>,
    },

    /// Remove a room
    Rm { id: Uuid },
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum RoomField {
    Type,
    Surface,
    Label,
}

/// `Some(Some(v))` when set, `Some(None)` when cleared, `None` otherwise
fn room_field<T>(value: Option<T>, clear: &[RoomField], field: RoomField) -> Option<Option<T>> {
    if clear.contains(&field) {
        Some(None)
    } else {
        value.map(Some)
    }
}

#[derive(Subcommand)]
enum PhotosCommand {
    /// Import photos from URLs
    Import {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let logging_handle = logging::init_logging(&config, cli.debug)?;

    let result = run(&config, cli.command).await;

    print_log_path(logging_handle.log_file_path);
    result
}

async fn run(config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Steps {
            property_type,
            mode,
        } => cmd_steps(config, property_type, mode),
        Commands::Status => cmd_status(config),
        Commands::Set { patch } => cmd_set(config, &patch),
        Commands::Next { force } => cmd_next(config, force),
        Commands::Prev => edit_local(config, |store| {
            store.prev_step();
            print_step(store);
            Ok(())
        }),
        Commands::Goto { step } => {
            let step = WizardStep::from_str(&step)?;
            edit_local(config, |store| {
                store.set_step(step);
                print_step(store);
                Ok(())
            })
        }
        Commands::Mode { mode } => {
            let mode = parse_mode(&mode)?;
            edit_local(config, |store| {
                store.set_mode(mode);
                println!("Mode: {}", mode.key());
                Ok(())
            })
        }
        Commands::Room { action } => cmd_room(config, action),
        Commands::Photos {
            action: PhotosCommand::Import { urls },
        } => edit_local(config, |store| {
            store.set_pending_photo_urls(urls);
            let imported = store.import_pending_photos();
            println!("Imported {} photo(s), {} total", imported, store.photos().len());
            Ok(())
        }),
        Commands::Reset => {
            DraftFile::from_config(config).clear()?;
            println!("Local draft discarded");
            Ok(())
        }
        Commands::New => cmd_new(config).await,
        Commands::Resume { id } => cmd_resume(config, &id).await,
        Commands::Sync => cmd_sync(config).await,
        Commands::Init { force } => cmd_init(config, force),
    }
}

fn print_log_path(log_file_path: Option<PathBuf>) {
    if let Some(log_path) = log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }
}

fn parse_mode(key: &str) -> Result<WizardMode> {
    WizardMode::from_key(key).with_context(|| format!("Unknown mode '{}' (fast|full)", key))
}

fn new_store(config: &Config) -> WizardStore {
    let mut store = WizardStore::new(config.wizard.history_limit);
    store.set_mode(config.wizard.default_mode);
    store
}

fn load_store(config: &Config) -> Result<WizardStore> {
    Ok(DraftFile::from_config(config)
        .load(config.wizard.history_limit)?
        .unwrap_or_else(|| new_store(config)))
}

/// Load the local draft, apply `f`, and write it back
fn edit_local(config: &Config, f: impl FnOnce(&mut WizardStore) -> Result<()>) -> Result<()> {
    let file = DraftFile::from_config(config);
    let mut store = load_store(config)?;
    f(&mut store)?;
    file.save(&store)
}

fn build_service(config: &Config) -> Result<Arc<dyn PropertiesService>> {
    let service = HttpPropertiesService::from_config(&config.service)
        .context("Failed to configure properties service")?;
    Ok(Arc::new(service))
}

/// Point at the token variable when the service rejects our credentials
fn session_error(config: &Config, err: SessionError) -> anyhow::Error {
    match err {
        SessionError::Service(e) if e.is_auth_error() => anyhow::anyhow!(
            "{} (check the token in ${})",
            e,
            config.service.api_key_env
        ),
        other => other.into(),
    }
}

fn print_step(store: &WizardStore) {
    let (position, total) = store.progress();
    let step = store.current_step();
    println!("Step {}/{}: {} ({})", position, total, step.label(), step.key());
}

fn cmd_steps(config: &Config, property_type: Option<String>, mode: Option<String>) -> Result<()> {
    let store = load_store(config)?;
    let property_type = property_type
        .map(PropertyType::from)
        .or_else(|| store.form_data().property_type.clone());
    let mode = match mode {
        Some(key) => parse_mode(&key)?,
        None => store.mode(),
    };

    let type_label = property_type
        .as_ref()
        .map_or("(none)", PropertyType::as_str)
        .to_string();
    println!("Steps for {} [{}]", type_label, mode.key());
    println!("{}", "─".repeat(40));
    for (i, step) in step_order(property_type.as_ref(), mode).iter().enumerate() {
        println!("{:>2}. {:<16} {}", i + 1, step.key(), step.label());
    }
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    let file = DraftFile::from_config(config);
    let Some(store) = file.load(config.wizard.history_limit)? else {
        println!("No local draft ({})", file.path().display());
        return Ok(());
    };

    let form = store.form_data();
    println!("Property Draft");
    println!("{}", "─".repeat(40));
    println!("  ID:       {}", store.property_id().unwrap_or("(not created)"));
    if let Some(building_id) = store.building_id() {
        println!("  Building: {}", building_id);
    }
    println!(
        "  Type:     {}",
        form.property_type
            .as_ref()
            .map_or("(none)", PropertyType::as_str)
    );
    println!("  Mode:     {}", store.mode().key());
    println!("  Etat:     {}", form.etat);
    if let Some(address) = &form.adresse_complete {
        println!("  Address:  {}", address);
    }
    print_step(&store);

    if !store.rooms().is_empty() {
        println!();
        println!("Rooms ({})", store.rooms().len());
        for room in store.rooms() {
            println!(
                "  {} {} {}",
                room.id,
                room.type_piece.as_deref().unwrap_or("-"),
                room.surface_m2.map(|s| format!("{} m²", s)).unwrap_or_default()
            );
        }
    }
    let import = store.photo_import_progress();
    if !import.is_complete() {
        println!(
            "  Import:   {}/{} photos imported",
            import.imported, import.total
        );
    }
    if !store.photos().is_empty() {
        println!();
        println!("Photos ({})", store.photos().len());
        for photo in store.photos() {
            let marker = if photo.is_main { "*" } else { " " };
            println!("  {} {}", marker, photo.url);
        }
    }

    let issues = store.validate_current_step();
    if !issues.is_empty() {
        println!();
        println!("Issues on this step:");
        for issue in issues {
            println!("  {}: {}", issue.field, issue.message);
        }
    }
    Ok(())
}

fn cmd_set(config: &Config, patch: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(patch).context("Patch is not valid JSON")?;
    let patch = FormPatch::from_json(value).context("Invalid form patch")?;
    edit_local(config, |store| {
        store.update_form_data(patch);
        println!("Form updated");
        Ok(())
    })
}

fn cmd_next(config: &Config, force: bool) -> Result<()> {
    edit_local(config, |store| {
        let issues = store.validate_current_step();
        if !issues.is_empty() && !force {
            for issue in &issues {
                println!("  {}: {}", issue.field, issue.message);
            }
            anyhow::bail!(
                "Step '{}' is incomplete (use --force to continue anyway)",
                store.current_step()
            );
        }
        store.next_step();
        print_step(store);
        Ok(())
    })
}

fn cmd_room(config: &Config, action: RoomCommand) -> Result<()> {
    edit_local(config, |store| match action {
        RoomCommand::Add {
            type_piece,
            surface,
            label,
        } => {
            let id = store.add_room(RoomPatch {
                type_piece: type_piece.map(Some),
                surface_m2: surface.map(Some),
                label: label.map(Some),
            });
            println!("Added room {}", id);
            Ok(())
        }
        RoomCommand::Update {
            id,
            type_piece,
            surface,
            label,
            clear,
        } => {
            let patch = RoomPatch {
                type_piece: room_field(type_piece, &clear, RoomField::Type),
                surface_m2: room_field(surface, &clear, RoomField::Surface),
                label: room_field(label, &clear, RoomField::Label),
            };
            if !store.update_room(id, patch) {
                anyhow::bail!("No room with id {}", id);
            }
            println!("Updated room {}", id);
            Ok(())
        }
        RoomCommand::Rm { id } => {
            if !store.remove_room(id) {
                anyhow::bail!("No room with id {}", id);
            }
            println!("Removed room {}", id);
            Ok(())
        }
    })
}

async fn cmd_new(config: &Config) -> Result<()> {
    let file = DraftFile::from_config(config);
    if file.exists() {
        anyhow::bail!(
            "A local draft already exists ({}); run 'property-wizard reset' first",
            file.path().display()
        );
    }

    let session = WizardSession::new(build_service(config)?, &config.wizard);
    let id = session
        .ensure_draft()
        .await
        .map_err(|e| session_error(config, e))?;
    file.save(&session.snapshot())?;
    println!("Created draft {}", id);
    Ok(())
}

async fn cmd_resume(config: &Config, id: &str) -> Result<()> {
    let session = WizardSession::resume(build_service(config)?, &config.wizard, id)
        .await
        .map_err(|e| session_error(config, e))?;
    let store = session.snapshot();
    DraftFile::from_config(config).save(&store)?;
    println!("Resumed draft {}", id);
    print_step(&store);
    Ok(())
}

fn cmd_init(config: &Config, force: bool) -> Result<()> {
    let path = Config::local_config_path();
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    let path = config.save()?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn cmd_sync(config: &Config) -> Result<()> {
    let file = DraftFile::from_config(config);
    let store = load_store(config)?;
    let session = WizardSession::from_store(build_service(config)?, &config.wizard, store);

    let status = session.save_now().await;
    let store = session.snapshot();
    // Keep the property id even when the update itself failed
    file.save(&store)?;

    match status {
        SyncStatus::Saved => {
            println!(
                "Draft {} saved",
                store.property_id().unwrap_or("(unknown)")
            );
            Ok(())
        }
        _ => anyhow::bail!(
            "Sync failed: {}",
            store.sync().last_error().unwrap_or("unknown error")
        ),
    }
}
