use clap::{Parser, Subcommand};
use protocol_core::duration::format_clock;
use protocol_core::export::{cleanup_processed_journals, journal_to_csv_and_archive};
use protocol_core::progress::summarize;
use protocol_core::session::{
    delete_protocol, finish_session, record_performance, start_block_session, start_session,
};
use protocol_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "trainlog")]
#[command(about = "Training protocol and workout session tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this user (defaults to the configured user)
    #[arg(long, global = true)]
    user: Option<UserId>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add the built-in protocols to the store
    Seed,

    /// List stored protocols
    Protocols,

    /// Import a protocol template from a JSON file
    Import {
        path: PathBuf,
    },

    /// Start a session from a protocol (id or name)
    Start {
        protocol: String,

        /// Log every exercise as prescribed and finish immediately
        #[arg(long)]
        auto_complete: bool,
    },

    /// Start an ad-hoc session from a single block
    Block {
        block: BlockId,
    },

    /// Log one exercise of a session
    Log {
        instance: InstanceId,
        exercise: ExerciseInstanceId,

        /// Reps completed
        #[arg(long, default_value_t = 0)]
        reps: u32,

        /// Time spent, e.g. 90s, 2min, 1hr
        #[arg(long)]
        duration: Option<DurationValue>,

        /// Rest taken afterwards
        #[arg(long)]
        rest: Option<DurationValue>,
    },

    /// Show a session and its progress
    Status {
        instance: InstanceId,
    },

    /// Mark a session finished and journal it
    Finish {
        instance: InstanceId,
    },

    /// List your sessions, newest first
    History,

    /// Delete a protocol template (id or name)
    Delete {
        protocol: String,

        /// Delete even if unfinished sessions still reference it
        #[arg(long)]
        force: bool,
    },

    /// Roll the session journal up to CSV
    Rollup {
        /// Clean up processed journals after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

/// Resolved runtime settings shared by every command
struct App {
    data_dir: PathBuf,
    user: UserId,
    catalog: Catalog,
    config: Config,
    store: FileStore,
}

impl App {
    fn journal(&self) -> JsonlJournal {
        JsonlJournal::new(journal_path(&self.data_dir))
    }
}

fn journal_path(data_dir: &Path) -> PathBuf {
    data_dir.join("journal").join("sessions.jsonl")
}

fn main() -> Result<()> {
    protocol_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let catalog = Catalog::with_custom(&config.catalog.custom);
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Config("Invalid exercise catalog".into()));
    }

    let mut app = App {
        store: FileStore::new(data_dir.join("store.json")),
        user: cli.user.unwrap_or(config.user.id),
        data_dir,
        catalog,
        config,
    };

    match cli.command {
        Commands::Seed => cmd_seed(&mut app),
        Commands::Protocols => cmd_protocols(&app),
        Commands::Import { path } => cmd_import(&mut app, &path),
        Commands::Start {
            protocol,
            auto_complete,
        } => cmd_start(&mut app, &protocol, auto_complete),
        Commands::Block { block } => cmd_block(&mut app, block),
        Commands::Log {
            instance,
            exercise,
            reps,
            duration,
            rest,
        } => cmd_log(
            &mut app,
            instance,
            exercise,
            Performance {
                reps,
                duration,
                rest,
            },
        ),
        Commands::Status { instance } => cmd_status(&app, instance),
        Commands::Finish { instance } => cmd_finish(&mut app, instance),
        Commands::History => cmd_history(&app),
        Commands::Delete { protocol, force } => cmd_delete(&mut app, &protocol, force),
        Commands::Rollup { cleanup } => cmd_rollup(&app, cleanup),
    }
}

fn cmd_seed(app: &mut App) -> Result<()> {
    let existing: Vec<String> = app
        .store
        .list_protocols()?
        .into_iter()
        .map(|p| p.name.to_lowercase())
        .collect();

    let mut added = 0;
    for protocol in build_default_protocols(&app.catalog)? {
        if existing.contains(&protocol.name.to_lowercase()) {
            continue;
        }
        app.store.save_protocol(&protocol)?;
        added += 1;
    }

    println!("✓ Seeded {} protocols", added);
    Ok(())
}

fn cmd_protocols(app: &App) -> Result<()> {
    let protocols = app.store.list_protocols()?;
    if protocols.is_empty() {
        println!("No protocols yet. Run `trainlog seed` or `trainlog import <file>`.");
        return Ok(());
    }

    for protocol in protocols {
        println!(
            "{}  {}  ({} blocks, ~{})",
            protocol.id,
            protocol.name,
            protocol.blocks.len(),
            format_clock(protocol.prescribed_seconds())
        );
        for block in &protocol.blocks {
            println!("    {}  {}", block.id, block.name);
        }
    }
    Ok(())
}

fn cmd_import(app: &mut App, path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)?;
    let protocol: Protocol = serde_json::from_str(&contents)?;
    protocol.validate(&app.catalog)?;

    app.store.save_protocol(&protocol)?;
    println!("✓ Imported protocol '{}' ({})", protocol.name, protocol.id);
    Ok(())
}

fn cmd_start(app: &mut App, protocol: &str, auto_complete: bool) -> Result<()> {
    let protocol = find_protocol(&app.store, protocol)?;
    let now = chrono::Utc::now();
    let instance = start_session(&mut app.store, protocol.id, app.user, now)?;

    println!("✓ Started session {}", instance.id);

    if !auto_complete {
        display_instance(app, &instance)?;
        return Ok(());
    }

    let leaves: Vec<_> = instance
        .leaves()
        .map(|leaf| (leaf.id, leaf.prescribed.clone()))
        .collect();
    for (id, prescribed) in leaves {
        let performance = Performance {
            reps: prescribed.reps.unwrap_or(0).saturating_mul(prescribed.sets),
            duration: prescribed.duration,
            rest: Some(prescribed.rest),
        };
        record_performance(&mut app.store, instance.id, id, performance, now)?;
    }

    let mut journal = app.journal();
    let finished = finish_session(&mut app.store, &mut journal, instance.id, now)?;
    display_instance(app, &finished)?;
    println!("\n✓ Session logged!");
    Ok(())
}

fn cmd_block(app: &mut App, block: BlockId) -> Result<()> {
    let instance = start_block_session(&mut app.store, block, app.user, chrono::Utc::now())?;
    println!("✓ Started session {}", instance.id);
    display_instance(app, &instance)
}

fn cmd_log(
    app: &mut App,
    instance: InstanceId,
    exercise: ExerciseInstanceId,
    performance: Performance,
) -> Result<()> {
    let updated = record_performance(
        &mut app.store,
        instance,
        exercise,
        performance,
        chrono::Utc::now(),
    )?;
    println!("✓ Logged exercise {}", exercise);
    display_instance(app, &updated)
}

fn cmd_status(app: &App, instance: InstanceId) -> Result<()> {
    let instance = app
        .store
        .load_instance(instance)?
        .ok_or_else(|| Error::NotFound {
            kind: "instance",
            id: instance.to_string(),
        })?;
    display_instance(app, &instance)
}

fn cmd_finish(app: &mut App, instance: InstanceId) -> Result<()> {
    let mut journal = app.journal();
    let finished = finish_session(&mut app.store, &mut journal, instance, chrono::Utc::now())?;
    display_instance(app, &finished)?;
    println!("\n✓ Session logged!");
    Ok(())
}

fn cmd_history(app: &App) -> Result<()> {
    let instances = app.store.list_instances(app.user)?;
    if instances.is_empty() {
        println!("No sessions yet.");
        return Ok(());
    }

    for instance in instances {
        let summary = summarize(&instance);
        println!(
            "{}  {}  {}  {}  {}/{}  [{}]",
            instance.started_at.format("%Y-%m-%d %H:%M"),
            instance.id,
            instance.name,
            summary.elapsed_clock,
            summary.completed,
            summary.total,
            if instance.is_completed() { "done" } else { "open" }
        );
    }
    Ok(())
}

fn cmd_delete(app: &mut App, protocol: &str, force: bool) -> Result<()> {
    let protocol = find_protocol(&app.store, protocol)?;
    let policy = if force {
        DeletePolicy::Detach
    } else {
        app.config.protocols.delete_policy
    };

    let removed = delete_protocol(&mut app.store, protocol.id, policy)?;
    println!("✓ Deleted protocol '{}'", removed.name);
    Ok(())
}

fn cmd_rollup(app: &App, cleanup: bool) -> Result<()> {
    let journal_path = journal_path(&app.data_dir);
    let csv_path = app.data_dir.join("sessions.csv");

    if !journal_path.exists() {
        println!("No journal found - nothing to roll up.");
        return Ok(());
    }

    let count = journal_to_csv_and_archive(&journal_path, &csv_path)?;

    println!("✓ Rolled up {} sessions to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        if let Some(dir) = journal_path.parent() {
            let cleaned = cleanup_processed_journals(dir)?;
            if cleaned > 0 {
                println!("✓ Cleaned up {} processed journals", cleaned);
            }
        }
    }

    Ok(())
}

/// Look a protocol up by id, falling back to a case-insensitive name match
fn find_protocol(store: &FileStore, key: &str) -> Result<Protocol> {
    if let Ok(id) = key.parse::<ProtocolId>() {
        if let Some(protocol) = store.load_protocol(id)? {
            return Ok(protocol);
        }
    }

    store
        .list_protocols()?
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(key.trim()))
        .ok_or_else(|| Error::NotFound {
            kind: "protocol",
            id: key.to_string(),
        })
}

fn display_instance(app: &App, instance: &WorkoutInstance) -> Result<()> {
    let summary = summarize(instance);
    let template = match resolve_protocol(&app.store, instance)? {
        TemplateLookup::Resolved(protocol) => protocol.name,
        TemplateLookup::Freeform => "(freeform)".to_string(),
        TemplateLookup::Dangling(_) => "(template deleted)".to_string(),
    };

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", instance.name);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Session:  {}", instance.id);
    println!("  Template: {}", template);
    println!(
        "  Started:  {}",
        instance.started_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(ended) = instance.ended_at {
        println!("  Finished: {}", ended.format("%Y-%m-%d %H:%M"));
    }
    println!(
        "  Progress: {}/{} ({:.0}%)  Elapsed {}  Remaining {}",
        summary.completed,
        summary.total,
        summary.ratio * 100.0,
        summary.elapsed_clock,
        summary.remaining_clock
    );

    for ((idx, block), progress) in instance.blocks.iter().enumerate().zip(&summary.blocks) {
        println!();
        println!(
            "  [{}] {}  ({}/{})",
            idx + 1,
            block.name,
            progress.completed,
            progress.total
        );
        for leaf in &block.exercises {
            let mark = if leaf.completed { "✓" } else { "·" };
            let target = match (leaf.prescribed.reps, leaf.prescribed.duration) {
                (Some(reps), _) => format!("{}x{}", leaf.prescribed.sets, reps),
                (None, Some(duration)) => format!("{}x{}", leaf.prescribed.sets, duration),
                (None, None) => format!("{} sets", leaf.prescribed.sets),
            };
            let actual = if leaf.completed {
                format!(
                    "  done {} reps, {}",
                    leaf.actual_reps,
                    format_clock(to_seconds(leaf.actual_duration.as_ref()))
                )
            } else {
                String::new()
            };
            println!(
                "      {} {}  {}  rest {}{}",
                mark,
                app.catalog.display_name(&leaf.exercise_id),
                target,
                leaf.prescribed.rest,
                actual
            );
            println!("        id: {}", leaf.id);
        }
    }
    println!();
    Ok(())
}
