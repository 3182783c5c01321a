use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use appsweep::commands::hooks::{BrewCaskCleanup, RemovalHook, SentinelRearm};
use appsweep::commands::registry::TrashedHistory;
use appsweep::commands::scan::scan_app;
use appsweep::commands::settings::{get_settings, update_setting};
use appsweep::commands::uninstall::uninstall_selection;
use appsweep::commands::{Session, SharedSession};
use appsweep::db::Database;
use appsweep::detection::identity_for;
use appsweep::discovery::{AppPathFinder, DiskInfoProvider, PathCatalog, ProgressFn};
use appsweep::models::{
    ApplicationProfile, RegistryChange, ScanProgress, SentinelEvent, SweepSettings,
};
use appsweep::platform::trash::SystemTrash;
use appsweep::scheduler::{arm_if_enabled, default_trash_dir, Sentinel};
use appsweep::utils::{expand_tilde, AppError, AppResult};

#[derive(Parser)]
#[command(name = "appsweep", version, about = "Find and trash the files an app leaves behind")]
struct Cli {
    /// Database file (defaults to the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List everything that belongs to an app
    Scan {
        /// App bundle path or name
        app: String,
        #[arg(long)]
        json: bool,
    },
    /// Move an app and its leftovers to the trash
    Uninstall {
        app: String,
        /// Include ambiguous matches
        #[arg(long)]
        all: bool,
        /// Leave the app bundle in place and only remove leftovers
        #[arg(long)]
        keep_bundle: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show apps whose leftovers were trashed
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Report app bundles dropped into the trash
    Watch,
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print every setting as JSON
    Show,
    /// Change one setting, e.g. `set ambiguousNameLen 4`
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let db_path = cli
        .db
        .or_else(Database::default_path)
        .ok_or_else(|| AppError::Custom("Cannot determine data directory".into()))?;
    let db = Database::new(&db_path)?;
    let settings = db.load_settings();
    let db = Arc::new(Mutex::new(db));

    match cli.command {
        Command::Scan { app, json } => {
            let session = build_session(&db, settings, None).await?;
            let profile = scan(&session, &app).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                let selection: Vec<PathBuf> =
                    session.lock().await.selection().iter().cloned().collect();
                print_profile(&profile, &selection);
            }
        }
        Command::Uninstall {
            app,
            all,
            keep_bundle,
            dry_run,
        } => {
            let sentinel = arm_if_enabled(
                &settings,
                default_trash_dir(),
                Arc::new(|event: SentinelEvent| {
                    let SentinelEvent::AppTrashed(path) = event;
                    log::info!("{} moved to the trash", path.display());
                }),
            );
            let session = build_session(&db, settings, sentinel).await?;
            let profile = scan(&session, &app).await?;
            let selection: Vec<PathBuf> = {
                let mut s = session.lock().await;
                if all {
                    s.select_all();
                }
                if keep_bundle {
                    s.deselect(&profile.identity.bundle_root());
                }
                s.selection().iter().cloned().collect()
            };

            if dry_run {
                print_profile(&profile, &selection);
                return Ok(());
            }

            let summary = uninstall_selection(&session, Some(&db)).await?;
            for (path, err) in summary.report.failed() {
                eprintln!("  failed  {}: {}", path.display(), err);
            }
            match summary.outcome.change {
                RegistryChange::Removed { app_path } => {
                    println!("Uninstalled {}", app_path.display());
                }
                RegistryChange::Archived { app_path } => {
                    let reclaimed = summary
                        .outcome
                        .record
                        .as_ref()
                        .map(|r| r.reclaimed_bytes)
                        .unwrap_or(0);
                    println!(
                        "Trashed leftovers of {} ({})",
                        app_path.display(),
                        format_size(reclaimed)
                    );
                }
            }
            println!(
                "{} moved, {} failed",
                summary.report.moved().len(),
                summary.report.failed().len()
            );
        }
        Command::History { limit } => {
            let db = db.lock().await;
            let entries = db.get_trashed_history(limit)?;
            if entries.is_empty() {
                println!("No history");
            }
            for entry in &entries {
                println!(
                    "{}  {:<30} {:>10}  {} removed, {} failed",
                    entry.trashed_at,
                    entry.app_name,
                    format_size(entry.reclaimed_bytes),
                    entry.removed_count,
                    entry.failed_count
                );
            }
            let week = db.trashed_since(chrono::Utc::now() - chrono::Duration::days(7))?;
            println!("{} in the last 7 days", week);
        }
        Command::Watch => watch(&db, settings).await?,
        Command::Settings { action } => match action {
            None | Some(SettingsAction::Show) => {
                println!("{}", serde_json::to_string_pretty(&get_settings(&db).await)?);
            }
            Some(SettingsAction::Set { key, value }) => {
                let updated = update_setting(&db, &key, &value).await?;
                println!("{}", serde_json::to_string_pretty(&updated)?);
            }
        },
    }

    Ok(())
}

async fn build_session(
    db: &Arc<Mutex<Database>>,
    settings: SweepSettings,
    sentinel: Option<Arc<Sentinel>>,
) -> AppResult<SharedSession> {
    let catalog = PathCatalog::platform_default().with_extra_locations(&settings.extra_locations);
    let icon_dir = dirs::cache_dir().map(|d| d.join("appsweep").join("icons"));
    let info = Arc::new(DiskInfoProvider::new(icon_dir, settings.thumbnail_all_files));
    let finder = AppPathFinder::new(catalog, info, &settings);

    let mut records = db.lock().await.get_trashed_records(500)?;
    records.reverse();

    let mut hooks: Vec<Arc<dyn RemovalHook>> = vec![Arc::new(BrewCaskCleanup)];
    let mut session = Session::new(settings, finder, Arc::new(SystemTrash))
        .with_history(TrashedHistory::new(records));
    if let Some(sentinel) = sentinel {
        hooks.push(Arc::new(SentinelRearm::new(Arc::clone(&sentinel))));
        session = session.with_sentinel(sentinel);
    }

    Ok(session.with_hooks(hooks).into_shared())
}

async fn scan(session: &SharedSession, app: &str) -> AppResult<ApplicationProfile> {
    let app_path = resolve_app(app).ok_or_else(|| AppError::NotFound(format!("App not found: {}", app)))?;
    let identity = identity_for(&app_path);
    session
        .lock()
        .await
        .registry_mut()
        .upsert(ApplicationProfile::new(identity.clone()));

    let progress: ProgressFn = Arc::new(|p: ScanProgress| {
        log::debug!(
            "[{}/{}] {} ({} found)",
            p.roots_done,
            p.roots_total,
            p.root.display(),
            p.candidates
        );
    });
    let (result, _) = scan_app(session, identity, Some(progress)).await;
    if !result.unreadable_roots.is_empty() {
        log::info!("{} locations could not be read", result.unreadable_roots.len());
    }
    Ok(result.profile)
}

/// Accepts a bundle path, or a bare name looked up in the Applications folders.
fn resolve_app(app: &str) -> Option<PathBuf> {
    let direct = expand_tilde(app);
    if direct.exists() {
        return Some(direct);
    }
    let bundle = if app.ends_with(".app") {
        app.to_string()
    } else {
        format!("{}.app", app)
    };
    let mut folders = vec![PathBuf::from("/Applications")];
    if let Some(home) = dirs::home_dir() {
        folders.push(home.join("Applications"));
    }
    folders
        .into_iter()
        .map(|d| d.join(&bundle))
        .find(|p| p.exists())
}

async fn watch(db: &Arc<Mutex<Database>>, settings: SweepSettings) -> AppResult<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SentinelEvent>();
    let sentinel = Sentinel::for_user_trash(Arc::new(move |event: SentinelEvent| {
        let _ = tx.send(event);
    }))
    .ok_or_else(|| AppError::NotFound("No trash directory".into()))?;
    let sentinel = Arc::new(sentinel);
    sentinel.start()?;
    println!("Watching {}", sentinel.trash_dir().display());

    let session = build_session(db, settings, Some(Arc::clone(&sentinel))).await?;
    while let Some(SentinelEvent::AppTrashed(path)) = rx.recv().await {
        let identity = identity_for(&path);
        println!("{} moved to the trash", identity.display_name);
        let (result, committed) = scan_app(&session, identity, None).await;
        if committed && !result.profile.files().is_empty() {
            let selection: Vec<PathBuf> = session.lock().await.selection().iter().cloned().collect();
            print_profile(&result.profile, &selection);
        }
    }
    Ok(())
}

fn print_profile(profile: &ApplicationProfile, selection: &[PathBuf]) {
    let identity = &profile.identity;
    match identity.badge() {
        Some(badge) => println!("{} ({}) [{}]", identity.display_name, identity.bundle_id, badge),
        None => println!("{} ({})", identity.display_name, identity.bundle_id),
    }
    for path in profile.files() {
        let mut tags = Vec::new();
        if profile.is_ambiguous(path) {
            tags.push("ambiguous");
        }
        if profile.is_nested(path) {
            tags.push("nested");
        }
        let mark = if selection.iter().any(|p| p == path) { "*" } else { " " };
        println!(
            "{} {:>10}  {}{}",
            mark,
            format_size(profile.size_of(path).unwrap_or(0)),
            path.display(),
            if tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", tags.join(", "))
            }
        );
    }
    println!("Total: {}", format_size(profile.total_size()));
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
