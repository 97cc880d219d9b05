//! Command-line front end over a chatmark store file.
//!
//! # Responsibility
//! - Expose list/save/categorize/backup operations for scripting and
//!   manual recovery without a browser.
//! - Keep output line-oriented and stable for piping.

use chatmark_core::db::open_db;
use chatmark_core::{
    core_version, init_logging, BackupService, CategoryFilter, Clock, CollectionService,
    ConversationId, CoreConfig, ListFilter, SaveOutcome, SortKey, SqliteKvStore, SystemClock,
};
use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "chatmark", version, about = "Manage bookmarked chat conversations")]
struct Cli {
    /// SQLite store file (created when missing).
    #[arg(long, default_value = "chatmark.db")]
    db: PathBuf,

    /// Optional JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List bookmarks.
    List {
        /// `all`, `uncategorized`, or a category name.
        #[arg(long, default_value = "all")]
        category: String,
        #[arg(long)]
        search: Option<String>,
        /// time-desc|time-asc|length-desc|length-asc|title-asc|title-desc
        #[arg(long, default_value = "time-desc")]
        sort: String,
    },
    /// Bookmark a conversation (refreshes an identical existing one).
    Save {
        #[arg(long)]
        title: String,
        /// Body text; read from `--body-file` when omitted.
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,
        #[arg(long)]
        body_file: Option<PathBuf>,
        #[arg(long, default_value = "")]
        url: String,
    },
    /// Remove bookmarks by id.
    Remove { ids: Vec<String> },
    /// File a bookmark under a category (`""` clears it).
    Categorize { id: String, category: String },
    /// Show category slots with counts.
    Categories,
    /// Rename one category slot.
    RenameCategory { index: usize, name: String },
    /// Write a JSON backup to a file or stdout.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Merge a JSON backup into the store.
    Import { file: PathBuf },
    /// Show version, totals and backup reminder state.
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(chatmark_core::default_log_level(), log_dir)?;
    }
    let config = match cli.config.as_ref() {
        Some(path) => CoreConfig::from_json(&fs::read_to_string(path)?)?,
        None => CoreConfig::default(),
    };

    let conn = open_db(&cli.db)?;
    let store = SqliteKvStore::new(&conn);
    let collection =
        CollectionService::with_category_defaults(&store, &config.default_category_names);
    let backup = BackupService::with_category_defaults(&store, &config.default_category_names);
    let clock = SystemClock;
    info!("event=cli_command module=cli status=start db={}", cli.db.display());

    match cli.command {
        Command::List {
            category,
            search,
            sort,
        } => {
            let sort = SortKey::parse(&sort).ok_or_else(|| format!("unknown sort `{sort}`"))?;
            let filter = ListFilter {
                category: CategoryFilter::parse(&category),
                search,
            };
            for record in collection.list(&filter, sort) {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.id,
                    record.saved_at,
                    record.category.as_deref().unwrap_or("-"),
                    record.body_len(),
                    record.title
                );
            }
        }
        Command::Save {
            title,
            body,
            body_file,
            url,
        } => {
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(path)) => fs::read_to_string(path)?,
                (None, None) => String::new(),
            };
            match collection.save(&title, &body, &url, clock.now_ms())? {
                SaveOutcome::Created(id) => println!("created {id}"),
                SaveOutcome::Updated(id) => println!("updated {id}"),
            }
        }
        Command::Remove { ids } => {
            let ids: Vec<ConversationId> =
                ids.iter().filter_map(|id| ConversationId::parse(id)).collect();
            println!("removed {}", collection.remove_many(&ids));
        }
        Command::Categorize { id, category } => {
            let id = ConversationId::parse(&id).ok_or("id cannot be blank")?;
            if !collection.set_category(&id, &category)? {
                return Err(format!("no bookmark with id `{id}`").into());
            }
        }
        Command::Categories => {
            let counts = collection.category_counts();
            println!("all\t{}", counts.all);
            println!("uncategorized\t{}", counts.uncategorized);
            for (index, (name, count)) in counts.slots.iter().enumerate() {
                println!("{index}\t{name}\t{count}");
            }
        }
        Command::RenameCategory { index, name } => {
            if !collection.rename_category(index, &name) {
                return Err(
                    "rename rejected (index out of range, blank, or duplicate name)".into(),
                );
            }
        }
        Command::Export { out } => {
            let json = backup.export_json(clock.now_ms())?;
            match out {
                Some(path) => fs::write(path, json)?,
                None => println!("{json}"),
            }
        }
        Command::Import { file } => {
            let summary = backup.import_json(&fs::read_to_string(file)?, clock.now_ms())?;
            println!(
                "imported {} categories_replaced={}",
                summary.imported_count, summary.categories_replaced
            );
        }
        Command::Status => {
            println!("version\t{}", core_version());
            println!("bookmarks\t{}", collection.count(&CategoryFilter::All));
            match backup.last_backup_at() {
                Some(at) => println!("last_backup_ms\t{at}"),
                None => println!("last_backup_ms\t-"),
            }
            println!(
                "backup_reminder_due\t{}",
                backup.reminder_due(clock.now_ms(), config.backup_reminder_interval_ms())
            );
        }
    }

    Ok(())
}
