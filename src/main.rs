use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use notevault::{ChecklistItem, ItemSelector, NotePath, NoteStore, VaultStats};

#[derive(Debug, Parser)]
#[command(
    name = "notevault",
    version,
    about = "Plain-text document vault: metadata, checklist, and scan reports"
)]
struct Cli {
    /// Path to the vault root.
    #[arg(long, env = "NOTEVAULT_ROOT", global = true, default_value = ".")]
    vault: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create, inspect, and rearrange documents.
    Note {
        #[command(subcommand)]
        command: NoteCommand,
    },
    /// The flat checklist document.
    Check {
        #[command(subcommand)]
        command: CheckCommand,
    },
    /// Aggregate statistics over the tree.
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Open (creating if needed) the daily note for a date.
    Daily {
        /// Date in YYYY-MM-DD form.
        date: String,
    },
}

#[derive(Debug, Subcommand)]
enum NoteCommand {
    /// Create a new document.
    Create {
        /// Path relative to the vault root.
        path: PathBuf,

        /// Initial body text.
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Print a document.
    Show { path: PathBuf },
    /// Fill metadata gaps from path and body heuristics.
    Enrich { path: PathBuf },
    /// Rename a document and rewrite wikilinks pointing at it.
    Move { from: PathBuf, to: PathBuf },
    /// Delete a document.
    Delete { path: PathBuf },
}

#[derive(Debug, Subcommand)]
enum CheckCommand {
    /// List checklist items.
    List {
        /// Only items not yet completed.
        #[arg(long)]
        pending: bool,

        /// Only items carrying this tag.
        #[arg(long)]
        tag: Option<String>,
    },
    /// Append a new open item.
    Add {
        text: String,

        /// Tags to attach (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Mark one item done, by id or by text.
    Done {
        #[arg(long, conflicts_with = "text")]
        id: Option<usize>,

        /// Case-insensitive substring of the item text.
        #[arg(long)]
        text: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ReportCommand {
    /// Document, folder, and tag counts.
    Stats {
        /// Skip the scan cache and walk the tree now.
        #[arg(long)]
        fresh: bool,

        #[arg(long)]
        json: bool,
    },
    /// Tags with occurrence counts.
    Tags {
        /// How many tags to print.
        #[arg(long, default_value_t = 50)]
        top: usize,

        #[arg(long)]
        json: bool,
    },
    /// Metadata field names observed anywhere in the tree.
    Fields {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut store = NoteStore::open(&cli.vault)
        .with_context(|| format!("opening vault at {}", cli.vault.display()))?;

    match cli.command {
        Command::Note { command } => run_note(&mut store, command),
        Command::Check { command } => run_check(&mut store, command),
        Command::Report { command } => run_report(&mut store, command),
        Command::Daily { date } => {
            let rel = store.daily_note(&date)?;
            println!("{}", rel.as_str_lossy());
            Ok(())
        }
    }
}

fn run_note(store: &mut NoteStore, command: NoteCommand) -> anyhow::Result<()> {
    match command {
        NoteCommand::Create { path, content } => {
            let rel = NotePath::try_from(path.as_path())?;
            store.create_note(&rel, &content)?;
            println!("created {}", rel.as_str_lossy());
        }
        NoteCommand::Show { path } => {
            let rel = NotePath::try_from(path.as_path())?;
            print!("{}", store.read_note(&rel)?);
        }
        NoteCommand::Enrich { path } => {
            let rel = NotePath::try_from(path.as_path())?;
            let block = store.enrich_note(&rel)?;
            for key in block.keys() {
                println!("{key}");
            }
        }
        NoteCommand::Move { from, to } => {
            let from = NotePath::try_from(from.as_path())?;
            let to = NotePath::try_from(to.as_path())?;
            let rewritten = store.move_note(&from, &to)?;
            println!(
                "moved {} -> {} ({rewritten} documents relinked)",
                from.as_str_lossy(),
                to.as_str_lossy()
            );
        }
        NoteCommand::Delete { path } => {
            let rel = NotePath::try_from(path.as_path())?;
            store.delete_note(&rel)?;
            println!("deleted {}", rel.as_str_lossy());
        }
    }
    Ok(())
}

fn run_check(store: &mut NoteStore, command: CheckCommand) -> anyhow::Result<()> {
    match command {
        CheckCommand::List { pending, tag } => {
            let items = store.checklist_items()?;
            for item in items.iter().filter(|i| keep_item(i, pending, tag.as_deref())) {
                println!("{}", format_item(item));
            }
        }
        CheckCommand::Add { text, tags } => {
            let item = store.add_checklist_item(&text, &tags)?;
            println!("{}", format_item(&item));
        }
        CheckCommand::Done { id, text } => {
            let selector = match (id, text) {
                (Some(id), None) => ItemSelector::Id(id),
                (None, Some(text)) => ItemSelector::Text(text),
                _ => anyhow::bail!("pass exactly one of --id or --text"),
            };
            let item = store.complete_item(&selector)?;
            println!("{}", format_item(&item));
        }
    }
    Ok(())
}

fn keep_item(item: &ChecklistItem, pending: bool, tag: Option<&str>) -> bool {
    if pending && item.completed {
        return false;
    }
    match tag {
        Some(tag) => item.tags.iter().any(|t| t == tag),
        None => true,
    }
}

fn format_item(item: &ChecklistItem) -> String {
    let mark = if item.completed { 'x' } else { ' ' };
    let tags = if item.tags.is_empty() {
        String::new()
    } else {
        format!(
            "  [{}]",
            item.tags
                .iter()
                .map(|t| format!("#{t}"))
                .collect::<Vec<_>>()
                .join(" ")
        )
    };
    format!(
        "{:>3}. [{mark}] {}{}{tags}",
        item.id,
        "  ".repeat(item.indent),
        item.text
    )
}

fn run_report(store: &mut NoteStore, command: ReportCommand) -> anyhow::Result<()> {
    match command {
        ReportCommand::Stats { fresh, json } => {
            let stats = if fresh {
                store.stats_fresh()?
            } else {
                store.stats()?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&stats_json(&stats))?);
            } else {
                println!("documents: {}", stats.total_documents);
                for (folder, count) in &stats.folder_counts {
                    println!("  {folder}: {count}");
                }
                if !stats.errors.is_empty() {
                    println!("unreadable: {}", stats.errors.len());
                }
            }
        }
        ReportCommand::Tags { top, json } => {
            let stats = store.stats()?;
            let mut tags: Vec<(&String, &usize)> = stats.tag_counts.iter().collect();
            tags.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            tags.truncate(top);
            if json {
                let obj: serde_json::Map<String, serde_json::Value> = tags
                    .into_iter()
                    .map(|(t, n)| (t.clone(), serde_json::json!(n)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&obj)?);
            } else {
                for (tag, count) in tags {
                    println!("{count:>6}  #{tag}");
                }
            }
        }
        ReportCommand::Fields { json } => {
            let stats = store.stats()?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!(stats
                        .field_names
                        .iter()
                        .collect::<Vec<_>>()))?
                );
            } else {
                for name in &stats.field_names {
                    println!("{name}");
                }
            }
        }
    }
    Ok(())
}

fn stats_json(stats: &VaultStats) -> serde_json::Value {
    serde_json::json!({
        "total_documents": stats.total_documents,
        "folder_counts": stats.folder_counts,
        "tag_counts": stats.tag_counts,
        "field_names": stats.field_names.iter().collect::<Vec<_>>(),
        "errors": stats.errors.iter().map(|e| {
            serde_json::json!({ "path": e.path.display().to_string(), "message": e.message })
        }).collect::<Vec<_>>(),
    })
}
