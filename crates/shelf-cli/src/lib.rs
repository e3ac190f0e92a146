//! Terminal front end for the Shelf collection view.
//!
//! Loads a JSON array of records into a [`MemoryStore`] and drives a
//! [`CollectionView`] from line-oriented commands.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use shelf_core::{
    default_config_path, FieldMatcher, FieldValue, RecordId, SortDirection, ViewConfig, ViewError,
};
use shelf_view::{CollectionView, MemoryStore, ViewSnapshot};

// =============================================================================
// Arguments
// =============================================================================

/// Browse a record collection from the terminal.
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
pub struct Cli {
    /// JSON file holding an array of records
    pub records: PathBuf,

    /// Configuration file (defaults to <config dir>/shelf/config.toml)
    #[arg(long, env = "SHELF_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Load the configuration: `--config`, then the default location, then defaults.
    pub fn load_config(&self) -> Result<ViewConfig> {
        if let Some(path) = &self.config {
            return ViewConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()));
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {}", path.display());
                ViewConfig::load(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))
            }
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(ViewConfig::default())
            }
        }
    }

    /// Read the records file into a store.
    pub fn load_store(&self) -> Result<MemoryStore> {
        let source = std::fs::read_to_string(&self.records)
            .with_context(|| format!("Failed to read {}", self.records.display()))?;
        MemoryStore::from_json(&source)
            .with_context(|| format!("Failed to parse records in {}", self.records.display()))
    }
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "command", no_binary_name = true, disable_version_flag = true)]
struct CommandLine {
    #[command(subcommand)]
    command: Command,
}

/// One interactive command.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Print the current page
    Show,
    /// Search the searchable fields; no text clears the search
    Search {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Keep records whose field equals a value
    Filter { field: String, value: String },
    /// Keep records whose numeric field lies in an inclusive range
    Range {
        field: String,
        #[arg(long, allow_negative_numbers = true)]
        min: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        max: Option<f64>,
    },
    /// Remove the filter on one field
    Unfilter { field: String },
    /// Remove the search and every field filter
    ClearFilters,
    /// Sort by a field; repeat to flip the direction, omit the field to clear
    Sort { key: Option<String> },
    /// Go to a page
    Page { page: usize },
    /// Change the page size
    Limit { limit: usize },
    /// Select or deselect one record
    Toggle { id: String },
    /// Select or deselect the current page
    SelectPage,
    /// Select every matching record
    SelectAll,
    /// Clear the selection
    SelectNone,
    /// Run a bulk action on the selection
    Bulk {
        action: String,
        /// Confirm a destructive action
        #[arg(long)]
        yes: bool,
    },
    /// Run an action on one record
    Row { id: String, action: String },
    /// List the available bulk actions
    Actions,
    /// Refetch the records
    Refresh,
    /// Dismiss the banner
    Dismiss,
    /// Print the current page as JSON
    Export,
    /// Leave
    Quit,
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, clap::Error> {
    CommandLine::try_parse_from(line.split_whitespace()).map(|l| l.command)
}

/// Run one command and return what to print.
pub async fn execute(view: &CollectionView, command: Command) -> String {
    let outcome: Result<Option<String>, ViewError> = match command {
        Command::Show | Command::Quit => Ok(None),
        Command::Search { text } => {
            view.set_search(text.join(" "));
            view.flush_search();
            Ok(None)
        }
        Command::Filter { field, value } => {
            view.set_field_filter(field, FieldMatcher::equals(FieldValue::parse(&value)));
            Ok(None)
        }
        Command::Range { field, min, max } => {
            view.set_field_filter(field, FieldMatcher::range(min, max));
            Ok(None)
        }
        Command::Unfilter { field } => {
            view.clear_field_filter(field);
            Ok(None)
        }
        Command::ClearFilters => {
            view.clear_filters();
            Ok(None)
        }
        Command::Sort { key: Some(key) } => {
            view.set_sort(key);
            Ok(None)
        }
        Command::Sort { key: None } => {
            view.clear_sort();
            Ok(None)
        }
        Command::Page { page } => {
            view.set_page(page);
            Ok(None)
        }
        Command::Limit { limit } => {
            view.set_limit(limit);
            Ok(None)
        }
        Command::Toggle { id } => {
            view.toggle_select(&RecordId(id));
            Ok(None)
        }
        Command::SelectPage => {
            view.select_all_visible();
            Ok(None)
        }
        Command::SelectAll => {
            view.select_all_matching();
            Ok(None)
        }
        Command::SelectNone => {
            view.clear_selection();
            Ok(None)
        }
        Command::Bulk { action, yes } => {
            let result = if yes {
                view.run_confirmed_bulk_action(&action).await
            } else {
                view.run_bulk_action(&action).await
            };
            result.map(|_| None)
        }
        Command::Row { id, action } => view
            .run_row_action(&RecordId(id), &action)
            .await
            .map(|_| None),
        Command::Actions => Ok(Some(render_actions(view))),
        Command::Refresh => view.refresh().await.map(|_| None),
        Command::Dismiss => {
            view.dismiss_banner();
            Ok(None)
        }
        Command::Export => {
            let visible = view.snapshot().visible;
            return serde_json::to_string_pretty(&visible)
                .unwrap_or_else(|e| format!("error: {}", e));
        }
    };

    match outcome {
        Ok(Some(text)) => text,
        Ok(None) => render(&view.snapshot()),
        Err(e @ ViewError::ConfirmationRequired { .. }) => {
            format!("{}; rerun with --yes to confirm", e)
        }
        Err(e) => format!("error: {}\n{}", e, render(&view.snapshot())),
    }
}

/// Read commands from `input` until it ends or `quit`, writing output to `output`.
pub async fn run<R, W>(view: &CollectionView, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_block(output, &render(&view.snapshot())).await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let text = match parse_command(line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(view, command).await,
            Err(e) => e.render().to_string(),
        };
        write_block(output, &text).await?;
    }
    Ok(())
}

async fn write_block<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.trim_end().as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a snapshot as plain text.
pub fn render(snapshot: &ViewSnapshot) -> String {
    let mut out = String::new();
    let p = snapshot.pagination;

    if p.total == 0 {
        let _ = writeln!(out, "No records (page 1 of 1, {} per page)", p.limit);
    } else {
        let _ = writeln!(
            out,
            "Showing {}-{} of {} (page {} of {}, {} per page)",
            p.offset() + 1,
            p.offset() + snapshot.visible.len(),
            p.total,
            p.page,
            p.pages,
            p.limit
        );
    }

    let mut context = Vec::new();
    if !snapshot.filter.normalized_search().is_empty() {
        context.push(format!("search: {:?}", snapshot.filter.normalized_search()));
    }
    if !snapshot.filter.field_filters.is_empty() {
        let fields: Vec<&str> = snapshot
            .filter
            .field_filters
            .keys()
            .map(String::as_str)
            .collect();
        context.push(format!("filters: {}", fields.join(", ")));
    }
    if let Some(key) = &snapshot.sort.key {
        let direction = match snapshot.sort.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        context.push(format!("sort: {} {}", key, direction));
    }
    if !context.is_empty() {
        let _ = writeln!(out, "{}", context.join("  "));
    }

    for record in &snapshot.visible {
        let mark = if snapshot.is_selected(&record.id) { "x" } else { " " };
        let _ = write!(out, "[{}] {}", mark, record.id);
        for (name, value) in record.fields.iter().filter(|(_, v)| !v.is_null()) {
            let _ = write!(out, "  {}={}", name, value);
        }
        out.push('\n');
    }

    if !snapshot.selected.is_empty() {
        let scope = if snapshot.is_all_matching_selected {
            " (all matching)"
        } else if snapshot.is_all_visible_selected {
            " (page)"
        } else {
            ""
        };
        let _ = writeln!(out, "selected: {}{}", snapshot.selected.len(), scope);
    }

    if let Some(banner) = &snapshot.banner {
        let marker = if banner.is_error() { "!" } else { "*" };
        let _ = writeln!(out, "{} {}", marker, banner.message());
    }

    out
}

fn render_actions(view: &CollectionView) -> String {
    let mut out = String::new();
    for action in view.actions() {
        let note = if action.destructive { " (needs --yes)" } else { "" };
        let _ = writeln!(out, "{}  {}{}", action.id, action.label, note);
    }
    if out.is_empty() {
        out.push_str("No bulk actions configured\n");
    }
    out
}
