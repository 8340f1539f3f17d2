//! Skylander Inventory Tracker
//!
//! Command-line front-end over the inventory store: import a catalog, edit
//! records, print dashboards and trade lists, build share links, or serve
//! the JSON API.

use clap::{Args as ClapArgs, Parser, Subcommand};
use inventory_tracker::config::{default_db_path, open_store, DEFAULT_SHARE_BASE_URL};
use inventory_tracker::share::share_link;
use inventory_tracker::sheets::{fetch_sheet_csv, SheetUrl};
use inventory_tracker::storage::SqliteStorage;
use inventory_tracker::views::{SortDirection, SortKey, StatusFilter};
use inventory_tracker::web::{self, WebConfig};
use inventory_tracker::{
    import_csv_text, normalize, read_csv_file, FieldUpdate, InventoryStore, ListFilter,
    ShareDraft, TradeFilter,
};
use std::path::PathBuf;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Skylander inventory tracker - catalog import, ownership tracking, trade lists and sharing
#[derive(Parser, Debug)]
#[command(name = "inventory_tracker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite state database
    /// (default: ~/.local/share/skylander_tracker/inventory.db)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Base URL share links point at
    #[arg(long, global = true, default_value = DEFAULT_SHARE_BASE_URL)]
    share_base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import the catalog from a CSV file
    ImportCsv { file: PathBuf },
    /// Import the catalog from a published spreadsheet sharing link
    ImportSheet { url: String },
    /// Print dashboard counts and total owned value
    Stats,
    /// List catalog items with filters and sorting
    List {
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[arg(long)]
        element: Option<String>,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "name")]
        sort: SortKey,
        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// Show one item with its inventory record
    Show { id: String },
    /// Set one field (have, need, forTrade, count, value, notes) on an item
    Set {
        id: String,
        field: String,
        value: String,
    },
    /// Mark an item as owned and add one copy
    Add { id: String },
    /// Reset every inventory record to defaults
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Print the trade list text
    TradeList {
        #[arg(long)]
        element: Option<String>,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Build a share link for selected items
    Share(DraftArgs),
    /// Manage saved share views
    #[command(subcommand)]
    Views(ViewsCommand),
    /// Serve the JSON API
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
        /// Address to bind; use 0.0.0.0 to expose the API beyond this machine
        #[arg(long, default_value = web::DEFAULT_HOST)]
        host: String,
        /// Browser origin allowed to call the API (e.g. http://localhost:5173)
        #[arg(long)]
        allow_origin: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ViewsCommand {
    /// List saved share views
    List,
    /// Save a share view
    Save(DraftArgs),
    /// Delete a saved share view
    Delete { id: String },
    /// Print the share link for a saved view
    Link { id: String },
}

#[derive(ClapArgs, Debug)]
struct DraftArgs {
    /// Item ids to include
    ids: Vec<String>,
    /// Include every owned item
    #[arg(long)]
    all_owned: bool,
    /// Include values in the shared summary
    #[arg(long)]
    show_values: bool,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl DraftArgs {
    fn into_draft(self, store: &InventoryStore<SqliteStorage>) -> ShareDraft {
        let defaults = ShareDraft::default();
        let mut selected_ids = self.ids;
        if self.all_owned {
            selected_ids.extend(store.view().owned_ids());
        }

        ShareDraft {
            title: self.title.unwrap_or(defaults.title),
            description: self.description.unwrap_or(defaults.description),
            show_values: self.show_values,
            selected_ids,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> CliResult {
    let db_path = args.database.unwrap_or_else(default_db_path);
    log::debug!("Database path: {}", db_path.display());

    let mut store = open_store(&db_path)?;

    match args.command {
        Command::ImportCsv { file } => {
            let rows = read_csv_file(&file)?;
            let items = normalize(&rows)?;
            log::info!("Read {} rows from {}", rows.len(), file.display());
            let summary = store.import_catalog(items)?;
            println!(
                "Imported {} Skylanders ({} new, {} duplicates dropped)",
                summary.items, summary.new_records, summary.duplicates_dropped
            );
        }
        Command::ImportSheet { url } => {
            let sheet = SheetUrl::parse(&url)?;
            let client = reqwest::Client::new();
            log::info!("Fetching sheet {}", sheet.sheet_id());
            let text = fetch_sheet_csv(&client, &sheet).await?;
            let items = import_csv_text(&text)?;
            let summary = store.import_catalog(items)?;
            println!(
                "Imported {} Skylanders ({} new, {} duplicates dropped)",
                summary.items, summary.new_records, summary.duplicates_dropped
            );
        }
        Command::Stats => {
            let stats = store.view().stats();
            println!("Total Skylanders: {}", stats.total);
            println!("Owned:            {}", stats.have);
            println!("Wanted:           {}", stats.need);
            println!("For trade:        {}", stats.for_trade);
            println!("Total value:      {:.2}", stats.total_value);
        }
        Command::List {
            status,
            element,
            search,
            sort,
            desc,
        } => {
            let filter = ListFilter {
                status,
                element,
                search,
                sort,
                direction: if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
            };
            let view = store.view();
            let items = view.filter(&filter);
            for item in &items {
                let record = view.record(&item.id);
                println!(
                    "{:<20} {:<30} {:<10} {}{}{} x{:<3} {:>8.2}",
                    item.id,
                    item.name,
                    item.element,
                    if record.have { 'H' } else { '-' },
                    if record.need { 'N' } else { '-' },
                    if record.for_trade { 'T' } else { '-' },
                    record.count,
                    record.value
                );
            }
            println!("{} of {} Skylanders", items.len(), store.catalog().len());
        }
        Command::Show { id } => match store.view().item_detail(&id) {
            Some(detail) => println!("{}", serde_json::to_string_pretty(&detail)?),
            None => return Err(format!("No Skylander with id '{}'", id).into()),
        },
        Command::Set { id, field, value } => {
            let update = FieldUpdate::parse(&field, &value)?;
            store.update_field(&id, update)?;
            println!("{}", serde_json::to_string_pretty(&*store.record(&id))?);
        }
        Command::Add { id } => {
            store.add_to_inventory(&id)?;
            println!("{} now has {} copies", id, store.record(&id).count);
        }
        Command::Reset { yes } => {
            if !yes {
                return Err("Refusing to reset all inventory data without --yes".into());
            }
            store.reset_all()?;
            println!("Inventory reset for {} Skylanders", store.catalog().len());
        }
        Command::TradeList { element, search } => {
            let filter = TradeFilter { element, search };
            let view = store.view();
            println!("{}", view.trade_list_text(&filter));
            log::info!(
                "{} items for trade, total value {:.2}",
                view.trade_items(&filter).len(),
                view.trade_total_value(&filter)
            );
        }
        Command::Share(draft_args) => {
            let draft = draft_args.into_draft(&store);
            let payload = store.view().share_payload(&draft);
            println!("{}", share_link(&payload, &args.share_base_url)?);
        }
        Command::Views(command) => run_views(&mut store, command, &args.share_base_url)?,
        Command::Serve {
            port,
            host,
            allow_origin,
        } => {
            let config = WebConfig {
                share_base_url: args.share_base_url,
                allowed_origin: allow_origin.as_deref().map(web::parse_origin).transpose()?,
                ..WebConfig::default()
            };
            web::serve(web::shared_store(store), &host, port, config).await?;
        }
    }

    Ok(())
}

fn run_views(
    store: &mut InventoryStore<SqliteStorage>,
    command: ViewsCommand,
    share_base_url: &str,
) -> CliResult {
    match command {
        ViewsCommand::List => {
            for view in store.share_views() {
                println!(
                    "{}  {}  ({} items, values {})  {}",
                    view.id,
                    view.title,
                    view.selected_ids.len(),
                    if view.show_values { "shown" } else { "hidden" },
                    view.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ViewsCommand::Save(draft_args) => {
            let draft = draft_args.into_draft(store);
            let view = store.save_share_view(&draft)?;
            println!("Saved share view {}", view.id);
        }
        ViewsCommand::Delete { id } => {
            if !store.delete_share_view(&id)? {
                return Err(format!("No saved share view: {}", id).into());
            }
            println!("Deleted share view {}", id);
        }
        ViewsCommand::Link { id } => {
            let view = store
                .share_view(&id)
                .ok_or_else(|| format!("No saved share view: {}", id))?;
            let payload = store.view().share_payload(&ShareDraft::from(view));
            println!("{}", share_link(&payload, share_base_url)?);
        }
    }
    Ok(())
}
