mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    RecipeChanges, cmd_export, cmd_import, cmd_recipe_delete, cmd_recipe_edit, cmd_recipe_list,
    cmd_recipe_new, cmd_recipe_show,
};
use crate::config::Config;
use recipebox_core::db::Database;
use recipebox_core::store::RecipeStore;

#[derive(Parser)]
#[command(
    name = "recipebox",
    version,
    about = "A simple, local-first recipe manager",
    long_about = "A simple, local-first recipe manager.\n\n\
        Recipes live in a local database. When nothing has been saved yet, \
        three example recipes are shown."
)]
struct Cli {
    /// Use this database file instead of the one in the data directory
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe, optionally scaled to a different number of portions
    Show {
        /// Recipe ID
        id: String,
        /// Scale ingredient amounts to this many portions (the recipe is not changed)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        portions: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new recipe
    New {
        /// Recipe name
        name: String,
        /// Number of portions the ingredient amounts make
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        portions: u32,
        /// Ingredient as NAME=AMOUNT [UNIT] (e.g. "Spaghetti=400 g"); repeatable
        #[arg(short, long = "ingredient", value_name = "SPEC")]
        ingredients: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a recipe. Field edits and removals use positions from `show`,
    /// applied before new ingredients are added.
    Edit {
        /// Recipe ID
        id: String,
        /// New recipe name
        #[arg(long)]
        name: Option<String>,
        /// New base number of portions
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        portions: Option<u32>,
        /// Change one ingredient field as INDEX.FIELD=VALUE (e.g. "2.amount=300"); repeatable
        #[arg(long, value_name = "EDIT")]
        set: Vec<String>,
        /// Remove the ingredient at this position; repeatable
        #[arg(long, value_name = "INDEX")]
        remove: Vec<String>,
        /// Add an ingredient as NAME=AMOUNT [UNIT]; repeatable
        #[arg(short, long = "ingredient", value_name = "SPEC")]
        ingredients: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe by ID
    Delete {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export all recipes as JSON
    Export {
        /// File to write (default: print to stdout)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Output the result summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import recipes from a JSON export or a Cooklang (.cook) file
    Import {
        /// Path to the file
        file: PathBuf,
        /// Recipe name override (Cooklang only; defaults to metadata title or filename)
        #[arg(long)]
        name: Option<String>,
        /// Portions override (Cooklang only; defaults to metadata servings)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        portions: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

fn init_logging() {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db.as_deref())?;
    let db = Database::open(&config.db_path)?;
    let mut store = RecipeStore::open(db)?;

    match cli.command {
        Commands::List { json } => cmd_recipe_list(&store, json),
        Commands::Show { id, portions, json } => cmd_recipe_show(&store, &id, portions, json),
        Commands::New {
            name,
            portions,
            ingredients,
            json,
        } => cmd_recipe_new(&mut store, &name, portions, &ingredients, json),
        Commands::Edit {
            id,
            name,
            portions,
            set,
            remove,
            ingredients,
            json,
        } => {
            let changes = RecipeChanges {
                name: name.as_deref(),
                portions,
                set: &set,
                remove: &remove,
                add: &ingredients,
            };
            cmd_recipe_edit(&mut store, &id, &changes, json)
        }
        Commands::Delete { id, json } => cmd_recipe_delete(&mut store, &id, json),
        Commands::Export { output, json } => cmd_export(&store, output.as_deref(), json),
        Commands::Import {
            file,
            name,
            portions,
            json,
        } => cmd_import(&mut store, &file, name, portions, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?.0)
            };
            server::start_server(store, port, &bind, api_key).await
        }
    }
}
