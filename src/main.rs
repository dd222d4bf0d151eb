use std::path::PathBuf;

use clap::{Parser, Subcommand};
use muport::config::Config;
use muport::ids_map::DEFAULT_MAP_FILE;

#[derive(Parser)]
#[command(
    name = "muport",
    version,
    long_version = muport::build_info::long_version(),
    about = "Migrate single-site WordPress users and content into a multisite network"
)]
struct Cli {
    /// Destination SQLite database (overrides muport.yml)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Network base table prefix
    #[arg(long, global = true)]
    prefix: Option<String>,
    /// wp-cli binary used for db import and search-replace
    #[arg(long, global = true)]
    wp_bin: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring data from a single-site export into the network
    Import {
        #[command(subcommand)]
        action: ImportAction,
    },
    /// Rewrite old user references on imported content
    Posts {
        #[command(subcommand)]
        action: PostsAction,
    },
}

#[derive(Subcommand)]
enum ImportAction {
    /// Import users from a CSV export and write the old-to-new ID map
    Users {
        /// CSV export produced on the source site
        file: PathBuf,
        /// Destination blog ID
        #[arg(long)]
        blog_id: u64,
        /// Where to write the ID map
        #[arg(long, default_value = DEFAULT_MAP_FILE)]
        map_file: PathBuf,
        /// CSV field delimiter
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
    /// Load a SQL dump into the destination blog and rewrite URLs
    Tables {
        /// SQL dump produced on the source site
        file: PathBuf,
        /// Destination blog ID
        #[arg(long)]
        blog_id: u64,
        /// Source table prefix (defaults to the configured prefix)
        #[arg(long)]
        old_prefix: Option<String>,
        /// URL of the source site
        #[arg(long)]
        old_url: Option<String>,
        /// URL of the destination blog
        #[arg(long)]
        new_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum PostsAction {
    /// Point post_author at the new user IDs
    UpdateAuthor {
        /// ID map written by `import users`
        map: PathBuf,
        /// Destination blog ID
        #[arg(long)]
        blog_id: u64,
    },
    /// Point order customer references at the new user IDs
    UpdateWcCustomer {
        /// ID map written by `import users`
        map: PathBuf,
        /// Destination blog ID
        #[arg(long)]
        blog_id: u64,
    },
}

fn run(cli: Cli) -> muport::error::Result<()> {
    let config = Config::resolve(cli.db, cli.prefix, cli.wp_bin)?;

    match cli.command {
        Commands::Import { action } => match action {
            ImportAction::Users {
                file,
                blog_id,
                map_file,
                delimiter,
            } => muport::commands::import::users(&config, &file, blog_id, &map_file, delimiter),
            ImportAction::Tables {
                file,
                blog_id,
                old_prefix,
                old_url,
                new_url,
            } => muport::commands::import::tables(
                &config,
                &file,
                blog_id,
                old_prefix.as_deref(),
                old_url.as_deref(),
                new_url.as_deref(),
            ),
        },
        Commands::Posts { action } => match action {
            PostsAction::UpdateAuthor { map, blog_id } => {
                muport::commands::posts::update_author(&config, &map, blog_id)
            }
            PostsAction::UpdateWcCustomer { map, blog_id } => {
                muport::commands::posts::update_wc_customer(&config, &map, blog_id)
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        muport::output::error(&e.to_string());
        std::process::exit(1);
    }
}
