//! Marrow CLI - command-line interface for the Marrow plumbing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Marrow - version control plumbing
#[derive(Parser, Debug)]
#[command(name = "marrow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a new repository in the current directory
    Init,

    /// Compute a blob id, optionally writing the object
    #[command(name = "hash-object")]
    HashObject {
        /// Write the object into the object database
        #[arg(short = 'w')]
        write: bool,
        /// File to hash
        file: PathBuf,
    },

    /// Print an object's content
    #[command(name = "cat-file")]
    CatFile {
        /// Pretty-print the object's content
        #[arg(short = 'p', value_name = "OBJECT")]
        object: String,
    },

    /// List a tree object's entries
    #[command(name = "ls-tree")]
    LsTree {
        /// Print entry names only
        #[arg(long)]
        name_only: bool,
        /// Tree id to list
        tree: String,
    },

    /// Snapshot the current directory into a tree object
    #[command(name = "write-tree")]
    WriteTree,

    /// Create a commit object for an existing tree
    #[command(name = "commit-tree")]
    CommitTree {
        /// Tree id to commit
        tree: String,
        /// Parent commit id
        #[arg(short = 'p', value_name = "PARENT")]
        parent: Option<String>,
        /// Commit message
        #[arg(short = 'm', value_name = "MESSAGE", default_value = "")]
        message: String,
    },

    /// Clone a remote repository over smart HTTP
    Clone {
        /// Repository URL
        url: String,
        /// Destination directory
        dir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("marrow={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match cli.command {
        Commands::Init => commands::init(),
        Commands::HashObject { write, file } => commands::hash_object(write, &file),
        Commands::CatFile { object } => commands::cat_file(&object),
        Commands::LsTree { name_only, tree } => commands::ls_tree(name_only, &tree),
        Commands::WriteTree => commands::write_tree(),
        Commands::CommitTree {
            tree,
            parent,
            message,
        } => commands::commit_tree(&tree, parent.as_deref(), &message),
        Commands::Clone { url, dir } => commands::clone(&url, dir.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
