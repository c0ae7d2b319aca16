use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use taskdeck_core::sync::InsertionPolicy;

#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(about = "Inspect and replay Taskdeck live collections from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name for the API base URL
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a snapshot file with an event log and print the result
    Replay {
        /// JSON array (or `{"data": [...]}`) of entities
        #[arg(long, value_name = "PATH")]
        snapshot: PathBuf,
        /// Newline-delimited push frames
        #[arg(long, value_name = "PATH")]
        events: Option<PathBuf>,
        /// Entity type held by the collection
        #[arg(long, value_enum, default_value_t = EntityKind::Record)]
        kind: EntityKind,
        /// Where new entities land
        #[arg(long, value_enum)]
        insertion: Option<InsertionArg>,
        /// Deliver the events before the snapshot and queue them
        #[arg(long)]
        queue_early: bool,
        /// Ignore events older than the held entity
        #[arg(long)]
        reject_stale: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch a snapshot from the API
    Fetch {
        /// tasks, goals, meetings, posts or messages:<conversation-id>
        resource: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show task, goal and meeting figures
    Dashboard {
        /// Read tasks.json, goals.json and meetings.json from here instead of the API
        #[arg(long, value_name = "DIR")]
        snapshot_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum EntityKind {
    Task,
    Goal,
    Meeting,
    Message,
    Post,
    /// Untyped JSON objects keyed by `id`/`_id`
    Record,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum InsertionArg {
    Append,
    Prepend,
    Surface,
}

impl From<InsertionArg> for InsertionPolicy {
    fn from(value: InsertionArg) -> Self {
        match value {
            InsertionArg::Append => Self::Append,
            InsertionArg::Prepend => Self::Prepend,
            InsertionArg::Surface => Self::Surface,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// API base URL (e.g. <https://api.example.com>)
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Default insertion policy for replays
        #[arg(long, value_enum)]
        insertion: Option<InsertionArg>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the effective configuration for a profile
    Show {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
