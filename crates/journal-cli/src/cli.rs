use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use journal_core::pagination::DEFAULT_PAGE_SIZE;
use journal_core::Mood;

#[derive(Parser)]
#[command(name = "journal")]
#[command(about = "Keep a mood-tagged journal from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Journal API base URL (falls back to JOURNAL_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Directory holding the saved session, offline queue, and search history
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Signup {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Sign in and remember the session
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Request a password reset email
    ResetPassword {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Where the reset link should send the user
        #[arg(long, value_name = "URL")]
        redirect_to: Option<String>,
    },
    /// Write a new entry
    #[command(alias = "new")]
    Add {
        /// Entry content (read from stdin when omitted)
        content: Vec<String>,
        /// Tag the entry with a mood
        #[arg(long, value_parser = parse_mood_arg)]
        mood: Option<Mood>,
    },
    /// List recent entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,
        /// Continue from a cursor printed by a previous page
        #[arg(long)]
        cursor: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one entry in full
    Show {
        /// Entry ID
        id: String,
    },
    /// Change an entry's content or mood
    Edit {
        /// Entry ID
        id: String,
        /// Replacement content
        #[arg(long)]
        content: Option<String>,
        /// New mood
        #[arg(long, value_parser = parse_mood_arg, conflicts_with = "clear_mood")]
        mood: Option<Mood>,
        /// Remove the mood
        #[arg(long)]
        clear_mood: bool,
    },
    /// Delete an entry
    Delete {
        /// Entry ID
        id: String,
    },
    /// Search entries by text, mood, and date range
    Search {
        /// Words to match
        query: Vec<String>,
        #[arg(long, value_parser = parse_mood_arg)]
        mood: Option<Mood>,
        /// Earliest creation date (YYYY-MM-DD or Unix milliseconds)
        #[arg(long, value_name = "DATE")]
        from: Option<String>,
        /// Latest creation date (YYYY-MM-DD or Unix milliseconds)
        #[arg(long, value_name = "DATE")]
        to: Option<String>,
        /// Number of entries to show
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent search terms
    History,
    /// Show the available moods
    Moods {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send changes made while offline
    Sync,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

impl Commands {
    /// Screen this command stands for, `None` when it needs no session state.
    pub const fn route(&self) -> Option<&'static str> {
        match self {
            Self::Signup { .. } => Some("/signup"),
            Self::Login { .. } => Some("/login"),
            Self::ResetPassword { .. } => Some("/reset-password"),
            Self::Logout => Some("/logout"),
            Self::Add { .. }
            | Self::List { .. }
            | Self::Show { .. }
            | Self::Edit { .. }
            | Self::Delete { .. } => Some("/entries"),
            Self::Search { .. } | Self::History => Some("/search"),
            Self::Sync => Some("/sync"),
            Self::Moods { .. } | Self::Completions { .. } => None,
        }
    }

    pub const fn page_size(&self) -> usize {
        match self {
            Self::List { limit, .. } | Self::Search { limit, .. } => *limit,
            _ => DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn parse_mood_arg(raw: &str) -> Result<Mood, String> {
    raw.trim()
        .to_lowercase()
        .parse::<Mood>()
        .map_err(|error| error.to_string())
}
