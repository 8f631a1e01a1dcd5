use clap::{ArgAction, Parser, Subcommand};
use portal_core::ReportingZone;
use portal_core::model::{GroupId, StudyActivityId, StudySessionId, WordId};

/// Review and progress tracking for the vocabulary study portal.
#[derive(Debug, Parser)]
#[command(name = "lang-portal", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database URL or file path
    #[arg(
        long = "db",
        env = "LANG_PORTAL_DB_URL",
        default_value = "sqlite://lang_portal.sqlite3",
        global = true
    )]
    pub db_url: String,

    /// UTC offset used for calendar days and rendered timestamps, e.g. +09:00
    #[arg(
        long,
        env = "LANG_PORTAL_UTC_OFFSET",
        default_value = "+00:00",
        global = true
    )]
    pub utc_offset: ReportingZone,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Wipe everything and load the starter catalog
    Seed,
    /// Delete all sessions and reviews, keeping the catalog
    ResetHistory,
    /// Start a study session
    Start {
        #[arg(long)]
        group: GroupId,
        #[arg(long)]
        activity: StudyActivityId,
    },
    /// Record a review outcome for a word in a session
    Review {
        #[arg(long)]
        session: StudySessionId,
        #[arg(long)]
        word: WordId,
        #[arg(long, action = ArgAction::Set)]
        correct: bool,
    },
    /// Success rate, session count, active groups and streak
    QuickStats,
    /// Words studied against words available
    StudyProgress,
    /// The most recent study session
    LastSession,
    /// List sessions, newest first
    Sessions {
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Only sessions of this activity
        #[arg(long)]
        activity: Option<StudyActivityId>,
    },
    /// Per-word tallies for one session
    SessionWords {
        #[arg(long)]
        session: StudySessionId,
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
    /// Recompute word counters from the review log
    Rebuild,
    /// Check word counters against the review log and repair drift
    Verify,
    /// Send a raw request, e.g. `request GET /api/dashboard/quick-stats`
    Request {
        method: String,
        target: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}
