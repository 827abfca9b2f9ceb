use chrono::Utc;
use clap::Subcommand;
use steadystride_core::progress::{achievements, best_streak};
use steadystride_core::storage::Database;
use steadystride_core::Config;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// All-time stats
    All,
    /// Streak and the last seven days
    Progress,
    /// Unlocked achievements
    Achievements {
        /// Include locked achievements with progress toward each
        #[arg(long)]
        all: bool,
    },
    /// Most recent sessions
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Today => {
            let stats = db.stats_today()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::All => {
            let stats = db.stats_all()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Progress => {
            let dates = db.session_dates()?;
            let context = db.progress_context(Utc::now().date_naive())?;
            let out = serde_json::json!({
                "streak": context.streak,
                "bestStreak": best_streak(&dates),
                "todayCompleted": context.today_completed,
                "weeklyProgress": context.weekly_progress,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        StatsAction::Achievements { all } => {
            let sessions = db.all_sessions()?;
            let library = Config::load()?.routine_library();
            let list = if all {
                achievements::evaluate(&sessions, &library)
            } else {
                achievements::unlocked(&sessions, &library)
            };
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        StatsAction::History { limit } => {
            let sessions = db.list_sessions(limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
