use clap::Subcommand;
use feelsy_core::NewCheckIn;
use uuid::Uuid;

use super::{print_json, CommandResult, Context};

#[derive(Subcommand)]
pub enum FeelAction {
    /// Record today's check-in for a user
    Checkin {
        /// User ID
        #[arg(long)]
        user: Uuid,
        /// Mood score (1-100)
        #[arg(long)]
        mood: i32,
        /// Energy score (1-100)
        #[arg(long)]
        energy: i32,
        /// Optional mood emoji
        #[arg(long)]
        emoji: Option<String>,
        /// Optional note (max 280 characters)
        #[arg(long)]
        note: Option<String>,
    },
    /// Show today's check-in
    Today {
        #[arg(long)]
        user: Uuid,
    },
    /// Show check-in history, newest first
    History {
        #[arg(long)]
        user: Uuid,
        /// Page size (1-100, default 20)
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Show streak stats and badges
    Stats {
        #[arg(long)]
        user: Uuid,
    },
}

pub fn run(action: FeelAction, ctx: &Context) -> CommandResult {
    let service = ctx.service()?;

    match action {
        FeelAction::Checkin {
            user,
            mood,
            energy,
            emoji,
            note,
        } => {
            let check = service.create_check_in(
                user,
                NewCheckIn {
                    mood_score: mood,
                    energy_score: energy,
                    mood_emoji: emoji,
                    note,
                },
            )?;
            // No worker runs here; apply the streak job right away.
            let report = service.process_user_jobs(user, 100)?;
            if report.failed > 0 || report.dead > 0 {
                eprintln!("warning: streak update deferred, see `queue status`");
            }
            print_json(&check)?;
        }
        FeelAction::Today { user } => print_json(&service.today_check_in(user)?)?,
        FeelAction::History {
            user,
            limit,
            offset,
        } => print_json(&service.feel_history(user, limit, offset)?)?,
        FeelAction::Stats { user } => print_json(&service.feel_stats(user)?)?,
    }
    Ok(())
}
