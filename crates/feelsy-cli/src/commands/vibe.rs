use clap::Subcommand;
use uuid::Uuid;

use super::{print_json, CommandResult, Context};

#[derive(Subcommand)]
pub enum VibeAction {
    /// Send a good vibe
    Send {
        /// Sender user ID
        #[arg(long)]
        from: Uuid,
        /// Receiver user ID
        #[arg(long)]
        to: Uuid,
        /// hug, high-five, sunshine, heart or star
        #[arg(long = "type")]
        vibe_type: String,
        /// Optional message (max 100 characters)
        #[arg(long)]
        message: Option<String>,
    },
    /// List vibes a user received, newest first
    List {
        #[arg(long)]
        user: Uuid,
        /// Max results (1-50, default 20)
        #[arg(long)]
        limit: Option<u32>,
    },
}

pub fn run(action: VibeAction, ctx: &Context) -> CommandResult {
    let service = ctx.service()?;

    match action {
        VibeAction::Send {
            from,
            to,
            vibe_type,
            message,
        } => {
            let vibe = service.send_good_vibe(from, to, message, &vibe_type)?;
            print_json(&vibe)?;
        }
        VibeAction::List { user, limit } => print_json(&service.received_vibes(user, limit)?)?,
    }
    Ok(())
}
