use clap::Subcommand;
use feelsy_core::{FriendEdge, FriendStatus};
use uuid::Uuid;

use super::{print_json, CommandResult, Context};

#[derive(Subcommand)]
pub enum FriendAction {
    /// Show friends' check-ins for today
    Feed {
        #[arg(long)]
        user: Uuid,
    },
    /// Create or update a friendship edge (user -> friend)
    Set {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        friend: Uuid,
        /// pending, accepted or blocked
        #[arg(long, default_value = "accepted")]
        status: String,
    },
}

pub fn run(action: FriendAction, ctx: &Context) -> CommandResult {
    let service = ctx.service()?;

    match action {
        FriendAction::Feed { user } => print_json(&service.friend_feels(user)?)?,
        FriendAction::Set {
            user,
            friend,
            status,
        } => {
            let status: FriendStatus = status.parse()?;
            service.set_friend_edge(&FriendEdge {
                user_id: user,
                friend_id: friend,
                status,
            })?;
            println!("ok");
        }
    }
    Ok(())
}
