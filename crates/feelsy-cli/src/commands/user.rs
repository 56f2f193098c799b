use clap::Subcommand;
use feelsy_core::PublicUser;
use uuid::Uuid;

use super::{print_json, CommandResult, Context};

#[derive(Subcommand)]
pub enum UserAction {
    /// Create or update a user's public identity
    Upsert {
        /// User ID (generated if omitted)
        #[arg(long)]
        id: Option<Uuid>,
        #[arg(long)]
        email: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
}

pub fn run(action: UserAction, ctx: &Context) -> CommandResult {
    let service = ctx.service()?;

    match action {
        UserAction::Upsert { id, email, name } => {
            let user = PublicUser {
                id: id.unwrap_or_else(Uuid::new_v4),
                email,
                name,
            };
            service.upsert_user(&user)?;
            print_json(&user)?;
        }
    }
    Ok(())
}
