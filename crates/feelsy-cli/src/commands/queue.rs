use clap::Subcommand;
use feelsy_core::ProcessReport;

use super::{print_json, CommandResult, Context};

#[derive(Subcommand)]
pub enum QueueAction {
    /// Count pending, done and dead streak jobs
    Status,
    /// Apply every pending streak job now
    Drain {
        /// Jobs per user per pass
        #[arg(long, default_value = "100")]
        batch: usize,
    },
    /// List dead streak jobs
    Dead {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

pub fn run(action: QueueAction, ctx: &Context) -> CommandResult {
    let service = ctx.service()?;

    match action {
        QueueAction::Status => print_json(&service.queue_status()?)?,
        QueueAction::Drain { batch } => {
            let mut total = ProcessReport::default();
            loop {
                let report = service.process_streak_jobs(batch)?;
                total.merge(report);
                if report.applied == 0 && report.dead == 0 {
                    break;
                }
            }
            println!(
                "applied: {}, failed: {}, dead: {}, waiting to retry: {}",
                total.applied, total.failed, total.dead, total.deferred
            );
        }
        QueueAction::Dead { limit } => print_json(&service.database().dead_streak_jobs(limit)?)?,
    }
    Ok(())
}
