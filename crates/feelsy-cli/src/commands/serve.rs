use clap::Args;

use super::{CommandResult, Context};

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured port
    #[arg(long)]
    pub port: Option<u16>,
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<String>,
}

pub fn run(args: ServeArgs, ctx: &Context) -> CommandResult {
    let mut config = ctx.load_config()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(feelsy_server::start_server(config))?;
    Ok(())
}
