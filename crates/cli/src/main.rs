mod cmd;
mod util;

use anyhow::Result;
use argp::FromArgs;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// CI feedback bot: analyzes failed GitHub Actions job logs and posts
/// deduplicated, rate-limited feedback comments to pull requests.
struct TopLevel {
    #[argp(subcommand)]
    command: Command,
}

#[derive(FromArgs, PartialEq, Eq, Debug)]
#[argp(subcommand)]
enum Command {
    Extract(cmd::extract::Args),
    PostJob(cmd::post_job::Args),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy(),
        )
        .init();
    let args: TopLevel = argp::parse_args_or_exit(argp::DEFAULT);
    match args.command {
        Command::Extract(args) => cmd::extract::run(args),
        Command::PostJob(args) => cmd::post_job::run(args).await,
    }
}
