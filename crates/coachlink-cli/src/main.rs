//! `coachlink` binary entry point.

use clap::Parser;
use coachlink_cli::{CliArgs, CoachlinkCli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let cli = CoachlinkCli::from_args("coachlink", &args)?;
    cli.run(args).await?;
    Ok(())
}
