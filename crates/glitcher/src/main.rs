mod cli;
mod run;
mod sinks;
mod sources;
mod transports;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::run(cli)
}
