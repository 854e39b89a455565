use super::args::*;

pub(crate) mod cache;
pub(crate) mod run;

use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(&cli.data_dir, args).await,
        Command::Cache(args) => cache::run(&cli.data_dir, args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
