mod search;
mod tools;

use crate::cli::{Cli, Command};
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
	match cli.command {
		Command::Search(args) => search::run(args, cli.format).await,
		Command::Tools(args) => tools::run(args, cli.format).await,
	}
}
