use colored::Colorize;
use scout_runtime::ToolClient;

use crate::cli::ToolArgs;
use crate::error::{CliError, Result};
use crate::output::OutputFormat;

pub async fn run(args: ToolArgs, format: OutputFormat) -> Result<()> {
	let client = ToolClient::new(args.process_config());
	let tools = client
		.tools()
		.await
		.map_err(|error| CliError::Connection(error.to_string()))?;
	client.disconnect().await;

	match format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(&tools)?);
		}
		OutputFormat::Text => {
			if tools.is_empty() {
				println!("{}", "the automation tool advertises no tools".yellow());
			}
			for tool in &tools {
				println!(
					"{}  {}",
					tool.name.bold(),
					tool.description.as_deref().unwrap_or("").dimmed()
				);
			}
		}
	}
	Ok(())
}
