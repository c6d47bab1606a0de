//! Argument definitions.

use clap::{Args, Parser, Subcommand};
use scout::route::{Platform, RouteKind};

use crate::output::OutputFormat;

/// Finds representative design-reference links for a set of keywords by
/// driving a browser through an automation tool.
#[derive(Debug, Parser)]
#[command(name = "scout", version, about)]
pub struct Cli {
	/// Increase log verbosity (-v info, -vv debug).
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format for results on stdout.
	#[arg(long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Run a progressive search and print the curated results.
	Search(SearchArgs),
	/// Connect to the automation tool and list its advertised tools.
	Tools(ToolArgs),
}

#[derive(Debug, Args)]
pub struct SearchArgs {
	/// Keyword to search for. Repeatable.
	#[arg(short, long = "keyword", required = true)]
	pub keywords: Vec<String>,

	/// Route to search (apps, flows, screens). Repeatable; all routes
	/// when omitted.
	#[arg(short, long = "route")]
	pub routes: Vec<RouteKind>,

	/// Device platform to scope the search to.
	#[arg(short, long, default_value = "ios")]
	pub platform: Platform,

	/// Results to capture per keyword.
	#[arg(short = 'n', long, default_value_t = 5)]
	pub count: usize,

	/// Target-site base URL.
	#[arg(long, env = "SCOUT_BASE_URL")]
	pub base_url: Option<String>,

	/// Account email for the target site.
	#[arg(long, env = "SCOUT_EMAIL")]
	pub email: Option<String>,

	/// Account password for the target site.
	#[arg(long, env = "SCOUT_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,

	/// Run the browser with a visible window.
	#[arg(long)]
	pub headed: bool,

	/// Take a screenshot of every results page reached.
	#[arg(long)]
	pub debug: bool,

	#[command(flatten)]
	pub tool: ToolArgs,
}

#[derive(Debug, Args)]
pub struct ToolArgs {
	/// Automation-tool command to spawn.
	#[arg(long, env = "SCOUT_TOOL_CMD", default_value = "scout-browser-tool")]
	pub tool_cmd: String,

	/// Arguments for the automation tool, whitespace-separated.
	#[arg(long, env = "SCOUT_TOOL_ARGS", default_value = "", hide_default_value = true)]
	pub tool_args: String,
}

impl ToolArgs {
	pub fn process_config(&self) -> scout_runtime::ToolProcessConfig {
		scout_runtime::ToolProcessConfig::new(
			self.tool_cmd.clone(),
			self.tool_args
				.split_whitespace()
				.map(str::to_string)
				.collect(),
		)
	}
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn search_args_parse() {
		let cli = Cli::parse_from([
			"scout", "search", "-k", "banking", "-k", "fintech", "-r", "apps", "-n", "3",
		]);
		match cli.command {
			Command::Search(args) => {
				assert_eq!(args.keywords, vec!["banking", "fintech"]);
				assert_eq!(args.routes, vec![RouteKind::Apps]);
				assert_eq!(args.count, 3);
				assert_eq!(args.platform, Platform::Ios);
			}
			_ => panic!("expected search subcommand"),
		}
	}

	#[test]
	fn tool_args_split_into_a_process_config() {
		let args = ToolArgs {
			tool_cmd: "npx".to_string(),
			tool_args: "@automation/server --headless".to_string(),
		};
		let config = args.process_config();
		assert_eq!(config.command, "npx");
		assert_eq!(config.args, vec!["@automation/server", "--headless"]);
	}
}
