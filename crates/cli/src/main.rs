use clap::Parser;
use scout_cli::{cli::Cli, commands, error::CliError, logging, output};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;

	if let Err(err) = commands::dispatch(cli).await {
		handle_error(err, format);
		std::process::exit(1);
	}
}

fn handle_error(err: CliError, format: output::OutputFormat) {
	output::print_error_stderr(&err);

	// Agents reading stdout still get a structured failure envelope.
	if format == output::OutputFormat::Json {
		let envelope = serde_json::json!({
			"ok": false,
			"error": err.to_string(),
		});
		println!("{envelope}");
	}
}
