use std::sync::Arc;

use scout::config::{Credentials, EngineConfig};
use scout::search::{ProgressiveSearchEngine, SearchRequest};
use scout_runtime::{SessionManager, ToolClient};

use crate::cli::SearchArgs;
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat};

pub async fn run(args: SearchArgs, format: OutputFormat) -> Result<()> {
	let config = engine_config(&args)?;

	let mut process = args.tool.process_config();
	if config.headless {
		process.args.push("--headless".to_string());
	}
	let client = Arc::new(ToolClient::new(process));
	let session = SessionManager::new(client);
	let engine = ProgressiveSearchEngine::new(session, Arc::new(config));

	// Stream phase transitions to stderr while the run is in flight.
	let mut events = engine.subscribe();
	let progress = tokio::spawn(async move {
		while let Ok(phase) = events.recv().await {
			output::print_phase_stderr(&phase);
		}
	});

	let report = engine
		.run(SearchRequest {
			keywords: args.keywords,
			routes: args.routes,
			platform: args.platform,
			per_keyword_cap: Some(args.count),
		})
		.await;
	progress.abort();

	output::print_report(&report, format)?;
	if !report.success {
		return Err(CliError::SearchFailed(
			report.error.unwrap_or_else(|| "unknown failure".to_string()),
		));
	}
	Ok(())
}

fn engine_config(args: &SearchArgs) -> Result<EngineConfig> {
	let mut config = EngineConfig {
		headless: !args.headed,
		debug: args.debug,
		..EngineConfig::default()
	};
	if let Some(base_url) = &args.base_url {
		config.base_url = base_url.trim_end_matches('/').to_string();
	}
	config.credentials = match (&args.email, &args.password) {
		(Some(email), Some(password)) => Some(Credentials {
			email: email.clone(),
			password: password.clone(),
		}),
		(None, None) => None,
		_ => {
			return Err(CliError::InvalidInput(
				"email and password must be provided together".to_string(),
			));
		}
	};
	if args.count == 0 {
		return Err(CliError::InvalidInput(
			"count must be at least 1".to_string(),
		));
	}
	Ok(config)
}
