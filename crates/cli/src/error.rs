use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("could not reach the automation tool: {0}")]
	Connection(String),

	#[error("search did not complete: {0}")]
	SearchFailed(String),

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error(transparent)]
	Runtime(#[from] scout_runtime::Error),

	#[error(transparent)]
	Engine(#[from] scout::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}
