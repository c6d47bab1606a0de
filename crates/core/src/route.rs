//! Route-level search execution.
//!
//! A route is a content category of the target site. Each route determines
//! which search surface to open and which capture pattern its results
//! need. The route executor runs one (route, keyword) search end to end
//! and normalizes every outcome, good or bad, into a
//! [`RouteExecutionResult`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use scout_runtime::ToolInvoker;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capture::{CapturePattern, CapturedUrl, UrlCaptureManager};
use crate::config::{EngineConfig, resolve_steps};
use crate::error::{Error, Result};
use crate::suggest::{
	Strategy, StrategyDecision, SuggestionEngine, select_best_suggestion,
};
use crate::workflow::{WorkflowExecutor, WorkflowStep};

/// Content category of the target site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
	Apps,
	Flows,
	Screens,
}

impl RouteKind {
	pub const ALL: [RouteKind; 3] = [RouteKind::Apps, RouteKind::Flows, RouteKind::Screens];

	pub fn as_str(self) -> &'static str {
		match self {
			RouteKind::Apps => "apps",
			RouteKind::Flows => "flows",
			RouteKind::Screens => "screens",
		}
	}

	/// App and flow results are full navigations; screen results open an
	/// overlay on top of the grid.
	pub fn capture_pattern(self) -> CapturePattern {
		match self {
			RouteKind::Apps | RouteKind::Flows => CapturePattern::Navigation,
			RouteKind::Screens => CapturePattern::Modal,
		}
	}
}

impl std::fmt::Display for RouteKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for RouteKind {
	type Err = String;

	fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
		match raw.to_lowercase().as_str() {
			"apps" | "app" => Ok(RouteKind::Apps),
			"flows" | "flow" => Ok(RouteKind::Flows),
			"screens" | "screen" => Ok(RouteKind::Screens),
			other => Err(format!("unknown route '{other}'")),
		}
	}
}

/// Device platform the search is scoped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
	#[default]
	Ios,
	Android,
	Web,
}

impl Platform {
	pub fn as_str(self) -> &'static str {
		match self {
			Platform::Ios => "ios",
			Platform::Android => "android",
			Platform::Web => "web",
		}
	}
}

impl std::fmt::Display for Platform {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Platform {
	type Err = String;

	fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
		match raw.to_lowercase().as_str() {
			"ios" => Ok(Platform::Ios),
			"android" => Ok(Platform::Android),
			"web" => Ok(Platform::Web),
			other => Err(format!("unknown platform '{other}'")),
		}
	}
}

/// Normalized outcome of one (route, keyword) execution. Immutable after
/// return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteExecutionResult {
	pub route: RouteKind,
	pub keyword: String,
	pub platform: Platform,
	pub captured_urls: Vec<CapturedUrl>,
	pub execution_time_ms: u64,
	pub success: bool,
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
	pub strategy: Option<Strategy>,
}

/// Aggregate of a comprehensive run over many (route, keyword) pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveRunResult {
	pub results: Vec<RouteExecutionResult>,
	pub total_duration_ms: u64,
	pub total_captured: usize,
}

/// Runs route searches against one browser session.
pub struct RouteExecutor {
	config: Arc<EngineConfig>,
	executor: WorkflowExecutor,
	suggestions: SuggestionEngine,
	capture: UrlCaptureManager,
}

impl RouteExecutor {
	pub fn new(invoker: Arc<dyn ToolInvoker>, config: Arc<EngineConfig>) -> Self {
		let executor = WorkflowExecutor::new(Arc::clone(&invoker))
			.with_settle_delay(Duration::from_millis(config.settle_delay_ms));
		Self {
			suggestions: SuggestionEngine::new(executor.clone(), Arc::clone(&config)),
			capture: UrlCaptureManager::new(executor.clone(), Arc::clone(&config)),
			executor,
			config,
		}
	}

	/// Runs one route search for one keyword.
	///
	/// Never fails: every error is caught, recorded in `errors`, and the
	/// result comes back with `success = false`, so sibling searches in a
	/// comprehensive run are unaffected.
	pub async fn execute(
		&self,
		route: RouteKind,
		keyword: &str,
		platform: Platform,
		count: usize,
	) -> RouteExecutionResult {
		let started = Instant::now();
		let mut result = RouteExecutionResult {
			route,
			keyword: keyword.to_string(),
			platform,
			captured_urls: Vec::new(),
			execution_time_ms: 0,
			success: false,
			errors: Vec::new(),
			warnings: Vec::new(),
			strategy: None,
		};

		match self.run_search(route, keyword, platform, count, &mut result).await {
			Ok(()) => {
				result.success = true;
				info!(
					target: "scout",
					route = route.as_str(),
					keyword,
					captured = result.captured_urls.len(),
					"route search finished"
				);
			}
			Err(error) => {
				warn!(
					target: "scout",
					route = route.as_str(),
					keyword,
					%error,
					"route search failed"
				);
				result.errors.push(error.to_string());
			}
		}

		result.execution_time_ms = started.elapsed().as_millis() as u64;
		result
	}

	/// Runs every (route, keyword) pair strictly sequentially, in the
	/// caller's iteration order. There is exactly one browser; nothing
	/// here may run concurrently.
	pub async fn execute_pairs(
		&self,
		pairs: &[(RouteKind, String)],
		platform: Platform,
		count: usize,
	) -> ComprehensiveRunResult {
		let started = Instant::now();
		let mut results = Vec::with_capacity(pairs.len());
		for (route, keyword) in pairs {
			results.push(self.execute(*route, keyword, platform, count).await);
		}

		let total_captured = results
			.iter()
			.map(|result| result.captured_urls.len())
			.sum();
		ComprehensiveRunResult {
			results,
			total_duration_ms: started.elapsed().as_millis() as u64,
			total_captured,
		}
	}

	/// Convenience comprehensive mode: every requested route crossed with
	/// every keyword, route-major.
	pub async fn execute_comprehensive(
		&self,
		routes: &[RouteKind],
		keywords: &[String],
		platform: Platform,
		count: usize,
	) -> ComprehensiveRunResult {
		let pairs: Vec<(RouteKind, String)> = routes
			.iter()
			.flat_map(|route| keywords.iter().map(move |keyword| (*route, keyword.clone())))
			.collect();
		self.execute_pairs(&pairs, platform, count).await
	}

	async fn run_search(
		&self,
		route: RouteKind,
		keyword: &str,
		platform: Platform,
		count: usize,
		result: &mut RouteExecutionResult,
	) -> Result<()> {
		// Open the route's search surface and type the keyword.
		let steps = resolve_steps(
			self.config.workflows.search_for(route),
			&[
				("base_url", self.config.base_url.as_str()),
				("platform", platform.as_str()),
				("keyword", keyword),
			],
		);
		self.executor.run(&steps).await?;

		let suggestions = self.suggestions.discover_suggestions(keyword).await?;
		let surface = self.suggestions.search_surface_available().await;
		let decision = select_best_suggestion(&suggestions, route, keyword, surface);
		debug!(target: "scout", reasoning = %decision.reasoning, "strategy selected");
		result.strategy = Some(decision.strategy);

		let mut reached_results = self
			.suggestions
			.execute_strategy(&decision, route, keyword, platform)
			.await;

		// A failed suggestion click degrades to a raw text search before
		// giving up on the pair.
		if !reached_results && decision.strategy == Strategy::ClickSuggestion && surface {
			let fallback = StrategyDecision {
				strategy: Strategy::TextSearch,
				suggestion: None,
				reasoning: "suggestion click failed; retrying as a raw text search".to_string(),
			};
			result.warnings.push(fallback.reasoning.clone());
			result.strategy = Some(Strategy::TextSearch);
			reached_results = self
				.suggestions
				.execute_strategy(&fallback, route, keyword, platform)
				.await;
		}

		if !reached_results {
			return Err(Error::SearchFailed {
				keyword: keyword.to_string(),
				message: "no strategy produced a results page".to_string(),
			});
		}

		if self.config.debug {
			// Best effort; a failed snapshot must not fail the pair.
			if let Err(error) = self
				.executor
				.run_step(&WorkflowStep::screenshot("results page snapshot"))
				.await
			{
				debug!(target: "scout", %error, "debug screenshot failed");
			}
		}

		let outcome = self.capture.capture(route, keyword, platform, count).await;
		result.warnings.extend(outcome.warnings);
		result.captured_urls = outcome.urls;
		Ok(())
	}
}
