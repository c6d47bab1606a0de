//! Multi-phase progressive search.
//!
//! One run walks a fixed phase order: authentication, analysis, one
//! search phase per requested route, then curation. The whole run holds
//! the session guard, so exactly one browser session exists from the
//! first navigation to the last capture, and the guard's drop guarantees
//! release no matter how a phase ends.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use scout_runtime::{SessionManager, ToolInvoker};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::capture::CapturedUrl;
use crate::config::{EngineConfig, resolve_steps};
use crate::dom::{self, AuthProbe};
use crate::error::{Error, Result};
use crate::route::{Platform, RouteExecutionResult, RouteExecutor, RouteKind};
use crate::workflow::{WorkflowExecutor, WorkflowStep};

/// Status of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
	Running,
	Completed,
	Failed,
}

impl PhaseStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			PhaseStatus::Running => "running",
			PhaseStatus::Completed => "completed",
			PhaseStatus::Failed => "failed",
		}
	}
}

/// One phase transition. Emitted on the event channel as it happens and,
/// for terminal states, appended to the run's phase log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPhase {
	pub phase: String,
	pub message: String,
	pub status: PhaseStatus,
	pub result_count: usize,
	pub duration_ms: u64,
}

/// What to search for.
#[derive(Debug, Clone)]
pub struct SearchRequest {
	pub keywords: Vec<String>,
	/// Routes to search. Empty means all of them.
	pub routes: Vec<RouteKind>,
	pub platform: Platform,
	/// Per-keyword result cap; falls back to the configured default.
	pub per_keyword_cap: Option<usize>,
}

/// Outcome of one progressive run. Always returned, never thrown away:
/// a failed run carries its phase log and error message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchReport {
	pub phases: Vec<SearchPhase>,
	pub route_results: Vec<RouteExecutionResult>,
	/// All captured URLs merged across routes, deduplicated, sorted by
	/// relevance score descending.
	pub curated: Vec<CapturedUrl>,
	/// Captured-URL count per route name.
	pub summary: BTreeMap<String, usize>,
	pub total_duration_ms: u64,
	pub success: bool,
	pub authenticated: bool,
	pub error: Option<String>,
}

/// The phase state machine.
pub struct ProgressiveSearchEngine {
	session: SessionManager,
	config: Arc<EngineConfig>,
	events: broadcast::Sender<SearchPhase>,
}

impl ProgressiveSearchEngine {
	pub fn new(session: SessionManager, config: Arc<EngineConfig>) -> Self {
		let (events, _) = broadcast::channel(64);
		Self {
			session,
			config,
			events,
		}
	}

	/// Subscribes to phase transitions of subsequent runs.
	pub fn subscribe(&self) -> broadcast::Receiver<SearchPhase> {
		self.events.subscribe()
	}

	/// Runs all phases inside one exclusive browser session.
	///
	/// Never fails outright: the report's `success` and `error` fields
	/// carry the outcome. The session is released on every path.
	pub async fn run(&self, request: SearchRequest) -> SearchReport {
		let started = Instant::now();
		let mut report = SearchReport::default();

		let guard = self.session.acquire().await;
		let outcome = self
			.run_phases(guard.invoker(), &request, &mut report)
			.await;
		// Ends the session on success and failure alike; the guard's drop
		// would release the lock even if this were skipped.
		guard.end().await;

		match outcome {
			Ok(()) => report.success = true,
			Err(error) => {
				warn!(target: "scout", %error, "progressive search failed");
				report.success = false;
				report.error = Some(error.to_string());
			}
		}
		report.total_duration_ms = started.elapsed().as_millis() as u64;
		report
	}

	async fn run_phases(
		&self,
		invoker: Arc<dyn ToolInvoker>,
		request: &SearchRequest,
		report: &mut SearchReport,
	) -> Result<()> {
		// Authentication.
		let phase = self.phase_start("authentication", "checking login state");
		let authenticated = match self.authenticate(&invoker).await {
			Ok(authenticated) => {
				let message = if authenticated {
					"session is authenticated"
				} else {
					"continuing unauthenticated"
				};
				self.phase_end(report, phase, PhaseStatus::Completed, message, 0);
				authenticated
			}
			Err(error) => {
				self.phase_end(report, phase, PhaseStatus::Failed, &error.to_string(), 0);
				return Err(error);
			}
		};
		report.authenticated = authenticated;

		// Analysis.
		let phase = self.phase_start("analysis", "planning the search");
		let plan = match plan_search(request) {
			Ok(plan) => {
				let message = format!(
					"{} keyword(s) across {} route(s)",
					plan.keywords.len(),
					plan.routes.len()
				);
				self.phase_end(report, phase, PhaseStatus::Completed, &message, 0);
				plan
			}
			Err(error) => {
				self.phase_end(report, phase, PhaseStatus::Failed, &error.to_string(), 0);
				return Err(error);
			}
		};

		// One search phase per route, gated by the plan.
		let routes = RouteExecutor::new(Arc::clone(&invoker), Arc::clone(&self.config));
		let cap = request.per_keyword_cap.unwrap_or(self.config.result_cap);
		for route in &plan.routes {
			let phase = self.phase_start(
				&format!("search:{route}"),
				&format!("searching {route} for {} keyword(s)", plan.keywords.len()),
			);
			let run = routes
				.execute_comprehensive(&[*route], &plan.keywords, request.platform, cap)
				.await;
			// Individual pair failures are recorded in their results and
			// do not fail the phase; the run keeps its partial successes.
			let captured = run.total_captured;
			let failures = run
				.results
				.iter()
				.filter(|result| !result.success)
				.count();
			report.route_results.extend(run.results);
			let message = if failures == 0 {
				format!("captured {captured} result(s)")
			} else {
				format!("captured {captured} result(s), {failures} keyword(s) failed")
			};
			self.phase_end(report, phase, PhaseStatus::Completed, &message, captured);
		}

		// Curation.
		let phase = self.phase_start("curation", "merging and ranking results");
		let (curated, summary) = curate(&report.route_results);
		let message = summary
			.iter()
			.map(|(route, count)| format!("{route}: {count}"))
			.collect::<Vec<_>>()
			.join(", ");
		let count = curated.len();
		report.curated = curated;
		report.summary = summary;
		self.phase_end(
			report,
			phase,
			PhaseStatus::Completed,
			if message.is_empty() {
				"no results"
			} else {
				message.as_str()
			},
			count,
		);
		Ok(())
	}

	/// Determines the login state and logs in when possible.
	///
	/// The explicit logged-out indicator is checked first: an ambiguous
	/// page that shows neither indicator must not count as logged-in
	/// unless the configured heuristic says so. Login failures degrade to
	/// an unauthenticated run instead of killing the phase.
	async fn authenticate(&self, invoker: &Arc<dyn ToolInvoker>) -> Result<bool> {
		let executor = WorkflowExecutor::new(Arc::clone(invoker))
			.with_settle_delay(Duration::from_millis(self.config.settle_delay_ms));
		executor
			.run(&[WorkflowStep::navigate(
				self.config.base_url.clone(),
				"open the target site",
			)])
			.await?;

		let probe = self.probe_auth(&executor).await;
		if !probe.login_visible {
			if probe.account_visible {
				return Ok(true);
			}
			return Ok(self.config.assume_authenticated_without_login_button);
		}

		let Some(credentials) = &self.config.credentials else {
			info!(target: "scout", "no credentials configured; continuing unauthenticated");
			return Ok(false);
		};

		let steps = resolve_steps(
			&self.config.workflows.login,
			&[
				("base_url", self.config.base_url.as_str()),
				("email", credentials.email.as_str()),
				("password", credentials.password.as_str()),
			],
		);
		match executor.run(&steps).await {
			Ok(()) => {
				let probe = self.probe_auth(&executor).await;
				Ok(probe.account_visible || !probe.login_visible)
			}
			Err(error) => {
				warn!(target: "scout", %error, "login failed; continuing unauthenticated");
				Ok(false)
			}
		}
	}

	async fn probe_auth(&self, executor: &WorkflowExecutor) -> AuthProbe {
		match executor
			.evaluate_json(dom::AUTH_PROBE_QUERY, "probe login state")
			.await
		{
			Ok(payload) => serde_json::from_value(payload).unwrap_or_default(),
			Err(_) => AuthProbe::default(),
		}
	}

	fn phase_start(&self, phase: &str, message: &str) -> PhaseTracker {
		let event = SearchPhase {
			phase: phase.to_string(),
			message: message.to_string(),
			status: PhaseStatus::Running,
			result_count: 0,
			duration_ms: 0,
		};
		info!(target: "scout", phase, message, "phase started");
		let _ = self.events.send(event);
		PhaseTracker {
			phase: phase.to_string(),
			started: Instant::now(),
		}
	}

	fn phase_end(
		&self,
		report: &mut SearchReport,
		tracker: PhaseTracker,
		status: PhaseStatus,
		message: &str,
		result_count: usize,
	) {
		let event = SearchPhase {
			phase: tracker.phase,
			message: message.to_string(),
			status,
			result_count,
			duration_ms: tracker.started.elapsed().as_millis() as u64,
		};
		info!(
			target: "scout",
			phase = %event.phase,
			status = status.as_str(),
			message,
			"phase finished"
		);
		let _ = self.events.send(event.clone());
		report.phases.push(event);
	}
}

struct PhaseTracker {
	phase: String,
	started: Instant,
}

struct SearchPlan {
	routes: Vec<RouteKind>,
	keywords: Vec<String>,
}

/// Normalizes the request into a concrete plan. Keywords are trimmed and
/// deduplicated preserving order; an empty keyword list fails the
/// analysis phase.
fn plan_search(request: &SearchRequest) -> Result<SearchPlan> {
	let mut seen = HashSet::new();
	let keywords: Vec<String> = request
		.keywords
		.iter()
		.map(|keyword| keyword.trim().to_string())
		.filter(|keyword| !keyword.is_empty() && seen.insert(keyword.to_lowercase()))
		.collect();
	if keywords.is_empty() {
		return Err(Error::Phase {
			phase: "analysis".to_string(),
			message: "no usable keywords in the request".to_string(),
		});
	}

	let mut seen_routes = HashSet::new();
	let mut routes: Vec<RouteKind> = request
		.routes
		.iter()
		.copied()
		.filter(|route| seen_routes.insert(*route))
		.collect();
	if routes.is_empty() {
		routes = RouteKind::ALL.to_vec();
	}

	Ok(SearchPlan { routes, keywords })
}

/// Merges route buckets, deduplicates by URL across routes, and sorts by
/// relevance score descending. Returns the merged list plus a per-route
/// summary count.
fn curate(results: &[RouteExecutionResult]) -> (Vec<CapturedUrl>, BTreeMap<String, usize>) {
	let mut seen = HashSet::new();
	let mut merged: Vec<CapturedUrl> = results
		.iter()
		.flat_map(|result| result.captured_urls.iter())
		.filter(|url| seen.insert(url.url.clone()))
		.cloned()
		.collect();
	merged.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

	let mut summary = BTreeMap::new();
	for url in &merged {
		*summary.entry(url.kind.as_str().to_string()).or_insert(0) += 1;
	}
	(merged, summary)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::capture::unix_millis;
	use crate::testing::ScriptedInvoker;
	use crate::workflow::tool_names;

	fn test_config() -> Arc<EngineConfig> {
		Arc::new(EngineConfig {
			settle_delay_ms: 0,
			..EngineConfig::default()
		})
	}

	fn captured(url: &str, kind: RouteKind, score: f64) -> CapturedUrl {
		CapturedUrl {
			url: url.to_string(),
			title: "t".to_string(),
			description: String::new(),
			kind,
			keyword: "banking".to_string(),
			platform: Platform::Ios,
			relevance_score: score,
			captured_at: unix_millis(),
			metadata: json!({}),
		}
	}

	fn route_result(urls: Vec<CapturedUrl>) -> RouteExecutionResult {
		RouteExecutionResult {
			route: urls.first().map(|url| url.kind).unwrap_or(RouteKind::Apps),
			keyword: "banking".to_string(),
			platform: Platform::Ios,
			captured_urls: urls,
			execution_time_ms: 1,
			success: true,
			errors: Vec::new(),
			warnings: Vec::new(),
			strategy: None,
		}
	}

	#[test]
	fn curation_dedupes_across_routes_and_sorts_by_score() {
		let results = vec![
			route_result(vec![
				captured("https://mobbin.com/apps/a", RouteKind::Apps, 0.88),
				captured("https://mobbin.com/shared", RouteKind::Apps, 0.5),
			]),
			route_result(vec![
				captured("https://mobbin.com/shared", RouteKind::Screens, 0.95),
				captured("https://mobbin.com/screens/b", RouteKind::Screens, 0.6),
			]),
		];

		let (curated, summary) = curate(&results);
		assert_eq!(curated.len(), 3);
		// The duplicate kept its first occurrence (the apps bucket).
		assert_eq!(summary.get("apps"), Some(&2));
		assert_eq!(summary.get("screens"), Some(&1));
		// Sorted descending by score.
		assert!(curated.windows(2).all(|pair| {
			pair[0].relevance_score >= pair[1].relevance_score
		}));
	}

	#[test]
	fn plan_rejects_empty_keywords() {
		let request = SearchRequest {
			keywords: vec!["  ".to_string(), String::new()],
			routes: vec![RouteKind::Apps],
			platform: Platform::Ios,
			per_keyword_cap: None,
		};
		assert!(plan_search(&request).is_err());
	}

	#[test]
	fn plan_dedupes_and_defaults_routes() {
		let request = SearchRequest {
			keywords: vec![
				"Banking".to_string(),
				"banking".to_string(),
				"fintech".to_string(),
			],
			routes: Vec::new(),
			platform: Platform::Ios,
			per_keyword_cap: None,
		};
		let plan = plan_search(&request).unwrap();
		assert_eq!(plan.keywords, vec!["Banking", "fintech"]);
		assert_eq!(plan.routes, RouteKind::ALL.to_vec());
	}

	/// Scripts a page that is logged in, shows one apps suggestion, and
	/// serves one result per address read.
	fn full_run_invoker() -> ScriptedInvoker {
		use std::sync::atomic::{AtomicUsize, Ordering};
		let reads = AtomicUsize::new(0);
		ScriptedInvoker::new().on(tool_names::EVALUATE, move |args| {
			let script = args["script"].as_str().unwrap_or_default();
			if script.contains("loginVisible") {
				Ok(ScriptedInvoker::json_result(
					&json!({"loginVisible": false, "accountVisible": true}),
				))
			} else if script.contains("data-scout-idx") {
				Ok(ScriptedInvoker::json_result(&json!([{
					"text": "banking apps",
					"selector": "[data-scout-idx='0']",
					"section": "Apps"
				}])))
			} else if script.contains("available") {
				Ok(ScriptedInvoker::json_result(&json!({"available": true})))
			} else if script.contains("data-scout-result") {
				Ok(ScriptedInvoker::json_result(&json!([
					{"selector": "[data-scout-result='0']", "href": "/apps/revolut", "title": "Revolut"},
					{"selector": "[data-scout-result='1']", "href": "/apps/monzo", "title": "Monzo"}
				])))
			} else {
				let next = reads.fetch_add(1, Ordering::SeqCst);
				Ok(ScriptedInvoker::text_result(&format!(
					"https://mobbin.com/apps/result-{next}"
				)))
			}
		})
	}

	#[tokio::test]
	async fn full_run_walks_phases_in_order() {
		let session = SessionManager::new(Arc::new(full_run_invoker()));
		let engine = ProgressiveSearchEngine::new(session.clone(), test_config());
		let mut events = engine.subscribe();

		let report = engine
			.run(SearchRequest {
				keywords: vec!["banking".to_string()],
				routes: vec![RouteKind::Apps],
				platform: Platform::Ios,
				per_keyword_cap: Some(2),
			})
			.await;

		assert!(report.success, "run failed: {:?}", report.error);
		assert!(report.authenticated);
		let phase_names: Vec<&str> = report.phases.iter().map(|p| p.phase.as_str()).collect();
		assert_eq!(
			phase_names,
			vec!["authentication", "analysis", "search:apps", "curation"]
		);
		assert!(report.phases.iter().all(|p| p.status == PhaseStatus::Completed));
		assert_eq!(report.curated.len(), 2);
		assert_eq!(report.summary.get("apps"), Some(&2));

		// The event stream saw a running and a terminal event per phase.
		let mut running = 0;
		let mut terminal = 0;
		while let Ok(event) = events.try_recv() {
			match event.status {
				PhaseStatus::Running => running += 1,
				_ => terminal += 1,
			}
		}
		assert_eq!(running, 4);
		assert_eq!(terminal, 4);

		// The session was released: a new acquire does not hang.
		let _guard = session.acquire().await;
	}

	#[tokio::test]
	async fn fatal_auth_failure_still_releases_the_session() {
		let invoker = ScriptedInvoker::new().fail_tool(tool_names::NAVIGATE, "tunnel collapsed");
		let session = SessionManager::new(Arc::new(invoker));
		let engine = ProgressiveSearchEngine::new(session.clone(), test_config());

		let report = engine
			.run(SearchRequest {
				keywords: vec!["banking".to_string()],
				routes: vec![RouteKind::Apps],
				platform: Platform::Ios,
				per_keyword_cap: None,
			})
			.await;

		assert!(!report.success);
		assert!(report.error.is_some());
		assert_eq!(report.phases.len(), 1);
		assert_eq!(report.phases[0].status, PhaseStatus::Failed);

		let _guard = session.acquire().await;
	}

	#[tokio::test]
	async fn login_failure_degrades_to_unauthenticated() {
		// Logged out, credentials configured, and the login form's submit
		// never works.
		let invoker = ScriptedInvoker::new()
			.fail_tool(tool_names::FILL, "login form rejected input")
			.on(tool_names::EVALUATE, |args| {
				let script = args["script"].as_str().unwrap_or_default();
				if script.contains("loginVisible") {
					Ok(ScriptedInvoker::json_result(
						&json!({"loginVisible": true, "accountVisible": false}),
					))
				} else if script.contains("data-scout-idx") {
					Ok(ScriptedInvoker::json_result(&json!([])))
				} else if script.contains("available") {
					Ok(ScriptedInvoker::json_result(&json!({"available": true})))
				} else if script.contains("data-scout-result") {
					Ok(ScriptedInvoker::json_result(&json!([])))
				} else {
					Ok(ScriptedInvoker::text_result("https://mobbin.com/x"))
				}
			});
		let config = Arc::new(EngineConfig {
			settle_delay_ms: 0,
			credentials: Some(crate::config::Credentials {
				email: "design@example.com".to_string(),
				password: "secret".to_string(),
			}),
			..EngineConfig::default()
		});
		let session = SessionManager::new(Arc::new(invoker));
		let engine = ProgressiveSearchEngine::new(session, config);

		let report = engine
			.run(SearchRequest {
				keywords: vec!["banking".to_string()],
				routes: vec![RouteKind::Apps],
				platform: Platform::Ios,
				per_keyword_cap: None,
			})
			.await;

		// The run carried on without a login.
		assert!(report.success, "run failed: {:?}", report.error);
		assert!(!report.authenticated);
	}

	#[tokio::test]
	async fn ambiguous_page_follows_the_configured_heuristic() {
		let ambiguous_probe = || {
			ScriptedInvoker::new().on(tool_names::EVALUATE, |args| {
				let script = args["script"].as_str().unwrap_or_default();
				if script.contains("loginVisible") {
					Ok(ScriptedInvoker::json_result(
						&json!({"loginVisible": false, "accountVisible": false}),
					))
				} else if script.contains("data-scout-idx") {
					Ok(ScriptedInvoker::json_result(&json!([])))
				} else if script.contains("available") {
					Ok(ScriptedInvoker::json_result(&json!({"available": true})))
				} else if script.contains("data-scout-result") {
					Ok(ScriptedInvoker::json_result(&json!([])))
				} else {
					Ok(ScriptedInvoker::text_result("https://mobbin.com/x"))
				}
			})
		};
		let request = || SearchRequest {
			keywords: vec!["banking".to_string()],
			routes: vec![RouteKind::Apps],
			platform: Platform::Ios,
			per_keyword_cap: None,
		};

		let engine = ProgressiveSearchEngine::new(
			SessionManager::new(Arc::new(ambiguous_probe())),
			test_config(),
		);
		let report = engine.run(request()).await;
		assert!(report.authenticated, "default heuristic trusts the absent login button");

		let strict = Arc::new(EngineConfig {
			settle_delay_ms: 0,
			assume_authenticated_without_login_button: false,
			..EngineConfig::default()
		});
		let engine = ProgressiveSearchEngine::new(
			SessionManager::new(Arc::new(ambiguous_probe())),
			strict,
		);
		let report = engine.run(request()).await;
		assert!(!report.authenticated);
	}
}
