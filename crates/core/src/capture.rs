//! Result-URL capture.
//!
//! Given a results page already scoped to one route, captures up to N
//! representative result links. Two patterns exist because the site mixes
//! interaction models: app and flow results are full navigations, screen
//! results open an overlay on top of the grid.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::dom::{self, ResultCandidate};
use crate::error::Result;
use crate::route::{Platform, RouteKind};
use crate::workflow::{WorkflowExecutor, WorkflowStep};

/// How results of a route are opened and therefore captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapturePattern {
	/// Click, read the new address, navigate back.
	Navigation,
	/// Click, wait for the overlay, read its canonical address, dismiss.
	Modal,
}

/// One captured result link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedUrl {
	pub url: String,
	pub title: String,
	pub description: String,
	/// Route the result belongs to.
	pub kind: RouteKind,
	pub keyword: String,
	pub platform: Platform,
	/// In `[0, 1]`; earlier grid positions score higher.
	pub relevance_score: f64,
	/// Unix timestamp in milliseconds.
	pub captured_at: i64,
	pub metadata: Value,
}

/// Outcome of one capture run. A shortfall is not an error: the run
/// returns whatever it captured plus descriptive warnings.
#[derive(Debug, Clone, Default)]
pub struct CaptureOutcome {
	pub urls: Vec<CapturedUrl>,
	pub warnings: Vec<String>,
}

/// Captures clean result URLs from the current results page.
pub struct UrlCaptureManager {
	executor: WorkflowExecutor,
	config: Arc<EngineConfig>,
	exclusions: Vec<Regex>,
}

impl UrlCaptureManager {
	pub fn new(executor: WorkflowExecutor, config: Arc<EngineConfig>) -> Self {
		let exclusions = config
			.excluded_path_patterns
			.iter()
			.filter_map(|pattern| match Regex::new(&regex::escape(pattern)) {
				Ok(regex) => Some(regex),
				Err(error) => {
					warn!(target: "scout", pattern, %error, "dropping unusable exclusion pattern");
					None
				}
			})
			.collect();
		Self {
			executor,
			config,
			exclusions,
		}
	}

	/// Captures up to `count` unique result URLs using the route's
	/// pattern.
	pub async fn capture(
		&self,
		route: RouteKind,
		keyword: &str,
		platform: Platform,
		count: usize,
	) -> CaptureOutcome {
		let mut outcome = CaptureOutcome::default();

		let payload = match self
			.executor
			.evaluate_json(dom::RESULT_CANDIDATE_QUERY, "collect result candidates")
			.await
		{
			Ok(payload) => payload,
			Err(error) => {
				outcome
					.warnings
					.push(format!("could not scan the results grid: {error}"));
				return outcome;
			}
		};

		let candidates: Vec<ResultCandidate> = dom::parse_records(&payload);
		let total_found = candidates.len();
		// Filter before any click: brand and profile links share the grid
		// with real results and must never be followed.
		let eligible: Vec<ResultCandidate> = candidates
			.into_iter()
			.filter(|candidate| match candidate.href.as_deref() {
				Some(href) => !self.is_excluded(href),
				None => true,
			})
			.collect();
		debug!(
			target: "scout",
			route = route.as_str(),
			total_found,
			eligible = eligible.len(),
			"scanned results grid"
		);

		if eligible.is_empty() {
			outcome
				.warnings
				.push("no eligible result candidates on the page".to_string());
			return outcome;
		}

		let mut seen = HashSet::new();
		for (position, candidate) in eligible.iter().enumerate() {
			if outcome.urls.len() >= count {
				break;
			}

			let captured = match route.capture_pattern() {
				CapturePattern::Navigation => self.capture_via_navigation(candidate).await,
				CapturePattern::Modal => self.capture_via_modal(candidate).await,
			};

			match captured {
				Ok(Some(url)) => {
					if !seen.insert(url.clone()) {
						debug!(target: "scout", url, "skipping duplicate capture");
						continue;
					}
					outcome.urls.push(CapturedUrl {
						url,
						title: candidate
							.title
							.clone()
							.filter(|title| !title.is_empty())
							.unwrap_or_else(|| format!("{} result {}", route.as_str(), position + 1)),
						description: candidate.subtitle.clone().unwrap_or_default(),
						kind: route,
						keyword: keyword.to_string(),
						platform,
						relevance_score: position_score(position),
						captured_at: unix_millis(),
						metadata: json!({
							"position": position,
							"selector": candidate.selector,
							"pattern": route.capture_pattern(),
						}),
					});
				}
				Ok(None) => {
					outcome.warnings.push(format!(
						"candidate {} produced no readable address",
						position + 1
					));
				}
				Err(error) => {
					outcome
						.warnings
						.push(format!("candidate {} failed: {error}", position + 1));
				}
			}
		}

		if outcome.urls.len() < count {
			outcome.warnings.push(format!(
				"captured {} of {} requested results",
				outcome.urls.len(),
				count
			));
		}
		outcome
	}

	async fn capture_via_navigation(&self, candidate: &ResultCandidate) -> Result<Option<String>> {
		self.executor
			.run_step(&WorkflowStep::click(
				candidate.selector.clone(),
				"open the result",
			))
			.await?;

		let url = self.read_url(dom::CURRENT_URL_QUERY).await;

		// Return to the grid even when the address was unreadable, or
		// every later candidate would be captured from the wrong page.
		self.executor
			.run_step(&WorkflowStep::navigate_back("return to the results grid"))
			.await?;
		Ok(url)
	}

	async fn capture_via_modal(&self, candidate: &ResultCandidate) -> Result<Option<String>> {
		self.executor
			.run_step(&WorkflowStep::click(
				candidate.selector.clone(),
				"open the result overlay",
			))
			.await?;
		self.executor
			.run_step(
				&WorkflowStep::wait_for(dom::MODAL_SELECTOR, "wait for the overlay")
					.with_fallback(dom::MODAL_SELECTOR_FALLBACK)
					.with_timeout(5_000),
			)
			.await?;

		let url = self.read_url(dom::MODAL_URL_QUERY).await;

		self.executor
			.run_step(&WorkflowStep::press_key("Escape", "dismiss the overlay"))
			.await?;
		Ok(url)
	}

	/// Reads an address off the page and normalizes it against the base
	/// URL. Relative hrefs absolutize; junk reads come back as `None`.
	async fn read_url(&self, query: &str) -> Option<String> {
		let raw = self
			.executor
			.evaluate_value(query, "read the captured address")
			.await
			.ok()?;
		let trimmed = raw.trim().trim_matches('"');
		if trimmed.is_empty() {
			return None;
		}
		let base = url::Url::parse(&self.config.base_url).ok()?;
		base.join(trimmed).ok().map(|url| url.to_string())
	}

	fn is_excluded(&self, href: &str) -> bool {
		self.exclusions.iter().any(|pattern| pattern.is_match(href))
	}
}

/// Linear position decay: 0.95 for the first result, 0.07 less per
/// position, floored at 0.30.
fn position_score(position: usize) -> f64 {
	(0.95 - 0.07 * position as f64).max(0.30)
}

/// Unix timestamp in milliseconds.
pub fn unix_millis() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_millis() as i64)
		.unwrap_or(0)
}
