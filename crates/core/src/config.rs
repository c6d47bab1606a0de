//! Engine configuration and workflow templates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::route::{Platform, RouteKind};
use crate::workflow::WorkflowStep;

/// Default target-site base URL.
pub const DEFAULT_BASE_URL: &str = "https://mobbin.com";
/// Default number of results captured per keyword.
pub const DEFAULT_RESULT_CAP: usize = 5;
/// Default pause after page-transitioning steps.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 750;

/// Login credentials for the target site.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
	pub email: String,
	pub password: String,
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Everything the engine needs to know about the target site and how to
/// drive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
	/// Target-site base URL, without a trailing slash.
	pub base_url: String,
	/// Optional login credentials. Without them the engine runs
	/// unauthenticated and takes whatever the site shows logged-out
	/// visitors.
	pub credentials: Option<Credentials>,
	/// Per-keyword result cap.
	pub result_cap: usize,
	/// Ask the automation tool for a headless browser.
	pub headless: bool,
	/// Verbose step reporting.
	pub debug: bool,
	/// Pause after page-transitioning steps.
	pub settle_delay_ms: u64,
	/// Treat "no login button found" as proof of an authenticated
	/// session when the logged-in indicator is also absent. This is a
	/// heuristic with a known false-positive risk, which is why it is a
	/// switch and not a hard-coded assumption.
	pub assume_authenticated_without_login_button: bool,
	/// Path fragments that disqualify a result candidate (brand and
	/// profile pages share the grid with real results).
	pub excluded_path_patterns: Vec<String>,
	/// Workflow step templates, with `{{placeholders}}` intact.
	pub workflows: WorkflowTemplates,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.to_string(),
			credentials: None,
			result_cap: DEFAULT_RESULT_CAP,
			headless: true,
			debug: false,
			settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
			assume_authenticated_without_login_button: true,
			excluded_path_patterns: vec![
				"/brands/".to_string(),
				"/profiles/".to_string(),
				"/collections/".to_string(),
				"/pricing".to_string(),
				"/blog/".to_string(),
			],
			workflows: WorkflowTemplates::default(),
		}
	}
}

impl EngineConfig {
	/// Browse URL for a route, used by the last-resort browse strategy.
	pub fn browse_url(&self, route: RouteKind, platform: Platform) -> String {
		format!(
			"{}/browse/{}/{}",
			self.base_url,
			platform.as_str(),
			route.as_str()
		)
	}
}

/// Per-route search-surface workflows plus the login workflow.
///
/// Templates carry `{{base_url}}`, `{{platform}}`, `{{keyword}}`,
/// `{{email}}`, and `{{password}}` placeholders; callers resolve them with
/// [`resolve_steps`] before execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplates {
	pub apps_search: Vec<WorkflowStep>,
	pub flows_search: Vec<WorkflowStep>,
	pub screens_search: Vec<WorkflowStep>,
	pub login: Vec<WorkflowStep>,
}

impl WorkflowTemplates {
	pub fn search_for(&self, route: RouteKind) -> &[WorkflowStep] {
		match route {
			RouteKind::Apps => &self.apps_search,
			RouteKind::Flows => &self.flows_search,
			RouteKind::Screens => &self.screens_search,
		}
	}
}

const SEARCH_INPUT: &str = "input[type='search']";
const SEARCH_INPUT_FALLBACK: &str = "[data-testid='search-input']";
const SEARCH_INPUT_LOOSE: &str = "input[placeholder*='earch']";

fn default_search_steps(route: RouteKind) -> Vec<WorkflowStep> {
	vec![
		WorkflowStep::navigate(
			format!("{{{{base_url}}}}/search/{{{{platform}}}}/{}", route.as_str()),
			format!("open the {} search surface", route.as_str()),
		),
		WorkflowStep::wait_for(SEARCH_INPUT, "wait for the search input")
			.with_fallback(SEARCH_INPUT_FALLBACK)
			.with_fallback(SEARCH_INPUT_LOOSE),
		WorkflowStep::click(SEARCH_INPUT, "focus the search input")
			.with_fallback(SEARCH_INPUT_FALLBACK)
			.with_fallback(SEARCH_INPUT_LOOSE),
		WorkflowStep::fill(SEARCH_INPUT, "{{keyword}}", "type the keyword")
			.with_fallback(SEARCH_INPUT_FALLBACK)
			.with_fallback(SEARCH_INPUT_LOOSE),
	]
}

fn default_login_steps() -> Vec<WorkflowStep> {
	vec![
		WorkflowStep::navigate("{{base_url}}/login", "open the login page"),
		WorkflowStep::fill("input[type='email']", "{{email}}", "enter the account email")
			.with_fallback("input[name='email']"),
		WorkflowStep::fill(
			"input[type='password']",
			"{{password}}",
			"enter the account password",
		)
		.with_fallback("input[name='password']"),
		WorkflowStep::click("button[type='submit']", "submit the login form")
			.with_fallback("form button"),
		WorkflowStep::wait_for("[data-testid='account-menu']", "wait for the signed-in header")
			.with_fallback("[aria-label*='account' i]")
			.with_timeout(15_000),
	]
}

impl Default for WorkflowTemplates {
	fn default() -> Self {
		Self {
			apps_search: default_search_steps(RouteKind::Apps),
			flows_search: default_search_steps(RouteKind::Flows),
			screens_search: default_search_steps(RouteKind::Screens),
			login: default_login_steps(),
		}
	}
}

/// Substitutes `{{key}}` placeholders in one template string.
pub fn resolve_placeholders(template: &str, vars: &[(&str, &str)]) -> String {
	let mut resolved = template.to_string();
	for (key, value) in vars {
		resolved = resolved.replace(&format!("{{{{{key}}}}}"), value);
	}
	resolved
}

/// Resolves placeholders across a whole step list, in both selectors and
/// values. The executor never sees an unresolved template.
pub fn resolve_steps(steps: &[WorkflowStep], vars: &[(&str, &str)]) -> Vec<WorkflowStep> {
	steps
		.iter()
		.map(|step| {
			let mut resolved = step.clone();
			resolved.selectors = step
				.selectors
				.iter()
				.map(|selector| resolve_placeholders(selector, vars))
				.collect();
			resolved.value = step
				.value
				.as_deref()
				.map(|value| resolve_placeholders(value, vars));
			resolved
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn placeholders_resolve_in_order_given() {
		let resolved = resolve_placeholders(
			"{{base_url}}/search/{{platform}}/apps",
			&[("base_url", "https://mobbin.com"), ("platform", "ios")],
		);
		assert_eq!(resolved, "https://mobbin.com/search/ios/apps");
	}

	#[test]
	fn unknown_placeholders_are_left_intact() {
		let resolved = resolve_placeholders("{{keyword}} and {{mystery}}", &[("keyword", "banking")]);
		assert_eq!(resolved, "banking and {{mystery}}");
	}

	#[test]
	fn resolve_steps_substitutes_values_and_selectors() {
		let steps = vec![
			WorkflowStep::navigate("{{base_url}}/login", "open login"),
			WorkflowStep::fill("input[name='{{field}}']", "{{email}}", "enter email"),
		];
		let resolved = resolve_steps(
			&steps,
			&[
				("base_url", "https://mobbin.com"),
				("field", "email"),
				("email", "design@example.com"),
			],
		);

		assert_eq!(resolved[0].value.as_deref(), Some("https://mobbin.com/login"));
		assert_eq!(resolved[1].selectors[0], "input[name='email']");
		assert_eq!(resolved[1].value.as_deref(), Some("design@example.com"));
	}

	#[test]
	fn default_templates_cover_every_route() {
		let templates = WorkflowTemplates::default();
		for route in RouteKind::ALL {
			let steps = templates.search_for(route);
			assert!(!steps.is_empty());
			// The last step types the keyword placeholder.
			assert_eq!(steps.last().unwrap().value.as_deref(), Some("{{keyword}}"));
		}
		assert!(!templates.login.is_empty());
	}

	#[test]
	fn credentials_debug_redacts_password() {
		let credentials = Credentials {
			email: "design@example.com".to_string(),
			password: "hunter2".to_string(),
		};
		let rendered = format!("{credentials:?}");
		assert!(rendered.contains("design@example.com"));
		assert!(!rendered.contains("hunter2"));
	}
}
