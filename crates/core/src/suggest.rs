//! Suggestion discovery and strategy selection.
//!
//! The target site's autocomplete is unpredictable: which suggestions show
//! up, in which sections, varies by keyword and by experiment bucket. So
//! the engine reads whatever is actually on screen, classifies it, and
//! picks the best way forward instead of assuming a fixed UI.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::dom::{self, SuggestionRecord};
use crate::error::Result;
use crate::route::{Platform, RouteKind};
use crate::workflow::{WorkflowExecutor, WorkflowStep};

/// What a suggestion appears to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionKind {
	App,
	Flow,
	Screen,
	UiElement,
	TextSearch,
	General,
}

impl SuggestionKind {
	pub fn as_str(self) -> &'static str {
		match self {
			SuggestionKind::App => "app",
			SuggestionKind::Flow => "flow",
			SuggestionKind::Screen => "screen",
			SuggestionKind::UiElement => "ui-element",
			SuggestionKind::TextSearch => "text-search",
			SuggestionKind::General => "general",
		}
	}

	/// Whether this kind leads to results of the given route.
	pub fn matches_route(self, route: RouteKind) -> bool {
		matches!(
			(self, route),
			(SuggestionKind::App, RouteKind::Apps)
				| (SuggestionKind::Flow, RouteKind::Flows)
				| (SuggestionKind::Screen, RouteKind::Screens)
		)
	}
}

/// One classified autocomplete suggestion. Rebuilt on every discovery
/// call; never cached across keystrokes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
	pub text: String,
	pub kind: SuggestionKind,
	pub selector: String,
	/// In `[0, 1]`, proportional to how specifically the suggestion
	/// matched a category keyword.
	pub confidence: f64,
}

/// How to proceed after looking at the suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
	ClickSuggestion,
	TextSearch,
	FallbackBrowse,
}

impl Strategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Strategy::ClickSuggestion => "click-suggestion",
			Strategy::TextSearch => "text-search",
			Strategy::FallbackBrowse => "fallback-browse",
		}
	}
}

/// The chosen strategy plus the reasoning that picked it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDecision {
	pub strategy: Strategy,
	pub suggestion: Option<Suggestion>,
	pub reasoning: String,
}

const APP_MARKERS: &[&str] = &["app", "apps", "application"];
const FLOW_MARKERS: &[&str] = &["flow", "flows", "user flow", "journey", "onboarding"];
const SCREEN_MARKERS: &[&str] = &["screen", "screens", "page", "pages"];
const UI_ELEMENT_MARKERS: &[&str] = &[
	"button",
	"tab bar",
	"navigation",
	"menu",
	"card",
	"component",
	"icon",
	"modal",
];

fn kind_from_markers(text: &str) -> Option<SuggestionKind> {
	let matched = |markers: &[&str]| markers.iter().any(|marker| text.contains(marker));
	// App markers are substrings of nothing else; UI markers go last so
	// "tab bar screens" classifies as screens, not ui-element.
	if matched(FLOW_MARKERS) {
		Some(SuggestionKind::Flow)
	} else if matched(SCREEN_MARKERS) {
		Some(SuggestionKind::Screen)
	} else if matched(APP_MARKERS) {
		Some(SuggestionKind::App)
	} else if matched(UI_ELEMENT_MARKERS) {
		Some(SuggestionKind::UiElement)
	} else {
		None
	}
}

/// Classifies one extracted suggestion against the category keyword lists.
///
/// The dropdown section heading is the strongest signal; the suggestion's
/// own text comes second; a bare keyword echo is generic.
pub fn classify(record: &SuggestionRecord, keyword: &str) -> Suggestion {
	let text = record.text.to_lowercase();
	let section = record.section.to_lowercase();
	let keyword = keyword.to_lowercase();
	let echoes_keyword = !keyword.is_empty() && text.contains(&keyword);

	if text.starts_with("search for") || section.contains("search") {
		return Suggestion {
			text: record.text.clone(),
			kind: SuggestionKind::TextSearch,
			selector: record.selector.clone(),
			confidence: if echoes_keyword { 0.6 } else { 0.4 },
		};
	}

	let (kind, confidence) = match (kind_from_markers(&section), kind_from_markers(&text)) {
		(Some(kind), _) => (kind, if echoes_keyword { 0.95 } else { 0.85 }),
		(None, Some(kind)) => (kind, if echoes_keyword { 0.8 } else { 0.7 }),
		(None, None) if echoes_keyword => (SuggestionKind::General, 0.5),
		(None, None) => (SuggestionKind::General, 0.3),
	};

	Suggestion {
		text: record.text.clone(),
		kind,
		selector: record.selector.clone(),
		confidence,
	}
}

/// Earliest-wins maximum by confidence.
fn best_of<'a, I>(suggestions: I) -> Option<&'a Suggestion>
where
	I: Iterator<Item = &'a Suggestion>,
{
	suggestions.fold(None, |best: Option<&Suggestion>, candidate| match best {
		Some(current) if current.confidence >= candidate.confidence => Some(current),
		_ => Some(candidate),
	})
}

/// Picks a strategy for the given target route.
///
/// Tie-break order: a kind match beats raw confidence, then confidence
/// decides, then text search, then category browsing when no search
/// surface exists at all.
pub fn select_best_suggestion(
	suggestions: &[Suggestion],
	target: RouteKind,
	keyword: &str,
	search_surface_available: bool,
) -> StrategyDecision {
	if let Some(matching) = best_of(
		suggestions
			.iter()
			.filter(|suggestion| suggestion.kind.matches_route(target)),
	) {
		return StrategyDecision {
			strategy: Strategy::ClickSuggestion,
			suggestion: Some(matching.clone()),
			reasoning: format!(
				"'{}' ({}, confidence {:.2}) matches the {} route",
				matching.text,
				matching.kind.as_str(),
				matching.confidence,
				target.as_str()
			),
		};
	}

	if let Some(best) = best_of(suggestions.iter()) {
		return StrategyDecision {
			strategy: Strategy::ClickSuggestion,
			suggestion: Some(best.clone()),
			reasoning: format!(
				"no {} suggestion; '{}' ({}, confidence {:.2}) is the strongest available",
				target.as_str(),
				best.text,
				best.kind.as_str(),
				best.confidence
			),
		};
	}

	if search_surface_available {
		return StrategyDecision {
			strategy: Strategy::TextSearch,
			suggestion: None,
			reasoning: format!("no usable suggestions for '{keyword}'; running a raw text search"),
		};
	}

	StrategyDecision {
		strategy: Strategy::FallbackBrowse,
		suggestion: None,
		reasoning: format!(
			"no suggestions and no search surface; browsing the {} category directly",
			target.as_str()
		),
	}
}

/// Discovers, classifies, and acts on autocomplete suggestions.
pub struct SuggestionEngine {
	executor: WorkflowExecutor,
	config: Arc<EngineConfig>,
}

impl SuggestionEngine {
	pub fn new(executor: WorkflowExecutor, config: Arc<EngineConfig>) -> Self {
		Self { executor, config }
	}

	/// Reads the suggestions currently visible for `keyword`.
	pub async fn discover_suggestions(&self, keyword: &str) -> Result<Vec<Suggestion>> {
		let payload = self
			.executor
			.evaluate_json(dom::SUGGESTION_QUERY, "collect autocomplete suggestions")
			.await?;
		let records: Vec<SuggestionRecord> = dom::parse_records(&payload);
		let suggestions: Vec<Suggestion> = records
			.iter()
			.map(|record| classify(record, keyword))
			.collect();
		debug!(
			target: "scout",
			keyword,
			count = suggestions.len(),
			"discovered suggestions"
		);
		Ok(suggestions)
	}

	/// Whether a usable text-search input exists on the current page.
	pub async fn search_surface_available(&self) -> bool {
		match self
			.executor
			.evaluate_json(dom::SEARCH_SURFACE_QUERY, "probe for a search input")
			.await
		{
			Ok(payload) => payload["available"].as_bool().unwrap_or(false),
			Err(_) => false,
		}
	}

	/// Executes the chosen strategy. Returns `false` instead of failing so
	/// the route executor can try the next strategy in line.
	pub async fn execute_strategy(
		&self,
		decision: &StrategyDecision,
		route: RouteKind,
		keyword: &str,
		platform: Platform,
	) -> bool {
		let steps = match decision.strategy {
			Strategy::ClickSuggestion => {
				let Some(suggestion) = &decision.suggestion else {
					warn!(target: "scout", "click strategy without a suggestion");
					return false;
				};
				vec![WorkflowStep::click(
					suggestion.selector.clone(),
					format!("click suggestion '{}'", suggestion.text),
				)]
			}
			Strategy::TextSearch => vec![
				WorkflowStep::fill(
					"input[type='search']",
					keyword,
					"retype the keyword for a raw search",
				)
				.with_fallback("[data-testid='search-input']")
				.with_fallback("input[placeholder*='earch']"),
				WorkflowStep::press_key("Enter", "submit the raw search"),
			],
			Strategy::FallbackBrowse => vec![WorkflowStep::navigate(
				self.config.browse_url(route, platform),
				format!("browse the {} category", route.as_str()),
			)],
		};

		match self.executor.run(&steps).await {
			Ok(()) => true,
			Err(error) => {
				warn!(
					target: "scout",
					strategy = decision.strategy.as_str(),
					%error,
					"strategy execution failed"
				);
				false
			}
		}
	}
}
