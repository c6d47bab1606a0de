//! Search orchestration engine for a gated design-reference library.
//!
//! Given a handful of keywords and a content route (apps, flows, screens),
//! the engine drives a remote browser through the automation tool to find
//! representative result links. The moving parts, bottom up:
//!
//! - [`workflow`] turns declarative step lists into tool calls.
//! - [`dom`] holds the structured page queries and their typed records.
//! - [`suggest`] classifies live autocomplete suggestions and picks a
//!   search strategy.
//! - [`capture`] clicks into results and collects clean, deduplicated
//!   URLs.
//! - [`route`] runs one (route, keyword) search end to end and never lets
//!   one failure poison its siblings.
//! - [`search`] sequences authentication, analysis, the per-route
//!   searches, and curation inside one exclusive browser session.

pub mod capture;
pub mod config;
pub mod dom;
pub mod error;
pub mod route;
pub mod search;
pub mod suggest;
pub mod testing;
pub mod workflow;

pub use capture::{CaptureOutcome, CapturePattern, CapturedUrl, UrlCaptureManager};
pub use config::{
	Credentials, EngineConfig, WorkflowTemplates, resolve_placeholders, resolve_steps,
};
pub use error::{Error, Result};
pub use route::{
	ComprehensiveRunResult, Platform, RouteExecutionResult, RouteExecutor, RouteKind,
};
pub use search::{
	PhaseStatus, ProgressiveSearchEngine, SearchPhase, SearchReport, SearchRequest,
};
pub use suggest::{Strategy, StrategyDecision, Suggestion, SuggestionEngine, SuggestionKind};
pub use workflow::{StepAction, WorkflowExecutor, WorkflowStep};
