//! Structured page queries and their typed records.
//!
//! Every piece of information the engine pulls out of the live page goes
//! through one of these query definitions: a script that reduces the DOM
//! to plain JSON, paired with a serde record the result parses into. When
//! the target site's markup changes, these definitions are the only thing
//! that needs updating.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One visible autocomplete suggestion, as extracted from the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
	pub text: String,
	/// Selector that clicks this suggestion.
	pub selector: String,
	/// Heading of the dropdown section the suggestion sits under, if any.
	#[serde(default)]
	pub section: String,
}

/// One clickable result candidate in the results grid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCandidate {
	pub selector: String,
	#[serde(default)]
	pub href: Option<String>,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub subtitle: Option<String>,
}

/// Login-state probe. `login_visible` is the explicit logged-out
/// indicator and is checked before `account_visible`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthProbe {
	#[serde(default)]
	pub login_visible: bool,
	#[serde(default)]
	pub account_visible: bool,
}

/// Collects visible autocomplete suggestions with per-item selectors and
/// the section heading each sits under.
pub const SUGGESTION_QUERY: &str = r#"
(() => {
	const options = Array.from(document.querySelectorAll("[role='listbox'] [role='option'], [data-suggestion], .autocomplete-item"));
	return JSON.stringify(options.slice(0, 20).map((el, i) => {
		el.setAttribute('data-scout-idx', String(i));
		const section = el.closest('[role="group"]');
		const heading = section ? section.querySelector('[role="presentation"], h3, .group-label') : null;
		return {
			text: (el.textContent || '').trim(),
			selector: "[data-scout-idx='" + i + "']",
			section: heading ? (heading.textContent || '').trim() : ''
		};
	}));
})()
"#;

/// Collects result-grid candidates with their link targets.
pub const RESULT_CANDIDATE_QUERY: &str = r#"
(() => {
	const cards = Array.from(document.querySelectorAll("main a[href], [data-results] a[href], .results-grid a[href]"));
	return JSON.stringify(cards.slice(0, 40).map((el, i) => {
		el.setAttribute('data-scout-result', String(i));
		const title = el.querySelector('h2, h3, [data-title]');
		const subtitle = el.querySelector('p, [data-subtitle]');
		return {
			selector: "[data-scout-result='" + i + "']",
			href: el.getAttribute('href'),
			title: title ? (title.textContent || '').trim() : (el.getAttribute('aria-label') || '').trim(),
			subtitle: subtitle ? (subtitle.textContent || '').trim() : ''
		};
	}));
})()
"#;

/// Probes for the explicit logged-out and logged-in indicators.
pub const AUTH_PROBE_QUERY: &str = r#"
(() => {
	const visible = (el) => el && el.getClientRects().length > 0;
	const login = Array.from(document.querySelectorAll("a, button"))
		.find((el) => visible(el) && /\b(log in|sign in)\b/i.test(el.textContent || ''));
	const account = document.querySelector("[data-testid='account-menu'], [aria-label*='account' i], img[alt*='avatar' i]");
	return JSON.stringify({ loginVisible: !!login, accountVisible: visible(account) });
})()
"#;

/// Detects whether a usable text-search input exists on the page.
pub const SEARCH_SURFACE_QUERY: &str = r#"
(() => {
	const input = document.querySelector("input[type='search'], input[placeholder*='earch'], [data-testid='search-input']");
	return JSON.stringify({ available: !!(input && input.getClientRects().length > 0) });
})()
"#;

/// The current page address.
pub const CURRENT_URL_QUERY: &str = "location.href";

/// Canonical address of an open result overlay: its share/permalink
/// control when present, the page address otherwise (the site rewrites
/// the address bar while the overlay is open).
pub const MODAL_URL_QUERY: &str = r#"
(() => {
	const dialog = document.querySelector("[role='dialog'], .modal[open], [data-overlay]");
	if (dialog) {
		const share = dialog.querySelector("a[href*='/screens/'], [data-share-url]");
		if (share) {
			return share.getAttribute('data-share-url') || share.href;
		}
	}
	return location.href;
})()
"#;

/// Selectors that match an open result overlay.
pub const MODAL_SELECTOR: &str = "[role='dialog']";
/// Fallback overlay selector for older markup.
pub const MODAL_SELECTOR_FALLBACK: &str = "[data-overlay]";

/// Parses an extraction payload into typed records.
///
/// The payload is expected to be a JSON array; entries that fail to parse
/// are skipped individually, so one odd element does not discard the rest
/// of the page.
pub fn parse_records<T: DeserializeOwned>(value: &Value) -> Vec<T> {
	let Some(items) = value.as_array() else {
		return Vec::new();
	};
	items
		.iter()
		.filter_map(|item| serde_json::from_value(item.clone()).ok())
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn parse_records_skips_bad_entries() {
		let payload = json!([
			{"text": "banking apps", "selector": "[data-scout-idx='0']", "section": "Apps"},
			{"unrelated": true},
			{"text": "banking", "selector": "[data-scout-idx='2']"}
		]);

		let records: Vec<SuggestionRecord> = parse_records(&payload);
		assert_eq!(records.len(), 2);
		assert_eq!(records[0].section, "Apps");
		assert_eq!(records[1].section, "");
	}

	#[test]
	fn parse_records_tolerates_non_arrays() {
		let records: Vec<ResultCandidate> = parse_records(&json!({}));
		assert!(records.is_empty());
		let records: Vec<ResultCandidate> = parse_records(&json!("oops"));
		assert!(records.is_empty());
	}

	#[test]
	fn auth_probe_defaults_to_logged_out_signals_absent() {
		let probe: AuthProbe = serde_json::from_value(json!({})).unwrap();
		assert!(!probe.login_visible);
		assert!(!probe.account_visible);

		let probe: AuthProbe =
			serde_json::from_value(json!({"loginVisible": true, "accountVisible": false})).unwrap();
		assert!(probe.login_visible);
	}
}
