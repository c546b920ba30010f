//! Constraint extraction for the external import feed.
//!
//! Releases arrive from the hub as JSON records whose version information
//! lives in free text ("Updated for SPT 3.8") or in a loosely formatted tag.
//! This module turns those into a validated constraint string, or nothing;
//! the caller stores `None` and a moderator fixes the listing by hand.
//!
//! Rules, in the order they are applied to each version-like mention:
//!
//! - mentions are found left to right, case-insensitively, with `SPT` and `v`
//!   prefixes accepted;
//! - numerically implausible mentions (a component of 1000 or more, or a
//!   major of 0) are discarded before touching the catalog;
//! - a full `MAJOR.MINOR.PATCH` that exists in the catalog becomes the exact
//!   constraint;
//! - a `MAJOR.MINOR` (or `.x` suffixed) mention whose series exists in the
//!   catalog becomes `~MAJOR.MINOR.0`;
//! - anything else is skipped and scanning continues.

use std::sync::OnceLock;

use regex::Regex;

use crate::version::SptVersion;
use crate::version::Constraint;

fn mention_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| {
		Regex::new(r"(?i)\b(?:spt\s*v?|v)?(\d+)\.(\d+)(?:\.(\d+|x))?\b")
			.expect("hardcoded pattern compiles")
	})
}

/// The big-number cutoff: build numbers, years and similar noise are never
/// engine versions.
const PLAUSIBLE_COMPONENT_MAX: u32 = 999;

fn plausible(component: &str) -> Option<u32> {
	let value = component.parse::<u32>().ok()?;
	(value <= PLAUSIBLE_COMPONENT_MAX).then_some(value)
}

fn series_exists(major: u32, minor: u32, catalog: &[String]) -> bool {
	catalog.iter()
		.filter_map(|s| SptVersion::parse(s).ok())
		.any(|v| v.major() == major && v.minor() == minor)
}

/// Scan free text for a version mention and turn the first one that validates
/// against the catalog into a constraint string.
pub fn extract_constraint_from_text(text: &str, catalog: &[String]) -> Option<String> {
	for capture in mention_pattern().captures_iter(text) {
		let whole = capture.get(0).expect("group 0 always present");

		/* `3.8.0.1` must not pass as a mention of `3.8.0` */
		let tail = &text[whole.end()..];
		let mut tail_chars = tail.chars();
		if tail_chars.next() == Some('.') && tail_chars.next().is_some_and(|c| c.is_ascii_digit()) {
			continue;
		}

		let Some(major) = plausible(&capture[1]) else { continue };
		let Some(minor) = plausible(&capture[2]) else { continue };
		if major == 0 {
			/* only the sentinel lives at major zero */
			continue;
		}

		match capture.get(3).map(|m| m.as_str()) {
			Some(patch) if !patch.eq_ignore_ascii_case("x") => {
				let Some(patch) = plausible(patch) else { continue };
				let exact = format!("{major}.{minor}.{patch}");
				if catalog.iter().any(|s| *s == exact) {
					return Some(exact);
				}
			},
			/* `.x` suffixed or series-only mention */
			_ => {
				if series_exists(major, minor, catalog) {
					return Some(format!("~{major}.{minor}.0"));
				}
			},
		}
	}
	None
}

/// Re-validate an externally supplied constraint (e.g. an import tag).
///
/// A parseable constraint that matches at least one catalog version passes
/// through unchanged. An exact version missing from the catalog degrades to
/// its `~MAJOR.MINOR.0` series when that series exists. Everything else is
/// rejected.
pub fn validate_constraint(constraint: &str, catalog: &[String]) -> Option<String> {
	let trimmed = constraint.trim();
	if trimmed.is_empty() {
		return None;
	}

	if let Ok(parsed) = Constraint::parse(trimmed) {
		let resolvable = catalog.iter()
			.filter_map(|s| SptVersion::parse(s).ok())
			.any(|v| parsed.matches(&v));
		if resolvable {
			return Some(trimmed.to_string());
		}
		if let Some(exact) = parsed.as_exact() {
			if series_exists(exact.major(), exact.minor(), catalog) {
				return Some(format!("~{}.{}.0", exact.major(), exact.minor()));
			}
			return None;
		}
		return None;
	}

	/* not constraint grammar; maybe a bare series like `3.8` or `3.8.x` */
	let normalized = normalize_version_string(trimmed)?;
	let mut parts = normalized.split('.');
	let major = plausible(parts.next()?)?;
	let minor = plausible(parts.next()?)?;
	series_exists(major, minor, catalog).then(|| format!("~{major}.{minor}.0"))
}

/// Normalize a loose version string to `MAJOR.MINOR[.PATCH]` form.
///
/// Strips a trailing `.x`/`.X` segment down to the series. Rejects version
/// prefixes (`v3.8`), wrong segment counts, and non-numeric segments.
pub fn normalize_version_string(s: &str) -> Option<String> {
	let segments = s.split('.').collect::<Vec<_>>();
	if segments.len() < 2 || segments.len() > 3 {
		return None;
	}

	let numeric = |seg: &str| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit());

	if !numeric(segments[0]) || !numeric(segments[1]) {
		return None;
	}
	match segments.as_slice() {
		[major, minor] => Some(format!("{major}.{minor}")),
		[major, minor, last] if matches!(*last, "x" | "X") => Some(format!("{major}.{minor}")),
		[major, minor, patch] if numeric(patch) => Some(format!("{major}.{minor}.{patch}")),
		_ => None,
	}
}

/// One release record from the hub's JSON feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubRelease {
	pub title: String,
	pub tag: Option<String>,
	pub description: Option<String>,
}

impl HubRelease {
	pub fn read_from_json(v: &serde_json::Value) -> crate::Result<Self> {
		use crate::Error::Parse;
		let obj = v.as_object().ok_or_else(|| Parse("release record is not an object".to_string()))?;
		Ok(HubRelease {
			title: {
				obj.get("title")
					.ok_or_else(|| Parse("release record has no title field".to_string()))?
					.as_str().ok_or_else(|| Parse("title must be a string".to_string()))?.to_string()
			},
			tag: obj.get("tag").and_then(|t| t.as_str().map(|s| s.to_string())),
			description: obj.get("description").and_then(|d| d.as_str().map(|s| s.to_string())),
		})
	}

	/// The constraint to store for this release, if any part of the record
	/// yields one. The tag is the most deliberate signal so it wins; free
	/// text is the fallback.
	pub fn constraint(&self, catalog: &[String]) -> Option<String> {
		if let Some(tag) = &self.tag {
			if let Some(constraint) = validate_constraint(tag, catalog) {
				return Some(constraint);
			}
		}
		extract_constraint_from_text(&self.title, catalog)
			.or_else(|| self.description.as_deref().and_then(|d| extract_constraint_from_text(d, catalog)))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn catalog() -> Vec<String> {
		["3.7.0", "3.7.1", "3.8.0", "3.8.1", "3.9.0"].iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn series_mention_becomes_tilde() {
		assert_eq!(extract_constraint_from_text("Updated for SPT 3.8", &catalog()), Some("~3.8.0".to_string()));
		assert_eq!(extract_constraint_from_text("works on 3.8.x", &catalog()), Some("~3.8.0".to_string()));
		assert_eq!(extract_constraint_from_text("SPT3.9 compatible", &catalog()), Some("~3.9.0".to_string()));
	}

	#[test]
	fn full_mention_in_catalog_is_exact() {
		assert_eq!(extract_constraint_from_text("Updated for SPT 3.8.1", &catalog()), Some("3.8.1".to_string()));
		assert_eq!(extract_constraint_from_text("rebuilt against v3.9.0", &catalog()), Some("3.9.0".to_string()));
	}

	#[test]
	fn no_mention_yields_nothing() {
		assert_eq!(extract_constraint_from_text("no version mentioned", &catalog()), None);
		assert_eq!(extract_constraint_from_text("", &catalog()), None);
	}

	#[test]
	fn implausible_mentions_are_skipped() {
		assert_eq!(extract_constraint_from_text("the 2024.1 rework", &catalog()), None);
		assert_eq!(extract_constraint_from_text("0.8 era save", &catalog()), None);
		/* a later plausible mention still wins */
		assert_eq!(extract_constraint_from_text("build 2024.1 for SPT 3.8", &catalog()), Some("~3.8.0".to_string()));
	}

	#[test]
	fn first_validating_mention_wins() {
		assert_eq!(extract_constraint_from_text("ported from 2.9 to 3.8.1", &catalog()), Some("3.8.1".to_string()));
	}

	#[test]
	fn four_segment_numbers_are_not_mentions() {
		assert_eq!(extract_constraint_from_text("installer 3.8.0.1234", &catalog()), None);
	}

	#[test]
	fn valid_constraint_passes_through() {
		assert_eq!(validate_constraint("~3.8.0", &catalog()), Some("~3.8.0".to_string()));
		assert_eq!(validate_constraint("3.8.1", &catalog()), Some("3.8.1".to_string()));
		assert_eq!(validate_constraint(">=3.7.0 <3.9.0", &catalog()), Some(">=3.7.0 <3.9.0".to_string()));
	}

	#[test]
	fn missing_exact_degrades_to_series() {
		assert_eq!(validate_constraint("3.7.99", &catalog()), Some("~3.7.0".to_string()));
		assert_eq!(validate_constraint("2.0.0", &catalog()), None);
	}

	#[test]
	fn unresolvable_ranges_are_rejected() {
		assert_eq!(validate_constraint("^4.0.0", &catalog()), None);
		assert_eq!(validate_constraint("", &catalog()), None);
		assert_eq!(validate_constraint("garbage", &catalog()), None);
	}

	#[test]
	fn bare_series_tag_validates() {
		assert_eq!(validate_constraint("3.8", &catalog()), Some("~3.8.0".to_string()));
		/* wildcard grammar is already a valid constraint, so it passes through */
		assert_eq!(validate_constraint("3.8.x", &catalog()), Some("3.8.x".to_string()));
	}

	#[test]
	fn normalize_strips_wildcard_segment() {
		assert_eq!(normalize_version_string("3.8.x"), Some("3.8".to_string()));
		assert_eq!(normalize_version_string("3.8.X"), Some("3.8".to_string()));
		assert_eq!(normalize_version_string("3.8"), Some("3.8".to_string()));
		assert_eq!(normalize_version_string("3.8.1"), Some("3.8.1".to_string()));
	}

	#[test]
	fn normalize_rejects_prefixes_and_bad_shapes() {
		assert_eq!(normalize_version_string("v3.8"), None);
		assert_eq!(normalize_version_string("3"), None);
		assert_eq!(normalize_version_string("3.8.0.1"), None);
		assert_eq!(normalize_version_string("3.eight"), None);
	}

	#[test]
	fn hub_release_reads_from_json_and_resolves() {
		let value = serde_json::json!({
			"title": "SAIN 2.1.5",
			"tag": "3.8.x",
			"description": "Updated for SPT 3.8"
		});
		let release = HubRelease::read_from_json(&value).unwrap();
		assert_eq!(release.constraint(&catalog()), Some("3.8.x".to_string()));

		let untagged = serde_json::json!({ "title": "Updated for SPT 3.8.1" });
		let release = HubRelease::read_from_json(&untagged).unwrap();
		assert_eq!(release.tag, None);
		assert_eq!(release.constraint(&catalog()), Some("3.8.1".to_string()));

		assert!(HubRelease::read_from_json(&serde_json::json!(["not", "an", "object"])).is_err());
	}
}
