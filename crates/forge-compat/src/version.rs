//! Structs representing SPT version numbers.
//!
//! # SPT Versioning Numbers
//!
//! The engine publishes strict semantic versions: `MAJOR`.`MINOR`.`PATCH` with
//! optional pre-release labels (`3.8.0`, `3.9.0-beta.1`). Mods are free to use
//! arbitrary strings for their own versions, so anything reaching
//! [`SptVersion::parse`] from a mod's version field may legitimately fail; the
//! resolvers treat such versions as matching nothing.
//!
//! # Ordering
//!
//! `(major, minor, patch)` compare numerically. A version carrying labels sorts
//! *before* the same bare numeric version (pre-release < release); two labeled
//! versions compare their label sequences lexicographically.

use serde::de::Error as _;

/// A single engine version.
///
/// # Format
///
/// `MAJOR`.`MINOR`.`PATCH`[`-label`[.`label`...]]
///
/// For example: `3.8.1` or `3.9.0-beta.2`.
///
/// Immutable once constructed; the only way in is [`SptVersion::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SptVersion {
	major: u32,
	minor: u32,
	patch: u32,
	labels: Vec<String>,
}

fn numeric_component(s: &str, what: &str) -> crate::Result<u32> {
	use crate::Error::InvalidVersion;
	/* str::parse accepts a leading '+' which we must not */
	if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
		return Err(InvalidVersion(format!("{what} component `{s}` is not an unsigned integer")));
	}
	s.parse::<u32>().map_err(|_| InvalidVersion(format!("{what} component `{s}` is out of range")))
}

impl SptVersion {
	/// Create a new [`SptVersion`] from a version string.
	///
	/// # Errors
	/// Returns [`InvalidVersion`](crate::Error::InvalidVersion) in the following cases.
	/// - Wrong number of numeric components (must be exactly three).
	/// - A component that isn't a plain unsigned integer.
	/// - An empty pre-release label (`1.0.0-` or `1.0.0-a..b`).
	pub fn parse(s: impl AsRef<str>) -> crate::Result<Self> {
		use crate::Error::InvalidVersion;
		let s = s.as_ref();

		let (numbers, labels) = match s.split_once('-') {
			Some((head, rest)) => (head, Some(rest)),
			None => (s, None),
		};

		let components = numbers.split('.').collect::<Vec<_>>();
		if components.len() != 3 {
			return Err(InvalidVersion(format!("`{s}` does not have exactly three numeric components")));
		}

		let major = numeric_component(components[0], "major")?;
		let minor = numeric_component(components[1], "minor")?;
		let patch = numeric_component(components[2], "patch")?;

		let labels = match labels {
			None => Vec::new(),
			Some(rest) => {
				let mut out = Vec::new();
				for label in rest.split('.') {
					if label.is_empty() {
						return Err(InvalidVersion(format!("`{s}` contains an empty pre-release label")));
					}
					out.push(label.to_string());
				}
				out
			}
		};

		Ok(SptVersion { major, minor, patch, labels })
	}

	pub fn major(&self) -> u32 { self.major }
	pub fn minor(&self) -> u32 { self.minor }
	pub fn patch(&self) -> u32 { self.patch }
	pub fn labels(&self) -> &[String] { &self.labels }
	pub fn is_prerelease(&self) -> bool { !self.labels.is_empty() }

	/// Whether this is the `0.0.0` placeholder the catalog keeps for historical
	/// rows. Never a valid resolution target.
	pub fn is_zero(&self) -> bool {
		self.major == 0 && self.minor == 0 && self.patch == 0 && self.labels.is_empty()
	}
}

impl TryFrom<&str> for SptVersion {
	type Error = crate::Error;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl std::fmt::Display for SptVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
		if !self.labels.is_empty() {
			write!(f, "-{}", self.labels.join("."))?;
		}
		Ok(())
	}
}

impl Ord for SptVersion {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		use std::cmp::Ordering;

		match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
			Ordering::Equal => {},
			c => return c,
		}

		/* pre-release sorts before the bare release of the same number */
		match (self.labels.is_empty(), other.labels.is_empty()) {
			(true, true) => Ordering::Equal,
			(true, false) => Ordering::Greater,
			(false, true) => Ordering::Less,
			(false, false) => self.labels.cmp(&other.labels),
		}
	}
}

impl PartialOrd for SptVersion {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

impl serde::Serialize for SptVersion {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> serde::Deserialize<'de> for SptVersion {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		SptVersion::parse(&s).map_err(D::Error::custom)
	}
}

pub mod constraint;
pub use constraint::Constraint;

#[cfg(test)]
mod test {
	use super::*;

	#[test] fn spt_version_compares_as_ints() { assert!(SptVersion::parse("3.9.0").unwrap() < SptVersion::parse("3.10.0").unwrap()) }
	#[test] fn spt_version_identical_are_eq() { assert!(SptVersion::parse("3.8.1").unwrap() == SptVersion::parse("3.8.1").unwrap()) }
	#[test] fn spt_version_higher_patch_is_gt() { assert!(SptVersion::parse("3.8.1").unwrap() < SptVersion::parse("3.8.2").unwrap()) }
	#[test] fn spt_version_prerelease_sorts_before_release() { assert!(SptVersion::parse("3.8.0-beta").unwrap() < SptVersion::parse("3.8.0").unwrap()) }
	#[test] fn spt_version_labels_compare_lexicographically() { assert!(SptVersion::parse("3.8.0-alpha").unwrap() < SptVersion::parse("3.8.0-beta").unwrap()) }
	#[test] fn spt_version_display_round_trips() { assert_eq!(SptVersion::parse("3.9.0-beta.2").unwrap().to_string(), "3.9.0-beta.2") }
	#[test] fn spt_version_zero_is_sentinel() { assert!(SptVersion::parse("0.0.0").unwrap().is_zero()) }

	#[test]
	fn spt_version_rejects_malformed_input() {
		assert!(SptVersion::parse("3.8").is_err());
		assert!(SptVersion::parse("3.8.0.1").is_err());
		assert!(SptVersion::parse("v3.8.0").is_err());
		assert!(SptVersion::parse("3.+8.0").is_err());
		assert!(SptVersion::parse("3.8.x").is_err());
		assert!(SptVersion::parse("3.8.0-").is_err());
		assert!(SptVersion::parse("").is_err());
	}

	#[test]
	fn spt_version_order_is_total() {
		let versions = ["3.7.0", "3.8.0-beta", "3.8.0", "3.8.1", "3.9.0"]
			.iter()
			.map(|s| SptVersion::parse(s).unwrap())
			.collect::<Vec<_>>();
		for a in &versions {
			for b in &versions {
				assert_eq!(a.cmp(b), b.cmp(a).reverse());
				for c in &versions {
					if a < b && b < c { assert!(a < c); }
				}
			}
		}
	}
}
