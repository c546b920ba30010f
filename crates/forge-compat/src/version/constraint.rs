//! Textual version range constraints.
//!
//! Mods declare engine compatibility (and dependencies on other mods) with a
//! free-text range expression. The supported grammar:
//!
//! | Syntax      | Meaning                                               |
//! |-------------|-------------------------------------------------------|
//! | `3.8.1`     | exactly that version                                  |
//! | `^3.8.0`    | same major (same minor while major is 0), >= given    |
//! | `~3.8.0`    | same major.minor, patch >= given                      |
//! | `>=3.8.0`   | comparison; also `<=`, `>`, `<`, `=`                  |
//! | `3.8.x`     | wildcard segment; `3.8.*` and `3.x` work too          |
//! | `>=3.7.0 <3.9.0` | space separated clauses, all must hold           |
//!
//! An empty expression matches nothing: an artifact with no declared
//! constraint has no resolved engine versions.
//!
//! Resolution-time callers want failure to mean "matches nothing" rather than
//! an error, so they go through [`matches_lenient`]; validation-time callers
//! (user submitted constraints, the importer) use [`Constraint::parse`] and
//! get the [`Parse`](crate::Error::Parse) error.

use serde::{Serialize, Deserialize};

use super::SptVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
	Ge,
	Le,
	Gt,
	Lt,
	Eq,
}

/// One clause of a constraint expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
	Exact(SptVersion),
	Caret(SptVersion),
	Tilde(SptVersion),
	Compare(Comparator, SptVersion),
	/// `3.8.x` / `3.8.*` style. `minor` of `None` covers `3.x`.
	Wildcard { major: u32, minor: Option<u32> },
}

impl Clause {
	pub fn matches(&self, version: &SptVersion) -> bool {
		match self {
			Clause::Exact(v) => version == v,
			Clause::Caret(v) => {
				if version < v { return false }
				if v.major() > 0 {
					version.major() == v.major()
				} else if v.minor() > 0 {
					version.major() == 0 && version.minor() == v.minor()
				} else {
					/* ^0.0.z permits only that patch */
					version.major() == 0 && version.minor() == 0 && version.patch() == v.patch()
				}
			},
			Clause::Tilde(v) => {
				version.major() == v.major() && version.minor() == v.minor() && version >= v
			},
			Clause::Compare(op, v) => {
				match op {
					Comparator::Ge => version >= v,
					Comparator::Le => version <= v,
					Comparator::Gt => version > v,
					Comparator::Lt => version < v,
					Comparator::Eq => version == v,
				}
			},
			Clause::Wildcard { major, minor } => {
				version.major() == *major && minor.map_or(true, |m| version.minor() == m)
			},
		}
	}
}

/// A parsed constraint expression: the conjunction of its clauses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraint {
	clauses: Vec<Clause>,
}

fn wildcard_segment(s: &str) -> bool {
	matches!(s, "x" | "X" | "*")
}

fn parse_wildcard(token: &str) -> crate::Result<Clause> {
	use crate::Error::Parse;
	let segments = token.split('.').collect::<Vec<_>>();
	match segments.as_slice() {
		[major, tail] if wildcard_segment(tail) => Ok(Clause::Wildcard {
			major: numeric_segment(major, token)?,
			minor: None,
		}),
		[major, minor, tail] if wildcard_segment(tail) => Ok(Clause::Wildcard {
			major: numeric_segment(major, token)?,
			minor: Some(numeric_segment(minor, token)?),
		}),
		_ => Err(Parse(format!("`{token}` is not a recognised wildcard clause"))),
	}
}

fn numeric_segment(s: &str, token: &str) -> crate::Result<u32> {
	use crate::Error::Parse;
	if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
		return Err(Parse(format!("`{token}` has a non-numeric segment before the wildcard")));
	}
	s.parse::<u32>().map_err(|_| Parse(format!("`{token}` has an out of range segment")))
}

impl Constraint {
	/// Parse a constraint expression.
	///
	/// An empty (or all-whitespace) expression is *valid* and yields a
	/// constraint that matches nothing.
	///
	/// # Errors
	/// Returns [`Parse`](crate::Error::Parse) when a clause doesn't fit the
	/// grammar, including a wildcard combined with a comparison operator
	/// (`>=3.8.x`), which is deliberately unsupported.
	pub fn parse(expression: impl AsRef<str>) -> crate::Result<Self> {
		use crate::Error::Parse;
		let mut clauses = Vec::new();

		for token in expression.as_ref().split_whitespace() {
			let clause = if let Some(rest) = token.strip_prefix(">=") {
				Clause::Compare(Comparator::Ge, comparison_operand(rest, token)?)
			} else if let Some(rest) = token.strip_prefix("<=") {
				Clause::Compare(Comparator::Le, comparison_operand(rest, token)?)
			} else if let Some(rest) = token.strip_prefix('>') {
				Clause::Compare(Comparator::Gt, comparison_operand(rest, token)?)
			} else if let Some(rest) = token.strip_prefix('<') {
				Clause::Compare(Comparator::Lt, comparison_operand(rest, token)?)
			} else if let Some(rest) = token.strip_prefix('=') {
				Clause::Compare(Comparator::Eq, comparison_operand(rest, token)?)
			} else if let Some(rest) = token.strip_prefix('^') {
				Clause::Caret(SptVersion::parse(rest).map_err(|e| Parse(format!("bad caret clause `{token}`: {e}")))?)
			} else if let Some(rest) = token.strip_prefix('~') {
				Clause::Tilde(SptVersion::parse(rest).map_err(|e| Parse(format!("bad tilde clause `{token}`: {e}")))?)
			} else if let Ok(version) = SptVersion::parse(token) {
				Clause::Exact(version)
			} else if token.contains(['x', 'X', '*']) {
				parse_wildcard(token)?
			} else {
				return Err(Parse(format!("`{token}` is not a recognised constraint clause")));
			};
			clauses.push(clause);
		}

		Ok(Constraint { clauses })
	}

	/// Whether `version` satisfies every clause.
	///
	/// A constraint with no clauses matches nothing.
	pub fn matches(&self, version: &SptVersion) -> bool {
		!self.clauses.is_empty() && self.clauses.iter().all(|c| c.matches(version))
	}

	pub fn clauses(&self) -> &[Clause] { &self.clauses }

	pub fn is_empty(&self) -> bool { self.clauses.is_empty() }

	/// Whether this is a single bare `MAJOR.MINOR.PATCH` with no operator.
	pub fn as_exact(&self) -> Option<&SptVersion> {
		match self.clauses.as_slice() {
			[Clause::Exact(v)] => Some(v),
			_ => None,
		}
	}
}

fn comparison_operand(rest: &str, token: &str) -> crate::Result<SptVersion> {
	use crate::Error::Parse;
	if rest.contains(['x', 'X', '*']) {
		/* underspecified upstream; treated as a parse failure rather than guessed at */
		return Err(Parse(format!("`{token}` combines a wildcard with a comparison operator")));
	}
	SptVersion::parse(rest).map_err(|e| Parse(format!("bad comparison clause `{token}`: {e}")))
}

/// Resolution-path matching: fails closed.
///
/// Returns false whenever the version or the constraint doesn't parse, so a
/// malformed row can never fail an unrelated write.
pub fn matches_lenient(version: &str, expression: &str) -> bool {
	let version = match SptVersion::parse(version) {
		Ok(v) => v,
		Err(_) => return false,
	};
	match Constraint::parse(expression) {
		Ok(c) => c.matches(&version),
		Err(_) => false,
	}
}
