use std::path::Path;

use regex::Regex;

use crate::CharmapError;
use crate::CharmapResult;
use crate::PatternKind;

/// Default include pattern: YAML files.
pub const DEFAULT_INCLUDE_PATTERN: &str = r".*\.ya?ml$";

/// Default exclude pattern: the `.git` directory at the root.
pub const DEFAULT_EXCLUDE_PATTERN: &str = r"^\.git(/|$)";

/// Include/exclude regular expressions deciding which files are processed.
///
/// Excludes always take precedence. With no include patterns every path that
/// survives the excludes is accepted.
///
/// ```rust
/// use charmap_core::FileFilter;
///
/// let filter = FileFilter::new(&[r".*\.yaml$"], &[r"^\.git(/|$)"]).unwrap();
/// assert!(filter.matches("deploy/app.yaml"));
/// assert!(!filter.matches(".git/config.yaml"));
/// assert!(!filter.matches("notes.txt"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
	includes: Vec<Regex>,
	excludes: Vec<Regex>,
}

impl FileFilter {
	/// Compile both pattern lists. The first pattern that fails to compile is
	/// reported along with the list it came from.
	pub fn new<I, E>(includes: &[I], excludes: &[E]) -> CharmapResult<Self>
	where
		I: AsRef<str>,
		E: AsRef<str>,
	{
		Ok(Self {
			includes: compile_all(includes, PatternKind::Include)?,
			excludes: compile_all(excludes, PatternKind::Exclude)?,
		})
	}

	/// The filter used when no patterns are configured: YAML files outside of
	/// `.git`.
	pub fn with_defaults() -> CharmapResult<Self> {
		Self::new(&[DEFAULT_INCLUDE_PATTERN], &[DEFAULT_EXCLUDE_PATTERN])
	}

	pub fn matches(&self, path: &str) -> bool {
		if self.excludes.iter().any(|rx| rx.is_match(path)) {
			return false;
		}

		self.includes.is_empty() || self.includes.iter().any(|rx| rx.is_match(path))
	}

	/// Match a filesystem path relative to `root`. Components are joined with
	/// `/` on every platform.
	pub fn matches_relative(&self, root: &Path, path: &Path) -> bool {
		self.matches(&relative_key(root, path))
	}

	pub fn include_patterns(&self) -> Vec<&str> {
		self.includes.iter().map(Regex::as_str).collect()
	}

	pub fn exclude_patterns(&self) -> Vec<&str> {
		self.excludes.iter().map(Regex::as_str).collect()
	}
}

fn compile_all<P: AsRef<str>>(patterns: &[P], kind: PatternKind) -> CharmapResult<Vec<Regex>> {
	patterns
		.iter()
		.map(|pattern| {
			let pattern = pattern.as_ref();
			Regex::new(pattern).map_err(|e| {
				CharmapError::InvalidPattern {
					kind,
					pattern: pattern.to_string(),
					reason: e.to_string(),
				}
			})
		})
		.collect()
}

/// The `/`-separated form of `path` relative to `root`, used as the string
/// the filter patterns run against.
pub fn relative_key(root: &Path, path: &Path) -> String {
	let relative = path.strip_prefix(root).unwrap_or(path);
	let parts: Vec<_> = relative
		.components()
		.map(|component| component.as_os_str().to_string_lossy())
		.collect();
	parts.join("/")
}
