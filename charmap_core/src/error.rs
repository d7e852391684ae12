use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Which side of a [`FileFilter`](crate::FileFilter) a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
	Include,
	Exclude,
}

impl fmt::Display for PatternKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Include => f.write_str("include"),
			Self::Exclude => f.write_str("exclude"),
		}
	}
}

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum CharmapError {
	#[error(transparent)]
	#[diagnostic(code(charmap::io_error))]
	Io(#[from] std::io::Error),

	#[error("invalid {kind} pattern `{pattern}`: {reason}")]
	#[diagnostic(
		code(charmap::invalid_pattern),
		help("patterns are regular expressions matched against the path relative to the target directory")
	)]
	InvalidPattern {
		kind: PatternKind,
		pattern: String,
		reason: String,
	},

	#[error("placeholder `{key}` is not set")]
	#[diagnostic(
		code(charmap::unresolved_placeholder),
		help("export `{key}` as an environment variable or pass `--set {key}=VALUE`")
	)]
	UnresolvedPlaceholder { key: String },

	#[error("failed to read `{path}`")]
	#[diagnostic(code(charmap::read))]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to write `{path}`")]
	#[diagnostic(code(charmap::write))]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to process `{path}`")]
	#[diagnostic(code(charmap::process))]
	Process {
		path: PathBuf,
		#[source]
		source: Box<CharmapError>,
	},

	#[error("failed to walk directory `{path}`")]
	#[diagnostic(code(charmap::walk))]
	Walk {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid configuration: {0}")]
	#[diagnostic(code(charmap::invalid_config))]
	InvalidConfig(String),

	#[error("failed to parse config file `{path}`: {reason}")]
	#[diagnostic(
		code(charmap::config_parse),
		help("check that the file is valid TOML with an optional [values] table")
	)]
	ConfigParse { path: PathBuf, reason: String },

	#[error("invalid key=value pair `{0}`")]
	#[diagnostic(
		code(charmap::invalid_assignment),
		help("use the form KEY=VALUE, separating several pairs with commas")
	)]
	InvalidAssignment(String),
}

impl CharmapError {
	/// Attach the path of the file being processed to a per-file failure.
	/// [`CharmapError::Read`] and [`CharmapError::Write`] already name it and
	/// are returned as is.
	pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
		match self {
			Self::Read { .. } | Self::Write { .. } | Self::Process { .. } => self,
			other => {
				Self::Process {
					path: path.into(),
					source: Box::new(other),
				}
			}
		}
	}

	/// The file a per-file failure belongs to.
	pub fn path(&self) -> Option<&Path> {
		match self {
			Self::Read { path, .. }
			| Self::Write { path, .. }
			| Self::Process { path, .. }
			| Self::Walk { path, .. } => Some(path.as_path()),
			_ => None,
		}
	}

	/// The unresolved key behind this error, looking through a
	/// [`CharmapError::Process`] wrapper.
	pub fn unresolved_key(&self) -> Option<&str> {
		match self {
			Self::UnresolvedPlaceholder { key } => Some(key),
			Self::Process { source, .. } => source.unresolved_key(),
			_ => None,
		}
	}
}

/// Composite failure of one run: every per-file error plus the walk error.
#[derive(Debug, Diagnostic, Error)]
#[diagnostic(code(charmap::run_failed))]
pub struct RunError {
	pub root: PathBuf,
	pub canceled: bool,
	#[related]
	pub errors: Vec<CharmapError>,
}

impl fmt::Display for RunError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} error(s) while replacing placeholders under `{}`",
			self.errors.len(),
			self.root.display()
		)?;
		if self.canceled {
			f.write_str(" (run canceled)")?;
		}
		Ok(())
	}
}

pub type CharmapResult<T> = Result<T, CharmapError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
