use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::CancellationToken;
use crate::CharmapError;
use crate::CharmapResult;
use crate::Delimiters;
use crate::FileFilter;
use crate::KeyValueMap;
use crate::ValueSource;
use crate::WriteMode;

/// Supported config file names in discovery order (highest precedence
/// first). They are looked up in the target directory.
pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["charmap.toml", ".charmap.toml"];

/// Optional project configuration loaded from `charmap.toml`.
///
/// Every field is optional; command-line flags override what is set here.
///
/// ```toml
/// open = "{{"
/// close = "}}"
/// workers = 4
/// source = "both"
/// include = ['.*\.ya?ml$', '.*\.env$']
/// exclude = ['^\.git(/|$)', '^vendor/']
/// atomic = true
///
/// [values]
/// PUBLIC_DOMAIN = "example.com"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharmapConfig {
	pub open: Option<String>,
	pub close: Option<String>,
	pub workers: Option<usize>,
	pub source: Option<ValueSource>,
	pub include: Option<Vec<String>>,
	pub exclude: Option<Vec<String>>,
	/// Write changed files through a temporary file and rename.
	#[serde(default)]
	pub atomic: bool,
	/// Explicit placeholder values. They take part in resolution like
	/// `--set` assignments, which override them.
	#[serde(default)]
	pub values: BTreeMap<String, String>,
}

impl CharmapConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(dir: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| dir.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the first discovered config file in `dir`. Returns `None` when
	/// there is none.
	pub fn load(dir: &Path) -> CharmapResult<Option<Self>> {
		let Some(path) = Self::resolve_path(dir) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&path)?;
		let config: Self = toml::from_str(&content).map_err(|e| {
			CharmapError::ConfigParse {
				path: path.clone(),
				reason: e.to_string(),
			}
		})?;

		tracing::debug!(path = %path.display(), "loaded config file");
		Ok(Some(config))
	}
}

/// Number of workers used when none is configured.
pub fn default_workers() -> NonZeroUsize {
	std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Everything the engine needs for one run. Built once, then read-only.
#[derive(Debug, Clone)]
pub struct RunConfig {
	pub target_dir: PathBuf,
	pub delimiters: Delimiters,
	pub values: KeyValueMap,
	pub filter: FileFilter,
	pub workers: NonZeroUsize,
	pub write_mode: WriteMode,
	pub dry_run: bool,
	pub cancel: CancellationToken,
}

impl RunConfig {
	/// Validate the target directory and worker count. Everything else gets
	/// its default and can be changed with the builder methods.
	pub fn new(target_dir: impl Into<PathBuf>, workers: usize) -> CharmapResult<Self> {
		let target_dir = target_dir.into();

		if target_dir.as_os_str().is_empty() {
			return Err(CharmapError::InvalidConfig(
				"target directory must not be empty".to_string(),
			));
		}

		let metadata = std::fs::metadata(&target_dir).map_err(|_| {
			CharmapError::InvalidConfig(format!(
				"target directory `{}` does not exist",
				target_dir.display()
			))
		})?;
		if !metadata.is_dir() {
			return Err(CharmapError::InvalidConfig(format!(
				"target `{}` is not a directory",
				target_dir.display()
			)));
		}

		let workers = NonZeroUsize::new(workers).ok_or_else(|| {
			CharmapError::InvalidConfig(format!(
				"workers must be greater than 0, got {workers}"
			))
		})?;

		Ok(Self {
			target_dir,
			delimiters: Delimiters::default(),
			values: KeyValueMap::new(),
			filter: FileFilter::default(),
			workers,
			write_mode: WriteMode::default(),
			dry_run: false,
			cancel: CancellationToken::new(),
		})
	}

	#[must_use]
	pub fn delimiters(mut self, delimiters: Delimiters) -> Self {
		self.delimiters = delimiters;
		self
	}

	#[must_use]
	pub fn values(mut self, values: KeyValueMap) -> Self {
		self.values = values;
		self
	}

	#[must_use]
	pub fn filter(mut self, filter: FileFilter) -> Self {
		self.filter = filter;
		self
	}

	#[must_use]
	pub fn write_mode(mut self, write_mode: WriteMode) -> Self {
		self.write_mode = write_mode;
		self
	}

	#[must_use]
	pub fn dry_run(mut self, dry_run: bool) -> Self {
		self.dry_run = dry_run;
		self
	}

	#[must_use]
	pub fn cancel(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;
		self
	}
}
