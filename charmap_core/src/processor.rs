use std::fs::Permissions;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::CharmapError;
use crate::CharmapResult;
use crate::TokenReplacer;

/// How a changed file is written back to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
	/// Overwrite the file directly. A reader racing the write, or a crash
	/// during it, can observe a partially written file.
	#[default]
	InPlace,
	/// Write a sibling temporary file and rename it over the original, so
	/// the file is either fully old or fully new.
	Atomic,
}

/// What happened to a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
	pub path: PathBuf,
	/// True when the content changed and was (or, in a dry run, would have
	/// been) written back.
	pub touched: bool,
	pub original_size: usize,
	pub size: usize,
}

/// Reads a file, runs the replacer over it, and writes it back when
/// something was substituted.
#[derive(Clone, Copy)]
pub struct FileProcessor<'r> {
	replacer: &'r dyn TokenReplacer,
	write_mode: WriteMode,
	dry_run: bool,
}

impl<'r> FileProcessor<'r> {
	pub fn new(replacer: &'r dyn TokenReplacer) -> Self {
		Self {
			replacer,
			write_mode: WriteMode::default(),
			dry_run: false,
		}
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

	/// Process one file. Errors name the file path exactly once.
	///
	/// A read or replacement failure leaves the file untouched. A failed
	/// in-place write is not rolled back.
	pub fn process(&self, path: &Path) -> CharmapResult<FileOutcome> {
		self.process_inner(path).map_err(|e| e.in_file(path))
	}

	fn process_inner(&self, path: &Path) -> CharmapResult<FileOutcome> {
		let read_error = |source| {
			CharmapError::Read {
				path: path.to_path_buf(),
				source,
			}
		};
		let permissions = std::fs::metadata(path).map_err(read_error)?.permissions();
		let original = std::fs::read(path).map_err(read_error)?;

		let replacement = self.replacer.replace(&original)?;
		let outcome = FileOutcome {
			path: path.to_path_buf(),
			touched: replacement.changed,
			original_size: original.len(),
			size: replacement.content.len(),
		};

		if !replacement.changed {
			tracing::debug!(path = %path.display(), "no changes made to file");
			return Ok(outcome);
		}

		if self.dry_run {
			tracing::info!(
				path = %path.display(),
				size = outcome.size,
				original_size = outcome.original_size,
				"would process file"
			);
			return Ok(outcome);
		}

		write_file(path, &replacement.content, permissions, self.write_mode).map_err(|source| {
			CharmapError::Write {
				path: path.to_path_buf(),
				source,
			}
		})?;

		tracing::info!(
			path = %path.display(),
			size = outcome.size,
			original_size = outcome.original_size,
			changed = true,
			"processed file"
		);

		Ok(outcome)
	}
}

fn write_file(
	path: &Path,
	content: &[u8],
	permissions: Permissions,
	write_mode: WriteMode,
) -> std::io::Result<()> {
	match write_mode {
		// Writing through the existing inode keeps its mode. Only the owner
		// may chmod, so none is attempted.
		WriteMode::InPlace => std::fs::write(path, content),
		WriteMode::Atomic => {
			// Rename over the link target, not the link itself.
			let target = std::fs::canonicalize(path)?;
			let dir = target.parent().unwrap_or_else(|| Path::new("."));
			let mut temp = NamedTempFile::new_in(dir)?;
			temp.write_all(content)?;
			temp.as_file().sync_all()?;
			std::fs::set_permissions(temp.path(), permissions)?;
			temp.persist(&target).map_err(|e| e.error)?;
			Ok(())
		}
	}
}
