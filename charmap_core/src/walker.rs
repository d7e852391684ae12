use std::fs::ReadDir;
use std::path::Path;
use std::path::PathBuf;

use crate::CharmapError;
use crate::FileFilter;

/// Lazy depth-first walk yielding every regular file under a root that the
/// [`FileFilter`] accepts.
///
/// Directories are always descended into and never yielded. A symbolic link
/// to a regular file is yielded like the file. Links to directories and
/// dangling links are skipped. The first traversal error is yielded once and
/// ends the walk.
pub struct Walk<'f> {
	root: PathBuf,
	filter: &'f FileFilter,
	stack: Vec<(PathBuf, ReadDir)>,
	pending_root: bool,
	done: bool,
}

impl<'f> Walk<'f> {
	pub fn new(root: impl Into<PathBuf>, filter: &'f FileFilter) -> Self {
		Self {
			root: root.into(),
			filter,
			stack: Vec::new(),
			pending_root: true,
			done: false,
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn fail(&mut self, path: PathBuf, source: std::io::Error) -> Option<Result<PathBuf, CharmapError>> {
		self.done = true;
		self.stack.clear();
		Some(Err(CharmapError::Walk { path, source }))
	}
}

impl Iterator for Walk<'_> {
	type Item = Result<PathBuf, CharmapError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}

		if self.pending_root {
			self.pending_root = false;
			match std::fs::read_dir(&self.root) {
				Ok(entries) => self.stack.push((self.root.clone(), entries)),
				Err(source) => return self.fail(self.root.clone(), source),
			}
		}

		loop {
			let Some((dir, entries)) = self.stack.last_mut() else {
				self.done = true;
				return None;
			};

			let entry = match entries.next() {
				None => {
					self.stack.pop();
					continue;
				}
				Some(Ok(entry)) => entry,
				Some(Err(source)) => {
					let dir = dir.clone();
					return self.fail(dir, source);
				}
			};

			let path = entry.path();
			let file_type = match entry.file_type() {
				Ok(file_type) => file_type,
				Err(source) => return self.fail(path, source),
			};

			if file_type.is_dir() {
				match std::fs::read_dir(&path) {
					Ok(entries) => self.stack.push((path, entries)),
					Err(source) => return self.fail(path, source),
				}
				continue;
			}

			if file_type.is_symlink() {
				// Links to files are processed like the file itself; links to
				// directories are never followed.
				let followed = std::fs::metadata(&path).map(|m| m.is_file());
				if !matches!(followed, Ok(true)) {
					tracing::info!(path = %path.display(), "skipping symbolic link that is not a file");
					continue;
				}
			} else if !file_type.is_file() {
				tracing::debug!(path = %path.display(), "skipping non-regular file");
				continue;
			}

			if !self.filter.matches_relative(&self.root, &path) {
				tracing::debug!(path = %path.display(), "skipping file");
				continue;
			}

			return Some(Ok(path));
		}
	}
}

impl std::iter::FusedIterator for Walk<'_> {}
