use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use crate::CharmapError;
use crate::CharmapResult;
use crate::Delimiters;
use crate::FileFilter;
use crate::KeyValueMap;
use crate::PlaceholderScanner;
use crate::Replacement;
use crate::TokenReplacer;

pub const NO_PATTERNS: &[&str] = &[];

pub fn key_values(pairs: &[(&str, &str)]) -> KeyValueMap {
	pairs.iter().copied().collect()
}

pub fn scanner(pairs: &[(&str, &str)]) -> PlaceholderScanner {
	PlaceholderScanner::new(Delimiters::default(), key_values(pairs))
}

pub fn yaml_filter() -> FileFilter {
	FileFilter::with_defaults().unwrap_or_else(|e| panic!("default filter: {e}"))
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write: {e}"));
	path
}

pub fn read_file(path: &Path) -> String {
	std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

/// Every file under `root` keyed by its relative path.
pub fn snapshot_tree(root: &Path) -> BTreeMap<String, String> {
	let mut files = BTreeMap::new();
	let mut pending = vec![root.to_path_buf()];
	while let Some(dir) = pending.pop() {
		for entry in std::fs::read_dir(&dir).unwrap_or_else(|e| panic!("read_dir: {e}")) {
			let path = entry.unwrap_or_else(|e| panic!("entry: {e}")).path();
			if path.is_dir() {
				pending.push(path);
			} else {
				files.insert(crate::relative_key(root, &path), read_file(&path));
			}
		}
	}
	files
}

/// A small tree with YAML files to rewrite, a file without placeholders, a
/// non-YAML file, a file with a missing key, and a `.git` directory.
pub fn populate_tree(root: &Path) {
	write_file(
		root,
		"config.yaml",
		"apiVersion: v1\nkind: ConfigMap\ndata:\n  domain: \"<::PUBLIC_DOMAIN::>\"\n",
	);
	write_file(root, "deploy/app.yml", "name: <::NAME::>\nport: <::PORT::>\n");
	write_file(root, "deploy/nested/static.yaml", "replicas: 3\n");
	write_file(root, "deploy/nested/broken.yaml", "a <::MISSING::> b\n");
	write_file(root, "notes.txt", "<::NAME::> stays here\n");
	write_file(root, ".git/config.yaml", "<::NAME::>\n");
}

pub fn tree_values() -> KeyValueMap {
	key_values(&[
		("PUBLIC_DOMAIN", "example.com"),
		("NAME", "svc"),
		("PORT", "8080"),
	])
}

/// Deterministic content of roughly `size` bytes where about one word in
/// twelve is a placeholder for one of `keys` keys.
pub fn generate_blob(size: usize, keys: usize, seed: u64) -> (Vec<u8>, KeyValueMap) {
	assert!(keys > 0, "keys must be > 0");
	let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
	let mut next = move || {
		state = state
			.wrapping_mul(6_364_136_223_846_793_005)
			.wrapping_add(1_442_695_040_888_963_407);
		state >> 33
	};

	let values: KeyValueMap = (0..keys).map(|i| (format!("K{i}"), format!("V{i}"))).collect();
	let mut blob = Vec::with_capacity(size + 32);
	while blob.len() < size {
		if next() % 12 == 0 {
			let key = next() as usize % keys;
			blob.extend_from_slice(format!("{{{{K{key}}}}}").as_bytes());
		} else {
			let len = 4 + next() as usize % 7;
			for _ in 0..len {
				blob.push(b'a' + (next() % 26) as u8);
			}
		}
		blob.push(b' ');
	}

	(blob, values)
}

/// Oracle: one search-and-replace over the whole content per key, then a
/// search for any placeholder left behind.
pub struct PerKeyReplacer {
	pub delimiters: Delimiters,
	pub values: KeyValueMap,
}

impl TokenReplacer for PerKeyReplacer {
	fn replace<'a>(&self, content: &'a [u8]) -> CharmapResult<Replacement<'a>> {
		let open = self.delimiters.open().as_bytes();
		let close = self.delimiters.close().as_bytes();
		let mut output = content.to_vec();
		let mut changed = false;

		for (key, value) in self.values.iter() {
			let token = self.delimiters.wrap(key).into_bytes();
			if find(&output, &token).is_some() {
				output = replace_all(&output, &token, value.as_bytes());
				changed = true;
			}
		}

		if let Some(start) = find(&output, open) {
			let start = start + open.len();
			if let Some(end) = find(&output[start..], close) {
				return Err(CharmapError::UnresolvedPlaceholder {
					key: String::from_utf8_lossy(&output[start..start + end]).into_owned(),
				});
			}
		}

		Ok(Replacement {
			content: Cow::Owned(output),
			changed,
		})
	}
}

/// Oracle: walk the content one byte at a time.
pub struct ByteLoopReplacer {
	pub delimiters: Delimiters,
	pub values: KeyValueMap,
}

impl TokenReplacer for ByteLoopReplacer {
	fn replace<'a>(&self, content: &'a [u8]) -> CharmapResult<Replacement<'a>> {
		let open = self.delimiters.open().as_bytes();
		let close = self.delimiters.close().as_bytes();
		let mut output = Vec::with_capacity(content.len());
		let mut changed = false;
		let mut index = 0;

		while index < content.len() {
			if !content[index..].starts_with(open) {
				output.push(content[index]);
				index += 1;
				continue;
			}

			let start = index + open.len();
			let Some(end) = find(&content[start..], close) else {
				output.extend_from_slice(&content[index..]);
				break;
			};
			let key = String::from_utf8_lossy(&content[start..start + end]).into_owned();
			let Some(value) = self.values.get(&key) else {
				return Err(CharmapError::UnresolvedPlaceholder { key });
			};
			output.extend_from_slice(value.as_bytes());
			index = start + end + close.len();
			changed = true;
		}

		Ok(Replacement {
			content: Cow::Owned(output),
			changed,
		})
	}
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack
		.windows(needle.len())
		.position(|window| window == needle)
}

fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
	let mut output = Vec::with_capacity(haystack.len());
	let mut rest = haystack;
	while let Some(position) = find(rest, needle) {
		output.extend_from_slice(&rest[..position]);
		output.extend_from_slice(replacement);
		rest = &rest[position + needle.len()..];
	}
	output.extend_from_slice(rest);
	output
}
