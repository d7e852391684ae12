use std::borrow::Cow;

use regex::bytes::Regex;

use crate::CharmapError;
use crate::CharmapResult;
use crate::KeyValueMap;

/// Default opening delimiter.
pub const DEFAULT_OPEN: &str = "<::";

/// Default closing delimiter.
pub const DEFAULT_CLOSE: &str = "::>";

/// The literal byte sequences that bound a placeholder, e.g. `<::` and `::>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
	open: String,
	close: String,
}

impl Delimiters {
	pub fn new(open: impl Into<String>, close: impl Into<String>) -> CharmapResult<Self> {
		let open = open.into();
		let close = close.into();

		if open.is_empty() || close.is_empty() {
			return Err(CharmapError::InvalidConfig(
				"delimiters must not be empty".to_string(),
			));
		}

		Ok(Self { open, close })
	}

	pub fn open(&self) -> &str {
		&self.open
	}

	pub fn close(&self) -> &str {
		&self.close
	}

	/// Wrap `key` in the delimiters.
	pub fn wrap(&self, key: &str) -> String {
		format!("{}{key}{}", self.open, self.close)
	}
}

impl Default for Delimiters {
	fn default() -> Self {
		Self {
			open: DEFAULT_OPEN.to_string(),
			close: DEFAULT_CLOSE.to_string(),
		}
	}
}

/// Output of a successful replacement pass over one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement<'a> {
	/// The content after substitution. Borrowed when nothing was replaced.
	pub content: Cow<'a, [u8]>,
	/// True iff at least one placeholder was substituted.
	pub changed: bool,
}

impl<'a> Replacement<'a> {
	pub fn unchanged(content: &'a [u8]) -> Self {
		Self {
			content: Cow::Borrowed(content),
			changed: false,
		}
	}
}

/// Turns file content into substituted content.
///
/// Implementations are shared by every worker of a run, so they must be
/// immutable once built.
pub trait TokenReplacer: Send + Sync {
	fn replace<'a>(&self, content: &'a [u8]) -> CharmapResult<Replacement<'a>>;
}

/// Single-pass placeholder scanner.
///
/// The content is scanned once, left to right, for an opening delimiter
/// followed by the nearest closing delimiter. The bytes in between are looked
/// up in the [`KeyValueMap`], so the cost depends on the content length and
/// not on the number of keys.
///
/// - An opening delimiter with no closing delimiter after it is left as is,
///   together with the rest of the content.
/// - Any enclosed key missing from the map fails the whole pass with
///   [`CharmapError::UnresolvedPlaceholder`].
/// - Substituted values are never scanned again.
///
/// ```rust
/// use charmap_core::Delimiters;
/// use charmap_core::KeyValueMap;
/// use charmap_core::PlaceholderScanner;
/// use charmap_core::TokenReplacer;
///
/// let values: KeyValueMap = [("NAME", "svc")].into_iter().collect();
/// let scanner = PlaceholderScanner::new(Delimiters::default(), values);
/// let output = scanner.replace(b"name: <::NAME::>").unwrap();
/// assert_eq!(&*output.content, b"name: svc");
/// assert!(output.changed);
/// ```
#[derive(Debug, Clone)]
pub struct PlaceholderScanner {
	delimiters: Delimiters,
	values: KeyValueMap,
	token: Regex,
}

impl PlaceholderScanner {
	pub fn new(delimiters: Delimiters, values: KeyValueMap) -> Self {
		let pattern = format!(
			"{}(?s-u:.*?){}",
			regex::escape(delimiters.open()),
			regex::escape(delimiters.close())
		);
		// Both delimiters are escaped literals around a fixed group, so the
		// pattern always compiles.
		let token = Regex::new(&pattern)
			.unwrap_or_else(|e| unreachable!("escaped placeholder pattern failed: {e}"));

		Self {
			delimiters,
			values,
			token,
		}
	}

	pub fn delimiters(&self) -> &Delimiters {
		&self.delimiters
	}

	pub fn values(&self) -> &KeyValueMap {
		&self.values
	}

	fn resolve(&self, key: &[u8]) -> CharmapResult<&str> {
		std::str::from_utf8(key)
			.ok()
			.and_then(|key| self.values.get(key))
			.map(String::as_str)
			.ok_or_else(|| {
				CharmapError::UnresolvedPlaceholder {
					key: String::from_utf8_lossy(key).into_owned(),
				}
			})
	}
}

impl TokenReplacer for PlaceholderScanner {
	fn replace<'a>(&self, content: &'a [u8]) -> CharmapResult<Replacement<'a>> {
		let open_len = self.delimiters.open.len();
		let close_len = self.delimiters.close.len();
		let mut output: Option<Vec<u8>> = None;
		let mut copied_until = 0;

		for token in self.token.find_iter(content) {
			let key = &content[token.start() + open_len..token.end() - close_len];
			let value = self.resolve(key)?;
			let buffer = output.get_or_insert_with(|| Vec::with_capacity(content.len()));
			buffer.extend_from_slice(&content[copied_until..token.start()]);
			buffer.extend_from_slice(value.as_bytes());
			copied_until = token.end();
		}

		let Some(mut buffer) = output else {
			return Ok(Replacement::unchanged(content));
		};
		buffer.extend_from_slice(&content[copied_until..]);

		Ok(Replacement {
			content: Cow::Owned(buffer),
			changed: true,
		})
	}
}
