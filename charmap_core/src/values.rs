use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Deserialize;

use crate::CharmapError;
use crate::CharmapResult;

/// Placeholder keys and the values substituted for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut)]
pub struct KeyValueMap(HashMap<String, String>);

impl KeyValueMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every environment variable of the current process. Variables whose
	/// name or value is not valid unicode are skipped.
	pub fn from_env() -> Self {
		std::env::vars_os()
			.filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
			.collect()
	}

	/// Keys in sorted order, for logging without exposing values.
	pub fn sorted_keys(&self) -> Vec<&str> {
		let mut keys: Vec<_> = self.0.keys().map(String::as_str).collect();
		keys.sort_unstable();
		keys
	}

	/// Layer `other` on top of this map. Keys from `other` win.
	pub fn merge(&mut self, other: impl IntoIterator<Item = (String, String)>) {
		self.0.extend(other);
	}
}

impl<K, V> FromIterator<(K, V)> for KeyValueMap
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

impl IntoIterator for KeyValueMap {
	type IntoIter = std::collections::hash_map::IntoIter<String, String>;
	type Item = (String, String);

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

/// Where placeholder values come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
	/// Every environment variable.
	#[default]
	Env,
	/// Only explicit `KEY=VALUE` assignments.
	Flag,
	/// Environment variables, overridden by explicit assignments.
	Both,
}

impl ValueSource {
	/// Build the map for this source. `explicit` holds the assignments from
	/// the config file and the command line, already merged in precedence
	/// order.
	pub fn resolve(self, explicit: &BTreeMap<String, String>) -> KeyValueMap {
		let mut values = match self {
			Self::Env | Self::Both => KeyValueMap::from_env(),
			Self::Flag => KeyValueMap::new(),
		};

		if self != Self::Env {
			values.merge(explicit.iter().map(|(k, v)| (k.clone(), v.clone())));
		}

		values
	}
}

impl fmt::Display for ValueSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Env => f.write_str("env"),
			Self::Flag => f.write_str("flag"),
			Self::Both => f.write_str("both"),
		}
	}
}

impl FromStr for ValueSource {
	type Err = CharmapError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"env" => Ok(Self::Env),
			"flag" => Ok(Self::Flag),
			"both" => Ok(Self::Both),
			other => {
				Err(CharmapError::InvalidConfig(format!(
					"invalid value source `{other}`, must be one of: env, flag, both"
				)))
			}
		}
	}
}

/// Parse `KEY=VALUE[,KEY=VALUE...]`.
///
/// Each comma separated pair must contain exactly one `=`.
pub fn parse_assignments(input: &str) -> CharmapResult<Vec<(String, String)>> {
	input
		.split(',')
		.map(|pair| {
			let mut parts = pair.split('=');
			match (parts.next(), parts.next(), parts.next()) {
				(Some(key), Some(value), None) => Ok((key.to_string(), value.to_string())),
				_ => Err(CharmapError::InvalidAssignment(pair.to_string())),
			}
		})
		.collect()
}
