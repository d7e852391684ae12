use std::path::PathBuf;

use charmap_core::ValueSource;
use clap::Parser;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Replace placeholders in every matching file under a directory.",
	long_about = "charmap replaces delimiter-wrapped placeholders such as `<::PUBLIC_DOMAIN::>` \
	              in every matching file under a directory, in place, using values taken from \
	              the environment or from `--set` assignments.\n\nA file is rewritten only when \
	              something was substituted. Any placeholder without a value fails that file, \
	              leaves it untouched, and makes the run exit with a non-zero status once every \
	              other file has been processed.\n\nOptional defaults are read from \
	              `charmap.toml` or `.charmap.toml` in the target directory. Flags override them."
)]
#[allow(clippy::struct_excessive_bools)]
pub struct CharmapCli {
	/// Opening delimiter of a placeholder. Defaults to `<::`.
	#[arg(long, short = 'o')]
	pub open: Option<String>,

	/// Closing delimiter of a placeholder. Defaults to `::>`.
	#[arg(long, short = 'c')]
	pub close: Option<String>,

	/// Directory to process recursively.
	#[arg(long, short = 'd', default_value = ".")]
	pub dir: PathBuf,

	/// Number of worker threads. Defaults to the available parallelism.
	#[arg(long, short = 'w')]
	pub workers: Option<usize>,

	/// Where placeholder values come from.
	#[arg(long, short = 's', value_enum)]
	pub source: Option<SourceArg>,

	/// Explicit values as `KEY=VALUE[,KEY=VALUE...]`. Repeatable. Ignored
	/// when the source is `env`.
	#[arg(long = "set", value_name = "KEY=VALUE")]
	pub assignments: Vec<String>,

	/// Regular expression a file's relative path must match to be processed.
	/// Repeatable. Replaces the default `.*\.ya?ml$` when given.
	#[arg(long, short = 'i', value_name = "REGEX")]
	pub include: Vec<String>,

	/// Regular expression excluding matching relative paths. Repeatable.
	/// Replaces the default `^\.git(/|$)` when given.
	#[arg(long, value_name = "REGEX")]
	pub ignore: Vec<String>,

	/// Append a log of every processed file to this path.
	#[arg(long, value_name = "FILE")]
	pub log: Option<PathBuf>,

	/// Report what would change without writing any file.
	#[arg(long, default_value_t = false)]
	pub dry_run: bool,

	/// Write each changed file through a temporary file and rename it into
	/// place.
	#[arg(long, default_value_t = false)]
	pub atomic: bool,

	/// Disable colored output.
	#[arg(long, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
	/// Every environment variable. `--set` assignments are ignored.
	Env,
	/// Only `--set` assignments and the config file's `[values]` table.
	Flag,
	/// Environment variables, overridden by explicit assignments.
	Both,
}

impl From<SourceArg> for ValueSource {
	fn from(value: SourceArg) -> Self {
		match value {
			SourceArg::Env => Self::Env,
			SourceArg::Flag => Self::Flag,
			SourceArg::Both => Self::Both,
		}
	}
}
