use std::fs::OpenOptions;
use std::path::Path;
use std::process;
use std::sync::Mutex;

use charmap_cli::CharmapCli;
use charmap_core::AnyEmptyResult;
use charmap_core::CancellationToken;
use charmap_core::CharmapConfig;
use charmap_core::CharmapError;
use charmap_core::DEFAULT_CLOSE;
use charmap_core::DEFAULT_EXCLUDE_PATTERN;
use charmap_core::DEFAULT_INCLUDE_PATTERN;
use charmap_core::DEFAULT_OPEN;
use charmap_core::Delimiters;
use charmap_core::FileFilter;
use charmap_core::RunConfig;
use charmap_core::RunError;
use charmap_core::RunReport;
use charmap_core::RunStats;
use charmap_core::Scheduler;
use charmap_core::ValueSource;
use charmap_core::WriteMode;
use charmap_core::default_workers;
use charmap_core::parse_assignments;
use charmap_core::relative_key;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = CharmapCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	if let Err(e) = run(&args) {
		let e = match e.downcast::<RunError>() {
			Ok(run_err) => {
				let report: miette::Report = (*run_err).into();
				eprintln!("{report:?}");
				process::exit(1);
			}
			Err(e) => e,
		};

		match e.downcast::<CharmapError>() {
			Ok(charmap_err) => {
				let report: miette::Report = (*charmap_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(1);
	}
}

fn run(args: &CharmapCli) -> AnyEmptyResult {
	let file_config = CharmapConfig::load(&args.dir)?.unwrap_or_default();

	let delimiters = Delimiters::new(
		args.open
			.clone()
			.or(file_config.open)
			.unwrap_or_else(|| DEFAULT_OPEN.to_string()),
		args.close
			.clone()
			.or(file_config.close)
			.unwrap_or_else(|| DEFAULT_CLOSE.to_string()),
	)?;

	// `--set` assignments override the config file's [values] table.
	let mut explicit = file_config.values;
	for assignment in &args.assignments {
		explicit.extend(parse_assignments(assignment)?);
	}
	let source = args
		.source
		.map(ValueSource::from)
		.or(file_config.source)
		.unwrap_or_default();
	let values = source.resolve(&explicit);

	let includes = patterns(&args.include, file_config.include, DEFAULT_INCLUDE_PATTERN);
	let excludes = patterns(&args.ignore, file_config.exclude, DEFAULT_EXCLUDE_PATTERN);
	let filter = FileFilter::new(&includes, &excludes)?;

	let workers = args
		.workers
		.or(file_config.workers)
		.unwrap_or_else(|| default_workers().get());
	let write_mode = if args.atomic || file_config.atomic {
		WriteMode::Atomic
	} else {
		WriteMode::InPlace
	};

	if let Some(log) = &args.log {
		init_logging(log)?;
	}

	tracing::info!(
		dir = %args.dir.display(),
		workers,
		open = delimiters.open(),
		close = delimiters.close(),
		%source,
		keys = ?values.sorted_keys(),
		includes = ?includes,
		excludes = ?excludes,
		"starting charmap"
	);

	let cancel = CancellationToken::new();
	let config = RunConfig::new(&args.dir, workers)?
		.delimiters(delimiters)
		.values(values)
		.filter(filter)
		.write_mode(write_mode)
		.dry_run(args.dry_run)
		.cancel(cancel.clone());

	ctrlc::set_handler(move || {
		eprintln!("\nInterrupt received, stopping after the files in progress...");
		cancel.cancel();
	})?;

	let report = Scheduler::new(config).run();
	print_summary(&report, args.dry_run);
	report.into_result()?;

	Ok(())
}

/// Flag patterns win over the config file, which wins over the default.
fn patterns(flags: &[String], configured: Option<Vec<String>>, default: &str) -> Vec<String> {
	if !flags.is_empty() {
		return flags.to_vec();
	}

	configured.unwrap_or_else(|| vec![default.to_string()])
}

fn init_logging(path: &Path) -> AnyEmptyResult {
	let file = OpenOptions::new().create(true).append(true).open(path)?;
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new("charmap=info"));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_ansi(false)
		.with_target(false)
		.with_writer(Mutex::new(file))
		.init();

	Ok(())
}

fn print_summary(report: &RunReport, dry_run: bool) {
	let RunStats {
		changed,
		unchanged,
		failed,
		changed_paths,
		duration,
		..
	} = &report.stats;

	if dry_run {
		println!("Dry run: would update {changed} file(s):");
		for path in changed_paths {
			println!("  {}", relative_key(&report.root, path));
		}
	} else if *changed == 0 && *failed == 0 {
		println!("No placeholders to replace.");
	} else {
		println!(
			"{} {changed} file(s) in {}ms ({unchanged} unchanged, {failed} failed).",
			colored!("Updated", green),
			duration.as_millis()
		);
	}

	if report.canceled {
		println!("{}", colored!("Run canceled before every file was processed.", yellow));
	}

	let missing = report.unresolved_keys();
	if !missing.is_empty() {
		eprintln!(
			"{} no value for: {}",
			colored!("missing:", red),
			missing.join(", ")
		);
	}
}

