mod common;

use charmap_core::AnyEmptyResult;
use predicates::str::contains;

#[test]
fn replace_from_set_flags() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("deploy"))?;
	std::fs::write(
		tmp.path().join("deploy/app.yaml"),
		"name: <::NAME::>\nport: <::PORT::>\n",
	)?;
	std::fs::write(tmp.path().join("notes.txt"), "<::NAME::>\n")?;

	common::charmap_cmd()
		.arg("--dir")
		.arg(tmp.path())
		.args(["--source", "flag", "--set", "NAME=svc,PORT=8080"])
		.assert()
		.success()
		.stdout(contains("Updated 1 file(s)"));

	let content = std::fs::read_to_string(tmp.path().join("deploy/app.yaml"))?;
	assert_eq!(content, "name: svc\nport: 8080\n");
	let notes = std::fs::read_to_string(tmp.path().join("notes.txt"))?;
	assert_eq!(notes, "<::NAME::>\n");

	Ok(())
}

#[test]
fn replace_from_environment_by_default() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("config.yml"),
		"domain: <::CHARMAP_CLI_TEST_DOMAIN::>\n",
	)?;

	common::charmap_cmd()
		.env("CHARMAP_CLI_TEST_DOMAIN", "example.com")
		.arg("--dir")
		.arg(tmp.path())
		.assert()
		.success();

	let content = std::fs::read_to_string(tmp.path().join("config.yml"))?;
	assert_eq!(content, "domain: example.com\n");

	Ok(())
}

#[test]
fn env_source_ignores_set_flags() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("a.yaml"), "<::CHARMAP_CLI_TEST_ONLY_SET::>")?;

	common::charmap_cmd()
		.arg("--dir")
		.arg(tmp.path())
		.args(["--source", "env", "--set", "CHARMAP_CLI_TEST_ONLY_SET=x"])
		.assert()
		.failure()
		.code(1)
		.stderr(contains("CHARMAP_CLI_TEST_ONLY_SET"));

	Ok(())
}

#[test]
fn both_source_prefers_set_over_environment() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("a.yaml"),
		"<::CHARMAP_CLI_TEST_A::>-<::CHARMAP_CLI_TEST_B::>",
	)?;

	common::charmap_cmd()
		.env("CHARMAP_CLI_TEST_A", "from-env")
		.env("CHARMAP_CLI_TEST_B", "from-env")
		.arg("--dir")
		.arg(tmp.path())
		.args(["--source", "both", "--set", "CHARMAP_CLI_TEST_B=from-flag"])
		.assert()
		.success();

	let content = std::fs::read_to_string(tmp.path().join("a.yaml"))?;
	assert_eq!(content, "from-env-from-flag");

	Ok(())
}

#[test]
fn missing_key_fails_run_but_processes_other_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("broken.yaml"), "a <::MISSING::> b\n")?;
	std::fs::write(tmp.path().join("ok.yaml"), "name: <::NAME::>\n")?;

	common::charmap_cmd()
		.arg("--dir")
		.arg(tmp.path())
		.args(["--source", "flag", "--set", "NAME=svc"])
		.assert()
		.failure()
		.code(1)
		.stderr(contains("no value for: MISSING"))
		.stderr(contains("1 error(s) while replacing placeholders"));

	let broken = std::fs::read_to_string(tmp.path().join("broken.yaml"))?;
	assert_eq!(broken, "a <::MISSING::> b\n");
	let ok = std::fs::read_to_string(tmp.path().join("ok.yaml"))?;
	assert_eq!(ok, "name: svc\n");

	Ok(())
}

#[test]
fn custom_delimiters_and_patterns() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("app.env"), "HOST={{HOST}}\n")?;
	std::fs::write(tmp.path().join("app.yaml"), "host: {{HOST}}\n")?;
	std::fs::create_dir_all(tmp.path().join("vendor"))?;
	std::fs::write(tmp.path().join("vendor/lib.env"), "HOST={{HOST}}\n")?;

	common::charmap_cmd()
		.arg("--dir")
		.arg(tmp.path())
		.args(["--open", "{{", "--close", "}}"])
		.args(["--include", r"\.env$", "--ignore", "^vendor/"])
		.args(["--source", "flag", "--set", "HOST=db"])
		.assert()
		.success();

	assert_eq!(std::fs::read_to_string(tmp.path().join("app.env"))?, "HOST=db\n");
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("app.yaml"))?,
		"host: {{HOST}}\n"
	);
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("vendor/lib.env"))?,
		"HOST={{HOST}}\n"
	);

	Ok(())
}

#[test]
fn dry_run_lists_files_without_writing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("app.yaml"), "name: <::NAME::>\n")?;

	common::charmap_cmd()
		.arg("--dir")
		.arg(tmp.path())
		.args(["--source", "flag", "--set", "NAME=svc", "--dry-run"])
		.assert()
		.success()
		.stdout(contains("Dry run: would update 1 file(s)"))
		.stdout(contains("app.yaml"));

	let content = std::fs::read_to_string(tmp.path().join("app.yaml"))?;
	assert_eq!(content, "name: <::NAME::>\n");

	Ok(())
}

#[test]
fn atomic_flag_rewrites_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("app.yaml"), "name: <::NAME::>\n")?;

	common::charmap_cmd()
		.arg("--dir")
		.arg(tmp.path())
		.args(["--source", "flag", "--set", "NAME=svc", "--atomic", "--workers", "1"])
		.assert()
		.success();

	let content = std::fs::read_to_string(tmp.path().join("app.yaml"))?;
	assert_eq!(content, "name: svc\n");
	assert_eq!(std::fs::read_dir(tmp.path())?.count(), 1);

	Ok(())
}

#[test]
fn nothing_to_replace_succeeds() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("static.yaml"), "replicas: 3\n")?;

	common::charmap_cmd()
		.arg("--dir")
		.arg(tmp.path())
		.args(["--source", "flag"])
		.assert()
		.success()
		.stdout(contains("No placeholders to replace."));

	Ok(())
}

#[test]
fn log_file_records_processed_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let tree = tmp.path().join("tree");
	std::fs::create_dir_all(&tree)?;
	std::fs::write(tree.join("app.yaml"), "name: <::NAME::>\n")?;
	let log = tmp.path().join("charmap.log");

	common::charmap_cmd()
		.arg("--dir")
		.arg(&tree)
		.arg("--log")
		.arg(&log)
		.args(["--source", "flag", "--set", "NAME=s3cr3t-value"])
		.assert()
		.success();

	let content = std::fs::read_to_string(&log)?;
	assert!(content.contains("starting charmap"), "{content}");
	assert!(content.contains("processed file"), "{content}");
	assert!(content.contains("app.yaml"), "{content}");
	assert!(!content.contains("s3cr3t-value"), "values must not be logged: {content}");

	Ok(())
}
