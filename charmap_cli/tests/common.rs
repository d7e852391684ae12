use assert_cmd::Command;

pub fn charmap_cmd() -> Command {
	let mut cmd =
		Command::cargo_bin("charmap").unwrap_or_else(|e| panic!("charmap binary not built: {e}"));
	cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
	cmd
}
