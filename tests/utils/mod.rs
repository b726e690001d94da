use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub fn run_shortform_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_shortform"));
    cmd.args(args)
        .env("HOME", env.home())
        .env("XDG_CONFIG_HOME", env.config_home())
        .env("XDG_CACHE_HOME", env.cache_home())
        .env("NO_COLOR", "1");

    let output = cmd.output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
