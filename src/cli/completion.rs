use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use super::Args;

/// Writes the completion script for the given shell to stdout
pub fn generate_completion(shell: Shell) {
    let mut cmd = Args::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
