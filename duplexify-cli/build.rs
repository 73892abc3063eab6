//! Renders the `duplexify(1)` man page into `OUT_DIR` from the clap definition.

use clap::CommandFactory;
use std::path::PathBuf;

#[path = "src/cli.rs"]
mod cli;

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR").map(PathBuf::from) else {
        return Err(std::io::ErrorKind::NotFound.into());
    };

    let command = cli::Cli::command();
    let page = out_dir.join(format!("{}.1", command.get_name()));

    let mut rendered = Vec::new();
    clap_mangen::Man::new(command).render(&mut rendered)?;
    std::fs::write(page, rendered)
}
