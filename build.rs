//! Renders the `mooring` manual pages into `OUT_DIR`.
//!
//! `mooring.1` documents the command itself; `mooring-render.1` and
//! `mooring-apply.1` document each fixture subcommand.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Command, CommandFactory};
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
#[expect(dead_code, reason = "the build script only needs the parser definition")]
mod cli;

use cli::Cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir =
        PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "OUT_DIR was not set")
        })?);

    let command = Cli::command();
    write_page(&out_dir, "mooring", command.clone())?;
    for subcommand in command.get_subcommands() {
        let name = format!("mooring-{}", subcommand.get_name());
        write_page(&out_dir, &name, subcommand.clone())?;
    }

    Ok(())
}

fn write_page(out_dir: &Path, name: &str, command: Command) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    Man::new(command).title(name).render(&mut buffer)?;
    File::create(out_dir.join(format!("{name}.1")))?.write_all(&buffer)
}
