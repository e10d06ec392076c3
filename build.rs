//! Build script that renders man pages from the clap definitions.
//!
//! Writes `conf-sync.1` plus one `conf-sync-<command>.1` page per subcommand
//! into the build output directory for packaging.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn render(man: Man, target: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(target, buffer)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or("OUT_DIR was not set")?;

    let root = Cli::command();
    for sub in root.get_subcommands() {
        let page_name = format!("conf-sync-{}", sub.get_name());
        let target = out_dir.join(format!("{page_name}.1"));
        render(Man::new(sub.clone()).title(page_name), &target)?;
    }
    render(Man::new(root), &out_dir.join("conf-sync.1"))?;

    Ok(())
}
