use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;

// The command tree is plain clap derive, so the build script can compile it directly.
#[path = "src/cli.rs"]
mod cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::other("OUT_DIR is unset"))?;
    let man_dir = out_dir.join("man");
    std::fs::create_dir_all(&man_dir)?;

    // One page per visible command, named `syncly-todos-add.1` and so on.
    let mut queue = vec![cli::Cli::command()];
    while let Some(cmd) = queue.pop() {
        write_page(&cmd, &man_dir)?;
        let parent = cmd.get_name().to_owned();
        queue.extend(
            cmd.get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| {
                    let name = format!("{parent}-{}", sub.get_name());
                    sub.clone().name(name)
                }),
        );
    }
    Ok(())
}

fn write_page(cmd: &clap::Command, dir: &Path) -> io::Result<()> {
    let mut page = Vec::new();
    clap_mangen::Man::new(cmd.clone()).render(&mut page)?;
    std::fs::write(dir.join(format!("{}.1", cmd.get_name())), page)
}
