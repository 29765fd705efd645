use std::fs;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, ValueEnum};
use clap_complete::Shell;

// cli.rs only depends on clap, so it can be compiled here on its own.
#[path = "src/cli.rs"]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir: PathBuf =
        std::env::var_os("OUT_DIR").expect("OUT_DIR not set by Cargo").into();

    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("failed to create man output directory");
    let completions_dir = out_dir.join("completions");
    fs::create_dir_all(&completions_dir).expect("failed to create completions directory");

    let cmd = cli::Cli::command();
    generate_manpages(&cmd, &man_dir);
    generate_completions(&cmd, &completions_dir);
}

/// Recursively generate man pages for a command and all its subcommands.
fn generate_manpages(cmd: &clap::Command, dir: &Path) {
    let name = cmd.get_name().to_owned();
    let path = dir.join(format!("{name}.1"));

    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd.clone())
        .render(&mut buf)
        .unwrap_or_else(|e| panic!("failed to render man page for `{name}`: {e}"));
    fs::write(&path, buf).unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));

    for sub in cmd.get_subcommands() {
        if sub.is_hide_set() {
            continue;
        }
        let sub = sub.clone().name(format!("{name}-{}", sub.get_name()));
        generate_manpages(&sub, dir);
    }
}

fn generate_completions(cmd: &clap::Command, dir: &Path) {
    for shell in Shell::value_variants() {
        let mut cmd = cmd.clone();
        clap_complete::generate_to(*shell, &mut cmd, "nurtura", dir)
            .unwrap_or_else(|e| panic!("failed to generate {shell} completions: {e}"));
    }
}
