use std::process::Command;

use anyhow::{ensure, Context as _, Result};
use clap::{Parser, Subcommand};

const EBPF_PACKAGES: [&str; 2] = ["irqlat-ebpf-hardirq", "irqlat-ebpf-softirq"];

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the eBPF objects for bpfel-unknown-none
    BuildEbpf {
        #[arg(long)]
        release: bool,
    },
    /// Build the eBPF objects and the userland binary
    Build {
        #[arg(long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    match args.cmd {
        Commands::BuildEbpf { release } => build_ebpf(release),
        Commands::Build { release } => {
            build_ebpf(release)?;
            build_user(release)
        }
    }
}

fn build_ebpf(release: bool) -> Result<()> {
    for package in EBPF_PACKAGES {
        let mut cmd = Command::new("cargo");
        cmd.current_dir(package).args([
            "+nightly",
            "build",
            "--target",
            "bpfel-unknown-none",
            "-Z",
            "build-std=core",
        ]);
        if release {
            cmd.arg("--release");
        }
        let status = cmd
            .status()
            .with_context(|| format!("running cargo for {package}"))?;
        ensure!(status.success(), "eBPF build of {package} failed");
    }
    Ok(())
}

fn build_user(release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["build", "--package", "irqlat"]);
    if release {
        cmd.arg("--release");
    }
    let status = cmd.status().context("running cargo for irqlat")?;
    ensure!(status.success(), "userland build failed");
    Ok(())
}
