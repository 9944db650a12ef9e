use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use aya::{Ebpf, EbpfLoader};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use tokio::{signal, time};

mod attach;
mod hardirq;
mod helpers;
mod render;
mod softirq;
mod typedefs;

use irqlat_common::RunConfig;
use typedefs::{TraceOptions, Tracer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[clap(long, global = true, default_value = "0", required = false, help = "Trace duration in seconds. A value less or equal to 0 means running until Ctrl-C.")]
    duration: i64,

    #[clap(short, long, global = true, default_value = "0", required = false, help = "Print a cumulative report every N seconds. 0 prints only the final report.")]
    interval: u64,

    #[clap(short = 'T', long, global = true, help = "Prefix every report with the time of day")]
    timestamp: bool,

    #[clap(long, global = true, default_value = "false", required = false, help = "Display progress bar")]
    progress: bool,

    #[clap(short = 'C', long, global = true, conflicts_with = "dist", help = "Count handler invocations instead of measuring latency")]
    count: bool,

    #[clap(short = 'd', long, global = true, help = "Aggregate latencies into per-handler log2 histograms")]
    dist: bool,

    #[clap(short = 'N', long, global = true, help = "Report latencies in nanoseconds instead of microseconds")]
    nanoseconds: bool,

    #[clap(short = 'c', long, global = true, help = "Only account handlers running inside this cgroup (cgroup2 path)")]
    cgroup: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace hardware interrupt handlers
    Hard,
    /// Trace softirq handlers
    Soft,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            filter_cgroup: self.cgroup.is_some() as u8,
            count_only: self.count as u8,
            distribution: self.dist as u8,
            nanoseconds: self.nanoseconds as u8,
        }
    }

    fn print_report(&self, tracer: &mut dyn Tracer) -> Result<()> {
        if self.timestamp {
            println!("{}", helpers::wallclock_hms());
        }
        for line in tracer.report_lines()? {
            println!("{line}");
        }
        Ok(())
    }

    async fn wait_and_report(&self, tracer: &mut dyn Tracer) -> Result<()> {
        let bar = if self.duration > 0 && self.progress {
            let bar = ProgressBar::new(self.duration as u64);
            bar.set_style(ProgressStyle::with_template("[{elapsed}/{duration}] {wide_bar}")?);
            Some(bar)
        } else {
            None
        };
        if self.duration <= 0 {
            info!("Waiting for Ctrl-C...");
        }

        let mut elapsed: i64 = 0;
        loop {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Exiting...");
                    break;
                }
                _ = time::sleep(Duration::from_secs(1)) => {}
            }
            elapsed += 1;
            if let Some(bar) = &bar {
                bar.inc(1);
            }
            if self.interval > 0 && elapsed % self.interval as i64 == 0 {
                self.print_report(tracer)?;
                println!();
            }
            if self.duration > 0 && elapsed >= self.duration {
                break;
            }
        }
        if let Some(bar) = &bar {
            bar.finish_and_clear();
        }
        Ok(())
    }
}

fn init() -> HashMap<&'static str, PathBuf> {
    env_logger::init();

    let rlim = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!("remove limit on locked memory failed, ret is: {}", ret);
    }

    let mut bpf_objects: HashMap<&str, PathBuf> = HashMap::new();
    bpf_objects.insert("hard", helpers::bpf_object_path("irqlat-hardirq"));
    bpf_objects.insert("soft", helpers::bpf_object_path("irqlat-softirq"));

    bpf_objects
}

fn load_object(path: &Path, config: &RunConfig) -> Result<Ebpf> {
    EbpfLoader::new()
        .set_global("CONFIG", config, true)
        .load_file(path)
        .with_context(|| format!("loading BPF object {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let bpf_objects = init();

    let cgroup = match &cli.cgroup {
        Some(path) => Some(helpers::resolve_cgroup(path)?),
        None => None,
    };
    let opts = TraceOptions {
        count_only: cli.count,
        distribution: cli.dist,
        nanoseconds: cli.nanoseconds,
        cgroup,
    };
    let config = cli.run_config();

    let mut bpf: Ebpf;
    let mut tracer: Box<dyn Tracer> = match &cli.command {
        Some(Commands::Hard) => {
            bpf = load_object(&bpf_objects["hard"], &config)?;
            Box::new(hardirq::Hardirq::new(&mut bpf, opts))
        }
        Some(Commands::Soft) => {
            bpf = load_object(&bpf_objects["soft"], &config)?;
            Box::new(softirq::Softirq::new(&mut bpf, opts))
        }
        None => {
            return Err(anyhow::Error::msg("subcommand"));
        }
    };

    tracer.attach()?;
    cli.wait_and_report(tracer.as_mut()).await?;
    cli.print_report(tracer.as_mut())?;

    Ok(())
}
