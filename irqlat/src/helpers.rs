use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

use anyhow::{ensure, Context as _, Result};
use aya::maps::{Array, HashMap, MapData};
use aya::Ebpf;
use log::info;

use crate::render;
use crate::typedefs::TraceOptions;
use irqlat_common::{AggRecord, CgroupSlot, HandlerKey};

const CGROUP_ROOT: &str = "/sys/fs/cgroup";

pub fn resolve_cgroup(path: &Path) -> Result<CgroupSlot> {
    let canonical =
        fs::canonicalize(path).with_context(|| format!("cgroup path {}", path.display()))?;
    let meta = fs::metadata(&canonical)?;
    ensure!(
        meta.is_dir(),
        "{} is not a cgroup directory",
        canonical.display()
    );
    Ok(CgroupSlot {
        id: meta.ino(),
        level: cgroup_level(&canonical),
    })
}

// Ancestor level for bpf_get_current_ancestor_cgroup_id: the cgroup root
// is level 0, each path component below the cgroup2 mount adds one.
pub fn cgroup_level(path: &Path) -> u64 {
    let rel = path.strip_prefix(CGROUP_ROOT).unwrap_or(path);
    rel.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count() as u64
}

pub fn bpf_object_path(object: &str) -> PathBuf {
    if let Ok(dir) = std::env::var("IRQLAT_BPF_DIR") {
        return Path::new(&dir).join(object);
    }
    #[cfg(debug_assertions)]
    let profile = "debug";
    #[cfg(not(debug_assertions))]
    let profile = "release";
    ["target", "bpfel-unknown-none", profile, object]
        .iter()
        .collect()
}

pub fn wallclock_hms() -> String {
    // UTC, second resolution; enough to line up interval reports
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let secs = now % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

pub fn write_cgroup_slot(bpf: &mut Ebpf, opts: &TraceOptions) -> Result<()> {
    let slot = match opts.cgroup {
        Some(slot) => slot,
        None => return Ok(()),
    };
    let mut allow: Array<&mut MapData, CgroupSlot> = Array::try_from(
        bpf.map_mut("CGROUP_ALLOW")
            .context("CGROUP_ALLOW map missing")?,
    )?;
    allow.set(0, slot, 0)?;
    info!("filtering to cgroup id {} (level {})", slot.id, slot.level);
    Ok(())
}

pub fn snapshot_lines(bpf: &mut Ebpf, opts: &TraceOptions) -> Result<Vec<String>> {
    let aggregates: HashMap<&MapData, HandlerKey, AggRecord> =
        HashMap::try_from(bpf.map("AGGREGATES").context("AGGREGATES map missing")?)?;

    let mut rows = Vec::new();
    for entry in aggregates.iter() {
        let (key, record) = entry?;
        rows.push((key.as_str().to_string(), record));
    }

    let unit = render::unit_label(opts.nanoseconds);
    if opts.count_only {
        let mut counts: Vec<(String, u64)> =
            rows.into_iter().map(|(name, r)| (name, r.count)).collect();
        return Ok(render::counter_table(&mut counts, "COUNT"));
    }
    if !opts.distribution {
        let mut totals: Vec<(String, u64)> =
            rows.into_iter().map(|(name, r)| (name, r.count)).collect();
        return Ok(render::counter_table(&mut totals, &format!("TIME({unit})")));
    }

    rows.sort_by(|a, b| a.0.cmp(&b.0));
    let mut lines = Vec::new();
    for (name, record) in &rows {
        let hist = render::log2_histogram(name, &record.slots, unit);
        if hist.is_empty() {
            continue;
        }
        lines.extend(hist);
        lines.push(String::new());
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cgroup_level_counts_components_below_the_mount() {
        assert_eq!(cgroup_level(Path::new("/sys/fs/cgroup")), 0);
        assert_eq!(cgroup_level(Path::new("/sys/fs/cgroup/system.slice")), 1);
        assert_eq!(
            cgroup_level(Path::new("/sys/fs/cgroup/kubepods/pod1/ctr")),
            3
        );
    }

    #[test]
    fn object_path_ends_with_the_object_name() {
        let path = bpf_object_path("irqlat-hardirq");
        assert!(path.ends_with("irqlat-hardirq"));
    }

    #[test]
    fn wallclock_is_hh_mm_ss() {
        let stamp = wallclock_hms();
        assert_eq!(stamp.len(), 8);
        assert_eq!(stamp.as_bytes()[2], b':');
        assert_eq!(stamp.as_bytes()[5], b':');
    }
}
