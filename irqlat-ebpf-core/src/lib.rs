#![no_std]

use aya_ebpf::{
    bindings::BPF_NOEXIST,
    helpers::{bpf_ktime_get_ns, bpf_probe_read_kernel_str_bytes, gen},
    maps::{Array, HashMap, PerCpuArray},
};
use irqlat_common::{measure, AggRecord, CgroupSlot, HandlerKey, RunConfig, Update, HIST_SLOTS};

// One in-flight timestamp per CPU. A second entry before the matching
// exit overwrites it; only the most recent entry is honored.
pub const START_SLOT: u32 = 0;

#[inline(always)]
pub fn handler_key_from_name(name: *const u8) -> HandlerKey {
    let mut key = HandlerKey::EMPTY;
    if !name.is_null() {
        // read failure leaves the empty key; the event still counts
        let _ = unsafe { bpf_probe_read_kernel_str_bytes(name, &mut key.name) };
    }
    key
}

#[inline(always)]
fn context_allowed(cfg: &RunConfig, allow: &Array<CgroupSlot>) -> bool {
    if cfg.filter_cgroup == 0 {
        return true;
    }
    let slot = match allow.get(0) {
        Some(slot) => slot,
        None => return true,
    };
    if slot.id == 0 {
        return true;
    }
    unsafe { gen::bpf_get_current_ancestor_cgroup_id(slot.level as i32) == slot.id }
}

#[inline(always)]
fn lookup_or_init(
    aggregates: &HashMap<HandlerKey, AggRecord>,
    key: &HandlerKey,
) -> Option<*mut AggRecord> {
    if let Some(record) = aggregates.get_ptr_mut(key) {
        return Some(record);
    }
    // BPF_NOEXIST: racing first-touch creators collapse onto one record.
    // At capacity the insert fails and the re-lookup stays empty.
    let _ = aggregates.insert(key, &AggRecord::ZERO, BPF_NOEXIST as u64);
    aggregates.get_ptr_mut(key)
}

#[inline(always)]
pub fn record_entry(
    cfg: &RunConfig,
    allow: &Array<CgroupSlot>,
    starts: &PerCpuArray<u64>,
    aggregates: &HashMap<HandlerKey, AggRecord>,
    key: &HandlerKey,
) {
    if !context_allowed(cfg, allow) {
        return;
    }
    if cfg.count_only != 0 {
        if let Some(record) = lookup_or_init(aggregates, key) {
            unsafe { (*record).count += 1 };
        }
        return;
    }
    if let Some(slot) = starts.get_ptr_mut(START_SLOT) {
        unsafe { *slot = bpf_ktime_get_ns() };
    }
}

#[inline(always)]
pub fn record_exit(
    cfg: &RunConfig,
    allow: &Array<CgroupSlot>,
    starts: &PerCpuArray<u64>,
    aggregates: &HashMap<HandlerKey, AggRecord>,
    key: &HandlerKey,
) {
    if !context_allowed(cfg, allow) {
        return;
    }
    let slot = match starts.get_ptr_mut(START_SLOT) {
        Some(slot) => slot,
        None => return,
    };
    let start = unsafe { *slot };
    unsafe { *slot = 0 };
    let now = unsafe { bpf_ktime_get_ns() };
    let update = match measure(cfg, start, now) {
        Some(update) => update,
        None => return,
    };
    let record = match lookup_or_init(aggregates, key) {
        Some(record) => record,
        None => return,
    };
    match update {
        Update::Total(delta) => unsafe { (*record).count += delta },
        Update::Slot(bucket) => {
            if bucket < HIST_SLOTS {
                unsafe { (*record).slots[bucket] += 1 };
            }
        }
    }
}
