#![no_std]
#![no_main]

use aya_ebpf::{
    macros::{btf_tracepoint, map, raw_tracepoint},
    maps::{Array, HashMap, PerCpuArray},
    programs::{BtfTracePointContext, RawTracePointContext},
    EbpfContext,
};
use irqlat_common::{softirq_key, AggRecord, CgroupSlot, HandlerKey, RunConfig, AGGREGATE_CAPACITY};
use irqlat_ebpf_core::{record_entry, record_exit};

#[no_mangle]
static CONFIG: RunConfig = RunConfig::new();

#[map]
static STARTS: PerCpuArray<u64> = PerCpuArray::with_max_entries(1, 0);

#[map]
static AGGREGATES: HashMap<HandlerKey, AggRecord> =
    HashMap::with_max_entries(AGGREGATE_CAPACITY, 0);

#[map]
static CGROUP_ALLOW: Array<CgroupSlot> = Array::with_max_entries(1, 0);

fn config() -> RunConfig {
    unsafe { core::ptr::read_volatile(&CONFIG) }
}

// softirq_entry and softirq_exit carry the vector number as their only
// tracepoint argument; the key comes from the fixed vector-name table.

#[btf_tracepoint(function = "softirq_entry")]
pub fn handle_entry_btf(ctx: BtfTracePointContext) -> u32 {
    let vec_nr: u32 = unsafe { ctx.arg(0) };
    record_entry(
        &config(),
        &CGROUP_ALLOW,
        &STARTS,
        &AGGREGATES,
        &softirq_key(vec_nr),
    );
    0
}

#[btf_tracepoint(function = "softirq_exit")]
pub fn handle_exit_btf(ctx: BtfTracePointContext) -> u32 {
    let vec_nr: u32 = unsafe { ctx.arg(0) };
    record_exit(
        &config(),
        &CGROUP_ALLOW,
        &STARTS,
        &AGGREGATES,
        &softirq_key(vec_nr),
    );
    0
}

#[raw_tracepoint(tracepoint = "softirq_entry")]
pub fn handle_entry_raw(ctx: RawTracePointContext) -> u32 {
    let args = ctx.as_ptr() as *const u64;
    let vec_nr = unsafe { *args } as u32;
    record_entry(
        &config(),
        &CGROUP_ALLOW,
        &STARTS,
        &AGGREGATES,
        &softirq_key(vec_nr),
    );
    0
}

#[raw_tracepoint(tracepoint = "softirq_exit")]
pub fn handle_exit_raw(ctx: RawTracePointContext) -> u32 {
    let args = ctx.as_ptr() as *const u64;
    let vec_nr = unsafe { *args } as u32;
    record_exit(
        &config(),
        &CGROUP_ALLOW,
        &STARTS,
        &AGGREGATES,
        &softirq_key(vec_nr),
    );
    0
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
