#![no_std]
#![no_main]

mod bindings;

use aya_ebpf::{
    helpers::bpf_probe_read_kernel,
    macros::{btf_tracepoint, map, raw_tracepoint},
    maps::{Array, HashMap, PerCpuArray},
    programs::{BtfTracePointContext, RawTracePointContext},
    EbpfContext,
};
use bindings::irqaction;
use irqlat_common::{AggRecord, CgroupSlot, HandlerKey, RunConfig, AGGREGATE_CAPACITY};
use irqlat_ebpf_core::{handler_key_from_name, record_entry, record_exit};

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

#[inline(always)]
fn action_key(action: *const irqaction) -> HandlerKey {
    if action.is_null() {
        return HandlerKey::EMPTY;
    }
    let name = unsafe { bpf_probe_read_kernel(core::ptr::addr_of!((*action).name)) }
        .unwrap_or(core::ptr::null());
    handler_key_from_name(name)
}

// irq_handler_entry and irq_handler_exit both carry the irqaction as the
// second tracepoint argument.

#[btf_tracepoint(function = "irq_handler_entry")]
pub fn handle_entry_btf(ctx: BtfTracePointContext) -> u32 {
    let action: *const irqaction = unsafe { ctx.arg(1) };
    record_entry(
        &config(),
        &CGROUP_ALLOW,
        &STARTS,
        &AGGREGATES,
        &action_key(action),
    );
    0
}

#[btf_tracepoint(function = "irq_handler_exit")]
pub fn handle_exit_btf(ctx: BtfTracePointContext) -> u32 {
    let action: *const irqaction = unsafe { ctx.arg(1) };
    record_exit(
        &config(),
        &CGROUP_ALLOW,
        &STARTS,
        &AGGREGATES,
        &action_key(action),
    );
    0
}

#[raw_tracepoint(tracepoint = "irq_handler_entry")]
pub fn handle_entry_raw(ctx: RawTracePointContext) -> u32 {
    let args = ctx.as_ptr() as *const u64;
    let action = unsafe { *args.add(1) } as usize as *const irqaction;
    record_entry(
        &config(),
        &CGROUP_ALLOW,
        &STARTS,
        &AGGREGATES,
        &action_key(action),
    );
    0
}

#[raw_tracepoint(tracepoint = "irq_handler_exit")]
pub fn handle_exit_raw(ctx: RawTracePointContext) -> u32 {
    let args = ctx.as_ptr() as *const u64;
    let action = unsafe { *args.add(1) } as usize as *const irqaction;
    record_exit(
        &config(),
        &CGROUP_ALLOW,
        &STARTS,
        &AGGREGATES,
        &action_key(action),
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
