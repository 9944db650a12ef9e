#![allow(non_camel_case_types)]

// Field order follows include/linux/interrupt.h; only `name` is read,
// and only through bpf_probe_read_kernel.

use core::ffi::c_void;

#[repr(C)]
pub struct irqaction {
    pub handler: *mut c_void,
    pub dev_id: *mut c_void,
    pub percpu_dev_id: *mut c_void,
    pub next: *mut irqaction,
    pub thread_fn: *mut c_void,
    pub thread: *mut c_void,
    pub secondary: *mut irqaction,
    pub irq: u32,
    pub flags: u32,
    pub thread_flags: u64,
    pub thread_mask: u64,
    pub name: *const u8,
    pub dir: *mut c_void,
}
