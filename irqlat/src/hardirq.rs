use anyhow::Result;
use aya::Ebpf;

use crate::attach::{attach_hook, AttachMode, Hook};
use crate::helpers::{snapshot_lines, write_cgroup_slot};
use crate::typedefs::{TraceOptions, Tracer};

const ENTRY: Hook = Hook {
    tracepoint: "irq_handler_entry",
    typed_program: "handle_entry_btf",
    raw_program: "handle_entry_raw",
};

const EXIT: Hook = Hook {
    tracepoint: "irq_handler_exit",
    typed_program: "handle_exit_btf",
    raw_program: "handle_exit_raw",
};

pub struct Hardirq<'a> {
    bpf: &'a mut Ebpf,
    opts: TraceOptions,
}

impl<'a> Hardirq<'a> {
    pub fn new(bpf: &'a mut Ebpf, opts: TraceOptions) -> Self {
        Hardirq { bpf, opts }
    }
}

impl Tracer for Hardirq<'_> {
    fn attach(&mut self) -> Result<()> {
        write_cgroup_slot(self.bpf, &self.opts)?;
        let mode = AttachMode::detect();
        attach_hook(self.bpf, &mode, &ENTRY)?;
        // counting mode accounts at entry only
        if !self.opts.count_only {
            attach_hook(self.bpf, &mode, &EXIT)?;
        }
        Ok(())
    }

    fn report_lines(&mut self) -> Result<Vec<String>> {
        snapshot_lines(self.bpf, &self.opts)
    }
}
