use anyhow::{Context as _, Result};
use aya::programs::{BtfTracePoint, RawTracePoint};
use aya::{Btf, Ebpf};
use log::{debug, warn};

/// Attachment strategy, chosen once at load time. Typed tracepoints need
/// kernel BTF; raw tracepoints work everywhere. Both variants of every
/// program run the same recording logic, so the choice never changes
/// observable behavior.
pub enum AttachMode {
    Typed(Btf),
    Raw,
}

impl AttachMode {
    pub fn detect() -> AttachMode {
        match Btf::from_sys_fs() {
            Ok(btf) => AttachMode::Typed(btf),
            Err(err) => {
                debug!("kernel BTF unavailable ({err}), using raw tracepoints");
                AttachMode::Raw
            }
        }
    }
}

pub struct Hook {
    pub tracepoint: &'static str,
    pub typed_program: &'static str,
    pub raw_program: &'static str,
}

pub fn attach_hook(bpf: &mut Ebpf, mode: &AttachMode, hook: &Hook) -> Result<()> {
    match mode {
        AttachMode::Typed(btf) => match attach_typed(bpf, btf, hook) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(
                    "typed attach of {} failed ({err:#}), falling back to raw",
                    hook.tracepoint
                );
                attach_raw(bpf, hook)
            }
        },
        AttachMode::Raw => attach_raw(bpf, hook),
    }
}

fn attach_typed(bpf: &mut Ebpf, btf: &Btf, hook: &Hook) -> Result<()> {
    let program: &mut BtfTracePoint = bpf
        .program_mut(hook.typed_program)
        .with_context(|| format!("program {} not found", hook.typed_program))?
        .try_into()?;
    program.load(hook.tracepoint, btf)?;
    program.attach()?;
    Ok(())
}

fn attach_raw(bpf: &mut Ebpf, hook: &Hook) -> Result<()> {
    let program: &mut RawTracePoint = bpf
        .program_mut(hook.raw_program)
        .with_context(|| format!("program {} not found", hook.raw_program))?
        .try_into()?;
    program.load()?;
    program.attach(hook.tracepoint)?;
    Ok(())
}
