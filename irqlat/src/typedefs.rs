use anyhow::Result;
use irqlat_common::CgroupSlot;

pub trait Tracer {
    fn attach(&mut self) -> Result<()>;
    fn report_lines(&mut self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy)]
pub struct TraceOptions {
    pub count_only: bool,
    pub distribution: bool,
    pub nanoseconds: bool,
    pub cgroup: Option<CgroupSlot>,
}
