mod admission;
pub mod pcb;
mod syscalls;

pub use pcb::{PendingProcess, ProcessControlBlock, ProcessTable};
