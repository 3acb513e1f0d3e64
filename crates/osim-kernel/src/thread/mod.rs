pub mod queues;
pub mod scheduler;
mod syscalls;
pub mod tcb;

pub use queues::ThreadQueues;
pub use scheduler::{Algorithm, Scheduler};
pub use tcb::{BlockReason, Queue, ThreadControlBlock};
