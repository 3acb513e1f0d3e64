use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::error::KernelError;
use crate::peer::{ComputeUnit, MemoryService};
use crate::types::{Priority, ThreadId, Tid};
use crate::Kernel;

/// A notification from the compute unit about the thread it is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Syscall {
    ProcessCreate {
        path: String,
        size: u32,
        priority: Priority,
    },
    ProcessExit,
    ThreadCreate {
        path: String,
        priority: Priority,
    },
    ThreadExit,
    ThreadCancel {
        target: Tid,
    },
    ThreadJoin {
        target: Tid,
    },
    MutexCreate {
        name: String,
    },
    MutexLock {
        name: String,
    },
    MutexUnlock {
        name: String,
    },
    Io {
        duration: Duration,
    },
    DumpMemory,
    SegmentationFault,
    /// The compute unit gave the thread back after an interrupt.
    Preempted {
        reason: String,
    },
}

impl Syscall {
    pub fn name(&self) -> &'static str {
        match self {
            Syscall::ProcessCreate { .. } => "PROCESS_CREATE",
            Syscall::ProcessExit => "PROCESS_EXIT",
            Syscall::ThreadCreate { .. } => "THREAD_CREATE",
            Syscall::ThreadExit => "THREAD_EXIT",
            Syscall::ThreadCancel { .. } => "THREAD_CANCEL",
            Syscall::ThreadJoin { .. } => "THREAD_JOIN",
            Syscall::MutexCreate { .. } => "MUTEX_CREATE",
            Syscall::MutexLock { .. } => "MUTEX_LOCK",
            Syscall::MutexUnlock { .. } => "MUTEX_UNLOCK",
            Syscall::Io { .. } => "IO",
            Syscall::DumpMemory => "DUMP_MEMORY",
            Syscall::SegmentationFault => "SEGMENTATION_FAULT",
            Syscall::Preempted { .. } => "PREEMPTED",
        }
    }
}

impl<M: MemoryService, C: ComputeUnit> Kernel<M, C> {
    /// Applies one syscall issued by `caller`.
    ///
    /// Syscalls after which the caller keeps running end by resuming it on
    /// the compute unit, also when they are rejected.
    pub async fn handle_syscall(
        self: &Arc<Self>,
        caller: ThreadId,
        syscall: Syscall,
    ) -> Result<(), KernelError> {
        info!("{} - requested syscall <{}>", caller, syscall.name());
        match syscall {
            Syscall::ProcessCreate {
                path,
                size,
                priority,
            } => self.process_create(caller, path, size, priority).await,
            Syscall::ProcessExit => self.process_exit(caller).await,
            Syscall::ThreadCreate { path, priority } => {
                self.thread_create(caller, path, priority).await
            }
            Syscall::ThreadExit => self.thread_exit(caller).await,
            Syscall::ThreadCancel { target } => self.thread_cancel(caller, target).await,
            Syscall::ThreadJoin { target } => self.thread_join(caller, target).await,
            Syscall::MutexCreate { name } => self.mutex_create(caller, &name).await,
            Syscall::MutexLock { name } => self.mutex_lock(caller, &name).await,
            Syscall::MutexUnlock { name } => self.mutex_unlock(caller, &name).await,
            Syscall::Io { duration } => self.io(caller, duration).await,
            Syscall::DumpMemory => self.dump_memory(caller).await,
            Syscall::SegmentationFault => self.segmentation_fault(caller).await,
            Syscall::Preempted { reason } => self.preempted(caller, &reason).await,
        }
    }
}
