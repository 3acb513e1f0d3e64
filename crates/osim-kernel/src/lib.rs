pub mod dispatcher;
pub mod error;
pub mod peer;
pub mod process;
pub mod state;
pub mod sync;
pub mod syscall;
pub mod thread;
pub mod types;

pub use crate::error::{ErrorKind, KernelError, PeerError};
pub use crate::peer::{ComputeUnit, InterruptReason, MemoryService, MemoryVerdict};
pub use crate::state::{MutexSnapshot, SchedulerState, Snapshot};
pub use crate::syscall::Syscall;
pub use crate::thread::{Algorithm, BlockReason, Queue};
pub use crate::types::{Pid, Priority, ThreadId, Tid};

use log::{error, info};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::thread::Scheduler;

/// The scheduler/kernel service core.
///
/// Shared behind an `Arc` between the dispatcher task, the timer tasks and
/// every request handler. All scheduling state lives in one
/// [`SchedulerState`] behind a synchronous lock that is never held across an
/// `.await`; outbound calls to the peers happen outside of it.
pub struct Kernel<M, C> {
    state: Mutex<SchedulerState>,
    scheduler: Box<dyn Scheduler>,
    /// Signalled by every transition that may let the dispatcher run.
    wakeup: Notify,
    /// Serializes admission negotiations with memory.
    admission: tokio::sync::Mutex<()>,
    memory: M,
    cpu: C,
}

impl<M: MemoryService, C: ComputeUnit> Kernel<M, C> {
    pub fn new(algorithm: Algorithm, memory: M, cpu: C) -> Self {
        Self {
            state: Mutex::new(SchedulerState::new()),
            scheduler: algorithm.into_scheduler(),
            wakeup: Notify::new(),
            admission: tokio::sync::Mutex::new(()),
            memory,
            cpu,
        }
    }

    pub fn scheduler_name(&self) -> &'static str {
        self.scheduler.name()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().snapshot()
    }

    /// Creates the initial process with priority 0 and admits it.
    pub async fn bootstrap(&self, path: &str, size: u32) -> Result<Pid, KernelError> {
        let pid = self.state.lock().create_process(path.to_string(), size, 0);
        self.admit(Some(pid)).await?;
        Ok(pid)
    }

    /// Applies `f` as one atomic transition, wakes the dispatcher and sends
    /// the priority interrupt the transition calls for, if any.
    pub(crate) async fn transact<T, F>(&self, f: F) -> Result<T, KernelError>
    where
        F: FnOnce(&mut SchedulerState) -> Result<T, KernelError>,
    {
        let (result, preempt) = {
            let mut state = self.state.lock();
            let result = f(&mut *state);
            let preempt = state.take_preemption(self.scheduler.as_ref());
            (result, preempt)
        };
        self.wakeup.notify_one();
        if let Some(id) = preempt {
            self.interrupt(id, InterruptReason::Priority).await;
        }
        result
    }

    pub(crate) fn set_compaction_gate(&self, open: bool) {
        self.state.lock().set_compaction_gate(open);
        if open {
            self.wakeup.notify_one();
        }
    }

    /// Lets the compute unit continue running `id` if it still owns the CPU.
    pub(crate) async fn resume(&self, id: ThreadId) -> Result<(), KernelError> {
        let running = self.state.lock().queues.is_executing(id);
        if running {
            self.cpu.dispatch(id).await?;
        }
        Ok(())
    }

    pub(crate) async fn interrupt(&self, id: ThreadId, reason: InterruptReason) {
        info!("{} - interrupted by: {}", id, reason);
        if let Err(err) = self.cpu.interrupt(id, reason).await {
            error!("{} - interrupt {} not delivered: {}", id, reason, err);
        }
    }
}
