use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::KernelError;
use crate::peer::{ComputeUnit, MemoryService};
use crate::thread::{BlockReason, Queue};
use crate::types::{Pid, Priority, ThreadId, Tid};
use crate::Kernel;

impl<M: MemoryService, C: ComputeUnit> Kernel<M, C> {
    pub(crate) async fn thread_create(
        &self,
        caller: ThreadId,
        path: String,
        priority: Priority,
    ) -> Result<(), KernelError> {
        let created = self.spawn_thread(caller.pid, &path, priority).await;
        self.resume(caller).await?;
        created.map(|_| ())
    }

    async fn spawn_thread(
        &self,
        pid: Pid,
        path: &str,
        priority: Priority,
    ) -> Result<ThreadId, KernelError> {
        let tid = self.state.lock().processes.get_mut(pid)?.allocate_tid();
        let id = ThreadId::new(pid, tid);
        self.memory.create_thread(id, path).await?;
        self.transact(|state| state.add_thread(id, priority)).await?;
        info!("{} created - priority {}", id, priority);
        Ok(id)
    }

    /// Exit cascade for one thread, then releases its memory.
    pub(crate) async fn thread_exit(&self, id: ThreadId) -> Result<(), KernelError> {
        self.transact(|state| state.exit_thread(id)).await?;
        self.memory.terminate_thread(id).await?;
        Ok(())
    }

    pub(crate) async fn thread_cancel(
        &self,
        caller: ThreadId,
        target: Tid,
    ) -> Result<(), KernelError> {
        let target = ThreadId::new(caller.pid, target);
        let cancelled = self.thread_exit(target).await;
        if let Err(err) = &cancelled {
            warn!("{} - cancel of {} rejected: {}", caller, target, err);
        }
        self.resume(caller).await?;
        cancelled
    }

    pub(crate) async fn thread_join(&self, caller: ThreadId, target: Tid) -> Result<(), KernelError> {
        let target = ThreadId::new(caller.pid, target);
        let joined = self.transact(|state| state.join(caller, target)).await;
        match joined {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!("{} - join target {} is not alive", caller, target);
                self.resume(caller).await
            }
            Err(err) => {
                self.resume(caller).await?;
                Err(err)
            }
        }
    }

    /// Blocks the caller for `duration`; an independent timer makes it Ready.
    pub(crate) async fn io(self: &Arc<Self>, caller: ThreadId, duration: Duration) -> Result<(), KernelError> {
        self.transact(|state| state.block(caller, BlockReason::Io))
            .await?;
        let kernel = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let woken = kernel
                .transact(|state| state.make_ready(caller, Queue::Blocked(BlockReason::Io)))
                .await;
            match woken {
                Ok(()) => info!("{} - finished IO", caller),
                Err(err) => debug!("{} - IO wakeup skipped: {}", caller, err),
            }
        });
        Ok(())
    }

    /// The compute unit stopped `id` after an interrupt.
    pub(crate) async fn preempted(&self, id: ThreadId, reason: &str) -> Result<(), KernelError> {
        info!("{} - preempted by: {}", id, reason);
        self.transact(|state| state.make_ready(id, Queue::Executing))
            .await
    }
}
