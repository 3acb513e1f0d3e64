use log::{info, warn};

use crate::error::KernelError;
use crate::peer::{ComputeUnit, MemoryService};
use crate::thread::{BlockReason, Queue};
use crate::types::{Pid, Priority, ThreadId, Tid};
use crate::Kernel;

impl<M: MemoryService, C: ComputeUnit> Kernel<M, C> {
    pub(crate) async fn process_create(
        &self,
        caller: ThreadId,
        path: String,
        size: u32,
        priority: Priority,
    ) -> Result<(), KernelError> {
        let pid = self.state.lock().create_process(path, size, priority);
        let admitted = self.admit(Some(pid)).await;
        self.resume(caller).await?;
        admitted
    }

    /// Only the main thread may end its process.
    pub(crate) async fn process_exit(&self, caller: ThreadId) -> Result<(), KernelError> {
        if caller.tid != Tid::MAIN {
            self.resume(caller).await?;
            return Err(KernelError::NotMainThread(caller));
        }
        self.exit_process(caller.pid).await
    }

    /// Exit cascade for every live thread of `pid`, memory release, then a
    /// new admission round for whatever waits in Pending-Admission.
    pub(crate) async fn exit_process(&self, pid: Pid) -> Result<(), KernelError> {
        let threads = self.transact(|state| state.exit_process(pid)).await?;
        for id in threads {
            self.memory.terminate_thread(id).await?;
        }
        self.memory.terminate_process(pid).await?;
        self.admit(None).await
    }

    pub(crate) async fn dump_memory(&self, caller: ThreadId) -> Result<(), KernelError> {
        self.transact(|state| state.block(caller, BlockReason::DumpMemory))
            .await?;
        if self.memory.dump_memory(caller).await? {
            self.transact(|state| state.make_ready(caller, Queue::Blocked(BlockReason::DumpMemory)))
                .await
        } else {
            warn!("{} - memory dump failed, finishing process", caller);
            self.exit_process(caller.pid).await
        }
    }

    pub(crate) async fn segmentation_fault(&self, caller: ThreadId) -> Result<(), KernelError> {
        info!("{} - segmentation fault, finishing process", caller);
        self.exit_process(caller.pid).await
    }
}
