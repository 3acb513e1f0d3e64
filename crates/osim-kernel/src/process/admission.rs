use log::{debug, info};

use crate::error::KernelError;
use crate::peer::{ComputeUnit, MemoryService, MemoryVerdict};
use crate::types::{Pid, ThreadId, Tid};
use crate::Kernel;

impl<M: MemoryService, C: ComputeUnit> Kernel<M, C> {
    /// Negotiates initial memory for the head of the Pending-Admission queue.
    ///
    /// With a `candidate`, nothing happens unless that process is the head,
    /// and the call returns once it is admitted. Without one, heads keep being
    /// admitted until the queue empties or memory runs out of space.
    pub(crate) async fn admit(&self, candidate: Option<Pid>) -> Result<(), KernelError> {
        let _turn = self.admission.lock().await;
        loop {
            let head = self
                .state
                .lock()
                .processes
                .pending_head()
                .map(|p| (p.pid(), p.size, p.path.clone()));
            let Some((pid, size, path)) = head else {
                return Ok(());
            };
            if let Some(candidate) = candidate.filter(|c| *c != pid) {
                debug!(
                    "(<PID:{}>) waits for admission behind (<PID:{}>)",
                    candidate, pid
                );
                return Ok(());
            }

            match self.memory.create_process(pid, size).await? {
                MemoryVerdict::HasSpace => {
                    self.memory
                        .create_thread(ThreadId::new(pid, Tid::MAIN), &path)
                        .await?;
                    let main = self.transact(|state| state.admit_process(pid)).await?;
                    info!("(<PID:{}>) admitted - main thread {}", pid, main);
                    if candidate.is_some() {
                        return Ok(());
                    }
                }
                MemoryVerdict::NeedsCompaction => {
                    info!("(<PID:{}>) - compaction requested", pid);
                    self.set_compaction_gate(false);
                    let compacted = self.memory.compact().await;
                    self.set_compaction_gate(true);
                    compacted?;
                }
                MemoryVerdict::NoSpace => {
                    info!("(<PID:{}>) - memory has no partition available", pid);
                    return Ok(());
                }
            }
        }
    }
}
