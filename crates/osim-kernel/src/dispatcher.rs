//! Notification-driven dispatch loop and quantum timers.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};

use crate::peer::{ComputeUnit, InterruptReason, MemoryService};
use crate::types::ThreadId;
use crate::Kernel;

/// One Ready → Executing transition. `seq` grows with every dispatch, so a
/// thread that is preempted and dispatched again gets a new `Dispatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub thread: ThreadId,
    pub seq: u64,
}

impl<M: MemoryService, C: ComputeUnit> Kernel<M, C> {
    /// Runs forever. Sleeps until some transition may have made a dispatch
    /// possible, then tries again.
    pub async fn run_dispatcher(self: Arc<Self>) {
        info!("dispatcher started - algorithm: {}", self.scheduler.name());
        loop {
            if !self.dispatch_once().await {
                self.wakeup.notified().await;
            }
        }
    }

    /// Dispatches one thread if the Executing slot is free, the gate is open
    /// and Ready is non-empty. Returns whether a thread was dispatched.
    pub async fn dispatch_once(self: &Arc<Self>) -> bool {
        let dispatch = self.state.lock().begin_dispatch(self.scheduler.as_ref());
        let Some(dispatch) = dispatch else {
            return false;
        };

        if let Some(quantum) = self.scheduler.quantum() {
            self.start_quantum(dispatch, quantum);
        }
        if let Err(err) = self.cpu.dispatch(dispatch.thread).await {
            error!("{} - dispatch not delivered: {}", dispatch.thread, err);
        }
        true
    }

    fn start_quantum(self: &Arc<Self>, dispatch: Dispatch, quantum: Duration) {
        let kernel = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(quantum).await;
            let current = kernel.state.lock().is_current(dispatch);
            if current {
                kernel
                    .interrupt(dispatch.thread, InterruptReason::Quantum)
                    .await;
            } else {
                debug!(
                    "{} - quantum of dispatch #{} expired off the CPU",
                    dispatch.thread, dispatch.seq
                );
            }
        });
    }
}
