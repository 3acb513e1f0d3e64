//! In-memory stand-ins for the memory service and the compute unit.
//!
//! Both fakes are cheap to clone and share their recordings, so a test keeps
//! one handle while the kernel owns the other.

use std::collections::VecDeque;
use std::sync::Arc;

use log::debug;
use osim_kernel::{Algorithm, ComputeUnit, InterruptReason, Kernel, MemoryService};
use osim_kernel::{MemoryVerdict, PeerError, Pid, ThreadId, Tid};
use parking_lot::Mutex;
use tokio::sync::Notify;

pub fn id(pid: u32, tid: u32) -> ThreadId {
    ThreadId::new(Pid::new(pid), Tid::new(tid))
}

/// A kernel wired to fresh fakes, plus the test's handles on them.
pub fn fake_kernel(algorithm: Algorithm) -> (Arc<Kernel<FakeMemory, FakeCpu>>, FakeMemory, FakeCpu) {
    let memory = FakeMemory::new();
    let cpu = FakeCpu::new();
    let kernel = Kernel::new(algorithm, memory.clone(), cpu.clone());
    (Arc::new(kernel), memory, cpu)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryCall {
    CreateProcess { pid: Pid, size: u32 },
    TerminateProcess(Pid),
    CreateThread(ThreadId, String),
    TerminateThread(ThreadId),
    DumpMemory(ThreadId),
    Compact,
}

#[derive(Debug)]
struct MemoryInner {
    verdicts: VecDeque<MemoryVerdict>,
    dump_result: bool,
    unavailable: bool,
    compaction_hold: Option<Arc<Notify>>,
    calls: Vec<MemoryCall>,
}

/// Memory service answering from a scripted verdict queue; `HasSpace` once
/// the queue is empty.
#[derive(Debug, Clone)]
pub struct FakeMemory {
    inner: Arc<Mutex<MemoryInner>>,
}

impl Default for FakeMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMemory {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                verdicts: VecDeque::new(),
                dump_result: true,
                unavailable: false,
                compaction_hold: None,
                calls: Vec::new(),
            })),
        }
    }

    pub fn push_verdicts(&self, verdicts: impl IntoIterator<Item = MemoryVerdict>) {
        self.inner.lock().verdicts.extend(verdicts);
    }

    pub fn set_dump_result(&self, ok: bool) {
        self.inner.lock().dump_result = ok;
    }

    /// Every call fails with a transport error while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    /// Makes compactions wait until the returned handle is notified.
    pub fn hold_compaction(&self) -> Arc<Notify> {
        let hold = Arc::new(Notify::new());
        self.inner.lock().compaction_hold = Some(Arc::clone(&hold));
        hold
    }

    pub fn calls(&self) -> Vec<MemoryCall> {
        self.inner.lock().calls.clone()
    }

    fn record(&self, endpoint: &'static str, call: MemoryCall) -> Result<(), PeerError> {
        let mut inner = self.inner.lock();
        if inner.unavailable {
            return Err(PeerError::Transport {
                endpoint,
                reason: "connection refused".into(),
            });
        }
        debug!("memory <- {:?}", call);
        inner.calls.push(call);
        Ok(())
    }
}

impl MemoryService for FakeMemory {
    async fn create_process(&self, pid: Pid, size: u32) -> Result<MemoryVerdict, PeerError> {
        self.record("createProcess", MemoryCall::CreateProcess { pid, size })?;
        let verdict = self.inner.lock().verdicts.pop_front();
        Ok(verdict.unwrap_or(MemoryVerdict::HasSpace))
    }

    async fn terminate_process(&self, pid: Pid) -> Result<(), PeerError> {
        self.record("terminateProcess", MemoryCall::TerminateProcess(pid))
    }

    async fn create_thread(&self, id: ThreadId, path: &str) -> Result<(), PeerError> {
        self.record("createThread", MemoryCall::CreateThread(id, path.to_string()))
    }

    async fn terminate_thread(&self, id: ThreadId) -> Result<(), PeerError> {
        self.record("terminateThread", MemoryCall::TerminateThread(id))
    }

    async fn dump_memory(&self, id: ThreadId) -> Result<bool, PeerError> {
        self.record("dumpMemory", MemoryCall::DumpMemory(id))?;
        let ok = self.inner.lock().dump_result;
        Ok(ok)
    }

    async fn compact(&self) -> Result<(), PeerError> {
        self.record("compactacion", MemoryCall::Compact)?;
        let hold = self.inner.lock().compaction_hold.clone();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuEvent {
    Dispatch(ThreadId),
    Interrupt(ThreadId, InterruptReason),
}

/// Compute unit that only records what the kernel asked of it.
#[derive(Debug, Clone, Default)]
pub struct FakeCpu {
    events: Arc<Mutex<Vec<CpuEvent>>>,
}

impl FakeCpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CpuEvent> {
        self.events.lock().clone()
    }

    pub fn dispatched(&self) -> Vec<ThreadId> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                CpuEvent::Dispatch(id) => Some(*id),
                CpuEvent::Interrupt(..) => None,
            })
            .collect()
    }

    pub fn interrupts(&self) -> Vec<(ThreadId, InterruptReason)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                CpuEvent::Interrupt(id, reason) => Some((*id, *reason)),
                CpuEvent::Dispatch(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ComputeUnit for FakeCpu {
    async fn dispatch(&self, id: ThreadId) -> Result<(), PeerError> {
        self.events.lock().push(CpuEvent::Dispatch(id));
        Ok(())
    }

    async fn interrupt(&self, id: ThreadId, reason: InterruptReason) -> Result<(), PeerError> {
        self.events.lock().push(CpuEvent::Interrupt(id, reason));
        Ok(())
    }
}
