use std::mem;

use log::{debug, info};

use crate::dispatcher::Dispatch;
use crate::error::KernelError;
use crate::process::pcb::ProcessTable;
use crate::thread::{BlockReason, Queue, Scheduler, ThreadControlBlock, ThreadQueues};
use crate::types::{Pid, Priority, ThreadId, Tid};

/// Everything the scheduler mutates: the four thread queues, the process
/// registries with their mutexes, and the compaction gate.
///
/// The kernel keeps it behind a single lock, so every method below is one
/// atomic transition.
#[derive(Debug)]
pub struct SchedulerState {
    pub(crate) queues: ThreadQueues,
    pub(crate) processes: ProcessTable,
    gate_open: bool,
    /// Threads that entered Ready since the last preemption check.
    arrivals: Vec<ThreadId>,
    dispatch_seq: u64,
    preempt_requested: Option<ThreadId>,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerState {
    pub fn new() -> Self {
        Self {
            queues: ThreadQueues::new(),
            processes: ProcessTable::new(),
            gate_open: true,
            arrivals: Vec::new(),
            dispatch_seq: 0,
            preempt_requested: None,
        }
    }

    pub(crate) fn set_compaction_gate(&mut self, open: bool) {
        self.gate_open = open;
    }

    /// Creates a process in the Pending-Admission queue.
    pub fn create_process(&mut self, path: String, size: u32, priority: Priority) -> Pid {
        let pid = self.processes.create(path, size, priority);
        info!("(<PID:{}>) created - state: NEW", pid);
        pid
    }

    /// Admits the head of the Pending-Admission queue: registers its PCB and
    /// enqueues its main thread in Ready.
    pub fn admit_process(&mut self, pid: Pid) -> Result<ThreadId, KernelError> {
        let mut pending = self
            .processes
            .take_pending_head(pid)
            .ok_or(KernelError::ProcessNotFound(pid))?;
        let tid = pending.pcb.allocate_tid();
        pending.pcb.threads.push(tid);
        self.processes.register(pending.pcb);

        let id = ThreadId::new(pid, tid);
        self.enqueue_ready(ThreadControlBlock::new(id, pending.priority))?;
        Ok(id)
    }

    /// Registers an already allocated thread with its process and makes it Ready.
    pub fn add_thread(&mut self, id: ThreadId, priority: Priority) -> Result<(), KernelError> {
        self.processes.get_mut(id.pid)?.threads.push(id.tid);
        self.enqueue_ready(ThreadControlBlock::new(id, priority))
    }

    fn enqueue_ready(&mut self, tcb: ThreadControlBlock) -> Result<(), KernelError> {
        let id = tcb.id;
        self.queues.enqueue(Queue::Ready, tcb)?;
        self.arrivals.push(id);
        info!("{} enqueued - state: READY", id);
        Ok(())
    }

    pub fn make_ready(&mut self, id: ThreadId, from: Queue) -> Result<(), KernelError> {
        self.queues.move_thread(id, from, Queue::Ready)?;
        self.arrivals.push(id);
        info!("{} {} -> READY", id, from);
        Ok(())
    }

    /// Moves the executing thread `id` to Blocked(`reason`).
    pub fn block(&mut self, id: ThreadId, reason: BlockReason) -> Result<(), KernelError> {
        self.queues
            .move_thread(id, Queue::Executing, Queue::Blocked(reason))?;
        info!("{} - blocked by: {}", id, reason);
        Ok(())
    }

    /// Blocks `caller` until `target` exits. Returns `false`, leaving the
    /// caller running, when `target` is not a live thread.
    pub fn join(&mut self, caller: ThreadId, target: ThreadId) -> Result<bool, KernelError> {
        if caller == target || self.queues.find(target).is_none() {
            return Ok(false);
        }
        self.block(caller, BlockReason::Join)?;
        if let Some(tcb) = self.queues.find_mut(target) {
            tcb.joiners.push(caller.tid);
        }
        Ok(true)
    }

    /// Thread exit cascade: the thread goes to Exited, its joiners become
    /// Ready in arrival order, and every mutex it holds is handed over.
    pub fn exit_thread(&mut self, id: ThreadId) -> Result<(), KernelError> {
        let (tcb, _) = self
            .queues
            .remove_live(id)
            .ok_or(KernelError::ThreadNotFound(id))?;
        if let Ok(pcb) = self.processes.get_mut(id.pid) {
            pcb.threads.retain(|tid| *tid != id.tid);
        }
        let joiners = tcb.joiners.clone();
        self.queues.enqueue(Queue::Exited, tcb)?;
        info!("{} finished - state: EXIT", id);

        for tid in joiners {
            let joiner = ThreadId::new(id.pid, tid);
            if let Err(err) = self.make_ready(joiner, Queue::Blocked(BlockReason::Join)) {
                debug!("{} join wakeup skipped: {}", joiner, err);
            }
        }
        self.release_mutexes_of(id);
        Ok(())
    }

    /// Runs the thread exit cascade for every live thread of `pid` and moves
    /// the process to Exited. Returns the threads that were terminated.
    pub fn exit_process(&mut self, pid: Pid) -> Result<Vec<ThreadId>, KernelError> {
        self.processes.get(pid)?;
        let threads = self.queues.live_threads_of(pid);
        for id in &threads {
            self.exit_thread(*id)?;
        }
        self.processes.retire(pid)?;
        info!("(<PID:{}>) finished - state: EXIT", pid);
        Ok(threads)
    }

    /// Moves the thread chosen by `scheduler` from Ready to Executing, if the
    /// slot is free and no compaction is running.
    pub(crate) fn begin_dispatch(&mut self, scheduler: &dyn Scheduler) -> Option<Dispatch> {
        if !self.gate_open || self.queues.executing().is_some() {
            return None;
        }
        let index = scheduler.select(self.queues.ready())?;
        let id = self.queues.ready().get(index)?.id;
        self.queues
            .move_thread(id, Queue::Ready, Queue::Executing)
            .ok()?;
        self.dispatch_seq += 1;
        self.preempt_requested = None;
        self.arrivals.clear();
        info!("{} dispatched - state: EXEC", id);
        Some(Dispatch {
            thread: id,
            seq: self.dispatch_seq,
        })
    }

    /// Whether `dispatch` is still the one holding the CPU.
    pub(crate) fn is_current(&self, dispatch: Dispatch) -> bool {
        self.dispatch_seq == dispatch.seq && self.queues.is_executing(dispatch.thread)
    }

    /// Consumes the pending Ready arrivals and decides whether the executing
    /// thread must be interrupted. Asks at most once per dispatch.
    pub(crate) fn take_preemption(&mut self, scheduler: &dyn Scheduler) -> Option<ThreadId> {
        let arrivals = mem::take(&mut self.arrivals);
        let running = self.queues.executing()?;
        if self.preempt_requested == Some(running.id) {
            return None;
        }
        let preempt = arrivals
            .iter()
            .filter_map(|id| self.queues.find(*id))
            .any(|(tcb, queue)| queue == Queue::Ready && scheduler.preempts(tcb, running));
        if !preempt {
            return None;
        }
        let id = running.id;
        self.preempt_requested = Some(id);
        Some(id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            ready: self.queues.ready().iter().map(|t| t.id).collect(),
            executing: self.queues.executing().map(|t| t.id),
            blocked: self.queues.blocked().map(|(t, r)| (t.id, r)).collect(),
            exited: self.queues.exited().iter().map(|t| t.id).collect(),
            pending: self.processes.pending().map(|p| p.pid()).collect(),
            initialized: self.processes.initialized().map(|p| p.pid).collect(),
            exited_processes: self.processes.exited().iter().map(|p| p.pid).collect(),
            mutexes: self
                .processes
                .initialized()
                .flat_map(|pcb| {
                    pcb.mutexes.iter().map(move |m| MutexSnapshot {
                        pid: pcb.pid,
                        name: m.name.clone(),
                        owner: m.owner,
                        waiters: m.wait_queue.iter().copied().collect(),
                    })
                })
                .collect(),
            compaction_gate_open: self.gate_open,
        }
    }
}

/// Read-only copy of the scheduler state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub ready: Vec<ThreadId>,
    pub executing: Option<ThreadId>,
    pub blocked: Vec<(ThreadId, BlockReason)>,
    pub exited: Vec<ThreadId>,
    pub pending: Vec<Pid>,
    pub initialized: Vec<Pid>,
    pub exited_processes: Vec<Pid>,
    pub mutexes: Vec<MutexSnapshot>,
    pub compaction_gate_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexSnapshot {
    pub pid: Pid,
    pub name: String,
    pub owner: Option<Tid>,
    pub waiters: Vec<Tid>,
}

impl Snapshot {
    pub fn state_of(&self, id: ThreadId) -> Option<Queue> {
        if self.ready.contains(&id) {
            return Some(Queue::Ready);
        }
        if self.executing == Some(id) {
            return Some(Queue::Executing);
        }
        if let Some((_, reason)) = self.blocked.iter().find(|(t, _)| *t == id) {
            return Some(Queue::Blocked(*reason));
        }
        if self.exited.contains(&id) {
            return Some(Queue::Exited);
        }
        None
    }

    pub fn mutex(&self, pid: Pid, name: &str) -> Option<&MutexSnapshot> {
        self.mutexes.iter().find(|m| m.pid == pid && m.name == name)
    }
}
