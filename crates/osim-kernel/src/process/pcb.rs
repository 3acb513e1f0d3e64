use std::collections::{BTreeMap, VecDeque};

use crate::error::KernelError;
use crate::sync::NamedMutex;
use crate::types::{Pid, Priority, Tid};

#[derive(Debug, Clone)]
pub struct ProcessControlBlock {
    pub pid: Pid,
    /// Live threads, in creation order.
    pub threads: Vec<Tid>,
    pub mutexes: Vec<NamedMutex>,
    next_tid: u32,
}

impl ProcessControlBlock {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            threads: Vec::new(),
            mutexes: Vec::new(),
            next_tid: Tid::MAIN.val(),
        }
    }

    /// Next thread id of this process. Ids are never reused.
    pub fn allocate_tid(&mut self) -> Tid {
        let tid = Tid::new(self.next_tid);
        self.next_tid += 1;
        tid
    }
}

/// A created process still waiting for its initial memory.
#[derive(Debug, Clone)]
pub struct PendingProcess {
    pub pcb: ProcessControlBlock,
    pub path: String,
    pub size: u32,
    pub priority: Priority,
}

impl PendingProcess {
    pub fn pid(&self) -> Pid {
        self.pcb.pid
    }
}

/// Initialized, Exited and Pending-Admission process registries.
#[derive(Debug)]
pub struct ProcessTable {
    next_pid: u32,
    initialized: BTreeMap<Pid, ProcessControlBlock>,
    exited: Vec<ProcessControlBlock>,
    pending: VecDeque<PendingProcess>,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            next_pid: 1,
            initialized: BTreeMap::new(),
            exited: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Creates a PCB and appends it to the Pending-Admission queue.
    pub fn create(&mut self, path: String, size: u32, priority: Priority) -> Pid {
        let pid = Pid::new(self.next_pid);
        self.next_pid += 1;
        self.pending.push_back(PendingProcess {
            pcb: ProcessControlBlock::new(pid),
            path,
            size,
            priority,
        });
        pid
    }

    pub fn pending_head(&self) -> Option<&PendingProcess> {
        self.pending.front()
    }

    /// Pops the head of the Pending-Admission queue if it is `pid`.
    pub fn take_pending_head(&mut self, pid: Pid) -> Option<PendingProcess> {
        if self.pending.front().is_some_and(|p| p.pid() == pid) {
            self.pending.pop_front()
        } else {
            None
        }
    }

    pub fn register(&mut self, pcb: ProcessControlBlock) {
        self.initialized.insert(pcb.pid, pcb);
    }

    pub fn get(&self, pid: Pid) -> Result<&ProcessControlBlock, KernelError> {
        self.initialized
            .get(&pid)
            .ok_or(KernelError::ProcessNotFound(pid))
    }

    pub fn get_mut(&mut self, pid: Pid) -> Result<&mut ProcessControlBlock, KernelError> {
        self.initialized
            .get_mut(&pid)
            .ok_or(KernelError::ProcessNotFound(pid))
    }

    /// Moves a process from Initialized to Exited.
    pub fn retire(&mut self, pid: Pid) -> Result<(), KernelError> {
        let pcb = self
            .initialized
            .remove(&pid)
            .ok_or(KernelError::ProcessNotFound(pid))?;
        self.exited.push(pcb);
        Ok(())
    }

    pub fn initialized(&self) -> impl Iterator<Item = &ProcessControlBlock> {
        self.initialized.values()
    }

    pub fn exited(&self) -> &[ProcessControlBlock] {
        &self.exited
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingProcess> {
        self.pending.iter()
    }
}
