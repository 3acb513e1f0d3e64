mod syscalls;

use std::collections::VecDeque;

use log::{info, warn};

use crate::error::KernelError;
use crate::state::SchedulerState;
use crate::thread::{BlockReason, Queue};
use crate::types::{Pid, ThreadId, Tid};

/// A mutex owned by a process, addressed by name.
///
/// `owner` doubles as the lock flag: the mutex is locked iff it has an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedMutex {
    pub name: String,
    pub owner: Option<Tid>,
    pub wait_queue: VecDeque<Tid>,
}

impl NamedMutex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            wait_queue: VecDeque::new(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.owner.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// The caller owns the mutex now and keeps running.
    Acquired,
    /// The caller waits in the mutex queue, Blocked(MUTEX).
    Blocked,
    /// No mutex with that name; the caller keeps running.
    Missing,
}

impl SchedulerState {
    /// Duplicate names are accepted; lookups always hit the first one.
    pub fn create_mutex(&mut self, pid: Pid, name: &str) -> Result<(), KernelError> {
        let pcb = self.processes.get_mut(pid)?;
        pcb.mutexes.push(NamedMutex::new(name));
        Ok(())
    }

    pub fn lock_mutex(&mut self, id: ThreadId, name: &str) -> Result<LockOutcome, KernelError> {
        let pcb = self.processes.get_mut(id.pid)?;
        let Some(mutex) = pcb.mutexes.iter_mut().find(|m| m.name == name) else {
            warn!("{} - mutex {:?} does not exist", id, name);
            return Ok(LockOutcome::Missing);
        };

        if mutex.owner.is_none() {
            mutex.owner = Some(id.tid);
            info!("{} - acquired mutex {:?}", id, name);
            return Ok(LockOutcome::Acquired);
        }

        if !self.queues.is_executing(id) {
            return Err(KernelError::UnexpectedState {
                thread: id,
                expected: Queue::Executing,
            });
        }
        mutex.wait_queue.push_back(id.tid);
        self.block(id, BlockReason::Mutex)?;
        Ok(LockOutcome::Blocked)
    }

    /// Releases `name` held by `id`. Returns the waiter that now owns it.
    pub fn unlock_mutex(
        &mut self,
        id: ThreadId,
        name: &str,
    ) -> Result<Option<ThreadId>, KernelError> {
        let pcb = self.processes.get_mut(id.pid)?;
        let index = pcb
            .mutexes
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| KernelError::MutexNotFound {
                pid: id.pid,
                name: name.to_string(),
            })?;
        if pcb.mutexes[index].owner != Some(id.tid) {
            return Err(KernelError::NotOwner {
                thread: id,
                name: name.to_string(),
            });
        }
        Ok(self.hand_over(id.pid, index))
    }

    /// Drops `id` from every wait queue of its process and releases all the
    /// mutexes it owns. Returns the threads granted ownership.
    pub(crate) fn release_mutexes_of(&mut self, id: ThreadId) -> Vec<ThreadId> {
        let Ok(pcb) = self.processes.get_mut(id.pid) else {
            return Vec::new();
        };
        for mutex in &mut pcb.mutexes {
            mutex.wait_queue.retain(|tid| *tid != id.tid);
        }
        let owned: Vec<usize> = pcb
            .mutexes
            .iter()
            .enumerate()
            .filter(|(_, m)| m.owner == Some(id.tid))
            .map(|(index, _)| index)
            .collect();

        let mut granted = Vec::new();
        for index in owned {
            info!("{} - releasing mutex #{} on exit", id, index);
            granted.extend(self.hand_over(id.pid, index));
        }
        granted
    }

    // Grants the mutex to the head of its wait queue, or unlocks it when the
    // queue is empty. Waiters that are no longer Blocked(MUTEX) are skipped.
    fn hand_over(&mut self, pid: Pid, index: usize) -> Option<ThreadId> {
        loop {
            let mutex = self.processes.get_mut(pid).ok()?.mutexes.get_mut(index)?;
            mutex.owner = mutex.wait_queue.pop_front();
            let waiter = ThreadId::new(pid, mutex.owner?);
            match self.make_ready(waiter, Queue::Blocked(BlockReason::Mutex)) {
                Ok(()) => return Some(waiter),
                Err(err) => warn!("{} skipped as mutex waiter: {}", waiter, err),
            }
        }
    }
}
