use std::collections::VecDeque;

use crate::error::KernelError;
use crate::thread::tcb::{BlockReason, Queue, ThreadControlBlock};
use crate::types::{Pid, ThreadId};

/// Ready, Executing, Blocked and Exited thread queues.
///
/// The Executing queue is a single slot, so holding two running threads is
/// unrepresentable. Every operation here takes `&mut self`; callers hold the
/// scheduler lock across the whole scan-then-mutate step.
#[derive(Debug, Default)]
pub struct ThreadQueues {
    ready: VecDeque<ThreadControlBlock>,
    executing: Option<ThreadControlBlock>,
    blocked: VecDeque<(ThreadControlBlock, BlockReason)>,
    exited: Vec<ThreadControlBlock>,
}

impl ThreadQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, queue: Queue, tcb: ThreadControlBlock) -> Result<(), KernelError> {
        match queue {
            Queue::Ready => self.ready.push_back(tcb),
            Queue::Executing => {
                if let Some(running) = &self.executing {
                    return Err(KernelError::ExecutingOccupied(running.id));
                }
                self.executing = Some(tcb);
            }
            Queue::Blocked(reason) => self.blocked.push_back((tcb, reason)),
            Queue::Exited => self.exited.push(tcb),
        }
        Ok(())
    }

    /// Removes the first thread of `queue` matching `predicate`.
    ///
    /// `Queue::Blocked(reason)` only matches entries blocked for `reason`.
    pub fn dequeue<F>(&mut self, queue: Queue, mut predicate: F) -> Option<ThreadControlBlock>
    where
        F: FnMut(&ThreadControlBlock) -> bool,
    {
        match queue {
            Queue::Ready => {
                let pos = self.ready.iter().position(|t| predicate(t))?;
                self.ready.remove(pos)
            }
            Queue::Executing => {
                if self.executing.as_ref().is_some_and(|t| predicate(t)) {
                    self.executing.take()
                } else {
                    None
                }
            }
            Queue::Blocked(reason) => {
                let pos = self
                    .blocked
                    .iter()
                    .position(|(t, r)| *r == reason && predicate(t))?;
                self.blocked.remove(pos).map(|(t, _)| t)
            }
            Queue::Exited => {
                let pos = self.exited.iter().position(|t| predicate(t))?;
                Some(self.exited.remove(pos))
            }
        }
    }

    /// Looks a live thread up in Ready, then Executing, then Blocked.
    pub fn find(&self, id: ThreadId) -> Option<(&ThreadControlBlock, Queue)> {
        if let Some(tcb) = self.ready.iter().find(|t| t.id == id) {
            return Some((tcb, Queue::Ready));
        }
        if let Some(tcb) = self.executing.as_ref().filter(|t| t.id == id) {
            return Some((tcb, Queue::Executing));
        }
        self.blocked
            .iter()
            .find(|(t, _)| t.id == id)
            .map(|(t, r)| (t, Queue::Blocked(*r)))
    }

    pub fn find_mut(&mut self, id: ThreadId) -> Option<&mut ThreadControlBlock> {
        if let Some(tcb) = self.ready.iter_mut().find(|t| t.id == id) {
            return Some(tcb);
        }
        if let Some(tcb) = self.executing.as_mut().filter(|t| t.id == id) {
            return Some(tcb);
        }
        self.blocked
            .iter_mut()
            .find(|(t, _)| t.id == id)
            .map(|(t, _)| t)
    }

    /// Moves `id` from `from` to `to` in one step.
    ///
    /// Nothing changes on error: the destination is checked before the thread
    /// leaves its source queue.
    pub fn move_thread(&mut self, id: ThreadId, from: Queue, to: Queue) -> Result<(), KernelError> {
        if to == Queue::Executing {
            if let Some(running) = &self.executing {
                return Err(KernelError::ExecutingOccupied(running.id));
            }
        }
        let tcb = self
            .dequeue(from, |t| t.id == id)
            .ok_or(KernelError::UnexpectedState {
                thread: id,
                expected: from,
            })?;
        self.enqueue(to, tcb)
    }

    /// Removes a thread from whichever live queue holds it.
    pub fn remove_live(&mut self, id: ThreadId) -> Option<(ThreadControlBlock, Queue)> {
        let (_, queue) = self.find(id)?;
        let tcb = self.dequeue(queue, |t| t.id == id)?;
        Some((tcb, queue))
    }

    /// Live threads of `pid` in Ready, Executing, Blocked order.
    pub fn live_threads_of(&self, pid: Pid) -> Vec<ThreadId> {
        self.ready
            .iter()
            .chain(self.executing.iter())
            .chain(self.blocked.iter().map(|(t, _)| t))
            .filter(|t| t.id.pid == pid)
            .map(|t| t.id)
            .collect()
    }

    pub fn is_executing(&self, id: ThreadId) -> bool {
        self.executing.as_ref().is_some_and(|t| t.id == id)
    }

    pub fn is_exited(&self, id: ThreadId) -> bool {
        self.exited.iter().any(|t| t.id == id)
    }

    pub fn ready(&self) -> &VecDeque<ThreadControlBlock> {
        &self.ready
    }

    pub fn executing(&self) -> Option<&ThreadControlBlock> {
        self.executing.as_ref()
    }

    pub fn blocked(&self) -> impl Iterator<Item = (&ThreadControlBlock, BlockReason)> {
        self.blocked.iter().map(|(t, r)| (t, *r))
    }

    pub fn exited(&self) -> &[ThreadControlBlock] {
        &self.exited
    }
}
