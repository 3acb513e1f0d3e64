use core::fmt;

use crate::types::{Priority, ThreadId, Tid};

/// Why a thread sits in the Blocked queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockReason {
    Io,
    Mutex,
    Join,
    DumpMemory,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockReason::Io => "IO",
            BlockReason::Mutex => "MUTEX",
            BlockReason::Join => "PTHREAD_JOIN",
            BlockReason::DumpMemory => "DUMP_MEMORY",
        };
        f.write_str(name)
    }
}

/// The state queues. A live thread is in exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    Ready,
    Executing,
    Blocked(BlockReason),
    Exited,
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Queue::Ready => f.write_str("READY"),
            Queue::Executing => f.write_str("EXEC"),
            Queue::Blocked(reason) => write!(f, "BLOCKED({})", reason),
            Queue::Exited => f.write_str("EXIT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadControlBlock {
    pub id: ThreadId,
    pub priority: Priority,
    /// Threads blocked on a join against this one, in arrival order.
    pub joiners: Vec<Tid>,
}

impl ThreadControlBlock {
    pub fn new(id: ThreadId, priority: Priority) -> Self {
        Self {
            id,
            priority,
            joiners: Vec::new(),
        }
    }
}
