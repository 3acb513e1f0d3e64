//! Outbound contracts with the memory service and the compute unit.
//!
//! The kernel only talks to its peers through these traits; the runtime
//! provides HTTP implementations and tests provide in-memory fakes.

use core::fmt;
use std::future::Future;

use crate::error::PeerError;
use crate::types::{Pid, ThreadId};

/// Memory's answer to an initial allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryVerdict {
    HasSpace,
    NeedsCompaction,
    NoSpace,
}

impl TryFrom<u8> for MemoryVerdict {
    type Error = PeerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(MemoryVerdict::HasSpace),
            2 => Ok(MemoryVerdict::NeedsCompaction),
            3 => Ok(MemoryVerdict::NoSpace),
            other => Err(PeerError::InvalidResponse {
                endpoint: "createProcess",
                reason: format!("unknown estado {}", other),
            }),
        }
    }
}

impl From<MemoryVerdict> for u8 {
    fn from(verdict: MemoryVerdict) -> u8 {
        match verdict {
            MemoryVerdict::HasSpace => 1,
            MemoryVerdict::NeedsCompaction => 2,
            MemoryVerdict::NoSpace => 3,
        }
    }
}

/// Why the kernel asks the compute unit to stop a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    Priority,
    Quantum,
}

impl InterruptReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterruptReason::Priority => "Prioridades",
            InterruptReason::Quantum => "Quantum",
        }
    }
}

impl fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait MemoryService: Send + Sync + 'static {
    fn create_process(
        &self,
        pid: Pid,
        size: u32,
    ) -> impl Future<Output = Result<MemoryVerdict, PeerError>> + Send;

    fn terminate_process(&self, pid: Pid) -> impl Future<Output = Result<(), PeerError>> + Send;

    /// Loads the code at `path` for a new thread.
    fn create_thread(
        &self,
        id: ThreadId,
        path: &str,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;

    fn terminate_thread(&self, id: ThreadId) -> impl Future<Output = Result<(), PeerError>> + Send;

    /// Returns `false` when the filesystem had no room for the dump.
    fn dump_memory(&self, id: ThreadId) -> impl Future<Output = Result<bool, PeerError>> + Send;

    /// Completes once memory has finished compacting.
    fn compact(&self) -> impl Future<Output = Result<(), PeerError>> + Send;
}

pub trait ComputeUnit: Send + Sync + 'static {
    /// Resumes `id` at its saved context.
    fn dispatch(&self, id: ThreadId) -> impl Future<Output = Result<(), PeerError>> + Send;

    fn interrupt(
        &self,
        id: ThreadId,
        reason: InterruptReason,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;
}
