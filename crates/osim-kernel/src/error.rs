use thiserror::Error;

use crate::thread::tcb::Queue;
use crate::types::{Pid, ThreadId};

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("initialization error: {0}")]
    Init(String),

    #[error("process {0} not found")]
    ProcessNotFound(Pid),

    #[error("thread {0} not found")]
    ThreadNotFound(ThreadId),

    #[error("mutex {name:?} does not exist in process {pid}")]
    MutexNotFound { pid: Pid, name: String },

    #[error("thread {thread} does not own mutex {name:?}")]
    NotOwner { thread: ThreadId, name: String },

    #[error("thread {0} is not the main thread of its process")]
    NotMainThread(ThreadId),

    #[error("thread {thread} is not in {expected}")]
    UnexpectedState { thread: ThreadId, expected: Queue },

    #[error("executing slot already held by {0}")]
    ExecutingOccupied(ThreadId),

    #[error("peer unavailable: {0}")]
    Peer(#[from] PeerError),
}

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    NotFound,
    ProtocolViolation,
    PeerUnavailable,
    Internal,
}

impl KernelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::ProcessNotFound(_)
            | KernelError::ThreadNotFound(_)
            | KernelError::MutexNotFound { .. } => ErrorKind::NotFound,
            KernelError::NotOwner { .. }
            | KernelError::NotMainThread(_)
            | KernelError::UnexpectedState { .. }
            | KernelError::ExecutingOccupied(_) => ErrorKind::ProtocolViolation,
            KernelError::Peer(_) => ErrorKind::PeerUnavailable,
            KernelError::Init(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("request to {endpoint} failed: {reason}")]
    Transport {
        endpoint: &'static str,
        reason: String,
    },

    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse {
        endpoint: &'static str,
        reason: String,
    },
}
