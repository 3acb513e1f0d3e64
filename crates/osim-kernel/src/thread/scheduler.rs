use std::collections::VecDeque;
use std::time::Duration;

use crate::error::KernelError;
use crate::thread::tcb::ThreadControlBlock;

pub trait Scheduler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Select next thread to run, as an index into the Ready queue
    fn select(&self, ready: &VecDeque<ThreadControlBlock>) -> Option<usize>;

    /// Whether a thread that just became ready should take the CPU away from `running`
    fn preempts(&self, arriving: &ThreadControlBlock, running: &ThreadControlBlock) -> bool;

    /// Time slice granted to every dispatch, if any
    fn quantum(&self) -> Option<Duration> {
        None
    }
}

/// Runs threads in Ready insertion order and never preempts.
pub struct FifoScheduler;

impl Scheduler for FifoScheduler {
    fn name(&self) -> &'static str {
        "FIFO"
    }

    fn select(&self, ready: &VecDeque<ThreadControlBlock>) -> Option<usize> {
        if ready.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    fn preempts(&self, _arriving: &ThreadControlBlock, _running: &ThreadControlBlock) -> bool {
        false
    }
}

/// Strict priorities: the numerically lowest priority runs, earliest arrival on ties.
pub struct PriorityScheduler;

impl Scheduler for PriorityScheduler {
    fn name(&self) -> &'static str {
        "PRIORIDADES"
    }

    fn select(&self, ready: &VecDeque<ThreadControlBlock>) -> Option<usize> {
        highest_priority(ready)
    }

    fn preempts(&self, arriving: &ThreadControlBlock, running: &ThreadControlBlock) -> bool {
        arriving.priority < running.priority
    }
}

/// Multilevel feedback queues: priority selection plus a round-robin quantum.
pub struct MultilevelScheduler {
    quantum: Duration,
}

impl MultilevelScheduler {
    pub fn new(quantum: Duration) -> Self {
        Self { quantum }
    }
}

impl Scheduler for MultilevelScheduler {
    fn name(&self) -> &'static str {
        "CMN"
    }

    fn select(&self, ready: &VecDeque<ThreadControlBlock>) -> Option<usize> {
        highest_priority(ready)
    }

    fn preempts(&self, arriving: &ThreadControlBlock, running: &ThreadControlBlock) -> bool {
        arriving.priority < running.priority
    }

    fn quantum(&self) -> Option<Duration> {
        Some(self.quantum)
    }
}

// Strict "<" scan, so the first of several equal priorities wins.
fn highest_priority(ready: &VecDeque<ThreadControlBlock>) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, tcb) in ready.iter().enumerate() {
        match best {
            Some(current) if tcb.priority >= ready[current].priority => {}
            _ => best = Some(index),
        }
    }
    best
}

/// Scheduling mode, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Fifo,
    Priority,
    Multilevel { quantum: Duration },
}

impl Algorithm {
    /// Parses the configured algorithm name. `quantum_ms` only matters for
    /// the multilevel algorithm.
    pub fn from_config(name: &str, quantum_ms: u64) -> Result<Self, KernelError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "FIFO" => Ok(Algorithm::Fifo),
            "PRIORIDADES" | "PRIORITY" => Ok(Algorithm::Priority),
            "CMN" | "MULTILEVEL" => {
                if quantum_ms == 0 {
                    return Err(KernelError::Init(
                        "multilevel scheduling needs a non-zero quantum".into(),
                    ));
                }
                Ok(Algorithm::Multilevel {
                    quantum: Duration::from_millis(quantum_ms),
                })
            }
            other => Err(KernelError::Init(format!(
                "unknown scheduling algorithm: {}",
                other
            ))),
        }
    }

    pub fn into_scheduler(self) -> Box<dyn Scheduler> {
        match self {
            Algorithm::Fifo => Box::new(FifoScheduler),
            Algorithm::Priority => Box::new(PriorityScheduler),
            Algorithm::Multilevel { quantum } => Box::new(MultilevelScheduler::new(quantum)),
        }
    }
}
