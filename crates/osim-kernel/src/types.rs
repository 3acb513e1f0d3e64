use core::fmt;

/// Process identifier. Allocated monotonically, the first process is 1.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Pid(u32);

impl Pid {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn val(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread identifier, unique within its process.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Tid(u32);

impl Tid {
    /// Every admitted process starts with this thread.
    pub const MAIN: Tid = Tid(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn val(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Global thread identity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ThreadId {
    pub pid: Pid,
    pub tid: Tid,
}

impl ThreadId {
    pub const fn new(pid: Pid, tid: Tid) -> Self {
        Self { pid, tid }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(<PID:{}>:<TID:{}>)", self.pid, self.tid)
    }
}

/// Lower value means higher priority.
pub type Priority = u32;
