//! reqwest implementations of the outbound peer contracts.

use osim_kernel::{ComputeUnit, InterruptReason, MemoryService, MemoryVerdict, PeerError};
use osim_kernel::{Pid, ThreadId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

#[derive(Debug, Serialize)]
struct ProcessBody {
    pid: u32,
}

#[derive(Debug, Serialize)]
struct CreateProcessBody {
    pid: u32,
    size: u32,
}

#[derive(Debug, Deserialize)]
struct CreateProcessReply {
    estado: u8,
}

#[derive(Debug, Serialize)]
struct ThreadBody {
    pid: u32,
    tid: u32,
}

impl From<ThreadId> for ThreadBody {
    fn from(id: ThreadId) -> Self {
        Self {
            pid: id.pid.val(),
            tid: id.tid.val(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateThreadBody<'a> {
    pid: u32,
    tid: u32,
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct DumpMemoryReply {
    resultado: bool,
}

#[derive(Debug, Serialize)]
struct InterruptBody {
    pid: u32,
    tid: u32,
    interrupcion: &'static str,
}

#[derive(Debug, Serialize)]
struct Empty {}

/// A peer reachable at `base_url`, one POST endpoint per operation.
#[derive(Debug, Clone)]
struct Peer {
    client: reqwest::Client,
    base_url: String,
}

impl Peer {
    fn new(base_url: impl Into<String>) -> Result<Self, RuntimeError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base_url: base_url.into(),
        })
    }

    async fn post<B: Serialize>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<reqwest::Response, PeerError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| PeerError::Transport {
                endpoint,
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<T, PeerError> {
        self.post(endpoint, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PeerError::InvalidResponse {
                endpoint,
                reason: e.to_string(),
            })
    }
}

/// Memory service client.
#[derive(Debug, Clone)]
pub struct HttpMemory {
    peer: Peer,
}

impl HttpMemory {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RuntimeError> {
        Ok(Self {
            peer: Peer::new(base_url)?,
        })
    }
}

impl MemoryService for HttpMemory {
    async fn create_process(&self, pid: Pid, size: u32) -> Result<MemoryVerdict, PeerError> {
        let body = CreateProcessBody {
            pid: pid.val(),
            size,
        };
        let reply: CreateProcessReply = self.peer.call("createProcess", &body).await?;
        MemoryVerdict::try_from(reply.estado)
    }

    async fn terminate_process(&self, pid: Pid) -> Result<(), PeerError> {
        let body = ProcessBody { pid: pid.val() };
        self.peer.post("terminateProcess", &body).await?;
        Ok(())
    }

    async fn create_thread(&self, id: ThreadId, path: &str) -> Result<(), PeerError> {
        let body = CreateThreadBody {
            pid: id.pid.val(),
            tid: id.tid.val(),
            path,
        };
        self.peer.post("createThread", &body).await?;
        Ok(())
    }

    async fn terminate_thread(&self, id: ThreadId) -> Result<(), PeerError> {
        self.peer
            .post("terminateThread", &ThreadBody::from(id))
            .await?;
        Ok(())
    }

    async fn dump_memory(&self, id: ThreadId) -> Result<bool, PeerError> {
        let reply: DumpMemoryReply = self
            .peer
            .call("dumpMemory", &ThreadBody::from(id))
            .await?;
        Ok(reply.resultado)
    }

    async fn compact(&self) -> Result<(), PeerError> {
        self.peer.post("compactacion", &Empty {}).await?;
        Ok(())
    }
}

/// Compute unit client.
#[derive(Debug, Clone)]
pub struct HttpCpu {
    peer: Peer,
}

impl HttpCpu {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RuntimeError> {
        Ok(Self {
            peer: Peer::new(base_url)?,
        })
    }
}

impl ComputeUnit for HttpCpu {
    async fn dispatch(&self, id: ThreadId) -> Result<(), PeerError> {
        self.peer.post("recibirTcb", &ThreadBody::from(id)).await?;
        Ok(())
    }

    async fn interrupt(&self, id: ThreadId, reason: InterruptReason) -> Result<(), PeerError> {
        let body = InterruptBody {
            pid: id.pid.val(),
            tid: id.tid.val(),
            interrupcion: reason.as_str(),
        };
        self.peer.post("interrupcion", &body).await?;
        Ok(())
    }
}
