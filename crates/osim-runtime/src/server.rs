//! Inbound HTTP surface: one POST route per compute-unit notification.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use log::warn;
use osim_kernel::{ComputeUnit, ErrorKind, Kernel, KernelError, MemoryService, Syscall};
use osim_kernel::{Pid, ThreadId, Tid};
use serde::Deserialize;

type KernelState<M, C> = State<Arc<Kernel<M, C>>>;
type ApiResult = Result<StatusCode, ApiError>;

pub fn router<M: MemoryService, C: ComputeUnit>(kernel: Arc<Kernel<M, C>>) -> Router {
    Router::new()
        .route("/crearProceso", post(process_create::<M, C>))
        .route("/finalizarProceso", post(process_exit::<M, C>))
        .route("/crearHilo", post(thread_create::<M, C>))
        .route("/finalizarHilo", post(thread_exit::<M, C>))
        .route("/cancelarHilo", post(thread_cancel::<M, C>))
        .route("/unirseAHilo", post(thread_join::<M, C>))
        .route("/crearMutex", post(mutex_create::<M, C>))
        .route("/bloquearMutex", post(mutex_lock::<M, C>))
        .route("/liberarMutex", post(mutex_unlock::<M, C>))
        .route("/manejarIo", post(io::<M, C>))
        .route("/dumpMemory", post(dump_memory::<M, C>))
        .route("/segmentationFault", post(segmentation_fault::<M, C>))
        .route("/devolverPidTid", post(preempted::<M, C>))
        .with_state(kernel)
}

/// A rejected syscall; the status follows the error kind, the body is the
/// error message.
#[derive(Debug)]
pub struct ApiError(KernelError);

impl From<KernelError> for ApiError {
    fn from(err: KernelError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ProtocolViolation => StatusCode::CONFLICT,
            ErrorKind::PeerUnavailable => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ThreadRef {
    pub pid: u32,
    pub tid: u32,
}

impl ThreadRef {
    fn id(&self) -> ThreadId {
        ThreadId::new(Pid::new(self.pid), Tid::new(self.tid))
    }
}

#[derive(Debug, Deserialize)]
pub struct ProcessCreateRequest {
    pub path: String,
    pub size: u32,
    #[serde(rename = "prioridad")]
    pub priority: u32,
    #[serde(rename = "pidActual")]
    pub pid: u32,
    #[serde(rename = "tidActual")]
    pub tid: u32,
}

#[derive(Debug, Deserialize)]
pub struct ThreadCreateRequest {
    pub pid: u32,
    pub tid: u32,
    pub path: String,
    #[serde(rename = "prioridad")]
    pub priority: u32,
}

/// Join and cancel both address a second thread of the caller's process.
#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub pid: u32,
    #[serde(rename = "tidActual")]
    pub tid: u32,
    #[serde(rename = "tidAEjecutar")]
    pub target: u32,
}

#[derive(Debug, Deserialize)]
pub struct MutexRequest {
    pub pid: u32,
    pub tid: u32,
    pub mutex: String,
}

#[derive(Debug, Deserialize)]
pub struct IoRequest {
    pub pid: u32,
    pub tid: u32,
    /// Milliseconds.
    #[serde(rename = "tiempoIO")]
    pub duration: u64,
}

#[derive(Debug, Deserialize)]
pub struct PreemptedRequest {
    pub pid: u32,
    pub tid: u32,
    #[serde(rename = "interrupcion")]
    pub reason: String,
}

fn thread_id(pid: u32, tid: u32) -> ThreadId {
    ThreadId::new(Pid::new(pid), Tid::new(tid))
}

async fn submit<M: MemoryService, C: ComputeUnit>(
    kernel: &Arc<Kernel<M, C>>,
    caller: ThreadId,
    syscall: Syscall,
) -> ApiResult {
    let name = syscall.name();
    match kernel.handle_syscall(caller, syscall).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(err) => {
            warn!("{} - syscall <{}> rejected: {}", caller, name, err);
            Err(err.into())
        }
    }
}

async fn process_create<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<ProcessCreateRequest>,
) -> ApiResult {
    let syscall = Syscall::ProcessCreate {
        path: req.path,
        size: req.size,
        priority: req.priority,
    };
    submit(&kernel, thread_id(req.pid, req.tid), syscall).await
}

async fn process_exit<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<ThreadRef>,
) -> ApiResult {
    submit(&kernel, req.id(), Syscall::ProcessExit).await
}

async fn thread_create<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<ThreadCreateRequest>,
) -> ApiResult {
    let syscall = Syscall::ThreadCreate {
        path: req.path,
        priority: req.priority,
    };
    submit(&kernel, thread_id(req.pid, req.tid), syscall).await
}

async fn thread_exit<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<ThreadRef>,
) -> ApiResult {
    submit(&kernel, req.id(), Syscall::ThreadExit).await
}

async fn thread_cancel<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<TargetRequest>,
) -> ApiResult {
    let syscall = Syscall::ThreadCancel {
        target: Tid::new(req.target),
    };
    submit(&kernel, thread_id(req.pid, req.tid), syscall).await
}

async fn thread_join<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<TargetRequest>,
) -> ApiResult {
    let syscall = Syscall::ThreadJoin {
        target: Tid::new(req.target),
    };
    submit(&kernel, thread_id(req.pid, req.tid), syscall).await
}

async fn mutex_create<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<MutexRequest>,
) -> ApiResult {
    let syscall = Syscall::MutexCreate { name: req.mutex };
    submit(&kernel, thread_id(req.pid, req.tid), syscall).await
}

async fn mutex_lock<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<MutexRequest>,
) -> ApiResult {
    let syscall = Syscall::MutexLock { name: req.mutex };
    submit(&kernel, thread_id(req.pid, req.tid), syscall).await
}

async fn mutex_unlock<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<MutexRequest>,
) -> ApiResult {
    let syscall = Syscall::MutexUnlock { name: req.mutex };
    submit(&kernel, thread_id(req.pid, req.tid), syscall).await
}

async fn io<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<IoRequest>,
) -> ApiResult {
    let syscall = Syscall::Io {
        duration: Duration::from_millis(req.duration),
    };
    submit(&kernel, thread_id(req.pid, req.tid), syscall).await
}

async fn dump_memory<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<ThreadRef>,
) -> ApiResult {
    submit(&kernel, req.id(), Syscall::DumpMemory).await
}

async fn segmentation_fault<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<ThreadRef>,
) -> ApiResult {
    submit(&kernel, req.id(), Syscall::SegmentationFault).await
}

async fn preempted<M: MemoryService, C: ComputeUnit>(
    State(kernel): KernelState<M, C>,
    Json(req): Json<PreemptedRequest>,
) -> ApiResult {
    let syscall = Syscall::Preempted { reason: req.reason };
    submit(&kernel, thread_id(req.pid, req.tid), syscall).await
}
