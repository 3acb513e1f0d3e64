pub mod client;
pub mod config;
pub mod error;
pub mod server;

use std::sync::Arc;

use log::info;
use osim_kernel::Kernel;
use tokio::net::TcpListener;

pub use crate::client::{HttpCpu, HttpMemory};
pub use crate::config::KernelConfig;
pub use crate::error::RuntimeError;

pub struct Runtime {
    config: KernelConfig,
    kernel: Arc<Kernel<HttpMemory, HttpCpu>>,
}

impl Runtime {
    pub fn new(config: KernelConfig) -> Result<Self, RuntimeError> {
        let algorithm = config.algorithm()?;
        let memory = HttpMemory::new(config.memory_url())?;
        let cpu = HttpCpu::new(config.cpu_url())?;
        info!(
            "peers - memory: {}, cpu: {}",
            config.memory_url(),
            config.cpu_url()
        );

        let kernel = Arc::new(Kernel::new(algorithm, memory, cpu));
        info!("scheduling algorithm: {}", kernel.scheduler_name());
        Ok(Self { config, kernel })
    }

    /// Binds the listener, starts the dispatcher, admits the initial process
    /// and serves syscalls until the process is killed.
    pub async fn run(self) -> Result<(), RuntimeError> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port)).await?;
        info!("kernel listening on {}", listener.local_addr()?);

        tokio::spawn(Arc::clone(&self.kernel).run_dispatcher());

        let pid = self
            .kernel
            .bootstrap(&self.config.initial_file, self.config.initial_size)
            .await?;
        info!(
            "initial process (<PID:{}>) from {:?} created",
            pid, self.config.initial_file
        );

        axum::serve(listener, server::router(self.kernel)).await?;
        Ok(())
    }
}
