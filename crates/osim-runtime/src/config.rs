use std::fs;
use std::path::Path;

use log::LevelFilter;
use osim_kernel::{Algorithm, KernelError};
use serde::Deserialize;

use crate::error::RuntimeError;

/// Startup configuration, read once from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KernelConfig {
    #[serde(rename = "puerto")]
    pub port: u16,
    #[serde(rename = "ip_memoria")]
    pub memory_ip: String,
    #[serde(rename = "puerto_memoria")]
    pub memory_port: u16,
    #[serde(rename = "ip_cpu")]
    pub cpu_ip: String,
    #[serde(rename = "puerto_cpu")]
    pub cpu_port: u16,
    #[serde(rename = "algoritmo_planificacion")]
    pub algorithm: String,
    /// Milliseconds; only used by the multilevel algorithm.
    #[serde(default)]
    pub quantum: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(rename = "archivo_inicial")]
    pub initial_file: String,
    #[serde(rename = "size_inicial")]
    pub initial_size: u32,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl KernelConfig {
    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let raw = fs::read_to_string(path).map_err(|source| RuntimeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, RuntimeError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn algorithm(&self) -> Result<Algorithm, KernelError> {
        Algorithm::from_config(&self.algorithm, self.quantum)
    }

    pub fn memory_url(&self) -> String {
        format!("http://{}:{}", self.memory_ip, self.memory_port)
    }

    pub fn cpu_url(&self) -> String {
        format!("http://{}:{}", self.cpu_ip, self.cpu_port)
    }

    /// Unknown levels fall back to `Debug`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => LevelFilter::Trace,
            "INFO" => LevelFilter::Info,
            "WARN" | "WARNING" => LevelFilter::Warn,
            "ERROR" => LevelFilter::Error,
            "OFF" => LevelFilter::Off,
            _ => LevelFilter::Debug,
        }
    }
}
