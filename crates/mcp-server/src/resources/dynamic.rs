//! Resources generated at read time

use async_trait::async_trait;
use capability_core::{HandlerResult, ResourceContent, ResourceDescriptor, ResourceUnit};
use chrono::Local;
use serde_json::json;
use sysinfo::System;

pub const SYSTEM_INFO: &str = "system_info";
pub const CURRENT_TIME: &str = "current_time";
pub const MEMORY_USAGE: &str = "memory_usage";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Serves host information, memory usage and the current time
pub struct DynamicResources;

impl DynamicResources {
    fn system_info() -> anyhow::Result<String> {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let info = json!({
            "system": System::name(),
            "release": System::kernel_version(),
            "version": System::long_os_version(),
            "node": System::host_name(),
            "machine": std::env::consts::ARCH,
            "family": std::env::consts::FAMILY,
            "cpus": cpus,
            "pid": std::process::id(),
            "server_version": env!("CARGO_PKG_VERSION"),
        });
        Ok(serde_json::to_string_pretty(&info)?)
    }

    fn memory_usage() -> anyhow::Result<String> {
        let mut system = System::new();
        system.refresh_memory();

        let total = system.total_memory();
        let percent = if total == 0 {
            0.0
        } else {
            system.used_memory() as f64 / total as f64 * 100.0
        };

        let usage = json!({
            "total": gigabytes(total),
            "available": gigabytes(system.available_memory()),
            "used": gigabytes(system.used_memory()),
            "percent": format!("{:.1}%", percent),
            "timestamp": Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
        Ok(serde_json::to_string_pretty(&usage)?)
    }

    fn current_time() -> String {
        let now = Local::now();
        format!(
            "Current time: {}\nTimezone: {}",
            now.format("%Y-%m-%d %H:%M:%S"),
            now.format("%:z")
        )
    }
}

fn gigabytes(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB)
}

#[async_trait]
impl ResourceUnit for DynamicResources {
    fn resources(&self) -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::new(
                "file:///system_info.json",
                SYSTEM_INFO,
                "Dynamically generated system information",
                "application/json",
            ),
            ResourceDescriptor::new(
                "file:///current_time.txt",
                CURRENT_TIME,
                "Current time",
                "text/plain",
            ),
            ResourceDescriptor::new(
                "file:///memory_usage.json",
                MEMORY_USAGE,
                "Memory usage",
                "application/json",
            ),
        ]
    }

    async fn read(&self, name: &str) -> HandlerResult<Option<ResourceContent>> {
        match name {
            "system_info" | "system_info.json" => Ok(Some(Self::system_info()?.into())),
            "current_time" | "current_time.txt" => Ok(Some(Self::current_time().into())),
            "memory_usage" | "memory_usage.json" => Ok(Some(Self::memory_usage()?.into())),
            _ => Ok(None),
        }
    }
}
