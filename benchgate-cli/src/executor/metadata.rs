//! System Metadata Collection
//!
//! Report metadata: harness version, timestamp, git commit and branch of the
//! working directory, and a description of the host taken from `sysinfo`.
//! Anything that cannot be determined is left empty.

use super::execution::ExecutionConfig;
use benchgate_report::{ReportConfig, ReportMeta, SCHEMA_VERSION, SystemInfo};
use chrono::Utc;
use std::process::Command;
use sysinfo::System;

/// Build report metadata for a run with `config`.
pub fn build_report_meta(config: &ExecutionConfig) -> ReportMeta {
    ReportMeta {
        schema_version: SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        git_commit: git(&["rev-parse", "HEAD"]),
        git_branch: git(&["rev-parse", "--abbrev-ref", "HEAD"]),
        system: system_info(),
        config: ReportConfig {
            warmup_time_ns: config.warmup_time_ns,
            measurement_time_ns: config.measurement_time_ns,
            min_iterations: config.min_iterations,
            max_iterations: config.max_iterations,
            bootstrap_iterations: config.bootstrap_iterations,
            confidence_level: config.confidence_level,
        },
    }
}

/// Describe the host.
pub fn system_info() -> SystemInfo {
    let mut sys = System::new();
    sys.refresh_cpu();
    sys.refresh_memory();

    let logical = sys.cpus().len();
    let cores = sys.physical_core_count().unwrap_or(logical);

    SystemInfo {
        os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        os_version: System::os_version().unwrap_or_default(),
        kernel_version: System::kernel_version().unwrap_or_default(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: cores as u32,
        memory_gb: sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
