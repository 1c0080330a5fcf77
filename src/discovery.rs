//! Endpoint discovery and hardware probing.
//!
//! Everything here is best-effort: probes return `Option` and log at warn or
//! debug level on failure, then the caller degrades to defaults. Discovery
//! never aborts provider construction.

use crate::config::FoundrySettings;
use crate::constants::DEFAULT_ENDPOINT;
use serde::Serialize;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

const CLI_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve the base endpoint for the local inference server.
///
/// Priority: configured `base_url`, then the Foundry CLI service status,
/// then the hardcoded default.
pub async fn discover_endpoint(settings: &FoundrySettings) -> String {
    if let Some(base_url) = &settings.base_url {
        let endpoint = base_url.trim_end_matches('/').to_string();
        info!(endpoint = %endpoint, "using configured endpoint");
        return endpoint;
    }

    if let Some(endpoint) = probe_cli_endpoint().await {
        info!(endpoint = %endpoint, "endpoint discovered via foundry CLI");
        return endpoint;
    }

    info!(endpoint = DEFAULT_ENDPOINT, "using default endpoint");
    DEFAULT_ENDPOINT.to_string()
}

/// Ask the Foundry CLI where the management service is running.
async fn probe_cli_endpoint() -> Option<String> {
    let output = tokio::time::timeout(
        CLI_PROBE_TIMEOUT,
        Command::new("foundry").args(["service", "status"]).output(),
    )
    .await;

    let output = match output {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(output)) => {
            debug!(status = ?output.status, "foundry CLI probe returned non-zero");
            return None;
        }
        Ok(Err(e)) => {
            debug!(error = %e, "foundry CLI not available");
            return None;
        }
        Err(_) => {
            debug!("foundry CLI probe timed out");
            return None;
        }
    };

    parse_service_status(&String::from_utf8_lossy(&output.stdout))
}

/// Extract the endpoint from `foundry service status` output.
///
/// Example line:
/// `Model management service is running on http://127.0.0.1:65320/openai/status`
pub fn parse_service_status(stdout: &str) -> Option<String> {
    let line = stdout.lines().find(|l| l.contains("running on"))?;
    let start = line.find("http://")?;
    let token = line[start..].split_whitespace().next()?;
    Some(token.replace("/status", "").trim_end_matches('/').to_string())
}

/// Check whether the endpoint answers the OpenAI-compatible models route.
///
/// Outcome is only logged; callers proceed regardless.
pub async fn check_connectivity(http: reqwest::Client, endpoint: String) {
    let url = format!("{}/models", endpoint.trim_end_matches('/'));
    match http.get(&url).timeout(CONNECTIVITY_TIMEOUT).send().await {
        Ok(response) if response.status().is_success() => {
            info!(url = %url, "endpoint connectivity verified");
        }
        Ok(response) => {
            warn!(url = %url, status = %response.status(), "endpoint returned unexpected status");
        }
        Err(e) if e.is_timeout() => {
            warn!(url = %url, "endpoint connectivity check timed out");
        }
        Err(e) => {
            warn!(url = %url, error = %e, "server not reachable");
        }
    }
}

/// What the local machine can run.
#[derive(Debug, Clone, Serialize)]
pub struct HardwareCapabilities {
    pub platform: String,
    pub has_gpu: bool,
    pub gpu_memory_mb: u64,
    pub cpu_cores: usize,
    pub memory_gb: u64,
    pub optimal_batch_size: u32,
}

/// Probe local hardware via shell commands and procfs.
pub async fn probe_hardware() -> Option<HardwareCapabilities> {
    let cpu_cores = match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            warn!(error = %e, "hardware probe failed");
            return None;
        }
    };

    let gpu_memory_mb = probe_gpu_memory_mb().await;
    let memory_gb = probe_system_memory_gb().await.unwrap_or(0);

    let capabilities = HardwareCapabilities {
        platform: std::env::consts::OS.to_string(),
        has_gpu: gpu_memory_mb.is_some(),
        gpu_memory_mb: gpu_memory_mb.unwrap_or(0),
        cpu_cores,
        memory_gb,
        optimal_batch_size: optimal_batch_size(gpu_memory_mb),
    };

    info!(
        cpu_cores = capabilities.cpu_cores,
        memory_gb = capabilities.memory_gb,
        has_gpu = capabilities.has_gpu,
        gpu_memory_mb = capabilities.gpu_memory_mb,
        "hardware capabilities detected"
    );

    Some(capabilities)
}

/// NVIDIA GPU memory, via nvidia-smi.
async fn probe_gpu_memory_mb() -> Option<u64> {
    let output = tokio::time::timeout(
        CLI_PROBE_TIMEOUT,
        Command::new("nvidia-smi")
            .args(["--query-gpu=memory.total", "--format=csv,noheader,nounits"])
            .output(),
    )
    .await
    .ok()?
    .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}

#[cfg(target_os = "linux")]
async fn probe_system_memory_gb() -> Option<u64> {
    let meminfo = tokio::fs::read_to_string("/proc/meminfo").await.ok()?;
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / (1024 * 1024))
}

#[cfg(target_os = "macos")]
async fn probe_system_memory_gb() -> Option<u64> {
    let output = tokio::time::timeout(
        CLI_PROBE_TIMEOUT,
        Command::new("sysctl").arg("hw.memsize").output(),
    )
    .await
    .ok()?
    .ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let bytes: u64 = stdout.split(':').nth(1)?.trim().parse().ok()?;
    Some(bytes / (1024 * 1024 * 1024))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
async fn probe_system_memory_gb() -> Option<u64> {
    None
}

fn optimal_batch_size(gpu_memory_mb: Option<u64>) -> u32 {
    match gpu_memory_mb {
        Some(mb) if mb >= 8000 => 4,
        Some(mb) if mb >= 4000 => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_status() {
        let stdout = "\
🟢 Model management service is running on http://127.0.0.1:65320/openai/status
Some other line";
        assert_eq!(
            parse_service_status(stdout).as_deref(),
            Some("http://127.0.0.1:65320/openai")
        );
    }

    #[test]
    fn test_parse_service_status_requires_running_marker() {
        assert!(parse_service_status("service is stopped").is_none());
        assert!(parse_service_status("running on nothing-useful").is_none());
    }

    #[test]
    fn test_optimal_batch_size_tiers() {
        assert_eq!(optimal_batch_size(Some(16384)), 4);
        assert_eq!(optimal_batch_size(Some(6144)), 2);
        assert_eq!(optimal_batch_size(Some(2048)), 1);
        assert_eq!(optimal_batch_size(None), 1);
    }

    #[tokio::test]
    async fn test_configured_base_url_wins() {
        let settings = crate::config::FoundrySettings::default()
            .with_base_url("http://10.0.0.5:9000/v1/");
        let endpoint = discover_endpoint(&settings).await;
        assert_eq!(endpoint, "http://10.0.0.5:9000/v1");
    }
}
