// src/utils/system.rs: System functions

use std::time::Duration;

use log::{debug, warn};
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tokio::time::sleep;


/// Determines number of physical cores and the current CPU load.
///
/// # Returns
///
/// (physical cores, current cpu usage in percent)
pub async fn detect_cores_and_load() -> (usize, f32) {
    let refresh_kind = RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage());
    let mut system = System::new_with_specifics(refresh_kind);
    let physical_cores = System::physical_core_count().unwrap_or(1);
    // usage is a delta between two refreshes
    sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.max(Duration::from_millis(100))).await;
    system.refresh_cpu_specifics(CpuRefreshKind::nothing().with_cpu_usage());
    let cpu_load = system.global_cpu_usage();
    (physical_cores, cpu_load)
}

/// The thread count is handed to bwa and samtools untouched; this only warns
/// when it looks oversubscribed.
///
/// # Arguments
///
/// * `requested` - `--threads` from the command line.
/// * `physical_cores` - from detect_cores_and_load.
/// * `cpu_load` - from detect_cores_and_load.
///
/// # Returns
///
/// true when the request fits within the physical cores.
pub fn check_thread_request(requested: usize, physical_cores: usize, cpu_load: f32) -> bool {
    debug!(
        "Detected {} physical cores; CPU load {:.1}%; {} threads requested",
        physical_cores, cpu_load, requested
    );
    if requested > physical_cores {
        warn!(
            "Requested {} threads but only {} physical cores are available",
            requested, physical_cores
        );
        return false;
    }
    true
}
