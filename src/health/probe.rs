//! Process and host memory probes.

use sysinfo::{ProcessesToUpdate, System};

/// Fraction of host memory above which the memory check fails.
pub const MEMORY_HEADROOM_THRESHOLD: f64 = 0.9;

/// Memory figures in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub process_resident: u64,
    pub process_virtual: u64,
    pub system_used: u64,
    pub system_total: u64,
}

impl MemorySnapshot {
    pub fn capture() -> Self {
        let mut system = System::new();
        system.refresh_memory();

        let mut snapshot = MemorySnapshot {
            system_used: system.used_memory(),
            system_total: system.total_memory(),
            ..MemorySnapshot::default()
        };

        if let Ok(pid) = sysinfo::get_current_pid() {
            system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            if let Some(process) = system.process(pid) {
                snapshot.process_resident = process.memory();
                snapshot.process_virtual = process.virtual_memory();
            }
        }

        snapshot
    }
}

/// True while used memory stays under the headroom threshold.
/// Unknown totals fail the check.
pub fn memory_headroom_ok(used: u64, total: u64) -> bool {
    total > 0 && (used as f64) < (total as f64) * MEMORY_HEADROOM_THRESHOLD
}

pub fn to_megabytes(bytes: u64) -> u64 {
    (bytes as f64 / (1024.0 * 1024.0)).round() as u64
}
