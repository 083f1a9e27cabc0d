#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::System;

/// 系統負載快照；基準測試前負載過高會讓結果失真
#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct LoadSnapshot {
    pub cpu_usage: f32,
    pub used_memory_mb: u64,
    pub total_memory_mb: u64,
    pub memory_usage_percent: f32,
    pub elapsed_time: Duration,
}

#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    start_time: Instant,
    peak_memory: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let mut system = System::new();

        // 初始刷新，CPU 使用率需要兩次取樣才有意義
        system.refresh_memory();
        system.refresh_cpu_usage();

        Self {
            system: Mutex::new(system),
            start_time: Instant::now(),
            peak_memory: Mutex::new(0),
            enabled,
        }
    }

    pub fn snapshot(&self) -> Option<LoadSnapshot> {
        if !self.enabled {
            return None;
        }

        let mut system = self.system.lock().ok()?;
        system.refresh_memory();
        system.refresh_cpu_usage();

        let used_memory_mb = system.used_memory() / 1024 / 1024;
        let total_memory_mb = system.total_memory() / 1024 / 1024;
        let memory_usage_percent = if total_memory_mb > 0 {
            (used_memory_mb as f32 / total_memory_mb as f32) * 100.0
        } else {
            0.0
        };

        let mut peak = self.peak_memory.lock().ok()?;
        if used_memory_mb > *peak {
            *peak = used_memory_mb;
        }

        Some(LoadSnapshot {
            cpu_usage: system.global_cpu_usage(),
            used_memory_mb,
            total_memory_mb,
            memory_usage_percent,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn log_snapshot(&self, phase: &str) {
        if let Some(snapshot) = self.snapshot() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB/{}MB ({:.1}%), Time: {:?}",
                phase,
                snapshot.cpu_usage,
                snapshot.used_memory_mb,
                snapshot.total_memory_mb,
                snapshot.memory_usage_percent,
                snapshot.elapsed_time
            );
        }
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        let peak = self.peak_memory.lock().map(|p| *p).unwrap_or(0);
        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak System Memory: {}MB",
            self.start_time.elapsed(),
            peak
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 為非CLI環境提供空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_snapshot(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}
