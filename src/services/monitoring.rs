//! Point-in-time host and service checks feeding the health score
//!
//! Every check degrades on its own: a failed disk, network or service check
//! substitutes flagged fallback data instead of failing the whole payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use sysinfo::{Disks, Networks, System};
use tokio::task;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::health::{self, HealthScore, HealthStatus, Observations};
use super::round2;
use crate::db::Db;
use crate::models::application::AppStatus;

pub const CPU_SAMPLE_WINDOW: Duration = Duration::from_millis(100);

const ESTIMATED_DISK_TOTAL: u64 = 100 * 1024 * 1024 * 1024;
const ESTIMATED_DISK_USAGE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuSource {
    Rusage,
    Loadavg,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuMetrics {
    pub usage: f64,
    pub cores: usize,
    pub load_average: [f64; 3],
    pub source: CpuSource,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryMetrics {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage: f64,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskMetrics {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage: f64,
    pub status: HealthStatus,
    pub estimated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkMetrics {
    pub received: u64,
    pub transmitted: u64,
    pub interfaces: usize,
    pub estimated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceItem {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServicesMetrics {
    pub total: usize,
    pub running: usize,
    pub percentage: f64,
    pub status: HealthStatus,
    pub items: Vec<ServiceItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub uptime: u64,
    pub pid: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    pub timestamp: DateTime<Utc>,
    pub health: HealthScore,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub network: NetworkMetrics,
    pub services: ServicesMetrics,
    pub process: ProcessMetrics,
}

/// Blocking sysinfo reads, taken together on a blocking thread
#[derive(Debug, Clone)]
struct HostSnapshot {
    cores: usize,
    load_average: [f64; 3],
    memory: MemoryMetrics,
    disk: DiskMetrics,
    network: NetworkMetrics,
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

fn estimated_disk() -> DiskMetrics {
    let used = (ESTIMATED_DISK_TOTAL as f64 * ESTIMATED_DISK_USAGE / 100.0) as u64;
    DiskMetrics {
        total: ESTIMATED_DISK_TOTAL,
        used,
        free: ESTIMATED_DISK_TOTAL - used,
        usage: ESTIMATED_DISK_USAGE,
        status: health::disk_status(ESTIMATED_DISK_USAGE),
        estimated: true,
    }
}

fn estimated_network() -> NetworkMetrics {
    NetworkMetrics {
        received: 0,
        transmitted: 0,
        interfaces: 0,
        estimated: true,
    }
}

fn read_memory(sys: &mut System) -> MemoryMetrics {
    sys.refresh_memory();
    let total = sys.total_memory();
    let used = sys.used_memory().min(total);
    let usage = percentage(used, total);
    MemoryMetrics {
        total,
        used,
        free: total - used,
        usage,
        status: health::memory_status(usage),
    }
}

/// Root filesystem if mounted, otherwise the largest disk
fn read_disk() -> DiskMetrics {
    let disks = Disks::new_with_refreshed_list();
    let chosen = disks
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.iter().max_by_key(|d| d.total_space()));

    match chosen {
        Some(disk) if disk.total_space() > 0 => {
            let total = disk.total_space();
            let free = disk.available_space().min(total);
            let used = total - free;
            let usage = percentage(used, total);
            DiskMetrics {
                total,
                used,
                free,
                usage,
                status: health::disk_status(usage),
                estimated: false,
            }
        }
        _ => {
            debug!("No disk information available, using estimate");
            estimated_disk()
        }
    }
}

fn read_network() -> NetworkMetrics {
    let networks = Networks::new_with_refreshed_list();
    let mut metrics = NetworkMetrics {
        received: 0,
        transmitted: 0,
        interfaces: 0,
        estimated: false,
    };

    for (_name, data) in networks.iter() {
        metrics.received += data.total_received();
        metrics.transmitted += data.total_transmitted();
        metrics.interfaces += 1;
    }

    if metrics.interfaces == 0 {
        debug!("No network interfaces reported, using estimate");
        return estimated_network();
    }
    metrics
}

fn host_snapshot() -> HostSnapshot {
    let mut sys = System::new();
    sys.refresh_cpu();
    let cores = sys.cpus().len().max(1);
    let load = System::load_average();

    HostSnapshot {
        cores,
        load_average: [load.one, load.five, load.fifteen],
        memory: read_memory(&mut sys),
        disk: read_disk(),
        network: read_network(),
    }
}

fn fallback_snapshot() -> HostSnapshot {
    HostSnapshot {
        cores: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        load_average: [0.0; 3],
        memory: MemoryMetrics {
            total: 0,
            used: 0,
            free: 0,
            usage: 0.0,
            status: HealthStatus::Healthy,
        },
        disk: estimated_disk(),
        network: estimated_network(),
    }
}

/// User plus system CPU time consumed by this process
#[cfg(unix)]
fn process_cpu_time() -> Option<Duration> {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if ret != 0 {
        return None;
    }

    let to_duration = |tv: libc::timeval| {
        Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
    };
    Some(to_duration(usage.ru_utime) + to_duration(usage.ru_stime))
}

#[cfg(not(unix))]
fn process_cpu_time() -> Option<Duration> {
    None
}

/// Process CPU time over wall time, as a percentage capped at 100
pub fn cpu_percentage(cpu_time: Duration, wall_time: Duration) -> f64 {
    if wall_time.is_zero() {
        return 0.0;
    }
    round2((cpu_time.as_secs_f64() / wall_time.as_secs_f64() * 100.0).min(100.0))
}

/// One-minute load average over core count, as a percentage
pub fn load_percentage(load_one: f64, cores: usize) -> f64 {
    round2(load_one / cores.max(1) as f64 * 100.0)
}

/// Sample process CPU usage over `CPU_SAMPLE_WINDOW`
pub async fn sample_cpu(cores: usize, load_one: f64) -> (f64, CpuSource) {
    let Some(before) = process_cpu_time() else {
        return (load_percentage(load_one, cores), CpuSource::Loadavg);
    };
    let started = Instant::now();

    sleep(CPU_SAMPLE_WINDOW).await;

    match process_cpu_time() {
        Some(after) => (
            cpu_percentage(after.saturating_sub(before), started.elapsed()),
            CpuSource::Rusage,
        ),
        None => (load_percentage(load_one, cores), CpuSource::Loadavg),
    }
}

/// The database plus every registered application, each counted as one
/// service
pub async fn check_services(db: &Db) -> ServicesMetrics {
    let applications = sqlx::query_as::<_, (String, AppStatus)>(
        "SELECT name, status FROM applications ORDER BY name ASC",
    )
    .fetch_all(db.pool())
    .await;

    let mut items = Vec::new();
    match applications {
        Ok(rows) => {
            items.push(ServiceItem {
                name: "database".to_string(),
                status: "running".to_string(),
            });
            items.extend(rows.into_iter().map(|(name, status)| ServiceItem {
                name,
                status: status.as_str().to_string(),
            }));
        }
        Err(e) => {
            warn!("Service check could not reach the database: {}", e);
            items.push(ServiceItem {
                name: "database".to_string(),
                status: "stopped".to_string(),
            });
        }
    }

    services_from_items(items)
}

fn services_from_items(items: Vec<ServiceItem>) -> ServicesMetrics {
    let total = items.len();
    let running = items.iter().filter(|i| i.status == "running").count();
    let percentage = percentage(running as u64, total as u64);

    ServicesMetrics {
        total,
        running,
        percentage,
        status: health::services_status(percentage),
        items,
    }
}

/// Full metrics payload. Never fails.
pub async fn collect(db: &Db, uptime: Duration) -> SystemMetrics {
    let host = match task::spawn_blocking(host_snapshot).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Host sampling failed, using estimates: {}", e);
            fallback_snapshot()
        }
    };

    let ((cpu_usage, source), services) = tokio::join!(
        sample_cpu(host.cores, host.load_average[0]),
        check_services(db)
    );

    let cpu = CpuMetrics {
        usage: cpu_usage,
        cores: host.cores,
        load_average: host.load_average,
        source,
        status: health::cpu_status(cpu_usage),
    };

    let health = health::evaluate(&Observations {
        cpu_usage: cpu.usage,
        memory_usage: host.memory.usage,
        disk_usage: host.disk.usage,
        services_running: services.percentage,
    });

    SystemMetrics {
        timestamp: Utc::now(),
        health,
        cpu,
        memory: host.memory,
        disk: host.disk,
        network: host.network,
        services,
        process: ProcessMetrics {
            uptime: uptime.as_secs(),
            pid: std::process::id(),
        },
    }
}
