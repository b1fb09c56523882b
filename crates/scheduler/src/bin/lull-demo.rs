//! lull-demo: runs chunked background jobs under the frame-paced scheduler.
//!
//! Each job counts primes over its own range, one chunk per dispatch. While
//! the simulated user is "typing" (the first `--busy-secs` seconds) nothing
//! runs; afterwards jobs advance round-robin at most once per stable window.
//! The last job asks for urgent priority halfway through its work.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::Mutex;
use tracing::{info, warn};

use lull_core::config::load_dotenv;
use lull_scheduler::{
    ActivityMonitor, Config, Customer, CustomerState, FrameDriver, FrameSignal, Priority,
    Scheduler,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Frame-paced background job demo.
#[derive(Parser, Debug)]
#[command(name = "lull-demo", version, about)]
struct Cli {
    /// Optional TOML config file; env vars still override it.
    #[arg(long, env = "LULL_CONFIG")]
    config: Option<String>,

    /// Number of background jobs.
    #[arg(long, env = "LULL_DEMO_CUSTOMERS", default_value_t = 3)]
    customers: usize,

    /// Chunks of work per job.
    #[arg(long, env = "LULL_DEMO_CHUNKS", default_value_t = 20)]
    chunks: usize,

    /// Seconds of simulated user activity at startup.
    #[arg(long, env = "LULL_DEMO_BUSY_SECS", default_value_t = 1)]
    busy_secs: u64,

    /// Give up after this many seconds.
    #[arg(long, env = "LULL_DEMO_DURATION_SECS", default_value_t = 30)]
    duration_secs: u64,

    #[arg(long)]
    target_fps: Option<f64>,

    #[arg(long)]
    tick_threshold: Option<u32>,

    #[arg(long)]
    frame_interval_ms: Option<u64>,

    #[arg(long)]
    idle_timeout_ms: Option<u64>,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::from_env()?,
        };
        if let Some(v) = self.target_fps {
            config.scheduler.target_fps = v;
        }
        if let Some(v) = self.tick_threshold {
            config.scheduler.tick_threshold = v;
        }
        if let Some(v) = self.frame_interval_ms {
            config.driver.frame_interval_ms = v;
        }
        if let Some(v) = self.idle_timeout_ms {
            config.driver.idle_timeout_ms = v;
        }
        config.validate()?;
        Ok(config)
    }
}

// ── PrimeJob ────────────────────────────────────────────────────────

const CHUNK_SIZE: u64 = 5_000;

/// Counts primes in `[start, start + chunks * CHUNK_SIZE)`, one chunk per run.
struct PrimeJob {
    name: String,
    state: CustomerState,
    start: u64,
    chunks: usize,
    done_chunks: AtomicUsize,
    primes: AtomicU64,
    urgent_at: Option<usize>,
    cancelled: AtomicBool,
}

impl PrimeJob {
    fn new(name: String, start: u64, chunks: usize, urgent_at: Option<usize>) -> Self {
        Self {
            name,
            state: CustomerState::new(),
            start,
            chunks,
            done_chunks: AtomicUsize::new(0),
            primes: AtomicU64::new(0),
            urgent_at,
            cancelled: AtomicBool::new(false),
        }
    }

    fn is_finished(&self) -> bool {
        self.done_chunks.load(Ordering::Relaxed) >= self.chunks
            || self.cancelled.load(Ordering::Relaxed)
    }

    fn is_prime(n: u64) -> bool {
        if n < 2 {
            return false;
        }
        let mut d = 2;
        while d * d <= n {
            if n % d == 0 {
                return false;
            }
            d += 1;
        }
        true
    }
}

impl Customer for PrimeJob {
    fn run_task(&self) {
        if self.is_finished() {
            return;
        }
        let chunk = self.done_chunks.load(Ordering::Relaxed);
        let lo = self.start + chunk as u64 * CHUNK_SIZE;
        let found = (lo..lo + CHUNK_SIZE).filter(|&n| Self::is_prime(n)).count() as u64;
        self.primes.fetch_add(found, Ordering::Relaxed);
        let done = self.done_chunks.fetch_add(1, Ordering::Relaxed) + 1;
        info!(job = %self.name, chunk = done, of = self.chunks, found, "chunk complete");

        if self.urgent_at == Some(done) {
            info!(job = %self.name, "requesting urgent priority");
            self.state.raise_priority(Priority::Soon);
        }
    }

    fn pause_task(&self) {
        self.state.set_paused(true);
    }

    fn resume_task(&self) {
        self.state.set_paused(false);
    }

    fn cancel_task(&self) {
        if !self.is_finished() {
            warn!(job = %self.name, "job cancelled before completion");
        }
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn state(&self) -> &CustomerState {
        &self.state
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    config.log_summary();

    let signal = FrameSignal::new();
    let monitor = ActivityMonitor::new(config.driver.idle_timeout());
    let activity = monitor.handle();
    let scheduler = Arc::new(Mutex::new(Scheduler::new(
        config.scheduler.clone(),
        signal.clone(),
        monitor,
    )?));

    let jobs: Vec<Arc<PrimeJob>> = (0..cli.customers)
        .map(|i| {
            let urgent_at = (i + 1 == cli.customers).then_some(cli.chunks / 2);
            Arc::new(PrimeJob::new(
                format!("job-{i}"),
                i as u64 * cli.chunks as u64 * CHUNK_SIZE,
                cli.chunks,
                urgent_at,
            ))
        })
        .collect();

    {
        let mut s = scheduler.lock().await;
        for job in &jobs {
            s.add(job.clone(), &job.name, false);
        }
    }

    let driver = Arc::new(FrameDriver::new(
        scheduler.clone(),
        signal,
        config.driver.frame_interval(),
    ));
    let runner = driver.clone();
    let driver_handle = tokio::spawn(async move { runner.run().await });

    let started = Instant::now();
    let busy_for = Duration::from_secs(cli.busy_secs);
    let deadline = Duration::from_secs(cli.duration_secs);
    let mut poll = tokio::time::interval(Duration::from_millis(50));

    loop {
        poll.tick().await;
        if started.elapsed() < busy_for {
            activity.record_activity();
        }

        let mut s = scheduler.lock().await;
        for job in &jobs {
            if job.is_finished() && job.state().is_managed() {
                info!(
                    job = %job.name,
                    primes = job.primes.load(Ordering::Relaxed),
                    "job finished"
                );
                s.remove(&job.name, true);
            }
        }

        if s.queue_len() == 0 {
            info!(elapsed = ?started.elapsed(), "all jobs finished");
            break;
        }
        if started.elapsed() >= deadline {
            warn!(remaining = ?s.queue_names(), "deadline reached, clearing");
            s.clear();
            break;
        }
    }

    driver.shutdown();
    driver_handle.await?;

    let metrics = scheduler.lock().await.metrics();
    info!("final metrics: {}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
