//! Integration tests for the tokio frame driver.
//!
//! Runs a real `FrameDriver` against a scheduler with a permissive gate and
//! checks that queued customers get dispatched and that an empty scheduler
//! stops requesting frames.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;

use lull_scheduler::{
    ActivityMonitor, Customer, CustomerState, FrameDriver, FrameSignal, Scheduler,
    SchedulerConfig,
};

const TIMEOUT: Duration = Duration::from_secs(5);
const FRAME: Duration = Duration::from_millis(2);

struct CountingCustomer {
    state: CustomerState,
    runs: AtomicUsize,
}

impl CountingCustomer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: CustomerState::new(),
            runs: AtomicUsize::new(0),
        })
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }
}

impl Customer for CountingCustomer {
    fn run_task(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }
    fn pause_task(&self) {
        self.state.set_paused(true);
    }
    fn resume_task(&self) {
        self.state.set_paused(false);
    }
    fn cancel_task(&self) {}
    fn state(&self) -> &CustomerState {
        &self.state
    }
}

/// One frame per second budget and a threshold of one: any two frames pass.
fn permissive_scheduler(signal: &FrameSignal) -> Arc<Mutex<Scheduler>> {
    let config = SchedulerConfig {
        target_fps: 1.0,
        tick_threshold: 1,
    };
    let idle = ActivityMonitor::new(Duration::ZERO);
    Arc::new(Mutex::new(Scheduler::new(config, signal.clone(), idle).unwrap()))
}

async fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    timeout(TIMEOUT, async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn driver_dispatches_round_robin() {
    let signal = FrameSignal::new();
    let scheduler = permissive_scheduler(&signal);
    let driver = Arc::new(FrameDriver::new(scheduler.clone(), signal.clone(), FRAME));

    let a = CountingCustomer::new();
    let b = CountingCustomer::new();
    {
        let mut s = scheduler.lock().await;
        s.add(a.clone(), "a", false);
        s.add(b.clone(), "b", false);
    }

    let runner = driver.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    let a_probe = a.clone();
    let b_probe = b.clone();
    assert!(
        wait_until(move || a_probe.runs() >= 2 && b_probe.runs() >= 2).await,
        "both customers should have run"
    );

    driver.shutdown();
    timeout(TIMEOUT, handle).await.unwrap().unwrap();

    // Strict alternation: neither customer can be more than one run ahead.
    let diff = a.runs().abs_diff(b.runs());
    assert!(diff <= 1, "round robin drifted: a={} b={}", a.runs(), b.runs());
}

#[tokio::test]
async fn driver_goes_dormant_when_queue_empties() {
    let signal = FrameSignal::new();
    let scheduler = permissive_scheduler(&signal);
    let driver = Arc::new(FrameDriver::new(scheduler.clone(), signal.clone(), FRAME));

    let a = CountingCustomer::new();
    scheduler.lock().await.add(a.clone(), "a", false);

    let runner = driver.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    let probe = a.clone();
    assert!(wait_until(move || probe.runs() >= 1).await);

    scheduler.lock().await.remove("a", false);

    // One more frame observes the empty queue, then nothing is requested.
    let s = scheduler.clone();
    let sig = signal.clone();
    assert!(
        wait_until(move || {
            let armed = s.try_lock().map(|g| g.is_armed()).unwrap_or(true);
            !armed && !sig.is_pending()
        })
        .await,
        "driver should stop requesting frames"
    );

    let runs = a.runs();
    tokio::time::sleep(FRAME * 10).await;
    assert_eq!(a.runs(), runs);

    driver.shutdown();
    timeout(TIMEOUT, handle).await.unwrap().unwrap();
}

/// A stall longer than the frame budget must reach the gate as a late frame,
/// even though the driver's interval still fires on its own schedule.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_frame_is_judged_late() {
    let signal = FrameSignal::new();
    // 50ms budget; the window never completes during the test.
    let config = SchedulerConfig {
        target_fps: 20.0,
        tick_threshold: 1_000,
    };
    let idle = ActivityMonitor::new(Duration::ZERO);
    let scheduler = Arc::new(Mutex::new(Scheduler::new(config, signal.clone(), idle).unwrap()));
    let driver = Arc::new(FrameDriver::new(scheduler.clone(), signal.clone(), FRAME));

    let a = CountingCustomer::new();
    scheduler.lock().await.add(a.clone(), "a", false);

    let runner = driver.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    let s = scheduler.clone();
    assert!(
        wait_until(move || s.try_lock().map(|g| g.metrics().ticks >= 3).unwrap_or(false)).await,
        "driver should be delivering frames"
    );

    let late_before = {
        let guard = scheduler.lock().await;
        let late = guard.metrics().late_frames;
        std::thread::sleep(Duration::from_millis(200));
        late
    };

    let s = scheduler.clone();
    assert!(
        wait_until(move || {
            s.try_lock()
                .map(|g| g.metrics().late_frames > late_before)
                .unwrap_or(false)
        })
        .await,
        "stalled frame should count as late"
    );
    assert_eq!(a.runs(), 0);

    driver.shutdown();
    timeout(TIMEOUT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_before_run_returns_immediately() {
    let signal = FrameSignal::new();
    let scheduler = permissive_scheduler(&signal);
    let driver = FrameDriver::new(scheduler, signal, FRAME);

    driver.shutdown();
    timeout(TIMEOUT, driver.run()).await.unwrap();
}
