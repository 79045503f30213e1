//! Interval scheduler for background maintenance jobs.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How often a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFrequency {
    Seconds(u64),
    Minutes(u64),
    Hourly,
    Daily,
}

impl JobFrequency {
    pub fn duration(&self) -> Duration {
        match self {
            JobFrequency::Seconds(secs) => Duration::from_secs(*secs),
            JobFrequency::Minutes(mins) => Duration::from_secs(*mins * 60),
            JobFrequency::Hourly => Duration::from_secs(3600),
            JobFrequency::Daily => Duration::from_secs(86_400),
        }
    }
}

/// A unit of periodic background work.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn frequency(&self) -> JobFrequency;

    /// Run once. Errors are logged and the job runs again next tick.
    async fn execute(&self) -> Result<(), String>;
}

/// Runs registered jobs on their own interval until shut down.
pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Spawns one task per job. The first run happens one interval after start.
    pub fn start(&mut self) {
        info!(jobs = self.jobs.len(), "Starting job scheduler");

        for job in &self.jobs {
            let handle = tokio::spawn(run_job(Arc::clone(job), self.shutdown_rx.clone()));
            self.handles.push(handle);
        }
    }

    /// Signals every job to stop after its current run.
    pub fn shutdown(&self) {
        info!("Signalling job scheduler shutdown");
        let _ = self.shutdown_tx.send(true);
    }

    /// Waits for job tasks to finish, giving up after `timeout`.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let all = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!("Job task panicked: {}", e);
                }
            }
        };

        match tokio::time::timeout(timeout, all).await {
            Ok(()) => info!("All jobs stopped"),
            Err(_) => warn!(timeout = ?timeout, "Job shutdown timed out"),
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job(job: Arc<dyn Job>, mut shutdown_rx: watch::Receiver<bool>) {
    let name = job.name();
    let frequency = job.frequency();
    let mut interval = tokio::time::interval(frequency.duration());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // The first tick completes immediately.
    interval.tick().await;
    info!(job = name, frequency = ?frequency, "Job scheduled");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let start = Instant::now();
                match job.execute().await {
                    Ok(()) => info!(
                        job = name,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Job completed"
                    ),
                    Err(e) => error!(
                        job = name,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        error = %e,
                        "Job failed"
                    ),
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!(job = name, "Job stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting_job"
        }

        fn frequency(&self) -> JobFrequency {
            JobFrequency::Seconds(1)
        }

        async fn execute(&self) -> Result<(), String> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_frequency_durations() {
        assert_eq!(JobFrequency::Seconds(30).duration(), Duration::from_secs(30));
        assert_eq!(JobFrequency::Minutes(1).duration(), Duration::from_secs(60));
        assert_eq!(JobFrequency::Hourly.duration(), Duration::from_secs(3600));
        assert_eq!(JobFrequency::Daily.duration(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_register() {
        let mut scheduler = JobScheduler::default();
        scheduler.register(CountingJob {
            runs: Arc::new(AtomicUsize::new(0)),
        });
        assert_eq!(scheduler.job_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_runs_each_interval_then_stops() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = JobScheduler::new();
        scheduler.register(CountingJob {
            runs: Arc::clone(&runs),
        });
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(1)).await;
        let after = runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after);
    }
}
