//! Job status polling.
//!
//! Polling is an explicit state machine: every status observation is fed
//! through [`step`], which returns the next state and what to do next. The
//! only suspension point is the [`Scheduler`] sleep between polls, which is
//! also where the timeout ceiling is enforced.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::JobConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{Job, JobId, JobKind, JobStatus, JobStatusResponse};

/// Source of time and delays for the poller.
pub trait Scheduler: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Scheduler backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Anything that can report the status of a job.
pub trait JobStatusSource: Send + Sync {
    fn fetch_status(
        &self,
        job_id: &JobId,
    ) -> impl Future<Output = Result<JobStatusResponse>> + Send;
}

/// Polling phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    /// No status seen yet.
    #[default]
    Unknown,
    Processing,
    Completed,
    PartialCompleted,
    Failed,
    TimedOut,
}

impl PollPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollPhase::Unknown | PollPhase::Processing)
    }
}

/// Poller state between observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollState {
    pub phase: PollPhase,
    /// Time since polling started, as of the latest observation.
    pub elapsed: Duration,
    pub polls: u32,
    pub not_found_retries: u32,
}

/// Result of one status request.
#[derive(Debug, Clone)]
pub enum Observation {
    Status(JobStatusResponse),
    /// The job is not visible yet.
    NotFoundYet,
    /// A network condition that may clear up.
    Transient(String),
}

/// What the poller does next.
#[derive(Debug, Clone)]
pub enum Step {
    Wait(Duration),
    Terminal(JobStatusResponse),
    TimedOut,
}

/// Advance the poll state by one observation.
///
/// `state.elapsed` must already reflect the time of the observation.
pub fn step(state: PollState, observation: Observation, config: &JobConfig) -> (PollState, Step) {
    let mut next = PollState {
        polls: state.polls + 1,
        ..state
    };

    let delay = match observation {
        Observation::Status(response) => match response.status {
            JobStatus::Completed => {
                next.phase = PollPhase::Completed;
                return (next, Step::Terminal(response));
            }
            JobStatus::PartialCompleted => {
                next.phase = PollPhase::PartialCompleted;
                return (next, Step::Terminal(response));
            }
            JobStatus::Failed => {
                next.phase = PollPhase::Failed;
                return (next, Step::Terminal(response));
            }
            JobStatus::Processing | JobStatus::Unrecognized(_) => {
                next.phase = PollPhase::Processing;
                config.poll_interval
            }
        },
        Observation::NotFoundYet | Observation::Transient(_) => {
            next.not_found_retries += 1;
            config.not_found_retry_delay
        }
    };

    let ceiling = config.ceiling();
    if next.elapsed >= ceiling {
        next.phase = PollPhase::TimedOut;
        return (next, Step::TimedOut);
    }

    (next, Step::Wait(delay.min(ceiling - next.elapsed)))
}

/// Polls a job until it reaches a terminal state or the timeout ceiling.
#[derive(Debug, Clone)]
pub struct JobPoller<S = TokioScheduler> {
    config: JobConfig,
    scheduler: S,
}

impl JobPoller<TokioScheduler> {
    pub fn new(config: JobConfig) -> Self {
        Self::with_scheduler(config, TokioScheduler)
    }
}

impl<S: Scheduler> JobPoller<S> {
    pub fn with_scheduler(config: JobConfig, scheduler: S) -> Self {
        Self { config, scheduler }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Wait for a job to finish.
    ///
    /// A Failed job is returned as `Ok`; deciding whether it is a failure is
    /// left to the classifier.
    #[instrument(skip(self, source), fields(job_id = %job_id))]
    pub async fn wait<T: JobStatusSource>(
        &self,
        source: &T,
        job_id: &JobId,
        kind: JobKind,
    ) -> Result<Job> {
        let start = self.scheduler.now();
        let mut state = PollState::default();

        loop {
            let observation = observe(source.fetch_status(job_id).await)?;
            match &observation {
                Observation::Status(response) => {
                    if let JobStatus::Unrecognized(raw) = &response.status {
                        warn!(status = %raw, "Unrecognized job status, polling again");
                    } else {
                        debug!(status = %response.status, polls = state.polls + 1, "Job status");
                    }
                }
                Observation::NotFoundYet => debug!("Job not visible yet"),
                Observation::Transient(message) => {
                    warn!(error = %message, "Transient error while polling")
                }
            }

            state.elapsed = self.scheduler.now().saturating_duration_since(start);
            let (next, action) = step(state, observation, &self.config);
            state = next;

            match action {
                Step::Wait(delay) => self.scheduler.sleep(delay).await,
                Step::Terminal(response) => {
                    info!(
                        status = %response.status,
                        polls = state.polls,
                        elapsed_secs = state.elapsed.as_secs(),
                        "Job reached terminal state"
                    );
                    return Ok(Job::from_response(job_id.clone(), kind, response));
                }
                Step::TimedOut => {
                    return Err(Error::new(ErrorKind::Timeout {
                        job_id: job_id.to_string(),
                        elapsed_secs: state.elapsed.as_secs(),
                    }));
                }
            }
        }
    }
}

/// Sort a status result into an observation; hard errors propagate.
fn observe(result: Result<JobStatusResponse>) -> Result<Observation> {
    match result {
        Ok(response) if response.is_not_found() => Ok(Observation::NotFoundYet),
        Ok(response) => Ok(Observation::Status(response)),
        Err(e) if e.is_not_found() => Ok(Observation::NotFoundYet),
        Err(e) if e.is_transient() => Ok(Observation::Transient(e.to_string())),
        Err(e) if matches!(e.kind, ErrorKind::Api { status, .. } if status >= 500) => {
            Ok(Observation::Transient(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Virtual clock: sleeping advances time instantly.
    #[derive(Debug)]
    struct ManualScheduler {
        origin: Instant,
        offset: Mutex<Duration>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualScheduler {
        fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
                sleeps: Mutex::new(Vec::new()),
            }
        }

        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    impl Scheduler for ManualScheduler {
        fn now(&self) -> Instant {
            self.origin + *self.offset.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
            *self.offset.lock().unwrap() += duration;
            self.sleeps.lock().unwrap().push(duration);
            std::future::ready(())
        }
    }

    /// Replays scripted responses; the last one repeats forever.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<JobStatusResponse>>>,
        last: JobStatusResponse,
    }

    impl ScriptedSource {
        fn new(
            script: Vec<Result<JobStatusResponse>>,
            last: JobStatusResponse,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last,
            }
        }
    }

    impl JobStatusSource for ScriptedSource {
        fn fetch_status(
            &self,
            _job_id: &JobId,
        ) -> impl Future<Output = Result<JobStatusResponse>> + Send {
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(self.last.clone()));
            std::future::ready(next)
        }
    }

    fn status(raw: &str) -> JobStatusResponse {
        JobStatusResponse {
            id: None,
            status: JobStatus::parse(raw),
            objects: vec![],
            error: None,
        }
    }

    fn config(timeout_secs: u64) -> JobConfig {
        JobConfig::builder()
            .with_poll_interval(Duration::from_secs(5))
            .with_not_found_retry_delay(Duration::from_secs(2))
            .with_timeout(Duration::from_secs(timeout_secs))
            .build()
    }

    #[test]
    fn test_step_terminal_statuses() {
        for (raw, phase) in [
            ("completed", PollPhase::Completed),
            ("partial_success", PollPhase::PartialCompleted),
            ("FAILED", PollPhase::Failed),
        ] {
            let (state, action) = step(
                PollState::default(),
                Observation::Status(status(raw)),
                &config(60),
            );
            assert_eq!(state.phase, phase);
            assert!(state.phase.is_terminal());
            assert!(matches!(action, Step::Terminal(_)));
        }
    }

    #[test]
    fn test_step_processing_waits_poll_interval() {
        let (state, action) = step(
            PollState::default(),
            Observation::Status(status("running")),
            &config(60),
        );
        assert_eq!(state.phase, PollPhase::Processing);
        assert_eq!(state.polls, 1);
        assert!(matches!(action, Step::Wait(d) if d == Duration::from_secs(5)));
    }

    #[test]
    fn test_step_not_found_waits_retry_delay() {
        let (state, action) = step(PollState::default(), Observation::NotFoundYet, &config(60));
        assert_eq!(state.phase, PollPhase::Unknown);
        assert_eq!(state.not_found_retries, 1);
        assert!(matches!(action, Step::Wait(d) if d == Duration::from_secs(2)));
    }

    #[test]
    fn test_step_times_out_iff_elapsed_reaches_ceiling() {
        let cfg = config(10);
        for (elapsed, timed_out) in [(9, false), (10, true), (11, true)] {
            let state = PollState {
                elapsed: Duration::from_secs(elapsed),
                ..Default::default()
            };
            let (next, action) = step(state, Observation::Status(status("running")), &cfg);
            assert_eq!(matches!(action, Step::TimedOut), timed_out, "elapsed {elapsed}");
            assert_eq!(next.phase == PollPhase::TimedOut, timed_out);
        }
    }

    #[test]
    fn test_step_clamps_wait_to_remaining_time() {
        let state = PollState {
            elapsed: Duration::from_secs(8),
            ..Default::default()
        };
        let (_, action) = step(state, Observation::Status(status("running")), &config(10));
        assert!(matches!(action, Step::Wait(d) if d == Duration::from_secs(2)));
    }

    #[test]
    fn test_step_terminal_wins_over_timeout() {
        let state = PollState {
            elapsed: Duration::from_secs(100),
            ..Default::default()
        };
        let (_, action) = step(state, Observation::Status(status("done")), &config(10));
        assert!(matches!(action, Step::Terminal(_)));
    }

    #[tokio::test]
    async fn test_wait_tolerates_not_found_and_transient_errors() {
        let source = ScriptedSource::new(
            vec![
                Err(Error::new(ErrorKind::Api {
                    status: 404,
                    message: "Job not found".into(),
                })),
                Err(Error::new(ErrorKind::Transient("connection reset".into()))),
                Ok(status("Paused")),
                Ok(status("in-progress")),
            ],
            status("COMPLETED"),
        );
        let poller = JobPoller::with_scheduler(config(600), ManualScheduler::new());

        let job = poller
            .wait(&source, &JobId::new("job-1"), JobKind::Export)
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.kind, JobKind::Export);
        assert_eq!(
            poller.scheduler.sleeps(),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(5),
            ]
        );
    }

    #[tokio::test]
    async fn test_wait_times_out_at_ceiling_without_oversleeping() {
        let source = ScriptedSource::new(vec![], status("processing"));
        let poller = JobPoller::with_scheduler(config(12), ManualScheduler::new());

        let err = poller
            .wait(&source, &JobId::new("job-9"), JobKind::Import)
            .await
            .unwrap_err();

        match err.kind {
            ErrorKind::Timeout {
                ref job_id,
                elapsed_secs,
            } => {
                assert_eq!(job_id, "job-9");
                assert_eq!(elapsed_secs, 12);
            }
            ref other => panic!("unexpected kind: {other:?}"),
        }
        assert!(err.to_string().contains("job-9"));
        let total: Duration = poller.scheduler.sleeps().iter().sum();
        assert_eq!(total, Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_wait_propagates_hard_errors() {
        let source = ScriptedSource::new(
            vec![Err(Error::new(ErrorKind::Api {
                status: 401,
                message: "expired token".into(),
            }))],
            status("completed"),
        );
        let poller = JobPoller::with_scheduler(config(600), ManualScheduler::new());

        let err = poller
            .wait(&source, &JobId::new("job-1"), JobKind::Export)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Api { status: 401, .. }));
        assert!(poller.scheduler.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_wait_returns_failed_job_without_error() {
        let source = ScriptedSource::new(vec![], status("failed"));
        let poller = JobPoller::with_scheduler(config(600), ManualScheduler::new());

        let job = poller
            .wait(&source, &JobId::new("job-1"), JobKind::Export)
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }
}
