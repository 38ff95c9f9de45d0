use std::time::Duration;

use crate::config::RetryConfig;
use crate::fetch::FetchOutcome;
use crate::job::Job;

/// What to do with a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Bump the attempt counter and re-queue after `delay`.
    Requeue { delay: Duration },
    /// Transient failure, but the retry budget is spent.
    Abandon,
    /// Not retryable: the outcome is final.
    Terminal,
}

/// Capped exponential backoff between re-queues of the same job.
///
/// The retry budget itself lives on each [`Job`]; this only decides whether an
/// outcome is retryable and how long to wait before re-queueing.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay before the first retry. Zero re-queues immediately.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    /// Negative or NaN base delays mean no wait; one too large for a `Duration`
    /// is clamped to the cap.
    fn from(cfg: &RetryConfig) -> Self {
        let max_delay = Duration::from_secs(cfg.max_delay_secs);
        let base_delay = match Duration::try_from_secs_f64(cfg.base_delay_secs.max(0.0)) {
            Ok(delay) => delay,
            Err(e) => {
                tracing::warn!(
                    base_delay_secs = cfg.base_delay_secs,
                    error = %e,
                    "retry base delay out of range, using max delay"
                );
                max_delay
            }
        };
        Self {
            base_delay,
            max_delay,
        }
    }
}

impl RetryPolicy {
    /// Re-queue without waiting.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Decide the next step for `job` after `outcome`.
    pub fn decide(&self, job: &Job, outcome: &FetchOutcome) -> RetryDecision {
        match outcome {
            FetchOutcome::TransientFailure(_) => {
                if job.attempt() < job.max_retries() {
                    RetryDecision::Requeue {
                        delay: self.backoff(job.attempt() + 1),
                    }
                } else {
                    RetryDecision::Abandon
                }
            }
            _ => RetryDecision::Terminal,
        }
    }

    /// Backoff before retry number `retry` (1-based): base * 2^(retry-1), capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = 1u32 << retry.saturating_sub(1).min(8);
        self.base_delay.saturating_mul(exp).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::build_jobs;
    use crate::job::test_support::template;

    fn job_with_retries(max_retries: u32) -> Job {
        let mut t = template("p-");
        t.max_retries = max_retries;
        build_jobs(t, 1, None).remove(0)
    }

    fn transient() -> FetchOutcome {
        FetchOutcome::TransientFailure("connection refused".to_string())
    }

    #[test]
    fn transient_is_requeued_until_budget_spent() {
        let p = RetryPolicy::immediate();
        let mut job = job_with_retries(2);
        assert!(matches!(p.decide(&job, &transient()), RetryDecision::Requeue { .. }));
        job.record_retry();
        assert!(matches!(p.decide(&job, &transient()), RetryDecision::Requeue { .. }));
        job.record_retry();
        assert_eq!(p.decide(&job, &transient()), RetryDecision::Abandon);
    }

    #[test]
    fn zero_budget_abandons_on_first_failure() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(&job_with_retries(0), &transient()), RetryDecision::Abandon);
    }

    #[test]
    fn definitive_answers_are_terminal_regardless_of_budget() {
        let p = RetryPolicy::default();
        let job = job_with_retries(100);
        for outcome in [
            FetchOutcome::NotFound,
            FetchOutcome::HttpError(500),
            FetchOutcome::HttpError(403),
            FetchOutcome::Failed("disk full".to_string()),
        ] {
            assert_eq!(p.decide(&job, &outcome), RetryDecision::Terminal, "{outcome:?}");
        }
    }

    #[test]
    fn exponential_backoff_grows_and_is_capped() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff(1), Duration::from_millis(250));
        assert_eq!(p.backoff(2), Duration::from_millis(500));
        assert_eq!(p.backoff(3), Duration::from_secs(1));
        assert_eq!(p.backoff(20), p.max_delay);
    }

    #[test]
    fn immediate_policy_never_waits() {
        let p = RetryPolicy::immediate();
        assert_eq!(p.backoff(1), Duration::ZERO);
        assert_eq!(
            p.decide(&job_with_retries(1), &transient()),
            RetryDecision::Requeue {
                delay: Duration::ZERO
            }
        );
    }

    #[test]
    fn from_config() {
        let cfg = RetryConfig {
            base_delay_secs: 0.5,
            max_delay_secs: 4,
        };
        let p = RetryPolicy::from(&cfg);
        assert_eq!(p.base_delay, Duration::from_millis(500));
        assert_eq!(p.max_delay, Duration::from_secs(4));
    }

    #[test]
    fn out_of_range_base_delay_is_clamped() {
        for raw in ["inf", "1e300"] {
            let cfg: RetryConfig =
                toml::from_str(&format!("base_delay_secs = {raw}\nmax_delay_secs = 7\n")).unwrap();
            let p = RetryPolicy::from(&cfg);
            assert_eq!(p.base_delay, Duration::from_secs(7), "{raw}");
            assert_eq!(p.backoff(3), Duration::from_secs(7), "{raw}");
        }
    }

    #[test]
    fn negative_or_nan_base_delay_means_no_wait() {
        for raw in ["-1.5", "nan", "-inf"] {
            let cfg: RetryConfig =
                toml::from_str(&format!("base_delay_secs = {raw}\nmax_delay_secs = 7\n")).unwrap();
            assert_eq!(RetryPolicy::from(&cfg).base_delay, Duration::ZERO, "{raw}");
        }
    }
}
