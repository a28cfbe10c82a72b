use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::config::JobConfig;
use crate::error::{DispatchError, Result};
use crate::metrics::MetricsSink;
use crate::scheduler::job::{CategorySet, Job};
use crate::scheduler::queue::WorkQueue;

/// Where the producer draws work from.
pub trait JobSource: Send + 'static {
    /// Next job to enqueue, or `None` once the source is exhausted.
    fn next_job(&mut self) -> Option<Job>;
}

/// A scripted, finite source that hands out jobs front to back.
impl JobSource for VecDeque<Job> {
    fn next_job(&mut self) -> Option<Job> {
        self.pop_front()
    }
}

/// Unbounded source of jobs with a uniformly random category and duration.
#[derive(Debug)]
pub struct RandomJobSource {
    categories: CategorySet,
    duration_ms: RangeInclusive<u64>,
    rng: StdRng,
}

impl RandomJobSource {
    /// Fails if `duration_ms` is empty (start after end).
    pub fn new(categories: CategorySet, duration_ms: RangeInclusive<u64>) -> Result<Self> {
        Self::with_rng(categories, duration_ms, StdRng::from_entropy())
    }

    /// Reproducible stream for a given seed
    pub fn seeded(
        categories: CategorySet,
        duration_ms: RangeInclusive<u64>,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(categories, duration_ms, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &JobConfig) -> Result<Self> {
        config.validate()?;
        let categories = CategorySet::new(&config.categories)?;
        Self::new(
            categories,
            config.min_duration_ms..=config.max_duration_ms,
        )
    }

    fn with_rng(
        categories: CategorySet,
        duration_ms: RangeInclusive<u64>,
        rng: StdRng,
    ) -> Result<Self> {
        if duration_ms.is_empty() {
            return Err(DispatchError::InvalidConfig(format!(
                "job duration range {}..={} ms is empty",
                duration_ms.start(),
                duration_ms.end()
            )));
        }

        Ok(Self {
            categories,
            duration_ms,
            rng,
        })
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }
}

impl JobSource for RandomJobSource {
    fn next_job(&mut self) -> Option<Job> {
        let index = self.rng.gen_range(0..self.categories.len());
        let category = self.categories.get(index)?.clone();
        let duration = Duration::from_millis(self.rng.gen_range(self.duration_ms.clone()));
        Some(Job::new(category, duration))
    }
}

/// Feeds jobs from `source` into `queue` until cancelled or the source runs dry.
///
/// The in-flight gauge is raised before the enqueue is attempted, so while the
/// queue is full the gauge counts the job the producer is holding. If shutdown
/// arrives during that wait the job never entered the queue and the increment
/// is reverted.
pub async fn produce<S: JobSource>(
    mut source: S,
    queue: WorkQueue,
    sink: Arc<dyn MetricsSink>,
    pacing: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut produced: u64 = 0;

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let Some(job) = source.next_job() else {
            tracing::info!(produced, "Job source exhausted");
            return Ok(());
        };
        let category = job.category_label();

        sink.add_in_flight(&category, 1);

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                sink.add_in_flight(&category, -1);
                break;
            }
            res = queue.enqueue(job) => {
                if let Err(e) = res {
                    sink.add_in_flight(&category, -1);
                    return Err(e);
                }
            }
        }
        produced += 1;

        if !pacing.is_zero() {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pacing) => {}
            }
        }
    }

    tracing::info!(produced, "Producer stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_jobs_stay_in_bounds() {
        let categories = CategorySet::new(["a", "b", "c"]).unwrap();
        let mut source = RandomJobSource::seeded(categories.clone(), 10..=109, 7).unwrap();

        for _ in 0..1_000 {
            let job = source.next_job().unwrap();
            assert!(categories.contains(job.category()));
            assert!(job.duration() >= Duration::from_millis(10));
            assert!(job.duration() <= Duration::from_millis(109));
        }
    }

    #[test]
    fn random_jobs_cover_every_category() {
        let categories = CategorySet::new(["a", "b", "c"]).unwrap();
        let mut source = RandomJobSource::seeded(categories, 1..=1, 11).unwrap();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..300 {
            seen.insert(source.next_job().unwrap().category().to_string());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn seeded_sources_repeat() {
        let categories = CategorySet::new(["a", "b"]).unwrap();
        let mut first = RandomJobSource::seeded(categories.clone(), 10..=109, 42).unwrap();
        let mut second = RandomJobSource::seeded(categories, 10..=109, 42).unwrap();
        for _ in 0..50 {
            assert_eq!(first.next_job(), second.next_job());
        }
    }

    #[test]
    fn from_config_rejects_bad_range() {
        let config = JobConfig {
            min_duration_ms: 50,
            max_duration_ms: 10,
            ..JobConfig::default()
        };
        assert!(RandomJobSource::from_config(&config).is_err());
    }

    #[test]
    fn inverted_duration_range_is_rejected() {
        let categories = CategorySet::new(["a"]).unwrap();
        let result = RandomJobSource::seeded(categories.clone(), 100..=10, 1);
        assert!(matches!(result, Err(DispatchError::InvalidConfig(_))));
        assert!(RandomJobSource::new(categories.clone(), 100..=10).is_err());

        // A single-value range is fine.
        let mut source = RandomJobSource::new(categories, 25..=25).unwrap();
        assert_eq!(source.next_job().unwrap().duration(), Duration::from_millis(25));
    }

    #[test]
    fn scripted_source_drains_in_order() {
        let mut source: VecDeque<Job> = VecDeque::from(vec![
            Job::new("a", Duration::from_millis(1)),
            Job::new("b", Duration::from_millis(2)),
        ]);
        assert_eq!(source.next_job().unwrap().category(), "a");
        assert_eq!(source.next_job().unwrap().category(), "b");
        assert!(source.next_job().is_none());
    }
}
