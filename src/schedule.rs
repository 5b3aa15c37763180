//! Daily scheduling of backup runs

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone};
use tracing::{error, info};

use crate::backup::BackupJob;
use crate::core::RunReport;
use crate::error::Result;

/// Source of run times
#[async_trait]
pub trait Trigger: Send {
    /// Wait until the next run is due; `None` ends the schedule
    async fn next_fire(&mut self) -> Option<DateTime<Local>>;
}

/// Fires once a day at a fixed local wall-clock time, forever
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    at: NaiveTime,
}

impl DailyTrigger {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Midnight, the classic `@daily`
    pub fn midnight() -> Self {
        Self::new(NaiveTime::default())
    }

    /// First fire time strictly after `now`
    ///
    /// A time skipped by a DST transition fires one hour later that day; a time
    /// repeated by one fires at its first occurrence.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let mut date = now.date_naive();
        loop {
            if let Some(fire) = resolve_local(&tz, date.and_time(self.at)) {
                if fire > *now {
                    return fire;
                }
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => return now.clone(),
            };
        }
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
}

#[async_trait]
impl Trigger for DailyTrigger {
    async fn next_fire(&mut self) -> Option<DateTime<Local>> {
        let now = Local::now();
        let fire = self.next_after(&now);
        let wait = (fire - now).to_std().unwrap_or_default();

        info!(next_run = %fire, wait_secs = wait.as_secs(), "waiting for next scheduled run");
        tokio::time::sleep(wait).await;
        Some(fire)
    }
}

/// Runs a [`BackupJob`] every time its trigger fires
pub struct Scheduler<T> {
    job: BackupJob,
    trigger: T,
    run_on_start: bool,
    stop_on_failure: bool,
}

impl<T: Trigger> Scheduler<T> {
    pub fn new(job: BackupJob, trigger: T) -> Self {
        Self {
            job,
            trigger,
            run_on_start: false,
            stop_on_failure: false,
        }
    }

    /// Run once immediately before waiting for the first fire
    pub fn run_on_start(mut self, enabled: bool) -> Self {
        self.run_on_start = enabled;
        self
    }

    /// Return the first failed run's error instead of waiting for the next fire
    pub fn stop_on_failure(mut self, enabled: bool) -> Self {
        self.stop_on_failure = enabled;
        self
    }

    /// Run until the trigger is exhausted; returns the number of runs attempted
    ///
    /// A [`DailyTrigger`] never ends, so with it this only returns on failure when
    /// `stop_on_failure` is set.
    pub async fn run(&mut self, source: &Path, bucket: &str) -> Result<usize> {
        let mut runs = 0;

        if self.run_on_start {
            info!("running backup on start");
            runs += 1;
            self.run_one(source, bucket, runs).await?;
        }

        while let Some(fired_at) = self.trigger.next_fire().await {
            runs += 1;
            info!(run = runs, %fired_at, "scheduled backup triggered");
            self.run_one(source, bucket, runs).await?;
        }

        info!(runs, "schedule finished");
        Ok(runs)
    }

    async fn run_one(&self, source: &Path, bucket: &str, run: usize) -> Result<()> {
        let outcome = self
            .job
            .run(source, bucket)
            .await
            .and_then(RunReport::into_result);

        match outcome {
            Ok(report) => {
                info!(run, uploaded = report.uploaded, bytes = report.bytes, "scheduled backup succeeded");
                Ok(())
            }
            Err(err) if self.stop_on_failure => {
                error!(run, error = %err, "scheduled backup failed, stopping");
                Err(err)
            }
            Err(err) => {
                error!(run, error = %err, "scheduled backup failed, waiting for next run");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SourceConfig, TransferConfig};
    use crate::error::StashError;
    use chrono::{FixedOffset, Utc};
    use skystash_store::MemoryStore;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Fires a fixed number of times without waiting
    struct CountdownTrigger {
        fires: VecDeque<DateTime<Local>>,
    }

    impl CountdownTrigger {
        fn new(count: usize) -> Self {
            Self {
                fires: (0..count).map(|_| Local::now()).collect(),
            }
        }
    }

    #[async_trait]
    impl Trigger for CountdownTrigger {
        async fn next_fire(&mut self) -> Option<DateTime<Local>> {
            self.fires.pop_front()
        }
    }

    fn job(store: &MemoryStore) -> BackupJob {
        BackupJob::new(
            Arc::new(store.clone()),
            TransferConfig::default(),
            SourceConfig::default(),
        )
        .unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_next_after_same_day() {
        let trigger = DailyTrigger::new(NaiveTime::from_hms_opt(3, 30, 0).unwrap());
        assert_eq!(
            trigger.next_after(&utc("2024-05-01T01:00:00Z")),
            utc("2024-05-01T03:30:00Z")
        );
    }

    #[test]
    fn test_next_after_rolls_to_tomorrow() {
        let trigger = DailyTrigger::midnight();
        assert_eq!(
            trigger.next_after(&utc("2024-05-01T12:00:00Z")),
            utc("2024-05-02T00:00:00Z")
        );
        // Exactly on the fire time moves to the next day
        assert_eq!(
            trigger.next_after(&utc("2024-05-02T00:00:00Z")),
            utc("2024-05-03T00:00:00Z")
        );
        // Year boundary
        assert_eq!(
            trigger.next_after(&utc("2024-12-31T23:59:59Z")),
            utc("2025-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_next_after_keeps_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 5, 1, 23, 0, 0).unwrap();
        let trigger = DailyTrigger::new(NaiveTime::from_hms_opt(22, 0, 0).unwrap());

        let fire = trigger.next_after(&now);
        assert_eq!(fire, tz.with_ymd_and_hms(2024, 5, 2, 22, 0, 0).unwrap());
        assert_eq!(fire.offset(), &tz);
    }

    #[tokio::test]
    async fn test_runs_on_every_fire() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), b"data").unwrap();
        let store = MemoryStore::with_buckets(["b"]);

        let runs = Scheduler::new(job(&store), CountdownTrigger::new(3))
            .run_on_start(true)
            .run(dir.path(), "b")
            .await
            .unwrap();

        assert_eq!(runs, 4);
        assert_eq!(store.object("b", "f.txt").unwrap().data.as_ref(), b"data");
    }

    #[tokio::test]
    async fn test_failed_run_continues_by_default() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), b"data").unwrap();
        // No bucket: every run fails
        let store = MemoryStore::new();

        let runs = Scheduler::new(job(&store), CountdownTrigger::new(2))
            .run(dir.path(), "missing")
            .await
            .unwrap();
        assert_eq!(runs, 2);
    }

    #[tokio::test]
    async fn test_stop_on_failure() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), b"data").unwrap();
        let store = MemoryStore::new();

        let mut scheduler = Scheduler::new(job(&store), CountdownTrigger::new(5)).stop_on_failure(true);
        let err = scheduler.run(dir.path(), "missing").await.unwrap_err();
        assert!(matches!(err, StashError::Transfer { .. }));
        // The remaining fires were never consumed
        assert_eq!(scheduler.trigger.fires.len(), 4);
    }
}
