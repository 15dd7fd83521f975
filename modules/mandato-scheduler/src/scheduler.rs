//! Cron-triggered job runner: one timer loop per registered job, timezone
//! aware, with single-flight per job id and drain-then-cancel shutdown.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use uuid::Uuid;

use mandato_common::JobStatus;

use crate::app::App;
use crate::jobs;

/// How long in-flight jobs get to finish after shutdown is requested.
const DRAIN_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    News,
    SocialPosts,
    SocialMentions,
    Trending,
    Retention,
    Judicial,
    /// Handle enrichment; manual-only, never scheduled.
    Socials,
}

impl JobKind {
    pub const ALL: [JobKind; 7] = [
        JobKind::News,
        JobKind::SocialPosts,
        JobKind::SocialMentions,
        JobKind::Trending,
        JobKind::Retention,
        JobKind::Judicial,
        JobKind::Socials,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            JobKind::News => "News collection",
            JobKind::SocialPosts => "Social posts (featured)",
            JobKind::SocialMentions => "Social mentions",
            JobKind::Trending => "Trending topics",
            JobKind::Retention => "Retention sweep",
            JobKind::Judicial => "Judicial records sweep",
            JobKind::Socials => "Social handle enrichment",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::News => write!(f, "news"),
            JobKind::SocialPosts => write!(f, "social_posts"),
            JobKind::SocialMentions => write!(f, "social_mentions"),
            JobKind::Trending => write!(f, "trending"),
            JobKind::Retention => write!(f, "retention"),
            JobKind::Judicial => write!(f, "judicial"),
            JobKind::Socials => write!(f, "socials"),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "news" => Ok(Self::News),
            "social_posts" => Ok(Self::SocialPosts),
            "social_mentions" => Ok(Self::SocialMentions),
            "trending" => Ok(Self::Trending),
            "retention" => Ok(Self::Retention),
            "judicial" => Ok(Self::Judicial),
            "socials" => Ok(Self::Socials),
            other => Err(format!("unknown JobKind: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobInfo {
    pub kind: JobKind,
    pub name: &'static str,
    pub next_run_at: Option<DateTime<Utc>>,
}

/// Options for a manual trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Report-only mode for jobs that support it (handle enrichment).
    pub dry_run: bool,
}

struct RegisteredJob {
    kind: JobKind,
    schedule: Schedule,
    guard: Arc<Mutex<()>>,
}

pub struct Scheduler {
    app: Arc<App>,
    tz: Tz,
    jobs: Arc<Vec<RegisteredJob>>,
    /// One single-flight guard per job id, shared by cron firings and manual
    /// triggers; manual-only jobs have a guard but no schedule.
    guards: std::collections::HashMap<JobKind, Arc<Mutex<()>>>,
    /// Stops the timer loops; in-flight jobs keep running until the drain
    /// deadline.
    shutdown: CancellationToken,
    /// Cancels in-flight job work after the drain deadline.
    work_cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Scheduler {
    /// Build the default schedule relative to the configured base hour and
    /// minute:
    ///
    /// - H:M       news
    /// - H:M+45    social posts (featured)
    /// - H+1:M     social mentions
    /// - H+2:M     trending (all categories)
    /// - H+2:M+15  retention
    /// - Sun 03:00 judicial records
    pub fn new(app: Arc<App>) -> Result<Self> {
        let tz = Tz::from_str(&app.config.collect_timezone)
            .map_err(|e| anyhow!("invalid COLLECT_TIMEZONE: {e}"))?;

        let hour = app.config.collect_hour;
        let minute = app.config.collect_minute;

        let guards: std::collections::HashMap<JobKind, Arc<Mutex<()>>> = JobKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::new(Mutex::new(()))))
            .collect();

        let jobs = vec![
            job(JobKind::News, daily_expr(hour, minute, 0), &guards)?,
            job(JobKind::SocialPosts, daily_expr(hour, minute, 45), &guards)?,
            job(JobKind::SocialMentions, daily_expr(hour, minute, 60), &guards)?,
            job(JobKind::Trending, daily_expr(hour, minute, 120), &guards)?,
            job(JobKind::Retention, daily_expr(hour, minute, 135), &guards)?,
            job(JobKind::Judicial, "0 0 3 * * Sun *".to_string(), &guards)?,
        ];

        Ok(Self {
            app,
            tz,
            jobs: Arc::new(jobs),
            guards,
            shutdown: CancellationToken::new(),
            work_cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    /// Token the host cancels (ctrl-c) to begin graceful shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn list_jobs(&self) -> Vec<JobInfo> {
        self.jobs
            .iter()
            .map(|job| JobInfo {
                kind: job.kind,
                name: job.kind.display_name(),
                next_run_at: job
                    .schedule
                    .upcoming(self.tz)
                    .next()
                    .map(|dt| dt.with_timezone(&Utc)),
            })
            .collect()
    }

    /// Trigger a job in the background, respecting single-flight. Returns
    /// the job-log id immediately; a firing that found the job already
    /// running is recorded on that same log row.
    pub async fn run_now(&self, kind: JobKind, opts: RunOptions) -> Result<Uuid> {
        let guard = self
            .guards
            .get(&kind)
            .ok_or_else(|| anyhow!("unknown job: {kind}"))?
            .clone();

        let log_id = self.app.store.log_job_start(&kind.to_string()).await?;
        let app = self.app.clone();
        let cancel = self.work_cancel.clone();
        self.tracker.spawn(async move {
            run_guarded(app, kind, opts, guard, cancel, log_id).await;
        });
        Ok(log_id)
    }

    /// Run the scheduler until shutdown, then drain in-flight jobs up to the
    /// deadline and cancel whatever is left.
    pub async fn run(&self) {
        for info in self.list_jobs() {
            info!(
                job = %info.kind,
                name = info.name,
                next_run = ?info.next_run_at,
                "Job registered"
            );
        }

        for registered in self.jobs.iter() {
            let app = self.app.clone();
            let kind = registered.kind;
            let schedule = registered.schedule.clone();
            let guard = registered.guard.clone();
            let tz = self.tz;
            let shutdown = self.shutdown.clone();
            let work_cancel = self.work_cancel.clone();

            self.tracker.spawn(async move {
                job_loop(app, kind, schedule, guard, tz, shutdown, work_cancel).await;
            });
        }

        self.shutdown.cancelled().await;
        info!("Shutdown requested, draining in-flight jobs");

        self.tracker.close();
        if tokio::time::timeout(DRAIN_DEADLINE, self.tracker.wait()).await.is_err() {
            warn!("Drain deadline reached, cancelling remaining jobs");
            self.work_cancel.cancel();
            self.tracker.wait().await;
        }
        info!("Scheduler stopped");
    }
}

fn job(
    kind: JobKind,
    expr: String,
    guards: &std::collections::HashMap<JobKind, Arc<Mutex<()>>>,
) -> Result<RegisteredJob> {
    let schedule = Schedule::from_str(&expr)
        .map_err(|e| anyhow!("invalid cron expression for {kind}: {e}"))?;
    Ok(RegisteredJob {
        kind,
        schedule,
        guard: guards[&kind].clone(),
    })
}

/// Seven-field cron expression for a daily firing at base hour/minute plus
/// an offset in minutes, wrapping across the day.
fn daily_expr(hour: u32, minute: u32, offset_minutes: u32) -> String {
    let total = (hour * 60 + minute + offset_minutes) % (24 * 60);
    format!("0 {} {} * * * *", total % 60, total / 60)
}

async fn job_loop(
    app: Arc<App>,
    kind: JobKind,
    schedule: Schedule,
    guard: Arc<Mutex<()>>,
    tz: Tz,
    shutdown: CancellationToken,
    work_cancel: CancellationToken,
) {
    loop {
        let next = match schedule.upcoming(tz).next() {
            Some(next) => next,
            None => return,
        };
        let wait = (next.with_timezone(&Utc) - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }

        let log_id = match app.store.log_job_start(&kind.to_string()).await {
            Ok(id) => id,
            Err(e) => {
                error!(job = %kind, error = %e, "Failed to open job log, skipping firing");
                continue;
            }
        };
        run_guarded(
            app.clone(),
            kind,
            RunOptions::default(),
            guard.clone(),
            work_cancel.clone(),
            log_id,
        )
        .await;
    }
}

/// Acquire the job's single-flight guard without waiting. A firing that
/// finds the previous run still executing is skipped, never queued.
fn try_begin(guard: Arc<Mutex<()>>) -> Option<OwnedMutexGuard<()>> {
    guard.try_lock_owned().ok()
}

async fn run_guarded(
    app: Arc<App>,
    kind: JobKind,
    opts: RunOptions,
    guard: Arc<Mutex<()>>,
    cancel: CancellationToken,
    log_id: Uuid,
) {
    let Some(_permit) = try_begin(guard) else {
        warn!(job = %kind, "Previous run still executing, skipping this firing");
        if let Err(e) = app
            .store
            .log_job_end(log_id, JobStatus::Error, "skipped: previous run still executing", 0)
            .await
        {
            error!(job = %kind, error = %e, "Failed to record skipped firing");
        }
        return;
    };

    info!(job = %kind, %log_id, "Job started");

    // An extra spawn isolates panics: a crashing job must never take the
    // scheduler loop down with it.
    let handle = {
        let app = app.clone();
        tokio::spawn(async move { jobs::run(&app, kind, opts, &cancel).await })
    };

    let outcome = match handle.await {
        Ok(outcome) => outcome,
        Err(join_error) => {
            error!(job = %kind, error = %join_error, "Job crashed");
            jobs::JobOutcome {
                status: JobStatus::Error,
                count: 0,
                message: format!("job crashed: {join_error}"),
            }
        }
    };

    info!(job = %kind, status = %outcome.status, count = outcome.count, "Job finished");
    if let Err(e) = app
        .store
        .log_job_end(log_id, outcome.status, &outcome.message, outcome.count)
        .await
    {
        error!(job = %kind, error = %e, "Failed to close job log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_expr_applies_offsets_with_wrapping() {
        assert_eq!(daily_expr(6, 0, 0), "0 0 6 * * * *");
        assert_eq!(daily_expr(6, 0, 45), "0 45 6 * * * *");
        assert_eq!(daily_expr(6, 0, 60), "0 0 7 * * * *");
        assert_eq!(daily_expr(6, 30, 45), "0 15 7 * * * *");
        assert_eq!(daily_expr(23, 30, 45), "0 15 0 * * * *");
    }

    #[test]
    fn schedule_expressions_parse() {
        for (hour, minute, offset) in [(6, 0, 0), (6, 0, 45), (6, 0, 120), (23, 59, 135)] {
            Schedule::from_str(&daily_expr(hour, minute, offset)).unwrap();
        }
        Schedule::from_str("0 0 3 * * Sun *").unwrap();
    }

    #[test]
    fn next_firing_is_in_the_future() {
        let schedule = Schedule::from_str(&daily_expr(6, 0, 0)).unwrap();
        let next = schedule.upcoming(chrono_tz::America::Sao_Paulo).next().unwrap();
        assert!(next.with_timezone(&Utc) > Utc::now());
    }

    #[test]
    fn single_flight_guard_rejects_while_held() {
        let guard = Arc::new(Mutex::new(()));
        let held = try_begin(guard.clone()).expect("first acquisition succeeds");
        assert!(try_begin(guard.clone()).is_none(), "second acquisition must skip");
        drop(held);
        assert!(try_begin(guard).is_some(), "freed guard can be acquired again");
    }

    #[test]
    fn job_kind_roundtrip() {
        for kind in JobKind::ALL {
            assert_eq!(kind.to_string().parse::<JobKind>().unwrap(), kind);
        }
        assert!("unknown".parse::<JobKind>().is_err());
    }
}
