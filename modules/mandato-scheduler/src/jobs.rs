//! Job bodies. Each returns a `JobOutcome`; the scheduler brackets the run
//! with job-log rows and panic isolation.

use tokio_util::sync::CancellationToken;
use tracing::error;

use mandato_common::JobStatus;
use mandato_pipeline::judicial;

use crate::app::App;
use crate::scheduler::{JobKind, RunOptions};

#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub status: JobStatus,
    pub count: i64,
    pub message: String,
}

/// ok when nothing failed, partial when some records still made it,
/// error when the run produced nothing but failures.
fn status_for(persisted: u64, errors: u64) -> JobStatus {
    if errors == 0 {
        JobStatus::Ok
    } else if persisted > 0 {
        JobStatus::Partial
    } else {
        JobStatus::Error
    }
}

pub async fn run(
    app: &App,
    kind: JobKind,
    opts: RunOptions,
    cancel: &CancellationToken,
) -> JobOutcome {
    match kind {
        JobKind::News => news(app, cancel).await,
        JobKind::SocialPosts => social_posts(app, cancel).await,
        JobKind::SocialMentions => social_mentions(app, cancel).await,
        JobKind::Trending => trending(app, cancel).await,
        JobKind::Retention => retention(app).await,
        JobKind::Judicial => judicial_sweep(app).await,
        JobKind::Socials => socials(app, opts.dry_run, cancel).await,
    }
}

async fn news(app: &App, cancel: &CancellationToken) -> JobOutcome {
    let stats = app.news.run_full(cancel).await;
    let total = stats.total();
    JobOutcome {
        status: status_for(total, stats.errors),
        count: total as i64,
        message: format!(
            "collected {total} news items ({} politician, {} competitor, {} city, \
             {} state, {} national), {} errors",
            stats.politicians, stats.competitors, stats.cities, stats.states, stats.national,
            stats.errors,
        ),
    }
}

async fn social_posts(app: &App, cancel: &CancellationToken) -> JobOutcome {
    let stats = app.posts.run_full(cancel).await;
    JobOutcome {
        status: status_for(stats.posts_collected, stats.errors),
        count: stats.posts_collected as i64,
        message: format!(
            "collected {} posts from {} politicians, {} errors",
            stats.posts_collected, stats.politicians_processed, stats.errors,
        ),
    }
}

async fn social_mentions(app: &App, cancel: &CancellationToken) -> JobOutcome {
    let stats = app.mentions.run_full(cancel).await;
    JobOutcome {
        status: status_for(stats.mentions_inserted, stats.errors),
        count: stats.mentions_inserted as i64,
        message: format!(
            "collected {} mentions ({} inserted) for {} politicians, \
             {} topics rolled up, {} errors",
            stats.mentions_collected,
            stats.mentions_inserted,
            stats.politicians_processed,
            stats.topics_rolled_up,
            stats.errors,
        ),
    }
}

async fn trending(app: &App, cancel: &CancellationToken) -> JobOutcome {
    let stats = app.trending.run_all(cancel).await;
    JobOutcome {
        status: status_for(stats.total(), stats.errors),
        count: stats.total() as i64,
        message: format!(
            "updated {} politics, {} twitter, {} google, {} general, {} errors",
            stats.politics, stats.twitter, stats.google, stats.general, stats.errors,
        ),
    }
}

async fn retention(app: &App) -> JobOutcome {
    let config = &app.config;
    let mut removed = 0u64;
    let mut errors = 0u64;
    let mut parts: Vec<String> = Vec::new();

    let sweeps: [(&str, _); 4] = [
        ("news", app.store.delete_news_older_than(config.retention_news_days).await),
        (
            "posts",
            app.store.delete_social_posts_older_than(config.retention_posts_days).await,
        ),
        (
            "mentions",
            app.store
                .delete_social_mentions_older_than(config.retention_mentions_days)
                .await,
        ),
        (
            "topics",
            app.store
                .delete_mention_topics_older_than(config.retention_mentions_days)
                .await,
        ),
    ];

    for (label, result) in sweeps {
        match result {
            Ok(count) => {
                removed += count;
                parts.push(format!("{count} {label}"));
            }
            Err(e) => {
                error!(table = label, error = %e, "Retention sweep failed");
                errors += 1;
            }
        }
    }

    JobOutcome {
        status: status_for(removed, errors),
        count: removed as i64,
        message: format!("removed: {}", parts.join(", ")),
    }
}

async fn socials(app: &App, dry_run: bool, cancel: &CancellationToken) -> JobOutcome {
    let stats = app.socials.run(dry_run, cancel).await;
    let count = if dry_run { stats.updates_planned } else { stats.updates_applied };
    JobOutcome {
        status: status_for(count, stats.errors),
        count: count as i64,
        message: format!(
            "{} {} handle updates for {} mapped politicians, {} errors",
            if dry_run { "planned" } else { "applied" },
            count,
            stats.with_mapping,
            stats.errors,
        ),
    }
}

async fn judicial_sweep(app: &App) -> JobOutcome {
    match judicial::run_sweep(&app.store).await {
        Ok(stats) => JobOutcome {
            status: status_for(stats.stubs_created, stats.errors),
            count: stats.stubs_created as i64,
            message: format!(
                "prepared {} consultation stubs for {} politicians",
                stats.stubs_created, stats.politicians_processed,
            ),
        },
        Err(e) => JobOutcome {
            status: JobStatus::Error,
            count: 0,
            message: format!("judicial sweep failed: {e}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_run_is_ok() {
        assert_eq!(status_for(10, 0), JobStatus::Ok);
        assert_eq!(status_for(0, 0), JobStatus::Ok);
    }

    #[test]
    fn errors_with_records_are_partial() {
        assert_eq!(status_for(5, 2), JobStatus::Partial);
    }

    #[test]
    fn errors_without_records_are_error() {
        assert_eq!(status_for(0, 3), JobStatus::Error);
    }
}
