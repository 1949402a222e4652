use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::config::Config;
use crate::gitlab::IssueSource;
use crate::reminders::{create_reminder, Outcome, ReminderSink};

/// Counts for one sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub found: usize,
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

/// One fetch-then-upsert pass. Returns `None` when the fetch failed and
/// nothing was attempted.
pub async fn run_once<I, R>(config: &Config, source: &I, sink: &R) -> Option<SyncReport>
where
    I: IssueSource + ?Sized,
    R: ReminderSink + ?Sized,
{
    let issues = match source.assigned_open_issues(config).await {
        Ok(issues) => issues,
        Err(e) => {
            error!("Error fetching GitLab issues: {:#}", e);
            return None;
        }
    };

    info!("Found {} assigned issues", issues.len());

    let mut report = SyncReport {
        found: issues.len(),
        ..Default::default()
    };
    for issue in &issues {
        match create_reminder(sink, issue, &config.reminder_list).await {
            Ok(Outcome::Created) => report.created += 1,
            Ok(Outcome::AlreadyExists) => report.existing += 1,
            Err(e) => {
                report.failed += 1;
                error!(
                    iid = issue.iid,
                    list = %config.reminder_list,
                    "Error creating reminder for issue #{}: {:#}",
                    issue.iid,
                    e
                );
            }
        }
    }

    info!(
        created = report.created,
        existing = report.existing,
        failed = report.failed,
        "Sync finished"
    );
    Some(report)
}

/// Runs a pass now and then every `poll_interval`, forever.
pub async fn run_forever<I, R>(config: &Config, source: &I, sink: &R)
where
    I: IssueSource + ?Sized,
    R: ReminderSink + ?Sized,
{
    let mut ticker = interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        run_once(config, source, sink).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::model::{self, Issue};
    use crate::reminders::fake::Memory;
    use anyhow::{anyhow, Result};
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves a fixed batch, or a 401 when `issues` is `None`.
    struct Fixed {
        issues: Option<Vec<Issue>>,
        fetches: Mutex<usize>,
    }

    impl Fixed {
        fn new(issues: Option<Vec<Issue>>) -> Self {
            Self {
                issues,
                fetches: Mutex::new(0),
            }
        }

        fn fetches(&self) -> usize {
            *self.fetches.lock().unwrap()
        }
    }

    impl IssueSource for Fixed {
        fn assigned_open_issues<'a>(
            &'a self,
            _config: &'a Config,
        ) -> BoxFuture<'a, Result<Vec<Issue>>> {
            *self.fetches.lock().unwrap() += 1;
            let result = self
                .issues
                .clone()
                .ok_or_else(|| anyhow!("API request failed with status: 401 Unauthorized"));
            futures::future::ready(result).boxed()
        }
    }

    fn three_issues() -> Vec<Issue> {
        vec![
            model::issue(1, "First"),
            model::issue(2, "Second"),
            model::issue(3, "Third"),
        ]
    }

    #[tokio::test]
    async fn second_pass_creates_nothing() {
        let config = config::config("https://gitlab.example.com");
        let source = Fixed::new(Some(three_issues()));
        let sink = Memory::default();

        let first = run_once(&config, &source, &sink).await.unwrap();
        let after_first = sink.titles();
        let second = run_once(&config, &source, &sink).await.unwrap();

        assert_eq!(first.created, 3);
        assert_eq!(second.created, 0);
        assert_eq!(second.existing, 3);
        assert_eq!(sink.titles(), after_first);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let config = config::config("https://gitlab.example.com");
        let source = Fixed::new(Some(three_issues()));
        let sink = Memory {
            fail_create: vec!["#2: Second".to_string()],
            ..Default::default()
        };

        let report = run_once(&config, &source, &sink).await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                found: 3,
                created: 2,
                existing: 0,
                failed: 1
            }
        );
        assert_eq!(
            sink.titles(),
            vec!["#1: First".to_string(), "#3: Third".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_lookup_skips_only_that_issue() {
        let config = config::config("https://gitlab.example.com");
        let source = Fixed::new(Some(three_issues()));
        let sink = Memory {
            fail_exists: vec!["#2: Second".to_string()],
            ..Default::default()
        };

        let report = run_once(&config, &source, &sink).await.unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(
            sink.titles(),
            vec!["#1: First".to_string(), "#3: Third".to_string()]
        );
        assert_eq!(
            sink.create_attempts(),
            vec!["#1: First".to_string(), "#3: Third".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_fetch_touches_no_reminders() {
        let config = config::config("https://gitlab.example.com");
        let source = Fixed::new(None);
        let sink = Memory::default();

        assert_eq!(run_once(&config, &source, &sink).await, None);
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn empty_result_makes_no_automation_calls() {
        let config = config::config("https://gitlab.example.com");
        let source = Fixed::new(Some(vec![]));
        let sink = Memory::default();

        let report = run_once(&config, &source, &sink).await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_polling_after_failed_fetch() {
        let config = config::config("https://gitlab.example.com");
        let source = Fixed::new(None);
        let sink = Memory::default();

        // ticks at 0s, 60s and 120s
        let run = run_forever(&config, &source, &sink);
        assert!(tokio::time::timeout(Duration::from_secs(150), run)
            .await
            .is_err());
        assert_eq!(source.fetches(), 3);
        assert_eq!(sink.calls(), 0);
    }
}
