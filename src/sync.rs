//! Status synchronization: tracker comment, review transition and chat card.
//!
//! Everything here is best-effort. Failures end up in the returned
//! `SyncReport`, which the orchestrator only logs.

use std::sync::Arc;

use chrono::Local;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::errors::PipelineError;
use crate::models::{PipelineResult, ReviewOutcome, Task, TestOutcome};
use crate::notify::{CardLinks, Notifier, outcome_card, started_card};
use crate::tracker::{IssueTracker, find_transition};

/// Longest captured test output quoted in a tracker comment.
const OUTPUT_EXCERPT: usize = 2000;

/// What status synchronization managed to do for one task.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub commented: bool,
    /// Name of the transition applied, if any.
    pub transitioned: Option<String>,
    pub notified: bool,
    /// Every failure, as `PipelineError::Sync`.
    pub errors: Vec<PipelineError>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct StatusSynchronizer {
    tracker: Arc<dyn IssueTracker>,
    notifier: Option<Arc<dyn Notifier>>,
    config: Arc<Config>,
}

impl StatusSynchronizer {
    pub fn new(tracker: Arc<dyn IssueTracker>, notifier: Option<Arc<dyn Notifier>>, config: Arc<Config>) -> Self {
        Self {
            tracker,
            notifier,
            config,
        }
    }

    /// Send the "work started" card. Failures are logged only.
    pub async fn announce(&self, task: &Task) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let card = started_card(task, &self.config.tracker.browse_url(&task.key), Local::now());
        if let Err(e) = notifier.send(&card).await {
            warn!(task = %task.key, error = %e, "start notification failed");
        }
    }

    #[instrument(skip_all, fields(task = %task.key, success = result.success))]
    pub async fn sync(&self, task: &Task, result: &PipelineResult) -> SyncReport {
        let mut report = SyncReport::default();

        let comment = if result.success {
            success_comment(result)
        } else {
            failure_comment(result)
        };
        match self.tracker.add_comment(&task.key, &comment).await {
            Ok(()) => report.commented = true,
            Err(e) => {
                warn!(error = %e, "failed to add tracker comment");
                report.errors.push(PipelineError::Sync(format!("comment: {:#}", e)));
            }
        }

        let review_url = result.review.as_ref().and_then(ReviewOutcome::url);
        let tests_passed = result.test.as_ref().is_some_and(|t| t.success);
        if let (true, true, Some(url)) = (result.success, tests_passed, review_url) {
            match self.request_review(&task.key, url).await {
                Ok(applied) => report.transitioned = applied,
                Err(e) => {
                    warn!(error = %e, "failed to transition task");
                    report.errors.push(PipelineError::Sync(format!("transition: {:#}", e)));
                }
            }
        }

        if let Some(notifier) = &self.notifier {
            let links = CardLinks {
                task_url: self.config.tracker.browse_url(&task.key),
                ci_pipeline_url: self.config.ci_pipeline_url.clone(),
            };
            match notifier.send(&outcome_card(task, result, &links)).await {
                Ok(()) => report.notified = true,
                Err(e) => {
                    warn!(error = %e, "outcome notification failed");
                    report.errors.push(PipelineError::Sync(format!("notification: {:#}", e)));
                }
            }
        }

        report
    }

    /// Move the task toward the review status. A missing transition is not an error.
    async fn request_review(&self, key: &str, review_url: &str) -> anyhow::Result<Option<String>> {
        let target = &self.config.tracker.review_status;
        let transitions = self.tracker.transitions(key).await?;
        let Some(transition) = find_transition(&transitions, target) else {
            info!(target = %target, available = transitions.len(), "no matching transition, leaving status unchanged");
            return Ok(None);
        };

        let fields = self.config.tracker.review_url_field.as_ref().map(|field| {
            let mut map = Map::new();
            map.insert(field.clone(), Value::String(review_url.to_string()));
            Value::Object(map)
        });
        debug!(id = %transition.id, name = %transition.name, "applying transition");
        self.tracker.transition(key, &transition.id, fields).await?;
        info!(to = %transition.to, "task moved to review");
        Ok(Some(transition.name.clone()))
    }
}

fn success_comment(result: &PipelineResult) -> String {
    let mut lines = vec![
        "*Automated processing completed*".to_string(),
        String::new(),
        format!("Workspace: {}", result.workspace_dir.display()),
        format!("Branch: {}", result.branch.as_deref().unwrap_or("N/A")),
    ];
    if let Some(test) = &result.test {
        lines.extend(test_section(test));
    }
    lines.push(String::new());
    lines.push(match &result.review {
        Some(ReviewOutcome::Created { url, id }) => format!("Review request !{} created: {}", id, url),
        Some(ReviewOutcome::Skipped { reason }) => format!("Review request skipped: {}", reason),
        Some(ReviewOutcome::Failed { error }) => error.clone(),
        None => "Review request not attempted".to_string(),
    });
    lines.join("\n")
}

fn failure_comment(result: &PipelineResult) -> String {
    let mut lines = vec![
        "*Automated processing failed*".to_string(),
        String::new(),
        format!("Error: {}", result.error.as_deref().unwrap_or("unknown error")),
    ];
    if let Some(test) = &result.test {
        lines.extend(test_section(test));
    }
    if let Some(branch) = &result.branch {
        lines.push(String::new());
        lines.push(format!(
            "Branch {} was left in {} for manual recovery.",
            branch,
            result.workspace_dir.display()
        ));
    }
    lines.join("\n")
}

fn test_section(test: &TestOutcome) -> Vec<String> {
    let verdict = if test.success { "passed" } else { "failed" };
    let mut lines = vec![String::new(), format!("Tests ({}): {}", test.kind, verdict)];
    let output = [test.stdout.trim(), test.stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if !output.is_empty() {
        lines.push(format!("{{noformat}}\n{}\n{{noformat}}", tail(&output, OUTPUT_EXCERPT)));
    }
    lines
}

/// Last `max_chars` characters of `text`; test runners put their summary at the end.
fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    let start = text.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunnerKind;
    use crate::test_support::{FakeNotifier, FakeTracker, config};
    use crate::tracker::Transition;
    use std::path::{Path, PathBuf};

    fn task() -> Task {
        Task::new("PROJ-1", "Fix bug")
    }

    fn passed() -> TestOutcome {
        TestOutcome {
            success: true,
            kind: RunnerKind::Npm,
            stdout: "12 passing".into(),
            stderr: String::new(),
        }
    }

    fn success(review: ReviewOutcome) -> PipelineResult {
        PipelineResult {
            success: true,
            workspace_dir: PathBuf::from("/work/PROJ-1"),
            branch: Some("feature/proj-1-fix-bug".into()),
            test: Some(passed()),
            review: Some(review),
            error: None,
        }
    }

    fn created() -> ReviewOutcome {
        ReviewOutcome::Created {
            url: "https://gitlab.example/mr/5".into(),
            id: 5,
        }
    }

    fn synchronizer(
        tracker: Arc<FakeTracker>,
        notifier: Option<Arc<FakeNotifier>>,
        config: Config,
    ) -> StatusSynchronizer {
        StatusSynchronizer::new(
            tracker,
            notifier.map(|n| n as Arc<dyn Notifier>),
            Arc::new(config),
        )
    }

    #[tokio::test]
    async fn test_full_success_comments_transitions_and_notifies() {
        let tracker = Arc::new(FakeTracker::with_tasks(vec![]));
        let notifier = Arc::new(FakeNotifier::default());
        let mut cfg = config(Path::new("/work"));
        cfg.tracker.review_url_field = Some("customfield_10000".into());
        let sync = synchronizer(tracker.clone(), Some(notifier.clone()), cfg);

        let report = sync.sync(&task(), &success(created())).await;
        assert!(report.is_clean());
        assert!(report.commented);
        assert!(report.notified);
        assert_eq!(report.transitioned.as_deref(), Some("Send to review"));

        let comments = tracker.comments();
        assert_eq!(comments[0].0, "PROJ-1");
        assert!(comments[0].1.contains("Tests (npm): passed"));
        assert!(comments[0].1.contains("12 passing"));
        assert!(comments[0].1.contains("https://gitlab.example/mr/5"));

        let executed = tracker.executed();
        assert_eq!(executed[0].1, "21");
        assert_eq!(
            executed[0].2.as_ref().unwrap()["customfield_10000"],
            "https://gitlab.example/mr/5"
        );
        assert_eq!(notifier.cards()[0].theme_color, "00FF00");
    }

    #[tokio::test]
    async fn test_skipped_review_never_transitions() {
        let tracker = Arc::new(FakeTracker::with_tasks(vec![]));
        let sync = synchronizer(tracker.clone(), None, config(Path::new("/work")));
        let result = success(ReviewOutcome::Skipped {
            reason: "no credentials".into(),
        });

        let report = sync.sync(&task(), &result).await;
        assert!(report.transitioned.is_none());
        assert!(tracker.executed().is_empty());
        assert!(tracker.comments()[0].1.contains("Review request skipped: no credentials"));
    }

    #[tokio::test]
    async fn test_no_matching_transition_is_not_an_error() {
        let tracker = Arc::new(FakeTracker {
            available: vec![Transition {
                id: "31".into(),
                name: "Done".into(),
                to: "Closed".into(),
            }],
            ..Default::default()
        });
        let sync = synchronizer(tracker.clone(), None, config(Path::new("/work")));
        let report = sync.sync(&task(), &success(created())).await;
        assert!(report.is_clean());
        assert!(report.transitioned.is_none());
        assert!(tracker.executed().is_empty());
    }

    #[tokio::test]
    async fn test_failure_comment_names_error_and_orphaned_branch() {
        let tracker = Arc::new(FakeTracker::default());
        let notifier = Arc::new(FakeNotifier::default());
        let sync = synchronizer(tracker.clone(), Some(notifier.clone()), config(Path::new("/work")));
        let mut result = PipelineResult::failed(PathBuf::from("/work/PROJ-1"), "Coding agent exited with code 2");
        result.branch = Some("feature/proj-1-fix-bug".into());

        sync.sync(&task(), &result).await;
        let comment = &tracker.comments()[0].1;
        assert!(comment.contains("failed"));
        assert!(comment.contains("exited with code 2"));
        assert!(comment.contains("Branch feature/proj-1-fix-bug was left"));
        assert_eq!(notifier.cards()[0].theme_color, "FF0000");
    }

    #[tokio::test]
    async fn test_failures_are_collected_not_propagated() {
        let tracker = Arc::new(FakeTracker {
            fail_comments: true,
            ..Default::default()
        });
        let notifier = Arc::new(FakeNotifier {
            fail: true,
            ..Default::default()
        });
        let sync = synchronizer(tracker, Some(notifier.clone()), config(Path::new("/work")));

        let report = sync.sync(&task(), &success(created())).await;
        assert!(!report.commented);
        assert!(!report.notified);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| matches!(e, PipelineError::Sync(_))));
        assert!(report.errors[0].to_string().starts_with("Status synchronization failed: comment"));
        assert_eq!(notifier.cards().len(), 1);
    }

    #[tokio::test]
    async fn test_announce_sends_started_card() {
        let notifier = Arc::new(FakeNotifier::default());
        let sync = synchronizer(Arc::new(FakeTracker::default()), Some(notifier.clone()), config(Path::new("/work")));
        sync.announce(&task()).await;
        assert_eq!(notifier.cards()[0].theme_color, "0078D4");
    }

    #[test]
    fn test_tail_keeps_the_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("abc", 3), "abc");
        assert_eq!(tail("ééé", 2), "éé");
    }
}
