use std::sync::Arc;

use super::*;
use crate::config::MergeMethod;
use crate::test_utils::{
    FIXTURE_CONFIG, RecordingFactory, RecordingGitHub, issue, mergeable_pull, payload,
    pull_request,
};
use crate::types::{MergeStateStatus, PullState, ThreadState};

fn worker(github: RecordingGitHub) -> (JobWorker<RecordingFactory>, Arc<RecordingGitHub>) {
    let factory = RecordingFactory::new(github);
    let github = factory.github.clone();
    (JobWorker::new(Arc::new(factory)), github)
}

fn sha_mismatch() -> GitHubApiError {
    GitHubApiError {
        kind: GitHubErrorKind::ShaMismatch,
        status_code: Some(409),
        message: "Head branch was modified".into(),
        source: None,
    }
}

// ─── Close ───

#[tokio::test]
async fn close_job_closes_labelled_open_thread() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&issue(7, &["duplicate"], ThreadState::Open)),
    );

    let outcome = worker.process(&payload(7, ActionKind::Close)).await.unwrap();

    assert_eq!(outcome, JobOutcome::Closed);
    assert_eq!(
        github.mutations(),
        vec![GitHubEffect::CloseThread {
            number: ThreadNumber(7)
        }]
    );
}

#[tokio::test]
async fn close_job_skips_already_closed_thread() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&issue(7, &["duplicate"], ThreadState::Closed)),
    );

    let outcome = worker.process(&payload(7, ActionKind::Close)).await.unwrap();

    assert_eq!(outcome, JobOutcome::Skipped(SkipReason::AlreadyClosed));
    assert!(github.mutations().is_empty());
    assert_eq!(github.config_fetches(), 0);
}

#[tokio::test]
async fn close_job_skips_thread_that_lost_its_label() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&issue(7, &["bug"], ThreadState::Open)),
    );

    let outcome = worker.process(&payload(7, ActionKind::Close)).await.unwrap();

    assert_eq!(outcome, JobOutcome::Skipped(SkipReason::NoActionableLabel));
    assert!(github.mutations().is_empty());
}

#[tokio::test]
async fn close_job_skips_when_label_was_disabled_since_scheduling() {
    let (worker, _github) = worker(
        RecordingGitHub::new()
            .with_config("labels: [duplicate]\nlabelConfig:\n  duplicate: false\n")
            .with_thread(&issue(7, &["duplicate"], ThreadState::Open)),
    );

    let outcome = worker.process(&payload(7, ActionKind::Close)).await.unwrap();

    assert_eq!(outcome, JobOutcome::Skipped(SkipReason::NoActionableLabel));
}

#[tokio::test]
async fn unreachable_config_is_an_error() {
    let (worker, _github) = worker(
        RecordingGitHub::new()
            .failing_config()
            .with_thread(&issue(7, &["duplicate"], ThreadState::Open)),
    );

    let err = worker
        .process(&payload(7, ActionKind::Close))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::Config(ConfigError::Unreachable(_))));
    assert!(!err.is_expected_retry());
}

#[tokio::test]
async fn missing_thread_is_a_github_error() {
    let (worker, _github) = worker(RecordingGitHub::new().with_config(FIXTURE_CONFIG));

    let err = worker
        .process(&payload(404, ActionKind::Close))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::GitHub(_)));
}

// ─── Merge ───

#[tokio::test]
async fn merge_job_merges_and_runs_post_merge_steps() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&pull_request(30, &["automerge"], ThreadState::Open))
            .with_pull(mergeable_pull(30)),
    );

    let outcome = worker.process(&payload(30, ActionKind::Merge)).await.unwrap();

    let merged_sha = Sha::new("m".repeat(40));
    assert_eq!(
        outcome,
        JobOutcome::Merged {
            sha: merged_sha.clone()
        }
    );
    assert_eq!(
        github.mutations(),
        vec![
            GitHubEffect::MergePull {
                number: ThreadNumber(30),
                method: MergeMethod::Squash,
                expected_sha: Sha::new("a".repeat(40)),
            },
            GitHubEffect::DeleteBranch {
                branch: "feature".into()
            },
            GitHubEffect::CreateTag {
                tag: "pr-30".into(),
                sha: merged_sha,
            },
        ]
    );
}

#[tokio::test]
async fn merge_job_keeps_fork_branches() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&pull_request(30, &["automerge"], ThreadState::Open))
            .with_pull(PullData {
                same_repo: false,
                ..mergeable_pull(30)
            }),
    );

    worker.process(&payload(30, ActionKind::Merge)).await.unwrap();

    assert!(
        !github
            .mutations()
            .iter()
            .any(|e| matches!(e, GitHubEffect::DeleteBranch { .. }))
    );
}

#[tokio::test]
async fn merge_job_waits_while_not_mergeable() {
    for pull in [
        PullData {
            mergeable: None,
            ..mergeable_pull(30)
        },
        PullData {
            mergeable: Some(false),
            merge_state: MergeStateStatus::Dirty,
            ..mergeable_pull(30)
        },
        PullData {
            merge_state: MergeStateStatus::Blocked,
            ..mergeable_pull(30)
        },
    ] {
        let (worker, github) = worker(
            RecordingGitHub::new()
                .with_config(FIXTURE_CONFIG)
                .with_thread(&pull_request(30, &["automerge"], ThreadState::Open))
                .with_pull(pull),
        );

        let err = worker
            .process(&payload(30, ActionKind::Merge))
            .await
            .unwrap_err();

        assert!(err.is_expected_retry(), "{err}");
        assert!(github.mutations().is_empty());
    }
}

#[tokio::test]
async fn merge_job_retries_when_head_moves() {
    let (worker, _github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&pull_request(30, &["automerge"], ThreadState::Open))
            .with_pull(mergeable_pull(30))
            .failing_merge(sha_mismatch),
    );

    let err = worker
        .process(&payload(30, ActionKind::Merge))
        .await
        .unwrap_err();

    assert!(err.is_expected_retry());
}

#[tokio::test]
async fn merge_job_reports_permanent_merge_failure() {
    let (worker, _github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&pull_request(30, &["automerge"], ThreadState::Open))
            .with_pull(mergeable_pull(30))
            .failing_merge(|| GitHubApiError::permanent_without_source("Method Not Allowed")),
    );

    let err = worker
        .process(&payload(30, ActionKind::Merge))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::GitHub(_)));
    assert!(!err.is_expected_retry());
}

#[tokio::test]
async fn merge_job_skips_already_merged_pull() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&pull_request(30, &["automerge"], ThreadState::Open))
            .with_pull(PullData {
                state: PullState::Merged {
                    merge_commit_sha: None,
                },
                ..mergeable_pull(30)
            }),
    );

    let outcome = worker.process(&payload(30, ActionKind::Merge)).await.unwrap();

    assert_eq!(outcome, JobOutcome::Skipped(SkipReason::NotOpen));
    assert!(github.mutations().is_empty());
}

#[tokio::test]
async fn merge_job_skips_pull_without_merge_label() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&pull_request(30, &["duplicate"], ThreadState::Open))
            .with_pull(mergeable_pull(30)),
    );

    let outcome = worker.process(&payload(30, ActionKind::Merge)).await.unwrap();

    assert_eq!(outcome, JobOutcome::Skipped(SkipReason::NoActionableLabel));
    assert!(github.mutations().is_empty());
}

// ─── Comment ───

#[tokio::test]
async fn comment_job_posts_rendered_template() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&issue(31, &["needs-info"], ThreadState::Open)),
    );

    let outcome = worker
        .process(&payload(31, ActionKind::Comment))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Commented);
    assert_eq!(
        github.comments(),
        vec![(
            ThreadNumber(31),
            "@octocat, could you add the details requested in `needs-info`?".to_string()
        )]
    );
}

#[tokio::test]
async fn comment_job_skips_disabled_template() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config("actions:\n  comment:\n    labels: [ping]\n")
            .with_thread(&issue(31, &["ping"], ThreadState::Open)),
    );

    let outcome = worker
        .process(&payload(31, ActionKind::Comment))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Skipped(SkipReason::CommentDisabled));
    assert!(github.comments().is_empty());
}

#[tokio::test]
async fn comment_job_skips_closed_thread() {
    let (worker, github) = worker(
        RecordingGitHub::new()
            .with_config(FIXTURE_CONFIG)
            .with_thread(&issue(31, &["needs-info"], ThreadState::Closed)),
    );

    let outcome = worker
        .process(&payload(31, ActionKind::Comment))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Skipped(SkipReason::NotOpen));
    assert!(github.comments().is_empty());
}
