//! Submission/review flow tests: the only mutations existing tasks see.

use portal_core::traits::TaskStore;
use portal_core::types::{Task, TaskStatus};
use std::sync::Arc;
use storage::MemoryBackend;
use task_sync::{TaskLifecycleService, TaskSyncError};
use testing::{StudentBuilder, TemplateBuilder};

async fn setup() -> (Arc<MemoryBackend>, TaskLifecycleService, Task) {
    let backend = Arc::new(MemoryBackend::new());
    let student = StudentBuilder::new().countries(&["at"]).build();
    let student_id = student.id;
    backend.upsert_student(student).await;

    let template = TemplateBuilder::country("at")
        .stage("Docs")
        .title("Passport")
        .xp(20)
        .build();
    let task = Task::from_template(student_id, &template);
    backend.insert_tasks(std::slice::from_ref(&task)).await.unwrap();

    let lifecycle = TaskLifecycleService::new(backend.clone(), backend.clone());
    (backend, lifecycle, task)
}

#[tokio::test]
async fn submit_review_approve_pays_xp() {
    let (backend, lifecycle, task) = setup().await;

    let submitted = lifecycle
        .submit(task.id, serde_json::json!({"url": "https://cdn/passport.pdf"}))
        .await
        .unwrap();
    assert_eq!(submitted.status, TaskStatus::Review);
    assert!(submitted.submission.is_some());

    let queue = lifecycle.review_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, task.id);

    let approved = lifecycle.approve(task.id).await.unwrap();
    assert_eq!(approved.status, TaskStatus::Done);

    let student = backend
        .get_task(task.id)
        .await
        .unwrap()
        .map(|t| t.student_id)
        .unwrap();
    let student = portal_core::traits::StudentDirectory::get_student(backend.as_ref(), student)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(student.xp_total, 20);
}

#[tokio::test]
async fn changes_requested_allows_resubmission() {
    let (_backend, lifecycle, task) = setup().await;

    lifecycle
        .submit(task.id, serde_json::json!("first draft"))
        .await
        .unwrap();
    let sent_back = lifecycle.request_changes(task.id).await.unwrap();
    assert_eq!(sent_back.status, TaskStatus::ChangesRequested);

    let resubmitted = lifecycle
        .submit(task.id, serde_json::json!("second draft"))
        .await
        .unwrap();
    assert_eq!(resubmitted.status, TaskStatus::Review);
    assert_eq!(resubmitted.submission, Some(serde_json::json!("second draft")));
}

#[tokio::test]
async fn cannot_approve_unsubmitted_task() {
    let (_backend, lifecycle, task) = setup().await;

    let err = lifecycle.approve(task.id).await.unwrap_err();
    assert!(matches!(err, TaskSyncError::InvalidTransition { .. }));
}

#[tokio::test]
async fn cannot_submit_a_done_task_again() {
    let (_backend, lifecycle, task) = setup().await;

    lifecycle
        .submit(task.id, serde_json::json!({}))
        .await
        .unwrap();
    lifecycle.approve(task.id).await.unwrap();

    let err = lifecycle
        .submit(task.id, serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskSyncError::InvalidTransition { .. }));
}
