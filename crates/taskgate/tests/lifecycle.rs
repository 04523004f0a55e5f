//! Lifecycle integration tests.
//!
//! Every test runs against both store adapters.

use rstest::rstest;
use taskgate::domain::{NewTask, TaskFilter, TaskId, TaskStatus, TaskUpdate};
use taskgate::error::{Error, ErrorKind};

mod common;
use common::{days_from_today, Backend, Harness};

// ============================================================================
// Cycle Rejection
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_reverse_edge_is_rejected(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;

    h.attach(a, &[b]).await;
    assert!(h.service.would_create_cycle(b, a).await.unwrap());

    let err = h
        .service
        .add_dependencies(&h.manager, b, &[a])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::CircularDependency { task, depends_on } if task == b && depends_on == a
    ));
    assert_eq!(err.kind(), ErrorKind::CircularDependencyRejected);
    assert!(h.details(b).await.dependencies.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_self_dependency_is_rejected(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;

    assert!(h.service.would_create_cycle(a, a).await.unwrap());
    let err = h
        .service
        .add_dependencies(&h.manager, a, &[a])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CircularDependency { .. }));
}

#[rstest]
#[tokio::test]
async fn test_chain_rejects_closing_edge_but_not_unrelated_one(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;
    let c = h.task("C").await;
    let d = h.task("D").await;
    h.attach(a, &[b]).await;
    h.attach(b, &[c]).await;

    let err = h
        .service
        .add_dependencies(&h.manager, c, &[a])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CircularDependency { .. }));

    let details = h.attach(d, &[a]).await;
    assert_eq!(details.dependencies, vec![a]);
    assert_eq!(h.details(a).await.dependents, vec![d]);
}

// ============================================================================
// Idempotence and Batch Atomicity
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_attaching_twice_keeps_one_edge(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;

    h.attach(a, &[b]).await;
    let details = h.attach(a, &[b, b]).await;

    assert_eq!(details.dependencies, vec![b]);
    assert_eq!(h.details(b).await.dependents, vec![a]);
}

#[rstest]
#[tokio::test]
async fn test_batch_with_self_dependency_attaches_nothing(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;
    let c = h.task("C").await;

    let err = h
        .service
        .add_dependencies(&h.manager, a, &[b, c, a])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CircularDependency { depends_on, .. } if depends_on == a));
    assert!(h.details(a).await.dependencies.is_empty());
    assert!(h.details(b).await.dependents.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_batch_closing_cycle_midway_attaches_nothing(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;
    let c = h.task("C").await;
    h.attach(c, &[a]).await;

    let err = h
        .service
        .add_dependencies(&h.manager, a, &[b, c])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CircularDependency { depends_on, .. } if depends_on == c));
    assert!(h.details(a).await.dependencies.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_batch_sees_its_own_earlier_edges(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;
    let c = h.task("C").await;
    h.attach(b, &[c]).await;

    // A -> B is attached first, then C -> A would close C -> A -> B -> C.
    h.attach(a, &[b]).await;
    let err = h
        .service
        .add_dependencies(&h.manager, c, &[a])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CircularDependency { .. }));
}

#[rstest]
#[tokio::test]
async fn test_unknown_dependency_rolls_back_whole_batch(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;

    let err = h
        .service
        .add_dependencies(&h.manager, a, &[b, TaskId(999)])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TaskNotFound(TaskId(999))));
    assert!(h.details(a).await.dependencies.is_empty());
}

// ============================================================================
// Create
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_create_with_dependencies(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let t1 = h.task("T1").await;

    let t2 = h
        .create(
            NewTask::new("  T2  ")
                .with_description("second")
                .with_due_date(days_from_today(7))
                .with_assignee(h.user.id)
                .with_dependencies([t1]),
        )
        .await;

    assert_eq!(t2.task.title, "T2");
    assert_eq!(t2.task.status, TaskStatus::Pending);
    assert_eq!(t2.task.created_by, h.manager.id);
    assert_eq!(t2.task.assigned_to, Some(h.user.id));
    assert_eq!(t2.task.created_at, t2.task.updated_at);
    assert_eq!(t2.dependencies, vec![t1]);
    assert_eq!(h.details(t1).await.dependents, vec![t2.task.id]);
}

#[rstest]
#[tokio::test]
async fn test_create_with_unknown_dependency_creates_nothing(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let err = h
        .service
        .create_task(
            &h.manager,
            NewTask::new("Orphan").with_dependencies([TaskId(404)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(TaskId(404))));

    let page = h
        .service
        .list_tasks(&h.manager, TaskFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[rstest]
#[tokio::test]
async fn test_create_validation(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;

    let err = h
        .service
        .create_task(&h.manager, NewTask::new("   "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .service
        .create_task(
            &h.manager,
            NewTask::new("Late").with_due_date(days_from_today(-1)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .service
        .create_task(
            &h.manager,
            NewTask::new("Nobody").with_assignee(taskgate::domain::UserId(77)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserNotFound(_)));

    // Due today is fine.
    h.create(NewTask::new("Today").with_due_date(days_from_today(0)))
        .await;
}

#[rstest]
#[tokio::test]
async fn test_ids_are_never_reused(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let first = h.task("first").await;
    h.service.delete_task(&h.manager, first).await.unwrap();

    let second = h.task("second").await;
    assert!(second > first);
}

// ============================================================================
// Completion Gate
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_completion_waits_for_dependencies(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;
    h.attach(a, &[b]).await;

    let err = h
        .service
        .update_task(&h.manager, a, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        Error::CompletionBlocked { task, pending } if *task == a && pending == &vec![b]
    ));
    assert_eq!(h.details(a).await.task.status, TaskStatus::Pending);

    h.service
        .update_task(&h.manager, b, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap();
    let done = h
        .service
        .update_task(&h.manager, a, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.task.status, TaskStatus::Completed);
}

#[rstest]
#[tokio::test]
async fn test_canceled_dependency_blocks_completion(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;
    h.attach(a, &[b]).await;
    h.service
        .update_task(&h.manager, b, TaskUpdate::status(TaskStatus::Canceled))
        .await
        .unwrap();

    let err = h
        .service
        .update_task(&h.manager, a, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CompletionBlocked);
}

#[rstest]
#[tokio::test]
async fn test_deleting_dependency_unblocks_dependent(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;
    h.attach(a, &[b]).await;

    h.service.delete_task(&h.manager, b).await.unwrap();

    // The dangling edge stays visible but no longer blocks.
    assert_eq!(h.details(a).await.dependencies, vec![b]);
    let done = h
        .service
        .update_task(&h.manager, a, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.task.status, TaskStatus::Completed);
}

#[rstest]
#[tokio::test]
async fn test_only_direct_dependencies_are_gated(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let a = h.task("A").await;
    let b = h.task("B").await;
    let c = h.task("C").await;
    h.attach(a, &[b]).await;
    h.attach(b, &[c]).await;

    let err = h
        .service
        .update_task(&h.manager, a, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CompletionBlocked { pending, .. } if pending == vec![b]));
}

// ============================================================================
// Access Policy
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_manager_only_operations_check_role_first(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let missing = TaskId(500);

    let err = h
        .service
        .create_task(&h.user, NewTask::new("Nope"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationDenied);

    let err = h.service.delete_task(&h.user, missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationDenied);

    let err = h
        .service
        .add_dependencies(&h.user, missing, &[TaskId(1)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationDenied);

    let err = h.service.delete_task(&h.manager, missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[rstest]
#[tokio::test]
async fn test_get_and_update_check_existence_first(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let missing = TaskId(500);

    let err = h.service.get_task(&h.user, missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .service
        .update_task(&h.user, missing, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[rstest]
#[tokio::test]
async fn test_users_only_see_and_touch_their_tasks(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let mine = h.assigned_task("Mine").await;

    h.service.get_task(&h.user, mine).await.unwrap();

    let err = h.service.get_task(&h.outsider, mine).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationDenied);

    let err = h
        .service
        .update_task(&h.outsider, mine, TaskUpdate::status(TaskStatus::Canceled))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationDenied);
}

#[rstest]
#[tokio::test]
async fn test_assignee_may_only_change_status(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let mine = h.assigned_task("Mine").await;

    let err = h
        .service
        .update_task(
            &h.user,
            mine,
            TaskUpdate {
                title: Some("Renamed".to_string()),
                status: Some(TaskStatus::Completed),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationDenied);
    assert_eq!(h.details(mine).await.task.title, "Mine");

    let done = h
        .service
        .update_task(&h.user, mine, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.task.status, TaskStatus::Completed);
    assert!(done.task.updated_at >= done.task.created_at);
}

#[rstest]
#[tokio::test]
async fn test_manager_updates_and_clears_fields(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let id = h
        .create(
            NewTask::new("Draft")
                .with_description("notes")
                .with_due_date(days_from_today(3))
                .with_assignee(h.user.id),
        )
        .await
        .task
        .id;

    let updated = h
        .service
        .update_task(
            &h.manager,
            id,
            TaskUpdate {
                title: Some("Final".to_string()),
                description: Some(None),
                due_date: Some(None),
                assigned_to: Some(Some(h.outsider.id)),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.task.title, "Final");
    assert_eq!(updated.task.description, None);
    assert_eq!(updated.task.due_date, None);
    assert_eq!(updated.task.assigned_to, Some(h.outsider.id));
    assert_eq!(h.details(id).await.task, updated.task);
}

// ============================================================================
// Listing
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_listing_is_scoped_to_assignments_for_users(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let mine = h.assigned_task("Mine").await;
    h.create(NewTask::new("Theirs").with_assignee(h.outsider.id))
        .await;
    h.task("Unassigned").await;

    let filter = TaskFilter {
        assigned_to: Some(h.outsider.id),
        ..TaskFilter::default()
    };
    let page = h
        .service
        .list_tasks(&h.user, filter.clone(), None)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id, mine);

    let page = h.service.list_tasks(&h.manager, filter, None).await.unwrap();
    assert_eq!(page.total, 1);
    assert_ne!(page.data[0].id, mine);
}

#[rstest]
#[tokio::test]
async fn test_listing_filters_and_orders_newest_first(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    let soon = h
        .create(NewTask::new("Soon").with_due_date(days_from_today(1)))
        .await
        .task
        .id;
    let later = h
        .create(NewTask::new("Later").with_due_date(days_from_today(10)))
        .await
        .task
        .id;
    let undated = h.task("Undated").await;
    h.service
        .update_task(&h.manager, later, TaskUpdate::status(TaskStatus::Canceled))
        .await
        .unwrap();

    let all = h
        .service
        .list_tasks(&h.manager, TaskFilter::default(), None)
        .await
        .unwrap();
    let ids: Vec<_> = all.data.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![undated, later, soon]);

    let in_range = TaskFilter {
        due_date_from: Some(days_from_today(1)),
        due_date_to: Some(days_from_today(10)),
        ..TaskFilter::default()
    };
    let page = h.service.list_tasks(&h.manager, in_range, None).await.unwrap();
    assert_eq!(page.total, 2);

    let canceled = TaskFilter {
        status: Some(TaskStatus::Canceled),
        ..TaskFilter::default()
    };
    let page = h.service.list_tasks(&h.manager, canceled, None).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, later);
}

#[rstest]
#[tokio::test]
async fn test_listing_pages(
    #[values(Backend::InMemory, Backend::Sqlite)] backend: Backend,
) {
    let h = Harness::new(backend).await;
    for i in 0..17 {
        h.task(&format!("Task {i}")).await;
    }

    let first = h
        .service
        .list_tasks(&h.manager, TaskFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(first.data.len(), 15);
    assert_eq!(first.total, 17);
    assert_eq!(first.last_page, 2);

    let second = h
        .service
        .list_tasks(&h.manager, TaskFilter::default(), Some(2))
        .await
        .unwrap();
    assert_eq!(second.current_page, 2);
    assert_eq!(second.data.len(), 2);

    let beyond = h
        .service
        .list_tasks(&h.manager, TaskFilter::default(), Some(9))
        .await
        .unwrap();
    assert!(beyond.data.is_empty());
}

// ============================================================================
// End-to-end Scenario
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_full_scenario(#[values(Backend::InMemory, Backend::Sqlite)] backend: Backend) {
    let h = Harness::new(backend).await;

    let t1 = h.assigned_task("T1").await;
    let t2 = h
        .create(
            NewTask::new("T2")
                .with_assignee(h.user.id)
                .with_dependencies([t1]),
        )
        .await;
    assert_eq!(t2.dependencies, vec![t1]);
    let t2 = t2.task.id;

    let err = h
        .service
        .add_dependencies(&h.manager, t1, &[t2])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularDependencyRejected);

    let err = h
        .service
        .update_task(&h.user, t2, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CompletionBlocked);

    h.service
        .update_task(&h.manager, t1, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap();
    let done = h
        .service
        .update_task(&h.user, t2, TaskUpdate::status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.task.status, TaskStatus::Completed);
}
