use sitegate_core::{AlertId, AlertStatus, ChecklistItem, Date, Priority, ProjectId, QaAlert, RuleKind, Task, TaskId, TaskStatus};
use sitegate_quality::{CompletionOutcome, QualityError};
use sitegate_storage::{AlertStore, JsonStorage, StorageError, TaskStore};

fn day(d: u32) -> Date {
    Date::from_ymd_opt(2025, 3, d).unwrap()
}

fn alert(project: ProjectId, task: TaskId, items: Vec<ChecklistItem>) -> QaAlert {
    let now = chrono::Utc::now();
    QaAlert {
        id: AlertId::new(),
        project_id: project,
        task_id: task,
        rule_type: "concrete_pre_pour".to_string(),
        rule_kind: RuleKind::StatusTransition,
        status: AlertStatus::Pending,
        title: "Pre-pour concrete inspection".to_string(),
        description: String::new(),
        due_date: day(10),
        priority: Priority::Critical,
        assigned_to: Some("lee".to_string()),
        checklist: items,
        completed_by: None,
        completed_at: None,
        notified: true,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn tasks_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let project = ProjectId::new();
    let dig = Task::new(project, "Dig", "Foundation", day(1), day(3));
    let pour = Task::new(project, "Pour", "Concrete", day(4), day(5)).with_dependencies([dig.id]);

    {
        let mut store = JsonStorage::new(dir.path()).await.unwrap();
        store.save_task_updates(project, &[dig.clone(), pour.clone()]).await.unwrap();
    }

    let mut store = JsonStorage::new(dir.path()).await.unwrap();
    let mut loaded = store.load_tasks(project).await.unwrap();
    loaded.sort_by(|a, b| a.title.cmp(&b.title));
    assert_eq!(loaded, vec![dig.clone(), pour.clone()]);

    let mut moved = pour.clone();
    moved.status = TaskStatus::InProgress;
    store.save_task_updates(project, &[moved]).await.unwrap();
    store.delete_task(project, dig.id).await.unwrap();
    store.delete_task(project, dig.id).await.unwrap();

    let loaded = store.load_tasks(project).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].status, TaskStatus::InProgress);
}

#[tokio::test]
async fn unknown_project_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStorage::new(dir.path()).await.unwrap();
    assert!(store.load_tasks(ProjectId::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn alert_checklist_completion_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let project = ProjectId::new();
    let required = ChecklistItem::new("Formwork inspected", true);
    let optional = ChecklistItem::new("Photos", false);
    let (req_id, opt_id) = (required.id, optional.id);
    let a = alert(project, TaskId::new(), vec![required, optional]);

    let mut store = JsonStorage::new(dir.path()).await.unwrap();
    store.upsert_alert(&a).await.unwrap();
    store.upsert_alert(&alert(ProjectId::new(), TaskId::new(), vec![])).await.unwrap();

    let (_, outcome) = store
        .record_checklist_completion(a.id, opt_id, "lee", Some("uploaded".to_string()))
        .await
        .unwrap();
    assert_eq!(outcome, CompletionOutcome::Recorded);

    let (_, outcome) = store.record_checklist_completion(a.id, req_id, "kim", None).await.unwrap();
    assert_eq!(outcome, CompletionOutcome::AlertCompleted);

    let reopened = JsonStorage::new(dir.path()).await.unwrap();
    let live = reopened.list_live_alerts(project).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].status, AlertStatus::Completed);
    assert_eq!(live[0].completed_by.as_deref(), Some("kim"));
    assert_eq!(live[0].item(opt_id).unwrap().notes.as_deref(), Some("uploaded"));

    let mut reopened = reopened;
    reopened.delete_alert(a.id).await.unwrap();
    assert!(reopened.load_alert(a.id).await.unwrap().is_none());
}

#[tokio::test]
async fn corrupt_alert_file_fails_the_listing() {
    let dir = tempfile::tempdir().unwrap();
    let project = ProjectId::new();
    let mut store = JsonStorage::new(dir.path()).await.unwrap();
    store.upsert_alert(&alert(project, TaskId::new(), vec![])).await.unwrap();

    tokio::fs::write(dir.path().join("alerts").join(format!("{}.json", AlertId::new())), "{\"id\":")
        .await
        .unwrap();

    let err = store.list_live_alerts(project).await.unwrap_err();
    assert!(matches!(err, StorageError::Json(_)));
}

#[tokio::test]
async fn second_alert_for_same_task_and_rule_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let project = ProjectId::new();
    let task = TaskId::new();
    let mut store = JsonStorage::new(dir.path()).await.unwrap();
    let first = alert(project, task, vec![]);
    store.upsert_alert(&first).await.unwrap();

    let err = store.upsert_alert(&alert(project, task, vec![])).await.unwrap_err();
    assert!(matches!(err, StorageError::Quality(QualityError::DuplicateAlert { .. })));

    let live = store.list_live_alerts(project).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, first.id);
}

#[tokio::test]
async fn failed_batch_save_leaves_every_task_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let project = ProjectId::new();
    let dig = Task::new(project, "Dig", "Foundation", day(1), day(3));
    let pour = Task::new(project, "Pour", "Concrete", day(4), day(5)).with_dependencies([dig.id]);
    let mut store = JsonStorage::new(dir.path()).await.unwrap();
    store.save_task_updates(project, &[dig.clone(), pour.clone()]).await.unwrap();

    // a directory in the way of the second staging file
    let tasks_dir = dir.path().join("projects").join(project.to_string()).join("tasks");
    tokio::fs::create_dir(tasks_dir.join(format!("{}.json.tmp", pour.id))).await.unwrap();

    let mut moved_dig = dig.clone();
    moved_dig.start_date = day(2);
    moved_dig.end_date = day(4);
    let mut moved_pour = pour.clone();
    moved_pour.start_date = day(5);
    moved_pour.end_date = day(6);
    assert!(store.save_task_updates(project, &[moved_dig, moved_pour]).await.is_err());

    let loaded = store.load_tasks(project).await.unwrap();
    let stored_dig = loaded.iter().find(|t| t.id == dig.id).unwrap();
    let stored_pour = loaded.iter().find(|t| t.id == pour.id).unwrap();
    assert_eq!(stored_dig.start_date, day(1));
    assert_eq!(stored_pour.start_date, day(4));
    assert!(!tasks_dir.join(format!("{}.json.tmp", dig.id)).exists());
}
