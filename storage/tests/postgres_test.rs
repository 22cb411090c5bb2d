//! PostgreSQL backend tests against the shared testcontainer fixture.
//! Each test skips itself when Docker is unavailable.

use portal_core::traits::{
    ProgramCatalog, StudentDirectory, TaskStore, TemplateFilter, TemplateStore
};
use portal_core::types::{SubmissionKind, Task, TaskStatus, TemplateScope};
use serial_test::serial;
use storage::PostgresBackend;
use testing::{StudentBuilder, unique_id};

async fn backend() -> Option<PostgresBackend> {
    let fixture = testing::postgres().await?;
    let backend = PostgresBackend::new(fixture.url())
        .await
        .expect("connect to test postgres");
    backend
        .initialize_schema()
        .await
        .expect("initialize schema");
    Some(backend)
}

#[tokio::test]
#[serial]
async fn student_round_trip_with_associations() {
    let Some(backend) = backend().await else {
        eprintln!("Skipping: no Docker available");
        return;
    };

    let student = StudentBuilder::new()
        .countries(&["at", "it"])
        .programs(&["p-cs-msc"])
        .build();
    backend.create_student(&student).await.unwrap();

    let loaded = backend.get_student(student.id).await.unwrap().unwrap();
    assert_eq!(loaded.country_ids.len(), 2);
    assert_eq!(loaded.selected_program_ids.len(), 1);

    let by_user = backend
        .get_student_by_user_id(&student.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_user.id, student.id);

    backend.add_xp(student.id, 30).await.unwrap();
    let after = backend.get_student(student.id).await.unwrap().unwrap();
    assert_eq!(after.xp_total, 30);
}

#[tokio::test]
#[serial]
async fn template_filters_enforce_level_exclusions() {
    let Some(backend) = backend().await else {
        eprintln!("Skipping: no Docker available");
        return;
    };

    // Unique slugs per run; the fixture database is shared.
    let country = unique_id("ct");
    let university = unique_id("uni");
    let program = unique_id("prog");

    let country_scope = TemplateScope::Country(country.parse().unwrap());
    let university_scope = TemplateScope::University(university.parse().unwrap());
    let program_scope = TemplateScope::Program(program.parse().unwrap());

    backend
        .insert_template(
            &country_scope,
            "Docs",
            "Passport",
            "scan",
            10,
            SubmissionKind::FileUpload
        )
        .await
        .unwrap();
    backend
        .insert_template(
            &university_scope,
            "Uni",
            "Register",
            "",
            20,
            SubmissionKind::Confirmation
        )
        .await
        .unwrap();
    backend
        .insert_template(
            &program_scope,
            "Prog",
            "Exam",
            "",
            30,
            SubmissionKind::Text
        )
        .await
        .unwrap();

    let country_generic = backend
        .find_templates(&TemplateFilter::CountryGeneric {
            country_ids: vec![country.parse().unwrap()]
        })
        .await
        .unwrap();
    assert_eq!(country_generic.len(), 1);
    assert_eq!(country_generic[0].title, "Passport");
    assert!(matches!(
        country_generic[0].scope,
        Some(TemplateScope::Country(_))
    ));

    let university_generic = backend
        .find_templates(&TemplateFilter::UniversityGeneric {
            university_ids: vec![university.parse().unwrap()]
        })
        .await
        .unwrap();
    assert_eq!(university_generic.len(), 1);
    assert_eq!(university_generic[0].title, "Register");

    let program_specific = backend
        .find_templates(&TemplateFilter::ProgramSpecific {
            program_ids: vec![program.parse().unwrap()]
        })
        .await
        .unwrap();
    assert_eq!(program_specific.len(), 1);
    assert_eq!(program_specific[0].xp_reward, 30);

    let empty = backend
        .find_templates(&TemplateFilter::CountryGeneric {
            country_ids: vec![]
        })
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
#[serial]
async fn unique_key_makes_duplicate_inserts_no_ops() {
    let Some(backend) = backend().await else {
        eprintln!("Skipping: no Docker available");
        return;
    };

    let student = StudentBuilder::new().countries(&["at"]).build();
    backend.create_student(&student).await.unwrap();

    let template = testing::TemplateBuilder::country("at")
        .stage(unique_id("Stage"))
        .title("Passport")
        .xp(20)
        .build();
    let first = Task::from_template(student.id, &template);
    let second = Task::from_template(student.id, &template);

    backend.insert_tasks(&[first.clone()]).await.unwrap();
    // Same (student, stage, title): conflict is swallowed, not an error.
    backend.insert_tasks(&[second]).await.unwrap();

    let tasks = backend.find_for_student(student.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, first.id);

    let keys = backend.find_existing_keys(student.id).await.unwrap();
    assert_eq!(keys.len(), 1);
}

#[tokio::test]
#[serial]
async fn task_status_and_submission_updates() {
    let Some(backend) = backend().await else {
        eprintln!("Skipping: no Docker available");
        return;
    };

    let student = StudentBuilder::new().countries(&["at"]).build();
    backend.create_student(&student).await.unwrap();

    let template = testing::TemplateBuilder::country("at")
        .stage(unique_id("Stage"))
        .title("Motivation letter")
        .build();
    let task = Task::from_template(student.id, &template);
    backend.insert_tasks(std::slice::from_ref(&task)).await.unwrap();

    backend
        .set_submission(task.id, serde_json::json!({"text": "draft"}))
        .await
        .unwrap();
    backend
        .update_status(task.id, TaskStatus::Review)
        .await
        .unwrap();

    let loaded = backend.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, TaskStatus::Review);
    assert_eq!(loaded.submission, Some(serde_json::json!({"text": "draft"})));

    let in_review = backend.find_by_status(TaskStatus::Review).await.unwrap();
    assert!(in_review.iter().any(|t| t.id == task.id));
}

#[tokio::test]
#[serial]
async fn program_catalog_resolves_universities() {
    let Some(backend) = backend().await else {
        eprintln!("Skipping: no Docker available");
        return;
    };

    let university = unique_id("uni");
    let p1 = unique_id("prog");
    let p2 = unique_id("prog");
    backend
        .insert_program(&p1.parse().unwrap(), &university.parse().unwrap())
        .await
        .unwrap();
    backend
        .insert_program(&p2.parse().unwrap(), &university.parse().unwrap())
        .await
        .unwrap();

    let unis = backend
        .university_ids_for_programs(&[p1.parse().unwrap(), p2.parse().unwrap()])
        .await
        .unwrap();
    assert_eq!(unis.len(), 1);
    assert_eq!(unis[0].as_str(), university);
}
