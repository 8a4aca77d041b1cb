// tests/tutor_tests.rs

mod common;

use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use adaptive_tutor::{
    clients::generator::ContentGenerator,
    error::AppError,
    models::{attempt::SubmitQuizRequest, lesson::Lesson},
    services::{
        locks::GenerationLocks,
        remediation::RemediationOrchestrator,
        reports::ReportService,
        resolver::{ContentSource, ModuleContentResolver},
    },
    store::{attempts, progress::ProgressStore, quizzes, subjects},
};
use axum::extract::FromRef;
use common::{TestContext, answers, setup};
use serde_json::json;
use sqlx::types::Json;

const STUDENT: i64 = 7;

fn resolver(ctx: &TestContext) -> ModuleContentResolver {
    ModuleContentResolver::from_ref(&ctx.state)
}

fn orchestrator(ctx: &TestContext) -> RemediationOrchestrator {
    RemediationOrchestrator::from_ref(&ctx.state)
}

fn progress_store(ctx: &TestContext) -> ProgressStore {
    ProgressStore::from_ref(&ctx.state)
}

async fn override_rows(ctx: &TestContext) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM module_overrides")
        .fetch_one(&ctx.state.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn enrollment_is_idempotent() {
    let ctx = setup().await;
    let store = progress_store(&ctx);
    let module_id = ctx.module_ids[0];

    let first = store.enroll(STUDENT, ctx.subject_id).await.unwrap();

    let view = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&view.quiz, 10))
        .await
        .unwrap();

    let second = store.enroll(STUDENT, ctx.subject_id).await.unwrap();
    assert_eq!(first.id, second.id);
    assert!(second.is_completed(module_id));

    let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM student_progress")
        .fetch_one(&ctx.state.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn enroll_unknown_subject_is_not_found() {
    let ctx = setup().await;
    let result = progress_store(&ctx).enroll(STUDENT, 999).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let missing = progress_store(&ctx).get_progress(STUDENT, ctx.subject_id).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn module_view_requires_enrollment() {
    let ctx = setup().await;

    let result = resolver(&ctx)
        .resolve_module_view(STUDENT, ctx.module_ids[0])
        .await;
    assert!(matches!(result, Err(AppError::NotEnrolled(_))));
    assert_eq!(ctx.generator.lessons(), 0);

    let unknown = resolver(&ctx).resolve_module_view(STUDENT, 999).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn first_read_generates_master_once() {
    let ctx = setup().await;
    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];

    let first = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    let second = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();

    assert_eq!(first.source, ContentSource::Master);
    assert_eq!(first.quiz.id, second.quiz.id);
    assert_eq!(first.quiz.questions.len(), 10);
    assert!(!first.is_completed);
    assert_eq!(ctx.generator.lessons(), 1);
    assert_eq!(ctx.generator.quizzes(), 1);

    let module = subjects::find_module(&ctx.state.pool, module_id).await.unwrap().unwrap();
    assert!(module.is_generated());
}

#[tokio::test]
async fn override_takes_precedence_over_master() {
    let ctx = setup().await;
    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];

    let master = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    let outcome = orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&master.quiz, 5))
        .await
        .unwrap();
    assert!(!outcome.passed);
    assert!(outcome.remedial_available);

    let view = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    assert_eq!(view.source, ContentSource::Override);
    assert_ne!(view.quiz.id, master.quiz.id);
    assert!(view.content.title.starts_with("Remedial 1 for Basics"));

    // Another student still sees the master.
    progress_store(&ctx).enroll(8, ctx.subject_id).await.unwrap();
    let other = resolver(&ctx).resolve_module_view(8, module_id).await.unwrap();
    assert_eq!(other.source, ContentSource::Master);
    assert_eq!(other.quiz.id, master.quiz.id);
}

#[tokio::test]
async fn mastery_boundary() {
    let ctx = setup().await;
    let store = progress_store(&ctx);
    let module_id = ctx.module_ids[0];
    store.enroll(1, ctx.subject_id).await.unwrap();
    store.enroll(2, ctx.subject_id).await.unwrap();

    let quiz = resolver(&ctx).resolve_module_view(1, module_id).await.unwrap().quiz;

    let nine = orchestrator(&ctx)
        .record_attempt(1, module_id, answers(&quiz, 9))
        .await
        .unwrap();
    assert_eq!(nine.score, 90);
    assert!(nine.passed);
    assert!(!nine.remedial_available);

    let eight = orchestrator(&ctx)
        .record_attempt(2, module_id, answers(&quiz, 8))
        .await
        .unwrap();
    assert_eq!(eight.score, 80);
    assert!(!eight.passed);

    assert!(store.get_progress(1, ctx.subject_id).await.unwrap().is_completed(module_id));
    let failed = store.get_progress(2, ctx.subject_id).await.unwrap();
    assert!(!failed.is_completed(module_id));
    assert!(failed.override_for(module_id).is_some());
}

#[tokio::test]
async fn repeated_failures_keep_one_override() {
    let ctx = setup().await;
    let store = progress_store(&ctx);
    store.enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];

    let mut quiz = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap().quiz;
    for _ in 0..3 {
        orchestrator(&ctx)
            .record_attempt(STUDENT, module_id, answers(&quiz, 2))
            .await
            .unwrap();
        quiz = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap().quiz;
    }

    let progress = store.get_progress(STUDENT, ctx.subject_id).await.unwrap();
    assert_eq!(progress.module_overrides.len(), 1);
    let latest = progress.override_for(module_id).unwrap();
    assert_eq!(latest.quiz_id, quiz.id);
    assert!(latest.content.title.starts_with("Remedial 3"));
    assert_eq!(override_rows(&ctx).await, 1);
}

#[tokio::test]
async fn pass_clears_override_and_marks_completion() {
    let ctx = setup().await;
    let store = progress_store(&ctx);
    store.enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[1];

    let master = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&master.quiz, 0))
        .await
        .unwrap();

    let remedial = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    assert_eq!(remedial.source, ContentSource::Override);

    let outcome = orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&remedial.quiz, 10))
        .await
        .unwrap();
    assert!(outcome.passed);
    assert_eq!(outcome.attempt.quiz_id, remedial.quiz.id);

    let progress = store.get_progress(STUDENT, ctx.subject_id).await.unwrap();
    assert!(progress.is_completed(module_id));
    assert!(progress.override_for(module_id).is_none());
    assert_eq!(override_rows(&ctx).await, 0);

    let view = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    assert_eq!(view.source, ContentSource::Master);
    assert!(view.is_completed);

    // Passing again is a no-op on the completed set.
    orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&view.quiz, 10))
        .await
        .unwrap();
    let progress = store.get_progress(STUDENT, ctx.subject_id).await.unwrap();
    assert_eq!(progress.completed_modules.len(), 1);
}

#[tokio::test]
async fn failed_generation_leaves_module_contentless() {
    let ctx = setup().await;
    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];

    ctx.generator.fail_quiz.store(true, Ordering::SeqCst);
    let result = resolver(&ctx).resolve_module_view(STUDENT, module_id).await;
    assert!(matches!(result, Err(AppError::GenerationFailed(_))));

    ctx.generator.fail_quiz.store(false, Ordering::SeqCst);
    ctx.generator.short_quiz.store(true, Ordering::SeqCst);
    let result = resolver(&ctx).resolve_module_view(STUDENT, module_id).await;
    assert!(matches!(result, Err(AppError::GenerationFailed(_))));

    let module = subjects::find_module(&ctx.state.pool, module_id).await.unwrap().unwrap();
    assert!(module.content.is_none());
    assert!(module.quiz_id.is_none());
    assert_eq!(quizzes::count_for_module(&ctx.state.pool, module_id).await.unwrap(), 0);

    ctx.generator.short_quiz.store(false, Ordering::SeqCst);
    let quiz_calls = ctx.generator.quizzes();
    let view = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    assert_eq!(view.source, ContentSource::Master);
    assert_eq!(ctx.generator.quizzes(), quiz_calls + 1);
    assert_eq!(quizzes::count_for_module(&ctx.state.pool, module_id).await.unwrap(), 1);
}

#[tokio::test]
async fn slow_generator_times_out_and_leaves_module_contentless() {
    let mut ctx = setup().await;
    ctx.state.config.generator_timeout = Duration::from_millis(50);
    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];

    ctx.generator.lesson_delay_ms.store(500, Ordering::SeqCst);
    let result = resolver(&ctx).resolve_module_view(STUDENT, module_id).await;
    assert!(matches!(result, Err(AppError::GenerationFailed(msg)) if msg.contains("timed out")));
    assert_eq!(ctx.generator.quizzes(), 0);

    let module = subjects::find_module(&ctx.state.pool, module_id).await.unwrap().unwrap();
    assert!(module.content.is_none());
    assert_eq!(quizzes::count_for_module(&ctx.state.pool, module_id).await.unwrap(), 0);

    ctx.generator.lesson_delay_ms.store(0, Ordering::SeqCst);
    let view = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    assert_eq!(view.source, ContentSource::Master);
}

#[tokio::test]
async fn quiz_with_repeated_question_ids_is_rejected() {
    let ctx = setup().await;
    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[1];

    ctx.generator.duplicate_ids.store(true, Ordering::SeqCst);
    let result = resolver(&ctx).resolve_module_view(STUDENT, module_id).await;
    assert!(matches!(result, Err(AppError::GenerationFailed(msg)) if msg.contains("repeats")));
    assert_eq!(quizzes::count_for_module(&ctx.state.pool, module_id).await.unwrap(), 0);

    ctx.generator.duplicate_ids.store(false, Ordering::SeqCst);
    let view = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    let mut ids: Vec<_> = view.quiz.questions.iter().map(|q| q.id()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), view.quiz.questions.len());
}

#[tokio::test]
async fn rolled_back_write_leaves_nothing_behind() {
    let ctx = setup().await;
    let pool = &ctx.state.pool;
    let module_id = ctx.module_ids[2];

    let lesson: Lesson = serde_json::from_value(json!({
        "title": "Half written",
        "sections": [{ "heading": "h", "body": "b" }]
    }))
    .unwrap();
    let questions = ctx.generator.generate_quiz(&lesson, None).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let quiz = quizzes::insert_quiz(&mut *tx, module_id, &questions).await.unwrap();
    assert!(subjects::attach_master_content(&mut *tx, module_id, &lesson, quiz.id)
        .await
        .unwrap());
    tx.rollback().await.unwrap();

    let module = subjects::find_module(pool, module_id).await.unwrap().unwrap();
    assert!(!module.is_generated());
    assert_eq!(quizzes::count_for_module(pool, module_id).await.unwrap(), 0);

    // Content without a quiz violates the table constraint.
    let half = sqlx::query("UPDATE modules SET content = ?1 WHERE id = ?2")
        .bind(Json(&lesson))
        .bind(module_id)
        .execute(pool)
        .await;
    assert!(half.is_err());

    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let lessons = ctx.generator.lessons();
    resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    assert_eq!(ctx.generator.lessons(), lessons + 1);
    assert_eq!(quizzes::count_for_module(pool, module_id).await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_first_reads_generate_one_quiz() {
    let ctx = setup().await;
    let store = progress_store(&ctx);
    store.enroll(1, ctx.subject_id).await.unwrap();
    store.enroll(2, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];
    ctx.generator.lesson_delay_ms.store(50, Ordering::SeqCst);

    let a = resolver(&ctx);
    let b = resolver(&ctx);
    let (first, second) = tokio::join!(
        a.resolve_module_view(1, module_id),
        b.resolve_module_view(2, module_id)
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.quiz.id, second.quiz.id);
    assert_eq!(ctx.generator.lessons(), 1);
    assert_eq!(quizzes::count_for_module(&ctx.state.pool, module_id).await.unwrap(), 1);
}

#[tokio::test]
async fn compare_and_set_resolves_race_without_shared_lock() {
    let ctx = setup().await;
    progress_store(&ctx).enroll(1, ctx.subject_id).await.unwrap();
    progress_store(&ctx).enroll(2, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];
    ctx.generator.lesson_delay_ms.store(50, Ordering::SeqCst);

    // Separate lock tables behave like two server processes.
    let a = ModuleContentResolver::new(
        ctx.state.pool.clone(),
        ctx.state.generation(),
        Arc::new(GenerationLocks::new()),
    );
    let b = ModuleContentResolver::new(
        ctx.state.pool.clone(),
        ctx.state.generation(),
        Arc::new(GenerationLocks::new()),
    );
    let (first, second) = tokio::join!(
        a.resolve_module_view(1, module_id),
        b.resolve_module_view(2, module_id)
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(ctx.generator.lessons(), 2);
    assert_eq!(first.quiz.id, second.quiz.id);
    assert_eq!(quizzes::count_for_module(&ctx.state.pool, module_id).await.unwrap(), 1);
}

#[tokio::test]
async fn remediation_failure_keeps_attempt_and_prior_override() {
    let ctx = setup().await;
    let store = progress_store(&ctx);
    store.enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];

    let master = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&master.quiz, 1))
        .await
        .unwrap();
    let first_override = store
        .get_progress(STUDENT, ctx.subject_id)
        .await
        .unwrap()
        .override_for(module_id)
        .cloned()
        .unwrap();

    ctx.generator.fail_remedial.store(true, Ordering::SeqCst);
    let remedial_quiz = quizzes::find_quiz(&ctx.state.pool, first_override.quiz_id)
        .await
        .unwrap()
        .unwrap();
    let result = orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&remedial_quiz, 3))
        .await;
    let message = match result {
        Err(AppError::GenerationFailed(message)) => message,
        other => panic!("expected GenerationFailed, got {:?}", other),
    };

    let history = attempts::list_by_student(&ctx.state.pool, STUDENT).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(message.contains(&format!("attempt {}", history[0].id)));

    let progress = store.get_progress(STUDENT, ctx.subject_id).await.unwrap();
    assert_eq!(progress.override_for(module_id), Some(&first_override));

    // Explicit retry once the generator recovers.
    ctx.generator.fail_remedial.store(false, Ordering::SeqCst);
    let retried = orchestrator(&ctx)
        .retry_remediation(STUDENT, module_id)
        .await
        .unwrap();
    assert_ne!(retried.quiz_id, first_override.quiz_id);

    let progress = store.get_progress(STUDENT, ctx.subject_id).await.unwrap();
    assert_eq!(progress.override_for(module_id), Some(&retried));
    assert_eq!(override_rows(&ctx).await, 1);
}

#[tokio::test]
async fn retry_remediation_rejects_mastered_or_untried_modules() {
    let ctx = setup().await;
    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];

    let untried = orchestrator(&ctx).retry_remediation(STUDENT, module_id).await;
    assert!(matches!(untried, Err(AppError::NotFound(_))));

    let quiz = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap().quiz;
    orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&quiz, 10))
        .await
        .unwrap();

    let mastered = orchestrator(&ctx).retry_remediation(STUDENT, module_id).await;
    assert!(matches!(mastered, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn stale_quiz_submission_conflicts() {
    let ctx = setup().await;
    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];

    let master = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap();
    orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&master.quiz, 0))
        .await
        .unwrap();

    // The master quiz has been replaced by an override for this student.
    let result = orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&master.quiz, 10))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let history = attempts::list_by_student(&ctx.state.pool, STUDENT).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn invalid_submission_is_rejected_before_side_effects() {
    let ctx = setup().await;
    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];
    let quiz = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap().quiz;

    let request: SubmitQuizRequest = serde_json::from_value(json!({
        "answers": [{ "question_id": quiz.questions[0].id(), "chosen_index": 0, "submitted_code": "x" }]
    }))
    .unwrap();
    let result = orchestrator(&ctx).record_attempt(STUDENT, module_id, request).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    assert!(attempts::list_by_student(&ctx.state.pool, STUDENT).await.unwrap().is_empty());
}

#[tokio::test]
async fn unanswered_questions_score_zero() {
    let ctx = setup().await;
    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];
    let quiz = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap().quiz;

    let mut request = answers(&quiz, 10);
    request.answers.truncate(9);
    let outcome = orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, request)
        .await
        .unwrap();

    assert_eq!(outcome.score, 90);
    assert!(outcome.passed);
    assert_eq!(outcome.attempt.answers.len(), 9);
}

#[tokio::test]
async fn reports_need_attempts_and_are_listed_newest_first() {
    let ctx = setup().await;
    let service = ReportService::from_ref(&ctx.state);

    let none = service.generate_report(STUDENT, ctx.subject_id).await;
    assert!(matches!(none, Err(AppError::NotFound(_))));
    let missing_subject = service.generate_report(STUDENT, 999).await;
    assert!(matches!(missing_subject, Err(AppError::NotFound(_))));

    progress_store(&ctx).enroll(STUDENT, ctx.subject_id).await.unwrap();
    let module_id = ctx.module_ids[0];
    let quiz = resolver(&ctx).resolve_module_view(STUDENT, module_id).await.unwrap().quiz;
    orchestrator(&ctx)
        .record_attempt(STUDENT, module_id, answers(&quiz, 10))
        .await
        .unwrap();

    let first = service.generate_report(STUDENT, ctx.subject_id).await.unwrap();
    let second = service.generate_report(STUDENT, ctx.subject_id).await.unwrap();
    assert_eq!(first.content.0["attempts_analysed"], 1);

    let listed = service.list_reports(STUDENT).await.unwrap();
    assert_eq!(
        listed.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
}
