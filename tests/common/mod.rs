// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use adaptive_tutor::{
    clients::{
        generator::{ContentGenerator, FailedCase, GeneratorError},
        sandbox::{CodeRunner, ExecutionResult, ExecutionStatus, STATUS_ACCEPTED, SandboxError},
    },
    config::Config,
    models::{
        attempt::{AttemptSummary, SubmitQuizRequest, SubmittedAnswer},
        lesson::{Lesson, LessonSection},
        quiz::{Language, McqQuestion, Question, Quiz},
    },
    routes,
    state::AppState,
    store::{self, subjects},
};
use async_trait::async_trait;
use serde_json::json;

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Deterministic generator: every MCQ has its answer at index 0.
#[derive(Default)]
pub struct FakeGenerator {
    pub lesson_calls: AtomicUsize,
    pub quiz_calls: AtomicUsize,
    pub remedial_calls: AtomicUsize,
    pub report_calls: AtomicUsize,
    pub fail_lesson: AtomicBool,
    pub fail_quiz: AtomicBool,
    pub fail_remedial: AtomicBool,
    /// Returns one question too few when set.
    pub short_quiz: AtomicBool,
    /// Gives every question the id of the first one when set.
    pub duplicate_ids: AtomicBool,
    /// Artificial latency of `generate_lesson`, in milliseconds.
    pub lesson_delay_ms: AtomicUsize,
}

impl FakeGenerator {
    pub fn lessons(&self) -> usize {
        self.lesson_calls.load(Ordering::SeqCst)
    }

    pub fn quizzes(&self) -> usize {
        self.quiz_calls.load(Ordering::SeqCst)
    }

    pub fn remedials(&self) -> usize {
        self.remedial_calls.load(Ordering::SeqCst)
    }
}

fn lesson(title: String) -> Lesson {
    Lesson {
        title,
        sections: vec![LessonSection {
            heading: "Overview".to_string(),
            body: "Worked explanation.".to_string(),
            code_sample: Some("print(42)".to_string()),
        }],
        key_takeaways: vec!["Practice".to_string()],
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate_lesson(
        &self,
        topic: &str,
        _context: Option<&str>,
    ) -> Result<Lesson, GeneratorError> {
        self.lesson_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.lesson_delay_ms.load(Ordering::SeqCst) as u64;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_lesson.load(Ordering::SeqCst) {
            return Err(GeneratorError::Empty);
        }
        Ok(lesson(format!("Lesson: {}", topic)))
    }

    async fn generate_quiz(
        &self,
        lesson: &Lesson,
        _language: Option<Language>,
    ) -> Result<Vec<Question>, GeneratorError> {
        let n = self.quiz_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_quiz.load(Ordering::SeqCst) {
            return Err(GeneratorError::Malformed("quiz payload".to_string()));
        }
        let count = if self.short_quiz.load(Ordering::SeqCst) { 9 } else { 10 };
        let questions = (1..=count)
            .map(|i| {
                McqQuestion::new(
                    format!("{} / quiz {} / question {}", lesson.title, n, i),
                    vec!["right".into(), "wrong".into(), "also wrong".into()],
                    0,
                    None,
                )
                .map(Question::Mcq)
                .map_err(|e| GeneratorError::Malformed(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if self.duplicate_ids.load(Ordering::SeqCst) {
            let mut stored = serde_json::to_value(&questions)
                .map_err(|e| GeneratorError::Malformed(e.to_string()))?;
            let first_id = stored[0]["id"].clone();
            if let Some(items) = stored.as_array_mut() {
                for item in items {
                    item["id"] = first_id.clone();
                }
            }
            return serde_json::from_value(stored)
                .map_err(|e| GeneratorError::Malformed(e.to_string()));
        }
        Ok(questions)
    }

    async fn generate_remedial_lesson(
        &self,
        failed_questions: &[String],
        module_title: &str,
        _language: Option<Language>,
    ) -> Result<Lesson, GeneratorError> {
        let n = self.remedial_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_remedial.load(Ordering::SeqCst) {
            return Err(GeneratorError::Status {
                status: 500,
                body: "overloaded".to_string(),
            });
        }
        Ok(lesson(format!(
            "Remedial {} for {} ({} missed)",
            n,
            module_title,
            failed_questions.len()
        )))
    }

    async fn generate_hint(
        &self,
        _problem_statement: &str,
        _submitted_code: &str,
        failed_case: &FailedCase,
        _language: Language,
    ) -> Result<String, GeneratorError> {
        Ok(format!("Expected {}", failed_case.expected_output))
    }

    async fn generate_report(
        &self,
        student_id: i64,
        attempts: &[AttemptSummary],
    ) -> Result<serde_json::Value, GeneratorError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "student_id": student_id,
            "attempts_analysed": attempts.len(),
            "summary": "Steady progress",
        }))
    }
}

/// Sandbox that echoes stdin back as stdout.
#[derive(Default)]
pub struct EchoRunner {
    pub calls: AtomicUsize,
    pub down: AtomicBool,
}

#[async_trait]
impl CodeRunner for EchoRunner {
    async fn run(
        &self,
        _language: Language,
        _source_code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, SandboxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(SandboxError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(ExecutionResult {
            stdout: Some(stdin.to_string()),
            stderr: None,
            compile_output: None,
            message: None,
            status: ExecutionStatus {
                id: STATUS_ACCEPTED,
                description: "Accepted".to_string(),
            },
            time: Some("0.01".to_string()),
            memory: Some(1024),
        })
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        port: 0,
        generator_base_url: "http://127.0.0.1:9".to_string(),
        generator_api_key: None,
        generator_model: "test".to_string(),
        generator_timeout: Duration::from_secs(5),
        judge0_url: "http://127.0.0.1:9/submissions".to_string(),
        judge0_api_key: None,
        sandbox_timeout: Duration::from_secs(5),
        seed_subjects: false,
    }
}

pub struct TestContext {
    pub state: AppState,
    pub generator: Arc<FakeGenerator>,
    pub runner: Arc<EchoRunner>,
    pub subject_id: i64,
    pub module_ids: Vec<i64>,
}

/// In-memory database with one subject of three ungenerated modules.
pub async fn setup() -> TestContext {
    let pool = store::connect_in_memory()
        .await
        .expect("Failed to open in-memory database");

    let subject_id = subjects::insert_subject_if_absent(&pool, "python", "Python Programming", 1)
        .await
        .expect("Failed to insert subject")
        .expect("Subject already existed");

    let mut module_ids = Vec::new();
    for (position, title) in [(1, "Basics"), (2, "Functions"), (3, "Classes")] {
        let id = subjects::insert_module(&pool, subject_id, position, title, title)
            .await
            .expect("Failed to insert module");
        module_ids.push(id);
    }

    let generator = Arc::new(FakeGenerator::default());
    let runner = Arc::new(EchoRunner::default());
    let state = AppState::new(pool, test_config(), generator.clone(), runner.clone());

    TestContext {
        state,
        generator,
        runner,
        subject_id,
        module_ids,
    }
}

/// Spawns the app on a random port. Returns the base URL and the context behind it.
pub async fn spawn_app() -> (String, TestContext) {
    let ctx = setup().await;
    let app = routes::create_router(ctx.state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, ctx)
}

/// Answers the first `correct` questions right and the rest wrong.
pub fn answers(quiz: &Quiz, correct: usize) -> SubmitQuizRequest {
    let answers = quiz
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let chosen = match q {
                Question::Mcq(mcq) if i < correct => mcq.correct_index(),
                Question::Mcq(mcq) => (mcq.correct_index() + 1) % mcq.options().len(),
                Question::Coding(_) => 0,
            };
            SubmittedAnswer {
                question_id: q.id(),
                chosen_index: Some(json!(chosen)),
                submitted_code: None,
            }
        })
        .collect();

    SubmitQuizRequest {
        quiz_id: Some(quiz.id),
        answers,
    }
}
