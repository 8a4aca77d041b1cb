// src/services/grader.rs

use std::{collections::HashSet, sync::Arc, time::Duration};

use futures::future::join_all;
use serde_json::Value;

use crate::{
    clients::{
        generator::FailedCase,
        sandbox::{CodeRunner, SandboxError},
    },
    config::{MASTERY_THRESHOLD, QUESTION_WEIGHT},
    models::{
        attempt::{AnswerRecord, SubmittedAnswer, TestCaseResult},
        quiz::{CodingQuestion, Language, McqQuestion, Question, Quiz, TestCase},
    },
    services::generation::Generation,
};

/// Graded submission, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub answer_records: Vec<AnswerRecord>,
    pub aggregate_score: i64,
    pub passed: bool,
}

#[derive(Clone)]
pub struct MasteryGrader {
    runner: Arc<dyn CodeRunner>,
    generation: Generation,
    sandbox_timeout: Duration,
}

impl MasteryGrader {
    pub fn new(runner: Arc<dyn CodeRunner>, generation: Generation, sandbox_timeout: Duration) -> Self {
        Self {
            runner,
            generation,
            sandbox_timeout,
        }
    }

    /// Scores answers against a quiz.
    ///
    /// Answers to unknown questions are ignored and only the first answer per
    /// question counts. Coding questions are graded concurrently, records keep
    /// submission order.
    pub async fn grade_submission(&self, quiz: &Quiz, answers: &[SubmittedAnswer]) -> Grade {
        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(answers.len());
        for answer in answers {
            let Some(question) = quiz.question(answer.question_id) else {
                continue;
            };
            if seen.insert(answer.question_id) {
                pending.push(self.grade_answer(question, answer));
            }
        }

        let answer_records = join_all(pending).await;
        let earned: i64 = answer_records.iter().map(|r| r.score).sum();
        let aggregate_score = aggregate_score(earned, quiz.questions.len());

        Grade {
            answer_records,
            aggregate_score,
            passed: is_mastered(aggregate_score),
        }
    }

    async fn grade_answer(&self, question: &Question, answer: &SubmittedAnswer) -> AnswerRecord {
        match question {
            Question::Mcq(q) => grade_mcq(q, answer),
            Question::Coding(q) => self.grade_coding(q, answer).await,
        }
    }

    async fn grade_coding(&self, question: &CodingQuestion, answer: &SubmittedAnswer) -> AnswerRecord {
        let Some(code) = answer.submitted_code.as_deref() else {
            return AnswerRecord {
                question_id: question.id(),
                chosen_index: None,
                submitted_code: None,
                correct: false,
                score: 0,
                test_case_results: vec![],
                generated_hint: None,
            };
        };

        // Cases of one question run strictly in order.
        let mut results = Vec::with_capacity(question.test_cases().len());
        for case in question.test_cases() {
            results.push(self.run_case(question.language(), code, case).await);
        }

        if results.iter().all(|r| r.error.is_some()) {
            tracing::warn!(
                question_id = %question.id(),
                "Sandbox failed on every test case; scoring question as 0"
            );
        }

        let passed = results.iter().filter(|r| r.passed).count();
        let score = partial_score(passed, results.len());
        let correct = passed == results.len();

        let generated_hint = match results.iter().find(|r| !r.passed) {
            Some(failing) => {
                let failed_case = FailedCase {
                    input: failing.input.clone(),
                    expected_output: failing.expected_output.clone(),
                    actual_output: failing.actual_output.clone(),
                };
                let hint = self
                    .generation
                    .hint(
                        question.problem_statement(),
                        code,
                        &failed_case,
                        question.language(),
                    )
                    .await;
                Some(hint)
            }
            None => None,
        };

        AnswerRecord {
            question_id: question.id(),
            chosen_index: None,
            submitted_code: Some(code.to_string()),
            correct,
            score,
            test_case_results: results,
            generated_hint,
        }
    }

    async fn run_case(&self, language: Language, code: &str, case: &TestCase) -> TestCaseResult {
        let outcome = tokio::time::timeout(
            self.sandbox_timeout,
            self.runner.run(language, code, &case.input),
        )
        .await
        .unwrap_or(Err(SandboxError::Timeout(self.sandbox_timeout)));

        match outcome {
            Ok(result) => {
                let stdout = result.stdout.as_deref().unwrap_or_default().trim();
                let passed = result.accepted() && stdout == case.expected_output.trim();
                let actual_output = if result.accepted() {
                    stdout.to_string()
                } else {
                    result.combined_output()
                };
                TestCaseResult {
                    passed,
                    input: case.input.clone(),
                    expected_output: case.expected_output.clone(),
                    actual_output,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("Test case execution failed: {}", e);
                TestCaseResult {
                    passed: false,
                    input: case.input.clone(),
                    expected_output: case.expected_output.clone(),
                    actual_output: String::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

fn grade_mcq(question: &McqQuestion, answer: &SubmittedAnswer) -> AnswerRecord {
    let chosen_index = answer.chosen_index.as_ref().and_then(coerce_index);
    let correct = chosen_index == Some(question.correct_index() as i64);

    AnswerRecord {
        question_id: question.id(),
        chosen_index,
        submitted_code: None,
        correct,
        score: if correct { QUESTION_WEIGHT } else { 0 },
        test_case_results: vec![],
        generated_hint: None,
    }
}

/// Accepts an integer or a string holding one, e.g. `2` or `"2"`.
pub fn coerce_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Weighted share of passing test cases, rounded.
pub fn partial_score(passed: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    (QUESTION_WEIGHT as f64 * passed as f64 / total as f64).round() as i64
}

/// Percentage of the quiz's total weight earned. Unanswered questions count as 0.
pub fn aggregate_score(earned: i64, question_count: usize) -> i64 {
    if question_count == 0 {
        return 0;
    }
    let possible = question_count as i64 * QUESTION_WEIGHT;
    (100.0 * earned as f64 / possible as f64).round() as i64
}

pub fn is_mastered(aggregate_score: i64) -> bool {
    aggregate_score >= MASTERY_THRESHOLD
}
