// src/models/quiz.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;

/// Languages the sandbox can run. Deserializes through `FromStr`, so aliases
/// such as `C++` or `python3` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Language {
    Cpp,
    Java,
    Python,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
        }
    }

    /// Judge0 language id (C++ GCC 9.2.0, OpenJDK 13.0.1, Python 3.8.1).
    pub fn judge0_id(self) -> u32 {
        match self {
            Language::Cpp => 54,
            Language::Java => 62,
            Language::Python => 71,
        }
    }

    /// Programming-language context implied by a subject key, if any.
    pub fn from_subject_key(key: &str) -> Option<Self> {
        key.parse().ok()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpp" | "c++" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            "python" | "python3" => Ok(Language::Python),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}

impl TryFrom<String> for Language {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Reasons a question cannot be constructed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyText,

    #[error("multiple-choice questions need 3 or 4 options, got {0}")]
    OptionCount(usize),

    #[error("correct_index {index} is out of range for {len} options")]
    CorrectIndex { index: i64, len: usize },

    #[error("coding question has an empty problem statement")]
    EmptyProblemStatement,

    #[error("coding question has no test cases")]
    NoTestCases,
}

/// A quiz question. The `type` field is the discriminant on the wire and in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    Mcq(McqQuestion),
    Coding(CodingQuestion),
}

impl Question {
    pub fn id(&self) -> Uuid {
        match self {
            Question::Mcq(q) => q.id,
            Question::Coding(q) => q.id,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Question::Mcq(q) => &q.text,
            Question::Coding(q) => &q.text,
        }
    }
}

/// Multiple-choice question. Only constructible with 3–4 options and a valid answer index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "McqDraft")]
pub struct McqQuestion {
    id: Uuid,
    text: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct McqDraft {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    text: String,
    options: Vec<String>,
    correct_index: i64,
    #[serde(default)]
    explanation: Option<String>,
}

impl TryFrom<McqDraft> for McqQuestion {
    type Error = QuestionError;

    fn try_from(draft: McqDraft) -> Result<Self, Self::Error> {
        if draft.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let len = draft.options.len();
        if !(3..=4).contains(&len) {
            return Err(QuestionError::OptionCount(len));
        }
        let correct_index = usize::try_from(draft.correct_index)
            .ok()
            .filter(|i| *i < len)
            .ok_or(QuestionError::CorrectIndex {
                index: draft.correct_index,
                len,
            })?;

        Ok(Self {
            id: draft.id,
            text: draft.text,
            options: draft.options,
            correct_index,
            explanation: draft.explanation,
        })
    }
}

impl McqQuestion {
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_index: i64,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        McqDraft {
            id: Uuid::new_v4(),
            text: text.into(),
            options,
            correct_index,
            explanation,
        }
        .try_into()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
}

/// Coding question graded by running the submission against every test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CodingDraft")]
pub struct CodingQuestion {
    id: Uuid,
    text: String,
    problem_statement: String,
    language: Language,
    starter_code: String,
    test_cases: Vec<TestCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CodingDraft {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    text: String,
    problem_statement: String,
    language: Language,
    #[serde(default)]
    starter_code: String,
    test_cases: Vec<TestCase>,
    #[serde(default)]
    explanation: Option<String>,
}

impl TryFrom<CodingDraft> for CodingQuestion {
    type Error = QuestionError;

    fn try_from(draft: CodingDraft) -> Result<Self, Self::Error> {
        if draft.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if draft.problem_statement.trim().is_empty() {
            return Err(QuestionError::EmptyProblemStatement);
        }
        if draft.test_cases.is_empty() {
            return Err(QuestionError::NoTestCases);
        }

        Ok(Self {
            id: draft.id,
            text: draft.text,
            problem_statement: draft.problem_statement,
            language: draft.language,
            starter_code: draft.starter_code,
            test_cases: draft.test_cases,
            explanation: draft.explanation,
        })
    }
}

impl CodingQuestion {
    pub fn new(
        text: impl Into<String>,
        problem_statement: impl Into<String>,
        language: Language,
        starter_code: impl Into<String>,
        test_cases: Vec<TestCase>,
    ) -> Result<Self, QuestionError> {
        CodingDraft {
            id: Uuid::new_v4(),
            text: text.into(),
            problem_statement: problem_statement.into(),
            language,
            starter_code: starter_code.into(),
            test_cases,
            explanation: None,
        }
        .try_into()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn problem_statement(&self) -> &str {
        &self.problem_statement
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn starter_code(&self) -> &str {
        &self.starter_code
    }

    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }
}

/// Represents the 'quizzes' table in the database.
/// A quiz belongs to one module but may be a student's override quiz
/// rather than the module's master quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub module_id: i64,
    pub questions: Json<Vec<Question>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Quiz {
    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }
}

/// DTO for sending a quiz to a student (no answer keys, no hidden tests).
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub module_id: i64,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PublicQuestion {
    Mcq {
        id: Uuid,
        text: String,
        options: Vec<String>,
    },
    Coding {
        id: Uuid,
        text: String,
        problem_statement: String,
        language: Language,
        starter_code: String,
    },
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        let questions = quiz
            .questions
            .iter()
            .map(|q| match q {
                Question::Mcq(q) => PublicQuestion::Mcq {
                    id: q.id,
                    text: q.text.clone(),
                    options: q.options.clone(),
                },
                Question::Coding(q) => PublicQuestion::Coding {
                    id: q.id,
                    text: q.text.clone(),
                    problem_statement: q.problem_statement.clone(),
                    language: q.language,
                    starter_code: q.starter_code.clone(),
                },
            })
            .collect();

        Self {
            id: quiz.id,
            module_id: quiz.module_id,
            questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mcq_requires_valid_index() {
        let opts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(McqQuestion::new("Q", opts.clone(), 2, None).is_ok());
        assert_eq!(
            McqQuestion::new("Q", opts.clone(), 3, None),
            Err(QuestionError::CorrectIndex { index: 3, len: 3 })
        );
        assert_eq!(
            McqQuestion::new("Q", opts, -1, None),
            Err(QuestionError::CorrectIndex { index: -1, len: 3 })
        );
    }

    #[test]
    fn test_mcq_option_count_bounds() {
        let two = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            McqQuestion::new("Q", two, 0, None),
            Err(QuestionError::OptionCount(2))
        );
        let five: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        assert_eq!(
            McqQuestion::new("Q", five, 0, None),
            Err(QuestionError::OptionCount(5))
        );
    }

    #[test]
    fn test_coding_requires_test_cases() {
        let result = CodingQuestion::new("Sum", "Add two ints", Language::Cpp, "", vec![]);
        assert_eq!(result, Err(QuestionError::NoTestCases));
    }

    #[test]
    fn test_deserialize_generated_question_assigns_id() {
        let q: Question = serde_json::from_value(json!({
            "type": "mcq",
            "text": "What does & return?",
            "options": ["value", "address", "size"],
            "correct_index": 1
        }))
        .unwrap();
        assert!(!q.id().is_nil());
        assert_eq!(q.text(), "What does & return?");
    }

    #[test]
    fn test_deserialize_rejects_invalid_and_unknown_types() {
        let bad_index = serde_json::from_value::<Question>(json!({
            "type": "mcq",
            "text": "Q",
            "options": ["a", "b", "c"],
            "correct_index": 7
        }));
        assert!(bad_index.is_err());

        let unknown = serde_json::from_value::<Question>(json!({
            "type": "essay",
            "text": "Discuss."
        }));
        assert!(unknown.is_err());

        let bad_language = serde_json::from_value::<Question>(json!({
            "type": "coding",
            "text": "Echo",
            "problem_statement": "Print input",
            "language": "cobol",
            "test_cases": [{ "input": "1", "expected_output": "1" }]
        }));
        assert!(bad_language.is_err());
    }

    #[test]
    fn test_language_accepts_aliases_and_stores_lowercase() {
        let language: Language = serde_json::from_value(json!("C++")).unwrap();
        assert_eq!(language, Language::Cpp);
        let language: Language = serde_json::from_value(json!("Python")).unwrap();
        assert_eq!(language, Language::Python);
        assert_eq!(serde_json::to_value(language).unwrap(), json!("python"));
    }

    #[test]
    fn test_stored_question_keeps_id() {
        let q = Question::Coding(
            CodingQuestion::new(
                "Echo",
                "Print the input",
                Language::Python,
                "print(input())",
                vec![TestCase {
                    input: "hi".to_string(),
                    expected_output: "hi".to_string(),
                }],
            )
            .unwrap(),
        );
        let stored = serde_json::to_value(&q).unwrap();
        assert_eq!(stored["type"], "coding");
        let loaded: Question = serde_json::from_value(stored).unwrap();
        assert_eq!(loaded, q);
    }

    #[test]
    fn test_public_quiz_hides_answers() {
        let quiz = Quiz {
            id: 1,
            module_id: 2,
            questions: Json(vec![Question::Mcq(
                McqQuestion::new(
                    "Q",
                    vec!["a".into(), "b".into(), "c".into()],
                    0,
                    Some("because".into()),
                )
                .unwrap(),
            )]),
            created_at: chrono::Utc::now(),
        };
        let public = serde_json::to_value(PublicQuiz::from(&quiz)).unwrap();
        let first = &public["questions"][0];
        assert_eq!(first["type"], "mcq");
        assert!(first.get("correct_index").is_none());
        assert!(first.get("explanation").is_none());
    }

    #[test]
    fn test_language_from_subject_key() {
        assert_eq!(Language::from_subject_key("cpp"), Some(Language::Cpp));
        assert_eq!(Language::from_subject_key("python"), Some(Language::Python));
        assert_eq!(Language::from_subject_key("dbms"), None);
    }
}
