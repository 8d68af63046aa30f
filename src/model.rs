// ============================================
// src/model.rs
// クイズと問題のデータ構造
// ============================================

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 1問分のデータ
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(alias = "Statement")]
    pub statement: String,
    /// 選択肢 (普通は4つ。強制はしない)
    #[serde(alias = "Answers", default)]
    pub answers: Vec<String>,
    #[serde(alias = "CorrectAnswer", default)]
    pub correct_answer: String,
}

impl Question {
    pub fn new(
        statement: impl Into<String>,
        answers: impl IntoIterator<Item = impl Into<String>>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            statement: statement.into(),
            answers: answers.into_iter().map(Into::into).collect(),
            correct_answer: correct_answer.into(),
        }
    }

    /// 大文字小文字を無視して正解と比べる。正解が空なら常に不正解
    pub fn is_correct(&self, answer: &str) -> bool {
        !self.correct_answer.is_empty() && answer.to_lowercase() == self.correct_answer.to_lowercase()
    }

    /// 正解が選択肢のどれかに一致しているか
    pub fn has_matching_answer(&self) -> bool {
        self.answers.iter().any(|a| self.is_correct(a))
    }
}

/// カテゴリ名 (= 保存キー) と問題リスト
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(alias = "Category")]
    pub category: String,
    #[serde(alias = "Questions", default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(category: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            category: category.into(),
            questions,
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// 保存してよいか (カテゴリが空でなく、1問以上ある)
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if self.questions.is_empty() {
            return Err(ValidationError::NoQuestions);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whale() -> Question {
        Question::new(
            "Largest mammal?",
            ["Elephant", "Blue Whale", "Giraffe", "Lion"],
            "Blue Whale",
        )
    }

    #[test]
    fn answers_compare_case_insensitively() {
        let q = whale();
        assert!(q.is_correct("blue whale"));
        assert!(q.is_correct("BLUE WHALE"));
        assert!(!q.is_correct("Elephant"));
        assert!(q.has_matching_answer());
    }

    #[test]
    fn empty_correct_answer_never_matches() {
        let q = Question::new("?", ["", "a"], "");
        assert!(!q.is_correct(""));
        assert!(!q.has_matching_answer());
    }

    #[test]
    fn validate_requires_category_and_questions() {
        assert_eq!(
            Quiz::new("  ", vec![whale()]).validate(),
            Err(ValidationError::EmptyCategory)
        );
        assert_eq!(
            Quiz::new("Animals", vec![]).validate(),
            Err(ValidationError::NoQuestions)
        );
        assert!(Quiz::new("Animals", vec![whale()]).validate().is_ok());
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let json = serde_json::to_value(Quiz::new("Animals", vec![whale()])).unwrap();
        assert_eq!(json["category"], "Animals");
        assert_eq!(json["questions"][0]["correctAnswer"], "Blue Whale");
        assert_eq!(json["questions"][0]["answers"][1], "Blue Whale");
    }

    #[test]
    fn pascal_case_documents_still_load() {
        let raw = r#"{
            "Category": "Animals",
            "Questions": [
                { "Statement": "Largest mammal?", "Answers": ["Lion", "Blue Whale"], "CorrectAnswer": "Blue Whale" }
            ]
        }"#;
        let quiz: Quiz = serde_json::from_str(raw).unwrap();
        assert_eq!(quiz.category, "Animals");
        assert_eq!(quiz.questions[0].correct_answer, "Blue Whale");
    }
}
