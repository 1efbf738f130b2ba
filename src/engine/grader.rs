// src/engine/grader.rs

use serde::Serialize;

use crate::models::quiz::{Quiz, QuizQuestion};

/// Result of grading one quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizGrade {
    pub correct_count: usize,
    pub total_questions: usize,
    /// Unrounded percentage in `0.0..=100.0`.
    pub score_percent: f64,
    pub passed: bool,
}

impl QuizGrade {
    /// Score rounded to one decimal for display.
    pub fn score_display(&self) -> f64 {
        (self.score_percent * 10.0).round() / 10.0
    }
}

/// Grades `answers` against the quiz's answer key.
pub fn grade(quiz: &Quiz, answers: &[Option<usize>]) -> QuizGrade {
    grade_questions(&quiz.questions, quiz.passing_score, answers)
}

/// Scores submitted option indices position by position.
///
/// A missing position or `None` is unanswered and never matches. Answers past
/// the last question are ignored. An empty question list scores 0 and fails.
pub fn grade_questions(
    questions: &[QuizQuestion],
    passing_score: f64,
    answers: &[Option<usize>],
) -> QuizGrade {
    let total_questions = questions.len();

    if total_questions == 0 {
        return QuizGrade {
            correct_count: 0,
            total_questions: 0,
            score_percent: 0.0,
            passed: false,
        };
    }

    let correct_count = questions
        .iter()
        .enumerate()
        .filter(|(i, q)| answers.get(*i).copied().flatten() == Some(q.correct_option))
        .count();

    let score_percent = (correct_count as f64 / total_questions as f64) * 100.0;

    QuizGrade {
        correct_count,
        total_questions,
        score_percent,
        passed: score_percent >= passing_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(keys: &[usize]) -> Vec<QuizQuestion> {
        keys.iter()
            .map(|&k| QuizQuestion {
                prompt: "Q".to_string(),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_option: k,
                explanation: None,
            })
            .collect()
    }

    #[test]
    fn test_grade_perfect() {
        let grade = grade_questions(&keyed(&[1, 0]), 100.0, &[Some(1), Some(0)]);
        assert_eq!(grade.correct_count, 2);
        assert_eq!(grade.score_percent, 100.0);
        assert!(grade.passed);
    }

    #[test]
    fn test_grade_half() {
        let grade = grade_questions(&keyed(&[1, 0]), 60.0, &[Some(0), Some(0)]);
        assert_eq!(grade.correct_count, 1);
        assert_eq!(grade.score_percent, 50.0);
        assert!(!grade.passed);
    }

    #[test]
    fn test_grade_pass_threshold_is_inclusive() {
        // 5 questions. Need 3 correct for 60%.
        let questions = keyed(&[0, 0, 0, 0, 0]);
        let answers = [Some(0), Some(0), Some(0), Some(1), Some(1)];
        let grade = grade_questions(&questions, 60.0, &answers);
        assert_eq!(grade.correct_count, 3);
        assert_eq!(grade.score_percent, 60.0);
        assert!(grade.passed);
    }

    #[test]
    fn test_grade_zero_questions() {
        let grade = grade_questions(&[], 0.0, &[Some(0)]);
        assert_eq!(grade.score_percent, 0.0);
        assert!(!grade.passed);
    }

    #[test]
    fn test_grade_short_and_long_answer_lists() {
        let questions = keyed(&[2, 3, 1]);

        let short = grade_questions(&questions, 50.0, &[Some(2)]);
        assert_eq!(short.correct_count, 1);

        let long = grade_questions(&questions, 50.0, &[Some(2), Some(3), Some(1), Some(0), Some(9)]);
        assert_eq!(long.correct_count, 3);
        assert_eq!(long.total_questions, 3);
    }

    #[test]
    fn test_grade_unanswered_and_out_of_range_never_match() {
        let grade = grade_questions(&keyed(&[0, 1]), 50.0, &[None, Some(42)]);
        assert_eq!(grade.correct_count, 0);
        assert_eq!(grade.score_percent, 0.0);
    }

    #[test]
    fn test_grade_is_rerunnable() {
        let questions = keyed(&[1, 2, 3]);
        let answers = [Some(1), None, Some(3)];
        let first = grade_questions(&questions, 50.0, &answers);
        let second = grade_questions(&questions, 50.0, &answers);
        assert_eq!(first, second);
        assert_eq!(first.score_display(), 66.7);
    }
}
