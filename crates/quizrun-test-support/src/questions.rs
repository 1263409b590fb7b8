//! Question fixtures.

use quizrun_quiz::domain::question::{AnswerOption, Question};

/// A question with options `paris`, `lyon` and `marseille`.
#[must_use]
pub fn question(id: &str, prompt: &str, correct_answer_id: &str, time_limit_ms: u64) -> Question {
    Question {
        id: id.to_owned(),
        prompt: prompt.to_owned(),
        options: vec![
            AnswerOption::new("paris", "Paris"),
            AnswerOption::new("lyon", "Lyon"),
            AnswerOption::new("marseille", "Marseille"),
        ],
        correct_answer_id: correct_answer_id.to_owned(),
        time_limit_ms,
        explanation: None,
        prompt_image_url: None,
        explanation_image_url: None,
    }
}

/// "What is the capital of France?", answered by `paris`, 5 s to answer.
#[must_use]
pub fn capital_question() -> Question {
    let mut capital = question("q1", "What is the capital of France?", "paris", 5000);
    capital.explanation = Some("Paris has been the capital since 987.".to_owned());
    capital
}

/// A question whose prompt is blank, which sessions pass over.
#[must_use]
pub fn blank_question(id: &str) -> Question {
    question(id, "   ", "paris", 5000)
}
