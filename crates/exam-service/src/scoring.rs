//! Answer scoring with negative marking

use storage::Question;

/// Score a set of responses.
///
/// Each question is worth `marks / questions`. A correct answer adds that
/// share; a wrong answer subtracts `negative_percent` percent of it. Skipped
/// and blank answers score zero. Missing trailing responses count as skipped.
pub fn score(questions: &[Question], responses: &[Option<String>], marks: u32, negative_percent: u32) -> f64 {
    if questions.is_empty() {
        return 0.0;
    }
    let per_question = f64::from(marks) / questions.len() as f64;
    let penalty = f64::from(negative_percent) * per_question / 100.0;

    questions
        .iter()
        .enumerate()
        .map(|(i, question)| match responses.get(i).and_then(|r| r.as_deref()) {
            None | Some("") => 0.0,
            Some(answer) if answer == question.answer => per_question,
            Some(_) => -penalty,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(answers: &[&str]) -> Vec<Question> {
        answers
            .iter()
            .enumerate()
            .map(|(index, answer)| Question {
                index,
                prompt: format!("Q{}", index),
                options: [
                    answer.to_string(),
                    "x".to_string(),
                    "y".to_string(),
                    "z".to_string(),
                ],
                answer: answer.to_string(),
            })
            .collect()
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_all_correct() {
        let qs = questions(&["a", "b", "c", "d"]);
        let responses = vec![some("a"), some("b"), some("c"), some("d")];
        assert!((score(&qs, &responses, 20, 25) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_marking() {
        // 4 questions of 5 marks; wrong costs 25% of 5
        let qs = questions(&["a", "b", "c", "d"]);
        let responses = vec![some("a"), some("x"), None, some("")];
        assert!((score(&qs, &responses, 20, 25) - (5.0 - 1.25)).abs() < 1e-9);
    }

    #[test]
    fn test_score_can_go_negative() {
        let qs = questions(&["a", "b"]);
        let responses = vec![some("x"), some("y")];
        assert!((score(&qs, &responses, 10, 100) + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_response_list() {
        let qs = questions(&["a", "b", "c"]);
        assert!((score(&qs, &[some("a")], 9, 50) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_questions() {
        assert_eq!(score(&[], &[some("a")], 10, 0), 0.0);
    }
}
