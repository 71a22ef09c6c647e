//! Question sheet parsing
//!
//! A sheet is CSV with a header row, then one question per row:
//! `prompt, option 1, option 2, option 3, option 4, answer`.

use csv::{ReaderBuilder, Trim};
use storage::Question;

use crate::ServiceError;

const COLUMNS: usize = 6;

/// Parse a question sheet. The answer must be one of the row's options.
pub fn parse_questions(sheet: &str) -> Result<Vec<Question>, ServiceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(sheet.as_bytes());

    let mut questions = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| ServiceError::Validation(format!("Invalid question sheet: {}", e)))?;
        // header is line 1
        let line = index + 2;
        if row.len() != COLUMNS {
            return Err(ServiceError::Validation(format!(
                "Question on line {} has {} columns, expected {}",
                line,
                row.len(),
                COLUMNS
            )));
        }

        let field = |i: usize| row.get(i).unwrap_or_default().to_string();
        let prompt = field(0);
        let options = [field(1), field(2), field(3), field(4)];
        let answer = field(5);

        if prompt.is_empty() {
            return Err(ServiceError::Validation(format!("Question on line {} has no prompt", line)));
        }
        if !options.contains(&answer) {
            return Err(ServiceError::Validation(format!(
                "Answer on line {} is not one of the options",
                line
            )));
        }

        questions.push(Question {
            index,
            prompt,
            options,
            answer,
        });
    }

    if questions.is_empty() {
        return Err(ServiceError::Validation("Question sheet has no questions".to_string()));
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
question,a,b,c,d,answer
What is 2+2?,3,4,5,22,4
Borrow checker lives in?,rustc,cargo,rustup,clippy,rustc
";

    #[test]
    fn test_header_skipped_and_indexed() {
        let questions = parse_questions(SHEET).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].index, 0);
        assert_eq!(questions[0].prompt, "What is 2+2?");
        assert_eq!(questions[0].answer, "4");
        assert_eq!(questions[1].index, 1);
        assert_eq!(questions[1].options[3], "clippy");
    }

    #[test]
    fn test_quoted_fields_and_whitespace() {
        let sheet = "q,a,b,c,d,ans\n\"Pick one, any one\", x , y,z,w,y\n";
        let questions = parse_questions(sheet).unwrap();
        assert_eq!(questions[0].prompt, "Pick one, any one");
        assert_eq!(questions[0].options[0], "x");
        assert_eq!(questions[0].answer, "y");
    }

    #[test]
    fn test_wrong_column_count_rejected() {
        let err = parse_questions("q,a,b,c,d,ans\nShort row,1,2\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_answer_must_be_an_option() {
        let err = parse_questions("q,a,b,c,d,ans\nWhich?,1,2,3,4,5\n").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(parse_questions("q,a,b,c,d,ans\n").is_err());
    }
}
