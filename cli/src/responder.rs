//! Clarifying questions answered interactively on stdin.

use async_trait::async_trait;
use deepflow::pipeline::stages::ClarificationResponder;
use deepflow::pipeline::{StageError, StageErrorCause};
use deepflow::Query;
use tokio::io::{AsyncBufReadExt, BufReader};

const NO_PREFERENCE: &str = "No preference.";

/// Prints each question to stderr and reads one answer line from stdin.
/// An empty line or end of input means "no preference".
pub struct StdinResponder;

#[async_trait]
impl ClarificationResponder for StdinResponder {
    async fn answer(&self, query: &Query, questions: &[String]) -> Result<Vec<String>, StageError> {
        eprintln!("Before researching \"{}\", a few questions (Enter to skip):", query);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut answers = Vec::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            eprint!("  {}. {}\n  > ", i + 1, question);
            let line = lines.next_line().await.map_err(|e| {
                StageError::new("clarifier", StageErrorCause::Internal(format!("reading stdin: {e}")))
            })?;
            answers.push(normalize(line));
        }
        Ok(answers)
    }
}

fn normalize(line: Option<String>) -> String {
    match line.as_deref().map(str::trim) {
        Some(answer) if !answer.is_empty() => answer.to_string(),
        _ => NO_PREFERENCE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_or_missing_lines_mean_no_preference() {
        assert_eq!(normalize(Some("  US only ".into())), "US only");
        assert_eq!(normalize(Some("   ".into())), NO_PREFERENCE);
        assert_eq!(normalize(None), NO_PREFERENCE);
    }
}
