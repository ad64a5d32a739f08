//! Output: progress events on stderr, the report (or JSON) on stdout.

use deepflow::{PipelineError, PipelineEvent, PipelineOutcome, RunStatus};

pub fn event_line(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::StageStart { stage } => format!("→ {stage}"),
        PipelineEvent::StageEnd { stage, ok: true } => format!("✓ {stage}"),
        PipelineEvent::StageEnd { stage, ok: false } => format!("✗ {stage}"),
        PipelineEvent::SubTaskFinished { index, ok } => {
            format!("  search #{} {}", index + 1, if *ok { "done" } else { "failed" })
        }
        PipelineEvent::Evaluated { attempt, verdict } => {
            format!("  draft {attempt}: {verdict:?}").to_lowercase()
        }
        PipelineEvent::Delivered { location } => format!("  delivered to {location}"),
    }
}

pub fn print_outcome(outcome: &PipelineOutcome, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    if outcome.status == RunStatus::Exhausted {
        eprintln!(
            "warning: the reviewer did not accept the report after {} drafts; showing the last one",
            outcome.attempts
        );
    }
    println!("{}", outcome.draft.to_markdown());
    Ok(())
}

/// Explains a failed run on stderr. An exhausted run's last draft goes to
/// stdout so the work is not lost.
pub fn print_error(err: &PipelineError) {
    eprintln!("error: {err}");
    if let PipelineError::Exhausted { feedback, draft, .. } = err {
        for (i, f) in feedback.iter().enumerate() {
            eprintln!("  review {}: {}", i + 1, f);
        }
        println!("{}", draft.to_markdown());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepflow::Verdict;

    #[test]
    fn event_lines_are_short() {
        assert_eq!(
            event_line(&PipelineEvent::StageStart {
                stage: "planner".into()
            }),
            "→ planner"
        );
        assert_eq!(
            event_line(&PipelineEvent::SubTaskFinished { index: 0, ok: false }),
            "  search #1 failed"
        );
        assert_eq!(
            event_line(&PipelineEvent::Evaluated {
                attempt: 2,
                verdict: Verdict::Accept
            }),
            "  draft 2: accept"
        );
    }
}
