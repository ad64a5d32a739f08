//! Rendering of context pieces into the text handed to model stages.

use super::context::{Clarification, Draft, Evaluation, Plan, SubTaskOutcome, SubTaskResult};

pub fn render_clarification(clarification: Option<&Clarification>) -> String {
    match clarification {
        Some(c) if !c.is_empty() => c
            .items
            .iter()
            .enumerate()
            .map(|(i, qa)| format!("Q{}: {}\nA{}: {}", i + 1, qa.question, i + 1, qa.answer))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "(no clarification)".to_string(),
    }
}

pub fn render_plan(plan: &Plan) -> String {
    plan.items()
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {} (why: {})", i + 1, t.directive, t.rationale))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Research notes in plan order. Failed sub-tasks appear as explicit gaps so the
/// writer can acknowledge missing coverage.
pub fn render_research_notes(results: &[SubTaskResult]) -> String {
    let mut sorted: Vec<&SubTaskResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.index);
    let mut out = String::new();
    for r in sorted {
        out.push_str(&format!("### [{}] {}\n", r.index + 1, r.directive));
        match &r.outcome {
            SubTaskOutcome::Completed { summary, sources } => {
                out.push_str(summary.trim());
                out.push('\n');
                if !sources.is_empty() {
                    out.push_str("Sources:\n");
                    for s in sources {
                        out.push_str(&format!("- {}\n", s));
                    }
                }
            }
            SubTaskOutcome::Failed { error } => {
                out.push_str(&format!("GAP: no results ({}).\n", error));
            }
        }
        out.push('\n');
    }
    out
}

pub fn render_draft(draft: &Draft) -> String {
    let follow_ups = if draft.follow_up_questions.is_empty() {
        "(none)".to_string()
    } else {
        draft
            .follow_up_questions
            .iter()
            .map(|q| format!("- {}", q))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "Summary: {}\n\n{}\n\nFollow-up questions:\n{}",
        draft.short_summary, draft.markdown_report, follow_ups
    )
}

/// Earlier rejections, oldest first, for a revision prompt.
pub fn render_feedback(history: &[String], latest: Option<&Evaluation>) -> Option<String> {
    if history.is_empty() {
        return None;
    }
    let mut out = history
        .iter()
        .enumerate()
        .map(|(i, f)| format!("Round {}: {}", i + 1, f))
        .collect::<Vec<_>>()
        .join("\n");
    if let Some(e) = latest.filter(|e| !e.is_accepted()) {
        if history.last() != Some(&e.feedback) {
            out.push_str(&format!("\nLatest: {}", e.feedback));
        }
    }
    Some(out)
}
