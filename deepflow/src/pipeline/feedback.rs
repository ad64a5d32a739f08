//! Evaluator feedback loop: a small state machine bounding writer revisions.
//!
//! ```text
//! Drafting --draft--> Evaluating --accept--> Accepted
//!                        |  \--reject, retries < max--> Revising --revise--> Drafting
//!                        \--reject, retries == max--> Exhausted
//! ```
//!
//! `retries` only grows, so at most `max_retries + 1` drafts are ever written.

use serde::Serialize;
use thiserror::Error;

use super::context::{Evaluation, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Drafting,
    Evaluating,
    Accepted,
    Revising,
    Exhausted,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoopState::Accepted | LoopState::Exhausted)
    }
}

/// What to do when retries run out while the evaluator still rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustedPolicy {
    /// Return the last draft with `RunStatus::Exhausted` (and publish it).
    Accept,
    /// Return `PipelineError::Exhausted`; nothing is published.
    #[default]
    Fail,
}

impl std::str::FromStr for ExhaustedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "fail" => Ok(Self::Fail),
            _ => Err(format!("unknown exhausted policy: {} (use accept or fail)", s)),
        }
    }
}

/// An event arrived in a state that does not accept it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid loop transition: {event} while {from:?}")]
pub struct InvalidTransition {
    pub from: LoopState,
    pub event: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackLoop {
    max_retries: u32,
    retries: u32,
    state: LoopState,
    pending: Option<String>,
    history: Vec<String>,
}

impl FeedbackLoop {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retries: 0,
            state: LoopState::Drafting,
            pending: None,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Feedback of every rejection that led to a revision, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Drafting → Evaluating: the writer produced a draft.
    pub fn on_draft(&mut self) -> Result<LoopState, InvalidTransition> {
        self.expect(LoopState::Drafting, "draft")?;
        self.state = LoopState::Evaluating;
        Ok(self.state)
    }

    /// Evaluating → Accepted | Revising | Exhausted.
    pub fn on_evaluation(&mut self, evaluation: &Evaluation) -> Result<LoopState, InvalidTransition> {
        self.expect(LoopState::Evaluating, "evaluation")?;
        self.state = match evaluation.verdict {
            Verdict::Accept => LoopState::Accepted,
            Verdict::Reject if self.retries < self.max_retries => {
                self.pending = Some(evaluation.feedback.clone());
                LoopState::Revising
            }
            Verdict::Reject => LoopState::Exhausted,
        };
        Ok(self.state)
    }

    /// Revising → Drafting: feedback appended, retry counter incremented.
    pub fn revise(&mut self) -> Result<LoopState, InvalidTransition> {
        self.expect(LoopState::Revising, "revise")?;
        if let Some(feedback) = self.pending.take() {
            self.history.push(feedback);
        }
        self.retries += 1;
        self.state = LoopState::Drafting;
        Ok(self.state)
    }

    fn expect(&self, state: LoopState, event: &'static str) -> Result<(), InvalidTransition> {
        if self.state == state {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.state,
                event,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(max_retries: u32, verdicts: &[Verdict]) -> (FeedbackLoop, u32) {
        let mut fb = FeedbackLoop::new(max_retries);
        let mut drafts = 0;
        let mut verdicts = verdicts.iter().cycle();
        while !fb.state().is_terminal() {
            fb.on_draft().unwrap();
            drafts += 1;
            let verdict = *verdicts.next().unwrap_or(&Verdict::Reject);
            let eval = Evaluation {
                verdict,
                feedback: format!("feedback {}", drafts),
            };
            if fb.on_evaluation(&eval).unwrap() == LoopState::Revising {
                fb.revise().unwrap();
            }
        }
        (fb, drafts)
    }

    #[test]
    fn accept_on_first_pass() {
        let (fb, drafts) = drive(3, &[Verdict::Accept]);
        assert_eq!(fb.state(), LoopState::Accepted);
        assert_eq!(drafts, 1);
        assert_eq!(fb.retries(), 0);
    }

    /// **Scenario**: max_retries = 0 means the first rejection is terminal.
    #[test]
    fn zero_retries_exhausts_on_first_reject() {
        let (fb, drafts) = drive(0, &[Verdict::Reject]);
        assert_eq!(fb.state(), LoopState::Exhausted);
        assert_eq!(drafts, 1);
        assert!(fb.history().is_empty());
    }

    #[test]
    fn reject_then_accept_records_feedback() {
        let (fb, drafts) = drive(2, &[Verdict::Reject, Verdict::Accept]);
        assert_eq!(fb.state(), LoopState::Accepted);
        assert_eq!(drafts, 2);
        assert_eq!(fb.history(), &["feedback 1".to_string()]);
    }

    #[test]
    fn always_reject_stops_after_max_retries_plus_one() {
        for max in 0..6 {
            let (fb, drafts) = drive(max, &[Verdict::Reject]);
            assert_eq!(fb.state(), LoopState::Exhausted);
            assert_eq!(drafts, max + 1);
            assert_eq!(fb.retries(), max);
        }
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let mut fb = FeedbackLoop::new(1);
        assert!(fb.revise().is_err());
        assert!(fb.on_evaluation(&Evaluation::accept("ok")).is_err());
        fb.on_draft().unwrap();
        let err = fb.on_draft().unwrap_err();
        assert_eq!(err.from, LoopState::Evaluating);
    }

    #[test]
    fn exhausted_policy_parses() {
        assert_eq!("Accept".parse::<ExhaustedPolicy>(), Ok(ExhaustedPolicy::Accept));
        assert_eq!("fail".parse::<ExhaustedPolicy>(), Ok(ExhaustedPolicy::Fail));
        assert!("maybe".parse::<ExhaustedPolicy>().is_err());
        assert_eq!(ExhaustedPolicy::default(), ExhaustedPolicy::Fail);
    }
}
