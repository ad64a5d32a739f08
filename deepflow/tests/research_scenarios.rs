//! End-to-end runs with scripted models and tools: the remote work / urban
//! housing scenarios, exhausted policies, cancellation and early failures.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{draft_reply, plan_reply, search_source, verdict_reply, Doubles};
use deepflow::pipeline::stages::{
    LlmClarifier, LlmPlanner, LlmWriter, SkipClarification, StaticAnswers, ToolExecutor,
};
use deepflow::tools::TOOL_WEB_SEARCH;
use deepflow::{
    run_pipeline, ConfigError, Destination, ExhaustedPolicy, FilePublisher, MockLlm,
    MockToolSource, PipelineConfig, PipelineContext, PipelineError, PipelineEvent, PipelineStages, RunStatus,
    Stage, StageError, StageKind, StageOutput, ToolSourceError, Verdict,
};
use deepflow::pipeline::StageErrorCause;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const QUERY: &str = "How does remote work affect urban housing markets?";

/// **Scenario**: the evaluator accepts the first draft; the report carries
/// follow-up questions and is delivered once.
#[tokio::test]
async fn remote_work_accepted_on_first_pass() {
    let d = Doubles::new(
        &["remote work adoption 2024", "urban rent trends", "suburban migration"],
        MockLlm::new(verdict_reply(true, "thorough and sourced")),
    );
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = d
        .builder(PipelineConfig::default().with_max_retries(2))
        .publisher(
            Arc::new(FilePublisher::new()),
            Destination::Directory(dir.path().to_path_buf()),
        )
        .build()
        .unwrap();

    let outcome = orchestrator.run(QUERY).await.unwrap();
    assert_eq!(outcome.status, RunStatus::Accepted);
    assert_eq!(outcome.attempts, 1);
    assert!(!outcome.draft.follow_up_questions.is_empty());
    assert_eq!(d.writer.call_count(), 1);
    assert_eq!(d.evaluator.call_count(), 1);

    let directives: Vec<&str> = outcome.results.iter().map(|r| r.directive.as_str()).collect();
    assert_eq!(
        directives,
        ["remote work adoption 2024", "urban rent trends", "suburban migration"]
    );
    assert!(outcome.results.iter().all(|r| r.is_ok()));

    let receipt = outcome.delivery.expect("delivered");
    let written = std::fs::read_to_string(&receipt.location).unwrap();
    assert!(written.contains("## Follow-up questions"));
}

/// **Scenario**: two clarifying questions answered from a fixed list, three
/// searches, accepted first time; the planner sees both answers.
#[tokio::test]
async fn clarified_query_reaches_the_planner() {
    let d = Doubles::new(
        &["remote work share by country", "urban rents 2020-2024", "office vacancy"],
        MockLlm::new(verdict_reply(true, "covers both answers")),
    );
    let clarifier_llm = Arc::new(MockLlm::new(
        serde_json::json!({ "questions": ["Which countries?", "Which years?"] }).to_string(),
    ));
    let answers = Arc::new(StaticAnswers(vec!["US".into(), "2020-2024".into()]));
    let orchestrator = d
        .builder(PipelineConfig::default().with_num_subtasks(3))
        .clarifier(Arc::new(LlmClarifier::new(clarifier_llm.clone(), answers)))
        .build()
        .unwrap();

    let outcome = orchestrator.run(QUERY).await.unwrap();
    assert_eq!(outcome.status, RunStatus::Accepted);
    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.results.iter().all(|r| r.is_ok()));
    assert!(!outcome.draft.follow_up_questions.is_empty());
    assert_eq!(clarifier_llm.call_count(), 1);

    let planner_prompt: String = d.planner.recorded()[0]
        .iter()
        .map(|m| m.content().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(planner_prompt.contains("Q1: Which countries?\nA1: US"), "{planner_prompt}");
    assert!(planner_prompt.contains("Q2: Which years?\nA2: 2020-2024"), "{planner_prompt}");
}

/// **Scenario**: max_retries = 1 and the evaluator rejects both drafts. Under
/// the fail policy the run errors after exactly two writer calls and nothing
/// is published.
#[tokio::test]
async fn urban_housing_exhausted_fails_without_publishing() {
    let d = Doubles::new(
        &["urban housing prices", "remote work share"],
        MockLlm::scripted([
            verdict_reply(false, "no rent figures"),
            verdict_reply(false, "still missing sources"),
        ]),
    );
    let orchestrator = d
        .builder(
            PipelineConfig::default()
                .with_max_retries(1)
                .with_on_exhausted(ExhaustedPolicy::Fail),
        )
        .build()
        .unwrap();

    let err = orchestrator.run(QUERY).await.unwrap_err();
    match &err {
        PipelineError::Exhausted {
            attempts, feedback, ..
        } => {
            assert_eq!(*attempts, 2);
            assert_eq!(feedback, &["no rent figures", "still missing sources"]);
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
    assert_eq!(err.last_feedback(), Some("still missing sources"));
    assert_eq!(d.writer.call_count(), 2);
    assert_eq!(d.publisher.count(), 0);

    // the revision prompt carried the first rejection
    let second_prompt = d.writer.recorded()[1][1].content().to_string();
    assert!(second_prompt.contains("no rent figures"), "{}", second_prompt);
}

/// **Scenario**: same rejections under the accept policy: the last draft is
/// returned with an exhausted status and still published.
#[tokio::test]
async fn urban_housing_exhausted_accepts_last_draft() {
    let d = Doubles::new(
        &["urban housing prices"],
        MockLlm::new(verdict_reply(false, "too vague")),
    );
    let orchestrator = d
        .builder(
            PipelineConfig::default()
                .with_max_retries(1)
                .with_on_exhausted(ExhaustedPolicy::Accept),
        )
        .build()
        .unwrap();

    let outcome = orchestrator.run(QUERY).await.unwrap();
    assert_eq!(outcome.status, RunStatus::Exhausted);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.draft.revision, 1);
    assert_eq!(d.writer.call_count(), 2);
    assert_eq!(d.publisher.count(), 1);
}

/// **Scenario**: one failed search is kept as an annotated gap for the writer.
#[tokio::test]
async fn failed_search_is_reported_as_gap() {
    let tools = MockToolSource::new().with_handler(TOOL_WEB_SEARCH, |args| {
        if args["query"] == "broken" {
            Err(ToolSourceError::Transport("502".into()))
        } else {
            Ok("URL: https://example.org/ok".to_string())
        }
    });
    let d = Doubles::new(&["fine", "broken"], MockLlm::new(verdict_reply(true, "ok")))
        .with_tools(tools);
    let outcome = d
        .builder(PipelineConfig::default())
        .build()
        .unwrap()
        .run(QUERY)
        .await
        .unwrap();
    assert!(outcome.results[0].is_ok());
    assert!(!outcome.results[1].is_ok());
    let prompt = d.writer.recorded()[0][1].content().to_string();
    assert!(prompt.contains("GAP: no results"), "{}", prompt);
}

/// **Scenario**: cancelling while sub-tasks are in flight ends the run with
/// `Cancelled` and the publisher is never called.
#[tokio::test]
async fn cancel_during_execution_never_publishes() {
    let tools = search_source().with_latency(|_, _| Duration::from_secs(5));
    let d = Doubles::new(&["a", "b", "c"], MockLlm::new(verdict_reply(true, "ok")))
        .with_tools(tools);
    let orchestrator = d
        .builder(PipelineConfig::default().with_tool_timeout(Duration::from_secs(30)))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let err = orchestrator.run_with_cancel(QUERY, cancel).await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled), "{err:?}");
    assert_eq!(d.writer.call_count(), 0);
    assert_eq!(d.publisher.count(), 0);
}

/// Writer that cancels the run as soon as it has produced its draft.
struct CancellingWriter {
    inner: LlmWriter,
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl Stage for CancellingWriter {
    fn kind(&self) -> StageKind {
        StageKind::Writer
    }

    async fn produce(
        &self,
        ctx: &PipelineContext,
        cancel: &CancellationToken,
    ) -> Result<StageOutput, StageError> {
        let out = self.inner.produce(ctx, cancel).await;
        self.cancel.cancel();
        out
    }
}

/// **Scenario**: cancellation arriving right before delivery still prevents it.
#[tokio::test]
async fn cancel_after_accepted_draft_never_publishes() {
    let cancel = CancellationToken::new();
    let d = Doubles::new(&["a"], MockLlm::new(verdict_reply(true, "ok")));
    let writer = CancellingWriter {
        inner: LlmWriter::new(d.writer.clone()),
        cancel: cancel.clone(),
    };
    let orchestrator = d
        .builder(PipelineConfig::default())
        .writer(Arc::new(writer))
        .build()
        .unwrap();
    let err = orchestrator.run_with_cancel(QUERY, cancel).await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(d.publisher.count(), 0);
}

/// **Scenario**: a stage returning another stage's output fails the run.
#[tokio::test]
async fn stage_in_wrong_slot_is_schema_mismatch() {
    let d = Doubles::new(&["a"], MockLlm::new(verdict_reply(true, "ok")));
    let orchestrator = d
        .builder(PipelineConfig::default())
        .writer(Arc::new(LlmPlanner::new(Arc::new(MockLlm::new(plan_reply(&["x"]))))))
        .build()
        .unwrap();
    match orchestrator.run(QUERY).await.unwrap_err() {
        PipelineError::Stage(e) => {
            assert_eq!(e.stage, "planner");
            assert_eq!(
                e.cause,
                StageErrorCause::SchemaMismatch {
                    expected: "writer",
                    got: "planner"
                }
            );
        }
        other => panic!("expected stage error, got {other:?}"),
    }
    assert_eq!(d.publisher.count(), 0);
}

/// **Scenario**: an empty plan stops the run before any tool call.
#[tokio::test]
async fn empty_plan_stops_before_execution() {
    let d = Doubles::new(&[], MockLlm::new(verdict_reply(true, "ok")));
    let err = d
        .builder(PipelineConfig::default())
        .build()
        .unwrap()
        .run(QUERY)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Stage(ref e) if e.cause == StageErrorCause::EmptyPlan
    ));
    assert!(d.tools.calls().is_empty());
    assert_eq!(d.writer.call_count(), 0);
}

/// **Scenario**: invalid configuration and a blank query fail before any
/// model or tool call.
#[tokio::test]
async fn config_errors_precede_external_calls() {
    let d = Doubles::new(&["a"], MockLlm::new(verdict_reply(true, "ok")));
    let err = d
        .builder(PipelineConfig::default().with_num_subtasks(0))
        .build()
        .err();
    assert!(matches!(err, Some(ConfigError::ZeroSubtasks)));

    let orchestrator = d.builder(PipelineConfig::default()).build().unwrap();
    let err = orchestrator.run("   ").await.unwrap_err();
    assert!(matches!(err, PipelineError::Config(ConfigError::EmptyQuery)));
    assert_eq!(d.planner.call_count(), 0);
    assert!(d.tools.calls().is_empty());
}

/// **Scenario**: `run_pipeline` without an evaluator returns the first draft.
#[tokio::test]
async fn run_pipeline_without_evaluator_returns_first_draft() {
    let writer = Arc::new(MockLlm::new(draft_reply("Housing", &[])));
    let stages = PipelineStages {
        clarifier: Arc::new(SkipClarification),
        planner: Arc::new(LlmPlanner::new(Arc::new(MockLlm::new(plan_reply(&["a", "b"]))))),
        executor: Arc::new(ToolExecutor::new(Arc::new(search_source()))),
        writer: Arc::new(LlmWriter::new(writer.clone())),
        evaluator: None,
        publisher: None,
    };
    let draft = run_pipeline(QUERY, PipelineConfig::default(), stages)
        .await
        .unwrap();
    assert!(draft.markdown_report.starts_with("# Housing"));
    assert_eq!(draft.revision, 0);
    assert_eq!(writer.call_count(), 1);
}

/// **Scenario**: progress events arrive in pipeline order.
#[tokio::test]
async fn progress_events_follow_the_run() {
    let d = Doubles::new(
        &["a", "b"],
        MockLlm::scripted([verdict_reply(false, "more"), verdict_reply(true, "ok")]),
    );
    let (tx, mut rx) = mpsc::channel(64);
    let orchestrator = d
        .builder(PipelineConfig::default())
        .events(tx)
        .build()
        .unwrap();
    orchestrator.run(QUERY).await.unwrap();
    drop(orchestrator);

    let mut events = Vec::new();
    while let Some(e) = rx.recv().await {
        events.push(e);
    }
    let starts: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageStart { stage } => Some(stage.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        starts,
        ["clarifier", "planner", "executor", "writer", "evaluator", "writer", "evaluator", "publisher"]
    );
    let evaluated: Vec<(u32, Verdict)> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Evaluated { attempt, verdict } => Some((*attempt, *verdict)),
            _ => None,
        })
        .collect();
    assert_eq!(evaluated, [(1, Verdict::Reject), (2, Verdict::Accept)]);
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::Delivered { .. })));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::SubTaskFinished { .. }))
            .count(),
        2
    );
}
