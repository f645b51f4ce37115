use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use statscout::approval::{ApprovalRequired, Turn};
use statscout::consts::APPROVAL_MARKER;
use statscout::engine::react::{ReactConfig, ReactEngine};
use statscout::engine::{Completion, Engine};
use statscout::events::{self, DomainEvent, EventReceiver};
use statscout::thinker::mock::MockThinker;
use statscout::thinker::{Context, Step, StepResult, Thinker, ToolCall};
use statscout::tools::{Reply, Tool, ToolRegistry};

/// Echoes its `text` argument.
struct Echo;

#[async_trait]
impl Tool for Echo {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "echo text"
    }
    async fn execute(&self, args: &HashMap<String, String>, _turn: &Turn) -> Result<Reply> {
        Ok(Reply::Output(args.get("text").cloned().unwrap_or_default()))
    }
}

/// A sensitive tool that only answers approved turns.
struct Guarded;

#[async_trait]
impl Tool for Guarded {
    fn name(&self) -> &str {
        "guarded"
    }
    fn description(&self) -> &str {
        "needs approval"
    }
    async fn execute(&self, _args: &HashMap<String, String>, turn: &Turn) -> Result<Reply> {
        if let Err(pending) = turn.verify(self.name()) {
            return Ok(pending.into());
        }
        Ok(Reply::Output("secret data".into()))
    }
}

/// Never finishes within any reasonable timeout.
struct Slow;

#[async_trait]
impl Tool for Slow {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "sleeps"
    }
    async fn execute(&self, _args: &HashMap<String, String>, _turn: &Turn) -> Result<Reply> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Reply::Output("late".into()))
    }
}

fn act(thought: &str, calls: Vec<ToolCall>) -> Step {
    Step::Act {
        thought: thought.to_string(),
        calls,
    }
}

fn finish(answer: &str) -> Step {
    Step::Finish {
        thought: String::new(),
        answer: answer.to_string(),
    }
}

async fn build_engine(steps: Vec<Step>, config: ReactConfig) -> ReactEngine {
    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(Echo)).await;
    tools.register(Arc::new(Guarded)).await;
    tools.register(Arc::new(Slow)).await;
    ReactEngine::new(Arc::new(MockThinker::from_steps(steps)), tools, config)
}

async fn run(engine: &ReactEngine, message: &str) -> (Result<Completion>, Vec<DomainEvent>) {
    let (tx, rx) = events::queue();
    let result = engine.run(&Turn::new(message), &tx).await;
    drop(tx);
    (result, collect(rx))
}

fn collect(mut rx: EventReceiver) -> Vec<DomainEvent> {
    let mut out = Vec::new();
    while let Some(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn finish_immediately() {
    let engine = build_engine(vec![finish("done")], ReactConfig::default()).await;

    let (result, events) = run(&engine, "anything").await;
    assert_eq!(result.unwrap(), Completion::Answer("done".into()));
    assert!(events.is_empty());
}

#[tokio::test]
async fn tool_call_events_are_ordered() {
    let engine = build_engine(
        vec![
            act("look it up", vec![ToolCall::new("echo").arg("text", "hello")]),
            finish("hello"),
        ],
        ReactConfig::default(),
    )
    .await;

    let (result, events) = run(&engine, "say hello").await;
    assert_eq!(result.unwrap(), Completion::Answer("hello".into()));
    assert_eq!(
        events,
        vec![
            DomainEvent::Reasoning {
                thought: "look it up".into()
            },
            DomainEvent::ToolStarted {
                tool: "echo".into(),
                input: r#"{"text":"hello"}"#.into()
            },
            DomainEvent::ToolResult {
                tool: "echo".into(),
                output: "hello".into()
            },
        ]
    );
}

#[tokio::test]
async fn parallel_calls_all_report() {
    let engine = build_engine(
        vec![
            act(
                "both at once",
                vec![
                    ToolCall::new("echo").arg("text", "one"),
                    ToolCall::new("echo").arg("text", "two"),
                ],
            ),
            finish("ok"),
        ],
        ReactConfig::default(),
    )
    .await;

    let (_, events) = run(&engine, "parallel").await;
    let outputs: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            DomainEvent::ToolResult { output, .. } => Some(output.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(outputs.len(), 2);
    assert!(outputs.contains(&"one") && outputs.contains(&"two"));
}

#[tokio::test]
async fn unknown_tool_is_an_observation_not_a_failure() {
    let engine = build_engine(
        vec![
            act("try a bad tool", vec![ToolCall::new("nonexistent")]),
            finish("handled"),
        ],
        ReactConfig::default(),
    )
    .await;

    let (result, events) = run(&engine, "bad tool").await;
    assert_eq!(result.unwrap(), Completion::Answer("handled".into()));
    assert!(events.contains(&DomainEvent::ToolResult {
        tool: "nonexistent".into(),
        output: "error: unknown tool: nonexistent".into()
    }));
}

#[tokio::test]
async fn unapproved_sensitive_call_interrupts() {
    let engine = build_engine(
        vec![
            act("need data", vec![ToolCall::new("guarded")]),
            finish("should not get here"),
        ],
        ReactConfig::default(),
    )
    .await;

    let (result, events) = run(&engine, "show me the secret").await;
    assert_eq!(
        result.unwrap(),
        Completion::Interrupted(ApprovalRequired::new("guarded"))
    );
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, DomainEvent::ToolResult { .. }))
    );
}

#[tokio::test]
async fn approved_sensitive_call_proceeds() {
    let engine = build_engine(
        vec![
            act("need data", vec![ToolCall::new("guarded")]),
            finish("got it"),
        ],
        ReactConfig::default(),
    )
    .await;

    let message = format!("{} guarded", APPROVAL_MARKER);
    let (result, events) = run(&engine, &message).await;
    assert_eq!(result.unwrap(), Completion::Answer("got it".into()));
    assert!(events.contains(&DomainEvent::ToolResult {
        tool: "guarded".into(),
        output: "secret data".into()
    }));
}

#[tokio::test]
async fn slow_tool_times_out() {
    let engine = build_engine(
        vec![act("wait", vec![ToolCall::new("slow")]), finish("moved on")],
        ReactConfig {
            tool_timeout: Duration::from_millis(50),
            ..ReactConfig::default()
        },
    )
    .await;

    let (result, events) = run(&engine, "slow").await;
    assert_eq!(result.unwrap(), Completion::Answer("moved on".into()));
    assert!(events.contains(&DomainEvent::ToolResult {
        tool: "slow".into(),
        output: "error: timed out".into()
    }));
}

#[tokio::test]
async fn max_iterations_enforced() {
    let steps: Vec<Step> = (0..5)
        .map(|i| act(&format!("iteration {}", i), vec![ToolCall::new("echo")]))
        .collect();
    let engine = build_engine(
        steps,
        ReactConfig {
            max_iterations: 3,
            ..ReactConfig::default()
        },
    )
    .await;

    let (result, _) = run(&engine, "loop").await;
    assert!(result.unwrap_err().to_string().contains("max iterations"));
}

#[tokio::test]
async fn thinker_failure_propagates() {
    let engine = build_engine(vec![], ReactConfig::default()).await;

    let (result, _) = run(&engine, "nothing scripted").await;
    assert!(result.unwrap_err().to_string().contains("no more steps"));
}

/// Acts once, then answers with whatever args it saw in its history.
#[derive(Default)]
struct Remembers {
    seen: Mutex<Vec<HashMap<String, String>>>,
}

#[async_trait]
impl Thinker for Remembers {
    async fn next_step(&self, context: &Context<'_>) -> Result<StepResult> {
        let step = match context.history.last() {
            None => act(
                "echo and wait",
                vec![
                    ToolCall::new("echo").arg("text", "Bumrah"),
                    ToolCall::new("slow").arg("over", "19"),
                ],
            ),
            Some(iteration) => {
                let mut seen = self.seen.lock().unwrap();
                seen.extend(iteration.results.iter().map(|r| r.args.clone()));
                finish("done")
            }
        };
        Ok(StepResult { step, usage: None })
    }
}

#[tokio::test]
async fn history_keeps_call_args() {
    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(Echo)).await;
    tools.register(Arc::new(Slow)).await;
    let thinker = Arc::new(Remembers::default());
    let engine = ReactEngine::new(
        Arc::clone(&thinker) as Arc<dyn Thinker>,
        tools,
        ReactConfig {
            tool_timeout: Duration::from_millis(50),
            ..ReactConfig::default()
        },
    );

    let (result, _) = run(&engine, "remember").await;
    assert_eq!(result.unwrap(), Completion::Answer("done".into()));

    let seen = thinker.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].get("text").map(String::as_str), Some("Bumrah"));
    // The timed-out call keeps its args too.
    assert_eq!(seen[1].get("over").map(String::as_str), Some("19"));
}
