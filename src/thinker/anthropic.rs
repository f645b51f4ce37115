use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::consts::{APPROVAL_MARKER, DEFAULT_MODEL};
use crate::tools::Outcome;

use super::{Context, Step, StepResult, Thinker, TokenUsage, ToolCall};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// A thinker that calls the Anthropic Messages API.
pub struct AnthropicThinker {
    http: reqwest::Client,
    model: String,
    api_key: Option<String>,
}

impl AnthropicThinker {
    pub fn new(model: Option<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_system_prompt(context: &Context<'_>) -> String {
        let tools_desc: String = context
            .available_tools
            .iter()
            .map(|tool| format!("- {}: {}\n", tool.name, tool.description))
            .collect();

        format!(
            r#"You are StatsScout, a cricket analytics assistant. You combine live match data
with scouting reports from a local knowledge base to give tactical insight.

Work in this order:
1. Check the live match context to see who is playing.
2. Identify the batters and bowlers that matter. When you talk about one player,
   start the sentence with [HIGHLIGHT: Player Name].
3. Cross-reference those names with the scouting notes.
4. For predictions with sparse live data, analyze the match-up rosters. If rosters
   are unavailable, fall back to what you know about the teams.
5. Use career stats to judge a player's quality.
6. Only compute a win probability when runs needed, balls left and wickets in hand
   are all known.
7. Finish with a tactical suggestion.

Data tools need the user's permission. Call `request_user_approval` with a short
description first. The user approves by replying with a message that starts with
"{APPROVAL_MARKER}".

Tools:
{tools_desc}
Respond with ONLY JSON, in one of two shapes:

{{"thought": "...", "action": {{"calls": [{{"tool": "name", "args": {{"key": "value"}}}}]}}}}

{{"thought": "...", "answer": "final answer for the user"}}

Several calls in one action run in parallel."#
        )
    }

    fn build_messages(context: &Context<'_>) -> Vec<Message> {
        let mut messages = vec![Message {
            role: "user".to_string(),
            content: context.message.to_string(),
        }];

        for iteration in context.history {
            let calls: Vec<Value> = iteration
                .results
                .iter()
                .map(|r| serde_json::json!({ "tool": r.tool, "args": r.args }))
                .collect();
            messages.push(Message {
                role: "assistant".to_string(),
                content: serde_json::json!({
                    "thought": iteration.thought,
                    "action": { "calls": calls },
                })
                .to_string(),
            });

            let observation = iteration.results.iter().fold(
                String::from("Tool results:\n"),
                |mut acc, result| {
                    let line = match &result.outcome {
                        Outcome::Success(out) => format!("[{}] ok: {}\n", result.tool, out),
                        Outcome::Error(err) => format!("[{}] error: {}\n", result.tool, err),
                        Outcome::Interrupted(pending) => format!(
                            "[{}] waiting for approval: {}\n",
                            result.tool, pending.action
                        ),
                    };
                    acc.push_str(&line);
                    acc
                },
            );
            messages.push(Message {
                role: "user".to_string(),
                content: observation,
            });
        }

        messages
    }

    fn parse_response(text: &str) -> Result<Step> {
        let raw: RawStep = serde_json::from_str(extract_json(text))
            .with_context(|| format!("failed to parse model response as JSON\nraw: {}", text))?;

        if let Some(answer) = raw.answer {
            let answer = match answer {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Ok(Step::Finish {
                thought: raw.thought,
                answer,
            });
        }

        let Some(action) = raw.action else {
            bail!("model response is neither an answer nor a tool call: {}", text);
        };

        let calls: Vec<ToolCall> = action
            .calls
            .into_iter()
            .map(|call| ToolCall {
                tool: call.tool,
                args: call
                    .args
                    .into_iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => (k, s),
                        other => (k, other.to_string()),
                    })
                    .collect::<HashMap<_, _>>(),
            })
            .collect();

        if calls.is_empty() {
            bail!("model returned an action with no valid tool calls: {}", text);
        }

        Ok(Step::Act {
            thought: raw.thought,
            calls,
        })
    }
}

#[async_trait]
impl Thinker for AnthropicThinker {
    async fn next_step(&self, context: &Context<'_>) -> Result<StepResult> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("no Anthropic credentials found. Set ANTHROPIC_API_KEY.");
        };

        let system = Self::build_system_prompt(context);
        let messages = Self::build_messages(context);
        let body = ApiRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: &system,
            messages: &messages,
        };

        let resp = self
            .http
            .post(API_URL)
            .header("anthropic-version", API_VERSION)
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .context("failed to reach the Anthropic API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Anthropic API error ({}): {}", status, text);
        }

        let api_resp: ApiResponse = resp.json().await?;
        let text: String = api_resp
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.is_empty() {
            bail!("Anthropic API returned empty response");
        }

        Ok(StepResult {
            step: Self::parse_response(&text)?,
            usage: api_resp.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        })
    }
}

/// Strip an optional markdown code fence around the JSON reply.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    ["```json", "```"]
        .iter()
        .find_map(|fence| {
            trimmed
                .strip_prefix(fence)
                .and_then(|rest| rest.strip_suffix("```"))
        })
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[derive(Deserialize)]
struct RawStep {
    #[serde(default)]
    thought: String,
    answer: Option<Value>,
    action: Option<RawAction>,
}

#[derive(Deserialize)]
struct RawAction {
    #[serde(default)]
    calls: Vec<RawCall>,
}

#[derive(Deserialize)]
struct RawCall {
    tool: String,
    #[serde(default)]
    args: serde_json::Map<String, Value>,
}

// --- API types ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
