use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Context, Step, StepResult, Thinker};

/// A scripted thinker for tests and demos. Returns pre-defined steps in order.
pub struct MockThinker {
    steps: Vec<StepResult>,
    index: AtomicUsize,
}

impl MockThinker {
    pub fn new(steps: Vec<StepResult>) -> Self {
        Self {
            steps,
            index: AtomicUsize::new(0),
        }
    }

    /// Script steps that report no token usage.
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self::new(
            steps
                .into_iter()
                .map(|step| StepResult { step, usage: None })
                .collect(),
        )
    }

    /// How many steps have been handed out.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Thinker for MockThinker {
    async fn next_step(&self, _context: &Context<'_>) -> Result<StepResult> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        self.steps
            .get(i)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockThinker: no more steps (called {} times)", i + 1))
    }
}
