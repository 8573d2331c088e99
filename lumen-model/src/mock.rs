use async_trait::async_trait;
use lumen_core::{
    Completion, CompletionParams, CompletionProvider, ProviderError, ProviderKind, Result,
    TokenUsage,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Scripted provider for tests.
///
/// Each call pops the next queued outcome. Calls beyond the script fail with
/// [`ProviderError::Response`].
pub struct MockProvider {
    model: String,
    script: Mutex<VecDeque<Result<Completion>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    cost_per_token: f64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
            cost_per_token: 0.0,
        }
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_completion(Completion::new(text))
    }

    pub fn with_completion(self, completion: Completion) -> Self {
        lock(&self.script).push_back(Ok(completion));
        self
    }

    pub fn with_error(self, error: ProviderError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Flat USD price applied to every reported token.
    pub fn with_cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = cost;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Custom
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, _params: &CompletionParams) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = lock(&self.script).pop_front();
        next.unwrap_or_else(|| Err(ProviderError::Response("mock script exhausted".into())))
    }

    fn estimate_cost(&self, usage: &TokenUsage) -> f64 {
        usage.total() as f64 * self.cost_per_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let mock = MockProvider::new("judge")
            .with_text("first")
            .with_error(ProviderError::Request("down".into()));

        let params = CompletionParams::default();
        assert_eq!(mock.complete("a", &params).await.unwrap().text, "first");
        assert!(matches!(mock.complete("b", &params).await, Err(ProviderError::Request(_))));
        assert!(matches!(mock.complete("c", &params).await, Err(ProviderError::Response(_))));

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cost_per_token() {
        let mock = MockProvider::new("judge").with_cost_per_token(0.001);
        let cost = mock.estimate_cost(&TokenUsage::new(100, 50));
        assert!((cost - 0.15).abs() < 1e-9);
    }
}
