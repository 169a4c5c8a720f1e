//! Host-facing seams. The host (editor, terminal, ...) implements these so the
//! core can ask questions and report outcomes without knowing how they render.

use async_trait::async_trait;

/// Fire-and-forget messages to the user
pub trait UserMessages: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Text prompt, the equivalent of an input box
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRequest {
    pub prompt: String,
    pub placeholder: String,
    /// Pre-filled value
    pub value: Option<String>,
}

impl InputRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn value(mut self, value: Option<impl Into<String>>) -> Self {
        self.value = value.map(Into::into);
        self
    }
}

#[async_trait]
pub trait Prompter: UserMessages {
    /// `None` when the user dismissed the prompt
    async fn input(&self, request: InputRequest) -> Option<String>;

    /// Pick one of `choices`; returns its index, `None` when dismissed
    async fn pick(&self, placeholder: &str, choices: &[String]) -> Option<usize>;
}
