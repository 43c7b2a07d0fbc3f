//! 测试用的脚本化浏览器：按表达式返回预设结果，并记录调用

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::browser::{BrowserCapability, BrowserSession, SessionOptions};
use crate::error::BrowserError;

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedSession {
    responses: HashMap<String, Result<Value, BrowserError>>,
    delays: HashMap<String, Duration>,
    calls: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(mut self, expression: &str, value: Value) -> Self {
        self.responses.insert(expression.to_string(), Ok(value));
        self
    }

    pub(crate) fn failing(mut self, expression: &str) -> Self {
        self.responses.insert(
            expression.to_string(),
            Err(BrowserError::Evaluation(format!("ReferenceError: {}", expression))),
        );
        self
    }

    /// 让某个表达式的执行挂起一段时间
    pub(crate) fn slow(mut self, expression: &str, delay: Duration) -> Self {
        self.delays.insert(expression.to_string(), delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn evaluate(&mut self, expression: &str) -> Result<Value, BrowserError> {
        self.calls.lock().unwrap().push(expression.to_string());
        if let Some(delay) = self.delays.get(expression) {
            tokio::time::sleep(*delay).await;
        }
        self.responses.get(expression).cloned().unwrap_or(Ok(Value::Null))
    }

    async fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// 每次 open 都返回同一脚本（共享调用记录）的会话
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedBrowser {
    session: ScriptedSession,
    open_error: Option<BrowserError>,
    opened: Arc<AtomicUsize>,
}

impl ScriptedBrowser {
    pub(crate) fn new(session: ScriptedSession) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    pub(crate) fn unavailable(error: BrowserError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::default()
        }
    }

    pub(crate) fn session(&self) -> &ScriptedSession {
        &self.session
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserCapability for ScriptedBrowser {
    async fn open(&self, _url: &str, _options: &SessionOptions) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        match &self.open_error {
            Some(e) => Err(e.clone()),
            None => Ok(Box::new(self.session.clone())),
        }
    }
}
