//! 单元测试用的 mock 传输层与求解器

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::client::{ApiClient, ApiResponse, CaptchaSolver};
use crate::error::SolveError;

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Handler = dyn Fn(&RecordedCall) -> Result<ApiResponse> + Send + Sync;

/// 按请求内容返回预设响应，并记录所有调用
pub(crate) struct ScriptedApi {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedApi {
    pub fn new(handler: impl Fn(&RecordedCall) -> Result<ApiResponse> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RecordedCall) -> Result<ApiResponse> {
        let response = (self.handler)(&call);
        self.calls.lock().unwrap().push(call);
        response
    }
}

#[async_trait]
impl ApiClient for ScriptedApi {
    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<ApiResponse> {
        self.record(RecordedCall {
            method: "GET",
            url: url.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: None,
        })
    }

    async fn put(&self, url: &str, body: &Value) -> Result<ApiResponse> {
        self.record(RecordedCall {
            method: "PUT",
            url: url.to_string(),
            params: Vec::new(),
            body: Some(body.clone()),
        })
    }
}

/// 统计调用次数的求解器
pub(crate) struct CountingSolver {
    result: Result<String, SolveError>,
    calls: AtomicUsize,
}

impl CountingSolver {
    pub fn returning(token: &str) -> Self {
        Self {
            result: Ok(token.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: SolveError) -> Self {
        Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptchaSolver for CountingSolver {
    async fn solve(
        &self,
        _api_key: &str,
        _page_url: &str,
        _site_key: &str,
    ) -> Result<String, SolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
