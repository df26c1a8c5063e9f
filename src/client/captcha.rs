use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::SolveError;

pub const ANTICAPTCHA_API_URL: &str = "https://api.anti-captcha.com";

/// 第三方验证码求解服务。超时与重试策略由实现方自行负责
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    async fn solve(&self, api_key: &str, page_url: &str, site_key: &str)
    -> Result<String, SolveError>;
}

#[derive(Debug, Serialize)]
struct RecaptchaTask<'a> {
    #[serde(rename = "type")]
    task_type: &'static str,
    #[serde(rename = "websiteURL")]
    website_url: &'a str,
    #[serde(rename = "websiteKey")]
    website_key: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    #[serde(rename = "clientKey")]
    client_key: &'a str,
    task: RecaptchaTask<'a>,
}

#[derive(Debug, Serialize)]
struct TaskResultRequest<'a> {
    #[serde(rename = "clientKey")]
    client_key: &'a str,
    #[serde(rename = "taskId")]
    task_id: u64,
}

#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    #[serde(rename = "errorId")]
    error_id: i64,
    #[serde(rename = "errorDescription", default)]
    error_description: Option<String>,
    #[serde(rename = "taskId", default)]
    task_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RecaptchaSolution {
    #[serde(rename = "gRecaptchaResponse")]
    g_recaptcha_response: String,
}

#[derive(Debug, Deserialize)]
struct TaskResultResponse {
    #[serde(rename = "errorId")]
    error_id: i64,
    #[serde(rename = "errorDescription", default)]
    error_description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    solution: Option<RecaptchaSolution>,
}

/// anti-captcha.com 的 ReCAPTCHA v2 求解器
pub struct AntiCaptchaSolver {
    client: Client,
    base_url: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl AntiCaptchaSolver {
    pub fn new() -> Result<Self, SolveError> {
        Self::with_base_url(ANTICAPTCHA_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SolveError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SolveError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(5),
            max_polls: 60,
        })
    }

    /// 设置轮询间隔与最大轮询次数
    pub fn with_polling(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    async fn post<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<R, SolveError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SolveError::Transport(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| SolveError::Transport(e.to_string()))?;
        debug!("打码平台响应 {}: {}", method, body);

        serde_json::from_str(&body)
            .map_err(|e| SolveError::Transport(format!("解析响应失败: {}, body: {}", e, body)))
    }
}

fn provider_error(error_id: i64, description: Option<String>) -> SolveError {
    SolveError::Provider {
        code: error_id,
        description: description.unwrap_or_default(),
    }
}

#[async_trait]
impl CaptchaSolver for AntiCaptchaSolver {
    async fn solve(
        &self,
        api_key: &str,
        page_url: &str,
        site_key: &str,
    ) -> Result<String, SolveError> {
        let created: CreateTaskResponse = self
            .post(
                "createTask",
                &CreateTaskRequest {
                    client_key: api_key,
                    task: RecaptchaTask {
                        task_type: "RecaptchaV2TaskProxyless",
                        website_url: page_url,
                        website_key: site_key,
                    },
                },
            )
            .await?;

        if created.error_id != 0 {
            return Err(provider_error(created.error_id, created.error_description));
        }
        let task_id = created
            .task_id
            .ok_or_else(|| SolveError::Transport("响应中缺少 taskId".to_string()))?;
        info!("验证码任务已创建: {}", task_id);

        for _ in 0..self.max_polls {
            sleep(self.poll_interval).await;

            let result: TaskResultResponse = self
                .post(
                    "getTaskResult",
                    &TaskResultRequest {
                        client_key: api_key,
                        task_id,
                    },
                )
                .await?;

            if result.error_id != 0 {
                return Err(provider_error(result.error_id, result.error_description));
            }

            if result.status.as_deref() == Some("ready") {
                return result
                    .solution
                    .map(|s| s.g_recaptcha_response)
                    .ok_or_else(|| SolveError::Transport("响应中缺少 solution".to_string()));
            }
        }

        Err(SolveError::Exhausted {
            polls: self.max_polls,
        })
    }
}
