use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::api::{LoginRequest, LoginResponse, PacktEndpoints};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 一次API调用的结果：状态码和解析后的JSON（非JSON响应为 `Value::Null`）
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// 将响应体反序列化为指定类型
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| anyhow!("解析响应失败: {}, body: {}", e, self.body))
    }
}

/// 已认证的API传输层。核心流程只依赖这个trait，便于替换为mock
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<ApiResponse>;

    async fn put(&self, url: &str, body: &Value) -> Result<ApiResponse>;
}

/// HTTP客户端，封装了与Packt API的所有交互
pub struct HttpClient {
    client: Client,
    access_token: Option<String>,
}

impl HttpClient {
    /// 创建未认证的HTTP客户端
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow!("创建HTTP客户端失败: {}", e))?;

        Ok(Self {
            client,
            access_token: None,
        })
    }

    /// 使用已有的访问令牌创建客户端
    pub fn with_access_token(access_token: impl Into<String>) -> Result<Self> {
        let mut client = Self::new()?;
        client.access_token = Some(access_token.into());
        Ok(client)
    }

    /// 使用账号密码登录并返回已认证的客户端
    pub async fn login(endpoints: &PacktEndpoints, email: &str, password: &str) -> Result<Self> {
        let mut client = Self::new()?;
        let url = endpoints.login_url();
        debug!("登录请求: {}", url);

        let response = client
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&LoginRequest {
                username: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("登录失败，状态码: {}", status.as_u16()));
        }

        let parsed: LoginResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow!("解析登录响应失败: {}, body: {}", e, body))?;
        client.access_token = Some(parsed.data.access);

        Ok(client)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<ApiResponse> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("响应 {}: {}", status, body);

        let body = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).unwrap_or(Value::Null)
        };

        Ok(ApiResponse::new(status, body))
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<ApiResponse> {
        debug!("GET {} {:?}", url, params);
        let request = self.authorize(self.client.get(url).query(params));
        self.send(request).await
    }

    async fn put(&self, url: &str, body: &Value) -> Result<ApiResponse> {
        debug!("PUT {}", url);
        let request = self.authorize(self.client.put(url).json(body));
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_response_success_is_exactly_200() {
        assert!(ApiResponse::new(200, Value::Null).is_success());
        assert!(!ApiResponse::new(201, Value::Null).is_success());
        assert!(!ApiResponse::new(409, Value::Null).is_success());
    }

    #[test]
    fn test_api_response_json_reports_body_on_error() {
        let response = ApiResponse::new(200, json!({"unexpected": true}));
        let err = response.json::<crate::api::ProductSummary>().unwrap_err();
        assert!(err.to_string().contains("unexpected"));
    }
}
