use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use log::{error, info, warn};
use std::fmt;
use std::sync::Arc;

use crate::api::{
    ClaimRequest, Offer, OffersResponse, PACKT_FREE_LEARNING_URL, PACKT_RECAPTCHA_SITE_KEY,
    PacktEndpoints, ProductSummary, UserIdentity, UserResponse,
};
use crate::client::{ApiClient, BookCatalog, CaptchaSolver};
use crate::error::ClaimError;

/// 查询优惠时使用的时间格式
const OFFER_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 认领配置
#[derive(Debug, Clone)]
pub struct ClaimConfig {
    pub endpoints: PacktEndpoints,
    /// 打码平台密钥
    pub anticaptcha_key: String,
    pub free_learning_url: String,
    pub recaptcha_site_key: String,
}

impl ClaimConfig {
    pub fn new(endpoints: PacktEndpoints, anticaptcha_key: impl Into<String>) -> Self {
        Self {
            endpoints,
            anticaptcha_key: anticaptcha_key.into(),
            free_learning_url: PACKT_FREE_LEARNING_URL.to_string(),
            recaptcha_site_key: PACKT_RECAPTCHA_SITE_KEY.to_string(),
        }
    }
}

/// 本次优惠对应的产品。产品摘要获取失败时标题未知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedProduct {
    pub id: String,
    pub title: Option<String>,
}

impl fmt::Display for ClaimedProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "\"{}\"", title),
            None => write!(f, "产品 {}", self.id),
        }
    }
}

/// 认领结果。已认领属于正常结束，不是错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    AlreadyClaimed(ClaimedProduct),
    Claimed(ClaimedProduct),
    Failed { product: ClaimedProduct, status: u16 },
}

impl ClaimOutcome {
    pub fn product(&self) -> &ClaimedProduct {
        match self {
            ClaimOutcome::AlreadyClaimed(product)
            | ClaimOutcome::Claimed(product)
            | ClaimOutcome::Failed { product, .. } => product,
        }
    }

    /// 根据认领接口的状态码分类结果
    pub fn from_status(status: u16, product: ClaimedProduct) -> Self {
        match status {
            200 => ClaimOutcome::Claimed(product),
            409 => ClaimOutcome::AlreadyClaimed(product),
            _ => ClaimOutcome::Failed { product, status },
        }
    }
}

/// 每日免费电子书认领器
pub struct OfferClaimer {
    config: ClaimConfig,
    client: Arc<dyn ApiClient>,
    solver: Arc<dyn CaptchaSolver>,
    catalog: BookCatalog,
}

impl OfferClaimer {
    /// 创建新的认领器实例
    pub fn new(
        config: ClaimConfig,
        client: Arc<dyn ApiClient>,
        solver: Arc<dyn CaptchaSolver>,
        catalog: BookCatalog,
    ) -> Self {
        Self {
            config,
            client,
            solver,
            catalog,
        }
    }

    /// 认领今天（UTC）的免费电子书
    pub async fn claim_product(&self) -> Result<ClaimOutcome, ClaimError> {
        self.claim_product_at(Utc::now()).await
    }

    /// 以给定时刻所在的UTC日期执行认领流程
    pub async fn claim_product_at(&self, now: DateTime<Utc>) -> Result<ClaimOutcome, ClaimError> {
        info!("开始领取电子书...");

        let offer = self.resolve_offer(now).await?;
        let user = self.resolve_user().await?;
        let product = self.resolve_product(&offer.product_id).await;

        // 验证码求解代价最高，必须在确认尚未拥有后才进行
        let books = self.catalog.fetch_all().await?;
        if books.iter().any(|book| offer.is_for(book)) {
            info!("你已经领取过 Packt 免费学习优惠 {}", product);
            return Ok(ClaimOutcome::AlreadyClaimed(product));
        }

        info!("开始在 Packt 免费学习页面求解 ReCAPTCHA...");
        let recaptcha = self
            .solver
            .solve(
                &self.config.anticaptcha_key,
                &self.config.free_learning_url,
                &self.config.recaptcha_site_key,
            )
            .await?;

        let claim_url = self.config.endpoints.claim_url(&user.id, &offer.id);
        let body = serde_json::to_value(ClaimRequest { recaptcha })
            .map_err(|e| ClaimError::Api(format!("构造认领请求失败: {}", e)))?;
        let response = self
            .client
            .put(&claim_url, &body)
            .await
            .map_err(|e| ClaimError::Api(format!("提交认领失败: {}", e)))?;

        let outcome = ClaimOutcome::from_status(response.status, product);
        match &outcome {
            ClaimOutcome::Claimed(product) => {
                info!("新的 Packt 免费学习电子书 {} 已领取！", product)
            }
            ClaimOutcome::AlreadyClaimed(product) => {
                info!("你已经领取过 Packt 免费学习优惠 {}", product)
            }
            ClaimOutcome::Failed { status, .. } => {
                error!("领取 Packt 免费学习电子书失败，状态码: {}", status)
            }
        }

        Ok(outcome)
    }

    /// 查询今天的免费优惠，必须恰好一个
    async fn resolve_offer(&self, now: DateTime<Utc>) -> Result<Offer, ClaimError> {
        let (date_from, date_to) = offer_window(now);
        let params = [
            ("dateFrom", date_from.format(OFFER_DATE_FORMAT).to_string()),
            ("dateTo", date_to.format(OFFER_DATE_FORMAT).to_string()),
        ];

        let response = self
            .client
            .get(&self.config.endpoints.offers_url(), &params)
            .await
            .map_err(|e| ClaimError::Api(format!("获取免费优惠失败: {}", e)))?;

        if !response.is_success() {
            return Err(ClaimError::Api(format!(
                "获取免费优惠失败，状态码: {}",
                response.status
            )));
        }

        let offers = response
            .json::<OffersResponse>()
            .map_err(|e| ClaimError::Api(format!("免费优惠响应格式异常: {}", e)))?
            .data;

        single(offers).map_err(|found| ClaimError::OfferResolution { found })
    }

    /// 查询当前用户，必须恰好一个
    async fn resolve_user(&self) -> Result<UserIdentity, ClaimError> {
        let response = self
            .client
            .get(&self.config.endpoints.user_url(), &[])
            .await
            .map_err(|e| ClaimError::Api(format!("获取用户信息失败: {}", e)))?;

        if !response.is_success() {
            return Err(ClaimError::Api(format!(
                "获取用户信息失败，状态码: {}",
                response.status
            )));
        }

        let users = response
            .json::<UserResponse>()
            .map_err(|e| ClaimError::Api(format!("用户信息响应格式异常: {}", e)))?
            .data;

        single(users).map_err(|found| ClaimError::UserResolution { found })
    }

    /// 获取产品标题，失败时只影响日志输出
    async fn resolve_product(&self, product_id: &str) -> ClaimedProduct {
        let url = self.config.endpoints.product_summary_url(product_id);
        let title = match self.client.get(&url, &[]).await {
            Ok(response) if response.is_success() => response
                .json::<ProductSummary>()
                .map(|summary| summary.title)
                .map_err(|e| warn!("产品摘要格式异常: {}", e))
                .ok(),
            Ok(response) => {
                warn!("获取产品 {} 摘要失败，状态码: {}", product_id, response.status);
                None
            }
            Err(e) => {
                warn!("获取产品 {} 摘要失败: {}", product_id, e);
                None
            }
        };

        ClaimedProduct {
            id: product_id.to_string(),
            title,
        }
    }
}

/// 今天UTC零点到明天零点
fn offer_window(now: DateTime<Utc>) -> (NaiveDateTime, NaiveDateTime) {
    let today = now.date_naive().and_time(NaiveTime::MIN);
    (today, today + Duration::days(1))
}

/// 取出唯一元素；数量不为 1 时返回实际数量
fn single<T>(items: Vec<T>) -> Result<T, usize> {
    let found = items.len();
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (Some(item), None) => Ok(item),
        _ => Err(found),
    }
}
