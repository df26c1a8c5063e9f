/// 产品列表分页大小
pub const DEFAULT_PAGINATION_SIZE: u32 = 25;

pub const DEFAULT_SERVICES_URL: &str = "https://services.packtpub.com";
pub const DEFAULT_STATIC_URL: &str = "https://static.packt-cdn.com";

/// 免费学习活动页面，求解验证码时作为 pageUrl
pub const PACKT_FREE_LEARNING_URL: &str = "https://www.packtpub.com/packt/offers/free-learning/";
pub const PACKT_RECAPTCHA_SITE_KEY: &str = "6LeAHSgUAAAAAKsn5jo6RUSTLVxGNYyuvUcLMe0_";

/// Packt API 地址集合，所有组件通过构造参数获得，不使用全局状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacktEndpoints {
    services_url: String,
    static_url: String,
}

impl Default for PacktEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICES_URL, DEFAULT_STATIC_URL)
    }
}

impl PacktEndpoints {
    pub fn new(services_url: impl Into<String>, static_url: impl Into<String>) -> Self {
        Self {
            services_url: services_url.into().trim_end_matches('/').to_string(),
            static_url: static_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// 使用同一个地址作为服务和静态资源的根，便于测试时指向本地 mock 服务器
    pub fn single_host(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self::new(base_url.clone(), base_url)
    }

    pub fn login_url(&self) -> String {
        format!("{}/auth-v1/users/tokens", self.services_url)
    }

    pub fn products_url(&self) -> String {
        format!("{}/entitlements-v1/users/me/products", self.services_url)
    }

    pub fn offers_url(&self) -> String {
        format!("{}/free-learning-v1/offers", self.services_url)
    }

    pub fn user_url(&self) -> String {
        format!("{}/users-v1/users/me", self.services_url)
    }

    pub fn product_summary_url(&self, product_id: &str) -> String {
        format!("{}/products/{}/summary", self.static_url, product_id)
    }

    pub fn claim_url(&self, user_id: &str, offer_id: &str) -> String {
        format!(
            "{}/free-learning-v1/users/{}/claims/{}",
            self.services_url, user_id, offer_id
        )
    }
}
