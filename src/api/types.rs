use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 用户已拥有的电子书
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: u64,
    pub title: String,
}

/// 产品列表接口中的单个条目
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProductEntry {
    #[serde(rename = "productId", deserialize_with = "deserialize_numeric_id")]
    pub product_id: u64,
    #[serde(rename = "productName")]
    pub product_name: String,
}

impl From<ProductEntry> for Book {
    fn from(entry: ProductEntry) -> Self {
        Self {
            id: entry.product_id,
            title: entry.product_name,
        }
    }
}

/// 产品列表响应。首个请求只关心 `count`，分页请求只关心 `data`
///
/// `data` 保留原始JSON，逐条解析，单个异常条目不影响同页其他书籍。
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ProductsResponse {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub data: Option<Vec<Value>>,
}

/// 当日免费学习优惠
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Offer {
    #[serde(deserialize_with = "deserialize_string_id")]
    pub id: String,
    #[serde(rename = "productId", deserialize_with = "deserialize_string_id")]
    pub product_id: String,
    #[serde(rename = "availableFrom", default, deserialize_with = "deserialize_lenient_time")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(rename = "expiresAt", default, deserialize_with = "deserialize_lenient_time")]
    pub valid_to: Option<DateTime<Utc>>,
}

impl Offer {
    /// 判断书籍是否就是该优惠对应的产品
    pub fn is_for(&self, book: &Book) -> bool {
        self.product_id
            .trim()
            .parse::<u64>()
            .is_ok_and(|id| id == book.id)
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct OffersResponse {
    #[serde(default)]
    pub data: Vec<Offer>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    #[serde(deserialize_with = "deserialize_string_id")]
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct UserResponse {
    #[serde(default)]
    pub data: Vec<UserIdentity>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductSummary {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenData {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub data: TokenData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub recaptcha: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

fn deserialize_numeric_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("非数字产品ID '{}': {}", text, e))),
    }
}

fn deserialize_string_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(id) => id.to_string(),
        RawId::Text(text) => text,
    })
}

/// 接受 RFC 3339 或不带时区的 ISO 时间（视为UTC），其他格式记为 `None`
fn deserialize_lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::String(text)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };

    Ok(DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        }))
}
