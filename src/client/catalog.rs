use anyhow::{Result, anyhow};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{Book, DEFAULT_PAGINATION_SIZE, PacktEndpoints, ProductEntry, ProductsResponse};
use crate::client::ApiClient;
use crate::error::ClaimError;

/// 书籍目录配置
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub products_url: String,
    pub page_size: u32,
    /// 同时进行的分页请求数
    pub max_concurrent_pages: usize,
}

impl CatalogConfig {
    pub fn new(endpoints: &PacktEndpoints) -> Self {
        Self {
            products_url: endpoints.products_url(),
            page_size: DEFAULT_PAGINATION_SIZE,
            max_concurrent_pages: 4,
        }
    }
}

/// 用户已拥有电子书的目录，每次调用都重新向服务端查询
pub struct BookCatalog {
    client: Arc<dyn ApiClient>,
    config: CatalogConfig,
}

impl BookCatalog {
    pub fn new(client: Arc<dyn ApiClient>, config: CatalogConfig) -> Self {
        Self { client, config }
    }

    pub fn page_size(&self) -> u32 {
        self.config.page_size.max(1)
    }

    /// 获取用户所有电子书，按服务端的创建时间倒序排列
    ///
    /// 总数获取失败时整个操作失败；单页失败只会记录错误并跳过该页。
    pub async fn fetch_all(&self) -> Result<Vec<Book>, ClaimError> {
        info!("正在获取你的书籍数据...");

        let total = self.fetch_total_count().await?;
        let pages_total = total.div_ceil(u64::from(self.page_size()));
        debug!("书籍总数 {}，共 {} 页", total, pages_total);

        // buffered 按输入顺序产出结果，与完成先后无关
        let pages: Vec<Vec<Book>> = stream::iter(0..pages_total)
            .map(|page| self.fetch_page(page))
            .buffered(self.config.max_concurrent_pages.max(1))
            .collect()
            .await;

        let books = merge_pages(pages);
        info!("书籍数据获取成功，共 {} 本", books.len());
        Ok(books)
    }

    async fn fetch_total_count(&self) -> Result<u64, ClaimError> {
        let response = self
            .client
            .get(&self.config.products_url, &[])
            .await
            .map_err(|e| {
                error!("无法获取用户的书籍数据: {}", e);
                ClaimError::CatalogUnavailable(e.to_string())
            })?;

        if !response.is_success() {
            error!("无法获取用户的书籍数据，状态码: {}", response.status);
            return Err(ClaimError::CatalogUnavailable(format!(
                "状态码 {}",
                response.status
            )));
        }

        response
            .json::<ProductsResponse>()
            .ok()
            .and_then(|r| r.count)
            .ok_or_else(|| {
                error!("无法获取用户的书籍数据: 响应中缺少 count");
                ClaimError::CatalogUnavailable("响应中缺少 count".to_string())
            })
    }

    /// 获取单页书籍，失败时记录错误并返回空列表
    pub async fn fetch_page(&self, page: u64) -> Vec<Book> {
        match self.try_fetch_page(page).await {
            Ok(books) => books,
            Err(e) => {
                error!("无法获取第 {} 页书籍数据: {}", page, e);
                Vec::new()
            }
        }
    }

    async fn try_fetch_page(&self, page: u64) -> Result<Vec<Book>> {
        let limit = u64::from(self.page_size());
        let params = [
            ("sort", "createdAt:DESC".to_string()),
            ("offset", (page * limit).to_string()),
            ("limit", limit.to_string()),
        ];

        let response = self.client.get(&self.config.products_url, &params).await?;
        if !response.is_success() {
            return Err(anyhow!("状态码 {}", response.status));
        }

        let data = response
            .json::<ProductsResponse>()?
            .data
            .ok_or_else(|| anyhow!("响应中缺少 data"))?;

        Ok(data
            .into_iter()
            .filter_map(|entry| match ProductEntry::deserialize(&entry) {
                Ok(product) => Some(Book::from(product)),
                Err(e) => {
                    warn!("第 {} 页跳过无法解析的书籍 {}: {}", page, entry, e);
                    None
                }
            })
            .collect())
    }
}

/// 按页序合并，重复的ID只保留第一次出现
fn merge_pages(pages: Vec<Vec<Book>>) -> Vec<Book> {
    let mut seen = HashSet::new();
    pages
        .into_iter()
        .flatten()
        .filter(|book| {
            let fresh = seen.insert(book.id);
            if !fresh {
                debug!("跳过重复的书籍: {}", book.id);
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiResponse;
    use crate::client::testing::{RecordedCall, ScriptedApi};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    fn products_page(ids: std::ops::Range<u64>) -> Value {
        let data: Vec<Value> = ids
            .map(|id| json!({"productId": id.to_string(), "productName": format!("Book {id}")}))
            .collect();
        json!({ "data": data })
    }

    /// 模拟总数为 `total` 的目录；`failing_page` 指定的页返回 500
    fn catalog_api(total: u64, page_size: u64, failing_page: Option<u64>) -> ScriptedApi {
        ScriptedApi::new(move |call: &RecordedCall| {
            let Some(offset) = call.param("offset") else {
                return Ok(ApiResponse::new(200, json!({ "count": total })));
            };
            let offset: u64 = offset.parse()?;
            if Some(offset / page_size) == failing_page {
                return Ok(ApiResponse::new(500, Value::Null));
            }
            let end = (offset + page_size).min(total);
            Ok(ApiResponse::new(200, products_page(offset..end)))
        })
    }

    fn catalog(api: Arc<ScriptedApi>, page_size: u32) -> BookCatalog {
        let mut config = CatalogConfig::new(&PacktEndpoints::default());
        config.page_size = page_size;
        BookCatalog::new(api, config)
    }

    fn page_requests(api: &ScriptedApi) -> Vec<RecordedCall> {
        api.calls()
            .into_iter()
            .filter(|c| c.param("offset").is_some())
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_all_issues_one_request_per_page() {
        let api = Arc::new(catalog_api(25, 10, None));
        let books = catalog(api.clone(), 10).fetch_all().await.unwrap();

        assert_eq!(books.len(), 25);
        let ids: Vec<u64> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, (0..25).collect::<Vec<_>>());

        let mut offsets: Vec<String> = page_requests(&api)
            .iter()
            .map(|c| c.param("offset").unwrap().to_string())
            .collect();
        offsets.sort();
        assert_eq!(offsets, vec!["0", "10", "20"]);
    }

    #[tokio::test]
    async fn test_page_requests_carry_sort_and_limit() {
        let api = Arc::new(catalog_api(5, 25, None));
        catalog(api.clone(), 25).fetch_all().await.unwrap();

        let requests = page_requests(&api);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].param("sort"), Some("createdAt:DESC"));
        assert_eq!(requests[0].param("limit"), Some("25"));
        assert_eq!(requests[0].param("offset"), Some("0"));
    }

    #[tokio::test]
    async fn test_failed_page_yields_partial_result() {
        let api = Arc::new(catalog_api(30, 10, Some(1)));
        let books = catalog(api.clone(), 10).fetch_all().await.unwrap();

        let ids: Vec<u64> = books.iter().map(|b| b.id).collect();
        let mut expected: Vec<u64> = (0..10).collect();
        expected.extend(20..30);
        assert_eq!(ids, expected);
        assert_eq!(page_requests(&api).len(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_on_page_is_swallowed() {
        let api = Arc::new(ScriptedApi::new(|call: &RecordedCall| match call.param("offset") {
            None => Ok(ApiResponse::new(200, json!({ "count": 4 }))),
            Some("0") => Err(anyhow!("connection reset")),
            Some(_) => Ok(ApiResponse::new(200, products_page(2..4))),
        }));

        let books = catalog(api, 2).fetch_all().await.unwrap();
        assert_eq!(books.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_missing_count_is_catalog_unavailable() {
        let api = Arc::new(ScriptedApi::new(|_: &RecordedCall| {
            Ok(ApiResponse::new(200, json!({ "data": [] })))
        }));

        let result = catalog(api.clone(), 10).fetch_all().await;
        assert!(matches!(result, Err(ClaimError::CatalogUnavailable(_))));
        assert!(page_requests(&api).is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_count_request_is_catalog_unavailable() {
        let api = Arc::new(ScriptedApi::new(|_: &RecordedCall| {
            Ok(ApiResponse::new(401, json!({ "message": "Unauthorized" })))
        }));

        let result = catalog(api, 10).fetch_all().await;
        assert!(matches!(result, Err(ClaimError::CatalogUnavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_catalog_makes_no_page_requests() {
        let api = Arc::new(catalog_api(0, 10, None));
        let books = catalog(api.clone(), 10).fetch_all().await.unwrap();

        assert!(books.is_empty());
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_entry_is_skipped_within_page() {
        let api = Arc::new(ScriptedApi::new(|call: &RecordedCall| match call.param("offset") {
            None => Ok(ApiResponse::new(200, json!({ "count": 3 }))),
            Some(_) => Ok(ApiResponse::new(
                200,
                json!({ "data": [
                    {"productId": "9781788995665", "productName": "Mastering Rust"},
                    {"productId": "B07XYZ", "productName": "Kindle Only"},
                    {"productId": "3", "productName": "Third"}
                ]}),
            )),
        }));

        let books = catalog(api, 10).fetch_all().await.unwrap();
        assert_eq!(
            books.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![9781788995665, 3]
        );
    }

    /// 页号越小响应越慢，用于验证合并顺序与完成顺序无关
    struct SlowFirstPages {
        total: u64,
        page_size: u64,
        completed: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl ApiClient for SlowFirstPages {
        async fn get(&self, _url: &str, params: &[(&str, String)]) -> Result<ApiResponse> {
            let Some((_, offset)) = params.iter().find(|(k, _)| *k == "offset") else {
                return Ok(ApiResponse::new(200, json!({ "count": self.total })));
            };
            let offset: u64 = offset.parse()?;
            let pages_total = self.total.div_ceil(self.page_size);
            let page = offset / self.page_size;

            sleep(Duration::from_millis(20 * (pages_total - page))).await;
            self.completed.lock().unwrap().push(page);

            let end = (offset + self.page_size).min(self.total);
            Ok(ApiResponse::new(200, products_page(offset..end)))
        }

        async fn put(&self, _url: &str, _body: &Value) -> Result<ApiResponse> {
            Err(anyhow!("unexpected PUT"))
        }
    }

    #[tokio::test]
    async fn test_pages_merge_in_page_order_when_completing_out_of_order() {
        let api = Arc::new(SlowFirstPages {
            total: 30,
            page_size: 10,
            completed: Mutex::new(Vec::new()),
        });
        let mut config = CatalogConfig::new(&PacktEndpoints::default());
        config.page_size = 10;
        config.max_concurrent_pages = 3;

        let books = BookCatalog::new(api.clone(), config).fetch_all().await.unwrap();

        assert_eq!(*api.completed.lock().unwrap(), vec![2, 1, 0]);
        assert_eq!(
            books.iter().map(|b| b.id).collect::<Vec<_>>(),
            (0..30).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_merge_pages_keeps_order_and_drops_duplicates() {
        let book = |id: u64| Book {
            id,
            title: format!("Book {id}"),
        };
        let merged = merge_pages(vec![vec![book(3), book(1)], vec![], vec![book(1), book(2)]]);
        assert_eq!(merged.iter().map(|b| b.id).collect::<Vec<_>>(), vec![3, 1, 2]);
    }
}
