use anyhow::{Result, anyhow};
use packt_claim::selection::{self, Selection};
use packt_claim::{
    AntiCaptchaSolver, BookCatalog, CatalogConfig, ClaimConfig, ClaimOutcome, HttpClient,
    OfferClaimer, PacktEndpoints,
};
use std::sync::Arc;

/// 示例1：解析书籍选择
fn example_selection() -> Result<()> {
    for input in ["1, 3, 7, 14-32, 54, 87", "5-3", "abc, 2", "exit"] {
        match selection::parse(input, 60) {
            Ok(Selection::Exit) => println!("{:>24} => 退出", input),
            Ok(Selection::Books(result)) => {
                println!("{:>24} => {:?}", input, result.indices());
                for rejection in result.rejected() {
                    println!("{:>24}    丢弃 {}", "", rejection);
                }
            }
            Err(e) => println!("{:>24} => 错误: {}", input, e),
        }
    }

    Ok(())
}

/// 示例2：列出已拥有的电子书
async fn example_catalog(endpoints: &PacktEndpoints, client: Arc<HttpClient>) -> Result<()> {
    let catalog = BookCatalog::new(client, CatalogConfig::new(endpoints));
    let books = catalog.fetch_all().await?;

    println!("书籍总数: {}", books.len());
    for (index, book) in books.iter().take(10).enumerate() {
        println!("{}. [{}] {}", index, book.id, book.title);
    }

    Ok(())
}

/// 示例3：领取今天的免费电子书
async fn example_claim(endpoints: PacktEndpoints, client: Arc<HttpClient>) -> Result<()> {
    let key = std::env::var("ANTICAPTCHA_KEY").map_err(|_| anyhow!("未设置 ANTICAPTCHA_KEY"))?;

    let catalog = BookCatalog::new(client.clone(), CatalogConfig::new(&endpoints));
    let claimer = OfferClaimer::new(
        ClaimConfig::new(endpoints, key),
        client,
        Arc::new(AntiCaptchaSolver::new()?),
        catalog,
    );

    match claimer.claim_product().await? {
        ClaimOutcome::Claimed(product) => println!("领取成功: {}", product),
        ClaimOutcome::AlreadyClaimed(product) => println!("已经领取过: {}", product),
        ClaimOutcome::Failed { product, status } => {
            println!("领取 {} 失败，状态码: {}", product, status)
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    println!("=== Packt 免费电子书库使用示例 ===\n");

    println!("示例1: 解析书籍选择");
    example_selection()?;

    let (Ok(email), Ok(password)) = (std::env::var("PACKT_EMAIL"), std::env::var("PACKT_PASSWORD"))
    else {
        println!("\n未设置 PACKT_EMAIL / PACKT_PASSWORD，跳过需要登录的示例");
        return Ok(());
    };

    let endpoints = PacktEndpoints::default();
    let client = Arc::new(HttpClient::login(&endpoints, &email, &password).await?);

    println!("\n示例2: 列出已拥有的电子书");
    if let Err(e) = example_catalog(&endpoints, client.clone()).await {
        println!("错误: {}", e);
    }

    println!("\n示例3: 领取今天的免费电子书");
    if let Err(e) = example_claim(endpoints, client).await {
        println!("错误: {}", e);
    }

    Ok(())
}
