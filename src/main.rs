use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use packt_claim::api::{DEFAULT_PAGINATION_SIZE, DEFAULT_SERVICES_URL, DEFAULT_STATIC_URL};
use packt_claim::selection::{self, Selection, SelectionError};
use packt_claim::{
    AntiCaptchaSolver, Book, BookCatalog, CatalogConfig, ClaimConfig, ClaimError, ClaimOutcome,
    HttpClient, OfferClaimer, PacktEndpoints,
};

const SELECTION_PROMPT: &str = "输入要选择的书籍序号，用逗号分隔，1-5 表示选择 1 到 5 的全部序号，\
输入 'exit' 退出。例如: 1, 3, 7, 14-32, 54, 87\n>>>";

#[derive(Parser, Debug)]
#[command(author, version, about = "Packt 每日免费电子书自动领取工具", long_about = None)]
struct Args {
    #[arg(short, long, env = "PACKT_EMAIL", help = "Packt 账号邮箱")]
    email: Option<String>,

    #[arg(short, long, env = "PACKT_PASSWORD", hide_env_values = true, help = "Packt 账号密码")]
    password: Option<String>,

    #[arg(
        short = 'k',
        long,
        env = "ANTICAPTCHA_KEY",
        hide_env_values = true,
        help = "anti-captcha.com 密钥"
    )]
    anticaptcha_key: Option<String>,

    #[arg(long, default_value_t = DEFAULT_PAGINATION_SIZE, help = "书籍列表分页大小")]
    page_size: u32,

    #[arg(long, default_value = "4", help = "同时获取的分页数")]
    concurrency: usize,

    #[arg(long, default_value = DEFAULT_SERVICES_URL, help = "Packt 服务 API 地址")]
    services_url: String,

    #[arg(long, default_value = DEFAULT_STATIC_URL, help = "Packt 静态资源地址")]
    static_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 领取今天的免费电子书（默认）
    Claim,
    /// 列出已拥有的电子书并选择
    Select {
        #[arg(short, long, help = "直接给出选择，例如 \"1, 3, 7, 14-32\"")]
        books: Option<String>,
    },
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ClaimError::MissingInput(name.to_string()).into())
}

async fn run_claim(
    endpoints: PacktEndpoints,
    client: Arc<HttpClient>,
    catalog: BookCatalog,
    anticaptcha_key: String,
) -> Result<()> {
    let solver = Arc::new(AntiCaptchaSolver::new()?);
    let claimer = OfferClaimer::new(
        ClaimConfig::new(endpoints, anticaptcha_key),
        client,
        solver,
        catalog,
    );

    let outcome = claimer.claim_product().await?;
    let product = outcome.product();
    match &outcome {
        ClaimOutcome::Claimed(_) => info!("领取成功: {}", product),
        ClaimOutcome::AlreadyClaimed(_) => info!("今日电子书已在书架中: {}", product),
        ClaimOutcome::Failed { status, .. } => {
            return Err(anyhow!("领取 {} 失败，状态码: {}", product, status));
        }
    }

    Ok(())
}

/// 反复提示直到得到有效选择；输入 exit 或读到 EOF 时返回 Selection::Exit
async fn prompt_selection(catalog_size: usize) -> Result<Selection> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(SELECTION_PROMPT.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            return Ok(Selection::Exit);
        };

        match selection::parse(&line, catalog_size) {
            Ok(selection) => return Ok(selection),
            Err(SelectionError::InvalidInput { .. }) => {
                error!("请输入有效的序号");
            }
        }
    }
}

/// 两种输入方式共用的选择结果处理；Exit 时返回 None
fn chosen_books(selection: Selection, books: &[Book]) -> Option<Vec<&Book>> {
    match selection {
        Selection::Exit => None,
        Selection::Books(result) => Some(result.pick(books)),
    }
}

async fn run_select(catalog: BookCatalog, books_arg: Option<String>) -> Result<()> {
    let mut books = catalog.fetch_all().await?;
    // 展示时按领取时间正序
    books.reverse();

    for (index, book) in books.iter().enumerate() {
        println!("{}. {}", index, book.title);
    }

    let selection = match books_arg {
        Some(text) => selection::parse(&text, books.len())?,
        None => prompt_selection(books.len()).await?,
    };

    let Some(chosen) = chosen_books(selection, &books) else {
        info!("退出");
        std::process::exit(0);
    };

    if chosen.is_empty() {
        warn!("没有选中任何书籍");
    }
    for book in chosen {
        println!("{}\t{}", book.id, book.title);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 使用 env_logger::Builder 来设置默认日志级别
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // 验证参数
    if args.page_size == 0 {
        return Err(anyhow!("分页大小必须大于0"));
    }

    if args.concurrency == 0 {
        return Err(anyhow!("并发数必须大于0"));
    }

    let email = required(args.email, "Packt 账号邮箱 (--email / PACKT_EMAIL)")?;
    let password = required(args.password, "Packt 账号密码 (--password / PACKT_PASSWORD)")?;

    let endpoints = PacktEndpoints::new(args.services_url, args.static_url);
    let client = Arc::new(
        HttpClient::login(&endpoints, &email, &password)
            .await
            .context("登录 Packt 失败")?,
    );
    info!("登录成功");

    let catalog = BookCatalog::new(
        client.clone(),
        CatalogConfig {
            products_url: endpoints.products_url(),
            page_size: args.page_size,
            max_concurrent_pages: args.concurrency,
        },
    );

    match args.command.unwrap_or(Command::Claim) {
        Command::Claim => {
            let key = required(args.anticaptcha_key, "打码平台密钥 (--anticaptcha-key / ANTICAPTCHA_KEY)")?;
            run_claim(endpoints, client, catalog, key).await
        }
        Command::Select { books } => run_select(catalog, books).await,
    }
}
