//! 认领流程的错误类型

use thiserror::Error;

/// 验证码求解失败。对认领流程来说是致命错误，直接向上传播
#[derive(Debug, Clone, Error)]
pub enum SolveError {
    /// 打码平台返回了错误码
    #[error("打码平台返回错误 {code}: {description}")]
    Provider { code: i64, description: String },

    /// 轮询次数耗尽仍未得到结果
    #[error("验证码在 {polls} 次轮询后仍未完成")]
    Exhausted { polls: u32 },

    /// 网络或响应格式问题
    #[error("请求打码平台失败: {0}")]
    Transport(String),
}

/// 认领及目录获取过程中的错误
#[derive(Debug, Error)]
pub enum ClaimError {
    /// 无法得知目录总数，整个获取操作失败
    #[error("无法获取用户的书籍数据: {0}")]
    CatalogUnavailable(String),

    /// 当日优惠数量不是恰好一个
    #[error("当日免费优惠数量异常: 期望 1 个，实际 {found} 个")]
    OfferResolution { found: usize },

    /// 当前用户数量不是恰好一个
    #[error("用户信息数量异常: 期望 1 个，实际 {found} 个")]
    UserResolution { found: usize },

    #[error("验证码求解失败: {0}")]
    Solve(#[from] SolveError),

    /// 必需的 API 调用在传输层失败
    #[error("API 请求失败: {0}")]
    Api(String),

    /// 缺少运行所需的输入，例如账号或打码平台密钥
    #[error("缺少必要输入: {0}")]
    MissingInput(String),
}
