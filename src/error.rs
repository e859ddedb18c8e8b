//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum PageStyleError {
    // 规则编辑相关错误
    #[error("匹配模式已存在：{0}")]
    DuplicatePattern(String),
    #[error("匹配模式不能为空")]
    EmptyPattern,
    #[error("当前页面没有生效的规则集")]
    NoActiveRuleSet,
    #[error("规则不存在：索引 {0}")]
    RuleNotFound(usize),

    // 样式应用相关错误
    #[error("无效选择器 \"{selector}\"：{reason}")]
    MalformedSelector { selector: String, reason: String },
    #[error("HTML 改写失败：{0}")]
    RewriteError(String),

    // 脚本执行 / 消息投递
    #[error("脚本执行失败：{0}")]
    ScriptExecutionFailure(String),
    #[error("消息投递失败：{0}")]
    DeliveryError(String),

    // 导入导出
    #[error("导入格式错误：{0}")]
    ImportFormatError(String),

    // 存储相关错误
    #[error("MessagePack序列化/反序列化失败：{0}")]
    MsgPackError(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type PsResult<T> = Result<T, PageStyleError>;
