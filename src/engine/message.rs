//! 跨上下文消息
//! 所有消息都是单向命令：发送方不等待响应，也不保证送达或执行完成。

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::error::{PageStyleError, PsResult};

/// 消息体，按 `action` 字段区分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExtensionMessage {
    /// 请求特权上下文执行脚本
    ExecuteScript { script: String },
    /// 切换编辑面板显示
    TogglePanel,
}

impl ExtensionMessage {
    pub fn to_json(&self) -> PsResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> PsResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// 投递结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// 页面没有监听者（如不支持注入的页面），属正常情况
    NoListener,
}

/// 向页面广播面板切换消息
///
/// 接收端不存在时静默忽略；其余失败记录警告并返回错误。
pub fn send_toggle_panel(tx: &Sender<ExtensionMessage>) -> PsResult<DeliveryOutcome> {
    match tx.try_send(ExtensionMessage::TogglePanel) {
        Ok(()) => Ok(DeliveryOutcome::Delivered),
        Err(TrySendError::Closed(_)) => {
            debug!("页面无消息监听者，忽略 toggle_panel");
            Ok(DeliveryOutcome::NoListener)
        }
        Err(TrySendError::Full(_)) => {
            warn!("toggle_panel 投递失败：消息队列已满");
            Err(PageStyleError::DeliveryError("消息队列已满".to_string()))
        }
    }
}
