//! 引擎模块：页面会话、脚本派发与跨上下文消息
pub mod message;
pub mod dispatcher;
pub mod session;

pub use self::message::{send_toggle_panel, DeliveryOutcome, ExtensionMessage};
pub use self::dispatcher::{execute_isolated, PrivilegedHost, ScriptDispatcher, ScriptRunner};
pub use self::session::{ApplyReport, ApplyScope, DomMutation, Session};
