//! 脚本派发
//! 引擎侧只负责把脚本交给特权执行边界，不等待执行结果；
//! 执行边界拿到的只有脚本文本，无法访问引擎内部的规则状态。

use std::panic::{self, AssertUnwindSafe};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

use super::message::ExtensionMessage;
use crate::error::{PageStyleError, PsResult};

/// 特权上下文中的脚本执行器
pub trait ScriptRunner: Send + Sync {
    /// 在页面全局作用域执行一次脚本
    fn run(&self, code: &str) -> Result<(), String>;
}

/// 脚本派发器（引擎侧）
#[derive(Debug, Clone)]
pub struct ScriptDispatcher {
    tx: UnboundedSender<ExtensionMessage>,
}

impl ScriptDispatcher {
    pub fn new(tx: UnboundedSender<ExtensionMessage>) -> Self {
        Self { tx }
    }

    /// 创建派发器及其对应的执行边界接收端
    pub fn channel() -> (Self, UnboundedReceiver<ExtensionMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// 派发脚本：仅在启用且代码非空时发送，返回是否发出了请求
    pub fn dispatch(&self, code: &str, enabled: bool) -> bool {
        if !enabled || code.is_empty() {
            return false;
        }

        let message = ExtensionMessage::ExecuteScript {
            script: code.to_string(),
        };
        match self.tx.send(message) {
            Ok(()) => {
                debug!("脚本已派发，长度：{}", code.len());
                true
            }
            Err(_) => {
                warn!("脚本派发失败：执行边界不可用");
                false
            }
        }
    }
}

/// 在执行边界内运行脚本，错误与 panic 都在此处截获
pub fn execute_isolated(runner: &dyn ScriptRunner, code: &str) -> PsResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| runner.run(code))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(PageStyleError::ScriptExecutionFailure(e)),
        Err(_) => Err(PageStyleError::ScriptExecutionFailure(
            "脚本执行过程中发生 panic".to_string(),
        )),
    }
}

/// 特权执行边界：消费 `execute_script` 消息并逐条执行
pub struct PrivilegedHost<R> {
    runner: R,
    rx: UnboundedReceiver<ExtensionMessage>,
    executed: usize,
    failed: usize,
}

impl<R: ScriptRunner> PrivilegedHost<R> {
    pub fn new(runner: R, rx: UnboundedReceiver<ExtensionMessage>) -> Self {
        Self {
            runner,
            rx,
            executed: 0,
            failed: 0,
        }
    }

    /// 处理单条消息；执行失败只记录日志
    pub fn handle(&mut self, message: ExtensionMessage) {
        match message {
            ExtensionMessage::ExecuteScript { script } => {
                self.executed += 1;
                if let Err(e) = execute_isolated(&self.runner, &script) {
                    self.failed += 1;
                    error!("自定义脚本执行出错：{}", e);
                }
            }
            other => debug!("执行边界忽略消息：{:?}", other),
        }
    }

    /// 处理当前已到达的全部消息（不等待），返回本次处理数量
    pub fn drain_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.handle(message);
            handled += 1;
        }
        handled
    }

    /// 持续运行直到所有派发器被释放
    pub async fn run(mut self) -> Self {
        while let Some(message) = self.rx.recv().await {
            self.handle(message);
        }
        self
    }

    pub fn executed(&self) -> usize {
        self.executed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}
