//! 页面位置：hostname 决定存储键，path 决定生效规则集

use url::Url;

use crate::error::{PageStyleError, PsResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    hostname: String,
    path: String,
}

impl PageLocation {
    pub fn new(hostname: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            path: path.into(),
        }
    }

    /// 从完整 URL 解析；查询串与片段不参与匹配
    pub fn parse(url: &str) -> PsResult<Self> {
        let url = Url::parse(url)?;
        let hostname = url
            .host_str()
            .ok_or_else(|| PageStyleError::InvalidInput(format!("URL缺少主机名：{}", url)))?;
        Ok(Self::new(hostname, url.path()))
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
