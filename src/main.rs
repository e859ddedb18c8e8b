//! rspagestyle 命令行：基于文件存储管理站点规则，并对本地 HTML 页面应用规则

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rspagestyle::rule::{build_export, parse_import, ConfigStore, FileStore, HostCollection};
use rspagestyle::{
    ConfigManager, GlobalConfig, PageLocation, PrivilegedHost, RuleResolver, ScriptDispatcher,
    ScriptRunner, Session,
};

#[derive(Parser)]
#[command(name = "rspagestyle")]
#[command(author, version, about = "按页面路径持久化注入样式与脚本", long_about = None)]
struct Cli {
    /// 规则存储文件（MessagePack）
    #[arg(long, global = true, value_name = "FILE")]
    store: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 对本地页面应用匹配的规则集
    Apply {
        #[arg(long)]
        url: String,
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// 缺省时输出到标准输出
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// 打印 URL 对应的生效匹配模式
    Resolve {
        #[arg(long)]
        url: String,
    },
    /// 导入规则文件，整体替换站点规则
    Import {
        #[arg(long)]
        host: String,
        file: PathBuf,
    },
    /// 导出站点规则到 JSON 文件
    Export {
        #[arg(long)]
        host: String,
        #[arg(long, value_name = "DIR", default_value = ".")]
        dir: PathBuf,
    },
    /// 清空站点规则
    Clear {
        #[arg(long)]
        host: String,
    },
}

/// 命令行环境没有浏览器上下文，脚本只记录到日志
struct LoggingRunner;

impl ScriptRunner for LoggingRunner {
    fn run(&self, code: &str) -> Result<(), String> {
        info!("全局脚本（未执行）：\n{}", code);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = ConfigManager::custom().verbose(cli.verbose);
    if let Some(path) = cli.store {
        builder = builder.store_path(path);
    }
    let config = builder.build();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_directive()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let backend = Arc::new(FileStore::from_config(&config));

    match cli.command {
        Commands::Apply { url, input, output } => {
            handle_apply(&config, backend, &url, &input, output.as_deref()).await
        }
        Commands::Resolve { url } => handle_resolve(&config, backend, &url).await,
        Commands::Import { host, file } => handle_import(&config, backend, &host, &file).await,
        Commands::Export { host, dir } => handle_export(&config, backend, &host, &dir).await,
        Commands::Clear { host } => {
            ConfigStore::new(backend, &config).clear(&host).await?;
            info!("已清空 {} 的规则", host);
            Ok(())
        }
    }
}

async fn handle_apply(
    config: &GlobalConfig,
    backend: Arc<FileStore>,
    url: &str,
    input: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let location = PageLocation::parse(url)?;
    let markup = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("读取页面失败：{}", input.display()))?;

    let (dispatcher, rx) = ScriptDispatcher::channel();
    let host = tokio::spawn(PrivilegedHost::new(LoggingRunner, rx).run());

    let mut session = Session::open(config, backend, location, markup, dispatcher).await?;
    let report = session.apply_all();
    info!(
        "规则应用完成：内联规则{}条、元素{}个、伪类样式{}字节、脚本派发：{}",
        report.inline.applied_rules,
        report.inline.touched_elements,
        report.stylesheet.len(),
        report.script_dispatched
    );

    // 释放会话即关闭派发通道，执行边界处理完剩余消息后退出
    let markup = session.into_document().into_markup();
    let host = host.await.context("脚本执行边界异常退出")?;
    if host.failed() > 0 {
        info!("脚本执行失败{}次", host.failed());
    }

    match output {
        Some(path) => tokio::fs::write(path, markup)
            .await
            .with_context(|| format!("写入页面失败：{}", path.display()))?,
        None => println!("{}", markup),
    }
    Ok(())
}

async fn handle_resolve(config: &GlobalConfig, backend: Arc<FileStore>, url: &str) -> Result<()> {
    let location = PageLocation::parse(url)?;
    let collection = ConfigStore::new(backend, config)
        .load(location.hostname())
        .await?;

    match RuleResolver::resolve_active(&collection, location.path()) {
        Some(rule_set) => println!("{}", rule_set.match_pattern),
        None => println!("none"),
    }
    Ok(())
}

async fn handle_import(
    config: &GlobalConfig,
    backend: Arc<FileStore>,
    host: &str,
    file: &Path,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("读取导入文件失败：{}", file.display()))?;
    let collection: HostCollection = parse_import(&text)?;

    ConfigStore::new(backend, config).save(host, &collection).await?;
    info!("已导入 {} 个规则集到 {}", collection.len(), host);
    Ok(())
}

async fn handle_export(
    config: &GlobalConfig,
    backend: Arc<FileStore>,
    host: &str,
    dir: &Path,
) -> Result<()> {
    let collection = ConfigStore::new(backend, config).load(host).await?;
    let Some(file) = build_export(&collection, host, &config.export_file_prefix)? else {
        info!("{} 没有可导出的规则", host);
        return Ok(());
    };

    let path = dir.join(&file.file_name);
    tokio::fs::write(&path, file.contents)
        .await
        .with_context(|| format!("写入导出文件失败：{}", path.display()))?;
    info!("已导出到 {}", path.display());
    Ok(())
}
