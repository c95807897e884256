//! # MQB CLI
//!
//! 控制核心的离线工具：用录制或手写的逐周期输入驱动 `ControlCycle`，检查输出帧。
//!
//! ## 用法
//!
//! ```bash
//! # 导出默认配置并按需修改
//! mqb-cli config default --output controller.toml
//! mqb-cli config check controller.toml
//!
//! # 回放场景（每行一个 JSON 格式的周期输入）
//! mqb-cli replay --input drive.jsonl --config controller.toml --verify
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod verify;

use commands::{ConfigCommand, ReplayCommand};

/// MQB CLI - 车道保持 / 巡航按键控制核心离线工具
#[derive(Parser, Debug)]
#[command(name = "mqb-cli")]
#[command(about = "Offline replay and configuration tool for the MQB controller", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 会话配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 回放逐周期输入并输出帧
    Replay {
        #[command(flatten)]
        args: ReplayCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mqb_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Replay { args } => args.execute(),
    }
}
