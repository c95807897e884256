//! 会话配置命令
//!
//! 导出默认配置、检查配置文件

use anyhow::{Context, Result};
use clap::Subcommand;
use mqb_control::{ControllerConfig, OffsetTableKind};
use std::path::{Path, PathBuf};
use tracing::info;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 输出默认配置（量产调校值）
    Default {
        /// 写入文件而不是标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 解析并校验配置文件
    Check {
        /// 配置文件路径
        path: PathBuf,
    },
}

impl ConfigCommand {
    pub fn execute(&self) -> Result<()> {
        match self {
            ConfigCommand::Default { output } => Self::write_default(output.as_deref()),
            ConfigCommand::Check { path } => Self::check(path),
        }
    }

    fn write_default(output: Option<&Path>) -> Result<()> {
        let config = ControllerConfig::default();
        match output {
            Some(path) => {
                config
                    .save_to_file(path)
                    .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
                info!(path = %path.display(), "default config written");
                println!("✅ 默认配置已写入 {}", path.display());
            },
            None => print!("{}", config.to_toml_string()?),
        }
        Ok(())
    }

    fn check(path: &Path) -> Result<()> {
        let config = ControllerConfig::load_from_file(path)
            .with_context(|| format!("配置无效: {}", path.display()))?;

        println!("✅ 配置有效: {}", path.display());
        println!();
        println!("总线:           {:?}", config.bus);
        println!(
            "扭矩:           max {} / up {} / down {} / opposed {}",
            config.limits.max_torque,
            config.limits.max_rate_up,
            config.limits.max_rate_down,
            config.limits.max_rate_down_opposed
        );
        println!(
            "节拍:           {} Hz, steering /{}, hud /{}",
            config.timing.cycle_hz, config.timing.steering_step, config.timing.hud_step
        );
        println!(
            "按键:           {} 帧/次, planner hold-off {}, watch hold-off {}",
            config.timing.button_repeat_count,
            config.timing.planner_step,
            config.timing.button_watch_step
        );
        println!(
            "限速选项:       smooth={} ignore_diff={} ignore_lead={}",
            config.speed_limit.smooth_adjust,
            config.speed_limit.ignore_difference_too_high,
            config.speed_limit.ignore_when_following_lead
        );
        for kind in [
            OffsetTableKind::NotEngaged,
            OffsetTableKind::Accel,
            OffsetTableKind::Decel,
        ] {
            let table = config.offsets.table(kind);
            let entries: Vec<String> = table
                .iter()
                .map(|entry| format!("{}→{}", entry.bucket, entry.target))
                .collect();
            println!("{:<16}{}", format!("{}:", kind.name()), entries.join(" "));
        }
        Ok(())
    }
}
