//! replay 命令
//!
//! 用 JSON Lines 格式的逐周期输入驱动控制核心，输出产生的帧。
//!
//! ## 场景文件
//!
//! 每行一个 `CycleInput`，缺省字段取默认值；空行和 `#` 开头的行忽略：
//!
//! ```text
//! # 60 km/h 巡航，识别到 80 限速
//! {"cycle": 0, "engaged": true, "vehicle": {"v_ego_raw": 16.67, "traffic_sign_raw": 16.0}}
//! ```

use anyhow::{Context, Result};
use clap::Args;
use mqb_control::{ControlCycle, ControllerConfig, CycleInput, SessionState};
use mqb_protocol::{FramePayload, OutgoingFrame};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::verify::SteeringVerifier;

/// 回放命令参数
#[derive(Args, Debug)]
pub struct ReplayCommand {
    /// 场景文件路径（JSON Lines）
    #[arg(short, long)]
    pub input: PathBuf,

    /// 会话配置（缺省使用量产调校值）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 帧输出文件（缺省输出到标准输出）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 忽略文件中的周期号，按行号重新编号
    #[arg(long)]
    pub renumber: bool,

    /// 校验转向安全约束，发现违规时以错误退出
    #[arg(long)]
    pub verify: bool,

    /// 不输出帧，只打印汇总
    #[arg(short, long)]
    pub quiet: bool,
}

/// 一行帧输出
#[derive(Debug, Serialize)]
struct FrameRecord<'a> {
    cycle: u32,
    kind: &'static str,
    #[serde(flatten)]
    frame: &'a OutgoingFrame,
}

/// 按 (CAN ID, 总线) 汇总帧数
#[derive(Debug, Default)]
pub struct FrameSummary {
    counts: BTreeMap<(u32, u8), usize>,
}

impl FrameSummary {
    pub fn record(&mut self, frame: &OutgoingFrame) {
        *self.counts.entry((frame.id, frame.bus.index())).or_default() += 1;
    }

    #[cfg(test)]
    pub fn count(&self, id: u32, bus: u8) -> usize {
        self.counts.get(&(id, bus)).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn print(&self) {
        for ((id, bus), count) in &self.counts {
            let name = mqb_protocol::FrameKind::from_id(*id).name();
            eprintln!("  0x{:03X} {:<12} bus {}  {:>8}", id, name, bus, count);
        }
    }
}

/// 读取场景文件
pub fn read_scenario(path: &Path, renumber: bool) -> Result<Vec<CycleInput>> {
    let file =
        File::open(path).with_context(|| format!("无法打开场景文件: {}", path.display()))?;
    parse_scenario(BufReader::new(file), renumber)
}

fn parse_scenario<R: BufRead>(reader: R, renumber: bool) -> Result<Vec<CycleInput>> {
    let mut inputs = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut input: CycleInput = serde_json::from_str(trimmed)
            .with_context(|| format!("第 {} 行解析失败", index + 1))?;
        if renumber {
            input.cycle = inputs.len() as u32;
        }
        inputs.push(input);
    }
    Ok(inputs)
}

impl ReplayCommand {
    pub fn execute(&self) -> Result<()> {
        let config = match &self.config {
            Some(path) => ControllerConfig::load_from_file(path)
                .with_context(|| format!("配置无效: {}", path.display()))?,
            None => ControllerConfig::default(),
        };
        let inputs = read_scenario(&self.input, self.renumber)?;
        info!(cycles = inputs.len(), input = %self.input.display(), "replay started");

        let mut writer: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path)
                    .with_context(|| format!("无法创建输出文件: {}", path.display()))?,
            )),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };

        let control = ControlCycle::new(config)?;
        let mut session = SessionState::new();
        let mut summary = FrameSummary::default();
        let mut verifier = SteeringVerifier::new(&control.config().limits);

        for input in &inputs {
            for frame in control.step(&mut session, input) {
                summary.record(&frame);
                if let FramePayload::Steering(command) = &frame.payload {
                    verifier.observe(input, command);
                }
                if !self.quiet {
                    let record = FrameRecord {
                        cycle: input.cycle,
                        kind: frame.kind().name(),
                        frame: &frame,
                    };
                    serde_json::to_writer(&mut writer, &record)?;
                    writeln!(writer)?;
                }
            }
        }
        writer.flush()?;
        drop(writer);

        let diagnostics = session.diagnostics.snapshot();
        info!(frames = summary.total(), "replay finished");

        eprintln!();
        eprintln!("════════════════════════════════════════");
        eprintln!("           回放汇总");
        eprintln!("════════════════════════════════════════");
        eprintln!("周期数: {}", inputs.len());
        eprintln!("帧数:   {}", summary.total());
        summary.print();
        eprintln!("诊断:   {}", serde_json::to_string(&diagnostics)?);
        eprintln!(
            "速率限制命中率: {:.1}%",
            diagnostics.rate_limited_percent()
        );

        if self.verify {
            let violations = verifier.violations();
            if violations.is_empty() {
                eprintln!("✅ 转向约束校验通过（{} 帧）", verifier.frames());
            } else {
                for violation in violations.iter().take(20) {
                    warn!("{}", violation);
                }
                anyhow::bail!(
                    "❌ 转向约束校验失败：{} 帧中 {} 处违规",
                    verifier.frames(),
                    violations.len()
                );
            }
        }

        Ok(())
    }
}
