//! 限速偏移表
//!
//! 把识别到的限速档位（bucket）映射为目标巡航设定速度。
//! 只做精确匹配，不做插值：表中没有的档位不会触发任何调整。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 表中的一项（TOML 中以 `[[offsets.accel]]` 数组形式出现）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetEntry {
    /// 限速档位（km/h）
    pub bucket: u16,
    /// 目标设定速度（km/h）
    pub target: u16,
}

/// 偏移表
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<OffsetEntry>", into = "Vec<OffsetEntry>")]
pub struct OffsetTable {
    entries: BTreeMap<u16, u16>,
}

impl OffsetTable {
    /// 从 `(bucket, target)` 列表构建，后出现的重复档位覆盖前者
    pub fn from_pairs(pairs: &[(u16, u16)]) -> Self {
        Self {
            entries: pairs.iter().copied().collect(),
        }
    }

    /// 精确查找；负数或超出 u16 的档位视为未命中
    pub fn lookup(&self, bucket: i32) -> Option<i32> {
        let key = u16::try_from(bucket).ok()?;
        self.entries.get(&key).map(|target| i32::from(*target))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按档位升序遍历
    pub fn iter(&self) -> impl Iterator<Item = OffsetEntry> + '_ {
        self.entries
            .iter()
            .map(|(bucket, target)| OffsetEntry {
                bucket: *bucket,
                target: *target,
            })
    }
}

impl TryFrom<Vec<OffsetEntry>> for OffsetTable {
    type Error = String;

    fn try_from(entries: Vec<OffsetEntry>) -> Result<Self, Self::Error> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if map.insert(entry.bucket, entry.target).is_some() {
                return Err(format!("duplicate offset bucket {}", entry.bucket));
            }
        }
        Ok(Self { entries: map })
    }
}

impl From<OffsetTable> for Vec<OffsetEntry> {
    fn from(table: OffsetTable) -> Self {
        table.iter().collect()
    }
}

/// 偏移表的使用场景
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetTableKind {
    /// 系统未接管时预设巡航速度
    NotEngaged,
    /// 当前车速低于新限速
    Accel,
    /// 当前车速高于新限速
    Decel,
}

impl OffsetTableKind {
    pub fn name(self) -> &'static str {
        match self {
            OffsetTableKind::NotEngaged => "not_engaged",
            OffsetTableKind::Accel => "accel",
            OffsetTableKind::Decel => "decel",
        }
    }
}

/// 三张偏移表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetTables {
    pub not_engaged: OffsetTable,
    pub accel: OffsetTable,
    pub decel: OffsetTable,
}

impl OffsetTables {
    /// 按场景取表
    pub fn table(&self, kind: OffsetTableKind) -> &OffsetTable {
        match kind {
            OffsetTableKind::NotEngaged => &self.not_engaged,
            OffsetTableKind::Accel => &self.accel,
            OffsetTableKind::Decel => &self.decel,
        }
    }

    pub fn lookup(&self, kind: OffsetTableKind, bucket: i32) -> Option<i32> {
        self.table(kind).lookup(bucket)
    }
}

impl Default for OffsetTables {
    /// 量产调校值
    ///
    /// 注意：40、90 等档位不在表内，这些限速不会触发任何调整。
    fn default() -> Self {
        Self {
            not_engaged: OffsetTable::from_pairs(&[
                (0, 30),
                (30, 30),
                (50, 50),
                (60, 60),
                (70, 70),
                (80, 80),
                (100, 100),
                (110, 110),
                (120, 120),
            ]),
            accel: OffsetTable::from_pairs(&[
                (0, 30),
                (30, 30),
                (50, 52),
                (60, 62),
                (70, 72),
                (80, 82),
                (100, 103),
                (110, 110),
                (120, 122),
            ]),
            decel: OffsetTable::from_pairs(&[
                (50, 53),
                (60, 64),
                (80, 90),
                (100, 103),
                (110, 113),
                (120, 123),
            ]),
        }
    }
}
