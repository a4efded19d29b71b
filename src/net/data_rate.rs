//! 数据速率
//!
//! bit/s 为单位的速率，支持 `"100Mbps"`、`"5Mbps"`、`"1MBps"` 这类字符串。

use crate::sim::{ParseQuantityError, SimTime, split_quantity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 数据速率（bit/s）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataRate(u64);

impl DataRate {
    pub const fn from_bps(bps: u64) -> Self {
        Self(bps)
    }
    pub const fn from_kbps(kbps: u64) -> Self {
        Self(kbps.saturating_mul(1_000))
    }
    pub const fn from_mbps(mbps: u64) -> Self {
        Self(mbps.saturating_mul(1_000_000))
    }
    pub const fn from_gbps(gbps: u64) -> Self {
        Self(gbps.saturating_mul(1_000_000_000))
    }

    pub fn bps(self) -> u64 {
        self.0
    }

    /// 以该速率串行化 `bytes` 所需时间，向上取整到纳秒。速率为 0 时返回一个极大值。
    pub fn tx_time(self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.0 == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128) + (self.0 as u128 - 1)) / self.0 as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.0;
        if bps != 0 && bps % 1_000_000_000 == 0 {
            write!(f, "{}Gbps", bps / 1_000_000_000)
        } else if bps != 0 && bps % 1_000_000 == 0 {
            write!(f, "{}Mbps", bps / 1_000_000)
        } else if bps != 0 && bps % 1_000 == 0 {
            write!(f, "{}kbps", bps / 1_000)
        } else {
            write!(f, "{bps}bps")
        }
    }
}

impl FromStr for DataRate {
    type Err = ParseQuantityError;

    /// 无单位时按 bit/s 解析；`B` 结尾的单位按字节计。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, unit) = split_quantity(s)?;
        let bits_per_unit = match unit {
            "" | "bps" | "b/s" => 1.0,
            "kbps" | "Kbps" | "kb/s" => 1e3,
            "Mbps" | "mbps" | "Mb/s" => 1e6,
            "Gbps" | "gbps" | "Gb/s" => 1e9,
            "Bps" | "B/s" => 8.0,
            "kBps" | "KBps" | "kB/s" => 8e3,
            "MBps" | "MB/s" => 8e6,
            "GBps" | "GB/s" => 8e9,
            _ => {
                return Err(ParseQuantityError::Unit {
                    input: s.to_string(),
                    unit: unit.to_string(),
                });
            }
        };
        let bps = (value * bits_per_unit).round();
        if bps >= u64::MAX as f64 {
            return Err(ParseQuantityError::Range(s.to_string()));
        }
        Ok(DataRate(bps as u64))
    }
}

impl TryFrom<String> for DataRate {
    type Error = ParseQuantityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataRate> for String {
    fn from(r: DataRate) -> String {
        r.to_string()
    }
}
