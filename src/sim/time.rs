//! 仿真时间类型
//!
//! 定义仿真时间及其单位转换、字符串解析（例如 `"2ms"`、`"1.5s"`）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 仿真时间（纳秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(u64::MAX);

    pub fn from_nanos(ns: u64) -> SimTime {
        SimTime(ns)
    }
    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000_000_000))
    }

    /// 秒（浮点）转纳秒，四舍五入；负数与 NaN 视为 0。
    pub fn from_secs_f64(s: f64) -> SimTime {
        let ns = (s * 1e9).round();
        if ns.is_nan() || ns <= 0.0 {
            SimTime::ZERO
        } else if ns >= u64::MAX as f64 {
            SimTime::MAX
        } else {
            SimTime(ns as u64)
        }
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    pub fn saturating_add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / 1_000_000_000;
        let nanos = self.0 % 1_000_000_000;
        if nanos == 0 {
            write!(f, "{secs}s")
        } else if nanos % 1_000_000 == 0 && secs == 0 {
            write!(f, "{}ms", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 && secs == 0 {
            write!(f, "{}us", nanos / 1_000)
        } else if secs == 0 {
            write!(f, "{nanos}ns")
        } else {
            write!(f, "{secs}.{nanos:09}s")
        }
    }
}

/// 时间/速率字符串解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseQuantityError {
    #[error("empty value")]
    Empty,
    #[error("invalid number in {0:?}")]
    Number(String),
    #[error("unknown unit {unit:?} in {input:?}")]
    Unit { input: String, unit: String },
    #[error("value out of range: {0:?}")]
    Range(String),
}

/// 把 `"1.5ms"`、`"1e-3s"` 拆成数值与单位。
pub(crate) fn split_quantity(input: &str) -> Result<(f64, &str), ParseQuantityError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ParseQuantityError::Empty);
    }
    let idx = unit_start(s);
    let (num, unit) = s.split_at(idx);
    let value: f64 = num
        .trim()
        .parse()
        .map_err(|_| ParseQuantityError::Number(input.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ParseQuantityError::Range(input.to_string()));
    }
    Ok((value, unit.trim()))
}

/// 单位起始位置；数字后的 `e`/`E` 若跟着（带符号的）数字则视为指数。
fn unit_start(s: &str) -> usize {
    let b = s.as_bytes();
    let mut i = 0;
    while i < b.len() {
        let c = b[i];
        if (c == b'e' || c == b'E') && i > 0 && (b[i - 1].is_ascii_digit() || b[i - 1] == b'.') {
            let mut j = i + 1;
            if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
                j += 1;
            }
            if j < b.len() && b[j].is_ascii_digit() {
                i = j;
                continue;
            }
        }
        if c.is_ascii_alphabetic() || c == b'/' {
            return i;
        }
        i += 1;
    }
    b.len()
}

impl FromStr for SimTime {
    type Err = ParseQuantityError;

    /// 无单位时按秒解析。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, unit) = split_quantity(s)?;
        let ns_per_unit = match unit {
            "ns" => 1.0,
            "us" => 1e3,
            "ms" => 1e6,
            "" | "s" => 1e9,
            "min" => 60e9,
            "h" => 3_600e9,
            _ => {
                return Err(ParseQuantityError::Unit {
                    input: s.to_string(),
                    unit: unit.to_string(),
                });
            }
        };
        let ns = (value * ns_per_unit).round();
        if ns >= u64::MAX as f64 {
            return Err(ParseQuantityError::Range(s.to_string()));
        }
        Ok(SimTime(ns as u64))
    }
}

impl TryFrom<String> for SimTime {
    type Error = ParseQuantityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SimTime> for String {
    fn from(t: SimTime) -> String {
        t.to_string()
    }
}
