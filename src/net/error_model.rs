//! 接收端错误模型
//!
//! 按给定错误率判定到达的数据包是否损坏；损坏的包在接收端被丢弃。

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 错误率的计量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorUnit {
    /// 每个字节独立出错：包损坏概率 = 1 - (1 - rate)^bytes
    #[default]
    Byte,
    /// 每个包以 rate 概率出错
    Packet,
}

/// 固定错误率模型
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateErrorModel {
    rate: f64,
    unit: ErrorUnit,
}

impl RateErrorModel {
    /// `rate` 会被截断到 [0, 1]。
    pub fn new(rate: f64, unit: ErrorUnit) -> Self {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        Self { rate, unit }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn unit(&self) -> ErrorUnit {
        self.unit
    }

    /// 该大小的包被判定损坏的概率
    pub fn corrupt_probability(&self, size_bytes: u32) -> f64 {
        match self.unit {
            ErrorUnit::Packet => self.rate,
            ErrorUnit::Byte => 1.0 - (1.0 - self.rate).powf(size_bytes as f64),
        }
    }

    /// 由调用方提供 `rng`，保证所有随机性都来自网络持有的同一个可复现随机源。
    pub fn is_corrupt<R: Rng>(&self, size_bytes: u32, rng: &mut R) -> bool {
        let p = self.corrupt_probability(size_bytes);
        if p <= 0.0 {
            return false;
        }
        rng.r#gen::<f64>() < p
    }
}
