use std::time::Duration;

/// 退避方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    #[default]
    Fixed,
    Exponential,
}

/// 有界轮询策略：次数耗尽即放弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
    pub backoff: Backoff,
    /// 指数退避的单次等待上限。
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_ms: 300,
            backoff: Backoff::Fixed,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(attempts: u32, delay_ms: u64) -> Self {
        Self {
            attempts,
            delay_ms,
            backoff: Backoff::Fixed,
            ..Self::default()
        }
    }

    pub fn exponential(attempts: u32, delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            attempts,
            delay_ms,
            backoff: Backoff::Exponential,
            max_delay_ms,
        }
    }

    /// 第 `attempt` 次（从 0 开始）轮询前的等待时间。
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_ms = match self.backoff {
            Backoff::Fixed => self.delay_ms,
            Backoff::Exponential => self
                .delay_ms
                .saturating_mul(1u64 << attempt.min(16))
                .min(self.max_delay_ms.max(self.delay_ms)),
        };
        Duration::from_millis(delay_ms)
    }
}
