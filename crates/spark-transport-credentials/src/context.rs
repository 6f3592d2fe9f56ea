use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;

/// 取消原语，跨任务共享同一原子位。
///
/// # 契约说明（What）
/// - 构造时处于“未取消”状态；
/// - `cancel` 首次成功置位时返回 `true`，重复调用返回 `false`；
/// - 克隆出的实例共享同一状态，任一方取消对所有持有者可见。
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// 创建处于“未取消”状态的取消令牌。
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询当前是否已被标记取消。
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// 将当前令牌标记为取消。
    pub fn cancel(&self) -> bool {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// 截止原语，可以为空（未设置）。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadline {
    instant: Option<Instant>,
}

impl Deadline {
    /// 未设置截止时间。
    pub const fn none() -> Self {
        Self { instant: None }
    }

    /// 以绝对时间点构造。
    pub fn at(instant: Instant) -> Self {
        Self {
            instant: Some(instant),
        }
    }

    /// 以“当前时间 + 超时”构造。
    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    /// 返回内部时间点。
    pub fn instant(&self) -> Option<Instant> {
        self.instant
    }

    /// 判断是否已经到期。
    pub fn is_expired(&self) -> bool {
        self.instant.is_some_and(|deadline| deadline <= Instant::now())
    }
}

/// 客户端握手的调用上下文，携带取消与截止语义。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 拨号层需要能主动放弃一次握手（连接池关闭、整体调用超时），
///   并让调用方区分“对端拒绝”与“我方放弃”；
///
/// ## 契约（What）
/// - 握手开始前若已取消或已到期，立即失败，不触碰连接；
/// - 握手进行中取消或到期，握手 Future 被丢弃，原始连接随之关闭；
/// - 克隆成本为常数，取消状态在克隆之间共享。
#[derive(Clone, Debug, Default)]
pub struct HandshakeContext {
    cancellation: Cancellation,
    deadline: Deadline,
}

impl HandshakeContext {
    /// 创建上下文构建器。
    pub fn builder() -> HandshakeContextBuilder {
        HandshakeContextBuilder::default()
    }

    /// 获取取消原语。
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// 查询截止时间。
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }
}

impl fmt::Display for HandshakeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let remaining = match self.deadline.instant() {
            Some(instant) => format!(
                "{:?}",
                instant.saturating_duration_since(Instant::now())
            ),
            None => "none".to_string(),
        };
        write!(
            f,
            "HandshakeContext{{cancelled={}, remaining={}}}",
            self.cancellation.is_cancelled(),
            remaining
        )
    }
}

/// `HandshakeContext` 构建器。
#[derive(Debug, Default)]
pub struct HandshakeContextBuilder {
    cancellation: Cancellation,
    deadline: Deadline,
}

impl HandshakeContextBuilder {
    /// 设置取消原语。
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// 设置截止时间。
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// 以相对超时设置截止时间。
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Deadline::after(timeout))
    }

    pub fn build(self) -> HandshakeContext {
        HandshakeContext {
            cancellation: self.cancellation,
            deadline: self.deadline,
        }
    }
}
