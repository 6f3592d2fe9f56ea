use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustls::ServerConfig;

use crate::{config::TlsConfig, error::CredentialsError, policy};

/// 服务端 TLS 配置的共享热更新容器。
///
/// # 设计动机（Why）
/// - **零中断目标**：证书轮换、重签与吊销响应都要求在不重建 RPC 监听器的前提下生效，
///   服务端凭据因此只持有本容器的句柄，每次握手时读取当前值；
/// - **显式同步**：外部轮换机制与握手读取并发发生，容器以 RCU（Read-Copy-Update）
///   方式发布不可变快照，读路径无锁，写路径串行，不存在字段级数据竞争。
///
/// # 核心契约（What）
/// - **持有状态**：当前代 `TlsConfig` 及其预编译的 `rustls::ServerConfig`，附带单调递增的代号；
/// - **后置条件**：`update`/`replace` 成功返回后，后续 `server_config` 立即可见新配置；
///   已在进行中的握手继续使用各自持有的旧 `Arc`；
/// - **失败原子性**：新配置编译失败时返回错误，已发布的代保持不变；
/// - **策略钉死**：被服务端凭据接管后，每次写入都会重新施加 [`policy::enforce_server_policy`]，
///   保证 `min_version == max_version` 始终成立。
///
/// # 实现逻辑（How）
/// - `ArcSwap<Generation>` 保存配置与编译结果，二者总是同一代，读者不会看到错配；
/// - 写者持有 `parking_lot::Mutex`，在锁内克隆当前配置、应用修改、编译并原子替换。
///
/// # 风险提示（Trade-offs & Gotchas）
/// - **写入成本**：每次写入都完整编译一次 `ServerConfig`，高频写入应在外部合并；
/// - **内存峰值**：旧代在最后一个握手释放前不会回收。
#[derive(Clone)]
pub struct SharedTlsConfig {
    inner: Arc<SharedState>,
}

struct SharedState {
    current: ArcSwap<Generation>,
    writer: Mutex<()>,
    pinned: AtomicBool,
}

struct Generation {
    number: u64,
    config: Arc<TlsConfig>,
    server: Arc<ServerConfig>,
}

impl SharedTlsConfig {
    /// 以初始配置构造容器，初始配置必须能编译为服务端配置。
    pub fn new(initial: TlsConfig) -> Result<Self, CredentialsError> {
        let server = Arc::new(initial.server_config()?);
        Ok(Self {
            inner: Arc::new(SharedState {
                current: ArcSwap::from_pointee(Generation {
                    number: 0,
                    config: Arc::new(initial),
                    server,
                }),
                writer: Mutex::new(()),
                pinned: AtomicBool::new(false),
            }),
        })
    }

    /// 当前配置的只读快照。
    pub fn snapshot(&self) -> Arc<TlsConfig> {
        Arc::clone(&self.inner.current.load().config)
    }

    /// 当前已编译的服务端配置，握手路径上仅增加一次引用计数。
    pub fn server_config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.inner.current.load().server)
    }

    /// 当前代号，每次成功写入加一。
    pub fn generation(&self) -> u64 {
        self.inner.current.load().number
    }

    /// 基于当前配置做修改并发布新一代，返回新代号。
    pub fn update<F>(&self, mutate: F) -> Result<u64, CredentialsError>
    where
        F: FnOnce(&mut TlsConfig),
    {
        self.publish(mutate, false).map(|(number, _)| number)
    }

    /// 整体替换配置，返回被替换下来的旧配置。
    pub fn replace(&self, next: TlsConfig) -> Result<Arc<TlsConfig>, CredentialsError> {
        self.publish(move |config| *config = next, false)
            .map(|(_, previous)| previous)
    }

    /// 钉死服务端协议策略，此后所有写入都会重新施加策略。
    pub(crate) fn pin_protocol_policy(&self) -> Result<u64, CredentialsError> {
        self.publish(|_| {}, true).map(|(number, _)| number)
    }

    /// 是否已被服务端凭据钉死策略。
    pub fn is_policy_pinned(&self) -> bool {
        self.inner.pinned.load(Ordering::Acquire)
    }

    /// 在写锁内发布新一代，返回新代号与被替换的配置。
    fn publish<F>(
        &self,
        mutate: F,
        pin: bool,
    ) -> Result<(u64, Arc<TlsConfig>), CredentialsError>
    where
        F: FnOnce(&mut TlsConfig),
    {
        let _guard = self.inner.writer.lock();
        let current = self.inner.current.load_full();
        let mut next = TlsConfig::clone(&current.config);
        mutate(&mut next);
        if pin || self.is_policy_pinned() {
            policy::enforce_server_policy(&mut next);
        }
        let server = Arc::new(next.server_config()?);
        let number = current.number + 1;
        self.inner.current.store(Arc::new(Generation {
            number,
            config: Arc::new(next),
            server,
        }));
        if pin {
            self.inner.pinned.store(true, Ordering::Release);
        }
        tracing::info!(
            generation = number,
            pinned = self.is_policy_pinned(),
            "published TLS configuration"
        );
        Ok((number, Arc::clone(&current.config)))
    }
}

impl fmt::Debug for SharedTlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTlsConfig")
            .field("generation", &self.generation())
            .field("pinned", &self.is_policy_pinned())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TlsVersion, test_support::identity};

    fn shared() -> SharedTlsConfig {
        let config = TlsConfig::default().with_certificate(identity("localhost").certified);
        SharedTlsConfig::new(config).expect("initial config")
    }

    #[test]
    fn update_publishes_new_generation() {
        let shared = shared();
        assert_eq!(shared.generation(), 0);
        let generation = shared
            .update(|config| config.server_name = Some("rotated.test".into()))
            .expect("update");
        assert_eq!(generation, 1);
        assert_eq!(shared.snapshot().server_name.as_deref(), Some("rotated.test"));
    }

    #[test]
    fn failed_update_keeps_previous_generation() {
        let shared = shared();
        let before = shared.server_config();
        let err = shared
            .update(|config| config.certificates.clear())
            .expect_err("no certificate must be rejected");
        assert!(matches!(err, CredentialsError::MissingServerCertificate));
        assert_eq!(shared.generation(), 0);
        assert!(Arc::ptr_eq(&before, &shared.server_config()));
        assert_eq!(shared.snapshot().certificates.len(), 1);
    }

    #[test]
    fn pinned_policy_survives_later_updates() {
        let shared = shared();
        shared.pin_protocol_policy().expect("pin");
        shared
            .update(|config| {
                config.max_version = TlsVersion::Tls13;
                config.alpn_protocols = vec![b"http/1.1".to_vec()];
            })
            .expect("update");
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.min_version, snapshot.max_version);
        assert_eq!(snapshot.max_version, TlsVersion::Tls12);
        assert_eq!(snapshot.alpn_protocols, vec![b"h2".to_vec()]);
        assert_eq!(shared.server_config().alpn_protocols, vec![b"h2".to_vec()]);
    }

    #[test]
    fn clones_observe_same_state() {
        let shared = shared();
        let clone = shared.clone();
        let previous = shared
            .replace(TlsConfig::default().with_certificate(identity("other.test").certified))
            .expect("replace");
        assert!(previous.server_name.is_none());
        assert_eq!(clone.generation(), 1);
    }
}
