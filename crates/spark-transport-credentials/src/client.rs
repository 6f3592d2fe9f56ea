use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{
    config::TlsConfig,
    conn::{BoxedRawConnection, SecureConnection},
    context::HandshakeContext,
    contract::{AuthInfo, ProtocolInfo, TransportCredentials},
    error::CredentialsError,
    tls::TlsCredentials,
};

/// 配置变换函数：在克隆出的配置上覆盖若干字段。
///
/// 多个变换按注册顺序依次执行，同一字段后写者胜出。
pub type TlsOption = Arc<dyn Fn(&mut TlsConfig) + Send + Sync>;

/// 动态客户端传输凭据。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 拨号配置在连接建立后未必能安全替换，因此凭据对象本身保持不变，
///   而把“证书轮换、SNI 覆盖”等运行期调整表达为一串变换函数；
/// - 基础配置代表长期身份与信任材料，很少改变；轮换机制只需前插或追加一个变换。
///
/// ## 逻辑（How）
/// - [`latest_config`](Self::latest_config)：克隆基础配置，再按注册顺序依次应用全部变换；
/// - 每个公开操作都基于一次新的推导结果，推导出的配置彼此独立，
///   并发握手不会观察到对方的中间状态。
///
/// ## 契约（What）
/// - 除 [`override_server_name`](TransportCredentials::override_server_name) 外，
///   任何操作都不修改基础配置；
/// - `client_handshake` 委托给绑定在最新配置上的 [`TlsCredentials`]，尊重上下文取消与截止；
/// - `server_handshake` 总是返回固定错误；
/// - `info` 反映最新推导的配置，而非常量；
/// - `clone_credentials` 把当前推导结果冻结为静态 [`TlsCredentials`]；
///   需要保持动态性时应克隆本类型。
///
/// ## 风险与权衡（Trade-offs）
/// - 每次握手都要克隆并编译一次配置，以此换取无共享可变状态；
/// - 变换列表只能经由 `&mut self` 修改，跨任务共享时由持有者负责同步。
#[derive(Clone, Default)]
pub struct DynamicClientCredentials {
    base: TlsConfig,
    options: Vec<TlsOption>,
}

impl DynamicClientCredentials {
    pub fn new(base: TlsConfig, options: Vec<TlsOption>) -> Self {
        Self { base, options }
    }

    /// 以构建器风格追加一个变换。
    pub fn with_option(mut self, option: TlsOption) -> Self {
        self.options.push(option);
        self
    }

    /// 在末尾追加变换，其写入覆盖之前所有变换。
    pub fn push_option(&mut self, option: TlsOption) {
        self.options.push(option);
    }

    /// 在开头插入变换，其写入可被之后的变换覆盖。
    pub fn prepend_option(&mut self, option: TlsOption) {
        self.options.insert(0, option);
    }

    /// 已注册的变换，按执行顺序排列。
    pub fn options(&self) -> &[TlsOption] {
        &self.options
    }

    /// 基础配置。
    pub fn base(&self) -> &TlsConfig {
        &self.base
    }

    /// 推导本次握手使用的配置：克隆基础配置后按序应用全部变换。
    pub fn latest_config(&self) -> TlsConfig {
        let mut config = self.base.clone();
        for option in &self.options {
            option(&mut config);
        }
        config
    }
}

impl fmt::Debug for DynamicClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicClientCredentials")
            .field("base", &self.base)
            .field("options", &self.options.len())
            .finish()
    }
}

#[async_trait]
impl TransportCredentials for DynamicClientCredentials {
    async fn client_handshake(
        &self,
        ctx: &HandshakeContext,
        authority: &str,
        conn: BoxedRawConnection,
    ) -> Result<(SecureConnection, AuthInfo), CredentialsError> {
        let config = self.latest_config();
        tracing::debug!(
            authority,
            options = self.options.len(),
            server_name = config.server_name.as_deref().unwrap_or(""),
            "derived client TLS configuration"
        );
        TlsCredentials::new(config)
            .client_handshake(ctx, authority, conn)
            .await
    }

    async fn server_handshake(
        &self,
        _conn: BoxedRawConnection,
    ) -> Result<(SecureConnection, AuthInfo), CredentialsError> {
        Err(CredentialsError::ServerHandshakeNotImplemented)
    }

    fn info(&self) -> ProtocolInfo {
        TlsCredentials::new(self.latest_config()).info()
    }

    fn clone_credentials(&self) -> Box<dyn TransportCredentials> {
        Box::new(TlsCredentials::new(self.latest_config()))
    }

    /// 直接改写基础配置的 SNI，之后的每次推导都会带上新名称。
    fn override_server_name(&mut self, name: &str) -> Result<(), CredentialsError> {
        self.base.server_name = Some(name.to_string());
        Ok(())
    }
}
