use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    conn::{BoxedRawConnection, SecureConnection},
    context::HandshakeContext,
    contract::{AuthInfo, ProtocolInfo, TransportCredentials},
    error::CredentialsError,
    handshake,
    logging::HandshakeLogger,
    policy,
    shared::SharedTlsConfig,
};

/// 服务端传输凭据。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - RPC 监听器只绑定一次凭据对象，而证书需要在进程持续服务时轮换；
///   本类型只持有 [`SharedTlsConfig`] 句柄，每次握手读取当时的配置，
///   外部对共享配置的修改无需重建凭据即对后续握手生效。
///
/// ## 契约（What）
/// - 构造时把 ALPN 覆盖为 `["h2"]`，并把版本上下限钉死为 TLS 1.2；
/// - `server_handshake` 失败时（若注入了日志器）记录一次对端地址与错误，随后原样返回，
///   不重试、不回退明文；
/// - 客户端握手与 `override_server_name` 总是返回固定错误，防止误当客户端凭据使用；
/// - `info` 为静态描述 `tls`/`1.2`，与实时配置无关；
/// - 克隆共享同一配置容器与日志器，克隆体同样能观察到后续轮换。
#[derive(Clone, Debug)]
pub struct ServerCredentials {
    config: SharedTlsConfig,
    logger: Option<Arc<dyn HandshakeLogger>>,
}

impl ServerCredentials {
    /// 接管共享配置并施加服务端协议策略。
    ///
    /// 策略写入会发布新一代配置；若钉死后的配置无法编译（例如密码套件只剩 TLS 1.3），
    /// 返回错误且配置保持原样。
    pub fn new(
        config: SharedTlsConfig,
        logger: Option<Arc<dyn HandshakeLogger>>,
    ) -> Result<Self, CredentialsError> {
        config.pin_protocol_policy()?;
        Ok(Self { config, logger })
    }

    /// 返回共享配置句柄，供外部轮换机制写入。
    pub fn shared_config(&self) -> &SharedTlsConfig {
        &self.config
    }
}

#[async_trait]
impl TransportCredentials for ServerCredentials {
    async fn client_handshake(
        &self,
        _ctx: &HandshakeContext,
        _authority: &str,
        _conn: BoxedRawConnection,
    ) -> Result<(SecureConnection, AuthInfo), CredentialsError> {
        Err(CredentialsError::ClientHandshakeNotImplemented)
    }

    async fn server_handshake(
        &self,
        conn: BoxedRawConnection,
    ) -> Result<(SecureConnection, AuthInfo), CredentialsError> {
        let remote_addr = conn.remote_addr();
        // 读取调用时刻的配置，而非构造时刻。
        let config = self.config.server_config();
        match handshake::accept(config, conn).await {
            Ok(secured) => Ok(secured),
            Err(err) => {
                if let Some(logger) = &self.logger {
                    logger.handshake_failed(remote_addr, &err);
                }
                Err(err)
            }
        }
    }

    fn info(&self) -> ProtocolInfo {
        policy::server_protocol_info()
    }

    fn clone_credentials(&self) -> Box<dyn TransportCredentials> {
        Box::new(self.clone())
    }

    fn override_server_name(&mut self, _name: &str) -> Result<(), CredentialsError> {
        Err(CredentialsError::OverrideServerNameNotSupported)
    }
}
