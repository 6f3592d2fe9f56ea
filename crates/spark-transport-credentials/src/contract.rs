use std::fmt;

use async_trait::async_trait;
use rustls::{CipherSuite, CommonState, pki_types::CertificateDer};

use crate::{
    config::TlsVersion,
    conn::{BoxedRawConnection, SecureConnection},
    context::HandshakeContext,
    error::CredentialsError,
};

/// 传输凭据能力契约。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - RPC 框架在监听器或拨号策略创建时绑定一次凭据对象，此后只通过本 trait 调用握手；
/// - 服务端与客户端凭据是两个独立类型，各自对不支持的方向返回固定错误，
///   而不是在共享字段上用角色标志分支。
///
/// ## 契约（What）
/// - `client_handshake`：以客户端角色完成握手，必须尊重 `ctx` 的取消与截止；
/// - `server_handshake`：以服务端角色完成握手，不接受上下文，超时依赖原始连接自身；
/// - 成功时返回安全连接与认证信息，失败时仅返回错误，原始连接已被消费并关闭；
/// - `info`：协议描述；`clone_credentials`：满足框架的克隆约定；
/// - `override_server_name`：仅客户端语义，服务端实现返回固定错误。
#[async_trait]
pub trait TransportCredentials: Send + Sync + fmt::Debug {
    async fn client_handshake(
        &self,
        ctx: &HandshakeContext,
        authority: &str,
        conn: BoxedRawConnection,
    ) -> Result<(SecureConnection, AuthInfo), CredentialsError>;

    async fn server_handshake(
        &self,
        conn: BoxedRawConnection,
    ) -> Result<(SecureConnection, AuthInfo), CredentialsError>;

    fn info(&self) -> ProtocolInfo;

    fn clone_credentials(&self) -> Box<dyn TransportCredentials>;

    fn override_server_name(&mut self, name: &str) -> Result<(), CredentialsError>;
}

/// 凭据对外报告的协议描述。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolInfo {
    /// 安全协议名，固定为 `"tls"`。
    pub security_protocol: &'static str,
    /// 安全协议版本，例如 `"1.2"`。
    pub security_version: &'static str,
    /// 客户端将使用的 SNI（若已配置）。
    pub server_name: Option<String>,
}

/// 握手成功后交给 RPC 框架的认证元数据。
///
/// 对框架而言是不透明的，授权决策在握手之后由调用方基于这些字段完成。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthInfo {
    pub protocol_version: Option<TlsVersion>,
    pub cipher_suite: Option<CipherSuite>,
    pub alpn_protocol: Option<Vec<u8>>,
    pub server_name: Option<String>,
    pub peer_certificates: Vec<CertificateDer<'static>>,
}

impl AuthInfo {
    /// 认证类型标识。
    pub fn auth_type(&self) -> &'static str {
        "tls"
    }

    pub(crate) fn from_state(state: &CommonState, server_name: Option<String>) -> Self {
        Self {
            protocol_version: state.protocol_version().and_then(TlsVersion::from_protocol),
            cipher_suite: state.negotiated_cipher_suite().map(|suite| suite.suite()),
            alpn_protocol: state.alpn_protocol().map(<[u8]>::to_vec),
            server_name,
            peer_certificates: state
                .peer_certificates()
                .map(<[CertificateDer<'static>]>::to_vec)
                .unwrap_or_default(),
        }
    }
}
