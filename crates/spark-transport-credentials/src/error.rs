use std::io;

use rustls::{AlertDescription, Error as RustlsError, server::VerifierBuilderError};
use thiserror::Error;

/// 凭据层错误。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 把“角色误用”“配置无效”“握手失败”“取消/超时”四类问题收敛到同一枚举，
///   让 RPC 框架只需匹配一个类型即可决定连接级后果；
/// - 每个变体都带稳定错误码（[`CredentialsError::code`]），运维脚本无需解析文案。
///
/// ## 契约（What）
/// - 角色误用类错误是固定值，重复调用始终得到同一变体，永不重试；
/// - `Handshake` 原样保存底层 `io::Error`，其中可能嵌套 `rustls::Error`，
///   [`CredentialsError::category`] 会向下探查以细分类别；
/// - `Cancelled` 与 `TimedOut` 仅由客户端握手产生，与对端拒绝严格区分。
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// 在服务端凭据上调用了客户端握手。
    #[error("client handshakes are not implemented with server credentials")]
    ClientHandshakeNotImplemented,
    /// 在客户端凭据上调用了服务端握手。
    #[error("server handshakes are not implemented with client credentials")]
    ServerHandshakeNotImplemented,
    /// 服务端凭据不支持覆盖对端主机名。
    #[error("override_server_name is not supported by server credentials")]
    OverrideServerNameNotSupported,
    /// 配置中既没有证书也没有证书解析器，无法充当 TLS 服务端。
    #[error("server TLS configuration has no certificate")]
    MissingServerCertificate,
    /// `min_version` 高于 `max_version`。
    #[error("invalid TLS version range: min {min} > max {max}")]
    InvalidVersionRange {
        min: &'static str,
        max: &'static str,
    },
    /// SNI 既不是合法 DNS 名称也不是 IP 地址。
    #[error("invalid server name `{name}`")]
    InvalidServerName { name: String },
    /// `rustls` 在构建配置或装载密钥时报告的错误。
    #[error("tls configuration rejected: {0}")]
    Tls(#[from] RustlsError),
    /// 客户端证书校验器构建失败（例如要求双向认证却没有信任根）。
    #[error("client certificate verifier rejected: {0}")]
    ClientVerifier(#[from] VerifierBuilderError),
    /// TOML 配置解析失败。
    #[error("invalid tls settings: {0}")]
    Settings(#[from] toml::de::Error),
    /// 握手过程中的 IO 或 TLS 协商错误。
    #[error("tls handshake failed: {source}")]
    Handshake {
        /// 底层错误，`tokio-rustls` 会把 `rustls::Error` 包装在其中。
        source: io::Error,
    },
    /// 上下文在握手完成前被取消。
    #[error("tls handshake cancelled")]
    Cancelled,
    /// 上下文截止时间在握手完成前到期。
    #[error("tls handshake timed out")]
    TimedOut,
}

/// 错误的语义分类，供上层决定拒绝、告警或计数。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 调用方把凭据用在了错误的角色上，属于编程错误。
    Misuse,
    /// 配置无法编译为可用的 TLS 参数。
    Configuration,
    /// 证书缺失、不受信任或已被对端拒绝。
    Authentication,
    /// 协议违规、版本或 ALPN 不匹配等完整性问题。
    Integrity,
    /// 网络层中断，与安全无关。
    Transport,
    /// 调用方主动取消。
    Cancelled,
    /// 截止时间到期。
    Timeout,
}

impl From<io::Error> for CredentialsError {
    fn from(source: io::Error) -> Self {
        CredentialsError::Handshake { source }
    }
}

impl CredentialsError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::ClientHandshakeNotImplemented => {
                "spark.transport.credentials.client_handshake_unsupported"
            }
            Self::ServerHandshakeNotImplemented => {
                "spark.transport.credentials.server_handshake_unsupported"
            }
            Self::OverrideServerNameNotSupported => {
                "spark.transport.credentials.override_server_name_unsupported"
            }
            Self::MissingServerCertificate => "spark.transport.credentials.missing_certificate",
            Self::InvalidVersionRange { .. } => "spark.transport.credentials.invalid_version_range",
            Self::InvalidServerName { .. } => "spark.transport.credentials.invalid_server_name",
            Self::Tls(_) => "spark.transport.credentials.tls_config",
            Self::ClientVerifier(_) => "spark.transport.credentials.client_verifier",
            Self::Settings(_) => "spark.transport.credentials.settings",
            Self::Handshake { .. } => "spark.transport.credentials.handshake_failed",
            Self::Cancelled => "spark.transport.credentials.cancelled",
            Self::TimedOut => "spark.transport.credentials.timeout",
        }
    }

    /// 推导错误类别。
    ///
    /// 握手错误会先尝试取出嵌套的 `rustls::Error`，取不到时再按 `io::ErrorKind` 归类。
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ClientHandshakeNotImplemented
            | Self::ServerHandshakeNotImplemented
            | Self::OverrideServerNameNotSupported => ErrorCategory::Misuse,
            Self::MissingServerCertificate
            | Self::InvalidVersionRange { .. }
            | Self::InvalidServerName { .. }
            | Self::Tls(_)
            | Self::ClientVerifier(_)
            | Self::Settings(_) => ErrorCategory::Configuration,
            Self::Handshake { source } => categorize_handshake(source),
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::TimedOut => ErrorCategory::Timeout,
        }
    }

    /// 是否为角色误用类错误。
    pub fn is_role_misuse(&self) -> bool {
        self.category() == ErrorCategory::Misuse
    }
}

fn categorize_handshake(error: &io::Error) -> ErrorCategory {
    if let Some(source) = error.get_ref()
        && let Some(rustls_error) = source.downcast_ref::<RustlsError>()
    {
        return categorize_rustls_error(rustls_error);
    }
    ErrorCategory::Transport
}

fn categorize_rustls_error(error: &RustlsError) -> ErrorCategory {
    use RustlsError::*;
    match error {
        NoCertificatesPresented
        | InvalidCertificate(_)
        | InvalidCertRevocationList(_)
        | UnsupportedNameType => ErrorCategory::Authentication,
        AlertReceived(alert) => alert_to_category(alert),
        InappropriateMessage { .. }
        | InappropriateHandshakeMessage { .. }
        | InvalidMessage(_)
        | PeerMisbehaved(_)
        | PeerIncompatible(_)
        | DecryptError
        | PeerSentOversizedRecord
        | NoApplicationProtocol => ErrorCategory::Integrity,
        _ => ErrorCategory::Transport,
    }
}

fn alert_to_category(alert: &AlertDescription) -> ErrorCategory {
    use AlertDescription::*;
    match alert {
        BadCertificate
        | UnsupportedCertificate
        | CertificateRevoked
        | CertificateExpired
        | CertificateUnknown
        | UnknownCA
        | NoCertificate
        | CertificateRequired
        | AccessDenied => ErrorCategory::Authentication,
        CloseNotify | UserCanceled => ErrorCategory::Transport,
        _ => ErrorCategory::Integrity,
    }
}
