use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::TlsConfig,
    conn::{BoxedRawConnection, SecureConnection},
    context::HandshakeContext,
    contract::{AuthInfo, ProtocolInfo, TransportCredentials},
    error::CredentialsError,
    handshake, policy,
};

/// 绑定到单一配置快照的标准 TLS 凭据。
///
/// 动态客户端凭据每次握手都委托给一个临时的 `TlsCredentials`，
/// `clone_credentials` 也以它作为“冻结”后的结果。
/// 构造时保证 ALPN 提案包含 `h2`。
#[derive(Clone, Debug)]
pub struct TlsCredentials {
    config: TlsConfig,
}

impl TlsCredentials {
    pub fn new(mut config: TlsConfig) -> Self {
        policy::ensure_h2(&mut config.alpn_protocols);
        Self { config }
    }

    /// 绑定的配置快照。
    pub fn config(&self) -> &TlsConfig {
        &self.config
    }
}

#[async_trait]
impl TransportCredentials for TlsCredentials {
    async fn client_handshake(
        &self,
        ctx: &HandshakeContext,
        authority: &str,
        conn: BoxedRawConnection,
    ) -> Result<(SecureConnection, AuthInfo), CredentialsError> {
        let server_name =
            handshake::resolve_server_name(self.config.server_name.as_deref(), authority);
        let client_config = self.config.client_config()?;
        handshake::connect(ctx, client_config, server_name, conn).await
    }

    async fn server_handshake(
        &self,
        conn: BoxedRawConnection,
    ) -> Result<(SecureConnection, AuthInfo), CredentialsError> {
        let server_config = Arc::new(self.config.server_config()?);
        handshake::accept(server_config, conn).await
    }

    fn info(&self) -> ProtocolInfo {
        ProtocolInfo {
            security_protocol: policy::SECURITY_PROTOCOL,
            security_version: self.config.max_version.as_str(),
            server_name: self.config.server_name.clone(),
        }
    }

    fn clone_credentials(&self) -> Box<dyn TransportCredentials> {
        Box::new(self.clone())
    }

    fn override_server_name(&mut self, name: &str) -> Result<(), CredentialsError> {
        self.config.server_name = Some(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsVersion;

    #[test]
    fn construction_appends_h2() {
        let mut config = TlsConfig::default();
        config.alpn_protocols = vec![b"http/1.1".to_vec()];
        let creds = TlsCredentials::new(config);
        assert_eq!(
            creds.config().alpn_protocols,
            vec![b"http/1.1".to_vec(), b"h2".to_vec()]
        );
    }

    #[test]
    fn info_follows_snapshot() {
        let config = TlsConfig::default()
            .with_versions(TlsVersion::Tls12, TlsVersion::Tls12)
            .with_server_name("peer.test");
        let mut creds = TlsCredentials::new(config);
        let info = creds.info();
        assert_eq!(info.security_protocol, "tls");
        assert_eq!(info.security_version, "1.2");
        assert_eq!(info.server_name.as_deref(), Some("peer.test"));

        creds.override_server_name("renamed.test").expect("override");
        assert_eq!(creds.info().server_name.as_deref(), Some("renamed.test"));
    }

    #[test]
    fn info_reports_configured_upper_version() {
        let creds = TlsCredentials::new(TlsConfig::default());
        assert_eq!(creds.info().security_version, "1.3");

        let pinned = TlsCredentials::new(
            TlsConfig::default().with_versions(TlsVersion::Tls12, TlsVersion::Tls12),
        );
        assert_eq!(pinned.info().security_version, "1.2");
    }

    #[tokio::test]
    async fn server_handshake_without_certificate_fails_fast() {
        let creds = TlsCredentials::new(TlsConfig::default());
        let (raw, _peer) = tokio::io::duplex(64);
        let err = creds
            .server_handshake(Box::new(raw))
            .await
            .expect_err("no certificate");
        assert!(matches!(err, CredentialsError::MissingServerCertificate));
    }
}
