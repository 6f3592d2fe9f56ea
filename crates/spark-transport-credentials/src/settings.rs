use serde::Deserialize;

use crate::{
    config::{ClientAuthMode, TlsConfig, TlsVersion},
    error::CredentialsError,
};

/// 可声明式配置的 TLS 参数。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 版本区间、ALPN、SNI 与客户端认证模式属于部署参数，适合随服务配置文件下发；
///   证书与私钥的装载则留给调用方，避免本 crate 接触文件系统。
///
/// ## 契约（What）
/// - 所有字段可选，缺省字段在 [`apply`](Self::apply) 时保持目标配置原值；
/// - 版本写作 `"1.2"` / `"1.3"`，认证模式写作 `"none"` / `"request"` / `"require"`；
/// - 未知键直接拒绝，拼写错误不会被静默忽略。
///
/// ```toml
/// min_version = "1.2"
/// max_version = "1.3"
/// alpn_protocols = ["h2"]
/// server_name = "peer.example"
/// client_auth = "require"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsSettings {
    pub min_version: Option<TlsVersion>,
    pub max_version: Option<TlsVersion>,
    pub alpn_protocols: Option<Vec<String>>,
    pub server_name: Option<String>,
    pub client_auth: Option<ClientAuthMode>,
}

impl TlsSettings {
    /// 从 TOML 文本解析。
    pub fn from_toml(source: &str) -> Result<Self, CredentialsError> {
        Ok(toml::from_str(source)?)
    }

    /// 把已声明的字段写入配置。
    pub fn apply(&self, config: &mut TlsConfig) {
        if let Some(min) = self.min_version {
            config.min_version = min;
        }
        if let Some(max) = self.max_version {
            config.max_version = max;
        }
        if let Some(protocols) = &self.alpn_protocols {
            config.alpn_protocols = protocols.iter().map(|p| p.as_bytes().to_vec()).collect();
        }
        if let Some(name) = &self.server_name {
            config.server_name = Some(name.clone());
        }
        if let Some(mode) = self.client_auth {
            config.client_auth = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn parses_full_document() {
        let settings = TlsSettings::from_toml(
            r#"
            min_version = "1.2"
            max_version = "1.3"
            alpn_protocols = ["h2", "http/1.1"]
            server_name = "peer.example"
            client_auth = "require"
            "#,
        )
        .expect("parse");

        let mut config = TlsConfig::default();
        settings.apply(&mut config);
        assert_eq!(config.min_version, TlsVersion::Tls12);
        assert_eq!(config.max_version, TlsVersion::Tls13);
        assert_eq!(
            config.alpn_protocols,
            vec![b"h2".to_vec(), b"http/1.1".to_vec()]
        );
        assert_eq!(config.server_name.as_deref(), Some("peer.example"));
        assert_eq!(config.client_auth, ClientAuthMode::Require);
    }

    #[test]
    fn empty_document_changes_nothing() {
        let settings = TlsSettings::from_toml("").expect("parse");
        assert_eq!(settings, TlsSettings::default());

        let mut config = TlsConfig::default().with_server_name("kept.test");
        settings.apply(&mut config);
        assert_eq!(config.server_name.as_deref(), Some("kept.test"));
        assert_eq!(config.max_version, TlsVersion::Tls13);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = TlsSettings::from_toml(r#"max_versoin = "1.2""#).expect_err("typo");
        assert!(matches!(err, CredentialsError::Settings(_)));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = TlsSettings::from_toml(r#"min_version = "1.1""#).expect_err("1.1");
        assert!(matches!(err, CredentialsError::Settings(_)));
    }
}
