use std::{fmt, sync::Arc};

use rustls::{
    ClientConfig, ProtocolVersion, RootCertStore, ServerConfig, SignatureScheme,
    SupportedCipherSuite, SupportedProtocolVersion,
    client::ResolvesClientCert,
    crypto::CryptoProvider,
    pki_types::{CertificateDer, PrivateKeyDer},
    server::{ClientHello, ResolvesServerCert, WebPkiClientVerifier},
    sign::CertifiedKey,
    version,
};
use serde::Deserialize;

use crate::error::CredentialsError;

/// 支持的 TLS 协议版本，按新旧排序以便比较区间。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "1.2")]
    Tls12,
    #[serde(rename = "1.3")]
    Tls13,
}

impl TlsVersion {
    /// 形如 `"1.2"` 的版本文案，用于 `ProtocolInfo::security_version`。
    pub const fn as_str(self) -> &'static str {
        match self {
            TlsVersion::Tls12 => "1.2",
            TlsVersion::Tls13 => "1.3",
        }
    }

    /// 从握手协商结果映射，未知版本返回 `None`。
    pub fn from_protocol(version: ProtocolVersion) -> Option<Self> {
        match version {
            ProtocolVersion::TLSv1_2 => Some(TlsVersion::Tls12),
            ProtocolVersion::TLSv1_3 => Some(TlsVersion::Tls13),
            _ => None,
        }
    }

    fn supported(self) -> &'static SupportedProtocolVersion {
        match self {
            TlsVersion::Tls12 => &version::TLS12,
            TlsVersion::Tls13 => &version::TLS13,
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 服务端对客户端证书的要求。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuthMode {
    /// 不请求客户端证书。
    #[default]
    None,
    /// 请求但不强制，出示的证书仍需通过信任根校验。
    Request,
    /// 强制双向认证。
    Require,
}

/// 一次握手所需的全部可变 TLS 材料。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 作为两个凭据适配器共同操作的“配置对象”：服务端经由
///   [`SharedTlsConfig`](crate::SharedTlsConfig) 共享它，客户端则在每次握手前克隆基础配置
///   再叠加变换函数；
/// - `rustls` 的 `ServerConfig`/`ClientConfig` 在构建后不再暴露版本区间等字段，
///   因此这里保留可逐字段改写的原始形态，需要时再编译。
///
/// ## 契约（What）
/// - 字段全部公开，变换函数按字段覆盖，后写者胜出；
/// - `certificates` 的第一项作为服务端默认证书与客户端认证证书；设置了
///   `cert_resolver` 时服务端改由解析器选证；
/// - `cipher_suites` 为 `Some` 时仅保留列出的套件；
/// - 克隆只复制 `Arc` 句柄，证书与信任根在克隆之间共享且不可变。
///
/// ## 风险与权衡（Trade-offs）
/// - 每次编译都会新建 `rustls` 配置，服务端通过
///   [`SharedTlsConfig`](crate::SharedTlsConfig) 在写入时预编译来规避握手路径上的开销；
///   客户端则为隔离性接受每次握手一次编译。
#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub certificates: Vec<Arc<CertifiedKey>>,
    pub cert_resolver: Option<Arc<dyn ResolvesServerCert>>,
    pub roots: Arc<RootCertStore>,
    pub client_auth: ClientAuthMode,
    pub min_version: TlsVersion,
    pub max_version: TlsVersion,
    pub alpn_protocols: Vec<Vec<u8>>,
    pub server_name: Option<String>,
    pub cipher_suites: Option<Vec<SupportedCipherSuite>>,
    pub provider: Arc<CryptoProvider>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            certificates: Vec::new(),
            cert_resolver: None,
            roots: Arc::new(RootCertStore::empty()),
            client_auth: ClientAuthMode::None,
            min_version: TlsVersion::Tls12,
            max_version: TlsVersion::Tls13,
            alpn_protocols: Vec::new(),
            server_name: None,
            cipher_suites: None,
            provider: default_provider(),
        }
    }
}

impl TlsConfig {
    /// 追加一张证书。
    pub fn with_certificate(mut self, certificate: Arc<CertifiedKey>) -> Self {
        self.certificates.push(certificate);
        self
    }

    /// 设置信任根。
    pub fn with_roots(mut self, roots: impl Into<Arc<RootCertStore>>) -> Self {
        self.roots = roots.into();
        self
    }

    /// 设置 SNI。
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// 设置客户端认证模式。
    pub fn with_client_auth(mut self, mode: ClientAuthMode) -> Self {
        self.client_auth = mode;
        self
    }

    /// 设置版本区间。
    pub fn with_versions(mut self, min: TlsVersion, max: TlsVersion) -> Self {
        self.min_version = min;
        self.max_version = max;
        self
    }

    /// 用当前加密后端装载证书链与私钥。
    ///
    /// 证书与私钥的来源（文件、KMS 等）由调用方负责，这里只完成签名密钥的解析。
    pub fn load_certificate(
        &self,
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Arc<CertifiedKey>, CredentialsError> {
        let signing_key = self.provider.key_provider.load_private_key(key)?;
        Ok(Arc::new(CertifiedKey::new(chain, signing_key)))
    }

    /// 编译为 `rustls` 服务端配置。
    pub fn server_config(&self) -> Result<ServerConfig, CredentialsError> {
        let resolver: Arc<dyn ResolvesServerCert> =
            match (&self.cert_resolver, self.certificates.first()) {
                (Some(resolver), _) => Arc::clone(resolver),
                (None, Some(certificate)) => Arc::new(StaticServerCert(Arc::clone(certificate))),
                (None, None) => return Err(CredentialsError::MissingServerCertificate),
            };
        let provider = self.effective_provider();
        let builder = ServerConfig::builder_with_provider(Arc::clone(&provider))
            .with_protocol_versions(&self.protocol_versions()?)?;
        let builder = match self.client_auth {
            ClientAuthMode::None => builder.with_no_client_auth(),
            ClientAuthMode::Request => builder.with_client_cert_verifier(
                WebPkiClientVerifier::builder_with_provider(Arc::clone(&self.roots), provider)
                    .allow_unauthenticated()
                    .build()?,
            ),
            ClientAuthMode::Require => builder.with_client_cert_verifier(
                WebPkiClientVerifier::builder_with_provider(Arc::clone(&self.roots), provider)
                    .build()?,
            ),
        };
        let mut config = builder.with_cert_resolver(resolver);
        config.alpn_protocols = self.alpn_protocols.clone();
        Ok(config)
    }

    /// 编译为 `rustls` 客户端配置。
    pub fn client_config(&self) -> Result<ClientConfig, CredentialsError> {
        let builder = ClientConfig::builder_with_provider(self.effective_provider())
            .with_protocol_versions(&self.protocol_versions()?)?
            .with_root_certificates(Arc::clone(&self.roots));
        let mut config = match self.certificates.first() {
            Some(certificate) => builder
                .with_client_cert_resolver(Arc::new(StaticClientCert(Arc::clone(certificate)))),
            None => builder.with_no_client_auth(),
        };
        config.alpn_protocols = self.alpn_protocols.clone();
        Ok(config)
    }

    fn protocol_versions(
        &self,
    ) -> Result<Vec<&'static SupportedProtocolVersion>, CredentialsError> {
        if self.min_version > self.max_version {
            return Err(CredentialsError::InvalidVersionRange {
                min: self.min_version.as_str(),
                max: self.max_version.as_str(),
            });
        }
        Ok([TlsVersion::Tls12, TlsVersion::Tls13]
            .into_iter()
            .filter(|v| (self.min_version..=self.max_version).contains(v))
            .map(TlsVersion::supported)
            .collect())
    }

    fn effective_provider(&self) -> Arc<CryptoProvider> {
        match &self.cipher_suites {
            Some(suites) => {
                let mut provider = CryptoProvider::clone(&self.provider);
                provider.cipher_suites = suites.clone();
                Arc::new(provider)
            }
            None => Arc::clone(&self.provider),
        }
    }
}

/// 进程已安装默认后端时沿用之，否则退回 `ring`。
fn default_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()))
}

#[derive(Debug)]
struct StaticServerCert(Arc<CertifiedKey>);

impl ResolvesServerCert for StaticServerCert {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.0))
    }
}

#[derive(Debug)]
struct StaticClientCert(Arc<CertifiedKey>);

impl ResolvesClientCert for StaticClientCert {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        _sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.0))
    }

    fn has_certs(&self) -> bool {
        true
    }
}
