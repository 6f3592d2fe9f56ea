//! 常用的配置变换函数。
//!
//! 每个构造器返回一个 [`TlsOption`]，供 [`DynamicClientCredentials`](crate::DynamicClientCredentials)
//! 在推导配置时按序执行。变换只作用于克隆出的配置，捕获的数据以 `Arc` 共享。

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustls::{RootCertStore, sign::CertifiedKey};

use crate::{client::TlsOption, config::TlsConfig, settings::TlsSettings};

/// 把任意闭包包装为 [`TlsOption`]。
pub fn option<F>(mutate: F) -> TlsOption
where
    F: Fn(&mut TlsConfig) + Send + Sync + 'static,
{
    Arc::new(mutate)
}

/// 覆盖 SNI。
pub fn server_name(name: impl Into<String>) -> TlsOption {
    let name = name.into();
    option(move |config| config.server_name = Some(name.clone()))
}

/// 以单张证书替换已有证书列表。
pub fn certificate(certificate: Arc<CertifiedKey>) -> TlsOption {
    option(move |config| config.certificates = vec![Arc::clone(&certificate)])
}

/// 在推导时读取轮换源中的当前证书。
///
/// 外部轮换机制只需 `store` 新证书，此后的每次握手都会带上它，无需改动变换列表。
pub fn rotating_certificate(source: Arc<ArcSwap<CertifiedKey>>) -> TlsOption {
    option(move |config| config.certificates = vec![source.load_full()])
}

/// 替换信任根。
pub fn root_certificates(roots: Arc<RootCertStore>) -> TlsOption {
    option(move |config| config.roots = Arc::clone(&roots))
}

/// 把一份已解析的 [`TlsSettings`] 作为变换叠加。
pub fn settings(settings: TlsSettings) -> TlsOption {
    option(move |config| settings.apply(config))
}
