//! 单元测试共用的证书夹具。

use std::sync::Arc;

use rustls::{
    RootCertStore,
    pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
    sign::CertifiedKey,
};

use crate::config::TlsConfig;

pub(crate) struct Identity {
    pub(crate) certified: Arc<CertifiedKey>,
    pub(crate) cert_der: CertificateDer<'static>,
}

/// 为给定主机名生成自签名证书。
pub(crate) fn identity(host: &str) -> Identity {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec![host.to_string()]).expect("生成自签名证书");
    let cert_der = cert.der().clone();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    let certified = TlsConfig::default()
        .load_certificate(vec![cert_der.clone()], key)
        .expect("装载签名密钥");
    Identity {
        certified,
        cert_der,
    }
}

/// 以若干证书构造信任根。
pub(crate) fn roots(certs: &[&CertificateDer<'static>]) -> Arc<RootCertStore> {
    let mut store = RootCertStore::empty();
    for cert in certs {
        store.add((*cert).clone()).expect("添加信任根");
    }
    Arc::new(store)
}
