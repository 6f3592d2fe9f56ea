//! 端到端测试共用夹具：自签名证书、本地监听与记录型日志器。

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use spark_transport_credentials::{
    AuthInfo, CredentialsError, HandshakeLogger, SecureConnection, TlsConfig,
    TransportCredentials,
    rustls::{
        RootCertStore,
        pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
        sign::CertifiedKey,
    },
};
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// 一张自签名证书及其签名密钥。
pub struct Identity {
    pub certified: Arc<CertifiedKey>,
    pub cert_der: CertificateDer<'static>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn identity(host: &str) -> Result<Identity> {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec![host.to_string()])
            .context("生成自签名证书失败")?;
    let cert_der = cert.der().clone();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    let certified = TlsConfig::default()
        .load_certificate(vec![cert_der.clone()], key)
        .context("装载签名密钥失败")?;
    Ok(Identity {
        certified,
        cert_der,
    })
}

pub fn roots(certs: &[&CertificateDer<'static>]) -> Result<Arc<RootCertStore>> {
    let mut store = RootCertStore::empty();
    for cert in certs {
        store.add((*cert).clone()).context("添加信任根失败")?;
    }
    Ok(Arc::new(store))
}

pub type ServerOutcome = Result<(SecureConnection, AuthInfo), CredentialsError>;

/// 绑定本地端口，接受一条连接并以给定凭据执行服务端握手。
pub async fn serve_once(
    credentials: Box<dyn TransportCredentials>,
) -> Result<(SocketAddr, JoinHandle<ServerOutcome>)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("绑定监听端口失败")?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        credentials.server_handshake(Box::new(stream)).await
    });
    Ok((addr, handle))
}

/// 建立 TCP 连接并返回客户端本地地址，即服务端观察到的对端地址。
pub async fn dial(addr: SocketAddr) -> Result<(TcpStream, SocketAddr)> {
    let stream = TcpStream::connect(addr).await.context("连接监听端口失败")?;
    let local = stream.local_addr()?;
    Ok((stream, local))
}

/// 记录每次握手失败的日志器。
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<(Option<SocketAddr>, String)>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<(Option<SocketAddr>, String)> {
        self.entries.lock().clone()
    }
}

impl HandshakeLogger for RecordingLogger {
    fn handshake_failed(&self, remote_addr: Option<SocketAddr>, error: &CredentialsError) {
        self.entries.lock().push((remote_addr, error.to_string()));
    }
}
