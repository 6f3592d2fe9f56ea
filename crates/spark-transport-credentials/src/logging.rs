use std::{fmt, net::SocketAddr};

use crate::error::CredentialsError;

/// 握手失败诊断日志的注入点。
///
/// 服务端凭据只在握手失败时调用一次，记录对端地址与错误；
/// 日志输出格式与采集方式由实现方决定，本 crate 不负责日志系统初始化。
pub trait HandshakeLogger: Send + Sync + fmt::Debug {
    fn handshake_failed(&self, remote_addr: Option<SocketAddr>, error: &CredentialsError);
}

/// 基于 `tracing` 的默认实现，以 `error` 级别输出结构化字段。
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl HandshakeLogger for TracingLogger {
    fn handshake_failed(&self, remote_addr: Option<SocketAddr>, error: &CredentialsError) {
        let remote_address = match remote_addr {
            Some(addr) => addr.to_string(),
            None => "unknown".to_string(),
        };
        tracing::error!(
            remote_address = %remote_address,
            code = error.code(),
            error = %error,
            "TLS handshake failed"
        );
    }
}
