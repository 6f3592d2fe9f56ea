//! 协议策略常量。
//!
//! RPC 框架要求应用层协议固定为 `h2`，服务端版本钉死为单一值（TLS 1.2），
//! 不提供版本区间协商，从源头去掉降级面。

use crate::config::{TlsConfig, TlsVersion};
use crate::contract::ProtocolInfo;

/// `ProtocolInfo::security_protocol` 的固定取值。
pub const SECURITY_PROTOCOL: &str = "tls";

/// 服务端钉死的协议版本，`min_version == max_version == PINNED_VERSION`。
pub const PINNED_VERSION: TlsVersion = TlsVersion::Tls12;

/// 唯一允许的 ALPN 标识。
pub const ALPN_H2: &[u8] = b"h2";

/// 服务端 ALPN 提案列表：`["h2"]`。
pub fn alpn_protocols() -> Vec<Vec<u8>> {
    vec![ALPN_H2.to_vec()]
}

/// 把服务端策略写入配置：覆盖 ALPN，并将版本上下限钉到同一值。
///
/// 覆盖而非校验：调用方传入的 ALPN 即便配置错误，也不会悄悄破坏协议协商。
pub fn enforce_server_policy(config: &mut TlsConfig) {
    config.alpn_protocols = alpn_protocols();
    config.min_version = PINNED_VERSION;
    config.max_version = PINNED_VERSION;
}

/// 确保客户端 ALPN 提案包含 `h2`，保留调用方已有的顺序。
pub(crate) fn ensure_h2(protocols: &mut Vec<Vec<u8>>) {
    if !protocols.iter().any(|proto| proto.as_slice() == ALPN_H2) {
        protocols.push(ALPN_H2.to_vec());
    }
}

/// 服务端凭据对外报告的静态协议描述，与实时配置无关。
pub fn server_protocol_info() -> ProtocolInfo {
    ProtocolInfo {
        security_protocol: SECURITY_PROTOCOL,
        security_version: PINNED_VERSION.as_str(),
        server_name: None,
    }
}
