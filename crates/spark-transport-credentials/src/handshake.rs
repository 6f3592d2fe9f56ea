use std::sync::Arc;

use rustls::{ClientConfig, ServerConfig, pki_types::ServerName};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::{
    conn::{BoxedRawConnection, SecureConnection},
    context::HandshakeContext,
    contract::AuthInfo,
    error::CredentialsError,
    util::run_with_context,
};

/// 以客户端角色执行握手。
///
/// 握手 Future 受 `ctx` 约束；取消或到期时 Future 被丢弃，`conn` 随之关闭。
pub(crate) async fn connect(
    ctx: &HandshakeContext,
    config: ClientConfig,
    server_name: String,
    conn: BoxedRawConnection,
) -> Result<(SecureConnection, AuthInfo), CredentialsError> {
    let name = ServerName::try_from(server_name.clone()).map_err(|_| {
        CredentialsError::InvalidServerName {
            name: server_name.clone(),
        }
    })?;
    let connector = TlsConnector::from(Arc::new(config));
    let stream = run_with_context(ctx, connector.connect(name, conn)).await?;
    let auth_info = AuthInfo::from_state(stream.get_ref().1, Some(server_name.clone()));
    Ok((SecureConnection::client(stream, server_name), auth_info))
}

/// 以服务端角色执行握手，`config` 为调用时刻的配置快照。
pub(crate) async fn accept(
    config: Arc<ServerConfig>,
    conn: BoxedRawConnection,
) -> Result<(SecureConnection, AuthInfo), CredentialsError> {
    let stream = TlsAcceptor::from(config).accept(conn).await?;
    let session = stream.get_ref().1;
    let auth_info = AuthInfo::from_state(session, session.server_name().map(str::to_string));
    Ok((SecureConnection::server(stream), auth_info))
}

/// 确定客户端握手使用的 SNI：优先取配置值，否则取 `authority` 的主机部分。
///
/// `authority` 支持 `host:port`、`[v6]:port` 与不带端口的主机；无法拆分时原样使用。
pub(crate) fn resolve_server_name(configured: Option<&str>, authority: &str) -> String {
    if let Some(name) = configured.filter(|name| !name.is_empty()) {
        return name.to_string();
    }
    if let Some(rest) = authority.strip_prefix('[')
        && let Some((host, _)) = rest.split_once(']')
    {
        return host.to_string();
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => {
            host.to_string()
        }
        _ => authority.to_string(),
    }
}
