use std::{
    fmt, io,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::{
    io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf},
    net::TcpStream,
};
use tokio_rustls::{client, server};

/// 尚未加密的原始双向连接。
///
/// RPC 框架接受或拨出的连接在交给凭据之前只需满足异步读写与 `Unpin`；
/// `remote_addr` 仅用于握手失败时的诊断日志，无法获取时返回 `None`。
pub trait RawConnection: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    fn remote_addr(&self) -> Option<SocketAddr>;
}

/// 凭据接口统一使用的装箱原始连接。
pub type BoxedRawConnection = Box<dyn RawConnection>;

impl RawConnection for TcpStream {
    fn remote_addr(&self) -> Option<SocketAddr> {
        self.peer_addr().ok()
    }
}

impl RawConnection for DuplexStream {
    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// 握手完成后的加密连接。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 向 RPC 框架屏蔽握手角色：客户端与服务端握手产出的 `tokio-rustls` 流类型不同，
///   框架只需要一个可读写的对象；
/// - 构造时缓存对端地址、SNI 与 ALPN，避免框架为读取元数据而触碰内部会话。
///
/// ## 契约（What）
/// - 实现 `AsyncRead`/`AsyncWrite`，读写即 TLS 明文；
/// - `poll_shutdown` 发送 `close_notify` 后关闭写方向；
/// - `server_name` 在客户端侧为发出的 SNI，在服务端侧为对端提供的 SNI。
pub struct SecureConnection {
    stream: SecureStream,
    remote_addr: Option<SocketAddr>,
    server_name: Option<String>,
    alpn_protocol: Option<Vec<u8>>,
}

enum SecureStream {
    Client(Box<client::TlsStream<BoxedRawConnection>>),
    Server(Box<server::TlsStream<BoxedRawConnection>>),
}

impl SecureConnection {
    pub(crate) fn client(
        stream: client::TlsStream<BoxedRawConnection>,
        server_name: String,
    ) -> Self {
        let (io, session) = stream.get_ref();
        let remote_addr = io.remote_addr();
        let alpn_protocol = session.alpn_protocol().map(<[u8]>::to_vec);
        Self {
            stream: SecureStream::Client(Box::new(stream)),
            remote_addr,
            server_name: Some(server_name),
            alpn_protocol,
        }
    }

    pub(crate) fn server(stream: server::TlsStream<BoxedRawConnection>) -> Self {
        let (io, session) = stream.get_ref();
        let remote_addr = io.remote_addr();
        let server_name = session.server_name().map(str::to_string);
        let alpn_protocol = session.alpn_protocol().map(<[u8]>::to_vec);
        Self {
            stream: SecureStream::Server(Box::new(stream)),
            remote_addr,
            server_name,
            alpn_protocol,
        }
    }

    /// 对端地址。
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// 握手使用的 SNI。
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// 协商得到的 ALPN 标识。
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.alpn_protocol.as_deref()
    }

    /// 是否由服务端握手产生。
    pub fn is_server(&self) -> bool {
        matches!(self.stream, SecureStream::Server(_))
    }
}

impl fmt::Debug for SecureConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureConnection")
            .field("server", &self.is_server())
            .field("remote_addr", &self.remote_addr)
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for SecureConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().stream {
            SecureStream::Client(stream) => Pin::new(&mut **stream).poll_read(cx, buf),
            SecureStream::Server(stream) => Pin::new(&mut **stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SecureConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().stream {
            SecureStream::Client(stream) => Pin::new(&mut **stream).poll_write(cx, buf),
            SecureStream::Server(stream) => Pin::new(&mut **stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().stream {
            SecureStream::Client(stream) => Pin::new(&mut **stream).poll_flush(cx),
            SecureStream::Server(stream) => Pin::new(&mut **stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().stream {
            SecureStream::Client(stream) => Pin::new(&mut **stream).poll_shutdown(cx),
            SecureStream::Server(stream) => Pin::new(&mut **stream).poll_shutdown(cx),
        }
    }
}
