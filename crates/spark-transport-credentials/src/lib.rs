#![doc = r#"
# spark-transport-credentials

## 设计动机（Why）
- **轮换不停服**：RPC 监听器与拨号策略只绑定一次凭据对象，证书却需要在进程持续运行时更换；
  服务端凭据持有共享配置句柄，客户端凭据在每次握手前重新推导配置；
- **协议钉死**：应用层协议固定为 `h2`，服务端版本钉死为 TLS 1.2，去掉版本协商带来的降级面；
- **角色隔离**：服务端与客户端凭据是两个类型，误用方向时返回固定错误，而不是静默执行。

## 核心契约（What）
- [`TransportCredentials`]：客户端握手、服务端握手、协议描述、克隆与 SNI 覆盖；
- [`ServerCredentials`]：基于 [`SharedTlsConfig`] 的服务端适配器，握手失败时经
  [`HandshakeLogger`] 记录一次对端地址；
- [`DynamicClientCredentials`]：基础 [`TlsConfig`] 加有序 [`TlsOption`] 列表，每次握手推导新快照；
- [`TlsCredentials`]：绑定单一快照的标准凭据，动态凭据的委托目标；
- [`CredentialsError`]：稳定错误码与 [`ErrorCategory`] 分类。

## 实现策略（How）
- `rustls` + `tokio-rustls` 完成握手，[`TlsConfig`] 按需编译为 `rustls` 配置；
- 共享配置以 `ArcSwap` 发布不可变代，写者由 `parking_lot::Mutex` 串行；
- 客户端握手受 [`HandshakeContext`] 的取消与截止约束，取消以 5ms 粒度轮询。

## 风险与考量（Trade-offs）
- 客户端每次握手都编译一次配置，以此换取推导之间完全独立；
- 服务端握手不接受上下文，超时由原始连接或上层监听器负责；
- 证书文件装载与监听不在本 crate 范围内，调用方通过 [`SharedTlsConfig::update`] 或
  [`options::rotating_certificate`] 接入自己的轮换机制。
"#]

mod client;
mod config;
mod conn;
mod context;
mod contract;
mod error;
mod handshake;
mod logging;
pub mod options;
pub mod policy;
mod server;
mod settings;
mod shared;
mod tls;
mod util;

#[cfg(test)]
mod test_support;

pub use client::{DynamicClientCredentials, TlsOption};
pub use config::{ClientAuthMode, TlsConfig, TlsVersion};
pub use conn::{BoxedRawConnection, RawConnection, SecureConnection};
pub use context::{Cancellation, Deadline, HandshakeContext, HandshakeContextBuilder};
pub use contract::{AuthInfo, ProtocolInfo, TransportCredentials};
pub use error::{CredentialsError, ErrorCategory};
pub use logging::{HandshakeLogger, TracingLogger};
pub use server::ServerCredentials;
pub use settings::TlsSettings;
pub use shared::SharedTlsConfig;
pub use tls::TlsCredentials;

pub use rustls;
