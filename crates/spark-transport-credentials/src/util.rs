use std::{future::Future, io, time::Duration};

use crate::{
    context::{Cancellation, HandshakeContext},
    error::CredentialsError,
};

/// 取消位的轮询间隔。
///
/// `Cancellation` 只是一个原子位，没有唤醒机制，因此与握手 Future 竞速时按固定间隔轮询；
/// 取消响应因此存在毫秒级延迟。
const CANCELLATION_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// 在上下文约束下执行握手 Future。
///
/// - 开始前已取消或已到期时立即返回，不轮询 `future`；
/// - 取消、到期与完成三者竞速，`biased` 保证取消优先；
/// - 竞速失败的 Future 被直接丢弃，其持有的连接随之关闭。
pub(crate) async fn run_with_context<F, T>(
    ctx: &HandshakeContext,
    future: F,
) -> Result<T, CredentialsError>
where
    F: Future<Output = io::Result<T>> + Send,
    T: Send,
{
    if ctx.cancellation().is_cancelled() {
        return Err(CredentialsError::Cancelled);
    }
    if ctx.deadline().is_expired() {
        return Err(CredentialsError::TimedOut);
    }

    let cancel = wait_for_cancellation(ctx.cancellation());
    tokio::pin!(cancel);
    tokio::pin!(future);

    if let Some(deadline) = ctx.deadline().instant() {
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);
        tokio::select! {
            biased;
            _ = &mut cancel => Err(CredentialsError::Cancelled),
            _ = &mut sleep => Err(CredentialsError::TimedOut),
            result = &mut future => result.map_err(CredentialsError::from),
        }
    } else {
        tokio::select! {
            biased;
            _ = &mut cancel => Err(CredentialsError::Cancelled),
            result = &mut future => result.map_err(CredentialsError::from),
        }
    }
}

async fn wait_for_cancellation(cancellation: &Cancellation) {
    while !cancellation.is_cancelled() {
        tokio::time::sleep(CANCELLATION_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Deadline;

    #[tokio::test]
    async fn completes_when_unconstrained() {
        let ctx = HandshakeContext::default();
        let value = run_with_context(&ctx, async { Ok::<_, io::Error>(7) })
            .await
            .expect("future should complete");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn pre_cancelled_context_short_circuits() {
        let ctx = HandshakeContext::default();
        ctx.cancellation().cancel();
        let err = run_with_context(&ctx, async { Ok::<_, io::Error>(()) })
            .await
            .expect_err("cancelled context must fail");
        assert!(matches!(err, CredentialsError::Cancelled));
    }

    #[tokio::test]
    async fn deadline_interrupts_pending_future() {
        let ctx = HandshakeContext::builder()
            .with_deadline(Deadline::after(Duration::from_millis(20)))
            .build();
        let err = run_with_context(&ctx, std::future::pending::<io::Result<()>>())
            .await
            .expect_err("pending future must time out");
        assert!(matches!(err, CredentialsError::TimedOut));
    }

    #[tokio::test]
    async fn io_errors_become_handshake_errors() {
        let ctx = HandshakeContext::default();
        let err = run_with_context(&ctx, async {
            Err::<(), _>(io::Error::from(io::ErrorKind::ConnectionReset))
        })
        .await
        .expect_err("io error must propagate");
        assert!(matches!(err, CredentialsError::Handshake { .. }));
    }
}
