use crate::domain::models::TimerSession;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Push notifications about the server-side timer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started(TimerSession),
    Stopped,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn fetch(&self) -> Result<TimerSession>;

    // Each call returns an independent subscription.
    fn events(&self) -> BoxStream<'static, SessionEvent>;
}
