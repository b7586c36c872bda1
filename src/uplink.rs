use std::time::Duration;

/// Asynchronous hop a submission crosses before it is finalized. Stands
/// in for the future backend call so real I/O can replace it without
/// touching the engine.
#[rocket::async_trait]
pub trait Uplink: Send + Sync {
    async fn transmit(&self) -> anyhow::Result<()>;
}

/// Fixed artificial latency, then success. No retry, timeout or
/// cancellation semantics.
pub struct SimulatedUplink {
    pub delay: Duration,
}

#[rocket::async_trait]
impl Uplink for SimulatedUplink {
    async fn transmit(&self) -> anyhow::Result<()> {
        rocket::tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
