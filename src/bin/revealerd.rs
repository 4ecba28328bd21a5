//! Registry revealer daemon: HTTP API plus the scheduled reveal worker.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    registry_revealer::server::run().await
}
