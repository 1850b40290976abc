#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ripple::run().await
}
