#[tokio::main]
async fn main() -> anyhow::Result<()> {
    voxpostctl::run().await
}
