#[tokio::main]
async fn main() -> anyhow::Result<()> {
    profile_watcher_lib::run().await
}
