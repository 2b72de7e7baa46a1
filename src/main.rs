#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = unsika_test::run().await {
        eprintln!("unsika-test fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
