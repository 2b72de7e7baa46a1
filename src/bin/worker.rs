#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = unsika_test::run_worker().await {
        eprintln!("unsika-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
