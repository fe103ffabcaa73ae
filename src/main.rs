use rask_otlp_exporter::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::main().await
}
