use s3_upload::{Settings, app};
use tracing_subscriber::fmt::time::LocalTime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载 .env 文件
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_timer(LocalTime::rfc_3339())
        .init();

    let settings = Settings::from_env()?;
    let listener = tokio::net::TcpListener::bind(&settings.listen_addr).await?;

    tracing::info!(addr = %settings.listen_addr, bucket = %settings.bucket, "服务器已启动");

    axum::serve(listener, app(&settings).await).await?;
    Ok(())
}
