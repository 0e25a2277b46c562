use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    routemap_cli::main_entry().await
}
