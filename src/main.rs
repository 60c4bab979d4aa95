use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ollama_chat::run().await
}
