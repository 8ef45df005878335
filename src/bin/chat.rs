//! wszero chat demo server
//!
//! Run with: cargo run --bin wszero-chat

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wszero::cli::run(wszero::demos::chat_demo()).await
}
