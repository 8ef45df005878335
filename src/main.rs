//! wszero title demo server
//!
//! Run with: cargo run --bin wszero
//!
//! Every browser that opens http://localhost:8000/ gets its page title set
//! by the server.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wszero::cli::run(wszero::demos::title_demo()).await
}
