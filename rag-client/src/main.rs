use std::time::Duration;

use clap::Parser;
use rag_client::{ApiClient, DEFAULT_BASE_URL, Repl};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "wiidcos-client", about = "Chat with your PDFs from the terminal")]
struct Args {
    /// API base URL.
    #[arg(long, env = "WIIDCOS_API_URL", default_value = DEFAULT_BASE_URL)]
    url: String,
    /// Bearer token, when the server sets AUTH_TOKEN.
    #[arg(long, env = "AUTH_TOKEN")]
    token: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, default_value_t = 120)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    // Logs go to stderr so they do not interleave with answers.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();
    let client = ApiClient::new(&args.url, args.token, Duration::from_secs(args.timeout))?;
    if let Err(e) = client.health().await {
        tracing::warn!(url = %args.url, error = %e, "API not reachable yet");
    }

    let mut repl = Repl::new(client, std::io::stdout());
    repl.run(BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}
