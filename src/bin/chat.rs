//! relay-chat terminal client
//!
//! Reads prompts from stdin, one per line, and prints the relay's reply as it
//! streams in. Set `RELAY_URL` to point at a relay other than the local one.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_chat::client::{view, ChatClient, ChatState, HttpRelay, Submission, DEFAULT_RELAY_URL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_chat=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let url = std::env::var("RELAY_URL").unwrap_or_else(|_| DEFAULT_RELAY_URL.into());
    tracing::info!("Using relay at {}", url);

    let client = ChatClient::new(HttpRelay::new(url));
    let renderer = tokio::spawn(render(client.subscribe()));

    prompt()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if client.send(line).await == Submission::Ignored {
            prompt()?;
        }
    }

    drop(client);
    renderer.await?;
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

/// Print each state change; show a fresh prompt whenever a turn ends.
async fn render(mut updates: watch::Receiver<ChatState>) {
    let mut shown = updates.borrow_and_update().clone();

    while updates.changed().await.is_ok() {
        let next = updates.borrow_and_update().clone();

        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{}", view::render_delta(&shown.transcript, &next.transcript));
        let turn_ended = !next.busy && (shown.busy || shown.transcript != next.transcript);
        if turn_ended {
            let _ = write!(stdout, "\n> ");
        }
        let _ = stdout.flush();

        shown = next;
    }
}
