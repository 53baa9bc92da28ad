//! Live Feed - Binary Entry Point
//!
//! `serve` runs the hub; `token`, `listen` and `notify` exercise it as a client.

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio::net::TcpListener;

use live_feed::api::{self, HubState, TokenAuth};
use live_feed::{FeedConfig, Identity, LiveFeed, SessionStore};

#[derive(Parser, Debug)]
#[command(name = "live-feed", version, about = "Realtime notification feed")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the notification hub
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: String,
    },
    /// Issue a session token for a user
    Token {
        #[arg(long)]
        user: String,
    },
    /// Connect with a session token and print incoming events
    Listen {
        #[arg(long)]
        token: String,
        #[arg(long)]
        user: String,
    },
    /// Ask the hub to push a test notification to a user
    Notify {
        #[arg(long)]
        token: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("live_feed=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve { bind } => serve(&bind).await,
        Command::Token { user } => {
            let auth = TokenAuth::from_env()?;
            println!("{}", auth.issue(&user)?);
            Ok(())
        }
        Command::Listen { token, user } => listen(token, user).await,
        Command::Notify { token, user, message } => {
            let feed = signed_in_feed(token, user)?;
            let result = feed.send_test_notification(&message).await;
            feed.shutdown().await;
            result?;
            println!("sent");
            Ok(())
        }
    }
}

async fn serve(bind: &str) -> Result<(), Box<dyn Error>> {
    let auth = TokenAuth::from_env()?;
    let state = Arc::new(HubState::new(Arc::new(auth)));
    let listener = TcpListener::bind(bind).await?;

    tokio::select! {
        result = api::serve(listener, state) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}

async fn listen(token: String, user: String) -> Result<(), Box<dyn Error>> {
    let feed = signed_in_feed(token, user)?;
    let mut events = feed.events();

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => println!("{} {}", event.kind(), event.payload()),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    feed.shutdown().await;
    Ok(())
}

fn signed_in_feed(token: String, user: String) -> Result<LiveFeed, Box<dyn Error>> {
    let config = FeedConfig::from_env()?;
    let session = Arc::new(SessionStore::new());
    session.sign_in(token, Identity::new(user));
    Ok(LiveFeed::start(config, session)?)
}
