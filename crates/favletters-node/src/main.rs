//! FavLetters tab binary
//!
//! One terminal = one tab. Type a line to replace the shared text,
//! `/promote` to jump to the front, `/status` to redraw, `/quit` to leave.

use favletters_node::{render_view, start, Input, NodeConfig, TextIconRenderer};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "favletters=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = NodeConfig::from_env();
    tracing::info!("Starting FavLetters tab");
    tracing::info!("  Bus:  {}", config.bus.group);
    tracing::info!("  Data: {:?}", config.data_dir);

    let tab = match start(config).await {
        Ok(tab) => tab,
        Err(e) => {
            eprintln!("FavLetters failed to start: {}", e);
            return Err(e.into());
        }
    };

    let renderer = TextIconRenderer { ansi: true };
    let mut views = tab.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", render_view(&tab.view(), &renderer));

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                println!("{}", render_view(&view, &renderer));
            }
            line = lines.next_line() => match line? {
                Some(line) => match Input::parse(&line) {
                    Input::Text(text) => tab.set_text(text)?,
                    Input::Promote => {
                        let priority = tab.promote().await?;
                        tracing::info!("Promoted to priority {}", priority);
                    }
                    Input::Status => println!("{}", render_view(&tab.view(), &renderer)),
                    Input::Quit => break,
                },
                None => break,
            },
        }
    }

    tab.shutdown().await;
    Ok(())
}
