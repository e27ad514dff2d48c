use itertools::Itertools;
use scm_keys::{
    HttpSeriesFetcher, KeysConfig, KeysRuntime, MemoryDocument, ReferenceIndex, dom::Rect,
};
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialise INFO Tracing log subscriber
    init_logging();

    // SCM_KEYS_COOKIE must carry a logged-in steamcommunity.com session
    let config = KeysConfig::from_env();
    let fetcher = match HttpSeriesFetcher::new(&config) {
        Ok(fetcher) => fetcher,
        Err(error) => {
            error!(%error, "Invalid price history endpoint");
            return;
        }
    };

    let index = ReferenceIndex::new();
    let table = match index.load(&fetcher).await {
        Ok(table) => table,
        Err(error) => {
            error!(%error, transient = error.is_transient(), "Failed to fetch key price history");
            return;
        }
    };

    for (day, median) in table
        .iter()
        .sorted_by_key(|(day, _)| **day)
        .rev()
        .take(5)
    {
        info!(%day, median, "Key median");
    }

    let Some((latest, median)) = table.latest() else {
        warn!("Key price history is empty, nothing to annotate");
        return;
    };

    // Script a page showing an item worth 2.5 keys on the latest day
    let date_line = latest.date().format("%b %-d %Y").to_string();
    let price = median * 2.5;

    let (document, events) = MemoryDocument::channel();
    let tooltip = document.append_unobserved(
        &["hover_tooltip"],
        &format!("{date_line}<br>${price:.2}"),
    );
    let chart = document.append(
        &["jqplot-highlighter-tooltip"],
        &format!("{date_line} 01: +0<br>{price:.2}€<br>12 sold"),
    );
    document.set_rect(chart, Rect::new(640.0, 4.0, 140.0, 48.0));

    let overlay_id = config.overlay_id.clone();
    let runtime = KeysRuntime::new(config, document.clone(), fetcher).with_index(index);
    let handle = tokio::spawn(runtime.run(events));

    tokio::time::sleep(Duration::from_secs(3)).await;

    info!(
        annotation = ?document.annotation_html(tooltip),
        "Inline tooltip"
    );
    info!(overlay = ?document.overlay(&overlay_id), "Chart overlay");

    handle.abort();
}

// Initialise an INFO `Subscriber` for `Tracing` logs and install it as the global default.
fn init_logging() {
    tracing_subscriber::fmt()
        // Filter messages based on the INFO
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        // Disable colours on release builds
        .with_ansi(cfg!(debug_assertions))
        // Install this Tracing subscriber as global default
        .init()
}
