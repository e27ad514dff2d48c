use crate::{
    config::KeysConfig,
    dom::{Document, DomEvent},
    series::{fetch::SeriesFetcher, index::ReferenceIndex},
    sync::TooltipSynchronizer,
};
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tracing::{error, info};

/// Event loop driving a [`TooltipSynchronizer`] for one page.
///
/// The reference index is loaded before anything is observed. A failed load
/// is logged and never retried; the page is then simply left unannotated.
#[derive(Debug)]
pub struct KeysRuntime<D, F> {
    config: KeysConfig,
    document: D,
    fetcher: F,
    index: ReferenceIndex,
}

impl<D, F> KeysRuntime<D, F>
where
    D: Document,
    F: SeriesFetcher,
{
    pub fn new(config: KeysConfig, document: D, fetcher: F) -> Self {
        Self {
            config,
            document,
            fetcher,
            index: ReferenceIndex::new(),
        }
    }

    /// Load into an existing shared index instead of a fresh one.
    pub fn with_index(mut self, index: ReferenceIndex) -> Self {
        self.index = index;
        self
    }

    pub fn index(&self) -> ReferenceIndex {
        self.index.clone()
    }

    /// Run until the document event channel closes, then hand back the
    /// synchronizer.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<DomEvent>) -> TooltipSynchronizer<D> {
        let Self {
            config,
            document,
            fetcher,
            index,
        } = self;

        match index.load(&fetcher).await {
            Ok(table) => info!(days = table.len(), latest = ?table.latest(), "Reference index ready"),
            Err(error) => error!(
                %error,
                transient = error.is_transient(),
                "Failed to load key price history, tooltips will not be annotated"
            ),
        }

        let mut rescan = interval(config.rescan_interval);
        rescan.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poll = interval(config.overlay_poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut sync = TooltipSynchronizer::new(document, index, config);
        sync.rescan();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => sync.handle_event(event),
                    None => {
                        info!("Document event channel closed, stopping");
                        break;
                    }
                },
                _ = rescan.tick() => sync.rescan(),
                _ = poll.tick() => sync.poll_overlay(),
            }
        }

        sync
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dom::{MemoryDocument, OverlayDisplay, Rect},
        error::KeyError,
    };
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::sleep;

    const BODY: &str = r#"{"success":true,"prices":[
        ["Jan 01 2024 01: +0", 10.0, "3"],
        ["Jan 01 2024 02: +0", 12.0, "4"],
        ["Jan 02 2024 01: +0", 20.0, "1"]
    ]}"#;

    struct StaticFetcher(Result<String, KeyError>);

    #[async_trait]
    impl SeriesFetcher for StaticFetcher {
        async fn fetch_raw(&self) -> Result<String, KeyError> {
            self.0.clone()
        }
    }

    fn runtime(
        document: &MemoryDocument,
        body: Result<String, KeyError>,
    ) -> KeysRuntime<MemoryDocument, StaticFetcher> {
        KeysRuntime::new(KeysConfig::default(), document.clone(), StaticFetcher(body))
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescan_annotates_missed_tooltip() {
        let (document, events) = MemoryDocument::channel();
        let handle = tokio::spawn(runtime(&document, Ok(BODY.to_string())).run(events));
        sleep(Duration::from_millis(10)).await;

        // Inserted without a structural event
        let id = document.append_unobserved(&["hover_tooltip"], "Jan 1 2024<br>$24.00");
        sleep(Duration::from_millis(50)).await;
        assert_eq!(document.annotation_html(id), None);

        sleep(Duration::from_millis(300)).await;
        assert!(document.annotation_html(id).unwrap().contains("2.00 keys"));
        assert_eq!(document.annotation_writes(id), 1);

        // Later rescans keep it stable
        sleep(Duration::from_secs(2)).await;
        assert_eq!(document.annotation_writes(id), 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_never_annotates() {
        let (document, events) = MemoryDocument::channel();
        let runtime = runtime(&document, Err(KeyError::Status(403)));
        let index = runtime.index();
        let handle = tokio::spawn(runtime.run(events));

        let id = document.append(&["hover_tooltip"], "Jan 1 2024<br>$24.00");
        sleep(Duration::from_secs(2)).await;

        assert!(!index.is_loaded());
        assert!(document.is_watched(id));
        assert_eq!(document.annotation_html(id), None);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_structural_events_and_overlay() {
        let (document, events) = MemoryDocument::channel();
        let handle = tokio::spawn(runtime(&document, Ok(BODY.to_string())).run(events));
        sleep(Duration::from_millis(10)).await;

        let inline = document.append(&["hover_tooltip"], "Jan 2 2024<br>$30.00");
        let chart = document.append(
            &["jqplot-highlighter-tooltip"],
            "Jan 01 2024 01: +0<br>24,00€<br>3 sold",
        );
        document.set_rect(chart, Rect::new(400.0, 300.0, 120.0, 30.0));
        sleep(Duration::from_millis(150)).await;

        assert!(document.annotation_html(inline).unwrap().contains("1.50 keys"));
        let overlay = document.overlay("scm-keys-overlay").unwrap();
        assert_eq!(overlay.display, OverlayDisplay::Visible);
        assert!(overlay.html.contains("2.00 keys"));

        document.set_displayed(chart, false);
        sleep(Duration::from_millis(150)).await;
        assert_eq!(
            document.overlay("scm-keys-overlay").unwrap().display,
            OverlayDisplay::Hidden
        );

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_event_channel_closes() {
        // Page writes go to their own channel; the runtime listens on another
        let (page_tx, _page_rx) = mpsc::unbounded_channel();
        let document = MemoryDocument::new(page_tx);
        let id = document.append(&["hover_tooltip"], "Jan 1 2024<br>$24.00");

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(DomEvent::NodesAdded(vec![id])).unwrap();
        drop(tx);

        let sync = runtime(&document, Ok(BODY.to_string())).run(rx).await;

        assert!(sync.is_tracked(id));
        assert_eq!(sync.annotation_state(id).map(|state| state.price), Some(24.0));
        assert_eq!(document.annotation_writes(id), 1);
    }
}
