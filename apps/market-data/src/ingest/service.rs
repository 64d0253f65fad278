//! Multi-symbol ingestion with one writer task per symbol.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{SessionWindow, SymbolIngestor};
use crate::bars::CumulativeBar;
use crate::chart::SymbolChart;
use crate::codec::{TickRecord, TickRecordCodec};
use crate::domain::{SymbolDictionary, Tick};
use crate::error::{MarketDataError, Result};
use crate::observability::record_decode_failure;

/// Default bound of each per-symbol channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug)]
enum Command {
    Tick(Tick),
    MarkMissingData,
}

#[derive(Debug)]
struct Worker {
    sender: mpsc::Sender<Command>,
    handle: JoinHandle<Result<SymbolChart<CumulativeBar>>>,
}

/// Decodes tick records and fans them out to per-symbol writer tasks.
///
/// Symbols share no mutable state; each task owns its [`SymbolIngestor`].
/// Channels are bounded, so a slow symbol applies backpressure to
/// [`Self::submit`].
#[derive(Debug)]
pub struct IngestService<D: SymbolDictionary> {
    dictionary: Arc<D>,
    window: SessionWindow,
    channel_capacity: usize,
    workers: HashMap<String, Worker>,
}

impl<D: SymbolDictionary> IngestService<D> {
    /// Create a service; writer tasks are spawned on first use of a symbol.
    #[must_use]
    pub fn new(dictionary: Arc<D>, window: SessionWindow, channel_capacity: usize) -> Self {
        Self {
            dictionary,
            window,
            channel_capacity: channel_capacity.max(1),
            workers: HashMap::new(),
        }
    }

    /// Decode a record and hand the tick to its symbol's writer.
    ///
    /// # Errors
    ///
    /// Returns the decode error (`MissingSymbol`, `InvalidArgument`), or
    /// `InvalidState` if the symbol's writer has stopped.
    pub async fn submit(&mut self, record: &TickRecord) -> Result<()> {
        let tick = TickRecordCodec::new(self.dictionary.as_ref())
            .decode(record)
            .inspect_err(|e| record_decode_failure(e.code().reason()))?;
        self.submit_tick(tick).await
    }

    /// Hand an already decoded tick to its symbol's writer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the session window is unusable and
    /// `InvalidState` if the symbol's writer has stopped.
    pub async fn submit_tick(&mut self, tick: Tick) -> Result<()> {
        let symbol = tick.symbol.clone();
        self.worker(&symbol)?
            .send(Command::Tick(tick))
            .await
            .map_err(|_| writer_stopped(&symbol))
    }

    /// Mark the symbol's active bar as possibly incomplete.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the symbol's writer has stopped.
    pub async fn mark_missing_data(&mut self, symbol: &str) -> Result<()> {
        self.worker(symbol)?
            .send(Command::MarkMissingData)
            .await
            .map_err(|_| writer_stopped(symbol))
    }

    /// Symbols with a running writer, sorted.
    #[must_use]
    pub fn active_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.workers.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Stop every writer and collect the charts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if a writer panicked, or the first error a writer
    /// returned while finishing its chart.
    pub async fn shutdown(self) -> Result<BTreeMap<String, SymbolChart<CumulativeBar>>> {
        let mut charts = BTreeMap::new();
        for (symbol, worker) in self.workers {
            drop(worker.sender);
            let chart = worker.handle.await.map_err(|e| {
                MarketDataError::invalid_state(format!("[{symbol}] writer task failed: {e}"))
            })??;
            charts.insert(symbol, chart);
        }
        info!(symbols = charts.len(), "ingestion stopped");
        Ok(charts)
    }

    fn worker(&mut self, symbol: &str) -> Result<&mpsc::Sender<Command>> {
        if !self.workers.contains_key(symbol) {
            let ingestor = SymbolIngestor::new(symbol, self.window)?;
            let (sender, receiver) = mpsc::channel(self.channel_capacity);
            let handle = tokio::spawn(run_writer(ingestor, receiver));
            debug!(symbol, "writer started");
            self.workers
                .insert(symbol.to_string(), Worker { sender, handle });
        }
        self.workers
            .get(symbol)
            .map(|worker| &worker.sender)
            .ok_or_else(|| writer_stopped(symbol))
    }
}

async fn run_writer(
    mut ingestor: SymbolIngestor,
    mut receiver: mpsc::Receiver<Command>,
) -> Result<SymbolChart<CumulativeBar>> {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Tick(tick) => {
                if let Err(e) = ingestor.ingest(&tick) {
                    warn!(symbol = %tick.symbol, error = %e, "tick rejected");
                }
            }
            Command::MarkMissingData => {
                ingestor.mark_missing_data();
            }
        }
    }
    ingestor.finish()
}

fn writer_stopped(symbol: &str) -> MarketDataError {
    MarketDataError::invalid_state(format!("[{symbol}] writer is not running"))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::bars::OhlcvBar;
    use crate::domain::{InMemorySymbolDictionary, InternalTimestamp};

    fn service() -> IngestService<InMemorySymbolDictionary> {
        let dictionary = InMemorySymbolDictionary::from_symbols(["AAPL", "MSFT"]).unwrap();
        let window = SessionWindow::new(
            InternalTimestamp::from_millis(0),
            InternalTimestamp::from_millis(60_000),
            1_000,
        );
        IngestService::new(Arc::new(dictionary), window, 8)
    }

    fn record(service: &IngestService<InMemorySymbolDictionary>, tick: &Tick) -> TickRecord {
        TickRecordCodec::new(service.dictionary.as_ref())
            .encode(tick)
            .unwrap()
    }

    #[tokio::test]
    async fn symbols_are_charted_independently() {
        let mut service = service();
        let ticks = [
            Tick::new("AAPL", dec!(100.00), 10, InternalTimestamp::from_millis(10)),
            Tick::new("MSFT", dec!(400.00), 5, InternalTimestamp::from_millis(20)),
            Tick::new("AAPL", dec!(101.00), 10, InternalTimestamp::from_millis(1_500)),
            Tick::new("AAPL", dec!(99.00), 10, InternalTimestamp::from_millis(1_600)),
        ];
        for tick in &ticks {
            let record = record(&service, tick);
            service.submit(&record).await.unwrap();
        }
        assert_eq!(service.active_symbols(), vec!["AAPL", "MSFT"]);

        let charts = service.shutdown().await.unwrap();

        let aapl = &charts["AAPL"];
        assert_eq!(aapl.size(), 2);
        assert_eq!(aapl.get_bar(1).unwrap().low_price(), dec!(99.00));
        assert!(aapl.get_bar(1).unwrap().is_closed());
        assert_eq!(charts["MSFT"].get_bar(0).unwrap().volume(), 5);
    }

    #[tokio::test]
    async fn unknown_symbol_code_fails_decode() {
        let mut service = service();
        let record = TickRecord::from_fields(
            InternalTimestamp::ZERO,
            crate::domain::SymbolCode::new(42),
            100,
            1,
        );

        let result = service.submit(&record).await;

        assert!(matches!(result, Err(MarketDataError::MissingSymbol { .. })));
        assert!(service.active_symbols().is_empty());
    }

    #[tokio::test]
    async fn missing_data_mark_reaches_writer() {
        let mut service = service();
        let tick = Tick::new("AAPL", dec!(100), 1, InternalTimestamp::from_millis(0));
        service.submit_tick(tick).await.unwrap();

        service.mark_missing_data("AAPL").await.unwrap();

        let charts = service.shutdown().await.unwrap();
        assert!(charts["AAPL"].get_bar(0).unwrap().is_marked_missing_data());
    }

    #[tokio::test]
    async fn rejected_ticks_do_not_stop_the_writer() {
        let mut service = service();
        service
            .submit_tick(Tick::new("AAPL", dec!(-5), 1, InternalTimestamp::from_millis(0)))
            .await
            .unwrap();
        service
            .submit_tick(Tick::new("AAPL", dec!(5), 1, InternalTimestamp::from_millis(0)))
            .await
            .unwrap();

        let charts = service.shutdown().await.unwrap();
        assert_eq!(charts["AAPL"].get_bar(0).unwrap().tick_count(), 1);
    }
}
