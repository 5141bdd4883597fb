//! # Print Queue Listener
//!
//! Polls `fila_impressao` and prints pending jobs.
//!
//! ## Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  every poll_interval:                                                   │
//! │    fetch_pending(batch) ── oldest first                                 │
//! │        │                                                                │
//! │        ▼  one job at a time (awaited, never concurrent)                 │
//! │    TicketPayload::parse(content) ─► render(width) ─► ESC/POS bytes      │
//! │        │                                                                │
//! │        ▼  copies × FallbackChain::print                                 │
//! │    ok  ──► status 'impresso', printed_at                                │
//! │    err ──► status 'erro', erro = every strategy's cause                 │
//! │    status write fails ──► logged, batch goes on                         │
//! │                                                                         │
//! │  shutdown (Ctrl-C / handle) ── finishes the current job, then stops     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use varanda_core::ticket::TicketPayload;
use varanda_core::PrintJob;
use varanda_db::{DbResult, PrintQueueRepository};

use crate::config::ListenerConfig;
use crate::error::PrintResult;
use crate::escpos::{ticket_bytes, PrinterType};
use crate::strategy::FallbackChain;

/// What to print and how often.
#[derive(Debug, Clone, Copy)]
pub struct JobSettings {
    pub printer_type: PrinterType,
    pub width: usize,
    pub copies: u32,
    pub poll_interval: Duration,
    pub batch_size: u32,
}

impl From<&ListenerConfig> for JobSettings {
    fn from(config: &ListenerConfig) -> Self {
        JobSettings {
            printer_type: config.printer_type,
            width: config.width,
            copies: config.copies,
            poll_interval: config.poll_interval,
            batch_size: config.batch_size,
        }
    }
}

/// Outcome counts of one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub printed: usize,
    pub failed: usize,
}

/// Stops a running listener.
#[derive(Clone)]
pub struct ListenerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ListenerHandle {
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Listener already stopped");
        }
    }
}

/// Drains the print queue.
pub struct PrintListener {
    queue: PrintQueueRepository,
    chain: FallbackChain,
    settings: JobSettings,
    shutdown_rx: mpsc::Receiver<()>,
}

impl PrintListener {
    pub fn new(
        queue: PrintQueueRepository,
        chain: FallbackChain,
        settings: JobSettings,
    ) -> (Self, ListenerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let listener = PrintListener {
            queue,
            chain,
            settings,
            shutdown_rx,
        };
        (listener, ListenerHandle { shutdown_tx })
    }

    /// Runs until shutdown.
    pub async fn run(mut self) {
        info!(
            strategies = ?self.chain.names(),
            copies = self.settings.copies,
            poll_ms = self.settings.poll_interval.as_millis() as u64,
            "Print listener starting"
        );

        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.poll_once().await {
                        error!(error = %e, "Failed to read print queue");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Print listener shutting down");
                    break;
                }
            }
        }

        info!("Print listener stopped");
    }

    /// Prints every pending job of one batch, in order.
    ///
    /// Only reading the queue is fatal. A job whose status cannot be
    /// written stays `pendente` and comes back on a later poll.
    pub async fn poll_once(&self) -> DbResult<PollSummary> {
        let jobs = self.queue.fetch_pending(self.settings.batch_size).await?;
        if jobs.is_empty() {
            return Ok(PollSummary::default());
        }
        debug!(count = jobs.len(), "Pending print jobs");

        let mut summary = PollSummary::default();
        for job in jobs {
            match self.print_job(&job).await {
                Ok(strategy) => {
                    info!(id = %job.id, strategy = %strategy, copies = self.settings.copies, "Job printed");
                    summary.printed += 1;
                    if let Err(e) = self.queue.mark_printed(&job.id).await {
                        error!(id = %job.id, error = %e, "Printed job could not be marked");
                    }
                }
                Err(e) => {
                    error!(id = %job.id, error = %e, "Job failed");
                    summary.failed += 1;
                    if let Err(mark) = self.queue.mark_error(&job.id, &e.to_string()).await {
                        error!(id = %job.id, error = %mark, "Failed job could not be marked");
                    }
                }
            }
        }
        Ok(summary)
    }

    /// Prints all copies of one job; returns the strategy used last.
    async fn print_job(&self, job: &PrintJob) -> PrintResult<String> {
        let width = self.settings.width;
        let text = TicketPayload::parse(&job.content).render(width);
        let bytes = ticket_bytes(self.settings.printer_type, width, &text);

        let mut used = String::new();
        for copy in 1..=self.settings.copies {
            used = self.chain.print(&bytes, &text).await?.to_string();
            debug!(id = %job.id, copy, strategy = %used, "Copy printed");
        }
        Ok(used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrintError;
    use crate::strategy::PrintStrategy;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use varanda_core::PrintJobStatus;
    use varanda_db::{Database, DbConfig};

    #[derive(Clone, Default)]
    struct Spool(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl PrintStrategy for Spool {
        fn name(&self) -> &str {
            "spool"
        }

        async fn attempt(&self, _bytes: &[u8], text: &str) -> PrintResult<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Offline;

    #[async_trait]
    impl PrintStrategy for Offline {
        fn name(&self) -> &str {
            "rede"
        }

        async fn attempt(&self, _bytes: &[u8], _text: &str) -> PrintResult<()> {
            Err(PrintError::Connection("10.0.0.9:9100: recusada".to_string()))
        }
    }

    /// Prints, but the job row disappears mid-print (queue cleared by hand).
    struct Vanishing {
        pool: sqlx::SqlitePool,
        spool: Spool,
    }

    #[async_trait]
    impl PrintStrategy for Vanishing {
        fn name(&self) -> &str {
            "spool"
        }

        async fn attempt(&self, bytes: &[u8], text: &str) -> PrintResult<()> {
            if text == "cancelado" {
                sqlx::query("DELETE FROM fila_impressao WHERE conteudo = ?1")
                    .bind(text)
                    .execute(&self.pool)
                    .await
                    .unwrap();
            }
            self.spool.attempt(bytes, text).await
        }
    }

    fn settings(copies: u32) -> JobSettings {
        JobSettings {
            printer_type: PrinterType::Epson,
            width: 32,
            copies,
            poll_interval: Duration::from_millis(100),
            batch_size: 10,
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_jobs_print_in_order_with_copies() {
        let db = db().await;
        let first = db
            .print_queue()
            .enqueue(r#"{"nome":"Ana","mesa":"4","itens":[{"nome":"Pastel","quantidade":2}]}"#)
            .await
            .unwrap();
        let second = db.print_queue().enqueue("Fechamento do caixa").await.unwrap();

        let spool = Spool::default();
        let (listener, _handle) =
            PrintListener::new(db.print_queue(), FallbackChain::new().with(spool.clone()), settings(2));

        let summary = listener.poll_once().await.unwrap();
        assert_eq!(summary, PollSummary { printed: 2, failed: 0 });

        let printed = spool.0.lock().unwrap().clone();
        assert_eq!(printed.len(), 4);
        assert!(printed[0].contains("MESA 4"));
        assert!(printed[0].contains("2x Pastel"));
        assert_eq!(printed[0], printed[1]);
        assert_eq!(printed[2], "Fechamento do caixa");

        for id in [&first.id, &second.id] {
            let job = db.print_queue().get(id).await.unwrap().unwrap();
            assert_eq!(job.status, PrintJobStatus::Printed);
            assert!(job.printed_at.is_some());
        }

        // Nothing left to do.
        assert_eq!(listener.poll_once().await.unwrap(), PollSummary::default());
    }

    #[tokio::test]
    async fn test_failure_is_recorded_on_the_job() {
        let db = db().await;
        let job = db.print_queue().enqueue("teste").await.unwrap();

        let (listener, _handle) =
            PrintListener::new(db.print_queue(), FallbackChain::new().with(Offline), settings(2));

        let summary = listener.poll_once().await.unwrap();
        assert_eq!(summary.failed, 1);

        let job = db.print_queue().get(&job.id).await.unwrap().unwrap();
        assert_eq!(job.status, PrintJobStatus::Error);
        assert!(job.error.unwrap().contains("rede: Connection failed"));
    }

    #[tokio::test]
    async fn test_unmarkable_job_does_not_stop_the_batch() {
        let db = db().await;
        db.print_queue().enqueue("cancelado").await.unwrap();
        let next = db.print_queue().enqueue("Pedido 2").await.unwrap();

        let spool = Spool::default();
        let strategy = Vanishing {
            pool: db.pool().clone(),
            spool: spool.clone(),
        };
        let (listener, _handle) =
            PrintListener::new(db.print_queue(), FallbackChain::new().with(strategy), settings(1));

        let summary = listener.poll_once().await.unwrap();
        assert_eq!(summary, PollSummary { printed: 2, failed: 0 });
        assert_eq!(*spool.0.lock().unwrap(), vec!["cancelado", "Pedido 2"]);

        let next = db.print_queue().get(&next.id).await.unwrap().unwrap();
        assert_eq!(next.status, PrintJobStatus::Printed);
    }

    #[tokio::test]
    async fn test_unmarkable_failure_does_not_stop_the_batch() {
        let db = db().await;
        let first = db.print_queue().enqueue("primeiro").await.unwrap();
        let second = db.print_queue().enqueue("segundo").await.unwrap();
        let queue = db.print_queue();

        // Fails, and the first row is deleted before it can be marked.
        struct DropsFirst {
            pool: sqlx::SqlitePool,
            id: String,
        }

        #[async_trait]
        impl PrintStrategy for DropsFirst {
            fn name(&self) -> &str {
                "rede"
            }

            async fn attempt(&self, _bytes: &[u8], _text: &str) -> PrintResult<()> {
                sqlx::query("DELETE FROM fila_impressao WHERE id = ?1")
                    .bind(&self.id)
                    .execute(&self.pool)
                    .await
                    .unwrap();
                Err(PrintError::Connection("10.0.0.9:9100: recusada".to_string()))
            }
        }

        let strategy = DropsFirst {
            pool: db.pool().clone(),
            id: first.id.clone(),
        };
        let (listener, _handle) =
            PrintListener::new(queue, FallbackChain::new().with(strategy), settings(1));

        let summary = listener.poll_once().await.unwrap();
        assert_eq!(summary, PollSummary { printed: 0, failed: 2 });

        let second = db.print_queue().get(&second.id).await.unwrap().unwrap();
        assert_eq!(second.status, PrintJobStatus::Error);
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_loop() {
        let db = db().await;
        let (listener, handle) =
            PrintListener::new(db.print_queue(), FallbackChain::new().with(Spool::default()), settings(1));

        let task = tokio::spawn(listener.run());
        handle.shutdown().await;
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
