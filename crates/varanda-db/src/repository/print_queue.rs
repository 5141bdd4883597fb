//! # Print Queue Repository
//!
//! The `fila_impressao` table shared by the POS (producer) and the printer
//! listener (consumer).
//!
//! ## Job Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POS: enqueue(conteudo) ──► status = 'pendente'                        │
//! │                                  │                                      │
//! │  listener: fetch_pending() ◄─────┘  (oldest first, one at a time)      │
//! │       │                                                                 │
//! │       ├── printed  ──► mark_printed() ──► 'impresso' + printed_at      │
//! │       └── failed   ──► mark_error(msg) ─► 'erro' + erro                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use varanda_core::{PrintJob, PrintJobStatus};

const COLUMNS: &str = "id, conteudo AS content, status, erro AS error, created_at, printed_at";

pub(crate) async fn enqueue(conn: &mut SqliteConnection, content: &str) -> DbResult<PrintJob> {
    let job = PrintJob {
        id: Uuid::new_v4().to_string(),
        content: content.to_string(),
        status: PrintJobStatus::Pending,
        error: None,
        created_at: Utc::now(),
        printed_at: None,
    };

    debug!(id = %job.id, bytes = content.len(), "Enqueuing print job");

    sqlx::query(
        r#"
        INSERT INTO fila_impressao (id, conteudo, status, erro, created_at, printed_at)
        VALUES (?1, ?2, ?3, NULL, ?4, NULL)
        "#,
    )
    .bind(&job.id)
    .bind(&job.content)
    .bind(job.status)
    .bind(job.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(job)
}

/// Repository for the print queue.
#[derive(Debug, Clone)]
pub struct PrintQueueRepository {
    pool: SqlitePool,
}

impl PrintQueueRepository {
    /// Creates a new PrintQueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PrintQueueRepository { pool }
    }

    /// Queues a JSON ticket or plain text for printing.
    pub async fn enqueue(&self, content: &str) -> DbResult<PrintJob> {
        let mut conn = self.pool.acquire().await?;
        enqueue(&mut conn, content).await
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<PrintJob>> {
        let job = sqlx::query_as::<_, PrintJob>(&format!(
            "SELECT {COLUMNS} FROM fila_impressao WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Pending jobs, oldest first.
    pub async fn fetch_pending(&self, limit: u32) -> DbResult<Vec<PrintJob>> {
        let jobs = sqlx::query_as::<_, PrintJob>(&format!(
            "SELECT {COLUMNS} FROM fila_impressao WHERE status = 'pendente' \
             ORDER BY created_at, rowid LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    pub async fn mark_printed(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Marking print job as printed");

        let result = sqlx::query(
            "UPDATE fila_impressao SET status = ?2, printed_at = ?3, erro = NULL WHERE id = ?1",
        )
        .bind(id)
        .bind(PrintJobStatus::Printed)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Impressão", id));
        }
        Ok(())
    }

    pub async fn mark_error(&self, id: &str, message: &str) -> DbResult<()> {
        warn!(id = %id, error = %message, "Marking print job as failed");

        let result = sqlx::query("UPDATE fila_impressao SET status = ?2, erro = ?3 WHERE id = ?1")
            .bind(id)
            .bind(PrintJobStatus::Error)
            .bind(message)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Impressão", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing;
    use varanda_core::PrintJobStatus;

    #[tokio::test]
    async fn test_pending_jobs_leave_the_queue_once_handled() {
        let db = testing::test_db().await;
        let queue = db.print_queue();

        let first = queue.enqueue(r#"{"nome":"Mesa 4","itens":[]}"#).await.unwrap();
        let second = queue.enqueue("texto livre").await.unwrap();

        let pending = queue.fetch_pending(10).await.unwrap();
        assert_eq!(
            pending.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(),
            vec![first.id.as_str(), second.id.as_str()]
        );

        queue.mark_printed(&first.id).await.unwrap();
        queue.mark_error(&second.id, "impressora desconectada").await.unwrap();
        assert!(queue.fetch_pending(10).await.unwrap().is_empty());

        let printed = queue.get(&first.id).await.unwrap().unwrap();
        assert_eq!(printed.status, PrintJobStatus::Printed);
        assert!(printed.printed_at.is_some());

        let failed = queue.get(&second.id).await.unwrap().unwrap();
        assert_eq!(failed.status, PrintJobStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("impressora desconectada"));
        assert_eq!(failed.content, "texto livre");
    }
}
