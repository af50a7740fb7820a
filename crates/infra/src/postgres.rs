//! Postgres-backed store (sqlx).
//!
//! The overlap guard runs as one transaction per submission: take the
//! table-level intent lock, count live bookings whose buffered window
//! intersects the proposal, insert only when the count is zero. The lock
//! serializes all concurrent submissions, so check-then-insert cannot
//! race; it is held for a handful of statements only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use hallbook_booking::{
    BookingEvent, Contact, EventDraft, EventSeriesDraft, EventStatus, Visibility, RATE_DEFAULT,
};
use hallbook_core::{EventId, InvoiceId, TimeRange};
use hallbook_invoicing::{
    generate_reference, DiscountTable, Invoice, InvoiceItem, InvoiceStatus, NewInvoiceItem, Rate,
};
use hallbook_workflow::{
    BookingStore, InvoiceStore, InvoiceSummary, InvoiceableEvent, StoreError,
};

const REFERENCE_ATTEMPTS: usize = 5;

/// Booking and invoice store over a Postgres pool.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("starting db migration check");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("db migration check completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Storage(other.to_string()),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

async fn lock_events_table(tx: &mut Transaction<'_, Postgres>) -> Result<(), StoreError> {
    sqlx::query("LOCK TABLE booking_events IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut **tx)
        .await
        .map_err(|e| StoreError::storage(format!("failed to lock table: {e}")))?;
    Ok(())
}

async fn ensure_contact_exists(
    tx: &mut Transaction<'_, Postgres>,
    contact: &Contact,
) -> Result<(), StoreError> {
    // Insert-if-absent: the stored name is never overwritten by later
    // requests with the same email.
    sqlx::query("INSERT INTO booking_contacts (email, name) VALUES ($1, $2) ON CONFLICT (email) DO NOTHING")
        .bind(&contact.email)
        .bind(&contact.name)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Count live bookings whose buffered window intersects `[start, end)`:
/// proposed start inside one, proposed end inside one, or the proposal
/// containing one outright.
async fn count_nearby_bookings(
    tx: &mut Transaction<'_, Postgres>,
    range: &TimeRange,
) -> Result<i64, StoreError> {
    sqlx::query_scalar(
        r"SELECT count(*) FROM booking_events
          WHERE status <> 'cancelled'
            AND ((event_start - interval '30 minutes' <= $1 AND event_end + interval '30 minutes' >= $1)
             OR (event_start - interval '30 minutes' <= $2 AND event_end + interval '30 minutes' >= $2)
             OR (event_start - interval '30 minutes' >= $1 AND event_end + interval '30 minutes' <= $2))",
    )
    .bind(range.start())
    .bind(range.end())
    .fetch_one(&mut **tx)
    .await
    .map_err(db_err)
}

#[allow(clippy::too_many_arguments)]
async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    range: &TimeRange,
    name: &str,
    visibility: Visibility,
    details: &str,
    email: &str,
    status: EventStatus,
    rate_id: &str,
) -> Result<EventId, StoreError> {
    let id = EventId::new();
    sqlx::query(
        r"INSERT INTO booking_events
          (id, event_start, event_end, event_name, visible, email, status, rate_id, details)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id.as_uuid())
    .bind(range.start())
    .bind(range.end())
    .bind(name)
    .bind(visibility.is_public())
    .bind(email)
    .bind(status.as_str())
    .bind(rate_id)
    .bind(details)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(id)
}

fn event_from_row(row: &PgRow) -> Result<BookingEvent, StoreError> {
    let id: Uuid = row.try_get("id").map_err(db_err)?;
    let start: DateTime<Utc> = row.try_get("event_start").map_err(db_err)?;
    let end: DateTime<Utc> = row.try_get("event_end").map_err(db_err)?;
    let name: String = row.try_get("event_name").map_err(db_err)?;
    let visible: bool = row.try_get("visible").map_err(db_err)?;
    let status: String = row.try_get("status").map_err(db_err)?;
    let rate_id: String = row.try_get("rate_id").map_err(db_err)?;
    let details: String = row.try_get("details").map_err(db_err)?;
    let email: String = row.try_get("email").map_err(db_err)?;

    // Reject malformed rows at the boundary rather than carrying free-form
    // strings into the domain.
    let status: EventStatus = status
        .parse()
        .map_err(|e| StoreError::storage(format!("bad status on event {id}: {e}")))?;
    let range = TimeRange::new(start, end)
        .map_err(|e| StoreError::storage(format!("bad time range on event {id}: {e}")))?;

    Ok(BookingEvent {
        id: EventId::from_uuid(id),
        range,
        name,
        visibility: Visibility::from(visible),
        status,
        rate_id,
        details,
        contact_email: email,
    })
}

const SELECT_EVENT_COLUMNS: &str =
    "SELECT id, event_start, event_end, event_name, visible, status, rate_id, details, email
     FROM booking_events";

#[async_trait]
impl BookingStore for PostgresStore {
    async fn submit_event(&self, draft: &EventDraft) -> Result<EventId, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        ensure_contact_exists(&mut tx, &draft.contact).await?;
        lock_events_table(&mut tx).await?;

        if count_nearby_bookings(&mut tx, &draft.range).await? > 0 {
            return Err(StoreError::Conflict);
        }

        let id = insert_event(
            &mut tx,
            &draft.range,
            &draft.name,
            draft.visibility,
            &draft.details,
            &draft.contact.email,
            EventStatus::Provisional,
            RATE_DEFAULT,
        )
        .await?;

        tx.commit().await.map_err(db_err)?;
        debug!(event = %id, "accepted booking");
        Ok(id)
    }

    async fn submit_event_series(
        &self,
        draft: &EventSeriesDraft,
    ) -> Result<Vec<EventId>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        ensure_contact_exists(&mut tx, &draft.contact).await?;
        lock_events_table(&mut tx).await?;

        let mut ids = Vec::with_capacity(draft.ranges.len());
        for range in &draft.ranges {
            if count_nearby_bookings(&mut tx, range).await? > 0 {
                return Err(StoreError::Conflict);
            }
            ids.push(
                insert_event(
                    &mut tx,
                    range,
                    &draft.name,
                    draft.visibility,
                    &draft.details,
                    &draft.contact.email,
                    draft.status,
                    &draft.rate_id,
                )
                .await?,
            );
        }

        tx.commit().await.map_err(db_err)?;
        Ok(ids)
    }

    async fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, StoreError> {
        let sql = format!(
            "{SELECT_EVENT_COLUMNS}
             WHERE (event_start >= $1 AND event_start <= $2)
                OR (event_end >= $1 AND event_end <= $2)
             ORDER BY event_start, event_end, event_name"
        );
        let rows = sqlx::query(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(event_from_row).collect()
    }

    async fn list_events_for_contact(
        &self,
        contact_email: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, StoreError> {
        let sql = format!(
            "{SELECT_EVENT_COLUMNS}
             WHERE ((event_start >= $1 AND event_start <= $2)
                 OR (event_end >= $1 AND event_end <= $2))
               AND email = $3
             ORDER BY event_start, event_end, event_name"
        );
        let rows = sqlx::query(&sql)
            .bind(from)
            .bind(to)
            .bind(contact_email)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(event_from_row).collect()
    }

    async fn get_event(&self, id: EventId) -> Result<BookingEvent, StoreError> {
        let sql = format!("{SELECT_EVENT_COLUMNS} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(StoreError::NotFound)?;

        event_from_row(&row)
    }

    async fn get_contact_name(&self, email: &str) -> Result<String, StoreError> {
        sqlx::query_scalar("SELECT name FROM booking_contacts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(StoreError::NotFound)
    }

    async fn set_event_status(&self, id: EventId, status: EventStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE booking_events SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_event_rate(&self, id: EventId, rate_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE booking_events SET rate_id = $1 WHERE id = $2")
            .bind(rate_id)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

impl PostgresStore {
    async fn try_insert_invoice(&self, invoice: &Invoice) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO booking_invoices (id, reference, contact, status) VALUES ($1, $2, $3, $4)",
        )
        .bind(invoice.id.as_uuid())
        .bind(&invoice.reference)
        .bind(&invoice.contact_email)
        .bind(invoice.status.as_str())
        .execute(&mut *tx)
        .await?;

        for item in &invoice.items {
            sqlx::query(
                r"INSERT INTO booking_invoice_items (id, invoice_id, event_id, description, cost)
                  VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id.as_uuid())
            .bind(invoice.id.as_uuid())
            .bind(item.event_id.map(|id| *id.as_uuid()))
            .bind(&item.description)
            .bind(item.cost)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}

#[async_trait]
impl InvoiceStore for PostgresStore {
    async fn create_invoice(
        &self,
        contact_email: &str,
        items: Vec<NewInvoiceItem>,
    ) -> Result<Invoice, StoreError> {
        // The reference carries a unique index; on a collision the whole
        // insert retries with a fresh code, bounded.
        for _ in 0..REFERENCE_ATTEMPTS {
            let reference = generate_reference(&mut rand::thread_rng());
            let invoice = Invoice::raised(reference, contact_email, items.clone());

            match self.try_insert_invoice(&invoice).await {
                Ok(()) => return Ok(invoice),
                Err(err) if is_unique_violation(&err) => {
                    debug!(reference = %invoice.reference, "invoice reference collision, retrying");
                    continue;
                }
                Err(err) => return Err(db_err(err)),
            }
        }

        Err(StoreError::storage(
            "could not generate a unique invoice reference",
        ))
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        let row = sqlx::query(
            "SELECT id, reference, contact, sent, paid, status FROM booking_invoices WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StoreError::NotFound)?;

        let invoice_id: Uuid = row.try_get("id").map_err(db_err)?;
        let reference: String = row.try_get("reference").map_err(db_err)?;
        let contact: String = row.try_get("contact").map_err(db_err)?;
        let sent: Option<DateTime<Utc>> = row.try_get("sent").map_err(db_err)?;
        let paid: Option<DateTime<Utc>> = row.try_get("paid").map_err(db_err)?;
        let status: String = row.try_get("status").map_err(db_err)?;
        let status: InvoiceStatus = status
            .parse()
            .map_err(|e| StoreError::storage(format!("bad status on invoice {invoice_id}: {e}")))?;

        let item_rows = sqlx::query(
            r"SELECT id, event_id, description, cost FROM booking_invoice_items
              WHERE invoice_id = $1 ORDER BY id",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut items = Vec::with_capacity(item_rows.len());
        for row in &item_rows {
            let item_id: Uuid = row.try_get("id").map_err(db_err)?;
            let event_id: Option<Uuid> = row.try_get("event_id").map_err(db_err)?;
            items.push(InvoiceItem {
                id: item_id.into(),
                event_id: event_id.map(EventId::from_uuid),
                description: row.try_get("description").map_err(db_err)?,
                cost: row.try_get("cost").map_err(db_err)?,
            });
        }

        Ok(Invoice {
            id: InvoiceId::from_uuid(invoice_id),
            reference,
            contact_email: contact,
            items,
            sent,
            paid,
            status,
        })
    }

    async fn mark_invoice_sent(&self, id: InvoiceId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE booking_invoices SET sent = now() WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn mark_invoice_paid(&self, id: InvoiceId) -> Result<(), StoreError> {
        // Timestamp and status land in one write so the paid-iff-paid
        // invariant cannot be observed half-applied.
        let result =
            sqlx::query("UPDATE booking_invoices SET paid = now(), status = 'paid' WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn invoices_for_event(&self, id: EventId) -> Result<Vec<InvoiceSummary>, StoreError> {
        let rows = sqlx::query(
            r"SELECT DISTINCT bi.id, bi.reference, bi.status, bi.sent, bi.paid
              FROM booking_invoices bi
              JOIN booking_invoice_items bii ON bi.id = bii.invoice_id
              WHERE bii.event_id = $1
              ORDER BY bi.reference",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let invoice_id: Uuid = row.try_get("id").map_err(db_err)?;
            let status: String = row.try_get("status").map_err(db_err)?;
            summaries.push(InvoiceSummary {
                id: InvoiceId::from_uuid(invoice_id),
                reference: row.try_get("reference").map_err(db_err)?,
                status: status.parse().map_err(|e| {
                    StoreError::storage(format!("bad status on invoice {invoice_id}: {e}"))
                })?,
                sent: row.try_get("sent").map_err(db_err)?,
                paid: row.try_get("paid").map_err(db_err)?,
            });
        }
        Ok(summaries)
    }

    async fn events_for_invoicing(
        &self,
        ids: &[EventId],
    ) -> Result<Vec<InvoiceableEvent>, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let rows = sqlx::query(
            r"SELECT be.id, be.event_start, be.event_end, be.event_name, be.status, be.email,
                     br.hourly_rate, br.discount_table
              FROM booking_events be
              JOIN booking_rates br ON be.rate_id = br.id
              WHERE be.id = ANY($1)
              ORDER BY be.email, be.event_name, be.event_start",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: Uuid = row.try_get("id").map_err(db_err)?;
            let start: DateTime<Utc> = row.try_get("event_start").map_err(db_err)?;
            let end: DateTime<Utc> = row.try_get("event_end").map_err(db_err)?;
            let status: String = row.try_get("status").map_err(db_err)?;
            let discounts: serde_json::Value = row.try_get("discount_table").map_err(db_err)?;

            events.push(InvoiceableEvent {
                id: EventId::from_uuid(id),
                range: TimeRange::new(start, end)
                    .map_err(|e| StoreError::storage(format!("bad time range on event {id}: {e}")))?,
                name: row.try_get("event_name").map_err(db_err)?,
                status: status.parse().map_err(|e| {
                    StoreError::storage(format!("bad status on event {id}: {e}"))
                })?,
                contact_email: row.try_get("email").map_err(db_err)?,
                hourly_rate: row.try_get("hourly_rate").map_err(db_err)?,
                discounts: serde_json::from_value::<DiscountTable>(discounts).map_err(|e| {
                    StoreError::storage(format!("bad discount table via event {id}: {e}"))
                })?,
            });
        }
        Ok(events)
    }

    async fn list_rates(&self) -> Result<Vec<Rate>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, description, hourly_rate, discount_table FROM booking_rates ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut rates = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id").map_err(db_err)?;
            let discounts: serde_json::Value = row.try_get("discount_table").map_err(db_err)?;
            rates.push(Rate {
                description: row.try_get("description").map_err(db_err)?,
                hourly_rate: row.try_get("hourly_rate").map_err(db_err)?,
                discounts: serde_json::from_value::<DiscountTable>(discounts).map_err(|e| {
                    StoreError::storage(format!("bad discount table on rate {id}: {e}"))
                })?,
                id,
            });
        }
        Ok(rates)
    }
}
