//! In-memory store.
//!
//! Intended for tests/dev, wired behind the same ports as Postgres. The
//! overlap guard's table lock maps to a store-wide submission mutex: all
//! booking submissions queue behind it, so check-then-insert stays
//! race-free here too.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use hallbook_booking::{
    overlap_buffer, BookingEvent, EventDraft, EventSeriesDraft, EventStatus, Visibility,
    RATE_DEFAULT,
};
use hallbook_core::{EventId, InvoiceId, TimeRange};
use hallbook_invoicing::{
    generate_reference, DiscountTable, Invoice, InvoiceStatus, NewInvoiceItem, Rate,
};
use hallbook_workflow::{
    BookingStore, InvoiceStore, InvoiceSummary, InvoiceableEvent, StoreError,
};

const REFERENCE_ATTEMPTS: usize = 5;

#[derive(Debug, Default)]
struct State {
    contacts: HashMap<String, String>,
    events: HashMap<EventId, BookingEvent>,
    invoices: HashMap<InvoiceId, Invoice>,
    rates: Vec<Rate>,
}

/// In-memory booking and invoice store.
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<State>,
    /// Serializes booking submissions; the analog of the Postgres
    /// table-level lock.
    submission: Mutex<()>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// An empty store seeded with the default hire rate.
    pub fn new() -> Self {
        let state = State {
            rates: vec![Rate {
                id: RATE_DEFAULT.to_string(),
                description: "Standard hourly hire".to_string(),
                hourly_rate: rust_decimal::Decimal::new(2500, 2),
                discounts: DiscountTable::default(),
            }],
            ..State::default()
        };

        Self {
            state: RwLock::new(state),
            submission: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::storage("state lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::storage("state lock poisoned"))
    }
}

fn conflicts(state: &State, proposed: &TimeRange) -> bool {
    let buffer = overlap_buffer();
    state
        .events
        .values()
        .filter(|event| event.is_live())
        .any(|event| proposed.collides_with_buffered(&event.range.buffered(buffer)))
}

fn ensure_contact(state: &mut State, email: &str, name: &str) {
    // Insert-if-absent: the name is fixed at first insertion.
    state
        .contacts
        .entry(email.to_string())
        .or_insert_with(|| name.to_string());
}

#[allow(clippy::too_many_arguments)]
fn insert_event(
    state: &mut State,
    draft_range: TimeRange,
    name: &str,
    visibility: Visibility,
    details: &str,
    email: &str,
    status: EventStatus,
    rate_id: &str,
) -> EventId {
    let id = EventId::new();
    state.events.insert(
        id,
        BookingEvent {
            id,
            range: draft_range,
            name: name.to_string(),
            visibility,
            status,
            rate_id: rate_id.to_string(),
            details: details.to_string(),
            contact_email: email.to_string(),
        },
    );
    id
}

fn in_window(event: &BookingEvent, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    let (start, end) = (event.range.start(), event.range.end());
    (start >= from && start <= to) || (end >= from && end <= to)
}

fn diary_order(events: &mut [BookingEvent]) {
    events.sort_by(|a, b| {
        (a.range.start(), a.range.end(), a.name.as_str()).cmp(&(
            b.range.start(),
            b.range.end(),
            b.name.as_str(),
        ))
    });
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn submit_event(&self, draft: &EventDraft) -> Result<EventId, StoreError> {
        let _guard = self.submission.lock().await;
        let mut state = self.write()?;

        ensure_contact(&mut state, &draft.contact.email, &draft.contact.name);

        if conflicts(&state, &draft.range) {
            return Err(StoreError::Conflict);
        }

        let id = insert_event(
            &mut state,
            draft.range,
            &draft.name,
            draft.visibility,
            &draft.details,
            &draft.contact.email,
            EventStatus::Provisional,
            RATE_DEFAULT,
        );

        debug!(event = %id, "accepted booking");
        Ok(id)
    }

    async fn submit_event_series(
        &self,
        draft: &EventSeriesDraft,
    ) -> Result<Vec<EventId>, StoreError> {
        let _guard = self.submission.lock().await;
        let mut state = self.write()?;

        // Stage into a scratch copy so the first conflicting instance
        // rolls back the whole series.
        let mut staged = State {
            contacts: state.contacts.clone(),
            events: state.events.clone(),
            invoices: HashMap::new(),
            rates: Vec::new(),
        };

        ensure_contact(&mut staged, &draft.contact.email, &draft.contact.name);

        let mut ids = Vec::with_capacity(draft.ranges.len());
        for range in &draft.ranges {
            if conflicts(&staged, range) {
                return Err(StoreError::Conflict);
            }
            ids.push(insert_event(
                &mut staged,
                *range,
                &draft.name,
                draft.visibility,
                &draft.details,
                &draft.contact.email,
                draft.status,
                &draft.rate_id,
            ));
        }

        state.contacts = staged.contacts;
        state.events = staged.events;
        Ok(ids)
    }

    async fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, StoreError> {
        let state = self.read()?;
        let mut events: Vec<BookingEvent> = state
            .events
            .values()
            .filter(|event| in_window(event, from, to))
            .cloned()
            .collect();
        diary_order(&mut events);
        Ok(events)
    }

    async fn list_events_for_contact(
        &self,
        contact_email: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, StoreError> {
        let state = self.read()?;
        let mut events: Vec<BookingEvent> = state
            .events
            .values()
            .filter(|event| event.contact_email == contact_email && in_window(event, from, to))
            .cloned()
            .collect();
        diary_order(&mut events);
        Ok(events)
    }

    async fn get_event(&self, id: EventId) -> Result<BookingEvent, StoreError> {
        let state = self.read()?;
        state.events.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_contact_name(&self, email: &str) -> Result<String, StoreError> {
        let state = self.read()?;
        state.contacts.get(email).cloned().ok_or(StoreError::NotFound)
    }

    async fn set_event_status(&self, id: EventId, status: EventStatus) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let event = state.events.get_mut(&id).ok_or(StoreError::NotFound)?;
        event.status = status;
        Ok(())
    }

    async fn set_event_rate(&self, id: EventId, rate_id: &str) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let event = state.events.get_mut(&id).ok_or(StoreError::NotFound)?;
        event.rate_id = rate_id.to_string();
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn create_invoice(
        &self,
        contact_email: &str,
        items: Vec<NewInvoiceItem>,
    ) -> Result<Invoice, StoreError> {
        let mut state = self.write()?;

        let mut rng = rand::thread_rng();
        let reference = (0..REFERENCE_ATTEMPTS)
            .map(|_| generate_reference(&mut rng))
            .find(|candidate| {
                !state
                    .invoices
                    .values()
                    .any(|invoice| invoice.reference == *candidate)
            })
            .ok_or_else(|| StoreError::storage("could not generate a unique reference"))?;

        let invoice = Invoice::raised(reference, contact_email, items);
        state.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        let state = self.read()?;
        state.invoices.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn mark_invoice_sent(&self, id: InvoiceId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let invoice = state.invoices.get_mut(&id).ok_or(StoreError::NotFound)?;
        invoice.sent = Some(Utc::now());
        Ok(())
    }

    async fn mark_invoice_paid(&self, id: InvoiceId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let invoice = state.invoices.get_mut(&id).ok_or(StoreError::NotFound)?;
        invoice.paid = Some(Utc::now());
        invoice.status = InvoiceStatus::Paid;
        Ok(())
    }

    async fn invoices_for_event(&self, id: EventId) -> Result<Vec<InvoiceSummary>, StoreError> {
        let state = self.read()?;
        let mut summaries: Vec<InvoiceSummary> = state
            .invoices
            .values()
            .filter(|invoice| invoice.items.iter().any(|item| item.event_id == Some(id)))
            .map(|invoice| InvoiceSummary {
                id: invoice.id,
                reference: invoice.reference.clone(),
                status: invoice.status,
                sent: invoice.sent,
                paid: invoice.paid,
            })
            .collect();
        summaries.sort_by(|a, b| a.reference.cmp(&b.reference));
        Ok(summaries)
    }

    async fn events_for_invoicing(
        &self,
        ids: &[EventId],
    ) -> Result<Vec<InvoiceableEvent>, StoreError> {
        let state = self.read()?;

        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            let event = state.events.get(id).ok_or(StoreError::NotFound)?;
            let rate = state
                .rates
                .iter()
                .find(|rate| rate.id == event.rate_id)
                .ok_or(StoreError::NotFound)?;

            events.push(InvoiceableEvent {
                id: event.id,
                range: event.range,
                name: event.name.clone(),
                status: event.status,
                contact_email: event.contact_email.clone(),
                hourly_rate: rate.hourly_rate,
                discounts: rate.discounts.clone(),
            });
        }

        events.sort_by(|a, b| {
            (a.contact_email.as_str(), a.name.as_str(), a.range.start()).cmp(&(
                b.contact_email.as_str(),
                b.name.as_str(),
                b.range.start(),
            ))
        });
        Ok(events)
    }

    async fn list_rates(&self) -> Result<Vec<Rate>, StoreError> {
        let state = self.read()?;
        Ok(state.rates.clone())
    }
}
