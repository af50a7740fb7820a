//! Invoice aggregate: line items, sent/paid tracking and exact totals.

use chrono::{DateTime, Utc};
use core::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hallbook_core::{DomainError, EventId, InvoiceId, InvoiceItemId};

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Raised,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Raised => "raised",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raised" => Ok(InvoiceStatus::Raised),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown invoice status: {other:?}"
            ))),
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line on an invoice. Immutable once the invoice is created.
///
/// Costs are signed exact decimals; a negative cost is a discount line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub event_id: Option<EventId>,
    pub description: String,
    pub cost: Decimal,
}

/// An item as requested by the caller, before ids are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    pub event_id: Option<EventId>,
    pub description: String,
    pub cost: Decimal,
}

/// An invoice raised against a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub reference: String,
    pub contact_email: String,
    pub items: Vec<InvoiceItem>,
    pub sent: Option<DateTime<Utc>>,
    pub paid: Option<DateTime<Utc>>,
    pub status: InvoiceStatus,
}

impl Invoice {
    /// Assemble a freshly raised invoice. An empty item list is legal.
    pub fn raised(
        reference: impl Into<String>,
        contact_email: impl Into<String>,
        items: Vec<NewInvoiceItem>,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            reference: reference.into(),
            contact_email: contact_email.into(),
            items: items
                .into_iter()
                .map(|item| InvoiceItem {
                    id: InvoiceItemId::new(),
                    event_id: item.event_id,
                    description: item.description,
                    cost: item.cost,
                })
                .collect(),
            sent: None,
            paid: None,
            status: InvoiceStatus::Raised,
        }
    }

    /// Exact decimal sum over item costs, discounts included.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(|item| item.cost).sum()
    }

    pub fn is_sent(&self) -> bool {
        self.sent.is_some()
    }

    /// Invariant: the paid timestamp is set exactly when the status says paid.
    pub fn payment_state_consistent(&self) -> bool {
        self.paid.is_some() == (self.status == InvoiceStatus::Paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(description: &str, cost: Decimal) -> NewInvoiceItem {
        NewInvoiceItem {
            event_id: None,
            description: description.to_string(),
            cost,
        }
    }

    #[test]
    fn total_sums_items_with_discounts_exactly() {
        let invoice = Invoice::raised(
            "ABCDEF",
            "hirer@example.org",
            vec![
                item("Hall hire", dec("125.00")),
                item("Regular hirer discount", dec("-25.00")),
                item("Deposit", dec("100.00")),
            ],
        );

        assert_eq!(invoice.total(), dec("200.00"));
    }

    #[test]
    fn total_has_no_floating_point_drift() {
        let invoice = Invoice::raised(
            "ABCDEF",
            "hirer@example.org",
            vec![item("a", dec("0.10")), item("b", dec("0.20"))],
        );

        // 0.1 + 0.2 != 0.3 in binary floats; it must be exact here.
        assert_eq!(invoice.total(), dec("0.30"));
    }

    #[test]
    fn empty_invoice_is_legal_and_totals_zero() {
        let invoice = Invoice::raised("ABCDEF", "hirer@example.org", vec![]);
        assert!(invoice.items.is_empty());
        assert_eq!(invoice.total(), Decimal::ZERO);
    }

    #[test]
    fn fresh_invoice_is_raised_and_unsent() {
        let invoice = Invoice::raised("ABCDEF", "hirer@example.org", vec![]);
        assert_eq!(invoice.status, InvoiceStatus::Raised);
        assert!(!invoice.is_sent());
        assert!(invoice.paid.is_none());
        assert!(invoice.payment_state_consistent());
    }

    #[test]
    fn paid_timestamp_must_match_status() {
        let mut invoice = Invoice::raised("ABCDEF", "hirer@example.org", vec![]);

        invoice.status = InvoiceStatus::Paid;
        assert!(!invoice.payment_state_consistent());

        invoice.paid = Some(Utc::now());
        assert!(invoice.payment_state_consistent());

        invoice.status = InvoiceStatus::Raised;
        assert!(!invoice.payment_state_consistent());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            InvoiceStatus::Raised,
            InvoiceStatus::Paid,
            InvoiceStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
        assert!("void".parse::<InvoiceStatus>().is_err());
    }
}
