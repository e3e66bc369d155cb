//! Invoice aggregate: the invoice itself, the two companies on it, and its
//! line entries.
//!
//! Identifiers are `Option<i64>`: `None` marks a value that has never been
//! persisted. Backends allocate ids; callers never pick them. Monetary
//! amounts are `rust_decimal::Decimal`; the store keeps whatever net/gross
//! values the caller computed and never recomputes them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// VAT rate bands applicable to an invoice entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vat {
    /// 0%
    Vat0,
    /// 5%
    Vat5,
    /// 8%
    Vat8,
    /// 23%
    Vat23,
}

impl Vat {
    /// The rate as a fraction (`0.23` for 23%).
    pub fn rate(&self) -> Decimal {
        match self {
            Vat::Vat0 => Decimal::new(0, 2),
            Vat::Vat5 => Decimal::new(5, 2),
            Vat::Vat8 => Decimal::new(8, 2),
            Vat::Vat23 => Decimal::new(23, 2),
        }
    }

    /// Reverse lookup used by the SQL codecs, which store the numeric rate.
    pub fn from_rate(rate: Decimal) -> Option<Vat> {
        [Vat::Vat0, Vat::Vat5, Vat::Vat8, Vat::Vat23]
            .into_iter()
            .find(|v| v.rate() == rate)
    }
}

/// A party on an invoice, seller or buyer.
///
/// Two invoices may reference the same company; the relational backend
/// de-duplicates on id instead of inserting a second row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: Option<i64>,
    pub name: String,
    pub address: String,
    pub tax_id: String,
    pub account_number: String,
    pub phone_number: String,
    pub email: String,
}

/// One line item on an invoice.
///
/// `gross_value = net_value + net_value * vat_rate` is the caller's promise,
/// not the store's: values round-trip exactly as supplied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceEntry {
    pub id: Option<i64>,
    pub description: String,
    pub quantity: i64,
    pub price: Decimal,
    pub net_value: Decimal,
    pub gross_value: Decimal,
    pub vat_rate: Vat,
}

/// The full invoice aggregate: header, seller, buyer, and ordered entries.
///
/// Saved and deleted as one unit. An update replaces the whole aggregate;
/// there is no partial-update path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Option<i64>,
    pub number: String,
    pub issued_date: NaiveDate,
    pub due_date: NaiveDate,
    pub seller: Company,
    pub buyer: Company,
    pub entries: Vec<InvoiceEntry>,
}

impl Invoice {
    /// Copy of this invoice carrying the given id, as returned from `save`.
    pub fn with_id(&self, id: i64) -> Invoice {
        Invoice {
            id: Some(id),
            ..self.clone()
        }
    }
}
