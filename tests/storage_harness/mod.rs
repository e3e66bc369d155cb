//! Shared test harness for storage backend testing
//!
//! Provides sample invoice and user builders plus the
//! `invoice_database_tests!` and `user_database_tests!` macros that generate
//! a conformance suite for any backend.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

mod database_tests;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use faktura::core::{Company, Invoice, InvoiceEntry, Role, User, Vat};

/// A counterparty with believable Polish registration data.
pub fn sample_company(name: &str) -> Company {
    Company {
        id: None,
        name: name.to_string(),
        address: "ul. Ogrodowa 12, 00-896 Warszawa".to_string(),
        tax_id: "527-123-45-67".to_string(),
        account_number: "PL61109010140000071219812874".to_string(),
        phone_number: "+48 22 123 45 67".to_string(),
        email: format!("biuro@{}.pl", name.to_lowercase().replace(' ', "-")),
    }
}

/// The reference entry: 2 units at 100.00 net each, 23% VAT.
pub fn sample_entry() -> InvoiceEntry {
    InvoiceEntry {
        id: None,
        description: "Siatka ogrodzeniowa".to_string(),
        quantity: 2,
        price: dec!(100.00),
        net_value: dec!(200.00),
        gross_value: dec!(246.00),
        vat_rate: Vat::Vat23,
    }
}

pub fn sample_entry_with(description: &str, vat_rate: Vat) -> InvoiceEntry {
    InvoiceEntry {
        id: None,
        description: description.to_string(),
        quantity: 1,
        price: dec!(50.00),
        net_value: dec!(50.00),
        gross_value: dec!(50.00) * (dec!(1.00) + vat_rate.rate()),
        vat_rate,
    }
}

/// An unsaved invoice (no ids anywhere) with one reference entry.
pub fn sample_invoice(number: &str) -> Invoice {
    Invoice {
        id: None,
        number: number.to_string(),
        issued_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        due_date: NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
        seller: sample_company("Metalux"),
        buyer: sample_company("Ogrody Mazowsze"),
        entries: vec![sample_entry()],
    }
}

/// An unsaved invoice with several entries across VAT rates.
pub fn sample_invoice_multi_entry(number: &str) -> Invoice {
    let mut invoice = sample_invoice(number);
    invoice.entries = vec![
        sample_entry(),
        sample_entry_with("Transport", Vat::Vat8),
        sample_entry_with("Pieczywo", Vat::Vat5),
        sample_entry_with("Eksport", Vat::Vat0),
    ];
    invoice
}

/// An unsaved active user with one role. Passwords arrive pre-hashed.
pub fn sample_user(email: &str) -> User {
    User {
        id: None,
        email: email.to_string(),
        password: "$argon2id$v=19$m=65536,t=3,p=4$c2FsdA$aGFzaA".to_string(),
        name: "Jan".to_string(),
        last_name: "Kowalski".to_string(),
        active: true,
        roles: vec![Role {
            id: None,
            name: "USER".to_string(),
        }],
    }
}
