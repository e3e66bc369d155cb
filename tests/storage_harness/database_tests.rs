//! Macro-generated conformance suites for the storage contracts.
//!
//! `invoice_database_tests!` validates any `InvoiceDatabase` implementation:
//! id allocation, insert/update discrimination, aggregate round-trips,
//! deletion semantics and cardinality. `user_database_tests!` does the same
//! for `UserDatabase`.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use faktura::storage::InMemoryDatabase;
//!
//! invoice_database_tests!(InMemoryDatabase::new());
//! ```
//!
//! `$factory` must be an expression yielding a FRESH, EMPTY store; it is
//! re-evaluated per test for isolation, and may contain `.await`.

/// Generate a full `InvoiceDatabase` conformance test suite.
#[macro_export]
macro_rules! invoice_database_tests {
    ($factory:expr) => {
        mod invoice_database_contract_tests {
            use super::*;
            use faktura::core::{DatabaseError, InvoiceDatabase};

            // ==================================================================
            // Id allocation
            // ==================================================================

            #[tokio::test]
            async fn test_fresh_store_allocates_sequential_ids() {
                let db = $factory;
                let first = db.save(&sample_invoice("FV 1/2024")).await.unwrap();
                let second = db.save(&sample_invoice("FV 2/2024")).await.unwrap();

                assert_eq!(first.id, Some(1));
                assert_eq!(second.id, Some(2));
            }

            #[tokio::test]
            async fn test_unknown_id_is_an_insert_under_a_fresh_id() {
                let db = $factory;
                let phantom = sample_invoice("FV 1/2024").with_id(999);

                let saved = db.save(&phantom).await.unwrap();
                assert_ne!(saved.id, Some(999), "caller-chosen ids must not be honoured");
                assert!(!db.exists(999).await.unwrap());
                assert_eq!(db.count().await.unwrap(), 1);
            }

            // ==================================================================
            // Round-trips
            // ==================================================================

            #[tokio::test]
            async fn test_save_then_get_by_id_round_trips() {
                let db = $factory;
                let saved = db.save(&sample_invoice("FV 1/2024")).await.unwrap();

                let fetched = db.get_by_id(saved.id.unwrap()).await.unwrap().unwrap();
                assert_eq!(fetched, saved);
            }

            #[tokio::test]
            async fn test_amounts_survive_storage() {
                let db = $factory;
                let saved = db.save(&sample_invoice("FV 1/2024")).await.unwrap();

                let fetched = db.get_by_id(saved.id.unwrap()).await.unwrap().unwrap();
                let entry = &fetched.entries[0];
                assert_eq!(entry.quantity, 2);
                assert_eq!(entry.price, rust_decimal_macros::dec!(100.00));
                assert_eq!(entry.net_value, rust_decimal_macros::dec!(200.00));
                assert_eq!(entry.gross_value, rust_decimal_macros::dec!(246.00));
                assert_eq!(entry.vat_rate, faktura::core::Vat::Vat23);
            }

            #[tokio::test]
            async fn test_multi_entry_invoice_round_trips() {
                let db = $factory;
                let saved = db
                    .save(&sample_invoice_multi_entry("FV 3/2024"))
                    .await
                    .unwrap();
                assert_eq!(saved.entries.len(), 4);

                let fetched = db.get_by_id(saved.id.unwrap()).await.unwrap().unwrap();
                assert_eq!(fetched, saved);
            }

            #[tokio::test]
            async fn test_get_by_number_matches_business_number() {
                let db = $factory;
                db.save(&sample_invoice("FV 1/2024")).await.unwrap();
                let wanted = db.save(&sample_invoice("FV 2/2024")).await.unwrap();

                let fetched = db.get_by_number("FV 2/2024").await.unwrap().unwrap();
                assert_eq!(fetched, wanted);
                assert!(db.get_by_number("FV 99/2024").await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_get_nonexistent_id_is_none() {
                let db = $factory;
                assert!(db.get_by_id(42).await.unwrap().is_none());
                assert!(!db.exists(42).await.unwrap());
            }

            // ==================================================================
            // Updates
            // ==================================================================

            #[tokio::test]
            async fn test_update_replaces_the_whole_aggregate() {
                let db = $factory;
                let saved = db.save(&sample_invoice("FV 1/2024")).await.unwrap();
                let id = saved.id.unwrap();

                let replacement = sample_invoice_multi_entry("FV 1/2024 korekta").with_id(id);
                let updated = db.save(&replacement).await.unwrap();

                assert_eq!(updated.id, Some(id));
                assert_eq!(db.count().await.unwrap(), 1, "update must not create a row");

                let fetched = db.get_by_id(id).await.unwrap().unwrap();
                assert_eq!(fetched.number, "FV 1/2024 korekta");
                assert_eq!(fetched.entries.len(), 4);
                assert_eq!(fetched, updated);
            }

            // ==================================================================
            // Deletion
            // ==================================================================

            #[tokio::test]
            async fn test_delete_is_final() {
                let db = $factory;
                let saved = db.save(&sample_invoice("FV 1/2024")).await.unwrap();
                let id = saved.id.unwrap();

                db.delete(id).await.unwrap();
                assert!(db.get_by_id(id).await.unwrap().is_none());
                assert!(!db.exists(id).await.unwrap());
                assert!(matches!(
                    db.delete(id).await,
                    Err(DatabaseError::NotFound(_))
                ));
            }

            #[tokio::test]
            async fn test_delete_nonexistent_is_an_error() {
                let db = $factory;
                assert!(matches!(
                    db.delete(42).await,
                    Err(DatabaseError::NotFound(_))
                ));
            }

            #[tokio::test]
            async fn test_delete_all_empties_the_store() {
                let db = $factory;
                for number in ["FV 1/2024", "FV 2/2024", "FV 3/2024"] {
                    db.save(&sample_invoice(number)).await.unwrap();
                }

                db.delete_all().await.unwrap();
                assert_eq!(db.count().await.unwrap(), 0);
                assert!(db.get_all().await.unwrap().is_empty());
            }

            // ==================================================================
            // Cardinality
            // ==================================================================

            #[tokio::test]
            async fn test_count_matches_get_all() {
                let db = $factory;
                assert_eq!(db.count().await.unwrap(), 0);

                for number in ["FV 1/2024", "FV 2/2024"] {
                    db.save(&sample_invoice(number)).await.unwrap();
                }

                let all = db.get_all().await.unwrap();
                assert_eq!(db.count().await.unwrap(), all.len() as u64);
                assert_eq!(all.len(), 2);
            }
        }
    };
}

/// Generate a full `UserDatabase` conformance test suite.
#[macro_export]
macro_rules! user_database_tests {
    ($factory:expr) => {
        mod user_database_contract_tests {
            use super::*;
            use faktura::core::{DatabaseError, UserDatabase};

            #[tokio::test]
            async fn test_save_then_lookup_by_id_and_email() {
                let db = $factory;
                let saved = db.save(&sample_user("jan@example.com")).await.unwrap();
                assert_eq!(saved.id, Some(1));

                let by_id = db.get_by_id(1).await.unwrap().unwrap();
                let by_email = db.get_by_email("jan@example.com").await.unwrap().unwrap();
                assert_eq!(by_id, saved);
                assert_eq!(by_email, saved);
                assert_eq!(by_id.roles.len(), 1);
                assert_eq!(by_id.roles[0].name, "USER");
            }

            #[tokio::test]
            async fn test_update_replaces_the_account() {
                let db = $factory;
                let saved = db.save(&sample_user("jan@example.com")).await.unwrap();

                let mut changed = saved.clone();
                changed.active = false;
                changed.roles.push(faktura::core::Role {
                    id: None,
                    name: "ADMIN".to_string(),
                });
                let updated = db.save(&changed).await.unwrap();

                assert_eq!(updated.id, saved.id);
                assert_eq!(db.count().await.unwrap(), 1);

                let fetched = db.get_by_id(saved.id.unwrap()).await.unwrap().unwrap();
                assert!(!fetched.active);
                assert_eq!(fetched.roles.len(), 2);
            }

            #[tokio::test]
            async fn test_delete_by_id_and_by_email() {
                let db = $factory;
                db.save(&sample_user("jan@example.com")).await.unwrap();
                db.save(&sample_user("anna@example.com")).await.unwrap();

                db.delete(1).await.unwrap();
                assert!(matches!(
                    db.delete(1).await,
                    Err(DatabaseError::NotFound(_))
                ));

                db.delete_by_email("anna@example.com").await.unwrap();
                assert!(matches!(
                    db.delete_by_email("anna@example.com").await,
                    Err(DatabaseError::NotFound(_))
                ));
                assert_eq!(db.count().await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_existence_checks() {
                let db = $factory;
                assert!(!db.exists_by_id(1).await.unwrap());
                assert!(!db.exists_by_email("jan@example.com").await.unwrap());

                db.save(&sample_user("jan@example.com")).await.unwrap();
                assert!(db.exists_by_id(1).await.unwrap());
                assert!(db.exists_by_email("jan@example.com").await.unwrap());
            }

            #[tokio::test]
            async fn test_delete_all_users() {
                let db = $factory;
                db.save(&sample_user("jan@example.com")).await.unwrap();
                db.save(&sample_user("anna@example.com")).await.unwrap();

                db.delete_all().await.unwrap();
                assert_eq!(db.count().await.unwrap(), 0);
                assert!(db.get_all().await.unwrap().is_empty());
            }
        }
    };
}
