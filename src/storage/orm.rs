//! Relational backend with an entity-record mapping layer.
//!
//! Unlike the raw backend in [`crate::storage::postgres`], this one keeps a
//! record struct per table and a mapper between records and domain types.
//! Entries hang off their invoice through a plain `invoice_id` foreign key
//! with `ON DELETE CASCADE`, so removing an invoice removes its entries in
//! one statement. The two relational backends own their schemas and are not
//! meant to share a database.
//!
//! This module also carries the user store: `users`, `roles` and the
//! `user_roles` join table, with a unique index on `users.email`.
//!
//! # Feature flag
//!
//! Gated behind the `orm` feature flag, which implies `postgres`:
//! ```toml
//! [dependencies]
//! faktura = { version = "0.1", features = ["orm"] }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::core::database::{DatabaseResult, InvoiceDatabase, UserDatabase};
use crate::core::error::DatabaseError;
use crate::core::invoice::{Company, Invoice, InvoiceEntry, Vat};
use crate::core::user::{Role, User};

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

/// Apply the required tables and indexes (idempotent).
///
/// Safe to call on every startup.
pub async fn ensure_schema(pool: &PgPool) -> DatabaseResult<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS company (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT NOT NULL,
            tax_id TEXT NOT NULL,
            account_number TEXT NOT NULL,
            phone_number TEXT NOT NULL,
            email TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS invoice (
            id BIGSERIAL PRIMARY KEY,
            number TEXT NOT NULL,
            issued_date DATE NOT NULL,
            due_date DATE NOT NULL,
            seller_id BIGINT NOT NULL REFERENCES company (id),
            buyer_id BIGINT NOT NULL REFERENCES company (id)
        )",
        "CREATE TABLE IF NOT EXISTS invoice_entry (
            id BIGSERIAL PRIMARY KEY,
            invoice_id BIGINT NOT NULL REFERENCES invoice (id) ON DELETE CASCADE,
            description TEXT NOT NULL,
            quantity BIGINT NOT NULL,
            price NUMERIC(10, 2) NOT NULL,
            net_value NUMERIC(10, 2) NOT NULL,
            gross_value NUMERIC(10, 2) NOT NULL,
            vat_rate NUMERIC(4, 2) NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_invoice_entry_invoice ON invoice_entry (invoice_id)",
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            email TEXT NOT NULL,
            password TEXT NOT NULL,
            name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            active BOOLEAN NOT NULL
        )",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email)",
        "CREATE TABLE IF NOT EXISTS roles (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        "CREATE TABLE IF NOT EXISTS user_roles (
            user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
            role_id BIGINT NOT NULL REFERENCES roles (id),
            PRIMARY KEY (user_id, role_id)
        )",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to apply schema", e))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Records and mapping
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct InvoiceRecord {
    id: i64,
    number: String,
    issued_date: NaiveDate,
    due_date: NaiveDate,
    seller_id: i64,
    buyer_id: i64,
}

#[derive(sqlx::FromRow)]
struct CompanyRecord {
    id: i64,
    name: String,
    address: String,
    tax_id: String,
    account_number: String,
    phone_number: String,
    email: String,
}

impl From<CompanyRecord> for Company {
    fn from(record: CompanyRecord) -> Self {
        Company {
            id: Some(record.id),
            name: record.name,
            address: record.address,
            tax_id: record.tax_id,
            account_number: record.account_number,
            phone_number: record.phone_number,
            email: record.email,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EntryRecord {
    id: i64,
    description: String,
    quantity: i64,
    price: Decimal,
    net_value: Decimal,
    gross_value: Decimal,
    vat_rate: Decimal,
}

impl TryFrom<EntryRecord> for InvoiceEntry {
    type Error = DatabaseError;

    fn try_from(record: EntryRecord) -> DatabaseResult<Self> {
        let vat_rate = Vat::from_rate(record.vat_rate).ok_or_else(|| {
            DatabaseError::Serialization(format!("unknown vat rate: {}", record.vat_rate))
        })?;
        Ok(InvoiceEntry {
            id: Some(record.id),
            description: record.description,
            quantity: record.quantity,
            price: record.price,
            net_value: record.net_value,
            gross_value: record.gross_value,
            vat_rate,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password: String,
    name: String,
    last_name: String,
    active: bool,
}

#[derive(sqlx::FromRow)]
struct RoleRecord {
    id: i64,
    name: String,
}

// ---------------------------------------------------------------------------
// OrmDatabase
// ---------------------------------------------------------------------------

/// Invoice store backed by PostgreSQL through the record mapping layer.
#[derive(Clone, Debug)]
pub struct OrmDatabase {
    pool: PgPool,
}

impl OrmDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_invoice(&self, record: InvoiceRecord) -> DatabaseResult<Invoice> {
        let seller = self.load_company(record.seller_id).await?;
        let buyer = self.load_company(record.buyer_id).await?;

        let entry_records = sqlx::query_as::<_, EntryRecord>(
            "SELECT id, description, quantity, price, net_value, gross_value, vat_rate \
             FROM invoice_entry WHERE invoice_id = $1 ORDER BY id",
        )
        .bind(record.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::operation("failed to load invoice entries", e))?;

        let entries = entry_records
            .into_iter()
            .map(InvoiceEntry::try_from)
            .collect::<DatabaseResult<Vec<_>>>()?;

        Ok(Invoice {
            id: Some(record.id),
            number: record.number,
            issued_date: record.issued_date,
            due_date: record.due_date,
            seller,
            buyer,
            entries,
        })
    }

    async fn load_company(&self, id: i64) -> DatabaseResult<Company> {
        let record = sqlx::query_as::<_, CompanyRecord>(
            "SELECT id, name, address, tax_id, account_number, phone_number, email \
             FROM company WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::operation("failed to load company", e))?;
        Ok(record.into())
    }

    async fn persist(&self, id: Option<i64>, invoice: &Invoice) -> DatabaseResult<Invoice> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::operation("failed to begin transaction", e))?;

        let seller = persist_company(&mut tx, &invoice.seller).await?;
        let buyer = persist_company(&mut tx, &invoice.buyer).await?;

        let invoice_id = match id {
            Some(id) => {
                sqlx::query(
                    "UPDATE invoice SET number = $1, issued_date = $2, due_date = $3, \
                     seller_id = $4, buyer_id = $5 WHERE id = $6",
                )
                .bind(&invoice.number)
                .bind(invoice.issued_date)
                .bind(invoice.due_date)
                .bind(seller.id)
                .bind(buyer.id)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::operation("failed to update invoice", e))?;

                // Orphan removal: the entry set is replaced wholesale.
                sqlx::query("DELETE FROM invoice_entry WHERE invoice_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| DatabaseError::operation("failed to clear invoice entries", e))?;
                id
            }
            None => sqlx::query_scalar(
                "INSERT INTO invoice (number, issued_date, due_date, seller_id, buyer_id) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(&invoice.number)
            .bind(invoice.issued_date)
            .bind(invoice.due_date)
            .bind(seller.id)
            .bind(buyer.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::operation("failed to insert invoice", e))?,
        };

        let mut entries = Vec::with_capacity(invoice.entries.len());
        for entry in &invoice.entries {
            let entry_id: i64 = sqlx::query_scalar(
                "INSERT INTO invoice_entry \
                 (invoice_id, description, quantity, price, net_value, gross_value, vat_rate) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
            )
            .bind(invoice_id)
            .bind(&entry.description)
            .bind(entry.quantity)
            .bind(entry.price)
            .bind(entry.net_value)
            .bind(entry.gross_value)
            .bind(entry.vat_rate.rate())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::operation("failed to insert invoice entry", e))?;
            entries.push(InvoiceEntry {
                id: Some(entry_id),
                ..entry.clone()
            });
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::operation("failed to commit invoice save", e))?;

        debug!(id = invoice_id, "invoice persisted");
        Ok(Invoice {
            id: Some(invoice_id),
            number: invoice.number.clone(),
            issued_date: invoice.issued_date,
            due_date: invoice.due_date,
            seller,
            buyer,
            entries,
        })
    }
}

async fn persist_company(
    tx: &mut Transaction<'_, Postgres>,
    company: &Company,
) -> DatabaseResult<Company> {
    if let Some(id) = company.id {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM company WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| DatabaseError::operation("failed to check company existence", e))?;
        if exists {
            sqlx::query(
                "UPDATE company SET name = $1, address = $2, tax_id = $3, \
                 account_number = $4, phone_number = $5, email = $6 WHERE id = $7",
            )
            .bind(&company.name)
            .bind(&company.address)
            .bind(&company.tax_id)
            .bind(&company.account_number)
            .bind(&company.phone_number)
            .bind(&company.email)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| DatabaseError::operation("failed to update company", e))?;
            return Ok(company.clone());
        }
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO company (name, address, tax_id, account_number, phone_number, email) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(&company.name)
    .bind(&company.address)
    .bind(&company.tax_id)
    .bind(&company.account_number)
    .bind(&company.phone_number)
    .bind(&company.email)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| DatabaseError::operation("failed to insert company", e))?;

    Ok(Company {
        id: Some(id),
        ..company.clone()
    })
}

#[async_trait]
impl InvoiceDatabase for OrmDatabase {
    async fn save(&self, invoice: &Invoice) -> DatabaseResult<Invoice> {
        match invoice.id {
            Some(id) if self.exists(id).await? => self.persist(Some(id), invoice).await,
            _ => self.persist(None, invoice).await,
        }
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        // Entries cascade from the invoice row.
        let result = sqlx::query("DELETE FROM invoice WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to delete invoice", e))?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found_invoice(id));
        }
        debug!(id, "invoice deleted");
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<Invoice>> {
        let record = sqlx::query_as::<_, InvoiceRecord>(
            "SELECT id, number, issued_date, due_date, seller_id, buyer_id \
             FROM invoice WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::operation("failed to fetch invoice by id", e))?;

        match record {
            Some(record) => Ok(Some(self.load_invoice(record).await?)),
            None => Ok(None),
        }
    }

    async fn get_by_number(&self, number: &str) -> DatabaseResult<Option<Invoice>> {
        let record = sqlx::query_as::<_, InvoiceRecord>(
            "SELECT id, number, issued_date, due_date, seller_id, buyer_id \
             FROM invoice WHERE number = $1 LIMIT 1",
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::operation("failed to fetch invoice by number", e))?;

        match record {
            Some(record) => Ok(Some(self.load_invoice(record).await?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> DatabaseResult<Vec<Invoice>> {
        let records = sqlx::query_as::<_, InvoiceRecord>(
            "SELECT id, number, issued_date, due_date, seller_id, buyer_id \
             FROM invoice ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::operation("failed to fetch invoices", e))?;

        let mut invoices = Vec::with_capacity(records.len());
        for record in records {
            invoices.push(self.load_invoice(record).await?);
        }
        Ok(invoices)
    }

    async fn delete_all(&self) -> DatabaseResult<()> {
        sqlx::query("TRUNCATE invoice_entry, invoice, company RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to delete all invoices", e))?;
        Ok(())
    }

    async fn exists(&self, id: i64) -> DatabaseResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM invoice WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to check invoice existence", e))
    }

    async fn count(&self) -> DatabaseResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoice")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to count invoices", e))?;
        Ok(count as u64)
    }
}

// ---------------------------------------------------------------------------
// OrmUserDatabase
// ---------------------------------------------------------------------------

/// User store backed by the same pool, with roles resolved by name so two
/// users sharing a role share the row.
#[derive(Clone, Debug)]
pub struct OrmUserDatabase {
    pool: PgPool,
}

impl OrmUserDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_roles(&self, user_id: i64) -> DatabaseResult<Vec<Role>> {
        let records = sqlx::query_as::<_, RoleRecord>(
            "SELECT r.id, r.name FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 ORDER BY r.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::operation("failed to load user roles", e))?;

        Ok(records
            .into_iter()
            .map(|r| Role {
                id: Some(r.id),
                name: r.name,
            })
            .collect())
    }

    async fn load_user(&self, record: UserRecord) -> DatabaseResult<User> {
        let roles = self.load_roles(record.id).await?;
        Ok(User {
            id: Some(record.id),
            email: record.email,
            password: record.password,
            name: record.name,
            last_name: record.last_name,
            active: record.active,
            roles,
        })
    }
}

const SELECT_USER: &str = "SELECT id, email, password, name, last_name, active FROM users";

#[async_trait]
impl UserDatabase for OrmUserDatabase {
    async fn save(&self, user: &User) -> DatabaseResult<User> {
        if user.email.is_empty() {
            return Err(DatabaseError::InvalidArgument(
                "user email cannot be empty".to_string(),
            ));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::operation("failed to begin transaction", e))?;

        let known_id = match user.id {
            Some(id) => sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::operation("failed to check user existence", e))?
            .then_some(id),
            None => None,
        };

        let user_id = if let Some(id) = known_id {
            sqlx::query(
                "UPDATE users SET email = $1, password = $2, name = $3, \
                 last_name = $4, active = $5 WHERE id = $6",
            )
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.name)
            .bind(&user.last_name)
            .bind(user.active)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::operation("failed to update user", e))?;

            sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::operation("failed to clear user roles", e))?;
            id
        } else {
            sqlx::query_scalar(
                "INSERT INTO users (email, password, name, last_name, active) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.name)
            .bind(&user.last_name)
            .bind(user.active)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::operation("failed to insert user", e))?
        };

        let mut roles = Vec::with_capacity(user.roles.len());
        for role in &user.roles {
            let role_id: i64 = sqlx::query_scalar(
                "INSERT INTO roles (name) VALUES ($1) \
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
            )
            .bind(&role.name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::operation("failed to upsert role", e))?;

            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::operation("failed to link user role", e))?;

            roles.push(Role {
                id: Some(role_id),
                name: role.name.clone(),
            });
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::operation("failed to commit user save", e))?;

        Ok(User {
            id: Some(user_id),
            email: user.email.clone(),
            password: user.password.clone(),
            name: user.name.clone(),
            last_name: user.last_name.clone(),
            active: user.active,
            roles,
        })
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to delete user", e))?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found_user(id));
        }
        Ok(())
    }

    async fn delete_by_email(&self, email: &str) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to delete user by email", e))?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "no user with email: {email}"
            )));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to fetch user by id", e))?;

        match record {
            Some(record) => Ok(Some(self.load_user(record).await?)),
            None => Ok(None),
        }
    }

    async fn get_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE email = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to fetch user by email", e))?;

        match record {
            Some(record) => Ok(Some(self.load_user(record).await?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> DatabaseResult<Vec<User>> {
        let sql = format!("{SELECT_USER} ORDER BY id");
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to fetch users", e))?;

        let mut users = Vec::with_capacity(records.len());
        for record in records {
            users.push(self.load_user(record).await?);
        }
        Ok(users)
    }

    async fn delete_all(&self) -> DatabaseResult<()> {
        sqlx::query("TRUNCATE user_roles, users RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to delete all users", e))?;
        Ok(())
    }

    async fn exists_by_id(&self, id: i64) -> DatabaseResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to check user existence", e))
    }

    async fn exists_by_email(&self, email: &str) -> DatabaseResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to check user existence", e))
    }

    async fn count(&self) -> DatabaseResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::operation("failed to count users", e))?;
        Ok(count as u64)
    }
}
