//! # Cash Ledger
//!
//! Cash registers and the transactions posted against them.
//!
//! ## Register Lifecycle
//! ```text
//!   open_register(date, start)          at most one open system-wide
//!        │
//!        ▼
//!   ┌─────────┐  record_transaction()   append-only, open registers only
//!   │  OPEN   │◄──────────────────────
//!   └────┬────┘
//!        │ close_register(counted)      freezes system balance + difference
//!        ▼
//!   ┌─────────┐
//!   │ CLOSED  │  terminal, never reopened
//!   └─────────┘
//! ```
//!
//! The balance is never stored while a register is open. Every call to
//! [`CashLedger::live_balance`] sums the transactions on the connection it
//! was given, so inside an operation's transaction it already includes
//! the entries that operation has posted.

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use fogon_core::ledger::{close_out, ensure_open};
use fogon_core::validation::{validate_description, validate_non_negative_amount};
use fogon_core::{
    CashRegister, CashTransaction, CoreError, Money, TransactionCategory, TransactionKind,
};

const REGISTER_COLUMNS: &str = r#"
    id, business_date, start_amount, end_amount_system, end_amount_real,
    difference, is_closed, opened_at, closed_at
"#;

const TRANSACTION_COLUMNS: &str = r#"
    id, cash_register_id, kind, category, amount, description, source_key, created_at
"#;

/// Idempotency key of the income entry for a sale.
pub fn sale_income_key(sale_id: &str) -> String {
    format!("sale:{}:income", sale_id)
}

/// Register and transaction persistence plus the register guards.
#[derive(Debug)]
pub struct CashLedger<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CashLedger<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CashLedger { conn }
    }

    // =========================================================================
    // Registers
    // =========================================================================

    /// Opens a register for `business_date` with a float of `start_amount`.
    ///
    /// Fails with `RegisterAlreadyOpen` while another register is open. The
    /// engine serializes callers; the partial unique index on open
    /// registers backs this up at the storage level.
    pub async fn open_register(
        &mut self,
        business_date: NaiveDate,
        start_amount: Money,
    ) -> DbResult<CashRegister> {
        validate_non_negative_amount("start_amount", start_amount)?;

        if let Some(open) = self.current_open_register().await? {
            return Err(CoreError::RegisterAlreadyOpen {
                open_register_id: open.id,
            }
            .into());
        }

        let register = CashRegister {
            id: Uuid::new_v4().to_string(),
            business_date,
            start_amount,
            end_amount_system: None,
            end_amount_real: None,
            difference: None,
            is_closed: false,
            opened_at: Utc::now(),
            closed_at: None,
        };

        debug!(register_id = %register.id, %business_date, start = %start_amount, "Opening register");

        sqlx::query(
            r#"
            INSERT INTO cash_registers (id, business_date, start_amount, is_closed, opened_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
        )
        .bind(&register.id)
        .bind(register.business_date)
        .bind(register.start_amount)
        .bind(register.opened_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(register)
    }

    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<CashRegister>> {
        let sql = format!("SELECT {} FROM cash_registers WHERE id = ?1", REGISTER_COLUMNS);
        let register = sqlx::query_as::<_, CashRegister>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(register)
    }

    /// Like [`get_by_id`](Self::get_by_id), failing with `RegisterNotFound`.
    pub async fn require(&mut self, id: &str) -> DbResult<CashRegister> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::RegisterNotFound(id.to_string())))
    }

    /// The register currently accepting transactions, if any.
    pub async fn current_open_register(&mut self) -> DbResult<Option<CashRegister>> {
        let sql = format!(
            "SELECT {} FROM cash_registers WHERE is_closed = 0 ORDER BY rowid DESC LIMIT 1",
            REGISTER_COLUMNS
        );
        let register = sqlx::query_as::<_, CashRegister>(&sql)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(register)
    }

    /// Like [`current_open_register`](Self::current_open_register), failing
    /// with `NoOpenRegister`.
    pub async fn require_open_register(&mut self) -> DbResult<CashRegister> {
        self.current_open_register()
            .await?
            .ok_or_else(|| DbError::from(CoreError::NoOpenRegister))
    }

    /// Registers, newest first.
    pub async fn list_registers(&mut self, limit: i64) -> DbResult<Vec<CashRegister>> {
        let sql = format!(
            "SELECT {} FROM cash_registers ORDER BY rowid DESC LIMIT ?1",
            REGISTER_COLUMNS
        );
        let registers = sqlx::query_as::<_, CashRegister>(&sql)
            .bind(limit)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(registers)
    }

    /// `start_amount + Σ income - Σ expense`, computed fresh.
    pub async fn live_balance(&mut self, register_id: &str) -> DbResult<Money> {
        let register = self.require(register_id).await?;

        let net: Money = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE -amount END), 0)
            FROM transactions
            WHERE cash_register_id = ?1
            "#,
        )
        .bind(register_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(register.start_amount + net)
    }

    /// Closes a register against the cash actually counted.
    ///
    /// Freezes the system balance and the difference; a closed register
    /// cannot be closed again.
    pub async fn close_register(&mut self, register_id: &str, counted: Money) -> DbResult<CashRegister> {
        validate_non_negative_amount("end_amount_real", counted)?;

        let register = self.require(register_id).await?;
        ensure_open(&register)?;

        let system = self.live_balance(register_id).await?;
        let figures = close_out(system, counted);

        debug!(
            register_id,
            system = %figures.end_amount_system,
            counted = %figures.end_amount_real,
            difference = %figures.difference,
            "Closing register"
        );

        let sql = format!(
            r#"
            UPDATE cash_registers
            SET end_amount_system = ?1,
                end_amount_real = ?2,
                difference = ?3,
                is_closed = 1,
                closed_at = ?4
            WHERE id = ?5 AND is_closed = 0
            RETURNING {}
            "#,
            REGISTER_COLUMNS
        );
        let closed = sqlx::query_as::<_, CashRegister>(&sql)
            .bind(figures.end_amount_system)
            .bind(figures.end_amount_real)
            .bind(figures.difference)
            .bind(Utc::now())
            .bind(register_id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| {
                DbError::from(CoreError::RegisterClosed {
                    register_id: register_id.to_string(),
                })
            })?;

        Ok(closed)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Appends a transaction to an open register.
    pub async fn record_transaction(
        &mut self,
        register_id: &str,
        kind: TransactionKind,
        category: TransactionCategory,
        amount: Money,
        description: &str,
    ) -> DbResult<CashTransaction> {
        self.insert_transaction(register_id, kind, category, amount, description, None)
            .await
    }

    /// Posts the income for a sale at most once.
    ///
    /// Returns the income entry and whether this call created it. A second
    /// call for the same sale returns the existing entry untouched.
    pub async fn record_sale_income(
        &mut self,
        register_id: &str,
        sale_id: &str,
        amount: Money,
    ) -> DbResult<(CashTransaction, bool)> {
        let key = sale_income_key(sale_id);

        if let Some(existing) = self.transaction_by_source_key(&key).await? {
            debug!(sale_id, transaction_id = %existing.id, "Sale income already posted");
            return Ok((existing, false));
        }

        let income = self
            .insert_transaction(
                register_id,
                TransactionKind::Income,
                TransactionCategory::Sales,
                amount,
                &format!("Sale {}", sale_id),
                Some(&key),
            )
            .await?;

        Ok((income, true))
    }

    pub async fn transaction_by_source_key(&mut self, key: &str) -> DbResult<Option<CashTransaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE source_key = ?1",
            TRANSACTION_COLUMNS
        );
        let tx = sqlx::query_as::<_, CashTransaction>(&sql)
            .bind(key)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(tx)
    }

    /// Transactions of a register in posting order.
    pub async fn list_transactions(&mut self, register_id: &str) -> DbResult<Vec<CashTransaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE cash_register_id = ?1 ORDER BY rowid",
            TRANSACTION_COLUMNS
        );
        let txs = sqlx::query_as::<_, CashTransaction>(&sql)
            .bind(register_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(txs)
    }

    async fn insert_transaction(
        &mut self,
        register_id: &str,
        kind: TransactionKind,
        category: TransactionCategory,
        amount: Money,
        description: &str,
        source_key: Option<&str>,
    ) -> DbResult<CashTransaction> {
        if amount.is_negative() {
            return Err(CoreError::InvariantViolation(format!(
                "negative {} of {} on register {}",
                kind, amount, register_id
            ))
            .into());
        }
        validate_description(description)?;

        let register = self.require(register_id).await?;
        ensure_open(&register)?;

        let tx = CashTransaction {
            id: Uuid::new_v4().to_string(),
            cash_register_id: register.id,
            kind,
            category,
            amount,
            description: description.to_string(),
            source_key: source_key.map(str::to_string),
            created_at: Utc::now(),
        };

        debug!(
            transaction_id = %tx.id,
            register_id,
            %kind,
            %category,
            amount = %amount,
            "Recording transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, cash_register_id, kind, category, amount, description,
                source_key, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.cash_register_id)
        .bind(tx.kind)
        .bind(tx.category)
        .bind(tx.amount)
        .bind(&tx.description)
        .bind(&tx.source_key)
        .bind(tx.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{conn, memory_db};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn test_balance_and_close() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let mut ledger = CashLedger::new(&mut conn);

        let register = ledger.open_register(day(), Money::from_units(50)).await.unwrap();
        ledger
            .record_transaction(
                &register.id,
                TransactionKind::Income,
                TransactionCategory::Sales,
                Money::from_units(20),
                "walk-in",
            )
            .await
            .unwrap();
        ledger
            .record_transaction(
                &register.id,
                TransactionKind::Expense,
                TransactionCategory::Service,
                Money::from_units(5),
                "gas",
            )
            .await
            .unwrap();
        assert_eq!(
            ledger.live_balance(&register.id).await.unwrap(),
            Money::from_units(65)
        );

        let closed = ledger
            .close_register(&register.id, Money::from_units(65))
            .await
            .unwrap();
        assert!(closed.is_closed);
        assert!(closed.closed_at.is_some());
        assert_eq!(closed.end_amount_system, Some(Money::from_units(65)));
        assert_eq!(closed.difference, Some(Money::zero()));

        let late = ledger
            .record_transaction(
                &register.id,
                TransactionKind::Expense,
                TransactionCategory::Other,
                Money::from_units(1),
                "",
            )
            .await;
        assert!(matches!(
            late,
            Err(DbError::Domain(CoreError::RegisterClosed { .. }))
        ));

        let again = ledger.close_register(&register.id, Money::from_units(65)).await;
        assert!(matches!(
            again,
            Err(DbError::Domain(CoreError::RegisterClosed { .. }))
        ));
        assert!(ledger.current_open_register().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_open_register() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let mut ledger = CashLedger::new(&mut conn);

        let first = ledger.open_register(day(), Money::from_units(10)).await.unwrap();
        let second = ledger.open_register(day(), Money::from_units(10)).await;
        assert!(matches!(
            second,
            Err(DbError::Domain(CoreError::RegisterAlreadyOpen { ref open_register_id }))
                if *open_register_id == first.id
        ));

        ledger.close_register(&first.id, Money::from_units(10)).await.unwrap();
        let next = ledger.open_register(day(), Money::zero()).await.unwrap();

        let listed = ledger.list_registers(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, next.id);
    }

    #[tokio::test]
    async fn test_close_records_shortfall() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let mut ledger = CashLedger::new(&mut conn);

        let register = ledger.open_register(day(), Money::from_units(100)).await.unwrap();
        let closed = ledger
            .close_register(&register.id, Money::from_cents(9750))
            .await
            .unwrap();
        assert_eq!(closed.difference, Some(Money::from_cents(-250)));
        assert_eq!(closed.end_amount_real, Some(Money::from_cents(9750)));
    }

    #[tokio::test]
    async fn test_sale_income_posted_once() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let mut ledger = CashLedger::new(&mut conn);
        let register = ledger.open_register(day(), Money::zero()).await.unwrap();

        let (first, created) = ledger
            .record_sale_income(&register.id, "sale-1", Money::from_units(30))
            .await
            .unwrap();
        assert!(created);
        assert_eq!(first.source_key.as_deref(), Some("sale:sale-1:income"));

        let (second, created) = ledger
            .record_sale_income(&register.id, "sale-1", Money::from_units(30))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);

        let txs = ledger.list_transactions(&register.id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(
            ledger.live_balance(&register.id).await.unwrap(),
            Money::from_units(30)
        );
    }

    #[tokio::test]
    async fn test_negative_amount_is_invariant_violation() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let mut ledger = CashLedger::new(&mut conn);
        let register = ledger.open_register(day(), Money::zero()).await.unwrap();

        let result = ledger
            .record_transaction(
                &register.id,
                TransactionKind::Expense,
                TransactionCategory::Other,
                Money::from_units(-3),
                "",
            )
            .await;
        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::InvariantViolation(_)))
        ));
    }

    #[tokio::test]
    async fn test_transactions_are_immutable() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let register = CashLedger::new(&mut conn)
            .open_register(day(), Money::zero())
            .await
            .unwrap();
        let tx = CashLedger::new(&mut conn)
            .record_transaction(
                &register.id,
                TransactionKind::Income,
                TransactionCategory::Sales,
                Money::from_units(1),
                "",
            )
            .await
            .unwrap();

        let update = sqlx::query("UPDATE transactions SET amount = 0 WHERE id = ?1")
            .bind(&tx.id)
            .execute(&mut *conn)
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(&tx.id)
            .execute(&mut *conn)
            .await;
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn test_missing_register() {
        let db = memory_db().await;
        let mut conn = conn(&db).await;
        let mut ledger = CashLedger::new(&mut conn);

        assert!(matches!(
            ledger.live_balance("nope").await,
            Err(DbError::Domain(CoreError::RegisterNotFound(_)))
        ));
        assert!(matches!(
            ledger.require_open_register().await,
            Err(DbError::Domain(CoreError::NoOpenRegister))
        ));
    }
}
