use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Database file used by both binaries.
pub const DB_FILE: &str = "bank.db";

/// Payment type recorded on every transaction. Installment-based payment
/// types are not part of this system.
pub const PAYMENT_TYPE_LUMP_SUM: &str = "LUMP_SUM";

/// Customer identity. Rows are created by the operator CLI and never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: i64,
    pub name: String,
}

/// A loan as stored. `total_amount_due` and `monthly_emi` are fixed at
/// creation; `amount_paid` is the only mutable column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: i64,
    pub customer_id: i64,
    pub principal_amount: f64,
    pub interest_rate: f64,
    pub loan_period_years: i64,
    pub total_amount_due: f64,
    pub monthly_emi: f64,
    pub amount_paid: f64,
}

/// Column values for a loan that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub customer_id: i64,
    pub principal_amount: f64,
    pub interest_rate: f64,
    pub loan_period_years: i64,
    pub total_amount_due: f64,
    pub monthly_emi: f64,
}

/// A payment transaction row. Immutable once inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: i64,
    pub loan_id: i64,
    pub amount: f64,
    pub payment_date: String,
    pub payment_type: String,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // rusqlite's bundled SQLite is compiled with SQLITE_DEFAULT_FOREIGN_KEYS=1,
    // so foreign keys are enforced by default. The spec declares the FK
    // relations for schema documentation but is explicit that they are "not
    // enforced for existence in practice" (a loan may reference a customer_id
    // that has no row). Match that contract by leaving enforcement off.
    conn.pragma_update(None, "foreign_keys", "OFF")?;

    conn.execute(
        r#"CREATE TABLE IF NOT EXISTS "Customer" (
            customer_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )"#,
        [],
    )?;

    conn.execute(
        r#"CREATE TABLE IF NOT EXISTS "Loan" (
            loan_id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL,
            principal_amount REAL NOT NULL,
            interest_rate REAL NOT NULL,
            loan_period_years INTEGER NOT NULL,
            total_amount_due REAL NOT NULL,
            monthly_emi REAL NOT NULL,
            amount_paid REAL NOT NULL DEFAULT 0,
            FOREIGN KEY (customer_id) REFERENCES "Customer"(customer_id)
        )"#,
        [],
    )?;

    // "Transaction" is an SQL keyword, hence the quotes
    conn.execute(
        r#"CREATE TABLE IF NOT EXISTS "Transaction" (
            transaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
            loan_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            payment_date TEXT NOT NULL,
            payment_type TEXT NOT NULL,
            FOREIGN KEY (loan_id) REFERENCES "Loan"(loan_id)
        )"#,
        [],
    )?;

    conn.execute(
        r#"CREATE INDEX IF NOT EXISTS idx_loan_customer ON "Loan"(customer_id)"#,
        [],
    )?;

    conn.execute(
        r#"CREATE INDEX IF NOT EXISTS idx_transaction_loan ON "Transaction"(loan_id)"#,
        [],
    )?;

    Ok(())
}

// ============================================================================
// Customer operations
// ============================================================================

pub fn insert_customer(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(r#"INSERT INTO "Customer" (name) VALUES (?1)"#, params![name])?;
    Ok(conn.last_insert_rowid())
}

pub fn get_customer(conn: &Connection, customer_id: i64) -> Result<Option<Customer>> {
    let customer = conn
        .query_row(
            r#"SELECT customer_id, name FROM "Customer" WHERE customer_id = ?1"#,
            params![customer_id],
            |row| {
                Ok(Customer {
                    customer_id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;

    Ok(customer)
}

pub fn list_customers(conn: &Connection) -> Result<Vec<Customer>> {
    let mut stmt =
        conn.prepare(r#"SELECT customer_id, name FROM "Customer" ORDER BY customer_id"#)?;

    let customers = stmt
        .query_map([], |row| {
            Ok(Customer {
                customer_id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(customers)
}

// ============================================================================
// Loan operations
// ============================================================================

pub fn insert_loan(conn: &Connection, loan: &NewLoan) -> Result<i64> {
    conn.execute(
        r#"INSERT INTO "Loan" (
            customer_id, principal_amount, interest_rate, loan_period_years,
            total_amount_due, monthly_emi
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        params![
            loan.customer_id,
            loan.principal_amount,
            loan.interest_rate,
            loan.loan_period_years,
            loan.total_amount_due,
            loan.monthly_emi,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn get_loan(conn: &Connection, loan_id: i64) -> Result<Option<Loan>> {
    let loan = conn
        .query_row(
            r#"SELECT loan_id, customer_id, principal_amount, interest_rate,
                      loan_period_years, total_amount_due, monthly_emi, amount_paid
               FROM "Loan" WHERE loan_id = ?1"#,
            params![loan_id],
            loan_from_row,
        )
        .optional()?;

    Ok(loan)
}

pub fn loans_for_customer(conn: &Connection, customer_id: i64) -> Result<Vec<Loan>> {
    let mut stmt = conn.prepare(
        r#"SELECT loan_id, customer_id, principal_amount, interest_rate,
                  loan_period_years, total_amount_due, monthly_emi, amount_paid
           FROM "Loan" WHERE customer_id = ?1
           ORDER BY loan_id"#,
    )?;

    let loans = stmt
        .query_map(params![customer_id], loan_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(loans)
}

/// Add a payment to a loan's running total. The increment is a single SQL
/// read-modify-write, so it cannot lose a concurrent update.
pub fn apply_payment(conn: &Connection, loan_id: i64, amount: f64) -> Result<()> {
    conn.execute(
        r#"UPDATE "Loan" SET amount_paid = amount_paid + ?1 WHERE loan_id = ?2"#,
        params![amount, loan_id],
    )?;

    Ok(())
}

fn loan_from_row(row: &Row) -> rusqlite::Result<Loan> {
    Ok(Loan {
        loan_id: row.get(0)?,
        customer_id: row.get(1)?,
        principal_amount: row.get(2)?,
        interest_rate: row.get(3)?,
        loan_period_years: row.get(4)?,
        total_amount_due: row.get(5)?,
        monthly_emi: row.get(6)?,
        amount_paid: row.get(7)?,
    })
}

// ============================================================================
// Transaction operations
// ============================================================================

pub fn insert_payment(
    conn: &Connection,
    loan_id: i64,
    amount: f64,
    payment_date: &str,
    payment_type: &str,
) -> Result<i64> {
    conn.execute(
        r#"INSERT INTO "Transaction" (loan_id, amount, payment_date, payment_type)
           VALUES (?1, ?2, ?3, ?4)"#,
        params![loan_id, amount, payment_date, payment_type],
    )?;

    Ok(conn.last_insert_rowid())
}

/// All payments recorded against a loan, in insertion order.
pub fn payments_for_loan(conn: &Connection, loan_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        r#"SELECT transaction_id, loan_id, amount, payment_date, payment_type
           FROM "Transaction" WHERE loan_id = ?1
           ORDER BY transaction_id"#,
    )?;

    let transactions = stmt
        .query_map(params![loan_id], |row| {
            Ok(Transaction {
                transaction_id: row.get(0)?,
                loan_id: row.get(1)?,
                amount: row.get(2)?,
                payment_date: row.get(3)?,
                payment_type: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn sample_loan(customer_id: i64) -> NewLoan {
        NewLoan {
            customer_id,
            principal_amount: 100000.0,
            interest_rate: 0.1,
            loan_period_years: 5,
            total_amount_due: 150000.0,
            monthly_emi: 2500.0,
        }
    }

    #[test]
    fn test_setup_database_is_idempotent() {
        let conn = test_conn();

        // DDL must be a no-op against an already initialized database
        setup_database(&conn).unwrap();

        let count: i64 = conn
            .query_row(r#"SELECT COUNT(*) FROM "Loan""#, [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_customer_roundtrip() {
        let conn = test_conn();

        let alice = insert_customer(&conn, "Alice").unwrap();
        let bob = insert_customer(&conn, "Bob").unwrap();
        assert_eq!(alice, 1);
        assert_eq!(bob, 2);

        let fetched = get_customer(&conn, alice).unwrap().unwrap();
        assert_eq!(fetched.name, "Alice");

        assert!(get_customer(&conn, 99).unwrap().is_none());

        let all = list_customers(&conn).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Alice");
        assert_eq!(all[1].name, "Bob");
    }

    #[test]
    fn test_loan_roundtrip() {
        let conn = test_conn();
        let customer_id = insert_customer(&conn, "Alice").unwrap();

        let loan_id = insert_loan(&conn, &sample_loan(customer_id)).unwrap();
        let loan = get_loan(&conn, loan_id).unwrap().unwrap();

        assert_eq!(loan.loan_id, loan_id);
        assert_eq!(loan.customer_id, customer_id);
        assert_eq!(loan.principal_amount, 100000.0);
        assert_eq!(loan.interest_rate, 0.1);
        assert_eq!(loan.loan_period_years, 5);
        assert_eq!(loan.total_amount_due, 150000.0);
        assert_eq!(loan.monthly_emi, 2500.0);
        assert_eq!(loan.amount_paid, 0.0);

        assert!(get_loan(&conn, loan_id + 1).unwrap().is_none());
    }

    #[test]
    fn test_apply_payment_accumulates() {
        let conn = test_conn();
        let customer_id = insert_customer(&conn, "Alice").unwrap();
        let loan_id = insert_loan(&conn, &sample_loan(customer_id)).unwrap();

        apply_payment(&conn, loan_id, 1000.0).unwrap();
        apply_payment(&conn, loan_id, 2500.0).unwrap();

        let loan = get_loan(&conn, loan_id).unwrap().unwrap();
        assert_eq!(loan.amount_paid, 3500.0);
    }

    #[test]
    fn test_payments_scoped_by_loan() {
        let conn = test_conn();
        let customer_id = insert_customer(&conn, "Alice").unwrap();
        let first = insert_loan(&conn, &sample_loan(customer_id)).unwrap();
        let second = insert_loan(&conn, &sample_loan(customer_id)).unwrap();

        insert_payment(&conn, first, 100.0, "2026-01-05T10:00:00.000Z", PAYMENT_TYPE_LUMP_SUM)
            .unwrap();
        insert_payment(&conn, second, 200.0, "2026-01-06T10:00:00.000Z", PAYMENT_TYPE_LUMP_SUM)
            .unwrap();
        insert_payment(&conn, first, 300.0, "2026-01-07T10:00:00.000Z", PAYMENT_TYPE_LUMP_SUM)
            .unwrap();

        let payments = payments_for_loan(&conn, first).unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].amount, 100.0);
        assert_eq!(payments[1].amount, 300.0);
        assert!(payments.iter().all(|tx| tx.loan_id == first));
        assert!(payments.iter().all(|tx| tx.payment_type == PAYMENT_TYPE_LUMP_SUM));
    }

    #[test]
    fn test_loans_for_customer_ordered() {
        let conn = test_conn();
        let alice = insert_customer(&conn, "Alice").unwrap();
        let bob = insert_customer(&conn, "Bob").unwrap();

        let first = insert_loan(&conn, &sample_loan(alice)).unwrap();
        insert_loan(&conn, &sample_loan(bob)).unwrap();
        let third = insert_loan(&conn, &sample_loan(alice)).unwrap();

        let loans = loans_for_customer(&conn, alice).unwrap();
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].loan_id, first);
        assert_eq!(loans[1].loan_id, third);
    }
}
