// Loan Ledger Service - simple-interest loan accounting over the store layer.
//
// Four operations: issue a loan, record a payment, report a loan's ledger,
// report a customer's overview. All monetary math is plain f64 with
// ceiling-to-whole-unit rounding for EMI values.

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{self, Loan, NewLoan, Transaction, PAYMENT_TYPE_LUMP_SUM};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Loan not found: {0}")]
    LoanNotFound(i64),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Incoming loan request. Every field is required and must be non-zero;
/// `rate_of_interest` is a fractional per-year simple rate, not a percentage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanApplication {
    pub customer_id: Option<i64>,
    pub loan_amount: Option<f64>,
    pub loan_period: Option<i64>,
    pub rate_of_interest: Option<f64>,
}

/// Result of issuing a loan.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedLoan {
    pub loan_id: i64,
    pub customer_id: i64,
    pub total_amount_payable: f64,
    pub monthly_emi: f64,
}

/// Result of recording a payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment_id: i64,
    pub loan_id: i64,
    pub message: String,
    pub remaining_balance: f64,
    pub emis_left: i64,
}

/// A loan's full ledger: stored terms plus payment history and computed
/// balance.
#[derive(Debug, Clone, Serialize)]
pub struct LoanLedger {
    pub loan_details: Loan,
    pub balance_amount: f64,
    pub emis_left: i64,
    pub transactions: Vec<Transaction>,
}

/// Per-loan summary line in a customer overview.
#[derive(Debug, Clone, Serialize)]
pub struct LoanSummary {
    pub loan_id: i64,
    pub principal_amount: f64,
    pub total_amount_to_be_paid: f64,
    pub total_interest: f64,
    pub monthly_emi: f64,
    pub amount_paid_till_date: f64,
    pub emis_left: i64,
}

/// All loans held by one customer. Zero loans is a valid overview, not an
/// error.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerOverview {
    pub customer_id: i64,
    pub total_loans: usize,
    pub loans: Vec<LoanSummary>,
}

impl From<Loan> for LoanSummary {
    fn from(loan: Loan) -> Self {
        let balance = loan.total_amount_due - loan.amount_paid;
        Self {
            loan_id: loan.loan_id,
            principal_amount: loan.principal_amount,
            total_amount_to_be_paid: loan.total_amount_due,
            total_interest: loan.total_amount_due - loan.principal_amount,
            monthly_emi: loan.monthly_emi,
            amount_paid_till_date: loan.amount_paid,
            emis_left: emis_left(balance, loan.monthly_emi),
        }
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Issue a new loan. Simple interest: `principal * years * rate`, no
/// compounding. The monthly EMI is rounded UP to the nearest whole currency
/// unit, not to cents.
pub fn issue_loan(conn: &Connection, application: &LoanApplication) -> LedgerResult<IssuedLoan> {
    let customer_id = require_nonzero_int(application.customer_id)?;
    let loan_amount = require_nonzero(application.loan_amount)?;
    let loan_period = require_nonzero_int(application.loan_period)?;
    let rate_of_interest = require_nonzero(application.rate_of_interest)?;

    let interest = loan_amount * loan_period as f64 * rate_of_interest;
    let total_amount_due = loan_amount + interest;
    let monthly_emi = (total_amount_due / (loan_period as f64 * 12.0)).ceil();

    let loan_id = db::insert_loan(
        conn,
        &NewLoan {
            customer_id,
            principal_amount: loan_amount,
            interest_rate: rate_of_interest,
            loan_period_years: loan_period,
            total_amount_due,
            monthly_emi,
        },
    )?;

    Ok(IssuedLoan {
        loan_id,
        customer_id,
        total_amount_payable: total_amount_due,
        monthly_emi,
    })
}

/// Record a lump-sum payment against a loan. The loan is looked up first, so
/// an unknown id fails before anything is written and no orphan transaction
/// can exist.
pub fn record_payment(conn: &Connection, loan_id: i64, amount: f64) -> LedgerResult<PaymentReceipt> {
    let loan = db::get_loan(conn, loan_id)?.ok_or(LedgerError::LoanNotFound(loan_id))?;

    let payment_date = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let payment_id =
        db::insert_payment(conn, loan.loan_id, amount, &payment_date, PAYMENT_TYPE_LUMP_SUM)?;
    db::apply_payment(conn, loan.loan_id, amount)?;

    // Re-read so the receipt reflects the stored running total
    let loan = db::get_loan(conn, loan_id)?.ok_or(LedgerError::LoanNotFound(loan_id))?;
    let remaining_balance = loan.total_amount_due - loan.amount_paid;

    Ok(PaymentReceipt {
        payment_id,
        loan_id: loan.loan_id,
        message: "Payment successful".to_string(),
        remaining_balance,
        emis_left: emis_left(remaining_balance, loan.monthly_emi),
    })
}

/// Full ledger for one loan: terms, computed balance, and every payment in
/// insertion order.
pub fn loan_ledger(conn: &Connection, loan_id: i64) -> LedgerResult<LoanLedger> {
    let loan = db::get_loan(conn, loan_id)?.ok_or(LedgerError::LoanNotFound(loan_id))?;
    let transactions = db::payments_for_loan(conn, loan_id)?;

    let balance_amount = loan.total_amount_due - loan.amount_paid;
    let emis_left = emis_left(balance_amount, loan.monthly_emi);

    Ok(LoanLedger {
        loan_details: loan,
        balance_amount,
        emis_left,
        transactions,
    })
}

/// Summary of every loan held by a customer. A customer with no loans gets
/// an empty overview.
pub fn customer_overview(conn: &Connection, customer_id: i64) -> LedgerResult<CustomerOverview> {
    let loans: Vec<LoanSummary> = db::loans_for_customer(conn, customer_id)?
        .into_iter()
        .map(LoanSummary::from)
        .collect();

    Ok(CustomerOverview {
        customer_id,
        total_loans: loans.len(),
        loans,
    })
}

// ============================================================================
// Helpers
// ============================================================================

/// Whole EMIs still owed. Ceiling, so a partial installment counts as one.
fn emis_left(balance: f64, monthly_emi: f64) -> i64 {
    (balance / monthly_emi).ceil() as i64
}

fn require_nonzero(field: Option<f64>) -> LedgerResult<f64> {
    match field {
        Some(value) if value != 0.0 => Ok(value),
        _ => Err(LedgerError::MissingFields),
    }
}

fn require_nonzero_int(field: Option<i64>) -> LedgerResult<i64> {
    match field {
        Some(value) if value != 0 => Ok(value),
        _ => Err(LedgerError::MissingFields),
    }
}
