// Loan Ledger Service - Core Library
// Exposes the store layer and ledger operations for use in CLI, API server, and tests

pub mod db;
pub mod ledger;

// Re-export commonly used types
pub use db::{
    apply_payment, get_customer, get_loan, insert_customer, insert_loan, insert_payment,
    list_customers, loans_for_customer, payments_for_loan, setup_database, Customer, Loan,
    NewLoan, Transaction, DB_FILE, PAYMENT_TYPE_LUMP_SUM,
};
pub use ledger::{
    customer_overview, issue_loan, loan_ledger, record_payment, CustomerOverview, IssuedLoan,
    LedgerError, LedgerResult, LoanApplication, LoanLedger, LoanSummary, PaymentReceipt,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
