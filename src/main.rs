// Loan Ledger Service - Operator CLI
// Customers are never created through the API; this is where they come from.

use anyhow::Result;
use rusqlite::Connection;
use std::env;
use std::path::Path;

use loan_ledger::{db, DB_FILE};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(),
        Some("add-customer") => run_add_customer(args.get(2).map(String::as_str)),
        Some("summary") | None => run_summary(),
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  loan-ledger init                 Create the database schema");
    eprintln!("  loan-ledger add-customer <name>  Register a customer");
    eprintln!("  loan-ledger [summary]            Show the loan portfolio per customer");
}

fn run_init() -> Result<()> {
    let conn = Connection::open(DB_FILE)?;
    db::setup_database(&conn)?;
    println!("✓ Database initialized: {}", DB_FILE);

    Ok(())
}

fn run_add_customer(name: Option<&str>) -> Result<()> {
    let Some(name) = name else {
        eprintln!("add-customer needs a name");
        print_usage();
        std::process::exit(2);
    };

    let conn = Connection::open(DB_FILE)?;
    db::setup_database(&conn)?;

    let customer_id = db::insert_customer(&conn, name)?;
    println!("✓ Customer {}: {}", customer_id, name);

    Ok(())
}

fn run_summary() -> Result<()> {
    if !Path::new(DB_FILE).exists() {
        eprintln!("Database not found: {}", DB_FILE);
        eprintln!("Run: loan-ledger init");
        std::process::exit(1);
    }

    let conn = Connection::open(DB_FILE)?;
    let customers = db::list_customers(&conn)?;

    if customers.is_empty() {
        println!("No customers yet. Run: loan-ledger add-customer <name>");
        return Ok(());
    }

    println!("Loan portfolio");
    for customer in &customers {
        let loans = db::loans_for_customer(&conn, customer.customer_id)?;
        let total_due: f64 = loans.iter().map(|loan| loan.total_amount_due).sum();
        let total_paid: f64 = loans.iter().map(|loan| loan.amount_paid).sum();

        println!(
            "  [{}] {}: {} loan(s), {:.2} due, {:.2} paid",
            customer.customer_id,
            customer.name,
            loans.len(),
            total_due,
            total_paid
        );
    }

    Ok(())
}
