// Loan Ledger Service - REST API Server

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use loan_ledger::{ledger, setup_database, LedgerError, LoanApplication, DB_FILE};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

#[derive(Deserialize)]
struct PaymentRequest {
    amount: f64,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(err: LedgerError) -> Response {
    let (status, message) = match err {
        LedgerError::MissingFields => {
            (StatusCode::BAD_REQUEST, "Missing required fields".to_string())
        }
        LedgerError::LoanNotFound(_) => (StatusCode::NOT_FOUND, "Loan not found".to_string()),
        LedgerError::Store(e) => {
            eprintln!("Store error: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    };

    (status, Json(ErrorBody { error: message })).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/loans - Issue a new loan
async fn create_loan(
    State(state): State<AppState>,
    Json(application): Json<LoanApplication>,
) -> Response {
    let conn = state.db.lock().unwrap();

    match ledger::issue_loan(&conn, &application) {
        Ok(issued) => (StatusCode::CREATED, Json(issued)).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /api/loans/:loan_id/payments - Record a lump-sum payment
async fn create_payment(
    State(state): State<AppState>,
    Path(loan_id): Path<i64>,
    Json(payment): Json<PaymentRequest>,
) -> Response {
    let conn = state.db.lock().unwrap();

    match ledger::record_payment(&conn, loan_id, payment.amount) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /api/loans/:loan_id/ledger - Loan terms, balance, and payment history
async fn get_ledger(State(state): State<AppState>, Path(loan_id): Path<i64>) -> Response {
    let conn = state.db.lock().unwrap();

    match ledger::loan_ledger(&conn, loan_id) {
        Ok(ledger) => (StatusCode::OK, Json(ledger)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /api/customers/:customer_id/overview - All loans for one customer
async fn get_overview(State(state): State<AppState>, Path(customer_id): Path<i64>) -> Response {
    let conn = state.db.lock().unwrap();

    match ledger::customer_overview(&conn, customer_id) {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(err) => error_response(err),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("Loan Ledger Service - API Server");

    // Open database and make sure the schema exists
    let conn = match Connection::open(DB_FILE) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("Failed to open database {}: {}", DB_FILE, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = setup_database(&conn) {
        eprintln!("Failed to set up database {}: {}", DB_FILE, e);
        std::process::exit(1);
    }
    println!("✓ Database ready: {}", DB_FILE);

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/loans", post(create_loan))
        .route("/loans/:loan_id/payments", post(create_payment))
        .route("/loans/:loan_id/ledger", get(get_ledger))
        .route("/customers/:customer_id/overview", get(get_overview))
        .with_state(state);

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    println!("✓ Server running on http://localhost:{}", port);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
