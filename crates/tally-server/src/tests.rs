//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use tally_core::models::{NewEmployee, NewTransaction, TransactionType};
use tally_core::PasswordGate;
use tower::ServiceExt;

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    };
    create_router(db, None, config)
}

fn setup_auth_app() -> Router {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        password_gate: Some(PasswordGate::new("open-sesame").unwrap()),
        ..Default::default()
    };
    create_router(db, None, config)
}

fn app_with_db(db: Database) -> Router {
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    create_router(db, None, config)
}

fn day(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Jan: 1000 revenue. Feb: 2000 revenue, 500 expenses.
fn seed_two_months(db: &Database) {
    db.add_transaction(
        &NewTransaction::new("courses", TransactionType::Revenue, 1000.0, day(2024, 1, 10))
            .with_students(4),
    )
    .unwrap();
    db.add_transaction(
        &NewTransaction::new("courses", TransactionType::Revenue, 2000.0, day(2024, 2, 5))
            .with_students(6),
    )
    .unwrap();
    db.add_transaction(&NewTransaction::new(
        "courses",
        TransactionType::Expense,
        500.0,
        day(2024, 2, 20),
    ))
    .unwrap();
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

// ========== Transaction API Tests ==========

#[tokio::test]
async fn test_list_transactions_empty() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/transactions")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["transactions"].as_array().unwrap().len(), 0);
    assert_eq!(json["total"], 0);
    assert_eq!(json["limit"], 50);
    assert_eq!(json["offset"], 0);
}

#[tokio::test]
async fn test_create_transaction_refreshes_aggregates() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "businessId": "courses",
        "type": "revenue",
        "amount": 1200.0,
        "students": 3,
        "date": "2024-03-15",
        "category": "tuition"
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/transactions", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["aggregates_refreshed"], true);
    assert_eq!(json["transaction"]["businessId"], "courses");
    assert_eq!(json["transaction"]["type"], "revenue");
    assert_eq!(json["transaction"]["category"], "tuition");

    let response = app.oneshot(get("/api/monthly-aggregates")).await.unwrap();
    let json = get_body_json(response).await;
    let aggregates = json.as_array().unwrap();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0]["businessId"], "courses");
    assert_eq!(aggregates[0]["year"], 2024);
    assert_eq!(aggregates[0]["month"], 3);
    assert_eq!(aggregates[0]["total_revenue"], 1200.0);
    assert_eq!(aggregates[0]["students_count"], 3);
}

#[tokio::test]
async fn test_create_transaction_accepts_datetime_local() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "businessId": "abayat_shop",
        "type": "expense",
        "amount": 80.0,
        "date": "2024-05-31T23:30"
    });

    let response = app
        .oneshot(json_request("POST", "/api/transactions", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["transaction"]["type"], "expense");
}

#[tokio::test]
async fn test_create_transaction_validation() {
    let app = setup_test_app();

    let cases = [
        serde_json::json!({
            "businessId": "courses", "type": "refund", "amount": 10.0, "date": "2024-01-01"
        }),
        serde_json::json!({
            "businessId": "courses", "type": "revenue", "amount": -10.0, "date": "2024-01-01"
        }),
        serde_json::json!({
            "businessId": "", "type": "revenue", "amount": 10.0, "date": "2024-01-01"
        }),
        serde_json::json!({
            "businessId": "courses", "type": "revenue", "amount": 10.0, "date": "last tuesday"
        }),
        serde_json::json!({
            "businessId": "courses", "type": "revenue", "amount": 10.0, "cost": -1.0, "date": "2024-01-01"
        }),
        serde_json::json!({
            "businessId": "courses", "type": "revenue", "amount": 1e300, "date": "2024-01-01"
        }),
        serde_json::json!({
            "businessId": "courses", "type": "revenue", "amount": 10.0, "cost": 5e12, "date": "2024-01-01"
        }),
    ];

    for body in cases {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/transactions", body.clone()))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 for {}",
            body
        );
    }

    // Nothing was stored
    let response = app.oneshot(get("/api/transactions")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_create_transaction_invalid_json() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/transactions")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_transactions_filters() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    db.add_transaction(&NewTransaction::new(
        "abayat_shop",
        TransactionType::Revenue,
        300.0,
        day(2024, 2, 14),
    ))
    .unwrap();
    let app = app_with_db(db);

    let response = app
        .clone()
        .oneshot(get("/api/transactions?businessId=courses"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 3);

    let response = app
        .clone()
        .oneshot(get("/api/transactions?type=expense"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["transactions"][0]["amount"], 500.0);

    let response = app
        .clone()
        .oneshot(get("/api/transactions?startDate=2024-02-01&endDate=2024-02-14"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 2);
    // Newest first
    assert_eq!(json["transactions"][0]["businessId"], "abayat_shop");

    let response = app
        .oneshot(get("/api/transactions?limit=1&offset=1"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 4);
    assert_eq!(json["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(json["limit"], 1);
    assert_eq!(json["offset"], 1);
}

#[tokio::test]
async fn test_list_transactions_clamps_limit() {
    let app = setup_test_app();

    let response = app
        .oneshot(get("/api/transactions?limit=100000&offset=-5"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["limit"], MAX_PAGE_LIMIT);
    assert_eq!(json["offset"], 0);
}

#[tokio::test]
async fn test_list_transactions_invalid_filters() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(get("/api/transactions?startDate=01/02/2024"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/api/transactions?type=transfer"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_transaction() {
    let db = Database::in_memory().unwrap();
    let id = db
        .add_transaction(&NewTransaction::new(
            "courses",
            TransactionType::Revenue,
            250.0,
            day(2024, 1, 15),
        ))
        .unwrap()
        .transaction
        .id;
    let app = app_with_db(db);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/transactions/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["id"], id);
    assert_eq!(json["amount"], 250.0);

    let response = app.oneshot(get("/api/transactions/99999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_transaction_recomputes() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    let feb_expense = db
        .list_transactions(&tally_core::db::TransactionFilter::new().tx_type(Some(TransactionType::Expense)))
        .unwrap()[0]
        .id;
    let app = app_with_db(db.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/transactions/{}", feb_expense))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let aggregates = db.list_aggregates().unwrap();
    assert_eq!(aggregates.len(), 2);
    assert_eq!(aggregates[1].total_expenses, 0.0);
    assert_eq!(aggregates[1].net_profit, 2000.0);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/transactions/{}", feb_expense))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Aggregate and Forecast API Tests ==========

#[tokio::test]
async fn test_monthly_aggregates_growth() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    let app = app_with_db(db);

    let response = app.oneshot(get("/api/monthly-aggregates")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let aggregates = json.as_array().unwrap();
    assert_eq!(aggregates.len(), 2);
    assert!(aggregates[0].get("growth_vs_prev").is_none());
    assert_eq!(aggregates[1]["net_profit"], 1500.0);
    assert_eq!(aggregates[1]["growth_vs_prev"], 0.5);
}

#[tokio::test]
async fn test_monthly_aggregates_by_business() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    db.add_transaction(&NewTransaction::new(
        "abayat_shop",
        TransactionType::Revenue,
        300.0,
        day(2024, 2, 14),
    ))
    .unwrap();
    let app = app_with_db(db);

    let response = app
        .oneshot(get("/api/monthly-aggregates?businessId=abayat_shop"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let aggregates = json.as_array().unwrap();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0]["businessId"], "abayat_shop");
}

#[tokio::test]
async fn test_forecast_empty() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/forecast")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["forecast_revenue"], 0.0);
    assert_eq!(json["forecast_profit"], 0.0);
    assert_eq!(json["confidence"], "low");
}

#[tokio::test]
async fn test_forecast_two_months() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    let app = app_with_db(db);

    let response = app.oneshot(get("/api/forecast")).await.unwrap();
    let json = get_body_json(response).await;

    // Growth 1000 -> 1500 is 0.5, applied to February
    assert_eq!(json["forecast_profit"], 2250.0);
    assert_eq!(json["forecast_revenue"], 3000.0);
    assert_eq!(json["confidence"], "medium");
    assert_eq!(json["based_on_months"], 2);
}

// ========== Report API Tests ==========

#[tokio::test]
async fn test_report_summary_monthly() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    let app = app_with_db(db);

    let response = app.oneshot(get("/api/reports/summary")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["period"], "monthly");
    assert_eq!(json["total_revenue"], 3000.0);
    assert_eq!(json["total_expenses"], 500.0);
    assert_eq!(json["net_profit"], 2500.0);
    assert_eq!(json["total_students"], 10);
    assert_eq!(json["rows"].as_array().unwrap().len(), 2);
    assert_eq!(json["rows"][0]["label"], "2024/1");
}

#[tokio::test]
async fn test_report_summary_quarterly() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    let app = app_with_db(db);

    let response = app
        .oneshot(get("/api/reports/summary?period=quarterly&businessId=courses"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["period"], "quarterly");
    assert_eq!(json["businessId"], "courses");
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["label"], "2024-Q1");
    assert_eq!(rows[0]["net_profit"], 2500.0);
}

#[tokio::test]
async fn test_report_summary_invalid_period() {
    let app = setup_test_app();

    let response = app
        .oneshot(get("/api/reports/summary?period=fortnightly"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_report_dashboard() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    let app = app_with_db(db);

    let response = app
        .clone()
        .oneshot(get("/api/reports/dashboard?date=2024-02-29"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["year"], 2024);
    assert_eq!(json["month"], 2);
    assert_eq!(json["revenue"]["current"], 2000.0);
    assert_eq!(json["revenue"]["previous"], 1000.0);
    assert_eq!(json["revenue"]["change_percent"], 100.0);
    assert_eq!(json["profit"]["change_percent"], 50.0);
    assert_eq!(json["forecast_profit"], 2250.0);
    assert_eq!(json["forecast_confidence"], "medium");

    let response = app
        .oneshot(get("/api/reports/dashboard?date=garbage"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_report_by_business() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    db.add_transaction(&NewTransaction::new(
        "abayat_shop",
        TransactionType::Revenue,
        300.0,
        day(2024, 2, 14),
    ))
    .unwrap();
    let app = app_with_db(db);

    let response = app.oneshot(get("/api/reports/by-business")).await.unwrap();
    let json = get_body_json(response).await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["businessId"], "courses");
    assert_eq!(rows[0]["months"], 2);
    assert_eq!(rows[1]["businessId"], "abayat_shop");
}

// ========== Employee API Tests ==========

#[tokio::test]
async fn test_employee_crud() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/employees",
            serde_json::json!({
                "name": "Mariam",
                "role": "Tailor",
                "businessId": "abayat_shop",
                "monthlySalary": 450.0,
                "hiredAt": "2023-09-01"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let id = json["id"].as_i64().unwrap();
    assert_eq!(json["name"], "Mariam");
    assert_eq!(json["hiredAt"], "2023-09-01");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/employees/{}", id),
            serde_json::json!({ "name": "Mariam A.", "role": "Head tailor" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["name"], "Mariam A.");
    assert_eq!(json["role"], "Head tailor");
    assert!(json["monthlySalary"].is_null());

    let response = app.clone().oneshot(get("/api/employees")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/employees/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/api/employees/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_employee_validation() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/employees",
            serde_json::json!({ "name": "  " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/employees/424242",
            serde_json::json!({ "name": "Nobody" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Export / Import API Tests ==========

#[tokio::test]
async fn test_export_transactions_csv() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    let app = app_with_db(db);

    let response = app
        .oneshot(get("/api/export/transactions?type=revenue"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );

    let csv = get_body_text(response).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "date,businessId,type,category,amount,cost,students,clients,notes"
    );
    assert_eq!(lines.len(), 3);
    // Oldest first
    assert!(lines[1].starts_with("2024-01-10,courses,revenue"));
}

#[tokio::test]
async fn test_export_transactions_json() {
    let db = Database::in_memory().unwrap();
    seed_two_months(&db);
    let app = app_with_db(db);

    let response = app
        .clone()
        .oneshot(get("/api/export/transactions?format=json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 3);

    let response = app
        .oneshot(get("/api/export/transactions?format=xlsx"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_import_full_roundtrip() {
    let source = Database::in_memory().unwrap();
    seed_two_months(&source);
    source
        .create_employee(&NewEmployee {
            name: "Salim".to_string(),
            ..Default::default()
        })
        .unwrap();
    let source_app = app_with_db(source);

    let response = source_app.oneshot(get("/api/export/full")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("tally-backup-"));
    let backup = get_body_text(response).await;

    let target = Database::in_memory().unwrap();
    target
        .add_transaction(&NewTransaction::new(
            "stale",
            TransactionType::Revenue,
            1.0,
            day(2020, 1, 1),
        ))
        .unwrap();
    let target_app = app_with_db(target.clone());

    // Refuses without confirmation
    let response = target_app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/full")
                .header("content-type", "application/json")
                .body(Body::from(backup.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = target_app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/full?clear=true")
                .header("content-type", "application/json")
                .body(Body::from(backup))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["stats"]["transactions"], 3);
    assert_eq!(json["stats"]["employees"], 1);
    assert_eq!(json["stats"]["aggregates"], 2);

    let aggregates = target.list_aggregates().unwrap();
    assert_eq!(aggregates.len(), 2);
    assert!(aggregates.iter().all(|a| a.business_id == "courses"));
}

#[tokio::test]
async fn test_import_full_invalid_json() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/full?clear=true")
                .header("content-type", "application/json")
                .body(Body::from("[]"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Audit API Tests ==========

#[tokio::test]
async fn test_audit_log_records_writes() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "businessId": "courses",
        "type": "revenue",
        "amount": 100.0,
        "date": "2024-01-01"
    });
    app.clone()
        .oneshot(json_request("POST", "/api/transactions", body))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/audit?limit=10")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert!(entries
        .iter()
        .any(|e| e["action"] == "create" && e["entity_type"] == "transaction"));
    assert!(entries.iter().all(|e| e["actor"] == "local-dev"));
}

// ========== Authentication Tests ==========

#[tokio::test]
async fn test_auth_required() {
    let app = setup_auth_app();

    let response = app.oneshot(get("/api/transactions")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_rejects_unknown_token() {
    let app = setup_auth_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .header("authorization", "Bearer not-a-real-session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = setup_auth_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/login",
            serde_json::json!({ "password": "wrong" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_logins() {
    let app = setup_auth_app();

    let handles: Vec<_> = ["open-sesame", "wrong", "open-sesame", "open-sesame"]
        .into_iter()
        .map(|password| {
            let app = app.clone();
            tokio::spawn(async move {
                app.oneshot(json_request(
                    "POST",
                    "/api/login",
                    serde_json::json!({ "password": password }),
                ))
                .await
                .unwrap()
                .status()
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::UNAUTHORIZED,
            StatusCode::OK,
            StatusCode::OK
        ]
    );
}

#[tokio::test]
async fn test_login_not_configured() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let app = create_router(db, None, config);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/login",
            serde_json::json!({ "password": "anything" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_session_flow() {
    let app = setup_auth_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            serde_json::json!({ "password": "open-sesame" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("tally_session="));
    assert!(cookie.contains("HttpOnly"));

    let json = get_body_json(response).await;
    let token = json["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    // Bearer header
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["auth_method"], "session");

    // Cookie
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .header("cookie", format!("theme=dark; {}={}", SESSION_COOKIE, token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Logout ends the session
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/logout")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_without_auth() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/me")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["authenticated"], true);
    assert_eq!(json["auth_method"], "none");
}

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();

    let response = app.oneshot(get("/api/me")).await.unwrap();
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
}

#[test]
fn test_session_token_extraction() {
    let mut headers = HeaderMap::new();
    assert_eq!(session_token(&headers), None);

    headers.insert(
        header::COOKIE,
        HeaderValue::from_static("a=1; tally_session=abc123"),
    );
    assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
    assert_eq!(session_token(&headers).as_deref(), Some("xyz"));

    let actor = get_actor(&headers);
    assert!(actor.starts_with("session:"));
    assert_eq!(actor.len(), "session:".len() + 8);
}

#[test]
fn test_parse_session_ttl() {
    assert_eq!(parse_session_ttl(None), chrono::Duration::hours(24));
    assert_eq!(parse_session_ttl(Some(" 8 ")), chrono::Duration::hours(8));
    assert_eq!(parse_session_ttl(Some("0")), chrono::Duration::hours(24));
    assert_eq!(parse_session_ttl(Some("forever")), chrono::Duration::hours(24));

    // Huge values are capped instead of overflowing at login
    let capped = chrono::Duration::hours(24 * 365);
    assert_eq!(parse_session_ttl(Some("9223372036854775807")), capped);
    assert_eq!(parse_session_ttl(Some("1000000000")), capped);
}
