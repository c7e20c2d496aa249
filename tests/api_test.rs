use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;
use wallet_fees::api;
use wallet_fees::config::{Config, FeeSettings};
use wallet_fees::db::init_db;
use wallet_fees::domain::{FeeBearer, Money, Transaction, TransactionType, WalletId};

struct TestApp {
    app: axum::Router,
    repo: Arc<wallet_fees::Repository>,
    _temp: TempDir,
}

async fn setup_test_app(fees: FeeSettings) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(wallet_fees::Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        fees,
    };

    let app = api::create_router(api::AppState::new(repo.clone(), config));
    TestApp {
        app,
        repo,
        _temp: temp_dir,
    }
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, body)
}

async fn send_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_wallet(app: &axum::Router) -> String {
    let (status, body) = send_json(app, "POST", "/v1/wallets", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

fn deposit_rule(name: &str) -> Value {
    json!({
        "name": name,
        "transactionType": "deposit",
        "feeType": "hybrid",
        "percentageFee": "1.5",
        "flatFee": "50",
        "waiverThreshold": "1000",
        "feeBearer": "customer"
    })
}

fn money(value: &Value) -> Money {
    Money::parse(value.as_str().unwrap(), "NGN").unwrap()
}

#[tokio::test]
async fn test_health_and_ready() {
    let t = setup_test_app(FeeSettings::default()).await;

    let (status, body) = send_json(&t.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send_json(&t.app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_configuration_crud() {
    let t = setup_test_app(FeeSettings::default()).await;

    let mut rule = json!({
        "name": "withdrawal bands",
        "transactionType": "withdrawal",
        "feeType": "flat",
        "flatFee": "50",
        "tiers": [
            {"minAmount": "0", "maxAmount": "5000", "feeAmount": "10"},
            {"minAmount": "5000.01", "feeAmount": "25"}
        ]
    });
    let (status, created) =
        send_json(&t.app, "POST", "/v1/fee-configurations", Some(rule.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["tiers"].as_array().unwrap().len(), 2);
    assert_eq!(created["currency"], "NGN");

    let (status, fetched) =
        send_json(&t.app, "GET", &format!("/v1/fee-configurations/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "withdrawal bands");

    rule["name"] = json!("deposit rule");
    rule["transactionType"] = json!("deposit");
    rule["tiers"] = json!([]);
    let (status, _) = send_json(&t.app, "POST", "/v1/fee-configurations", Some(rule)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listed) = send_json(
        &t.app,
        "GET",
        "/v1/fee-configurations?transactionType=withdrawal",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, replaced) = send_json(
        &t.app,
        "PUT",
        &format!("/v1/fee-configurations/{id}/tiers"),
        Some(json!({"tiers": [{"minAmount": "0", "feeAmount": "15"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["tiers"].as_array().unwrap().len(), 1);

    let (status, _) =
        send_json(&t.app, "DELETE", &format!("/v1/fee-configurations/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) =
        send_json(&t.app, "GET", &format!("/v1/fee-configurations/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) =
        send_json(&t.app, "DELETE", &format!("/v1/fee-configurations/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_configurations_rejected() {
    let t = setup_test_app(FeeSettings::default()).await;

    let bad_split = json!({
        "name": "bad split",
        "transactionType": "payment",
        "feeBearer": "split",
        "customerPercentage": "30",
        "merchantPercentage": "60"
    });
    let (status, body) =
        send_json(&t.app, "POST", "/v1/fee-configurations", Some(bad_split)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("100"));

    let overlapping = json!({
        "name": "overlap",
        "transactionType": "withdrawal",
        "tiers": [
            {"minAmount": "0", "maxAmount": "5000", "feeAmount": "10"},
            {"minAmount": "5000", "feeAmount": "25"}
        ]
    });
    let (status, _) =
        send_json(&t.app, "POST", "/v1/fee-configurations", Some(overlapping)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown_type = json!({"name": "x", "transactionType": "airdrop"});
    let (status, _) =
        send_json(&t.app, "POST", "/v1/fee-configurations", Some(unknown_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let sub_kobo = json!({"name": "x", "transactionType": "payment", "flatFee": "1.005"});
    let (status, _) = send_json(&t.app, "POST", "/v1/fee-configurations", Some(sub_kobo)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown_wallet = json!({
        "name": "x",
        "transactionType": "payment",
        "walletId": WalletId::new_v4().to_string()
    });
    let (status, _) =
        send_json(&t.app, "POST", "/v1/fee-configurations", Some(unknown_wallet)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(&t.app, "GET", "/v1/fee-configurations/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quote_prices_without_persisting() {
    let t = setup_test_app(FeeSettings::default()).await;
    send_json(
        &t.app,
        "POST",
        "/v1/fee-configurations",
        Some(deposit_rule("deposits")),
    )
    .await;

    let (status, body) = send_json(
        &t.app,
        "POST",
        "/v1/fees/quote",
        Some(json!({"transactionType": "deposit", "amount": "500"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["calculationMethod"], "database");
    assert_eq!(money(&body["fee"]), Money::parse("7.50", "NGN").unwrap());
    assert_eq!(body["allocation"]["feeBearer"], "customer");

    let (status, body) = send_json(
        &t.app,
        "POST",
        "/v1/fees/quote",
        Some(json!({"transactionType": "deposit", "amount": "2000", "feeBearer": "merchant"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["fee"]), Money::parse("80", "NGN").unwrap());
    assert_eq!(body["allocation"]["feeBearer"], "merchant");
    assert_eq!(
        money(&body["allocation"]["merchantReceives"]),
        Money::parse("1920", "NGN").unwrap()
    );

    let (status, body) = send_json(
        &t.app,
        "POST",
        "/v1/fees/quote",
        Some(json!({"transactionType": "payment", "amount": "2000"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/v1/fees/quote",
        Some(json!({"transactionType": "deposit", "amount": "-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, history) = send_json(&t.app, "GET", "/v1/fee-history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_out_of_range_amount_is_rejected() {
    let t = setup_test_app(FeeSettings::default()).await;
    let wallet = create_wallet(&t.app).await;
    send_json(
        &t.app,
        "POST",
        "/v1/fee-configurations",
        Some(json!({
            "name": "half",
            "transactionType": "payment",
            "feeType": "percentage",
            "percentageFee": "50"
        })),
    )
    .await;
    let huge = "79228162514264337593543950335";

    let (status, body) = send_json(
        &t.app,
        "POST",
        "/v1/fees/quote",
        Some(json!({"transactionType": "payment", "amount": huge})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("out of range"));

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/v1/transactions",
        Some(json!({
            "walletId": wallet,
            "reference": "PSK-HUGE",
            "transactionType": "payment",
            "amount": huge
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The failed record left nothing behind.
    let (_, history) = send_json(&t.app, "GET", "/v1/fee-history", None).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_record_transaction_writes_history() {
    let t = setup_test_app(FeeSettings::default()).await;
    let wallet = create_wallet(&t.app).await;
    send_json(
        &t.app,
        "POST",
        "/v1/fee-configurations",
        Some(deposit_rule("deposits")),
    )
    .await;

    let request = json!({
        "walletId": wallet,
        "reference": "PSK-001",
        "transactionType": "deposit",
        "paymentChannel": "local_card",
        "amount": "2000"
    });
    let (status, body) =
        send_json(&t.app, "POST", "/v1/transactions", Some(request.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(money(&body["transaction"]["fees"]), Money::parse("80", "NGN").unwrap());
    assert_eq!(body["transaction"]["feeBearer"], "customer");
    assert_eq!(body["history"]["calculationMethod"], "database");
    let transaction_id = body["transaction"]["id"].as_str().unwrap().to_string();

    let (status, _) = send_json(&t.app, "POST", "/v1/transactions", Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send_json(
        &t.app,
        "POST",
        &format!("/v1/transactions/{transaction_id}/fee"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, history) = send_json(
        &t.app,
        "GET",
        &format!("/v1/fee-history?transactionId={transaction_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["feeBearer"], "customer");
    assert_eq!(money(&history[0]["calculatedFee"]), Money::parse("80", "NGN").unwrap());
}

#[tokio::test]
async fn test_record_transaction_errors() {
    let t = setup_test_app(FeeSettings::default()).await;
    let wallet = create_wallet(&t.app).await;

    // No rule and no settings fallback.
    let (status, _) = send_json(
        &t.app,
        "POST",
        "/v1/transactions",
        Some(json!({
            "walletId": wallet,
            "reference": "PSK-404",
            "transactionType": "payment",
            "amount": "100"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/v1/transactions",
        Some(json!({
            "walletId": WalletId::new_v4().to_string(),
            "reference": "PSK-405",
            "transactionType": "payment",
            "amount": "100"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/v1/transactions",
        Some(json!({
            "walletId": wallet,
            "reference": " ",
            "transactionType": "payment",
            "amount": "100"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &t.app,
        "POST",
        &format!("/v1/transactions/{}/fee", WalletId::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_fallback_and_apply_to_existing() {
    let fees = FeeSettings {
        use_settings_fallback: true,
        ..FeeSettings::default()
    };
    let t = setup_test_app(fees).await;
    let wallet_id: WalletId = create_wallet(&t.app).await.parse().unwrap();

    let transaction = Transaction::new(
        wallet_id,
        "PSK-OLD",
        TransactionType::Withdrawal,
        None,
        Money::parse("20000", "NGN").unwrap(),
    );
    let mut conn = t.repo.pool().acquire().await.unwrap();
    wallet_fees::db::repo::insert_transaction(&mut conn, &transaction)
        .await
        .unwrap();
    drop(conn);

    let (status, body) = send_json(
        &t.app,
        "POST",
        &format!("/v1/transactions/{}/fee", transaction.id),
        Some(json!({"feeBearer": "customer"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["fee"]["calculationMethod"], "settings");
    assert!(body["fee"]["configurationId"].is_null());
    assert_eq!(money(&body["fee"]["fee"]), Money::parse("25", "NGN").unwrap());
    assert_eq!(body["transaction"]["feeBearer"], "customer");

    let stored = t.repo.get_transaction(&transaction.id).await.unwrap().unwrap();
    assert_eq!(stored.fees, Money::parse("25", "NGN").unwrap());
    assert_eq!(stored.fee_bearer, Some(FeeBearer::Customer));
}

#[tokio::test]
async fn test_history_filters_and_csv_export() {
    let t = setup_test_app(FeeSettings::default()).await;
    let wallet = create_wallet(&t.app).await;
    send_json(
        &t.app,
        "POST",
        "/v1/fee-configurations",
        Some(deposit_rule("deposits")),
    )
    .await;

    for (reference, amount) in [("PSK-1", "500"), ("PSK-2", "2000"), ("PSK-3", "4000")] {
        let (status, _) = send_json(
            &t.app,
            "POST",
            "/v1/transactions",
            Some(json!({
                "walletId": wallet,
                "reference": reference,
                "transactionType": "deposit",
                "amount": amount
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send_json(&t.app, "GET", "/v1/fee-history?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) =
        send_json(&t.app, "GET", "/v1/fee-history?fromMs=10&toMs=5", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, bytes) = send(&t.app, "GET", "/v1/fee-history/export", None).await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(bytes).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "created_at,transaction_id,configuration_id,calculation_method,original_amount,calculated_fee,currency,fee_bearer"
    );
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().any(|row| row.contains(",500.00,7.50,NGN,customer")));
    assert!(rows.iter().any(|row| row.contains(",2000.00,80.00,NGN,customer")));
}

#[tokio::test]
async fn test_backfill_endpoint() {
    let t = setup_test_app(FeeSettings::default()).await;
    let wallet_id: WalletId = create_wallet(&t.app).await.parse().unwrap();

    let mut conn = t.repo.pool().acquire().await.unwrap();
    for (index, fees) in ["15", "0", "40"].iter().enumerate() {
        let mut transaction = Transaction::new(
            wallet_id,
            format!("LEGACY-{index}"),
            TransactionType::Payment,
            None,
            Money::parse("1000", "NGN").unwrap(),
        );
        transaction.fees = Money::parse(fees, "NGN").unwrap();
        wallet_fees::db::repo::insert_transaction(&mut conn, &transaction)
            .await
            .unwrap();
    }
    drop(conn);

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/v1/admin/fee-history/backfill",
        Some(json!({"batchSize": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = send_json(
        &t.app,
        "POST",
        "/v1/admin/fee-history/backfill",
        Some(json!({"dryRun": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["found"], 2);
    assert_eq!(report["created"], 0);
    assert_eq!(report["dryRun"], true);

    let (status, report) = send_json(
        &t.app,
        "POST",
        "/v1/admin/fee-history/backfill",
        Some(json!({"batchSize": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["found"], 2);
    assert_eq!(report["created"], 2);
    assert_eq!(report["errors"], 0);
    assert_eq!(report["batches"], 2);

    let (_, history) = send_json(&t.app, "GET", "/v1/fee-history", None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .all(|h| h["calculationMethod"] == "backfill" && h["calculationDetails"]["backfilled"] == true));

    let (_, report) = send_json(&t.app, "POST", "/v1/admin/fee-history/backfill", None).await;
    assert_eq!(report["found"], 0);
}
