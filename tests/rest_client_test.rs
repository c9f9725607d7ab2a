//! Chart REST client tests against a mock backend

use std::time::Duration;

use serde_json::json;
use stockchart::feed::{ChartRestClient, RestApiError};
use stockchart::market_data::{ChartRequest, Selection, Timeframe, fetch_series};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ChartRestClient {
    ChartRestClient::new(format!("{}/", server.uri()), Duration::from_secs(2))
}

#[tokio::test]
async fn test_fetch_chart_posts_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/stock/daily-chart/005930"))
        .and(query_param("apiId", "KA10081"))
        .and(body_json(json!({ "stk_cd": "005930", "upd_stkpc_tp": "1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stk_dt_pole_chart_qry": [
                { "dt": "20240103", "cur_prc": "-70,900", "open_pric": "71,500",
                  "high_pric": "+72,000", "low_pric": "70,500", "trde_qty": "1,200" },
                { "dt": "20240102", "cur_prc": "71,000", "open_pric": "70,000",
                  "high_pric": "71,200", "low_pric": "69,800", "trde_qty": "900" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let selection = Selection::new("005930", Timeframe::Daily);
    let records = fetch_series(&client(&server), &selection).await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records[0].time < records[1].time);
    assert_eq!(records[1].close, 70_900.0);
    assert_eq!(records[1].high, 72_000.0);
    assert_eq!(records[1].volume, 1_200.0);
}

#[tokio::test]
async fn test_minute_request_sends_tic_scope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/stock/daily-chart/005930"))
        .and(query_param("apiId", "KA10080"))
        .and(body_json(json!({ "stk_cd": "005930", "upd_stkpc_tp": "1", "tic_scope": "5" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stk_min_pole_chart_qry": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let selection = Selection::new("005930", Timeframe::Minute).with_tic_scope(5);
    let payload = client(&server)
        .fetch_chart(&ChartRequest::latest(&selection))
        .await
        .unwrap();
    assert!(payload["stk_min_pole_chart_qry"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_older_page_carries_base_date() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/stock/daily-chart/005930"))
        .and(body_json(json!({ "stk_cd": "005930", "upd_stkpc_tp": "1", "base_dt": "20240101" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stk_dt_pole_chart_qry": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let selection = Selection::new("005930", Timeframe::Daily);
    let oldest = stockchart::market_data::wall_clock_epoch(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    );
    let request = ChartRequest::older_than(&selection, oldest).unwrap();
    client(&server).fetch_chart(&request).await.unwrap();
}

#[tokio::test]
async fn test_http_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let selection = Selection::new("005930", Timeframe::Weekly);
    let err = fetch_series(&client(&server), &selection).await.unwrap_err();
    match err {
        RestApiError::HttpStatusError(status, body) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_symbol_is_rejected_before_request() {
    let server = MockServer::start().await;
    let selection = Selection::new("../etc", Timeframe::Daily);
    let err = fetch_series(&client(&server), &selection).await.unwrap_err();
    assert!(matches!(err, RestApiError::InvalidSymbol(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_announce_subscription_and_price() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/stock/subscribe/005930"))
        .and(body_json(json!({ "trId": "0B" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stock/price/005930"))
        .and(query_param("trId", "ka10001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": { "stck_prpr": "-71,300" }
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    client.announce_subscription("005930", "0B").await.unwrap();
    let price = client.fetch_price("005930", "ka10001").await.unwrap();
    assert_eq!(price, 71_300.0);
}
