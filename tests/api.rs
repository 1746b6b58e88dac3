use canopy_watch::api::{AnalysisPoll, ApiClient, ApiError};
use canopy_watch::config::AppConfig;
use canopy_watch::form::{Attachment, ReportSubmission};
use canopy_watch::lifecycle::PollOutcome;
use canopy_watch::model::{Coordinates, ReportStatus};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&AppConfig::default().with_api_base(server.uri())).expect("client")
}

fn submission() -> ReportSubmission {
    ReportSubmission {
        existing_tree_id: None,
        coordinates: Some(Coordinates::new(35.68, 139.76)),
        severity: 4,
        report_type: "disease".to_string(),
        description: "black spots".to_string(),
        image: Some(Attachment {
            filename: "leaf.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }),
    }
}

#[tokio::test]
async fn points_load_and_malformed_features_are_counted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ndvi-points"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "FeatureCollection",
            "features": [
                {"geometry": {"type": "Point", "coordinates": [139.70, 35.68]},
                 "properties": {"id": "p1", "ndvi": 0.7, "ndvi_prev_year": 0.5, "ndvi_diff": 0.2}},
                {"geometry": {"type": "Point", "coordinates": [139.71, 35.69]},
                 "properties": {"id": "p2", "ndvi_diff": null}},
                {"geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
                 "properties": {"id": "bad"}}
            ]
        })))
        .mount(&server)
        .await;

    let decoded = client(&server).ndvi_points().await.expect("points");
    assert_eq!(decoded.skipped, 1);
    let ids: Vec<&str> = decoded.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2"]);
    assert_eq!(decoded.items[1].ndvi_delta, None);
}

#[tokio::test]
async fn server_error_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/citizen-reports"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "database locked"})))
        .mount(&server)
        .await;

    let err = client(&server).citizen_reports().await.expect_err("500");
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message.as_deref(), Some("database locked"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn missing_tree_history_is_empty_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tree-reports/T-404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let reports = client(&server).tree_reports("T-404").await.expect("treated as empty");
    assert!(reports.is_empty());
}

#[tokio::test]
async fn tree_history_is_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tree-reports/T-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "old", "tree_id": "T-1", "severity": 2, "status": "completed", "timestamp": "2024-03-01 09:00:00"},
            {"id": "undated", "tree_id": "T-1", "severity": 3},
            {"id": "new", "tree_id": "T-1", "severity": 4, "status": "analyzing", "timestamp": "2024-06-11 17:45:00"}
        ])))
        .mount(&server)
        .await;

    let reports = client(&server).tree_reports("T-1").await.expect("history");
    let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["new", "old", "undated"]);
    assert_eq!(reports[2].status, ReportStatus::Submitted);
}

#[tokio::test]
async fn submit_sends_multipart_and_returns_ack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_string_contains("name=\"latitude\""))
        .and(body_string_contains("name=\"severity\""))
        .and(body_string_contains("filename=\"leaf.jpg\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Report submitted successfully",
            "report_id": 57,
            "estimated_analysis_time": "2-5 minutes"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client(&server).submit(&submission()).await.expect("ack");
    assert_eq!(ack.report_id, "57");
    assert_eq!(ack.message.as_deref(), Some("Report submitted successfully"));
    assert_eq!(ack.estimated_analysis_time.as_deref(), Some("2-5 minutes"));
}

#[tokio::test]
async fn follow_up_submit_omits_coordinates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_string_contains("name=\"existing_tree_id\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "report_id": "r-9"})))
        .expect(1)
        .mount(&server)
        .await;

    let follow_up = ReportSubmission {
        existing_tree_id: Some("T-3".to_string()),
        coordinates: None,
        image: None,
        ..submission()
    };
    let ack = client(&server).submit(&follow_up).await.expect("ack");
    assert_eq!(ack.report_id, "r-9");

    let requests = server.received_requests().await.expect("recording enabled");
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains("name=\"latitude\""));
}

#[tokio::test]
async fn follow_up_appears_first_in_refetched_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "report_id": "r-new"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tree-reports/T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "r-old", "tree_id": "T1", "severity": 2, "status": "completed", "timestamp": "2024-01-15 10:30:00"},
            {"id": "r-new", "tree_id": "T1", "severity": 3, "status": "submitted", "timestamp": "2024-07-02 08:00:00"}
        ])))
        .mount(&server)
        .await;

    let api = client(&server);
    let follow_up = ReportSubmission {
        existing_tree_id: Some("T1".to_string()),
        coordinates: None,
        image: None,
        ..submission()
    };
    let ack = api.submit(&follow_up).await.expect("ack");
    let history = api.tree_reports("T1").await.expect("history");
    assert_eq!(history[0].id, ack.report_id);
}

#[tokio::test]
async fn submit_with_success_false_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": "Invalid image"})))
        .mount(&server)
        .await;

    let err = client(&server).submit(&submission()).await.expect_err("rejected");
    assert!(matches!(err, ApiError::Rejected(ref msg) if msg == "Invalid image"));
}

#[tokio::test]
async fn analysis_pending_then_complete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_analysis_result/r-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "analysis_complete": false})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get_analysis_result/r-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "analysis_complete": true,
            "result": {
                "tree_species": "Cherry",
                "species_confidence": 0.92,
                "health_status": "good",
                "health_score": 81.0,
                "issues_detected": [],
                "recommendations": ["Water weekly"]
            }
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    assert_eq!(api.analysis_result("r-1").await.expect("pending"), AnalysisPoll::Pending);
    match api.analysis_result("r-2").await.expect("complete") {
        AnalysisPoll::Complete(result) => {
            assert_eq!(result.tree_species.as_deref(), Some("Cherry"));
            assert_eq!(result.recommendations, ["Water weekly"]);
        }
        AnalysisPoll::Pending => panic!("expected a completed analysis"),
    }
}

#[tokio::test]
async fn failed_result_fetch_becomes_failed_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_analysis_result/r-3"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let outcome = PollOutcome::from(client(&server).analysis_result("r-3").await);
    assert!(matches!(outcome, PollOutcome::Failed(_)));
}

#[tokio::test]
async fn image_accepts_binary_and_data_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/image/raw"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/image/wrapped"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"image_data": "data:image/png;base64,iVBORw=="})),
        )
        .mount(&server)
        .await;

    let api = client(&server);
    assert_eq!(api.image("raw").await.expect("binary"), vec![0xFF, 0xD8, 0xFF, 0xE0]);
    assert_eq!(api.image("wrapped").await.expect("json"), vec![0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn timeseries_is_sorted_by_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/timeseries/park_001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"date": "2024-06-01", "ndvi": 0.71, "ndre": 0.40, "psri": 0.02},
            {"date": "2024-04-01", "ndvi": 0.55, "ndre": 0.31, "psri": 0.05}
        ])))
        .mount(&server)
        .await;

    let samples = client(&server).timeseries("park_001").await.expect("samples");
    assert_eq!(samples.len(), 2);
    assert!(samples[0].date < samples[1].date);
}
