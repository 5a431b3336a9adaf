use chrono::{DateTime, Duration, TimeZone, Utc};
use densify_recommendation::config::types::ServiceSettings;
use densify_recommendation::densify::{
    ConnectionInfo, FetchOutcome, ServiceError, SessionManager, SessionOutcome,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn session_for(server: &ServerGuard, token: Option<(&str, DateTime<Utc>)>) -> SessionManager {
    let mut connection = ConnectionInfo::new(&server.url(), "svc-user", "hunter2");
    if let Some((token, issued_at)) = token {
        connection.set_token(token.to_string(), issued_at);
    }
    SessionManager::new(connection, &ServiceSettings::default()).unwrap()
}

// ─── Session Manager ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reports_unreachable_when_ping_fails() {
    let mut server = Server::new_async().await;
    let ping = server
        .mock("GET", "/CIRBA/api/ping")
        .with_status(503)
        .create_async()
        .await;
    let authorize = server
        .mock("POST", "/CIRBA/api/v2/authorize")
        .expect(0)
        .create_async()
        .await;

    let mut session = session_for(&server, None);
    let outcome = session.ensure_session(t0()).await;

    assert!(matches!(
        outcome,
        SessionOutcome::Unreachable(ServiceError::Unreachable(_))
    ));
    assert!(!outcome.needs_persist());
    ping.assert_async().await;
    authorize.assert_async().await;
}

#[tokio::test]
async fn test_issues_a_token_when_none_is_held() {
    let mut server = Server::new_async().await;
    let _ping = server
        .mock("GET", "/CIRBA/api/ping")
        .with_status(200)
        .create_async()
        .await;
    let authorize = server
        .mock("POST", "/CIRBA/api/v2/authorize")
        .match_body(Matcher::Json(json!({ "userName": "svc-user", "pwd": "hunter2" })))
        .with_status(200)
        .with_body(json!({ "status": 200, "apiToken": "tok-1" }).to_string())
        .create_async()
        .await;

    let mut session = session_for(&server, None);
    let outcome = session.ensure_session(t0()).await;

    assert!(matches!(outcome, SessionOutcome::Reissued));
    assert!(outcome.needs_persist());
    let held = session.connection().session.clone().unwrap();
    assert_eq!(held.token, "tok-1");
    assert_eq!(held.issued_at, t0());
    authorize.assert_async().await;
}

#[tokio::test]
async fn test_reuses_a_token_inside_its_lifetime() {
    let mut server = Server::new_async().await;
    let _ping = server
        .mock("GET", "/CIRBA/api/ping")
        .with_status(200)
        .create_async()
        .await;
    let authorize = server
        .mock("POST", "/CIRBA/api/v2/authorize")
        .expect(0)
        .create_async()
        .await;

    let issued = t0() - Duration::minutes(4);
    let mut session = session_for(&server, Some(("tok-old", issued)));
    let outcome = session.ensure_session(t0()).await;

    assert!(matches!(outcome, SessionOutcome::Reused));
    assert_eq!(session.connection().token(), Some("tok-old"));
    authorize.assert_async().await;
}

#[tokio::test]
async fn test_reissues_a_token_at_five_minutes() {
    let mut server = Server::new_async().await;
    let _ping = server
        .mock("GET", "/CIRBA/api/ping")
        .with_status(200)
        .create_async()
        .await;
    let authorize = server
        .mock("POST", "/CIRBA/api/v2/authorize")
        .with_status(200)
        .with_body(json!({ "status": 200, "apiToken": "tok-new" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let issued = t0() - Duration::minutes(5);
    let mut session = session_for(&server, Some(("tok-old", issued)));
    let outcome = session.ensure_session(t0()).await;

    assert!(matches!(outcome, SessionOutcome::Reissued));
    assert_eq!(session.connection().token(), Some("tok-new"));
    authorize.assert_async().await;
}

#[tokio::test]
async fn test_fails_authorization_on_non_200() {
    let mut server = Server::new_async().await;
    let _ping = server
        .mock("GET", "/CIRBA/api/ping")
        .with_status(200)
        .create_async()
        .await;
    let _authorize = server
        .mock("POST", "/CIRBA/api/v2/authorize")
        .with_status(401)
        .create_async()
        .await;

    let mut session = session_for(&server, None);
    let outcome = session.ensure_session(t0()).await;

    assert!(matches!(
        outcome,
        SessionOutcome::Unreachable(ServiceError::AuthFailure(_))
    ));
    assert!(session.connection().session.is_none());
}

#[tokio::test]
async fn test_fails_authorization_on_error_status_in_body() {
    let mut server = Server::new_async().await;
    let _ping = server
        .mock("GET", "/CIRBA/api/ping")
        .with_status(200)
        .create_async()
        .await;
    let _authorize = server
        .mock("POST", "/CIRBA/api/v2/authorize")
        .with_status(200)
        .with_body(json!({ "status": 401, "message": "bad credentials" }).to_string())
        .create_async()
        .await;

    let mut session = session_for(&server, None);
    match session.ensure_session(t0()).await {
        SessionOutcome::Unreachable(ServiceError::AuthFailure(msg)) => {
            assert_eq!(msg, "bad credentials")
        }
        other => panic!("expected auth failure, got {:?}", other),
    }
}

// ─── Recommendation Client ──────────────────────────────────────────────────

async fn reused_session(server: &mut ServerGuard) -> (SessionManager, mockito::Mock) {
    let ping = server
        .mock("GET", "/CIRBA/api/ping")
        .with_status(200)
        .create_async()
        .await;
    let mut session = session_for(server, Some(("tok-1", t0())));
    assert!(matches!(
        session.ensure_session(t0()).await,
        SessionOutcome::Reused
    ));
    (session, ping)
}

#[tokio::test]
async fn test_fetches_recommendations_with_tags() {
    let mut server = Server::new_async().await;
    let (session, _ping) = reused_session(&mut server).await;

    let analysis = server
        .mock("GET", "/CIRBA/api/v2/analysis/cloud/aws")
        .match_query(Matcher::UrlEncoded(
            "analysisName".into(),
            "123456789012".into(),
        ))
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .with_body(json!([{ "analysisResults": "/analysis/cloud/aws/a1/results" }]).to_string())
        .create_async()
        .await;
    let _results = server
        .mock("GET", "/CIRBA/api/v2/analysis/cloud/aws/a1/results")
        .with_status(200)
        .with_body(
            json!([
                {
                    "entityId": "e-1",
                    "name": "vm-42",
                    "currentType": "m5.large",
                    "recommendedType": "m5.xlarge",
                    "implementationMethod": "Self Optimization",
                    "approvalType": "all",
                    "predictedUptime": 99.5,
                    "savingsEstimate": "12.25",
                    "region": "us-east-1"
                },
                "not a record"
            ])
            .to_string(),
        )
        .create_async()
        .await;
    let _tags = server
        .mock("GET", "/CIRBA/api/v2/systems/e-1")
        .with_status(200)
        .with_body(
            json!({
                "attributes": [
                    { "id": "attr_resource_tags", "value": "env:prod" },
                    { "id": "attr_other", "value": "ignored" },
                    { "id": "attr_resource_tags", "value": "team:core" },
                    { "id": "attr_resource_tags", "value": ["owner:ops", "tier:1"] }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let recommendations = match session.client().fetch_recommendations("123456789012").await {
        FetchOutcome::Available(recs) => recs,
        FetchOutcome::NotAvailable(reason) => panic!("not available: {}", reason),
    };

    // The malformed record is skipped
    assert_eq!(recommendations.len(), 1);
    let rec = &recommendations[0];
    assert_eq!(rec.name.as_deref(), Some("vm-42"));
    assert_eq!(rec.current_type, "m5.large");
    assert_eq!(rec.savings_estimate, 12.25);
    assert_eq!(
        rec.tags,
        vec!["env:prod", "team:core", "owner:ops", "tier:1"]
    );
    assert_eq!(rec.extra.get("region"), Some(&json!("us-east-1")));
    analysis.assert_async().await;
}

#[tokio::test]
async fn test_keeps_recommendations_when_tag_lookup_fails() {
    let mut server = Server::new_async().await;
    let (session, _ping) = reused_session(&mut server).await;

    let _analysis = server
        .mock("GET", "/CIRBA/api/v2/analysis/cloud/aws")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({ "analysisResults": "/results/a1" }).to_string())
        .create_async()
        .await;
    let _results = server
        .mock("GET", "/CIRBA/api/v2/results/a1")
        .with_status(200)
        .with_body(
            json!([{ "entityId": "e-9", "name": "vm-9", "currentType": "t3.small" }]).to_string(),
        )
        .create_async()
        .await;
    let _tags = server
        .mock("GET", "/CIRBA/api/v2/systems/e-9")
        .with_status(500)
        .create_async()
        .await;

    match session.client().fetch_recommendations("123456789012").await {
        FetchOutcome::Available(recs) => {
            assert_eq!(recs.len(), 1);
            assert!(recs[0].tags.is_empty());
            // Metrics the service omitted are unknown
            assert_eq!(recs[0].predicted_uptime, -1.0);
        }
        FetchOutcome::NotAvailable(reason) => panic!("not available: {}", reason),
    }
}

#[tokio::test]
async fn test_reports_not_available_for_missing_analysis() {
    let mut server = Server::new_async().await;
    let (session, _ping) = reused_session(&mut server).await;

    let _analysis = server
        .mock("GET", "/CIRBA/api/v2/analysis/cloud/aws")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    assert!(matches!(
        session.client().fetch_recommendations("123456789012").await,
        FetchOutcome::NotAvailable(_)
    ));
}

#[tokio::test]
async fn test_reports_not_available_for_error_flagged_analysis() {
    let mut server = Server::new_async().await;
    let (session, _ping) = reused_session(&mut server).await;

    let _analysis = server
        .mock("GET", "/CIRBA/api/v2/analysis/cloud/aws")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!([{ "ErrorMessage": "account not onboarded" }]).to_string())
        .create_async()
        .await;

    match session.client().fetch_recommendations("123456789012").await {
        FetchOutcome::NotAvailable(reason) => assert!(reason.contains("account not onboarded")),
        FetchOutcome::Available(_) => panic!("expected not available"),
    }
}

#[tokio::test]
async fn test_reports_not_available_for_empty_recommendation_list() {
    let mut server = Server::new_async().await;
    let (session, _ping) = reused_session(&mut server).await;

    let _analysis = server
        .mock("GET", "/CIRBA/api/v2/analysis/cloud/aws")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!([{ "analysisResults": "/results/a1" }]).to_string())
        .create_async()
        .await;
    let _results = server
        .mock("GET", "/CIRBA/api/v2/results/a1")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    assert!(matches!(
        session.client().fetch_recommendations("123456789012").await,
        FetchOutcome::NotAvailable(_)
    ));
}
