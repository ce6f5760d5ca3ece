#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use snowday_engine::{
    CalculateRequest, CautionLevel, ClosureOutlook, ForecastSource, Orchestrator, SchoolType,
    VoteChoice, VoteStatus, VoteStore,
};
use snowday_store::{KeyValueStore, SqliteStore};
use snowday_weather::{ForecastCache, OpenMeteoClient, RetryConfig, ZippopotamGeocoder};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_services(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/us/05401"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "post code": "05401",
            "places": [{
                "place name": "Burlington",
                "state abbreviation": "VT",
                "latitude": "44.4759",
                "longitude": "-73.2121"
            }]
        })))
        .mount(server)
        .await;

    // Raw units: snowfall is divided by 10, wind arrives in m/s.
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("forecast_hours", "24"))
        .and(query_param("wind_speed_unit", "ms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hourly": {
                "temperature_2m": vec![-5.0; 24],
                "snowfall": vec![80.0; 24],
                "precipitation_probability": vec![60.0; 24],
                "wind_speed_10m": vec![8.5; 24]
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn public_standard(location: &str) -> CalculateRequest {
    CalculateRequest::automatic(location, SchoolType::Public, CautionLevel::Standard)
}

fn orchestrator(server: &MockServer, store: Arc<dyn KeyValueStore>) -> Orchestrator {
    let geocoder =
        ZippopotamGeocoder::with_base_url(&server.uri(), "us", RetryConfig::none()).unwrap();
    let forecast = OpenMeteoClient::with_base_url(&server.uri(), RetryConfig::none()).unwrap();
    Orchestrator::new(Arc::new(geocoder), Arc::new(forecast), ForecastCache::new(store))
}

#[tokio::test]
async fn test_live_forecast_through_real_adapters() {
    let server = MockServer::start().await;
    mount_services(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> =
        Arc::new(SqliteStore::open(dir.path().join("snowday.db")).unwrap());
    let orch = orchestrator(&server, store.clone());

    let prediction = orch.calculate(public_standard("05401")).await.unwrap();

    // 8 cm, -5 C, 60 %, 30.6 km/h
    assert_eq!(prediction.source, ForecastSource::Live);
    assert!(prediction.hourly.iter().all(|&p| p == 87));
    assert_eq!(prediction.headline, 87);
    assert_eq!(prediction.outlook, ClosureOutlook::VeryLikely);
    assert_eq!(prediction.contributions.snowfall, 50.0);
    assert_eq!(prediction.contributions.wind, 5.0);

    // Served from the persisted cache by a fresh session; the mock expects one fetch.
    let again = orchestrator(&server, store)
        .calculate(public_standard("05401"))
        .await
        .unwrap();
    assert_eq!(again.source, ForecastSource::Cache);
    assert_eq!(again.headline, 87);
}

#[tokio::test]
async fn test_vote_after_prediction_persists_across_reopen() {
    let server = MockServer::start().await;
    mount_services(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("snowday.db");

    {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&db).unwrap());
        let orch = orchestrator(&server, store.clone());
        orch.calculate(public_standard("05401")).await.unwrap();
        assert!(orch.can_vote());

        let votes = VoteStore::new(store);
        assert_eq!(votes.vote("05401", VoteChoice::Closes).status, VoteStatus::Counted);
        assert_eq!(
            votes.vote("05401", VoteChoice::Closes).status,
            VoteStatus::AlreadyVoted
        );
    }

    let votes = VoteStore::new(Arc::new(SqliteStore::open(&db).unwrap()));
    let tally = votes.get_tally("05401");
    assert_eq!((tally.closes, tally.opens), (1, 0));
    assert!(votes.has_voted("05401"));
}
