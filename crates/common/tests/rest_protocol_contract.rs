use folio_common::protocol::rest::{ALL_ROUTES, API_VERSION};

fn load_contract() -> serde_json::Value {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../contracts/rest-routes.json");
    let content = std::fs::read_to_string(path).expect("contract file should be readable");
    serde_json::from_str(&content).expect("contract file should be valid JSON")
}

#[test]
fn api_version_matches_contract() {
    let contract = load_contract();
    let expected = contract["api_version"].as_str().expect("api_version should be a string");
    assert_eq!(API_VERSION, expected);
}

#[test]
fn routes_match_contract() {
    let contract = load_contract();
    let expected: Vec<&str> = contract["routes"]
        .as_array()
        .expect("routes should be an array")
        .iter()
        .map(|route| route["path"].as_str().expect("route path should be a string"))
        .collect();
    assert_eq!(ALL_ROUTES, &expected[..]);
}

#[test]
fn every_versioned_route_carries_api_version_prefix() {
    let prefix = format!("/{API_VERSION}/");
    for route in ALL_ROUTES.iter().filter(|route| **route != "/healthz") {
        assert!(route.starts_with(&prefix), "route {route} should start with {prefix}");
    }
}
