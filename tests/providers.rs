use chrono::NaiveDate;
use itinerary_tools::config::ProviderConfig;
use itinerary_tools::dates::DateRange;
use itinerary_tools::model::{DateKeyedResults, Fares, Place};
use itinerary_tools::providers;
use itinerary_tools::{Result, ToolError};
use quick_xml::escape::escape;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, day).expect("valid date")
}

/// Runs a blocking fetch off the async runtime that drives the mock server.
async fn fetch(name: &str, vars: Vec<(&'static str, String)>, range: DateRange) -> Result<DateKeyedResults> {
    let integration = providers::find(name).expect("registered integration");
    tokio::task::spawn_blocking(move || {
        let config = ProviderConfig::from_lookup(integration.required_variables(), |key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
        })?;
        integration.fetch(&config, &range)
    })
    .await
    .expect("fetch task completed")
}

#[tokio::test(flavor = "multi_thread")]
async fn ifac_collects_listings_and_skips_failed_routes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/SourceDestinationPairs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"sourceName": "Lima", "sourceId": 1, "destinationName": "Ica", "destinationId": "2"},
            {"sourceName": "Ica", "sourceId": 2, "destinationName": "Lima", "destinationId": 1}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/RouteListing/1/2/2025-01-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "journeyId": 10,
                "service": "Ejecutivo",
                "fare": 35.0,
                "boardingPoints": {"arrivalTime": "2025-01-02T21:30:00"}
            }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/RouteListing/2/1/2025-01-02"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let results = fetch(
        "ifac",
        vec![("IFAC_BASE_URL", format!("{}/", server.uri()))],
        DateRange::new(date(2), date(2)),
    )
    .await
    .expect("fetch succeeded");

    assert_eq!(results.record_count(), 1);
    let record = &results.get(date(2)).expect("records for the date")[0];
    assert_eq!(record.origin, Place::new(1, "Lima"));
    assert_eq!(record.destination, Place::new(2, "Ica"));
    assert_eq!(record.departure_time, "21:30");
    assert_eq!(record.service, "Ejecutivo");
    assert_eq!(record.fares, Fares::single("35"));
}

#[tokio::test(flavor = "multi_thread")]
async fn ifac_route_list_failure_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/SourceDestinationPairs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = fetch(
        "ifac",
        vec![("IFAC_BASE_URL", server.uri())],
        DateRange::new(date(2), date(3)),
    )
    .await;

    assert!(matches!(
        result,
        Err(ToolError::UnexpectedStatus { provider: "ifac", status: 503, .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn jaksa_uses_bearer_token_and_skips_missing_itineraries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"username": "agent", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"token": "tkn"}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Route/Origen-Destino"))
        .and(header("Authorization", "Bearer tkn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"origen": {"id": 1, "nombre": "Lima"}, "destino": {"id": 4, "nombre": "Trujillo"}},
            {"origen": {"id": 4, "nombre": "Trujillo"}, "destino": {"id": 1, "nombre": "Lima"}}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Itinerary/itinerarios-por-ruta/1/4/2025-01-06"))
        .and(header("Authorization", "Bearer tkn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{
            "id": 3,
            "nombre": "Cama",
            "horaSalida": "22:00",
            "asientos": [{"precio": 90}, {"precio": 0}, {"precio": 90}]
        }]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Itinerary/itinerarios-por-ruta/4/1/2025-01-06"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let results = fetch(
        "jaksa",
        vec![
            ("JAKSA_BASE_URL", server.uri()),
            ("JAKSA_USERNAME", "agent".into()),
            ("JAKSA_PASSWORD", "secret".into()),
        ],
        DateRange::new(date(6), date(6)),
    )
    .await
    .expect("fetch succeeded");

    assert_eq!(results.record_count(), 1);
    let record = &results.get(date(6)).expect("records for the date")[0];
    assert_eq!(record.origin, Place::new(1, "Lima"));
    assert_eq!(record.fares, Fares::single("90"));
    assert_eq!(record.seats_with_zero_price.as_deref(), Some("0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn jaksa_without_routes_yields_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"token": "tkn"}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Route/Origen-Destino"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let results = fetch(
        "jaksa",
        vec![
            ("JAKSA_BASE_URL", server.uri()),
            ("JAKSA_USERNAME", "agent".into()),
            ("JAKSA_PASSWORD", "secret".into()),
        ],
        DateRange::new(date(6), date(8)),
    )
    .await
    .expect("fetch succeeded");

    assert!(results.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn jaksa_login_failure_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = fetch(
        "jaksa",
        vec![
            ("JAKSA_BASE_URL", server.uri()),
            ("JAKSA_USERNAME", "agent".into()),
            ("JAKSA_PASSWORD", "wrong".into()),
        ],
        DateRange::new(date(6), date(6)),
    )
    .await;

    assert!(matches!(
        result,
        Err(ToolError::UnexpectedStatus { provider: "jaksa", status: 401, .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn kronos_pairs_domestic_cities_and_sends_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/crearsesion"))
        .and(body_string_contains("kron-user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"idsesion": 987})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/verciudades"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ciudades": [
            {"ciudad": "Lima", "pais": "Peru", "idciudad": 1},
            {"ciudad": "La Paz", "pais": "Bolivia", "idciudad": 7},
            {"ciudad": "Tacna", "pais": "Peru", "idciudad": "3"}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/buscarutas/SOL"))
        .and(body_string_contains("987"))
        .and(body_string_contains("2025-01-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"viajes": [
            {"idcalendario": 1, "tipobus": "Semi cama", "precio": "60.00", "horasalida": "07:30"}
        ]})))
        .expect(2)
        .mount(&server)
        .await;

    let results = fetch(
        "kronos",
        vec![
            ("KRONOS_BASE_URL", server.uri()),
            ("KRONOS_USERNAME", "kron-user".into()),
            ("KRONOS_PASSWORD", "secret".into()),
        ],
        DateRange::new(date(10), date(10)),
    )
    .await
    .expect("fetch succeeded");

    let records = results.get(date(10)).expect("records for the date");
    let routes: Vec<(i64, i64)> = records
        .iter()
        .map(|record| (record.origin.id, record.destination.id))
        .collect();
    assert_eq!(routes, [(1, 3), (3, 1)]);
    assert_eq!(records[0].fares, Fares::single("60.00"));
    assert_eq!(records[0].service, "Semi cama");
    assert_eq!(records[0].departure_time, "07:30");
}

fn soap_reply(operation: &str, result: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><{operation}Response xmlns="http://tempuri.org/"><{operation}Result>{}</{operation}Result></{operation}Response></soap:Body></soap:Envelope>"#,
        escape(result)
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn perubus_logs_in_and_walks_origins_and_destinations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/service.svc"))
        .and(body_string_contains("tem:Login"))
        .and(body_string_contains("soap-user"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_reply("Login", "tok-1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/service.svc"))
        .and(body_string_contains("tem:getOrigen"))
        .and(body_string_contains("tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_reply(
            "getOrigen",
            r#"[{"localidadOrigenID": 1, "denominacion": "LIMA"}]"#,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/service.svc"))
        .and(body_string_contains("tem:getDestino"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_reply(
            "getDestino",
            r#"[{"localidadDestinoID": 5, "denominacion": "PIURA"}]"#,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/service.svc"))
        .and(body_string_contains("tem:getItinerario"))
        .and(body_string_contains("20/01/2025"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_reply(
            "getItinerario",
            r#"[{"itinerarioID": 8, "origenID": 1, "Origen": "LIMA", "destinoID": "5",
                 "Destino": "PIURA", "servicio": "Royal", "tarifa": 110, "horaPartida": "18:00"}]"#,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/service.svc"))
        .and(body_string_contains("tem:getItinerario"))
        .and(body_string_contains("21/01/2025"))
        .respond_with(ResponseTemplate::new(200).set_body_string(soap_reply("getItinerario", "null")))
        .mount(&server)
        .await;

    let results = fetch(
        "perubus",
        vec![
            ("PERUBUS_BASE_URL", format!("{}/service.svc", server.uri())),
            ("PERUBUS_USERNAME", "soap-user".into()),
            ("PERUBUS_PASSWORD", "secret".into()),
        ],
        DateRange::new(date(20), date(21)),
    )
    .await
    .expect("fetch succeeded");

    assert_eq!(results.dates().collect::<Vec<_>>(), [date(20)]);
    let record = &results.get(date(20)).expect("records for the date")[0];
    assert_eq!(record.origin, Place::new(1, "LIMA"));
    assert_eq!(record.destination, Place::new(5, "PIURA"));
    assert_eq!(record.service, "Royal");
    assert_eq!(record.fares, Fares::single("110"));
    assert_eq!(record.departure_time, "18:00");
}

#[tokio::test(flavor = "multi_thread")]
async fn pidesoft_queries_every_date_with_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rutas"))
        .and(header("x-api-key", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"origen": "Lima", "destino": "Huaraz", "origen_id": 1, "destino_id": 9}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/itinerarios"))
        .and(header("x-api-key", "key-1"))
        .and(query_param("origen_id", "1"))
        .and(query_param("destino_id", "9"))
        .and(query_param("fecha_partida", "2025-01-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{
            "ruta_id": 4, "origen_id": 1, "origen": "Lima", "destino_id": 9, "destino": "Huaraz",
            "servicio": "Dorado", "tarifa": 70.5, "hora_partida": "23:00"
        }]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/itinerarios"))
        .and(query_param("fecha_partida", "2025-01-03"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let results = fetch(
        "pidesoft",
        vec![
            ("PIDESOFT_BASE_URL", server.uri()),
            ("PIDESOFT_X_API_KEY", "key-1".into()),
        ],
        DateRange::new(date(2), date(3)),
    )
    .await
    .expect("fetch succeeded");

    assert_eq!(results.dates().collect::<Vec<_>>(), [date(2)]);
    let record = &results.get(date(2)).expect("records for the date")[0];
    assert_eq!(record.destination, Place::new(9, "Huaraz"));
    assert_eq!(record.fares, Fares::single("70.5"));
}

#[tokio::test(flavor = "multi_thread")]
async fn pidesoft_itinerary_failure_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rutas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"origen": "Lima", "destino": "Huaraz", "origen_id": 1, "destino_id": 9}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/itinerarios"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = fetch(
        "pidesoft",
        vec![
            ("PIDESOFT_BASE_URL", server.uri()),
            ("PIDESOFT_X_API_KEY", "key-1".into()),
        ],
        DateRange::new(date(2), date(2)),
    )
    .await;

    assert!(matches!(
        result,
        Err(ToolError::UnexpectedStatus { provider: "pidesoft", status: 500, .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn quatrobus_maps_deck_prices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/getDepartures"))
        .and(body_string_contains("U_NAME"))
        .and(body_string_contains("quatro-user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": [{"id": 1, "name": "LIM", "label": "Lima"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/getArrivals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": [{"id": "6", "name": "CUZ", "label": "Cusco"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/getTravels"))
        .and(body_string_contains("2025-01-04"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {"ow": [{
                "id": 11,
                "travelService": "Presidencial",
                "travelDateReal": "2025-01-04 19:10:00",
                "fare": [{"price": [
                    {"name": "1er Piso", "price": 180},
                    {"name": "2do Piso", "price": 140}
                ]}]
            }]}
        })))
        .mount(&server)
        .await;

    let results = fetch(
        "quatrobus",
        vec![
            ("QUATROBUS_BASE_URL", server.uri()),
            ("QUATROBUS_USERNAME", "quatro-user".into()),
            ("QUATROBUS_PASSWORD", "secret".into()),
        ],
        DateRange::new(date(4), date(4)),
    )
    .await
    .expect("fetch succeeded");

    let record = &results.get(date(4)).expect("records for the date")[0];
    assert_eq!(record.origin, Place::new(1, "Lima"));
    assert_eq!(record.destination, Place::new(6, "Cusco"));
    assert_eq!(record.departure_time, "19:10");
    assert_eq!(record.service, "Presidencial");
    assert_eq!(record.fares, Fares::double("180", "140"));
}

#[tokio::test(flavor = "multi_thread")]
async fn quatrobus_rejection_code_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/getDepartures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 443, "data": null})))
        .mount(&server)
        .await;

    let result = fetch(
        "quatrobus",
        vec![
            ("QUATROBUS_BASE_URL", server.uri()),
            ("QUATROBUS_USERNAME", "quatro-user".into()),
            ("QUATROBUS_PASSWORD", "wrong".into()),
        ],
        DateRange::new(date(4), date(4)),
    )
    .await;

    assert!(matches!(
        result,
        Err(ToolError::ProviderRejected { provider: "quatrobus", code: 443, .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn quatrobus_rejection_with_message_payload_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/getDepartures"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 443, "data": "credenciales inválidas"})),
        )
        .mount(&server)
        .await;

    let result = fetch(
        "quatrobus",
        vec![
            ("QUATROBUS_BASE_URL", server.uri()),
            ("QUATROBUS_USERNAME", "quatro-user".into()),
            ("QUATROBUS_PASSWORD", "wrong".into()),
        ],
        DateRange::new(date(4), date(4)),
    )
    .await;

    assert!(matches!(
        result,
        Err(ToolError::ProviderRejected { provider: "quatrobus", code: 443, .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn transmar_groups_by_departure_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/listItinerariosAll"))
        .and(header("Authorization", "Basic dXNlcjpzZWNyZXQ="))
        .and(query_param("fechaInicio", "01/01/2025"))
        .and(query_param("fechaFin", "03/01/2025"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 1,
                "ruta": {
                    "origen": {"id": 1, "denominacion": "Lima"},
                    "destino": {"id": 2, "denominacion": "Chiclayo"}
                },
                "servicio": {"denominacion": "Bus Cama"},
                "tarifaPiso1": 95,
                "tarifaPiso2": 75.0,
                "fechaPartida": "03/01/2025",
                "horaPartida": "20:00"
            },
            {
                "id": 2,
                "ruta": {
                    "origen": {"id": 2, "denominacion": "Chiclayo"},
                    "destino": {"id": 1, "denominacion": "Lima"}
                },
                "servicio": {"denominacion": "Económico"},
                "tarifaPiso1": "50",
                "tarifaPiso2": null,
                "fechaPartida": "01/01/2025",
                "horaPartida": "09:45"
            }
        ])))
        .mount(&server)
        .await;

    let results = fetch(
        "transmar",
        vec![
            ("TRANSMAR_BASE_URL", server.uri()),
            ("TRANSMAR_USERNAME", "user".into()),
            ("TRANSMAR_PASSWORD", "secret".into()),
        ],
        DateRange::new(date(1), date(3)),
    )
    .await
    .expect("fetch succeeded");

    assert_eq!(results.dates().collect::<Vec<_>>(), [date(1), date(3)]);
    let late = &results.get(date(3)).expect("records for the 3rd")[0];
    assert_eq!(late.fares, Fares::double("95", "75"));
    assert_eq!(late.departure_time, "20:00");
    let early = &results.get(date(1)).expect("records for the 1st")[0];
    assert_eq!(early.service, "Económico");
    assert_eq!(early.fares, Fares::double("50", ""));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_variable_stops_before_any_request() {
    let server = MockServer::start().await;

    let result = fetch(
        "transmar",
        vec![("TRANSMAR_BASE_URL", server.uri()), ("TRANSMAR_USERNAME", "user".into())],
        DateRange::new(date(1), date(3)),
    )
    .await;

    assert!(matches!(result, Err(ToolError::MissingVariable(name)) if name == "TRANSMAR_PASSWORD"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
