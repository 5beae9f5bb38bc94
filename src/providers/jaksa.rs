//! Jaksa: JSON REST API behind a bearer token obtained from a login call.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::dates::{DateRange, iso};
use crate::error::Result;
use crate::io::http;
use crate::model::value::{display, lenient_id};
use crate::model::{DateKeyedResults, Fares, ItineraryRecord, Place, PlaceId};
use crate::providers::Integration;

const NAME: &str = "jaksa";
const BASE_URL: &str = "JAKSA_BASE_URL";
const USERNAME: &str = "JAKSA_USERNAME";
const PASSWORD: &str = "JAKSA_PASSWORD";

pub struct Jaksa;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Session {
    token: String,
}

#[derive(Debug, Deserialize)]
struct RoutePair {
    origen: Terminal,
    destino: Terminal,
}

#[derive(Debug, Deserialize)]
struct Terminal {
    #[serde(deserialize_with = "lenient_id")]
    id: PlaceId,
    nombre: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Itinerary {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    nombre: Option<String>,
    #[serde(default)]
    hora_salida: Option<String>,
    #[serde(default)]
    asientos: Vec<Seat>,
}

#[derive(Debug, Deserialize)]
struct Seat {
    #[serde(default)]
    precio: Value,
}

impl Integration for Jaksa {
    fn name(&self) -> &'static str {
        NAME
    }

    fn required_variables(&self) -> &'static [&'static str] {
        &[BASE_URL, USERNAME, PASSWORD]
    }

    #[instrument(level = "info", skip_all, fields(provider = NAME))]
    fn fetch(&self, config: &ProviderConfig, range: &DateRange) -> Result<DateKeyedResults> {
        let base_url = config.base_url(BASE_URL)?;
        let client = http::client()?;
        let mut results = DateKeyedResults::new();

        info!("generating token");
        let response = client
            .post(format!("{base_url}/auth/login"))
            .json(&json!({
                "username": config.get(USERNAME)?,
                "password": config.get(PASSWORD)?,
            }))
            .send()?;
        let session: Envelope<Session> = http::require(NAME, "token", response)?.json()?;
        let token = session.data.token;
        info!("token generated");

        info!("checking routes");
        let response = client
            .get(format!("{base_url}/Route/Origen-Destino"))
            .bearer_auth(&token)
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("no routes found");
            return Ok(results);
        }
        let routes: Envelope<Vec<RoutePair>> = http::require(NAME, "routes", response)?.json()?;
        let routes = routes.data;
        if routes.is_empty() {
            warn!("no routes found");
            return Ok(results);
        }
        info!(routes = routes.len(), "routes found");

        for date in range.dates() {
            let day = iso(date);
            info!(date = %day, "checking date");

            for route in &routes {
                debug!(
                    origin = %route.origen.nombre,
                    destination = %route.destino.nombre,
                    "fetching itineraries"
                );
                let response = client
                    .get(format!(
                        "{base_url}/Itinerary/itinerarios-por-ruta/{}/{}/{day}",
                        route.origen.id, route.destino.id
                    ))
                    .bearer_auth(&token)
                    .send()?;
                if response.status() == StatusCode::NOT_FOUND {
                    warn!(
                        origin = %route.origen.nombre,
                        destination = %route.destino.nombre,
                        "no itineraries found"
                    );
                    continue;
                }
                let Some(response) = http::skip_on_failure(NAME, "itineraries", response) else {
                    continue;
                };

                let itineraries: Envelope<Vec<Itinerary>> = response.json()?;
                if itineraries.data.is_empty() {
                    warn!(
                        origin = %route.origen.nombre,
                        destination = %route.destino.nombre,
                        "no itineraries found"
                    );
                    continue;
                }
                info!(count = itineraries.data.len(), "itineraries found");

                for itinerary in itineraries.data {
                    results.push(date, map_itinerary(route, itinerary));
                }
            }
        }

        Ok(results)
    }
}

fn map_itinerary(route: &RoutePair, itinerary: Itinerary) -> ItineraryRecord {
    let prices = distinct_prices(&itinerary.asientos);
    let service = itinerary.nombre.unwrap_or_default();
    debug!(itinerary = %itinerary.id, %service, fares = %join(prices.iter().copied()), "itinerary");

    ItineraryRecord {
        origin: Place::new(route.origen.id, route.origen.nombre.clone()),
        destination: Place::new(route.destino.id, route.destino.nombre.clone()),
        departure_time: itinerary.hora_salida.unwrap_or_default(),
        service,
        fares: Fares::single(join(prices.iter().copied().filter(|price| *price > 0.0))),
        seats_with_zero_price: Some(join(prices.iter().copied().filter(|price| *price == 0.0))),
    }
}

/// Seat prices in first-seen order without repeats. Seats without a
/// numeric price are left out.
fn distinct_prices(seats: &[Seat]) -> Vec<f64> {
    let mut prices: Vec<f64> = Vec::new();
    for seat in seats {
        let Some(price) = seat_price(&seat.precio) else {
            debug!(price = %seat.precio, "ignoring seat without a numeric price");
            continue;
        };
        if !prices.contains(&price) {
            prices.push(price);
        }
    }
    prices
}

fn seat_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn join(prices: impl Iterator<Item = f64>) -> String {
    prices
        .map(|price| display(&json!(price)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn route() -> RoutePair {
        serde_json::from_value(json!({
            "origen": {"id": 1, "nombre": "Lima"},
            "destino": {"id": "4", "nombre": "Trujillo"}
        }))
        .unwrap()
    }

    #[test]
    fn seat_prices_split_into_fares_and_free_seats() {
        let itinerary: Itinerary = serde_json::from_value(json!({
            "id": 77,
            "nombre": "Cama",
            "horaSalida": "22:30",
            "asientos": [
                {"precio": 80}, {"precio": 0}, {"precio": 120.5},
                {"precio": 80}, {"precio": "0"}
            ]
        }))
        .unwrap();

        let record = map_itinerary(&route(), itinerary);
        assert_eq!(record.destination, Place::new(4, "Trujillo"));
        assert_eq!(record.fares.first_floor, "80, 120.5");
        assert_eq!(record.fares.second_floor, None);
        assert_eq!(record.seats_with_zero_price.as_deref(), Some("0"));
        assert_eq!(record.departure_time, "22:30");
    }

    #[test]
    fn itinerary_without_free_seats_leaves_column_blank() {
        let itinerary: Itinerary = serde_json::from_value(json!({
            "id": 78,
            "nombre": "Semi cama",
            "horaSalida": "10:00",
            "asientos": [{"precio": 60}]
        }))
        .unwrap();

        let record = map_itinerary(&route(), itinerary);
        assert_eq!(record.seats_with_zero_price.as_deref(), Some(""));
    }

    #[test]
    fn seats_without_numeric_price_are_ignored() {
        let itinerary: Itinerary = serde_json::from_value(json!({
            "id": 79,
            "nombre": "Cama",
            "horaSalida": "23:15",
            "asientos": [{"precio": null}, {"precio": "n/a"}, {"precio": 75}, {}]
        }))
        .unwrap();

        let record = map_itinerary(&route(), itinerary);
        assert_eq!(record.fares.first_floor, "75");
        assert_eq!(record.seats_with_zero_price.as_deref(), Some(""));
    }
}
