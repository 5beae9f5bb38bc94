//! Kronos: multipart form API keyed by a session id. Routes are every ordered
//! pair of the provider's domestic cities.

use reqwest::blocking::multipart::Form;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::dates::{DateRange, iso};
use crate::error::{Result, ToolError};
use crate::io::http;
use crate::model::value::{display, lenient_id};
use crate::model::{DateKeyedResults, Fares, ItineraryRecord, Place, PlaceId};
use crate::providers::Integration;

const NAME: &str = "kronos";
const BASE_URL: &str = "KRONOS_BASE_URL";
const USERNAME: &str = "KRONOS_USERNAME";
const PASSWORD: &str = "KRONOS_PASSWORD";

/// Only cities in this country are combined into routes.
const COUNTRY: &str = "Peru";

pub struct Kronos;

#[derive(Debug, Deserialize)]
struct Session {
    #[serde(default)]
    idsesion: Value,
}

#[derive(Debug, Deserialize)]
struct Cities {
    #[serde(default)]
    ciudades: Vec<City>,
}

#[derive(Debug, Clone, Deserialize)]
struct City {
    ciudad: String,
    #[serde(default)]
    pais: String,
    #[serde(deserialize_with = "lenient_id")]
    idciudad: PlaceId,
}

#[derive(Debug, Deserialize)]
struct Trips {
    #[serde(default)]
    viajes: Option<Vec<Trip>>,
}

#[derive(Debug, Deserialize)]
struct Trip {
    #[serde(default)]
    idcalendario: Value,
    #[serde(default)]
    tipobus: Option<String>,
    #[serde(default)]
    precio: Value,
    #[serde(default)]
    horasalida: Option<String>,
}

impl Integration for Kronos {
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

        info!("generating session");
        let form = Form::new()
            .text("usuario", config.get(USERNAME)?.to_string())
            .text("contrasena", config.get(PASSWORD)?.to_string());
        let response = client
            .post(format!("{base_url}/crearsesion"))
            .multipart(form)
            .send()?;
        let session: Session = http::require(NAME, "session", response)?.json()?;
        let session_id = match session.idsesion {
            Value::Null => {
                return Err(ToolError::MalformedResponse {
                    provider: NAME,
                    message: "login response has no idsesion".into(),
                });
            }
            other => display(&other),
        };
        info!("session generated");

        info!("checking cities");
        let response = client.get(format!("{base_url}/verciudades")).send()?;
        let cities: Cities = http::require(NAME, "cities", response)?.json()?;
        let cities: Vec<City> = cities
            .ciudades
            .into_iter()
            .filter(|city| city.pais == COUNTRY)
            .collect();
        if cities.is_empty() {
            warn!("no routes found");
            return Ok(results);
        }

        let pairs = ordered_pairs(&cities);
        info!(routes = pairs.len(), "routes found");

        for date in range.dates() {
            let day = iso(date);
            info!(date = %day, "checking date");

            for (origin, destination) in &pairs {
                debug!(origin = %origin.ciudad, destination = %destination.ciudad, "fetching itineraries");
                let form = Form::new()
                    .text("idsesion", session_id.clone())
                    .text("idorigen", origin.idciudad.to_string())
                    .text("iddestino", destination.idciudad.to_string())
                    .text("fecha", day.clone());
                let response = client
                    .post(format!("{base_url}/buscarutas/SOL"))
                    .multipart(form)
                    .send()?;
                let trips: Trips = http::require(NAME, "itineraries", response)?.json()?;

                let Some(trips) = trips.viajes else {
                    warn!(origin = %origin.ciudad, destination = %destination.ciudad, "no itineraries found");
                    continue;
                };
                info!(count = trips.len(), "itineraries found");

                for trip in trips {
                    let service = trip.tipobus.unwrap_or_default();
                    let fare = display(&trip.precio);
                    debug!(itinerary = %trip.idcalendario, %service, %fare, "itinerary");

                    results.push(
                        date,
                        ItineraryRecord {
                            origin: Place::new(origin.idciudad, origin.ciudad.clone()),
                            destination: Place::new(destination.idciudad, destination.ciudad.clone()),
                            departure_time: trip.horasalida.unwrap_or_default(),
                            service,
                            fares: Fares::single(fare),
                            seats_with_zero_price: None,
                        },
                    );
                }
            }
        }

        Ok(results)
    }
}

/// Every `(a, b)` with `a != b` by position, in row-major order.
fn ordered_pairs<T: Clone>(items: &[T]) -> Vec<(T, T)> {
    let mut pairs = Vec::with_capacity(items.len() * items.len().saturating_sub(1));
    for (i, first) in items.iter().enumerate() {
        for (j, second) in items.iter().enumerate() {
            if i != j {
                pairs.push((first.clone(), second.clone()));
            }
        }
    }
    pairs
}
