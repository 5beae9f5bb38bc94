//! Pidesoft: REST API authenticated with an `x-api-key` header.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::dates::{DateRange, iso};
use crate::error::Result;
use crate::io::http;
use crate::model::value::{display, lenient_id};
use crate::model::{DateKeyedResults, Fares, ItineraryRecord, Place, PlaceId};
use crate::providers::Integration;

const NAME: &str = "pidesoft";
const BASE_URL: &str = "PIDESOFT_BASE_URL";
const API_KEY: &str = "PIDESOFT_X_API_KEY";
const API_KEY_HEADER: &str = "x-api-key";

pub struct Pidesoft;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    origen: String,
    #[serde(default)]
    destino: String,
    #[serde(deserialize_with = "lenient_id")]
    origen_id: PlaceId,
    #[serde(deserialize_with = "lenient_id")]
    destino_id: PlaceId,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    #[serde(default)]
    ruta_id: Value,
    #[serde(deserialize_with = "lenient_id")]
    origen_id: PlaceId,
    #[serde(default)]
    origen: String,
    #[serde(deserialize_with = "lenient_id")]
    destino_id: PlaceId,
    #[serde(default)]
    destino: String,
    #[serde(default)]
    servicio: Option<String>,
    #[serde(default)]
    tarifa: Value,
    #[serde(default)]
    hora_partida: Option<String>,
}

impl Integration for Pidesoft {
    fn name(&self) -> &'static str {
        NAME
    }

    fn required_variables(&self) -> &'static [&'static str] {
        &[BASE_URL, API_KEY]
    }

    #[instrument(level = "info", skip_all, fields(provider = NAME))]
    fn fetch(&self, config: &ProviderConfig, range: &DateRange) -> Result<DateKeyedResults> {
        let base_url = config.base_url(BASE_URL)?;
        let api_key = config.get(API_KEY)?;
        let client = http::client()?;
        let mut results = DateKeyedResults::new();

        info!("checking routes");
        let response = client
            .get(format!("{base_url}/rutas"))
            .header(API_KEY_HEADER, api_key)
            .send()?;
        let routes: Envelope<Route> = http::require(NAME, "routes", response)?.json()?;
        info!(routes = routes.data.len(), "routes found");

        for route in &routes.data {
            debug!(origin = %route.origen, destination = %route.destino, "fetching itineraries");

            for date in range.dates() {
                let day = iso(date);
                let response = client
                    .get(format!("{base_url}/itinerarios"))
                    .header(API_KEY_HEADER, api_key)
                    .query(&[
                        ("origen_id", route.origen_id.to_string()),
                        ("destino_id", route.destino_id.to_string()),
                        ("fecha_partida", day.clone()),
                    ])
                    .send()?;
                let itineraries: Envelope<Itinerary> =
                    http::require(NAME, "itineraries", response)?.json()?;
                if itineraries.data.is_empty() {
                    warn!(origin = %route.origen, destination = %route.destino, date = %day, "no itineraries found");
                    continue;
                }
                info!(date = %day, count = itineraries.data.len(), "itineraries found");

                for itinerary in itineraries.data {
                    let service = itinerary.servicio.unwrap_or_default();
                    let fare = display(&itinerary.tarifa);
                    debug!(route = %itinerary.ruta_id, %service, %fare, "itinerary");

                    results.push(
                        date,
                        ItineraryRecord {
                            origin: Place::new(itinerary.origen_id, itinerary.origen),
                            destination: Place::new(itinerary.destino_id, itinerary.destino),
                            departure_time: itinerary.hora_partida.unwrap_or_default(),
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
