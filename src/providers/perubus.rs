//! Perubus: SOAP service. A `Login` call exchanges credentials for a token
//! that signs every later envelope; each operation returns a JSON document as
//! the text of its `<…Result>` element.

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::dates::{DAY_MONTH_YEAR, DateRange};
use crate::error::Result;
use crate::io::http;
use crate::io::soap::{self, SecurityHeader};
use crate::model::value::{display, lenient_id};
use crate::model::{DateKeyedResults, Fares, ItineraryRecord, Place, PlaceId};
use crate::providers::Integration;

const NAME: &str = "perubus";
const BASE_URL: &str = "PERUBUS_BASE_URL";
const USERNAME: &str = "PERUBUS_USERNAME";
const PASSWORD: &str = "PERUBUS_PASSWORD";

pub struct Perubus;

#[derive(Debug, Deserialize)]
struct Origin {
    #[serde(rename = "localidadOrigenID", default)]
    id: Value,
    denominacion: String,
}

#[derive(Debug, Deserialize)]
struct Destination {
    #[serde(rename = "localidadDestinoID", default)]
    id: Value,
    denominacion: String,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    #[serde(rename = "itinerarioID", default)]
    id: Value,
    #[serde(rename = "origenID", deserialize_with = "lenient_id")]
    origin_id: PlaceId,
    #[serde(rename = "Origen", default)]
    origin: String,
    #[serde(rename = "destinoID", deserialize_with = "lenient_id")]
    destination_id: PlaceId,
    #[serde(rename = "Destino", default)]
    destination: String,
    #[serde(rename = "servicio", default)]
    service: Option<String>,
    #[serde(rename = "tarifa", default)]
    fare: Value,
    #[serde(rename = "horaPartida", default)]
    departure_time: Option<String>,
}

/// A signed SOAP session against one endpoint.
struct SoapSession<'a> {
    client: &'a Client,
    endpoint: &'a str,
    header: SecurityHeader,
}

impl SoapSession<'_> {
    fn call(&self, operation: &str, params: &[(&str, &str)]) -> Result<Response> {
        let payload = soap::envelope(&self.header, operation, params)?;
        Ok(self
            .client
            .post(self.endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .body(payload)
            .send()?)
    }
}

impl Integration for Perubus {
    fn name(&self) -> &'static str {
        NAME
    }

    fn required_variables(&self) -> &'static [&'static str] {
        &[BASE_URL, USERNAME, PASSWORD]
    }

    #[instrument(level = "info", skip_all, fields(provider = NAME))]
    fn fetch(&self, config: &ProviderConfig, range: &DateRange) -> Result<DateKeyedResults> {
        let endpoint = config.get(BASE_URL)?;
        let client = http::client()?;
        let mut results = DateKeyedResults::new();

        info!("generating token");
        let login = SoapSession {
            client: &client,
            endpoint,
            header: SecurityHeader::credentials(config.get(USERNAME)?, config.get(PASSWORD)?),
        };
        let response = http::require(NAME, "token", login.call("Login", &[])?)?;
        let token = soap::operation_result(&response.text()?, "Login")?;
        info!("token generated");

        let session = SoapSession {
            client: &client,
            endpoint,
            header: SecurityHeader::token(token),
        };

        info!("checking departures");
        let response = http::require(NAME, "departures", session.call("getOrigen", &[])?)?;
        let origins: Vec<Origin> = json_result(&response.text()?, "getOrigen")?;
        info!(departures = origins.len(), "departures found");

        for origin in &origins {
            debug!(origin = %origin.denominacion, id = %origin.id, "checking arrivals");
            let response = session.call("getDestino", &[("origen", origin.denominacion.as_str())])?;
            let Some(response) = http::skip_on_failure(NAME, "arrivals", response) else {
                continue;
            };
            let destinations: Vec<Destination> = json_result(&response.text()?, "getDestino")?;
            if destinations.is_empty() {
                warn!(origin = %origin.denominacion, "no arrivals found");
                continue;
            }
            info!(origin = %origin.denominacion, arrivals = destinations.len(), "arrivals found");

            for destination in &destinations {
                debug!(
                    origin = %origin.denominacion,
                    destination = %destination.denominacion,
                    id = %destination.id,
                    "fetching itineraries"
                );

                for date in range.dates() {
                    let day = date.format(DAY_MONTH_YEAR).to_string();
                    let params = [
                        ("fechaPartida", day.as_str()),
                        ("fechaRetorno", ""),
                        ("origen", origin.denominacion.as_str()),
                        ("destino", destination.denominacion.as_str()),
                    ];
                    let response = session.call("getItinerario", &params)?;
                    let Some(response) = http::skip_on_failure(NAME, "itineraries", response) else {
                        continue;
                    };
                    let itineraries: Vec<Itinerary> =
                        json_result(&response.text()?, "getItinerario")?;
                    if itineraries.is_empty() {
                        warn!(date = %day, "no itineraries found");
                        continue;
                    }
                    info!(date = %day, count = itineraries.len(), "itineraries found");

                    for itinerary in itineraries {
                        results.push(date, map_itinerary(itinerary));
                    }
                }
            }
        }

        Ok(results)
    }
}

/// Decodes the JSON list carried by an operation result. Blank or `null`
/// results are treated as an empty list.
fn json_result<T: DeserializeOwned>(xml: &str, operation: &str) -> Result<Vec<T>> {
    let text = soap::operation_result(xml, operation)?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let items: Option<Vec<T>> = serde_json::from_str(&text)?;
    Ok(items.unwrap_or_default())
}

fn map_itinerary(itinerary: Itinerary) -> ItineraryRecord {
    let service = itinerary.service.unwrap_or_default();
    let fare = display(&itinerary.fare);
    debug!(itinerary = %itinerary.id, %service, %fare, "itinerary");

    ItineraryRecord {
        origin: Place::new(itinerary.origin_id, itinerary.origin),
        destination: Place::new(itinerary.destination_id, itinerary.destination),
        departure_time: itinerary.departure_time.unwrap_or_default(),
        service,
        fares: Fares::single(fare),
        seats_with_zero_price: None,
    }
}
