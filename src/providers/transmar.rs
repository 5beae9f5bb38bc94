//! Transmar: one Basic-authenticated call lists every itinerary in the range;
//! each record carries its own departure date.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::dates::{DAY_MONTH_YEAR, DateRange, parse_day_month_year};
use crate::error::{Result, ToolError};
use crate::io::http;
use crate::model::value::{display, lenient_id};
use crate::model::{DateKeyedResults, Fares, ItineraryRecord, Place, PlaceId};
use crate::providers::Integration;

const NAME: &str = "transmar";
const BASE_URL: &str = "TRANSMAR_BASE_URL";
const USERNAME: &str = "TRANSMAR_USERNAME";
const PASSWORD: &str = "TRANSMAR_PASSWORD";

pub struct Transmar;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Itinerary {
    #[serde(default)]
    id: Value,
    ruta: Route,
    servicio: Service,
    #[serde(default)]
    tarifa_piso1: Value,
    #[serde(default)]
    tarifa_piso2: Value,
    fecha_partida: String,
    #[serde(default)]
    hora_partida: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Route {
    origen: Terminal,
    destino: Terminal,
}

#[derive(Debug, Deserialize)]
struct Terminal {
    #[serde(deserialize_with = "lenient_id")]
    id: PlaceId,
    #[serde(default)]
    denominacion: String,
}

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(default)]
    denominacion: String,
}

impl Integration for Transmar {
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

        let start = range.start().format(DAY_MONTH_YEAR).to_string();
        let end = range.end().format(DAY_MONTH_YEAR).to_string();
        info!(%start, %end, "checking itineraries");

        let response = client
            .get(format!("{base_url}/v1/listItinerariosAll"))
            .basic_auth(config.get(USERNAME)?, Some(config.get(PASSWORD)?))
            .query(&[("fechaInicio", start.as_str()), ("fechaFin", end.as_str())])
            .send()?;
        let itineraries: Vec<Itinerary> = http::require(NAME, "itineraries", response)?.json()?;
        if itineraries.is_empty() {
            warn!("no itineraries found");
            return Ok(results);
        }
        info!(count = itineraries.len(), "itineraries found");

        for itinerary in itineraries {
            let date = parse_day_month_year(&itinerary.fecha_partida).ok_or_else(|| {
                ToolError::MalformedResponse {
                    provider: NAME,
                    message: format!("invalid departure date '{}'", itinerary.fecha_partida),
                }
            })?;
            results.push(date, map_itinerary(itinerary));
        }

        Ok(results)
    }
}

fn map_itinerary(itinerary: Itinerary) -> ItineraryRecord {
    let Route { origen, destino } = itinerary.ruta;
    let first_floor = display(&itinerary.tarifa_piso1);
    let second_floor = display(&itinerary.tarifa_piso2);
    debug!(
        itinerary = %itinerary.id,
        origin = %origen.denominacion,
        destination = %destino.denominacion,
        service = %itinerary.servicio.denominacion,
        %first_floor,
        %second_floor,
        "itinerary"
    );

    ItineraryRecord {
        origin: Place::new(origen.id, origen.denominacion),
        destination: Place::new(destino.id, destino.denominacion),
        departure_time: itinerary.hora_partida.unwrap_or_default(),
        service: itinerary.servicio.denominacion,
        fares: Fares::double(first_floor, second_floor),
        seats_with_zero_price: None,
    }
}
