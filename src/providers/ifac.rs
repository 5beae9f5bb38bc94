//! IFAC: unauthenticated REST API exposing route pairs and per-day listings.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::dates::{DateRange, iso};
use crate::error::Result;
use crate::io::http;
use crate::model::value::{clock_time, display, lenient_id};
use crate::model::{DateKeyedResults, Fares, ItineraryRecord, Place, PlaceId};
use crate::providers::Integration;

const NAME: &str = "ifac";
const BASE_URL: &str = "IFAC_BASE_URL";

pub struct Ifac;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutePair {
    source_name: String,
    #[serde(deserialize_with = "lenient_id")]
    source_id: PlaceId,
    destination_name: String,
    #[serde(deserialize_with = "lenient_id")]
    destination_id: PlaceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Journey {
    #[serde(default)]
    journey_id: Value,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    fare: Value,
    #[serde(default)]
    boarding_points: Option<BoardingPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardingPoint {
    #[serde(default)]
    arrival_time: Option<String>,
}

impl Integration for Ifac {
    fn name(&self) -> &'static str {
        NAME
    }

    fn required_variables(&self) -> &'static [&'static str] {
        &[BASE_URL]
    }

    #[instrument(level = "info", skip_all, fields(provider = NAME))]
    fn fetch(&self, config: &ProviderConfig, range: &DateRange) -> Result<DateKeyedResults> {
        let base_url = config.base_url(BASE_URL)?;
        let client = http::client()?;
        let mut results = DateKeyedResults::new();

        info!("checking routes");
        let response = client
            .get(format!("{base_url}/SourceDestinationPairs"))
            .send()?;
        let routes: Vec<RoutePair> = http::require(NAME, "route list", response)?.json()?;
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
                    origin = %route.source_name,
                    destination = %route.destination_name,
                    "fetching itineraries"
                );
                let response = client
                    .get(format!(
                        "{base_url}/RouteListing/{}/{}/{day}",
                        route.source_id, route.destination_id
                    ))
                    .send()?;
                let Some(response) = http::skip_on_failure(NAME, "itineraries", response) else {
                    continue;
                };

                let journeys: Vec<Journey> = response.json()?;
                if journeys.is_empty() {
                    warn!(
                        origin = %route.source_name,
                        destination = %route.destination_name,
                        "no itineraries found"
                    );
                    continue;
                }
                info!(count = journeys.len(), "itineraries found");

                for journey in journeys {
                    let record = map_journey(route, journey);
                    results.push(date, record);
                }
            }
        }

        Ok(results)
    }
}

fn map_journey(route: &RoutePair, journey: Journey) -> ItineraryRecord {
    let service = journey.service.unwrap_or_default();
    let fare = display(&journey.fare);
    debug!(journey = %journey.journey_id, %service, %fare, "itinerary");

    let departure_time = journey
        .boarding_points
        .and_then(|point| point.arrival_time)
        .map(|time| clock_time(&time))
        .unwrap_or_default();

    ItineraryRecord {
        origin: Place::new(route.source_id, route.source_name.clone()),
        destination: Place::new(route.destination_id, route.destination_name.clone()),
        departure_time,
        service,
        fares: Fares::single(fare),
        seats_with_zero_price: None,
    }
}
