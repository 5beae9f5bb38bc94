//! Quatrobus: every call is a multipart POST carrying the account credentials
//! and a fresh random client id. Rejections come back as HTTP 200 with
//! `code: 443` in the body.

use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::blocking::multipart::Form;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::dates::{DateRange, iso};
use crate::error::{Result, ToolError};
use crate::io::http;
use crate::model::value::{clock_time, display, lenient_id};
use crate::model::{DateKeyedResults, Fares, ItineraryRecord, Place, PlaceId};
use crate::providers::Integration;

const NAME: &str = "quatrobus";
const BASE_URL: &str = "QUATROBUS_BASE_URL";
const USERNAME: &str = "QUATROBUS_USERNAME";
const PASSWORD: &str = "QUATROBUS_PASSWORD";

const REJECTED: i64 = 443;
const CID_LENGTH: usize = 20;
const FIRST_FLOOR: &str = "1er Piso";
const SECOND_FLOOR: &str = "2do Piso";

pub struct Quatrobus;

/// Envelope of every answer. `data` is only decoded once `code` is known
/// not to be a rejection, since rejections carry arbitrary payloads.
#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct Terminal {
    #[serde(deserialize_with = "lenient_id")]
    id: PlaceId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Default, Deserialize)]
struct Travels {
    #[serde(default)]
    ow: Vec<Travel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Travel {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    fare: Vec<FareGroup>,
    #[serde(default)]
    travel_service: Option<String>,
    #[serde(default)]
    travel_date_real: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FareGroup {
    #[serde(default)]
    price: Vec<DeckPrice>,
}

#[derive(Debug, Deserialize)]
struct DeckPrice {
    #[serde(default)]
    name: String,
    #[serde(default)]
    price: Value,
}

/// Credentials attached to every form.
struct Account<'a> {
    user_name: &'a str,
    password: &'a str,
}

impl Account<'_> {
    fn form(&self) -> Form {
        Form::new()
            .text("U_NAME", self.user_name.to_string())
            .text("U_PASSWORD", self.password.to_string())
            .text("CID", client_id())
    }
}

impl Integration for Quatrobus {
    fn name(&self) -> &'static str {
        NAME
    }

    fn required_variables(&self) -> &'static [&'static str] {
        &[BASE_URL, USERNAME, PASSWORD]
    }

    #[instrument(level = "info", skip_all, fields(provider = NAME))]
    fn fetch(&self, config: &ProviderConfig, range: &DateRange) -> Result<DateKeyedResults> {
        let base_url = config.base_url(BASE_URL)?;
        let account = Account {
            user_name: config.get(USERNAME)?,
            password: config.get(PASSWORD)?,
        };
        let client = http::client()?;
        let mut results = DateKeyedResults::new();

        info!("checking departures");
        let response = client
            .post(format!("{base_url}/getDepartures"))
            .multipart(account.form())
            .send()?;
        let reply: Reply = http::require(NAME, "departures", response)?.json()?;
        let departures: Vec<Terminal> = accepted(reply, "departures")?;
        info!(departures = departures.len(), "departures found");

        for departure in &departures {
            debug!(departure = %departure.name, "checking arrivals");
            let form = account.form().text("ID_DEPARTURE", departure.id.to_string());
            let response = client
                .post(format!("{base_url}/getArrivals"))
                .multipart(form)
                .send()?;
            let reply: Reply = http::require(NAME, "arrivals", response)?.json()?;
            let arrivals: Vec<Terminal> = accepted(reply, "arrivals")?;
            info!(departure = %departure.name, arrivals = arrivals.len(), "arrivals found");

            for arrival in &arrivals {
                debug!(origin = %departure.label, destination = %arrival.label, "fetching itineraries");

                for date in range.dates() {
                    let day = iso(date);
                    let form = account
                        .form()
                        .text("ID_DEPARTURE", departure.id.to_string())
                        .text("ID_ARRIVAL", arrival.id.to_string())
                        .text("DATE_DEPARTURE", day.clone());
                    let response = client
                        .post(format!("{base_url}/getTravels"))
                        .multipart(form)
                        .send()?;
                    let Some(response) = http::skip_on_failure(NAME, "itineraries", response) else {
                        continue;
                    };
                    let reply: Reply = response.json()?;
                    let travels = accepted::<Travels>(reply, "itineraries")?.ow;
                    if travels.is_empty() {
                        warn!(date = %day, "no itineraries found");
                        continue;
                    }
                    info!(date = %day, count = travels.len(), "itineraries found");

                    for travel in travels {
                        results.push(date, map_travel(departure, arrival, travel));
                    }
                }
            }
        }

        Ok(results)
    }
}

fn accepted<T: DeserializeOwned + Default>(reply: Reply, resource: &str) -> Result<T> {
    if reply.code == Some(REJECTED) {
        return Err(ToolError::ProviderRejected {
            provider: NAME,
            resource: resource.to_string(),
            code: REJECTED,
        });
    }
    if reply.data.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(reply.data)?)
}

fn map_travel(departure: &Terminal, arrival: &Terminal, travel: Travel) -> ItineraryRecord {
    let mut first_floor = String::new();
    let mut second_floor = String::new();
    for deck in travel.fare.iter().flat_map(|group| &group.price) {
        match deck.name.as_str() {
            FIRST_FLOOR => first_floor = display(&deck.price),
            SECOND_FLOOR => second_floor = display(&deck.price),
            _ => {}
        }
    }

    let service = travel.travel_service.unwrap_or_default();
    debug!(itinerary = %travel.id, %service, %first_floor, %second_floor, "itinerary");

    ItineraryRecord {
        origin: Place::new(departure.id, departure.label.clone()),
        destination: Place::new(arrival.id, arrival.label.clone()),
        departure_time: travel
            .travel_date_real
            .map(|stamp| clock_time(&stamp))
            .unwrap_or_default(),
        service,
        fares: Fares::double(first_floor, second_floor),
        seats_with_zero_price: None,
    }
}

/// Random alphanumeric id the API expects on every request.
fn client_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CID_LENGTH)
        .map(char::from)
        .collect()
}
