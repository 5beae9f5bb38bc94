use std::collections::BTreeMap;
use std::collections::btree_map;

use chrono::NaiveDate;

pub mod value;

/// Identifier a provider assigns to a city or terminal.
pub type PlaceId = i64;

/// A terminal or city at either end of an itinerary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
}

impl Place {
    pub fn new(id: PlaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Fares per bus deck. Single-deck services only carry the first floor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fares {
    pub first_floor: String,
    pub second_floor: Option<String>,
}

impl Fares {
    pub fn single(first_floor: impl Into<String>) -> Self {
        Self {
            first_floor: first_floor.into(),
            second_floor: None,
        }
    }

    pub fn double(first_floor: impl Into<String>, second_floor: impl Into<String>) -> Self {
        Self {
            first_floor: first_floor.into(),
            second_floor: Some(second_floor.into()),
        }
    }
}

/// One departure as normalised from any provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItineraryRecord {
    pub origin: Place,
    pub destination: Place,
    pub departure_time: String,
    pub service: String,
    pub fares: Fares,
    pub seats_with_zero_price: Option<String>,
}

/// Records grouped by travel date.
///
/// Entries only come into existence when a record is pushed, so every date
/// present maps to a non-empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateKeyedResults {
    by_date: BTreeMap<NaiveDate, Vec<ItineraryRecord>>,
}

impl DateKeyedResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record under `date`, creating the entry on first use.
    pub fn push(&mut self, date: NaiveDate, record: ItineraryRecord) {
        self.by_date.entry(date).or_default().push(record);
    }

    pub fn get(&self, date: NaiveDate) -> Option<&[ItineraryRecord]> {
        self.by_date.get(&date).map(Vec::as_slice)
    }

    /// Dates in ascending order together with their records.
    pub fn iter(&self) -> btree_map::Iter<'_, NaiveDate, Vec<ItineraryRecord>> {
        self.by_date.iter()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Number of dates holding at least one record.
    pub fn date_count(&self) -> usize {
        self.by_date.len()
    }

    pub fn record_count(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }
}

impl<'a> IntoIterator for &'a DateKeyedResults {
    type Item = (&'a NaiveDate, &'a Vec<ItineraryRecord>);
    type IntoIter = btree_map::Iter<'a, NaiveDate, Vec<ItineraryRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
