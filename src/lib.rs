//! Core library for the itinerary-tools command line applications.
//!
//! Each bus operator's booking API is wrapped by an integration under
//! [`providers`] that normalises its routes and fares into
//! [`model::ItineraryRecord`]s grouped by date. The [`runner`] drives
//! integrations one after another and hands their results to the
//! spreadsheet layout in [`export`], which [`io::excel_write`] renders. IO
//! adapters (HTTP, SOAP, Excel) live under [`io`]; [`scaffold`] backs the
//! `add-integration` developer tool.

pub mod config;
pub mod dates;
pub mod error;
pub mod export;
pub mod io;
pub mod logging;
pub mod model;
pub mod providers;
pub mod runner;
pub mod scaffold;

pub use error::{Result, ToolError};
