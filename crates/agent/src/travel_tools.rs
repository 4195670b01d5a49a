//! Mock travel tools with canned inventory.
//!
//! Picks are keyed on a blake3 digest of the route or city, so the same
//! arguments always produce the same payload.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tripdesk_core::domain::tool::ToolName;

use crate::tools::{Tool, ToolRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FlightOption {
    pub flight_id: &'static str,
    pub airline: &'static str,
    pub price: u32,
    pub duration: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure: Option<&'static str>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HotelOption {
    pub hotel_id: &'static str,
    pub name: &'static str,
    pub price_per_night: u32,
    pub rating: f64,
}

const FLIGHTS: &[FlightOption] = &[
    FlightOption {
        flight_id: "FL001",
        airline: "SkyAir",
        price: 299,
        duration: "2h 15m",
        departure: Some("08:30"),
    },
    FlightOption {
        flight_id: "FL002",
        airline: "CloudJet",
        price: 389,
        duration: "2h 45m",
        departure: Some("14:20"),
    },
    FlightOption {
        flight_id: "FL003",
        airline: "AirExpress",
        price: 450,
        duration: "1h 50m",
        departure: Some("18:45"),
    },
    FlightOption {
        flight_id: "FL004",
        airline: "QuickFly",
        price: 325,
        duration: "3h 10m",
        departure: None,
    },
];

/// Options listed by a search. The fourth fare is only ever booked.
const SEARCHABLE_FLIGHTS: usize = 3;

const HOTELS: &[HotelOption] = &[
    HotelOption { hotel_id: "HT001", name: "Grand Plaza Hotel", price_per_night: 120, rating: 4.5 },
    HotelOption { hotel_id: "HT002", name: "City Center Inn", price_per_night: 89, rating: 4.2 },
    HotelOption { hotel_id: "HT003", name: "Luxury Suites", price_per_night: 250, rating: 4.8 },
    HotelOption { hotel_id: "HT004", name: "Budget Stay", price_per_night: 65, rating: 3.9 },
];

fn stable_index(key: &str, len: usize) -> usize {
    let digest = blake3::hash(key.as_bytes());
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    (u64::from_le_bytes(prefix) % len as u64) as usize
}

fn route_key(origin: &str, destination: &str) -> String {
    format!("{}_{}", origin.trim(), destination.trim()).to_lowercase()
}

/// Accepts a count or a numeric string.
fn parse_days(value: &Value) -> Option<u32> {
    let days = match value {
        Value::Number(number) => number.as_u64().and_then(|days| u32::try_from(days).ok()),
        Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    };
    days.filter(|days| *days > 0)
}

fn invalid_days(value: &Value) -> Value {
    let shown = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    json!({ "status": "error", "message": format!("Invalid number of days: {shown}") })
}

#[derive(Debug, Deserialize)]
struct FlightArgs {
    origin: String,
    destination: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct HotelSearchArgs {
    destination: String,
    days: Value,
}

#[derive(Debug, Deserialize)]
struct HotelBookingArgs {
    city: String,
    days: Value,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SearchFlights;

#[async_trait]
impl Tool for SearchFlights {
    fn name(&self) -> ToolName {
        ToolName::SearchFlights
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: FlightArgs =
            serde_json::from_value(input).context("search_flights arguments")?;
        let options = &FLIGHTS[..SEARCHABLE_FLIGHTS];
        Ok(json!({
            "status": "success",
            "route": format!("{} to {}", args.origin, args.destination),
            "date": args.date,
            "flight_options": options,
            "message": format!(
                "Found {} flights from {} to {} on {}",
                options.len(),
                args.origin,
                args.destination,
                args.date
            ),
        }))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BookFlight;

#[async_trait]
impl Tool for BookFlight {
    fn name(&self) -> ToolName {
        ToolName::BookFlight
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: FlightArgs = serde_json::from_value(input).context("book_flight arguments")?;
        let index = stable_index(&route_key(&args.origin, &args.destination), FLIGHTS.len());
        let flight = FLIGHTS[index];
        Ok(json!({
            "status": "success",
            "booking_id": format!("BK{}", index + 1000),
            "flight": {
                "origin": args.origin,
                "destination": args.destination,
                "date": args.date,
                "flight_id": flight.flight_id,
                "airline": flight.airline,
                "price": flight.price,
                "duration": flight.duration,
            },
            "message": format!(
                "Flight booked successfully from {} to {} on {}",
                args.origin, args.destination, args.date
            ),
        }))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SearchHotels;

#[async_trait]
impl Tool for SearchHotels {
    fn name(&self) -> ToolName {
        ToolName::SearchHotels
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: HotelSearchArgs =
            serde_json::from_value(input).context("search_hotels arguments")?;
        let Some(days) = parse_days(&args.days) else {
            return Ok(invalid_days(&args.days));
        };
        Ok(json!({
            "status": "success",
            "destination": args.destination,
            "days": days,
            "hotel_options": HOTELS,
            "message": format!(
                "Found {} hotels in {} for {} days",
                HOTELS.len(),
                args.destination,
                days
            ),
        }))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BookHotel;

#[async_trait]
impl Tool for BookHotel {
    fn name(&self) -> ToolName {
        ToolName::BookHotel
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: HotelBookingArgs =
            serde_json::from_value(input).context("book_hotel arguments")?;
        let Some(days) = parse_days(&args.days) else {
            return Ok(invalid_days(&args.days));
        };
        let index = stable_index(&args.city.trim().to_lowercase(), HOTELS.len());
        let hotel = HOTELS[index];
        Ok(json!({
            "status": "success",
            "booking_id": format!("HB{}", index + 2000),
            "hotel": {
                "city": args.city,
                "days": days,
                "total_price": hotel.price_per_night * days,
                "hotel_id": hotel.hotel_id,
                "name": hotel.name,
                "price_per_night": hotel.price_per_night,
                "rating": hotel.rating,
            },
            "message": format!("Hotel booked successfully in {} for {} days", args.city, days),
        }))
    }
}

/// Registry holding all four travel tools.
pub fn travel_registry(timeout: Duration) -> ToolRegistry {
    let mut registry = ToolRegistry::new(timeout);
    registry.register(SearchFlights);
    registry.register(BookFlight);
    registry.register(SearchHotels);
    registry.register(BookHotel);
    registry
}
