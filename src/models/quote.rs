use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use super::{leg::ItineraryLeg, new_id};
use crate::error::ValidationError;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Property,
    Activity,
    Flight,
    Transportation,
}

impl ItemKind {
    /// Accepts the singular or plural name used in routes and CSV files.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "property" | "properties" => Some(ItemKind::Property),
            "activity" | "activities" => Some(ItemKind::Activity),
            "flight" | "flights" => Some(ItemKind::Flight),
            "transportation" | "transport" | "transports" => Some(ItemKind::Transportation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Property => "property",
            ItemKind::Activity => "activity",
            ItemKind::Flight => "flight",
            ItemKind::Transportation => "transportation",
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Property {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "checkIn")]
    pub check_in: Option<NaiveDate>,
    #[serde(default, alias = "checkOut")]
    pub check_out: Option<NaiveDate>,
    /// Signed delta against the base quote.
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Legacy documents stored leg metadata as placeholder properties.
    #[serde(default, alias = "isPlaceholder", skip_serializing_if = "std::ops::Not::not")]
    pub is_placeholder: bool,
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Activity {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default = "default_pax")]
    pub pax: u32,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub cost_per_pax: Decimal,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub flat_price: Decimal,
    /// Snapshot of `cost_per_pax * pax + flat_price` taken when last quoted.
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub base_price: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub included_in_base: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_pax() -> u32 {
    1
}

impl Default for Activity {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            location: String::new(),
            date: None,
            time: None,
            duration: None,
            pax: default_pax(),
            cost_per_pax: Decimal::ZERO,
            flat_price: Decimal::ZERO,
            base_price: Decimal::ZERO,
            currency: String::new(),
            included_in_base: false,
            selected: false,
            description: None,
            images: Vec::new(),
        }
    }
}

impl Activity {
    /// Live price from the current pax count and rates.
    pub fn current_price(&self) -> Decimal {
        self.cost_per_pax * Decimal::from(self.pax) + self.flat_price
    }

    /// Freeze the current price as the quoted base.
    pub fn requote(&mut self) {
        self.base_price = self.current_price();
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlightType {
    #[default]
    Domestic,
    International,
}

impl FlightType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "domestic" => Some(FlightType::Domestic),
            "international" => Some(FlightType::International),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightType::Domestic => "domestic",
            FlightType::International => "international",
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Flight {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "flightType")]
    pub flight_type: FlightType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub price_if_selected: Decimal,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub price_if_not_selected: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    Car,
    Ferry,
    Bus,
    Driver,
}

impl TransportType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "car" => Some(TransportType::Car),
            "ferry" => Some(TransportType::Ferry),
            "bus" => Some(TransportType::Bus),
            "driver" => Some(TransportType::Driver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Car => "car",
            TransportType::Ferry => "ferry",
            TransportType::Bus => "bus",
            TransportType::Driver => "driver",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "transport_type", rename_all = "lowercase")]
pub enum TransportDetails {
    Car {
        #[serde(default)]
        pickup_location: String,
        pickup_date: Option<NaiveDate>,
        dropoff_location: Option<String>,
        dropoff_date: Option<NaiveDate>,
        vehicle: Option<String>,
    },
    Ferry {
        #[serde(default)]
        boarding_from: String,
        boarding_date: Option<NaiveDate>,
        arriving_at: Option<String>,
        operator: Option<String>,
    },
    Bus {
        #[serde(default)]
        boarding_from: String,
        boarding_date: Option<NaiveDate>,
        arriving_at: Option<String>,
        operator: Option<String>,
    },
    Driver {
        #[serde(default)]
        pickup_location: String,
        pickup_date: Option<NaiveDate>,
        dropoff_location: Option<String>,
        driver_name: Option<String>,
    },
}

impl TransportDetails {
    /// Fresh details of the given type anchored at `location`.
    pub fn new(
        transport_type: TransportType,
        location: String,
        date: Option<NaiveDate>,
        destination: Option<String>,
    ) -> Self {
        match transport_type {
            TransportType::Car => TransportDetails::Car {
                pickup_location: location,
                pickup_date: date,
                dropoff_location: destination,
                dropoff_date: None,
                vehicle: None,
            },
            TransportType::Driver => TransportDetails::Driver {
                pickup_location: location,
                pickup_date: date,
                dropoff_location: destination,
                driver_name: None,
            },
            TransportType::Ferry => TransportDetails::Ferry {
                boarding_from: location,
                boarding_date: date,
                arriving_at: destination,
                operator: None,
            },
            TransportType::Bus => TransportDetails::Bus {
                boarding_from: location,
                boarding_date: date,
                arriving_at: destination,
                operator: None,
            },
        }
    }
}

impl Default for TransportDetails {
    fn default() -> Self {
        TransportDetails::new(TransportType::Car, String::new(), None, None)
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Transportation {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub details: TransportDetails,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Transportation {
    pub fn transport_type(&self) -> TransportType {
        match self.details {
            TransportDetails::Car { .. } => TransportType::Car,
            TransportDetails::Ferry { .. } => TransportType::Ferry,
            TransportDetails::Bus { .. } => TransportType::Bus,
            TransportDetails::Driver { .. } => TransportType::Driver,
        }
    }

    /// Pickup point for cars and drivers, boarding point for ferries and buses.
    pub fn location(&self) -> &str {
        match &self.details {
            TransportDetails::Car { pickup_location, .. }
            | TransportDetails::Driver { pickup_location, .. } => pickup_location,
            TransportDetails::Ferry { boarding_from, .. }
            | TransportDetails::Bus { boarding_from, .. } => boarding_from,
        }
    }

    pub fn location_mut(&mut self) -> &mut String {
        match &mut self.details {
            TransportDetails::Car { pickup_location, .. }
            | TransportDetails::Driver { pickup_location, .. } => pickup_location,
            TransportDetails::Ferry { boarding_from, .. }
            | TransportDetails::Bus { boarding_from, .. } => boarding_from,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match &self.details {
            TransportDetails::Car { pickup_date, .. }
            | TransportDetails::Driver { pickup_date, .. } => *pickup_date,
            TransportDetails::Ferry { boarding_date, .. }
            | TransportDetails::Bus { boarding_date, .. } => *boarding_date,
        }
    }

    pub fn date_mut(&mut self) -> &mut Option<NaiveDate> {
        match &mut self.details {
            TransportDetails::Car { pickup_date, .. }
            | TransportDetails::Driver { pickup_date, .. } => pickup_date,
            TransportDetails::Ferry { boarding_date, .. }
            | TransportDetails::Bus { boarding_date, .. } => boarding_date,
        }
    }

    pub fn destination(&self) -> Option<&str> {
        match &self.details {
            TransportDetails::Car { dropoff_location, .. }
            | TransportDetails::Driver { dropoff_location, .. } => dropoff_location.as_deref(),
            TransportDetails::Ferry { arriving_at, .. }
            | TransportDetails::Bus { arriving_at, .. } => arriving_at.as_deref(),
        }
    }
}

/// The whole quote for one client, stored and saved as a single document.
#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ClientQuote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, alias = "baseQuote")]
    pub base_quote: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub legs: Vec<ItineraryLeg>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub flights: Vec<Flight>,
    #[serde(default)]
    pub transportation: Vec<Transportation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

impl ClientQuote {
    /// Check the fields an agent must fill in before a manual save.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        if !is_currency_code(&self.currency) {
            problems.push(format!("currency: '{}' is not a currency code", self.currency));
        }

        for (i, leg) in self.legs.iter().enumerate() {
            if leg.location.trim().is_empty() {
                problems.push(format!("legs[{i}]: location is required"));
            }
            if let (Some(check_in), Some(check_out)) = (leg.check_in, leg.check_out) {
                if check_out < check_in {
                    problems.push(format!("legs[{i}]: check_out is before check_in"));
                }
            }
        }

        for (i, property) in self.properties.iter().enumerate() {
            if property.name.trim().is_empty() && !property.is_placeholder {
                problems.push(format!("properties[{i}]: name is required"));
            }
            if property.location.trim().is_empty() {
                problems.push(format!("properties[{i}]: location is required"));
            }
            if let (Some(check_in), Some(check_out)) = (property.check_in, property.check_out) {
                if check_out < check_in {
                    problems.push(format!("properties[{i}]: check_out is before check_in"));
                }
            }
        }

        for (i, activity) in self.activities.iter().enumerate() {
            if activity.name.trim().is_empty() {
                problems.push(format!("activities[{i}]: name is required"));
            }
            if activity.location.trim().is_empty() {
                problems.push(format!("activities[{i}]: location is required"));
            }
            if activity.pax < 1 {
                problems.push(format!("activities[{i}]: pax must be at least 1"));
            }
        }

        for (i, flight) in self.flights.iter().enumerate() {
            if flight.name.trim().is_empty() {
                problems.push(format!("flights[{i}]: name is required"));
            }
        }

        for (i, transport) in self.transportation.iter().enumerate() {
            if transport.name.trim().is_empty() {
                problems.push(format!("transportation[{i}]: name is required"));
            }
            if transport.location().trim().is_empty() {
                problems.push(format!("transportation[{i}]: pickup location is required"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { problems })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_numbers_default_to_zero() {
        let quote: ClientQuote = serde_json::from_value(json!({
            "currency": "NZD",
            "baseQuote": null,
            "properties": [{ "id": "p1", "location": "Auckland", "price": null }],
            "activities": [{ "id": "a1", "location": "Auckland" }],
            "flights": [{ "id": "f1", "flight_type": "domestic" }]
        }))
        .unwrap();

        assert_eq!(quote.base_quote, Decimal::ZERO);
        assert_eq!(quote.properties[0].price, Decimal::ZERO);
        assert_eq!(quote.activities[0].pax, 1);
        assert_eq!(quote.activities[0].flat_price, Decimal::ZERO);
        assert_eq!(quote.flights[0].price_if_not_selected, Decimal::ZERO);
    }

    #[test]
    fn test_transportation_type_specific_fields() {
        let ferry: Transportation = serde_json::from_value(json!({
            "id": "t1",
            "name": "Waiheke ferry",
            "transport_type": "ferry",
            "boarding_from": "Auckland",
            "boarding_date": "2025-03-02",
            "arriving_at": "Waiheke",
            "price": 45,
            "selected": true
        }))
        .unwrap();

        assert_eq!(ferry.transport_type(), TransportType::Ferry);
        assert_eq!(ferry.location(), "Auckland");
        assert_eq!(ferry.destination(), Some("Waiheke"));
        assert_eq!(ferry.date(), NaiveDate::from_ymd_opt(2025, 3, 2));

        let value = serde_json::to_value(&ferry).unwrap();
        assert_eq!(value["transport_type"], "ferry");
        assert_eq!(value["boarding_from"], "Auckland");
    }

    #[test]
    fn test_validate_lists_every_problem() {
        let quote = ClientQuote {
            currency: "usd".to_string(),
            activities: vec![Activity {
                pax: 0,
                ..Default::default()
            }],
            ..Default::default()
        };

        let err = quote.validate().unwrap_err();
        assert_eq!(err.problems.len(), 4);
        assert!(err.problems[0].starts_with("currency"));
        assert!(err.problems.iter().any(|p| p.contains("pax must be at least 1")));
    }

    #[test]
    fn test_item_kind_parse() {
        assert_eq!(ItemKind::parse("Activities"), Some(ItemKind::Activity));
        assert_eq!(ItemKind::parse("transport"), Some(ItemKind::Transportation));
        assert_eq!(ItemKind::parse("cruise"), None);
    }
}
