//! Bulk CSV import and export of quote items.
//!
//! Each item kind has a fixed set of required columns. A file missing any of
//! them is rejected as a whole. Within a valid file, rows that fail to parse
//! are skipped and reported by line number while the rest are imported.

use std::collections::HashMap;

use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    error::ImportFormatError,
    models::{
        new_id,
        quote::{
            Activity, ClientQuote, Flight, FlightType, ItemKind, Property, TransportDetails,
            TransportType, Transportation,
        },
    },
};

pub const ACTIVITY_COLUMNS: &[&str] = &[
    "name",
    "location",
    "duration",
    "pax",
    "cost_per_pax",
    "currency",
    "images",
];
const ACTIVITY_OPTIONAL: &[&str] = &[
    "date",
    "time",
    "flat_price",
    "included_in_base",
    "selected",
    "description",
];

pub const PROPERTY_COLUMNS: &[&str] = &["name", "location", "check_in", "check_out", "price", "currency"];
const PROPERTY_OPTIONAL: &[&str] = &["selected", "room_type", "url", "images", "notes"];

pub const FLIGHT_COLUMNS: &[&str] = &[
    "name",
    "flight_type",
    "price_if_selected",
    "price_if_not_selected",
    "currency",
];
const FLIGHT_OPTIONAL: &[&str] = &["airline", "departure", "arrival", "selected"];

pub const TRANSPORT_COLUMNS: &[&str] = &["name", "transport_type", "location", "price", "currency"];
const TRANSPORT_OPTIONAL: &[&str] = &["date", "destination", "selected", "notes"];

const IMAGE_SEPARATOR: char = '|';

pub fn required_columns(kind: ItemKind) -> &'static [&'static str] {
    match kind {
        ItemKind::Property => PROPERTY_COLUMNS,
        ItemKind::Activity => ACTIVITY_COLUMNS,
        ItemKind::Flight => FLIGHT_COLUMNS,
        ItemKind::Transportation => TRANSPORT_COLUMNS,
    }
}

fn optional_columns(kind: ItemKind) -> &'static [&'static str] {
    match kind {
        ItemKind::Property => PROPERTY_OPTIONAL,
        ItemKind::Activity => ACTIVITY_OPTIONAL,
        ItemKind::Flight => FLIGHT_OPTIONAL,
        ItemKind::Transportation => TRANSPORT_OPTIONAL,
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RowProblem {
    pub line: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportedItems {
    Properties(Vec<Property>),
    Activities(Vec<Activity>),
    Flights(Vec<Flight>),
    Transportation(Vec<Transportation>),
}

impl ImportedItems {
    pub fn len(&self) -> usize {
        match self {
            ImportedItems::Properties(items) => items.len(),
            ImportedItems::Activities(items) => items.len(),
            ImportedItems::Flights(items) => items.len(),
            ImportedItems::Transportation(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append the imported items to the quote, returning how many were added.
    pub fn append_to(self, quote: &mut ClientQuote) -> usize {
        let count = self.len();
        match self {
            ImportedItems::Properties(items) => quote.properties.extend(items),
            ImportedItems::Activities(items) => quote.activities.extend(items),
            ImportedItems::Flights(items) => quote.flights.extend(items),
            ImportedItems::Transportation(items) => quote.transportation.extend(items),
        }
        count
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub items: ImportedItems,
    pub skipped: Vec<RowProblem>,
}

struct Row<'a> {
    record: &'a StringRecord,
    columns: &'a HashMap<String, usize>,
}

impl<'a> Row<'a> {
    fn text(&self, column: &str) -> Option<&'a str> {
        self.columns
            .get(column)
            .and_then(|&i| self.record.get(i))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn required(&self, column: &str) -> Result<&'a str, String> {
        self.text(column).ok_or_else(|| format!("{column} is required"))
    }

    fn owned(&self, column: &str) -> Option<String> {
        self.text(column).map(str::to_string)
    }

    fn decimal(&self, column: &str) -> Result<Option<Decimal>, String> {
        self.text(column)
            .map(|value| {
                value
                    .trim_start_matches('$')
                    .replace(',', "")
                    .parse::<Decimal>()
                    .map_err(|_| format!("{column}: '{value}' is not a number"))
            })
            .transpose()
    }

    fn required_decimal(&self, column: &str) -> Result<Decimal, String> {
        self.decimal(column)?
            .ok_or_else(|| format!("{column} is required"))
    }

    fn boolean(&self, column: &str) -> Result<Option<bool>, String> {
        self.text(column)
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(true),
                "false" | "no" | "n" | "0" => Ok(false),
                _ => Err(format!("{column}: '{value}' is not true/false")),
            })
            .transpose()
    }

    fn date(&self, column: &str) -> Result<Option<NaiveDate>, String> {
        self.text(column)
            .map(|value| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| format!("{column}: '{value}' is not a YYYY-MM-DD date"))
            })
            .transpose()
    }

    fn currency(&self, fallback: &str) -> String {
        self.text("currency")
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn images(&self) -> Vec<String> {
        self.text("images")
            .map(|value| {
                value
                    .split(IMAGE_SEPARATOR)
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_property(row: &Row, currency: &str) -> Result<Property, String> {
    Ok(Property {
        id: new_id(),
        name: row.required("name")?.to_string(),
        location: row.required("location")?.to_string(),
        check_in: row.date("check_in")?,
        check_out: row.date("check_out")?,
        price: row.required_decimal("price")?,
        currency: row.currency(currency),
        selected: row.boolean("selected")?.unwrap_or(false),
        room_type: row.owned("room_type"),
        url: row.owned("url"),
        images: row.images(),
        notes: row.owned("notes"),
        is_placeholder: false,
    })
}

fn parse_activity(row: &Row, currency: &str) -> Result<Activity, String> {
    let pax_text = row.required("pax")?;
    let pax: u32 = pax_text
        .parse()
        .map_err(|_| format!("pax: '{pax_text}' is not a whole number"))?;
    if pax < 1 {
        return Err("pax must be at least 1".to_string());
    }

    let included_in_base = row.boolean("included_in_base")?.unwrap_or(false);

    let mut activity = Activity {
        id: new_id(),
        name: row.required("name")?.to_string(),
        location: row.required("location")?.to_string(),
        date: row.date("date")?,
        time: row.owned("time"),
        duration: row.owned("duration"),
        pax,
        cost_per_pax: row.required_decimal("cost_per_pax")?,
        flat_price: row.decimal("flat_price")?.unwrap_or(Decimal::ZERO),
        base_price: Decimal::ZERO,
        currency: row.currency(currency),
        included_in_base,
        selected: row.boolean("selected")?.unwrap_or(included_in_base),
        description: row.owned("description"),
        images: row.images(),
    };
    activity.requote();
    Ok(activity)
}

fn parse_flight(row: &Row, currency: &str) -> Result<Flight, String> {
    let type_text = row.required("flight_type")?;
    let flight_type = FlightType::parse(type_text)
        .ok_or_else(|| format!("flight_type: '{type_text}' is not domestic or international"))?;

    Ok(Flight {
        id: new_id(),
        name: row.required("name")?.to_string(),
        flight_type,
        airline: row.owned("airline"),
        departure: row.owned("departure"),
        arrival: row.owned("arrival"),
        price_if_selected: row.decimal("price_if_selected")?.unwrap_or(Decimal::ZERO),
        price_if_not_selected: row.decimal("price_if_not_selected")?.unwrap_or(Decimal::ZERO),
        currency: row.currency(currency),
        selected: row.boolean("selected")?.unwrap_or(false),
    })
}

fn parse_transport(row: &Row, currency: &str) -> Result<Transportation, String> {
    let type_text = row.required("transport_type")?;
    let transport_type = TransportType::parse(type_text)
        .ok_or_else(|| format!("transport_type: '{type_text}' is not car, ferry, bus or driver"))?;

    Ok(Transportation {
        id: new_id(),
        name: row.required("name")?.to_string(),
        details: TransportDetails::new(
            transport_type,
            row.required("location")?.to_string(),
            row.date("date")?,
            row.owned("destination"),
        ),
        price: row.required_decimal("price")?,
        currency: row.currency(currency),
        selected: row.boolean("selected")?.unwrap_or(false),
        notes: row.owned("notes"),
    })
}

fn collect_rows<T>(
    reader: &mut csv::Reader<&[u8]>,
    columns: &HashMap<String, usize>,
    currency: &str,
    parse: fn(&Row, &str) -> Result<T, String>,
) -> (Vec<T>, Vec<RowProblem>) {
    let mut items = Vec::new();
    let mut skipped = Vec::new();

    for (i, result) in reader.records().enumerate() {
        // Header is line 1.
        let fallback_line = i as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                skipped.push(RowProblem {
                    line,
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        match parse(&Row { record: &record, columns }, currency) {
            Ok(item) => items.push(item),
            Err(message) => skipped.push(RowProblem { line, message }),
        }
    }

    (items, skipped)
}

/// Parse a CSV file of `kind` items. Blank currency cells take `default_currency`.
pub fn import_csv(
    kind: ItemKind,
    data: &str,
    default_currency: &str,
) -> Result<ImportReport, ImportFormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ImportFormatError::Unreadable(e.to_string()))?
        .clone();

    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
        .collect();

    let missing: Vec<String> = required_columns(kind)
        .iter()
        .filter(|column| !columns.contains_key(**column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportFormatError::MissingHeaders(missing));
    }

    let (items, skipped) = match kind {
        ItemKind::Property => {
            let (items, skipped) = collect_rows(&mut reader, &columns, default_currency, parse_property);
            (ImportedItems::Properties(items), skipped)
        }
        ItemKind::Activity => {
            let (items, skipped) = collect_rows(&mut reader, &columns, default_currency, parse_activity);
            (ImportedItems::Activities(items), skipped)
        }
        ItemKind::Flight => {
            let (items, skipped) = collect_rows(&mut reader, &columns, default_currency, parse_flight);
            (ImportedItems::Flights(items), skipped)
        }
        ItemKind::Transportation => {
            let (items, skipped) = collect_rows(&mut reader, &columns, default_currency, parse_transport);
            (ImportedItems::Transportation(items), skipped)
        }
    };

    if !skipped.is_empty() {
        log::warn!("CSV import of {} skipped {} rows", kind.as_str(), skipped.len());
    }

    Ok(ImportReport { items, skipped })
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn images(value: &[String]) -> String {
    value.join(&IMAGE_SEPARATOR.to_string())
}

/// Write the quote's items of `kind` using the import columns.
pub fn export_csv(quote: &ClientQuote, kind: ItemKind) -> Result<String, ImportFormatError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let header: Vec<&str> = required_columns(kind)
        .iter()
        .chain(optional_columns(kind))
        .copied()
        .collect();
    let write_err = |e: csv::Error| ImportFormatError::Unreadable(e.to_string());

    writer.write_record(&header).map_err(write_err)?;

    match kind {
        ItemKind::Property => {
            for p in quote.properties.iter().filter(|p| !p.is_placeholder) {
                writer
                    .write_record([
                        p.name.clone(),
                        p.location.clone(),
                        opt_date(p.check_in),
                        opt_date(p.check_out),
                        p.price.to_string(),
                        p.currency.clone(),
                        p.selected.to_string(),
                        opt(&p.room_type),
                        opt(&p.url),
                        images(&p.images),
                        opt(&p.notes),
                    ])
                    .map_err(write_err)?;
            }
        }
        ItemKind::Activity => {
            for a in &quote.activities {
                writer
                    .write_record([
                        a.name.clone(),
                        a.location.clone(),
                        opt(&a.duration),
                        a.pax.to_string(),
                        a.cost_per_pax.to_string(),
                        a.currency.clone(),
                        images(&a.images),
                        opt_date(a.date),
                        opt(&a.time),
                        a.flat_price.to_string(),
                        a.included_in_base.to_string(),
                        a.selected.to_string(),
                        opt(&a.description),
                    ])
                    .map_err(write_err)?;
            }
        }
        ItemKind::Flight => {
            for f in &quote.flights {
                writer
                    .write_record([
                        f.name.clone(),
                        f.flight_type.as_str().to_string(),
                        f.price_if_selected.to_string(),
                        f.price_if_not_selected.to_string(),
                        f.currency.clone(),
                        opt(&f.airline),
                        opt(&f.departure),
                        opt(&f.arrival),
                        f.selected.to_string(),
                    ])
                    .map_err(write_err)?;
            }
        }
        ItemKind::Transportation => {
            for t in &quote.transportation {
                writer
                    .write_record([
                        t.name.clone(),
                        t.transport_type().as_str().to_string(),
                        t.location().to_string(),
                        t.price.to_string(),
                        t.currency.clone(),
                        opt_date(t.date()),
                        t.destination().unwrap_or_default().to_string(),
                        t.selected.to_string(),
                        opt(&t.notes),
                    ])
                    .map_err(write_err)?;
            }
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ImportFormatError::Unreadable(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ImportFormatError::Unreadable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_missing_headers_reject_whole_file() {
        let data = "name,location,pax,currency\nKayak,Abel Tasman,2,NZD\n";

        let err = import_csv(ItemKind::Activity, data, "NZD").unwrap_err();

        assert_eq!(
            err,
            ImportFormatError::MissingHeaders(vec![
                "duration".to_string(),
                "cost_per_pax".to_string(),
                "images".to_string(),
            ])
        );
    }

    #[test]
    fn test_activity_defaults() {
        let data = "\
name,location,duration,pax,cost_per_pax,currency,images,included_in_base
Glowworm caves,Waitomo,2h,3,85.50,,https://a.example/1.jpg|https://a.example/2.jpg,yes
Jet boat,Queenstown,1h,2,120,nzd,,
";

        let report = import_csv(ItemKind::Activity, data, "NZD").unwrap();
        assert!(report.skipped.is_empty());

        let ImportedItems::Activities(activities) = report.items else {
            panic!("expected activities");
        };
        assert_eq!(activities.len(), 2);

        let caves = &activities[0];
        assert_eq!(caves.flat_price, Decimal::ZERO);
        assert_eq!(caves.base_price, decimal("256.50"));
        assert!(caves.included_in_base);
        assert!(caves.selected, "selected mirrors included_in_base");
        assert_eq!(caves.currency, "NZD");
        assert_eq!(caves.images.len(), 2);

        let jet = &activities[1];
        assert!(!jet.included_in_base);
        assert!(!jet.selected);
        assert_eq!(jet.currency, "NZD");
        assert_eq!(jet.base_price, decimal("240"));
    }

    #[test]
    fn test_malformed_rows_are_skipped_and_counted() {
        let data = "\
name,flight_type,price_if_selected,price_if_not_selected,currency
AKL-ZQN,domestic,0,-120,NZD
AKL-SYD,overseas,0,-350,NZD
AKL-NAN,international,abc,0,NZD
AKL-WLG,domestic,,,NZD
";

        let report = import_csv(ItemKind::Flight, data, "NZD").unwrap();

        assert_eq!(report.items.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].line, 3);
        assert!(report.skipped[0].message.contains("flight_type"));
        assert_eq!(report.skipped[1].line, 4);
    }

    #[test]
    fn test_transport_location_maps_by_type() {
        let data = "\
name,transport_type,location,price,currency,date,destination
Interislander,ferry,Wellington,180,NZD,2025-03-10,Picton
Rental,car,Picton,95,NZD,,
";

        let report = import_csv(ItemKind::Transportation, data, "NZD").unwrap();
        let ImportedItems::Transportation(items) = report.items else {
            panic!("expected transportation");
        };

        assert_eq!(items[0].transport_type(), TransportType::Ferry);
        assert!(matches!(
            &items[0].details,
            TransportDetails::Ferry { boarding_from, arriving_at, .. }
                if boarding_from == "Wellington" && arriving_at.as_deref() == Some("Picton")
        ));
        assert_eq!(items[1].location(), "Picton");
        assert_eq!(items[1].date(), None);
    }

    #[test]
    fn test_export_reimports_cleanly() {
        let data = "\
name,location,check_in,check_out,price,currency,selected
Harbour Suites,Auckland,2025-03-01,2025-03-04,210,NZD,true
Budget Inn,Auckland,2025-03-01,2025-03-04,-40,NZD,false
";
        let report = import_csv(ItemKind::Property, data, "NZD").unwrap();
        let mut quote = ClientQuote::default();
        assert_eq!(report.items.append_to(&mut quote), 2);

        let exported = export_csv(&quote, ItemKind::Property).unwrap();
        assert!(exported.starts_with("name,location,check_in,check_out,price,currency,selected"));

        let again = import_csv(ItemKind::Property, &exported, "NZD").unwrap();
        let ImportedItems::Properties(properties) = again.items else {
            panic!("expected properties");
        };
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[1].price, decimal("-40"));
        assert!(properties[0].selected);
    }
}
