use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::{
    error::LegError,
    models::{
        leg::{ItineraryLeg, LegRemoval, LegUpdate},
        quote::{ClientQuote, Property},
    },
};

pub struct LegService;

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn by_check_in(a: &ItineraryLeg, b: &ItineraryLeg) -> Ordering {
    match (a.check_in, b.check_in) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl LegService {
    /// Rebuild the document's legs from its explicit legs and item locations.
    ///
    /// Legacy placeholder properties move into `legs`. Every location referenced
    /// by a property, activity or transportation item ends up with exactly one
    /// leg; existing legs keep their ids and dates. Running this twice on the
    /// same document changes nothing the second time.
    pub fn synthesize(quote: &mut ClientQuote) {
        let (placeholders, properties): (Vec<Property>, Vec<Property>) =
            std::mem::take(&mut quote.properties)
                .into_iter()
                .partition(|p| p.is_placeholder);
        quote.properties = properties;
        quote
            .legs
            .extend(placeholders.into_iter().map(|p| ItineraryLeg {
                id: p.id,
                location: p.location,
                check_in: p.check_in,
                check_out: p.check_out,
                is_placeholder: true,
            }));

        Self::normalize_locations(quote);
        let referenced = Self::referenced_locations(quote);

        let mut legs: Vec<ItineraryLeg> = Vec::with_capacity(referenced.len());
        for leg in std::mem::take(&mut quote.legs) {
            if leg.location.is_empty() {
                continue;
            }
            if leg.is_placeholder && !referenced.contains(&leg.location) {
                continue;
            }
            match legs.iter().position(|kept| kept.location == leg.location) {
                Some(index) => {
                    if legs[index].is_placeholder && !leg.is_placeholder {
                        legs[index] = leg;
                    }
                }
                None => legs.push(leg),
            }
        }

        for location in referenced {
            if legs.iter().any(|leg| leg.location == location) {
                continue;
            }
            let (check_in, check_out) = Self::default_dates(quote, &location);
            log::debug!("Synthesized placeholder leg for {location}");
            legs.push(ItineraryLeg::placeholder(location, check_in, check_out));
        }

        legs.sort_by(by_check_in);
        quote.legs = legs;
    }

    fn normalize_locations(quote: &mut ClientQuote) {
        for leg in &mut quote.legs {
            trim_in_place(&mut leg.location);
        }
        for property in &mut quote.properties {
            trim_in_place(&mut property.location);
        }
        for activity in &mut quote.activities {
            trim_in_place(&mut activity.location);
        }
        for transport in &mut quote.transportation {
            trim_in_place(transport.location_mut());
        }
    }

    /// Distinct non-empty locations in order of first appearance.
    pub fn referenced_locations(quote: &ClientQuote) -> Vec<String> {
        let locations = quote
            .properties
            .iter()
            .map(|p| p.location.trim())
            .chain(quote.activities.iter().map(|a| a.location.trim()))
            .chain(quote.transportation.iter().map(|t| t.location().trim()));

        let mut ordered: Vec<String> = Vec::new();
        for location in locations {
            if !location.is_empty() && !ordered.iter().any(|l| l == location) {
                ordered.push(location.to_string());
            }
        }
        ordered
    }

    /// Dates for a new leg: the first property stay, else the first activity
    /// date, else the first pickup or boarding date.
    fn default_dates(
        quote: &ClientQuote,
        location: &str,
    ) -> (Option<NaiveDate>, Option<NaiveDate>) {
        if let Some(property) = quote
            .properties
            .iter()
            .find(|p| p.location == location && p.check_in.is_some())
        {
            return (property.check_in, property.check_out);
        }

        let first_date = quote
            .activities
            .iter()
            .filter(|a| a.location == location)
            .find_map(|a| a.date)
            .or_else(|| {
                quote
                    .transportation
                    .iter()
                    .filter(|t| t.location() == location)
                    .find_map(|t| t.date())
            });

        (first_date, None)
    }

    /// Create an explicit leg, or promote the placeholder already at `location`.
    pub fn add_leg(
        quote: &mut ClientQuote,
        location: &str,
        check_in: Option<NaiveDate>,
        check_out: Option<NaiveDate>,
    ) -> Result<ItineraryLeg, LegError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(LegError::EmptyLocation);
        }

        let existing = quote.legs.iter().position(|leg| leg.location == location);
        let leg = match existing {
            Some(index) if quote.legs[index].is_placeholder => {
                let leg = &mut quote.legs[index];
                leg.is_placeholder = false;
                if check_in.is_some() {
                    leg.check_in = check_in;
                }
                if check_out.is_some() {
                    leg.check_out = check_out;
                }
                leg.clone()
            }
            Some(_) => return Err(LegError::DuplicateLocation(location.to_string())),
            None => {
                let leg = ItineraryLeg::explicit(location, check_in, check_out);
                quote.legs.push(leg.clone());
                leg
            }
        };

        quote.legs.sort_by(by_check_in);
        Ok(leg)
    }

    /// Rename and re-date a leg, carrying every item at the old location along.
    ///
    /// Property dates equal to the old leg dates follow the new ones; activity
    /// and transportation dates that matched the old check-in move to the new
    /// check-in. A date left out of the update keeps the leg's current one.
    /// All checks run before the document is touched.
    pub fn rename_leg(
        quote: &mut ClientQuote,
        leg_id: &str,
        update: &LegUpdate,
    ) -> Result<ItineraryLeg, LegError> {
        let new_location = update.location.trim().to_string();
        if new_location.is_empty() {
            return Err(LegError::EmptyLocation);
        }

        let index = quote
            .legs
            .iter()
            .position(|leg| leg.id == leg_id)
            .ok_or_else(|| LegError::NotFound(leg_id.to_string()))?;

        if quote
            .legs
            .iter()
            .any(|leg| leg.id != leg_id && leg.location == new_location)
        {
            return Err(LegError::DuplicateLocation(new_location));
        }

        let old = quote.legs[index].clone();
        let check_in = update.check_in.or(old.check_in);
        let check_out = update.check_out.or(old.check_out);

        for property in quote
            .properties
            .iter_mut()
            .filter(|p| p.location == old.location)
        {
            property.location = new_location.clone();
            if property.check_in == old.check_in {
                property.check_in = check_in;
            }
            if property.check_out == old.check_out {
                property.check_out = check_out;
            }
        }

        for activity in quote
            .activities
            .iter_mut()
            .filter(|a| a.location == old.location)
        {
            activity.location = new_location.clone();
            if activity.date.is_some() && activity.date == old.check_in {
                activity.date = check_in;
            }
        }

        for transport in quote
            .transportation
            .iter_mut()
            .filter(|t| t.location() == old.location)
        {
            *transport.location_mut() = new_location.clone();
            if transport.date().is_some() && transport.date() == old.check_in {
                *transport.date_mut() = check_in;
            }
        }

        let leg = &mut quote.legs[index];
        leg.location = new_location;
        leg.check_in = check_in;
        leg.check_out = check_out;
        leg.is_placeholder = false;
        let renamed = leg.clone();

        quote.legs.sort_by(by_check_in);
        Ok(renamed)
    }

    /// Remove a leg together with every item at its location.
    pub fn delete_leg(quote: &mut ClientQuote, leg_id: &str) -> Result<LegRemoval, LegError> {
        let index = quote
            .legs
            .iter()
            .position(|leg| leg.id == leg_id)
            .ok_or_else(|| LegError::NotFound(leg_id.to_string()))?;
        let leg = quote.legs.remove(index);
        let location = leg.location.as_str();

        let before = (
            quote.properties.len(),
            quote.activities.len(),
            quote.transportation.len(),
        );
        quote.properties.retain(|p| p.location != location);
        quote.activities.retain(|a| a.location != location);
        quote.transportation.retain(|t| t.location() != location);

        Ok(LegRemoval {
            properties: before.0 - quote.properties.len(),
            activities: before.1 - quote.activities.len(),
            transportation: before.2 - quote.transportation.len(),
        })
    }
}
