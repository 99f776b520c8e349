use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::quote::{Activity, ClientQuote, Flight, Property, Transportation};

/// Per-kind subtotals and the final quote, derived from a document on every read.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct QuoteBreakdown {
    pub currency: String,
    pub base_quote: Decimal,
    pub property_total: Decimal,
    pub activity_total: Decimal,
    pub flight_total: Decimal,
    pub transport_total: Decimal,
    pub final_quote: Decimal,
}

pub struct PricingService;

impl PricingService {
    /// Unselected properties contribute nothing.
    pub fn property_delta(property: &Property) -> Decimal {
        if property.selected {
            property.price
        } else {
            Decimal::ZERO
        }
    }

    /// Both branches contribute: choosing a flight and skipping it are each priced.
    pub fn flight_delta(flight: &Flight) -> Decimal {
        if flight.selected {
            flight.price_if_selected
        } else {
            flight.price_if_not_selected
        }
    }

    /// Change relative to what was already quoted.
    ///
    /// An activity folded into the base quote is priced on removal (`-base`) or
    /// on drift since quoting (`current - base`). An optional add-on costs its
    /// full current price when selected and nothing otherwise.
    pub fn activity_delta(activity: &Activity) -> Decimal {
        let current = activity.current_price();
        let base = activity.base_price;

        match (activity.included_in_base, activity.selected) {
            (true, true) => current - base,
            (true, false) => -base,
            (false, true) => current,
            (false, false) => Decimal::ZERO,
        }
    }

    pub fn transport_delta(transport: &Transportation) -> Decimal {
        if transport.selected {
            transport.price
        } else {
            Decimal::ZERO
        }
    }

    pub fn property_total(quote: &ClientQuote) -> Decimal {
        quote
            .properties
            .iter()
            .filter(|p| !p.is_placeholder)
            .map(Self::property_delta)
            .sum()
    }

    pub fn activity_total(quote: &ClientQuote) -> Decimal {
        quote.activities.iter().map(Self::activity_delta).sum()
    }

    pub fn flight_total(quote: &ClientQuote) -> Decimal {
        quote.flights.iter().map(Self::flight_delta).sum()
    }

    pub fn transport_total(quote: &ClientQuote) -> Decimal {
        quote.transportation.iter().map(Self::transport_delta).sum()
    }

    /// Base quote plus every delta. Item amounts are expected in the quote currency.
    pub fn final_quote(quote: &ClientQuote) -> Decimal {
        quote.base_quote
            + Self::property_total(quote)
            + Self::activity_total(quote)
            + Self::flight_total(quote)
            + Self::transport_total(quote)
    }

    pub fn quote_breakdown(quote: &ClientQuote) -> QuoteBreakdown {
        let property_total = Self::property_total(quote);
        let activity_total = Self::activity_total(quote);
        let flight_total = Self::flight_total(quote);
        let transport_total = Self::transport_total(quote);

        QuoteBreakdown {
            currency: quote.currency.clone(),
            base_quote: quote.base_quote,
            property_total,
            activity_total,
            flight_total,
            transport_total,
            final_quote: quote.base_quote
                + property_total
                + activity_total
                + flight_total
                + transport_total,
        }
    }
}
