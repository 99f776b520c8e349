#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use actix_web::{web, App};
use rust_decimal::Decimal;

use quote_desk_api::{
    config::{AppConfig, StoreBackend},
    db::memory::MemoryQuoteStore,
    middleware::auth::{generate_token, ADMIN_ROLE},
    models::quote::{
        Activity, ClientQuote, Flight, FlightType, Property, TransportDetails, TransportType,
        Transportation,
    },
    routes,
    services::{
        currency_service::{RateTable, RateTableProvider, StaticRateProvider},
        image_service::{ImageDiscovery, NoImageDiscovery},
        share_link_service::MemoryShareLinkGateway,
    },
    state::AppState,
};

pub const SECRET: &str = "test-secret";
pub const CLIENT_ID: &str = "c1";

pub struct TestApp {
    pub store: Arc<MemoryQuoteStore>,
    pub links: Arc<MemoryShareLinkGateway>,
    pub state: web::Data<AppState>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_rates(Arc::new(StaticRateProvider::new(rates())))
    }

    pub fn with_rates(rates: Arc<dyn RateTableProvider>) -> Self {
        Self::build(rates, Arc::new(NoImageDiscovery))
    }

    pub fn build(rates: Arc<dyn RateTableProvider>, images: Arc<dyn ImageDiscovery>) -> Self {
        let config = AppConfig {
            store_backend: StoreBackend::Memory,
            jwt_secret: SECRET.to_string(),
            autosave_delay: Duration::from_millis(50),
            ..Default::default()
        };

        let store = Arc::new(MemoryQuoteStore::new().with_record(CLIENT_ID, sample_quote()));
        let links = Arc::new(MemoryShareLinkGateway::new(store.clone()));
        let state = AppState::new(config, store.clone(), links.clone(), rates, images);

        Self {
            store,
            links,
            state: web::Data::new(state),
        }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(self.state.clone())
            .configure(|cfg| routes::config(cfg, SECRET))
    }
}

pub fn admin_token() -> String {
    let token = generate_token(
        SECRET,
        "agent@example.com",
        Some(ADMIN_ROLE),
        chrono::Duration::hours(1),
    )
    .unwrap();
    format!("Bearer {token}")
}

pub fn user_token() -> String {
    let token = generate_token(SECRET, "guest@example.com", None, chrono::Duration::hours(1)).unwrap();
    format!("Bearer {token}")
}

/// USD based, 1 USD = 1.6 NZD.
pub fn rates() -> RateTable {
    RateTable::new(
        "USD",
        &[("USD", Decimal::ONE), ("NZD", Decimal::new(16, 1))],
    )
}

/// NZD quote at Auckland: base 1000, final 1100.
pub fn sample_quote() -> ClientQuote {
    ClientQuote {
        client_name: Some("Morgan".to_string()),
        base_quote: Decimal::from(1000),
        currency: "NZD".to_string(),
        legs: Vec::new(),
        properties: vec![
            Property {
                id: "p1".to_string(),
                name: "Harbour Suites".to_string(),
                location: "Auckland".to_string(),
                check_in: chrono::NaiveDate::from_ymd_opt(2025, 3, 1),
                check_out: chrono::NaiveDate::from_ymd_opt(2025, 3, 4),
                price: Decimal::from(200),
                currency: "NZD".to_string(),
                selected: true,
                ..Default::default()
            },
            Property {
                id: "p2".to_string(),
                name: "Budget Inn".to_string(),
                location: "Auckland".to_string(),
                check_in: chrono::NaiveDate::from_ymd_opt(2025, 3, 1),
                check_out: chrono::NaiveDate::from_ymd_opt(2025, 3, 4),
                price: Decimal::from(-50),
                currency: "NZD".to_string(),
                selected: false,
                ..Default::default()
            },
        ],
        activities: vec![Activity {
            id: "a1".to_string(),
            name: "Sky Tower".to_string(),
            location: "Auckland".to_string(),
            pax: 2,
            cost_per_pax: Decimal::from(100),
            base_price: Decimal::from(200),
            currency: "NZD".to_string(),
            included_in_base: true,
            selected: true,
            ..Default::default()
        }],
        flights: vec![Flight {
            id: "f1".to_string(),
            name: "AKL-ZQN".to_string(),
            flight_type: FlightType::Domestic,
            price_if_selected: Decimal::ZERO,
            price_if_not_selected: Decimal::from(-100),
            currency: "NZD".to_string(),
            selected: false,
            ..Default::default()
        }],
        transportation: vec![Transportation {
            id: "t1".to_string(),
            name: "Rental car".to_string(),
            details: TransportDetails::new(
                TransportType::Car,
                "Auckland".to_string(),
                None,
                Some("Wellington".to_string()),
            ),
            price: Decimal::from(80),
            currency: "NZD".to_string(),
            selected: false,
            notes: None,
        }],
        updated_at: None,
    }
}
