use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::env;

use crate::{config::StoreBackend, state::AppState};

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

/*
    GET /health
*/
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let store = check_store(&state).await;
    let rates = check_rates(&state);

    if store.status != "ok" {
        health.status = "degraded".to_string();
    }
    health.services.insert("store".to_string(), store);
    health.services.insert("exchange_rates".to_string(), rates);

    HttpResponse::Ok().json(health)
}

async fn check_store(state: &AppState) -> ServiceStatus {
    let backend = match state.config.store_backend {
        StoreBackend::Mongo => "MongoDB",
        StoreBackend::Memory => "in-memory store",
    };

    match state.store.ping().await {
        Ok(()) => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!("Connected to {backend}")),
        },
        Err(e) => {
            log::error!("Store health check failed: {}", e);
            ServiceStatus {
                status: "error".to_string(),
                details: Some(format!("Failed to reach {backend}: {e}")),
            }
        }
    }
}

fn check_rates(state: &AppState) -> ServiceStatus {
    match &state.config.rates_app_id {
        Some(_) => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!("Rates from {}", state.config.rates_api_url)),
        },
        None => ServiceStatus {
            status: "unconfigured".to_string(),
            details: Some("RATES_APP_ID not configured".to_string()),
        },
    }
}
