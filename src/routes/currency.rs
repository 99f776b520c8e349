use actix_web::{HttpResponse, Responder};

use crate::services::currency_service::known_currencies;

/*
    GET /api/currencies
*/
pub async fn list_currencies() -> impl Responder {
    HttpResponse::Ok().json(known_currencies())
}
