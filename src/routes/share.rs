use actix_web::{web, HttpResponse};

use crate::{
    error::ApiResult,
    models::quote::ClientQuote,
    routes::quote::QuoteView,
    services::{
        leg_service::LegService, selection_service::apply_selections,
        share_link_service::open_active,
    },
    state::AppState,
};

/*
    GET /api/share/{client_id}/{token}
*/
pub async fn view_shared(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (client_id, token) = path.into_inner();
    let shared = open_active(state.share_links.as_ref(), &client_id, &token).await?;

    let mut document = state
        .autosave
        .pending_quote(&client_id)
        .unwrap_or(shared.document);
    LegService::synthesize(&mut document);

    Ok(HttpResponse::Ok().json(QuoteView::new(&client_id, document)))
}

/*
    POST /api/share/{client_id}/{token}/confirm
    The client submits its whole working copy. Only the selected flags of
    items the agent's document already has are taken from it.
*/
pub async fn confirm_shared(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<ClientQuote>,
) -> ApiResult<HttpResponse> {
    let (client_id, token) = path.into_inner();
    let shared = open_active(state.share_links.as_ref(), &client_id, &token).await?;
    let mut quote = state
        .autosave
        .pending_quote(&client_id)
        .unwrap_or(shared.document);

    let changed = apply_selections(&mut quote, &body);
    LegService::synthesize(&mut quote);
    quote.updated_at = Some(chrono::Utc::now());

    state.autosave.flush(&client_id, &quote).await?;
    log::info!("Client {client_id} confirmed their selections ({changed} changed)");

    Ok(HttpResponse::Ok().json(QuoteView::new(&client_id, quote)))
}
