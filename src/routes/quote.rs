use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult, ImportFormatError},
    middleware::auth_context::AuthenticatedAdmin,
    models::{
        leg::LegUpdate,
        quote::{ClientQuote, ItemKind},
    },
    services::{
        currency_service::symbol_of,
        image_service::ImageDiscoveryError,
        import_service::{export_csv, import_csv, RowProblem},
        leg_service::LegService,
        pricing_service::{PricingService, QuoteBreakdown},
    },
    state::AppState,
};

/// A document as returned to admins and clients, priced on the way out.
#[derive(Debug, Serialize)]
pub struct QuoteView {
    pub client_id: String,
    pub currency_symbol: String,
    pub document: ClientQuote,
    pub breakdown: QuoteBreakdown,
}

impl QuoteView {
    pub fn new(client_id: &str, document: ClientQuote) -> Self {
        Self {
            client_id: client_id.to_string(),
            currency_symbol: symbol_of(&document.currency),
            breakdown: PricingService::quote_breakdown(&document),
            document,
        }
    }
}

/// Latest version of a client's document with its legs synthesized.
///
/// Newly synthesized legs are scheduled for saving so their ids stay stable
/// across requests.
pub async fn load(state: &AppState, client_id: &str) -> ApiResult<ClientQuote> {
    let mut quote = match state.autosave.pending_quote(client_id) {
        Some(pending) => pending,
        None => state
            .store
            .get(client_id)
            .await?
            .ok_or_else(|| ApiError::ClientNotFound(client_id.to_string()))?,
    };

    let before = quote.legs.clone();
    LegService::synthesize(&mut quote);
    if quote.legs != before {
        log::debug!("Legs for {client_id} changed on load, scheduling save");
        schedule(state, client_id, quote.clone());
    }
    Ok(quote)
}

fn schedule(state: &AppState, client_id: &str, mut quote: ClientQuote) {
    quote.updated_at = Some(Utc::now());
    state.autosave.schedule(client_id, quote);
}

async fn save_now(state: &AppState, client_id: &str, quote: &mut ClientQuote) -> ApiResult<()> {
    quote.updated_at = Some(Utc::now());
    state.autosave.flush(client_id, quote).await?;
    Ok(())
}

fn parse_kind(kind: &str) -> Result<ItemKind, ImportFormatError> {
    ItemKind::parse(kind).ok_or_else(|| ImportFormatError::UnknownKind(kind.to_string()))
}

/*
    GET /api/admin/clients/{client_id}
*/
pub async fn get_quote(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let client_id = path.into_inner();
    let quote = load(&state, &client_id).await?;
    Ok(HttpResponse::Ok().json(QuoteView::new(&client_id, quote)))
}

/*
    PUT /api/admin/clients/{client_id}
    Drafts are saved after a quiet period without validation.
*/
pub async fn update_quote(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ClientQuote>,
) -> ApiResult<HttpResponse> {
    let client_id = path.into_inner();
    let mut quote = body.into_inner();
    LegService::synthesize(&mut quote);

    let view = QuoteView::new(&client_id, quote.clone());
    schedule(&state, &client_id, quote);
    Ok(HttpResponse::Accepted().json(view))
}

/*
    POST /api/admin/clients/{client_id}/save
*/
pub async fn save_quote(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ClientQuote>,
    admin: AuthenticatedAdmin,
) -> ApiResult<HttpResponse> {
    let client_id = path.into_inner();
    let mut quote = body.into_inner();
    LegService::synthesize(&mut quote);
    quote.validate()?;

    save_now(&state, &client_id, &mut quote).await?;
    log::info!("{} saved quote for {}", admin.email, client_id);
    Ok(HttpResponse::Ok().json(QuoteView::new(&client_id, quote)))
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub kind: String,
    pub item_id: String,
}

#[derive(Debug, Serialize)]
struct ToggleResponse {
    item_id: String,
    selected: bool,
    breakdown: QuoteBreakdown,
}

/*
    POST /api/admin/clients/{client_id}/selections
*/
pub async fn toggle_selection(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ToggleRequest>,
) -> ApiResult<HttpResponse> {
    let client_id = path.into_inner();
    let ToggleRequest { kind, item_id } = body.into_inner();
    let kind = ItemKind::parse(&kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown item kind {kind}")))?;

    let mut quote = load(&state, &client_id).await?;
    let selected = quote.toggle(kind, &item_id)?;
    let breakdown = PricingService::quote_breakdown(&quote);
    schedule(&state, &client_id, quote);

    Ok(HttpResponse::Ok().json(ToggleResponse {
        item_id,
        selected,
        breakdown,
    }))
}

#[derive(Debug, Deserialize)]
pub struct NewLeg {
    pub location: String,
    #[serde(default)]
    pub check_in: Option<NaiveDate>,
    #[serde(default)]
    pub check_out: Option<NaiveDate>,
}

/*
    POST /api/admin/clients/{client_id}/legs
*/
pub async fn add_leg(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<NewLeg>,
) -> ApiResult<HttpResponse> {
    let client_id = path.into_inner();
    let mut quote = load(&state, &client_id).await?;

    let leg = LegService::add_leg(&mut quote, &body.location, body.check_in, body.check_out)?;
    schedule(&state, &client_id, quote);
    Ok(HttpResponse::Created().json(leg))
}

/*
    PUT /api/admin/clients/{client_id}/legs/{leg_id}
*/
pub async fn update_leg(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<LegUpdate>,
) -> ApiResult<HttpResponse> {
    let (client_id, leg_id) = path.into_inner();
    let mut quote = load(&state, &client_id).await?;

    let leg = LegService::rename_leg(&mut quote, &leg_id, &body)?;
    schedule(&state, &client_id, quote);
    Ok(HttpResponse::Ok().json(leg))
}

/*
    DELETE /api/admin/clients/{client_id}/legs/{leg_id}
*/
pub async fn delete_leg(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (client_id, leg_id) = path.into_inner();
    let mut quote = load(&state, &client_id).await?;

    let removed = LegService::delete_leg(&mut quote, &leg_id)?;
    schedule(&state, &client_id, quote);
    Ok(HttpResponse::Ok().json(removed))
}

#[derive(Debug, Deserialize)]
pub struct CurrencyChange {
    pub currency: String,
    /// Rates as of this date; today's rates when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/*
    POST /api/admin/clients/{client_id}/currency
*/
pub async fn change_currency(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CurrencyChange>,
) -> ApiResult<HttpResponse> {
    let client_id = path.into_inner();
    let quote = load(&state, &client_id).await?;

    let mut converted = state
        .converter
        .convert_document(&quote, &body.currency, body.date)
        .await?;

    save_now(&state, &client_id, &mut converted).await?;
    log::info!(
        "Converted quote for {} from {} to {}",
        client_id,
        quote.currency,
        converted.currency
    );
    Ok(HttpResponse::Ok().json(QuoteView::new(&client_id, converted)))
}

#[derive(Debug, Serialize)]
struct ImportResponse {
    kind: ItemKind,
    imported: usize,
    skipped: Vec<RowProblem>,
}

/*
    POST /api/admin/clients/{client_id}/import/{kind}
    Body is the raw CSV file.
*/
pub async fn import_items(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: String,
) -> ApiResult<HttpResponse> {
    let (client_id, kind) = path.into_inner();
    let kind = parse_kind(&kind)?;
    let mut quote = load(&state, &client_id).await?;

    let report = import_csv(kind, &body, &quote.currency)?;
    let imported = report.items.append_to(&mut quote);
    LegService::synthesize(&mut quote);
    schedule(&state, &client_id, quote);

    log::info!(
        "Imported {} {} rows for {} ({} skipped)",
        imported,
        kind.as_str(),
        client_id,
        report.skipped.len()
    );
    Ok(HttpResponse::Ok().json(ImportResponse {
        kind,
        imported,
        skipped: report.skipped,
    }))
}

/*
    GET /api/admin/clients/{client_id}/export/{kind}
*/
pub async fn export_items(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (client_id, kind) = path.into_inner();
    let kind = parse_kind(&kind)?;
    let quote = load(&state, &client_id).await?;

    let csv = export_csv(&quote, kind)?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .body(csv))
}

#[derive(Debug, Deserialize)]
pub struct IssueLinkRequest {
    #[serde(default)]
    pub ttl_days: Option<i64>,
}

/*
    POST /api/admin/clients/{client_id}/share-links
*/
pub async fn issue_share_link(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<IssueLinkRequest>>,
) -> ApiResult<HttpResponse> {
    let client_id = path.into_inner();
    // Only existing clients get links.
    load(&state, &client_id).await?;

    let ttl_days = body
        .and_then(|b| b.ttl_days)
        .unwrap_or(state.config.share_link_ttl_days);
    let link = state
        .share_links
        .issue(&client_id, (ttl_days > 0).then_some(ttl_days))
        .await?;
    Ok(HttpResponse::Created().json(link))
}

/*
    GET /api/admin/clients/{client_id}/share-links
*/
pub async fn list_share_links(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let links = state.share_links.list(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(links))
}

#[derive(Debug, Deserialize)]
pub struct LinkStatus {
    pub active: bool,
}

/*
    PUT /api/admin/clients/{client_id}/share-links/{token}
*/
pub async fn set_share_link_active(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<LinkStatus>,
) -> ApiResult<HttpResponse> {
    let (client_id, token) = path.into_inner();
    let found = state
        .share_links
        .set_active(&client_id, &token, body.active)
        .await?;

    if !found {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({ "error": "Share link not found" })));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": token, "active": body.active })))
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub page_url: String,
}

#[derive(Debug, Serialize)]
struct ImageResponse {
    images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/*
    POST /api/admin/clients/{client_id}/images
    Discovery failures still answer 200 with an empty list.
*/
pub async fn discover_images(
    state: web::Data<AppState>,
    body: web::Json<ImageRequest>,
) -> ApiResult<HttpResponse> {
    let response = match state.images.discover(&body.page_url).await {
        Ok(images) => ImageResponse {
            images,
            message: None,
        },
        Err(ImageDiscoveryError::InvalidUrl(reason)) => return Err(ApiError::BadRequest(reason)),
        Err(e) => {
            log::warn!("Image discovery failed for {}: {}", body.page_url, e);
            ImageResponse {
                images: Vec::new(),
                message: Some(e.to_string()),
            }
        }
    };
    Ok(HttpResponse::Ok().json(response))
}
