use actix_web::web;

use crate::middleware::auth::AdminAuth;

pub mod currency;
pub mod health;
pub mod quote;
pub mod share;

pub fn config(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .route("/currencies", web::get().to(currency::list_currencies))
                .service(
                    web::scope("/share/{client_id}/{token}")
                        .route("", web::get().to(share::view_shared))
                        .route("/confirm", web::post().to(share::confirm_shared)),
                )
                .service(
                    web::scope("/admin/clients/{client_id}")
                        .wrap(AdminAuth::new(jwt_secret))
                        .route("", web::get().to(quote::get_quote))
                        .route("", web::put().to(quote::update_quote))
                        .route("/save", web::post().to(quote::save_quote))
                        .route("/selections", web::post().to(quote::toggle_selection))
                        .route("/legs", web::post().to(quote::add_leg))
                        .route("/legs/{leg_id}", web::put().to(quote::update_leg))
                        .route("/legs/{leg_id}", web::delete().to(quote::delete_leg))
                        .route("/currency", web::post().to(quote::change_currency))
                        .route("/import/{kind}", web::post().to(quote::import_items))
                        .route("/export/{kind}", web::get().to(quote::export_items))
                        .route("/share-links", web::post().to(quote::issue_share_link))
                        .route("/share-links", web::get().to(quote::list_share_links))
                        .route(
                            "/share-links/{token}",
                            web::put().to(quote::set_share_link_active),
                        )
                        .route("/images", web::post().to(quote::discover_images)),
                ),
        );
}
