use std::future::{ready, Ready};

use actix_web::{
    dev::Payload, error::ErrorUnauthorized, Error, FromRequest, HttpMessage, HttpRequest,
};

use crate::middleware::auth::Claims;

/// The agent behind an admin request, as set by `AdminAuth`.
#[derive(Clone, Debug)]
pub struct AuthenticatedAdmin {
    pub email: String,
}

impl FromRequest for AuthenticatedAdmin {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>() {
            Some(claims) if claims.is_admin() => ready(Ok(AuthenticatedAdmin {
                email: claims.sub.clone(),
            })),
            _ => ready(Err(ErrorUnauthorized("Admin not authenticated"))),
        }
    }
}
