use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::settings;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Platform uid of the authenticated user.
    pub sub: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub display_name: String,
    pub groups: Vec<String>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let display_name = if data.claims.name.is_empty() {
            data.claims.sub.clone()
        } else {
            data.claims.name
        };

        ready(Ok(AuthUser {
            uid: data.claims.sub,
            display_name,
            groups: data.claims.groups,
        }))
    }
}

impl AuthUser {
    pub fn in_group(&self, gid: &str) -> bool {
        self.groups.iter().any(|g| g == gid)
    }

    /// Admin means membership in the configured leave-admin group or in the
    /// platform super-admin group.
    pub fn is_app_admin(&self, admin_group: &str) -> bool {
        self.in_group(admin_group) || self.in_group(settings::SUPER_ADMIN_GROUP)
    }
}
