use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::headers::authorization::Basic;
use axum::headers::Authorization;
use axum::http::request::Parts;
use axum::TypedHeader;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::{Config, Credentials};
use crate::error::ApiError;

/// Checks HTTP Basic credentials against the single operator account.
#[derive(Clone)]
pub struct AccessGuard {
    credentials: Arc<Credentials>,
    realm: Arc<str>,
}

impl AccessGuard {
    pub fn new(credentials: Credentials, realm: &str) -> Self {
        AccessGuard {
            credentials: Arc::new(credentials),
            realm: realm.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.credentials.clone(), &config.base_url)
    }

    pub fn authorize(&self, username: &str, password: &str) -> bool {
        let username_ok = constant_time_eq(username, &self.credentials.username);
        let password_ok = constant_time_eq(password, &self.credentials.password);
        username_ok & password_ok
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    // slices of unequal length compare unequal without inspecting the contents
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Proof that the request carried the operator's credentials.
///
/// Extracting this before the body means a rejected upload never reads or stores anything.
pub struct Operator;

#[async_trait]
impl<S> FromRequestParts<S> for Operator
where
    AccessGuard: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let guard = AccessGuard::from_ref(state);
        let header =
            TypedHeader::<Authorization<Basic>>::from_request_parts(parts, state).await;

        match header {
            Ok(TypedHeader(Authorization(basic)))
                if guard.authorize(basic.username(), basic.password()) =>
            {
                Ok(Operator)
            }
            Ok(_) => {
                warn!("rejected credentials for {}", parts.uri.path());
                Err(ApiError::Unauthorized {
                    realm: guard.realm().to_owned(),
                })
            }
            Err(_) => Err(ApiError::Unauthorized {
                realm: guard.realm().to_owned(),
            }),
        }
    }
}
