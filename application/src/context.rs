//! [`Context`]-related definitions.

use std::sync::{
    atomic::{self, AtomicU16},
    OnceLock,
};

use axum::{async_trait, extract::FromRequestParts};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use secrecy::{ExposeSecret as _, SecretString};

use crate::{define_error, Error, JuniperResponse, Service};

/// Key authorizing administrator requests.
#[derive(Clone, Debug)]
pub struct AdminKey(SecretString);

impl AdminKey {
    /// Creates a new [`AdminKey`].
    #[must_use]
    pub const fn new(key: SecretString) -> Self {
        Self(key)
    }

    /// Checks whether the provided `token` matches this [`AdminKey`].
    ///
    /// An empty [`AdminKey`] matches nothing.
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        let key = self.0.expose_secret().as_bytes();
        !key.is_empty()
            && key.len() == token.len()
            && key
                .iter()
                .zip(token.as_bytes())
                .fold(0, |diff, (a, b)| diff | (a ^ b))
                == 0
    }
}

/// Application context.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// [`AdminKey`] to authorize administrator requests with.
    admin_key: AdminKey,

    /// Error status code.
    error_status_code: AtomicU16,

    /// Parts of the HTTP request.
    parts: http::request::Parts,

    /// Indicator whether the HTTP request is authorized as administrator's.
    is_admin: OnceLock<bool>,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the error status code of this [`Context`].
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Sets the error status code for this [`Context`].
    ///
    /// Provided [`http::StatusCode`] will be applied to the response.
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code
            .store(status_code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Helper method calling [`Context::set_error_status_code()`] inside
    /// [`Result::map_err()`] closure.
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }

    /// Ensures the current HTTP request is made by the administrator.
    ///
    /// # Errors
    ///
    /// With `ADMIN_REQUIRED` if the request carries no `Bearer` token, or the
    /// token doesn't match the configured [`AdminKey`].
    pub fn authorize_admin(&self) -> Result<(), Error> {
        let is_admin = *self.is_admin.get_or_init(|| {
            self.parts
                .headers
                .typed_get::<Authorization<Bearer>>()
                .is_some_and(|Authorization(bearer)| {
                    self.admin_key.matches(bearer.token())
                })
        });
        is_admin
            .then_some(())
            .ok_or_else(|| AuthError::AdminRequired.into())
            .map_err(self.error())
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let missing = |what: &str| JuniperResponse {
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            response: GraphQLBatchResponse::Single(GraphQLResponse::error(
                Error::internal(&format!("missing `{what}` extension"))
                    .into_field_error(),
            )),
        };

        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| missing("Service"))?;
        let admin_key = parts
            .extensions
            .get::<AdminKey>()
            .cloned()
            .ok_or_else(|| missing("AdminKey"))?;

        Ok(Self {
            service,
            admin_key,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            parts: parts.clone(),
            is_admin: OnceLock::new(),
        })
    }
}

define_error! {
    enum AuthError {
        #[code = "ADMIN_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Administrator authorization required"]
        AdminRequired,
    }
}
