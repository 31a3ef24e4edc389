pub mod gate;
pub mod password;
pub mod token;

use crate::db::SharedUserRepository;
use gate::GateRejection;
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, Responses, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use token::TokenSigner;
use tracing::error;

/// The account a request was authorized for. Obtaining one runs the full access gate.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub email: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = GateRejection;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let rocket = req.rocket();
        let (Some(signer), Some(users)) = (rocket.state::<TokenSigner>(), rocket.state::<SharedUserRepository>()) else {
            error!("access gate is missing its token signer or user store");
            return reject(req, GateRejection::StoreUnavailable);
        };

        match gate::authorize(req.headers().get_one("Authorization"), signer, users.as_ref()).await {
            Ok(user) => {
                req.local_cache(|| Some(user.clone()));
                Outcome::Success(user)
            }
            Err(rejection) => reject(req, rejection),
        }
    }
}

/// Rocket hands failed guards to the status catcher without the error value, so the
/// rejection is parked in the request cache for the catcher to render.
fn reject(req: &Request<'_>, rejection: GateRejection) -> RequestOutcome<CurrentUser, GateRejection> {
    req.local_cache(|| Some(rejection));
    Outcome::Error((rejection.status(), rejection))
}

impl<'a> OpenApiFromRequest<'a> for CurrentUser {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = SecurityScheme {
            description: Some("Bearer token. Log in via POST /login to obtain one; it expires after one hour.".to_string()),
            data: SecuritySchemeData::Http {
                scheme: "bearer".to_string(),
                bearer_format: Some("JWT".to_string()),
            },
            extensions: Object::default(),
        };

        let mut security_req = SecurityRequirement::new();
        security_req.insert("bearerAuth".to_string(), Vec::new());

        Ok(RequestHeaderInput::Security("bearerAuth".to_string(), security_scheme, security_req))
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response};
        let mut responses = Responses::default();
        responses.responses.insert(
            "403".to_string(),
            RefOr::Object(Response {
                description: "Forbidden - missing or invalid token, or blocked account".to_string(),
                ..Default::default()
            }),
        );
        responses.responses.insert(
            "404".to_string(),
            RefOr::Object(Response {
                description: "Token subject no longer exists".to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}
