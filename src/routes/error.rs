use crate::auth::gate::GateRejection;
use crate::error::app_error::ErrorBody;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{Request, catch};

/// Message of the access gate rejection cached on this request, if any.
fn gate_message(req: &Request) -> Option<&'static str> {
    req.local_cache(|| None::<GateRejection>).as_ref().map(GateRejection::message)
}

#[catch(400)]
pub fn bad_request(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new("Malformed request body"))
}

#[catch(403)]
pub fn forbidden(req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new(gate_message(req).unwrap_or("Forbidden")))
}

#[catch(404)]
pub fn not_found(req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new(gate_message(req).unwrap_or("Not found")))
}

/// Well-formed JSON whose fields have the wrong types. Clients only ever see 400 for bad input.
#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Custom<Json<ErrorBody>> {
    Custom(Status::BadRequest, Json(ErrorBody::new("Request body has the wrong shape")))
}

#[catch(500)]
pub fn internal_error(req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new(gate_message(req).unwrap_or("Internal server error")))
}
