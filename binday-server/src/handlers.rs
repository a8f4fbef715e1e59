//! HTTP handler functions for the binday API.

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use binday_core::{ErrorResponse, PortError, PropertyRef, QueryKind};

use crate::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Query string of `/bin-collection`; which fields are required depends on the council.
#[derive(Debug, Deserialize)]
pub struct BinCollectionParams {
    uprn: Option<String>,
    postcode: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingParam {
    Uprn,
    Postcode,
    Address,
    PostcodeAndAddress,
}

impl fmt::Display for MissingParam {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingParam::Uprn => "uprn",
            MissingParam::Postcode => "postcode",
            MissingParam::Address => "address",
            MissingParam::PostcodeAndAddress => "postcode or address",
        };
        formatter.write_str(name)
    }
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse { status: "ok" })
}

/// `GET /bin-collection`
///
/// Runs the configured council's pipeline and returns the rendered schedule.
pub async fn bin_collection(
    state: web::Data<AppState>,
    params: web::Query<BinCollectionParams>,
) -> HttpResponse {
    let kind = match state.service.query_kind(&state.council) {
        Ok(kind) => kind,
        Err(err) => return error_response(&err),
    };

    let property = match property_from_params(kind, params.into_inner()) {
        Ok(property) => property,
        Err(missing) => {
            return HttpResponse::BadRequest()
                .content_type("text/plain; charset=utf-8")
                .body(format!("Bad Request: Missing {missing} parameter"));
        }
    };

    match state.service.collect(&state.council, property).await {
        Ok(schedule) => HttpResponse::Ok().json(schedule),
        Err(err) => error_response(&err),
    }
}

fn property_from_params(
    kind: QueryKind,
    params: BinCollectionParams,
) -> Result<PropertyRef, MissingParam> {
    match kind {
        QueryKind::Uprn => non_blank(params.uprn)
            .map(PropertyRef::Uprn)
            .ok_or(MissingParam::Uprn),
        QueryKind::PostcodeAddress => {
            match (non_blank(params.postcode), non_blank(params.address)) {
                (Some(postcode), Some(address)) => {
                    Ok(PropertyRef::PostcodeAddress { postcode, address })
                }
                (None, Some(_)) => Err(MissingParam::Postcode),
                (Some(_), None) => Err(MissingParam::Address),
                (None, None) => Err(MissingParam::PostcodeAndAddress),
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

fn error_response(err: &PortError) -> HttpResponse {
    let status = match err {
        PortError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    HttpResponse::build(status).json(ErrorResponse::from(err))
}
