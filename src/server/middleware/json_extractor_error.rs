use actix_web::error::JsonPayloadError;
use actix_web::HttpRequest;
use log::debug;

use crate::server::handler::ApiError;

/// Convert errors of the json extractor into the api error json
pub(crate) fn json_extractor_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("Json extraction error: {err}");

    ApiError::EmptyJson.into()
}
