//! Service health.

use serde::Deserialize;

use crate::classify::json_model;
use crate::client::Tmv1Client;
use crate::request::ApiRequest;
use crate::result::ApiResult;

/// Connectivity status reported by the API (`"available"` when reachable).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectivityResp {
    pub status: String,
}

json_model!(ConnectivityResp);

/// Checks that the API is reachable and the token is accepted.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors (e.g. a rejected token) are returned as `ApiResult::Failure`.
pub async fn check_connectivity(
    client: &Tmv1Client,
) -> crate::error::Result<ApiResult<ConnectivityResp>> {
    client
        .send(ApiRequest::get("/healthcheck/connectivity"))
        .await
}
