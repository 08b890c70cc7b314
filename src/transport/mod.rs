//! gRPC transport layer for idlink.
//!
//! The canonical request/response surface is JSON: the RPC carries the
//! observation and the consolidated view as JSON bytes, so the wire schema
//! never has to chase the model types. The transport only normalizes,
//! delegates to the engine, and serializes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tonic::{Request, Response, Status};

use crate::engine::ReconciliationEngine;
use crate::error::{IdLinkError, TransportError};
use crate::observation::Observation;
use crate::storage::StorageError;
use crate::view::IdentifyResponse;

#[allow(missing_docs, clippy::pedantic)]
pub mod proto {
    //! Generated protobuf bindings.
    tonic::include_proto!("idlink");
}

use proto::identity_service_server::{IdentityService, IdentityServiceServer};

// ----------------------------------------------------------------------------
// Limits (DoS protection)
// ----------------------------------------------------------------------------

/// Maximum size of an observation JSON payload.
const MAX_REQUEST_JSON_BYTES: usize = 64 * 1024; // 64 KiB

/// Maximum size of a response JSON payload.
const MAX_RESPONSE_JSON_BYTES: usize = 4 * 1024 * 1024; // 4 MiB

/// gRPC service implementation for idlink.
pub struct IdentityServiceImpl {
    engine: Arc<ReconciliationEngine>,
}

impl IdentityServiceImpl {
    /// Creates the service over a shared engine.
    #[must_use]
    pub fn new(engine: Arc<ReconciliationEngine>) -> Self {
        Self { engine }
    }

    /// Wraps the service into a tonic server.
    #[must_use]
    pub fn into_server(self) -> IdentityServiceServer<Self> {
        IdentityServiceServer::new(self)
    }
}

/// Wire shape of the observation request.
#[derive(Debug, Deserialize)]
struct ObservationRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phonenumber: Option<String>,
}

fn invalid_argument(msg: impl Into<String>) -> Status {
    Status::invalid_argument(msg.into())
}

fn parse_request(bytes: &[u8]) -> Result<ObservationRequest, Status> {
    if bytes.is_empty() {
        return Err(invalid_argument("request_json is required"));
    }
    if bytes.len() > MAX_REQUEST_JSON_BYTES {
        return Err(invalid_argument("request_json exceeds maximum size"));
    }

    serde_json::from_slice(bytes)
        .map_err(|e| invalid_argument(format!("invalid observation JSON: {e}")))
}

fn encode_json<T: Serialize>(value: &T, max: usize) -> Result<Vec<u8>, Status> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Status::internal(format!("failed to serialize response JSON: {e}")))?;
    if bytes.len() > max {
        return Err(Status::resource_exhausted(
            "serialized JSON exceeds size limit",
        ));
    }
    Ok(bytes)
}

fn status_from_idlink_error(err: IdLinkError) -> Status {
    match err {
        IdLinkError::Validation(v) => Status::invalid_argument(v.to_string()),
        IdLinkError::Transport(t) => match &t {
            TransportError::ServerError { code, .. } if *code < 500 => {
                Status::invalid_argument(t.to_string())
            }
            _ => Status::unavailable(t.to_string()),
        },
        IdLinkError::Internal { message } => Status::internal(message),
        IdLinkError::Reconciliation(e) => match e {
            StorageError::Unavailable(_) => Status::unavailable(e.to_string()),
            StorageError::ContactNotFound(_) | StorageError::BackendError(_) => {
                Status::internal(e.to_string())
            }
        },
    }
}

#[tonic::async_trait]
impl IdentityService for IdentityServiceImpl {
    async fn identify(
        &self,
        request: Request<proto::IdentifyRequest>,
    ) -> Result<Response<proto::IdentifyReply>, Status> {
        let req = request.into_inner();
        let parsed = parse_request(&req.request_json)?;

        let observation = Observation::new(parsed.email.as_deref(), parsed.phonenumber.as_deref())
            .map_err(|e| status_from_idlink_error(IdLinkError::from(e)))?;

        // The engine call is synchronous and the in-memory backend holds a
        // lock for the transaction; run it off the async executor.
        let engine = Arc::clone(&self.engine);
        let contact = tokio::task::spawn_blocking(move || engine.reconcile(&observation))
            .await
            .map_err(|e| Status::internal(format!("reconcile task failed: {e}")))?
            .map_err(status_from_idlink_error)?;

        let response = IdentifyResponse::from(contact);
        let response_json = encode_json(&response, MAX_RESPONSE_JSON_BYTES)?;
        Ok(Response::new(proto::IdentifyReply { response_json }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tonic::Request;

    use crate::storage::InMemoryContactStore;

    fn make_service() -> IdentityServiceImpl {
        let store = Arc::new(InMemoryContactStore::new());
        let engine = Arc::new(ReconciliationEngine::new(store));
        IdentityServiceImpl::new(engine)
    }

    fn identify_request(body: serde_json::Value) -> proto::IdentifyRequest {
        proto::IdentifyRequest {
            request_json: serde_json::to_vec(&body).unwrap(),
        }
    }

    #[tokio::test]
    async fn identify_returns_consolidated_json() {
        let svc = make_service();

        let req = identify_request(serde_json::json!({
            "email": "a@x.com",
            "phonenumber": "1"
        }));
        let resp = svc.identify(Request::new(req)).await.unwrap().into_inner();

        let v: serde_json::Value = serde_json::from_slice(&resp.response_json).unwrap();
        assert_eq!(v["contact"]["primaryContactId"], 1);
        assert_eq!(v["contact"]["emails"][0], "a@x.com");
        assert_eq!(v["contact"]["phonenumbers"][0], "1");
        assert_eq!(v["contact"]["secondaryContactIds"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn identify_links_follow_up_observations() {
        let svc = make_service();

        let first = identify_request(serde_json::json!({ "email": "a@x.com" }));
        svc.identify(Request::new(first)).await.unwrap();

        let second = identify_request(serde_json::json!({
            "email": "a@x.com",
            "phonenumber": "1"
        }));
        let resp = svc
            .identify(Request::new(second))
            .await
            .unwrap()
            .into_inner();

        let v: serde_json::Value = serde_json::from_slice(&resp.response_json).unwrap();
        assert_eq!(v["contact"]["primaryContactId"], 1);
        assert_eq!(v["contact"]["secondaryContactIds"], serde_json::json!([2]));
    }

    #[tokio::test]
    async fn empty_observation_is_invalid_argument() {
        let svc = make_service();

        let req = identify_request(serde_json::json!({}));
        let status = svc.identify(Request::new(req)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert!(status.message().contains("email or a phone number"));
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_argument() {
        let svc = make_service();

        let req = proto::IdentifyRequest {
            request_json: b"{not json".to_vec(),
        };
        let status = svc.identify(Request::new(req)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn empty_body_is_invalid_argument() {
        let svc = make_service();

        let req = proto::IdentifyRequest {
            request_json: Vec::new(),
        };
        let status = svc.identify(Request::new(req)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn storage_failures_map_to_server_statuses() {
        let status = status_from_idlink_error(IdLinkError::Reconciliation(
            StorageError::Unavailable("down".to_string()),
        ));
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status = status_from_idlink_error(IdLinkError::Reconciliation(
            StorageError::BackendError("corrupt".to_string()),
        ));
        assert_eq!(status.code(), tonic::Code::Internal);
    }
}

pub use proto::identity_service_client::IdentityServiceClient;
