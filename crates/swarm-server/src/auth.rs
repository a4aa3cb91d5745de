//! Actor identity.
//!
//! Authentication itself happens upstream (token issuance and validation
//! are outside this crate); the trusted proxy forwards the token subject
//! in the `x-actor-sub` header. Requests without the header are treated as
//! the human operator.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

use swarm_core::errors::ApiError;

use crate::errors::ServerError;

/// Header carrying the authenticated token subject.
pub const ACTOR_SUB_HEADER: &str = "x-actor-sub";

/// Token subject used by agents calling back into the API.
pub const AGENT_SERVICE_SUB: &str = "agent-service";

/// The authenticated caller of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    /// Token subject.
    pub sub: String,
}

impl Actor {
    /// Whether this caller is the shared agent-service identity.
    #[must_use]
    pub fn is_agent_service(&self) -> bool {
        self.sub == AGENT_SERVICE_SUB
    }

    /// Reject agents from operator-only operations (pause/resume/destroy
    /// of peers, guardrail administration).
    pub fn require_operator(&self, operation: &str) -> Result<(), ServerError> {
        if self.is_agent_service() {
            return Err(ServerError(ApiError::forbidden(format!(
                "agents may not {operation}"
            ))));
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let sub = parts
            .headers
            .get(ACTOR_SUB_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("operator")
            .to_owned();
        Ok(Self { sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_service_detection() {
        let agent = Actor {
            sub: AGENT_SERVICE_SUB.into(),
        };
        assert!(agent.is_agent_service());
        assert!(agent.require_operator("destroy peers").is_err());

        let operator = Actor {
            sub: "operator".into(),
        };
        assert!(!operator.is_agent_service());
        assert!(operator.require_operator("destroy peers").is_ok());
    }

    #[tokio::test]
    async fn extracts_header_or_defaults() {
        let request = axum::http::Request::builder()
            .header(ACTOR_SUB_HEADER, "agent-service")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let actor = Actor::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(actor.sub, "agent-service");

        let request = axum::http::Request::builder().body(()).unwrap();
        let (mut parts, ()) = request.into_parts();
        let actor = Actor::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(actor.sub, "operator");
    }
}
