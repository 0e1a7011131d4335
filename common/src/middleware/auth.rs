//! Principal resolution.
//!
//! Token issuance lives elsewhere. This middleware only maps an
//! `Authorization: Bearer` token to a [`Principal`] through a
//! [`PrincipalResolver`] and leaves the decision about what that principal
//! may do to the handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;

/// Role carried by an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Agent,
    User,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "agent" => Ok(Role::Agent),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable identity of the caller.
    pub subject: String,
    pub role: Role,
}

impl Principal {
    /// Fails with `Forbidden` unless the principal holds `role`.
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("{:?} access required", role)))
        }
    }
}

/// Maps bearer tokens to principals.
pub trait PrincipalResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Option<Principal>;
}

/// Resolver backed by a fixed token table.
#[derive(Debug, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenResolver {
    /// Builds the table from `token:subject:role` entries.
    ///
    /// Malformed entries are skipped with a warning.
    pub fn from_entries(entries: &[String]) -> Self {
        let mut tokens = HashMap::new();
        for entry in entries {
            let parts: Vec<&str> = entry.splitn(3, ':').collect();
            let parsed = match parts.as_slice() {
                [token, subject, role] if !token.is_empty() && !subject.is_empty() => role
                    .parse::<Role>()
                    .map(|role| {
                        (
                            token.to_string(),
                            Principal {
                                subject: subject.to_string(),
                                role,
                            },
                        )
                    })
                    .ok(),
                _ => None,
            };
            match parsed {
                Some((token, principal)) => {
                    tokens.insert(token, principal);
                }
                None => tracing::warn!("Skipping malformed API token entry"),
            }
        }
        Self { tokens }
    }
}

impl PrincipalResolver for StaticTokenResolver {
    fn resolve(&self, token: &str) -> Option<Principal> {
        self.tokens.get(token).cloned()
    }
}

/// Resolves the caller and stores `Option<Principal>` in the request
/// extensions. Never rejects: anonymous requests continue without one.
pub async fn auth_middleware(
    State(resolver): State<Arc<dyn PrincipalResolver>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let principal = extract_bearer_token(&req).and_then(|token| resolver.resolve(token));
    if let Some(p) = &principal {
        tracing::debug!(subject = %p.subject, role = ?p.role, "Principal resolved");
    }
    req.extensions_mut().insert(principal);
    next.run(req).await
}

/// Extract bearer token from Authorization header.
pub fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Extractor for handlers that need an authenticated caller.
///
/// Rejects with `Unauthorized` when no principal was resolved.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Option<Principal>>()
            .cloned()
            .flatten()
            .map(Authenticated)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> StaticTokenResolver {
        StaticTokenResolver::from_entries(&[
            "root-token:ops:admin".to_string(),
            "agent-token:alice:agent".to_string(),
            "broken".to_string(),
            "x:y:wizard".to_string(),
        ])
    }

    #[test]
    fn test_resolves_known_tokens() {
        let r = resolver();
        let admin = r.resolve("root-token").unwrap();
        assert_eq!(admin.subject, "ops");
        assert_eq!(admin.role, Role::Admin);
        assert!(r.resolve("agent-token").is_some());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let r = resolver();
        assert!(r.resolve("broken").is_none());
        assert!(r.resolve("x").is_none());
    }

    #[test]
    fn test_require_role() {
        let agent = Principal {
            subject: "alice".into(),
            role: Role::Agent,
        };
        assert!(matches!(
            agent.require_role(Role::Admin),
            Err(AppError::Forbidden(_))
        ));
        let admin = Principal {
            subject: "ops".into(),
            role: Role::Admin,
        };
        assert!(admin.require_role(Role::Admin).is_ok());
    }
}
