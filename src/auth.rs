use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub type OrgId = String;

/// Resolves the organization of the client that submitted the invocation.
pub trait IdentityResolver {
    fn client_org_id(&self) -> Result<OrgId, IdentityError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invocation carries no client identity")]
    MissingIdentity,
    #[error("client identity has an empty org ID")]
    EmptyOrgId,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("failed to get verified client org ID: {0}")]
    Identity(#[from] IdentityError),
    #[error(
        "client from org {client_org} is not authorized to read or write private data from an org {peer_org} peer"
    )]
    OrgMismatch { client_org: OrgId, peer_org: OrgId },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("peer org ID must not be empty")]
    EmptyPeerOrg,
    #[error("invalid peer configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Deployment configuration of the local peer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerConfig {
    pub peer_org_id: OrgId,
}

impl PeerConfig {
    pub fn new(peer_org_id: impl Into<OrgId>) -> Result<Self, ConfigError> {
        let config = Self {
            peer_org_id: peer_org_id.into(),
        };
        config.validate()
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.peer_org_id.is_empty() {
            return Err(ConfigError::EmptyPeerOrg);
        }
        Ok(self)
    }
}

/// Lets through only clients of the peer's own organization.
#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    config: PeerConfig,
}

impl AuthorizationGuard {
    pub fn new(config: PeerConfig) -> Self {
        Self { config }
    }

    pub fn peer_org_id(&self) -> &str {
        &self.config.peer_org_id
    }

    /// Returns the client org when it is exactly the peer org.
    pub fn authorize(
        &self,
        identity: &impl IdentityResolver,
    ) -> Result<OrgId, AuthorizationError> {
        let client_org = identity.client_org_id().inspect_err(|err| {
            warn!(peer_org = %self.config.peer_org_id, "unresolved client identity: {err}");
        })?;
        if client_org != self.config.peer_org_id {
            warn!(%client_org, peer_org = %self.config.peer_org_id, "client org does not match peer org");
            return Err(AuthorizationError::OrgMismatch {
                client_org,
                peer_org: self.config.peer_org_id.clone(),
            });
        }
        Ok(client_org)
    }
}
