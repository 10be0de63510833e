//! Extension JWT claims and roles.

use serde::{Deserialize, Serialize};

/// Role carried by an extension token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Channel owner.
    Broadcaster,
    /// Channel moderator.
    Moderator,
    /// Regular viewer.
    Viewer,
    /// Backend service acting on behalf of the extension.
    External,
    /// Anything this relay does not know about.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Broadcaster => write!(f, "broadcaster"),
            Role::Moderator => write!(f, "moderator"),
            Role::Viewer => write!(f, "viewer"),
            Role::External => write!(f, "external"),
            Role::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "broadcaster" => Ok(Role::Broadcaster),
            "moderator" => Ok(Role::Moderator),
            "viewer" => Ok(Role::Viewer),
            "external" => Ok(Role::External),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// Delegated pubsub permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubSubPerms {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub send: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listen: Vec<String>,
}

impl PubSubPerms {
    /// Permission to send to every target.
    pub fn send_all() -> Self {
        Self {
            send: vec!["*".to_string()],
            listen: Vec::new(),
        }
    }
}

/// Claims of an extension token.
///
/// Inbound tokens are minted by the extension host for broadcasters and
/// viewers; outbound tokens are minted here with [`Role::External`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time (as Unix timestamp).
    pub exp: i64,

    /// Real user id, present when the viewer shared their identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Opaque per-extension user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opaque_user_id: Option<String>,

    pub role: Role,

    /// Channel the token is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubsub_perms: Option<PubSubPerms>,
}

impl Claims {
    /// Claims for an outbound call scoped to a single channel.
    pub fn external(channel_id: &str, exp: i64) -> Self {
        Self {
            exp,
            user_id: Some(channel_id.to_string()),
            opaque_user_id: None,
            role: Role::External,
            channel_id: Some(channel_id.to_string()),
            pubsub_perms: Some(PubSubPerms::send_all()),
        }
    }

    pub fn is_broadcaster(&self) -> bool {
        self.role == Role::Broadcaster
    }

    /// Channel id, treating an empty claim as absent.
    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Whether the token identifies `user_id`, by real or opaque id.
    pub fn identifies(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id) || self.opaque_user_id.as_deref() == Some(user_id)
    }
}
