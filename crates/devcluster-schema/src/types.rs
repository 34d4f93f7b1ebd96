//! Runtime selection and cluster naming types.
//!
//! `ContainerRuntime` is what a user asks for (`auto` included); `ResolvedRuntime`
//! is what a command actually runs with. Only the latter is accepted by anything
//! that spawns `kind`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown container runtime '{0}', expected one of: auto, docker, podman")]
pub struct ParseRuntimeError(pub String);

/// Requested container runtime. `Auto` asks for host detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    #[default]
    Auto,
    Docker,
    Podman,
}

impl ContainerRuntime {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// The concrete runtime, or `None` when detection is still required.
    pub fn resolved(self) -> Option<ResolvedRuntime> {
        match self {
            Self::Auto => None,
            Self::Docker => Some(ResolvedRuntime::Docker),
            Self::Podman => Some(ResolvedRuntime::Podman),
        }
    }
}

impl fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerRuntime {
    type Err = ParseRuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "auto" => Ok(Self::Auto),
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            other => Err(ParseRuntimeError(other.to_owned())),
        }
    }
}

impl From<ResolvedRuntime> for ContainerRuntime {
    fn from(r: ResolvedRuntime) -> Self {
        match r {
            ResolvedRuntime::Docker => Self::Docker,
            ResolvedRuntime::Podman => Self::Podman,
        }
    }
}

/// A container runtime that has been selected or detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedRuntime {
    Docker,
    Podman,
}

impl ResolvedRuntime {
    /// Detection order. Podman wins when both are installed.
    pub const PREFERENCE: [ResolvedRuntime; 2] = [ResolvedRuntime::Podman, ResolvedRuntime::Docker];

    /// Name of the executable looked up on `PATH`.
    pub fn executable(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// kind only drives podman behind its experimental provider switch.
    pub fn is_experimental(self) -> bool {
        matches!(self, Self::Podman)
    }
}

impl fmt::Display for ResolvedRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Name of a kind cluster: lowercase alphanumerics, `-` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterName(String);

impl ClusterName {
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        if s.is_empty() {
            return Err("cluster name must not be empty".to_owned());
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
        {
            return Err(format!(
                "invalid character {c:?} in cluster name '{s}' (allowed: a-z, 0-9, '-', '.')"
            ));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ClusterName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClusterName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ClusterName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl TryFrom<String> for ClusterName {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ClusterName {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ClusterName> for String {
    fn from(n: ClusterName) -> Self {
        n.0
    }
}

impl FromStr for ClusterName {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
