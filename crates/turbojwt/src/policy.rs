//! Claims policy: issuer, token use, expiry, client id and required roles
//!
//! [`check_claims`] applies the rules in a fixed order and reports the first
//! failure:
//!
//! 1. `iss` equals [`ClaimsPolicy::issuer`]
//! 2. `token_use` equals [`ClaimsPolicy::token_use`]
//! 3. `exp` is not before `now` (whole seconds)
//! 4. the subject id (`client_id` for access tokens, `aud` for ID tokens) is
//!    one of [`ClaimsPolicy::client_ids`]
//! 5. every OR-group of [`ClaimsPolicy::roles`] shares a role with the token
//!
//! Only the role check yields a forbidden error; everything else is
//! unauthorized.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AuthError, AuthResult};
use crate::jwt::{TOKEN_USE_ACCESS, TOKEN_USE_ID, TokenClaims, TokenUse};

/// Required roles as an AND of OR-groups.
///
/// `RoleRequirement::new().any_of(["admin", "owner"]).any_of(["billing"])`
/// means "(admin or owner) and billing". The textual form is groups separated
/// by `;` and alternatives by `,`: `admin,owner;billing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleRequirement {
    groups: Vec<Vec<String>>,
}

impl RoleRequirement {
    /// No role constraint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group satisfied by any one of `roles`.
    ///
    /// An empty group can never be satisfied, so every token fails the check.
    #[must_use]
    pub fn any_of<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .push(roles.into_iter().map(Into::into).collect());
        self
    }

    /// The OR-groups, in order.
    #[must_use]
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// True when no role is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Check `roles` against every group.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingRole`] naming the first group `roles` does not
    /// intersect.
    pub fn check(&self, roles: &[String]) -> AuthResult<()> {
        match self
            .groups
            .iter()
            .find(|group| !group.iter().any(|required| roles.contains(required)))
        {
            Some(group) => Err(AuthError::MissingRole {
                group: group.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// A textual role requirement with a group that names no role.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("role group {position} in {input:?} names no role")]
pub struct RoleParseError {
    /// One-based position of the empty group
    pub position: usize,
    /// The rejected input
    pub input: String,
}

impl FromStr for RoleRequirement {
    type Err = RoleParseError;

    /// Parse `admin,owner;billing`. Blank input means no requirement; blank
    /// names are dropped, but a group left with no name is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::new());
        }
        s.split(';')
            .enumerate()
            .try_fold(Self::new(), |requirement, (i, group)| {
                let roles: Vec<&str> = group
                    .split(',')
                    .map(str::trim)
                    .filter(|role| !role.is_empty())
                    .collect();
                if roles.is_empty() {
                    return Err(RoleParseError {
                        position: i + 1,
                        input: s.to_string(),
                    });
                }
                Ok(requirement.any_of(roles))
            })
    }
}

impl fmt::Display for RoleRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            f.write_str(&group.join(","))?;
        }
        Ok(())
    }
}

/// What a token must satisfy to be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsPolicy {
    /// Expected `iss`
    pub issuer: String,
    /// Expected `token_use` (`access` or `id`)
    pub token_use: String,
    /// Accepted client ids
    #[serde(default)]
    pub client_ids: BTreeSet<String>,
    /// Required roles
    #[serde(default)]
    pub roles: RoleRequirement,
}

impl ClaimsPolicy {
    /// Policy for `issuer` and `token_use`, with no accepted client yet.
    pub fn new(issuer: impl Into<String>, token_use: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            token_use: token_use.into(),
            client_ids: BTreeSet::new(),
            roles: RoleRequirement::new(),
        }
    }

    /// Policy accepting access tokens from `issuer`.
    pub fn access(issuer: impl Into<String>) -> Self {
        Self::new(issuer, TOKEN_USE_ACCESS)
    }

    /// Policy accepting ID tokens from `issuer`.
    pub fn id(issuer: impl Into<String>) -> Self {
        Self::new(issuer, TOKEN_USE_ID)
    }

    /// Accept tokens issued to `client_id`.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_ids.insert(client_id.into());
        self
    }

    /// Accept tokens issued to any of `client_ids`.
    #[must_use]
    pub fn client_ids<I, S>(mut self, client_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.client_ids
            .extend(client_ids.into_iter().map(Into::into));
        self
    }

    /// Require at least one of `roles`, in addition to earlier groups.
    ///
    /// With no roles the policy rejects every token as forbidden.
    #[must_use]
    pub fn require_any<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = self.roles.any_of(roles);
        self
    }

    /// Replace the role requirement.
    #[must_use]
    pub fn with_roles(mut self, roles: RoleRequirement) -> Self {
        self.roles = roles;
        self
    }

    /// Shorthand for [`check_claims`].
    ///
    /// # Errors
    ///
    /// See [`check_claims`].
    pub fn check(&self, claims: &TokenClaims, now: DateTime<Utc>) -> AuthResult<()> {
        check_claims(claims, self, now)
    }
}

/// Check decoded claims against `policy` at time `now`.
///
/// # Errors
///
/// The first failing rule, in order: [`AuthError::InvalidIssuer`],
/// [`AuthError::InvalidTokenUse`], [`AuthError::Expired`],
/// [`AuthError::UnknownTokenUse`] / [`AuthError::InvalidClientId`], then
/// [`AuthError::MissingRole`].
pub fn check_claims(
    claims: &TokenClaims,
    policy: &ClaimsPolicy,
    now: DateTime<Utc>,
) -> AuthResult<()> {
    if claims.issuer != policy.issuer {
        return Err(AuthError::InvalidIssuer);
    }
    if claims.token_use.as_str() != policy.token_use {
        return Err(AuthError::InvalidTokenUse);
    }
    if claims.expiry < now.timestamp() {
        return Err(AuthError::Expired);
    }

    // token_use already matches, so the variant agrees with the policy
    let subject = match (policy.token_use.as_str(), &claims.token_use) {
        (TOKEN_USE_ACCESS, TokenUse::Access { client_id }) => client_id,
        (TOKEN_USE_ID, TokenUse::Id { audience }) => audience,
        _ => return Err(AuthError::UnknownTokenUse(policy.token_use.clone())),
    };
    if !policy.client_ids.contains(subject) {
        return Err(AuthError::InvalidClientId);
    }

    policy.roles.check(&claims.roles)
}
