//! Parsing of composite instance location identifiers.
//!
//! Every live instance is addressed by a location string of the form
//! `world-id:instance-number~modifier(...)~flag`, for example
//! `wrld_abc:12345~private(usr_1)~canRequestInvite~region(eu)`.
//!
//! Parsing is a pure function: it never touches the registry or the network,
//! and identical input always yields an identical [`Location`].
//!
//! ## Recognized modifiers
//!
//! * `hidden(owner)`, `friends(owner)`, `private(owner)` - access class and owner
//! * `region(xx)`, `nonce(...)` - auxiliary fields, empty when absent
//! * `canRequestInvite` - only meaningful for `private` instances
//! * `strict` - only meaningful for `friends` and `private` instances
//!
//! Unrecognized modifiers are skipped so newer clients can add their own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a location string.
///
/// Every variant is a caller fault and surfaces as `MalformedLocation`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location `{0}` is missing the ':' separator")]
    MissingSeparator(String),

    #[error("location has an empty world id")]
    EmptyWorld,

    #[error("location has an empty instance number")]
    EmptyInstance,

    #[error("modifier `{0}` is not closed")]
    UnclosedModifier(String),

    #[error("modifier `{0}` requires a non-empty owner")]
    MissingOwner(String),

    #[error("location declares more than one access modifier")]
    ConflictingAccess,

    #[error("unknown instance type: {0}")]
    UnknownInstanceType(String),
}

/// Access class of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    #[default]
    Public,
    Hidden,
    Friends,
    Private,
}

impl InstanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceType::Public => "public",
            InstanceType::Hidden => "hidden",
            InstanceType::Friends => "friends",
            InstanceType::Private => "private",
        }
    }

    /// Every class except `public` is bound to an owning user.
    pub fn requires_owner(&self) -> bool {
        !matches!(self, InstanceType::Public)
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceType {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(InstanceType::Public),
            "hidden" => Ok(InstanceType::Hidden),
            "friends" => Ok(InstanceType::Friends),
            "private" => Ok(InstanceType::Private),
            other => Err(LocationError::UnknownInstanceType(other.to_string())),
        }
    }
}

/// Structured form of a location string.
///
/// A `Location` is a plain value owned by whichever call produced it; it is
/// never shared or mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// World prefix before the first `:`
    pub world_id: String,
    /// Bare instance number, the remainder up to the first `~`
    pub instance_number: String,
    /// Everything after the world prefix, modifiers included
    pub location_string: String,
    pub instance_type: InstanceType,
    /// Owning user, empty for public instances
    pub owner_id: String,
    pub nonce: String,
    pub region: String,
    pub can_request_invite: bool,
    pub is_strict: bool,
}

/// One `~`-separated segment after the instance number.
enum Modifier<'a> {
    Access(InstanceType, &'a str),
    Region(&'a str),
    Nonce(&'a str),
    CanRequestInvite,
    Strict,
    Unknown,
}

impl<'a> Modifier<'a> {
    fn parse(segment: &'a str) -> Result<Self, LocationError> {
        match segment {
            "canRequestInvite" => return Ok(Modifier::CanRequestInvite),
            "strict" => return Ok(Modifier::Strict),
            "hidden" | "friends" | "private" => {
                return Err(LocationError::MissingOwner(segment.to_string()))
            }
            _ => {}
        }

        let Some((name, rest)) = segment.split_once('(') else {
            return Ok(Modifier::Unknown);
        };
        let value = rest
            .strip_suffix(')')
            .ok_or_else(|| LocationError::UnclosedModifier(segment.to_string()))?;

        match name {
            "hidden" | "friends" | "private" => {
                if value.is_empty() {
                    return Err(LocationError::MissingOwner(name.to_string()));
                }
                Ok(Modifier::Access(name.parse()?, value))
            }
            "region" => Ok(Modifier::Region(value)),
            "nonce" => Ok(Modifier::Nonce(value)),
            _ => Ok(Modifier::Unknown),
        }
    }
}

impl Location {
    /// Parses a location string.
    ///
    /// All modifiers are collected in a single forward pass; the access class
    /// and owner are settled before the class-specific flags are evaluated, so
    /// `~strict~friends(usr_1)` and `~friends(usr_1)~strict` parse identically.
    pub fn parse(input: &str) -> Result<Self, LocationError> {
        let (world_id, remainder) = input
            .split_once(':')
            .ok_or_else(|| LocationError::MissingSeparator(input.to_string()))?;
        if world_id.is_empty() {
            return Err(LocationError::EmptyWorld);
        }

        let mut segments = remainder.split('~');
        let instance_number = segments.next().unwrap_or_default();
        if instance_number.is_empty() {
            return Err(LocationError::EmptyInstance);
        }

        let mut access: Option<(InstanceType, &str)> = None;
        let mut region = "";
        let mut nonce = "";
        let mut wants_invite = false;
        let mut wants_strict = false;

        for segment in segments.filter(|s| !s.is_empty()) {
            match Modifier::parse(segment)? {
                Modifier::Access(instance_type, owner) => {
                    if access.is_some() {
                        return Err(LocationError::ConflictingAccess);
                    }
                    access = Some((instance_type, owner));
                }
                Modifier::Region(value) => region = value,
                Modifier::Nonce(value) => nonce = value,
                Modifier::CanRequestInvite => wants_invite = true,
                Modifier::Strict => wants_strict = true,
                Modifier::Unknown => {}
            }
        }

        let (instance_type, owner_id) = access.unwrap_or((InstanceType::Public, ""));

        Ok(Self {
            world_id: world_id.to_string(),
            instance_number: instance_number.to_string(),
            location_string: remainder.to_string(),
            instance_type,
            owner_id: owner_id.to_string(),
            nonce: nonce.to_string(),
            region: region.to_string(),
            can_request_invite: wants_invite && instance_type == InstanceType::Private,
            is_strict: wants_strict
                && matches!(instance_type, InstanceType::Friends | InstanceType::Private),
        })
    }

    /// The full identifier, world prefix included.
    pub fn full(&self) -> String {
        format!("{}:{}", self.world_id, self.location_string)
    }
}

impl FromStr for Location {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::parse(s)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.world_id, self.location_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_private_with_flags() {
        let location =
            Location::parse("wrld_abc:12345~private(usr_1)~canRequestInvite~strict").unwrap();

        assert_eq!(location.world_id, "wrld_abc");
        assert_eq!(location.instance_number, "12345");
        assert_eq!(location.instance_type, InstanceType::Private);
        assert_eq!(location.owner_id, "usr_1");
        assert!(location.can_request_invite);
        assert!(location.is_strict);
        assert_eq!(
            location.location_string,
            "12345~private(usr_1)~canRequestInvite~strict"
        );
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        assert_eq!(
            Location::parse("not-a-location"),
            Err(LocationError::MissingSeparator("not-a-location".to_string()))
        );
    }

    #[test]
    fn test_bare_instance_is_public() {
        let location = Location::parse("wrld_abc:777").unwrap();
        assert_eq!(location.instance_type, InstanceType::Public);
        assert_eq!(location.owner_id, "");
        assert_eq!(location.region, "");
        assert_eq!(location.nonce, "");
        assert!(!location.can_request_invite);
        assert!(!location.is_strict);
    }

    #[test]
    fn test_flags_before_access_modifier() {
        let early = Location::parse("wrld_abc:1~strict~canRequestInvite~private(usr_2)").unwrap();
        let late = Location::parse("wrld_abc:1~private(usr_2)~strict~canRequestInvite").unwrap();

        assert!(early.is_strict);
        assert!(early.can_request_invite);
        assert_eq!(early.instance_type, late.instance_type);
        assert_eq!(early.owner_id, late.owner_id);
        assert_eq!(early.is_strict, late.is_strict);
        assert_eq!(early.can_request_invite, late.can_request_invite);
    }

    #[test]
    fn test_flags_gated_by_instance_type() {
        let friends = Location::parse("wrld_abc:1~friends(usr_1)~canRequestInvite~strict").unwrap();
        assert!(!friends.can_request_invite);
        assert!(friends.is_strict);

        let hidden = Location::parse("wrld_abc:1~hidden(usr_1)~strict").unwrap();
        assert!(!hidden.is_strict);

        let public = Location::parse("wrld_abc:1~strict~canRequestInvite").unwrap();
        assert!(!public.is_strict);
        assert!(!public.can_request_invite);
    }

    #[test]
    fn test_region_and_nonce() {
        let location = Location::parse("wrld_abc:42~hidden(usr_3)~region(eu)~nonce(f00d)").unwrap();
        assert_eq!(location.instance_type, InstanceType::Hidden);
        assert_eq!(location.region, "eu");
        assert_eq!(location.nonce, "f00d");
    }

    #[test]
    fn test_rejects_bad_modifiers() {
        assert_eq!(
            Location::parse("wrld_abc:1~private(usr_1"),
            Err(LocationError::UnclosedModifier("private(usr_1".to_string()))
        );
        assert_eq!(
            Location::parse("wrld_abc:1~friends()"),
            Err(LocationError::MissingOwner("friends".to_string()))
        );
        assert_eq!(
            Location::parse("wrld_abc:1~private"),
            Err(LocationError::MissingOwner("private".to_string()))
        );
        assert_eq!(
            Location::parse("wrld_abc:1~hidden(usr_1)~private(usr_2)"),
            Err(LocationError::ConflictingAccess)
        );
        assert_eq!(Location::parse(":1"), Err(LocationError::EmptyWorld));
        assert_eq!(Location::parse("wrld_abc:"), Err(LocationError::EmptyInstance));
        assert_eq!(
            Location::parse("wrld_abc:~private(usr_1)"),
            Err(LocationError::EmptyInstance)
        );
    }

    #[test]
    fn test_unknown_modifiers_are_skipped() {
        let location = Location::parse("wrld_abc:9~group(grp_1)~private(usr_1)~shiny").unwrap();
        assert_eq!(location.instance_type, InstanceType::Private);
        assert_eq!(location.owner_id, "usr_1");
    }

    #[test]
    fn test_parse_is_pure() {
        let input = "wrld_abc:5~friends(usr_1)~region(us)";
        assert_eq!(Location::parse(input), Location::parse(input));
    }

    #[test]
    fn test_display_restores_identifier() {
        let input = "wrld_abc:5~friends(usr_1)~strict~region(us)";
        let location: Location = input.parse().unwrap();
        assert_eq!(location.to_string(), input);
        assert_eq!(location.full(), input);
    }

    #[test]
    fn test_instance_type_round_trip_names() {
        for name in ["public", "hidden", "friends", "private"] {
            let parsed: InstanceType = name.parse().unwrap();
            assert_eq!(parsed.as_str(), name);
        }
        assert!("group".parse::<InstanceType>().is_err());
    }
}
