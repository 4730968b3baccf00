//! Instance documents as held by the registry store.

use crate::error::RegistryError;
use crate::location::{InstanceType, Location};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Client platform an occupant joined from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Pc,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Pc => "pc",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pc" => Ok(Platform::Pc),
            "android" => Ok(Platform::Android),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Occupancy counters. `total` always tracks `players.len()` after a
/// successful mutation; the per-platform counters are informational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCount {
    pub total: i64,
    pub pc: i64,
    pub android: i64,
}

/// A user barred from (re)joining an instance until a given epoch second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedPlayer {
    pub user_id: String,
    pub blocked_until: i64,
}

/// One live, joinable session of a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Stable identifier, immutable once registered
    pub id: String,
    /// Composite identifier as clients see it
    pub location_string: String,
    pub world_id: String,
    pub instance_type: InstanceType,
    pub owner_id: String,
    pub capacity: u32,
    /// Set by the store whenever `player_count.total` reaches `capacity`
    pub over_capacity: bool,
    pub player_count: PlayerCount,
    /// Occupants in join order
    pub players: Vec<String>,
    pub blocked_players: Vec<BlockedPlayer>,
    /// Epoch seconds of the last membership change or keep-alive
    pub last_activity: i64,
}

impl Instance {
    /// Builds a fresh, empty document from a registration.
    pub fn new(registration: Registration, now: i64) -> Self {
        Self {
            id: registration.id,
            location_string: registration.location_string,
            world_id: registration.world_id,
            instance_type: registration.instance_type,
            owner_id: registration.owner_id,
            capacity: registration.capacity,
            over_capacity: false,
            player_count: PlayerCount::default(),
            players: Vec::new(),
            blocked_players: Vec::new(),
            last_activity: now,
        }
    }

    pub fn has_player(&self, user_id: &str) -> bool {
        self.players.iter().any(|p| p == user_id)
    }

    /// Whether `user_id` carries a block that has not yet lapsed at `now`.
    pub fn is_blocked(&self, user_id: &str, now: i64) -> bool {
        self.blocked_players
            .iter()
            .any(|b| b.user_id == user_id && b.blocked_until > now)
    }

    /// Derived occupancy flag, the rule the store applies to `over_capacity`.
    pub fn compute_over_capacity(total: i64, capacity: u32) -> bool {
        total >= i64::from(capacity)
    }

    /// Whether the membership counter and list agree.
    pub fn is_consistent(&self) -> bool {
        self.player_count.total == self.players.len() as i64
    }
}

/// Input to `register`. World, type, owner and capacity are part of the
/// instance's identity and are never updated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: String,
    pub location_string: String,
    pub world_id: String,
    pub instance_type: InstanceType,
    pub owner_id: String,
    pub capacity: u32,
}

impl Registration {
    pub fn new(
        id: impl Into<String>,
        location_string: impl Into<String>,
        world_id: impl Into<String>,
        instance_type: InstanceType,
        owner_id: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            location_string: location_string.into(),
            world_id: world_id.into(),
            instance_type,
            owner_id: owner_id.into(),
            capacity,
        }
    }

    /// Derives world, type and owner from a parsed location. The instance id
    /// and the client-facing location string are both the full identifier.
    pub fn from_location(location: &Location, capacity: u32) -> Self {
        let full = location.full();
        Self {
            id: full.clone(),
            location_string: full,
            world_id: location.world_id.clone(),
            instance_type: location.instance_type,
            owner_id: location.owner_id.clone(),
            capacity,
        }
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.id.is_empty() {
            return Err(RegistryError::InvalidInstance("instance id is empty".into()));
        }
        if self.world_id.is_empty() {
            return Err(RegistryError::InvalidInstance("world id is empty".into()));
        }
        if self.capacity == 0 {
            return Err(RegistryError::InvalidInstance(
                "capacity must be at least 1".into(),
            ));
        }
        if self.instance_type.requires_owner() && self.owner_id.is_empty() {
            return Err(RegistryError::InvalidInstance(format!(
                "{} instance requires an owner",
                self.instance_type
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration::new(
            "wrld_X:inst_1",
            "wrld_X:inst_1",
            "wrld_X",
            InstanceType::Public,
            "",
            16,
        )
    }

    #[test]
    fn test_new_instance_is_empty() {
        let instance = Instance::new(registration(), 1_000);
        assert!(instance.players.is_empty());
        assert!(instance.blocked_players.is_empty());
        assert_eq!(instance.player_count, PlayerCount::default());
        assert_eq!(instance.last_activity, 1_000);
        assert!(!instance.over_capacity);
        assert!(instance.is_consistent());
    }

    #[test]
    fn test_registration_requires_owner_for_non_public() {
        let mut reg = registration();
        reg.instance_type = InstanceType::Friends;
        assert!(matches!(reg.validate(), Err(RegistryError::InvalidInstance(_))));

        reg.owner_id = "usr_1".into();
        assert!(reg.validate().is_ok());
    }

    #[test]
    fn test_registration_rejects_zero_capacity() {
        let mut reg = registration();
        reg.capacity = 0;
        assert!(reg.validate().is_err());
    }

    #[test]
    fn test_registration_from_location() {
        let location = Location::parse("wrld_X:99~private(usr_7)~region(jp)").unwrap();
        let reg = Registration::from_location(&location, 8);
        assert_eq!(reg.id, "wrld_X:99~private(usr_7)~region(jp)");
        assert_eq!(reg.world_id, "wrld_X");
        assert_eq!(reg.instance_type, InstanceType::Private);
        assert_eq!(reg.owner_id, "usr_7");
        assert_eq!(reg.capacity, 8);
    }

    #[test]
    fn test_block_expiry() {
        let mut instance = Instance::new(registration(), 0);
        instance.blocked_players.push(BlockedPlayer {
            user_id: "usr_bad".into(),
            blocked_until: 500,
        });
        assert!(instance.is_blocked("usr_bad", 100));
        assert!(!instance.is_blocked("usr_bad", 500));
        assert!(!instance.is_blocked("usr_good", 100));
    }

    #[test]
    fn test_wire_field_names() {
        let instance = Instance::new(registration(), 42);
        let json = serde_json::to_value(&instance).unwrap();
        assert_eq!(json["locationString"], "wrld_X:inst_1");
        assert_eq!(json["instanceType"], "public");
        assert_eq!(json["playerCount"]["total"], 0);
        assert_eq!(json["overCapacity"], false);
        assert_eq!(json["lastActivity"], 42);
    }
}
