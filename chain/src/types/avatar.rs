//! Avatar: derived, replayed character state.
//!
//! An avatar is never persisted directly; it is rebuilt on demand by
//! [`crate::reconstructor`] from the move history. This module only defines
//! its shape and the small amount of pure logic (ability modifiers, subtype
//! stats) that does not depend on replay order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Address;

/// The six D&D-style ability scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abilities {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Abilities {
    pub fn get(&self, name: &str) -> Option<i32> {
        Some(match name {
            "strength" => self.strength,
            "dexterity" => self.dexterity,
            "constitution" => self.constitution,
            "intelligence" => self.intelligence,
            "wisdom" => self.wisdom,
            "charisma" => self.charisma,
            _ => return None,
        })
    }

    pub fn bump(&mut self, name: &str) -> bool {
        let slot = match name {
            "strength" => &mut self.strength,
            "dexterity" => &mut self.dexterity,
            "constitution" => &mut self.constitution,
            "intelligence" => &mut self.intelligence,
            "wisdom" => &mut self.wisdom,
            "charisma" => &mut self.charisma,
            _ => return false,
        };
        *slot += 1;
        true
    }
}

/// The D&D ability modifier table: maps a raw score to its modifier.
pub fn modifier(score: i32) -> i32 {
    match score {
        i32::MIN..=3 => -3,
        4..=5 => -2,
        6..=8 => -1,
        9..=12 => 0,
        13..=15 => 1,
        16..=17 => 2,
        _ => 3,
    }
}

/// Avatar subtype: determines combat stats. Only `Novice` exists today, but
/// the enum leaves room for future classes without disturbing `Avatar`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvatarClass {
    Novice,
}

impl AvatarClass {
    pub fn damage_dice(&self) -> &'static str {
        match self {
            AvatarClass::Novice => "1d6",
        }
    }

    pub fn max_hp(&self, abilities: &Abilities) -> i32 {
        match self {
            AvatarClass::Novice => abilities.constitution + 6,
        }
    }
}

/// Marker type kept for call sites that want to name the default subtype
/// without constructing one (e.g. `Novice::CLASS`).
pub struct Novice;
impl Novice {
    pub const CLASS: AvatarClass = AvatarClass::Novice;
}

/// A player's reconstructed character state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Avatar {
    pub user: Address,
    pub class: AvatarClass,
    pub name: String,
    pub gravatar_hash: String,
    pub abilities: Abilities,
    pub hp: i32,
    pub xp: i32,
    pub lv: i32,
    pub items: BTreeMap<String, u64>,
}

impl Avatar {
    pub fn max_hp(&self) -> i32 {
        self.class.max_hp(&self.abilities)
    }

    pub fn damage_dice(&self) -> &'static str {
        self.class.damage_dice()
    }

    pub fn item_count(&self, item: &str) -> u64 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn add_item(&mut self, item: &str, amount: u64) {
        *self.items.entry(item.to_string()).or_insert(0) += amount;
    }

    /// Removes `amount` of `item` if the avatar has enough; returns `false`
    /// (and leaves the avatar unchanged) otherwise.
    pub fn try_remove_item(&mut self, item: &str, amount: u64) -> bool {
        let have = self.item_count(item);
        if have < amount {
            return false;
        }
        self.items.insert(item.to_string(), have - amount);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_table_matches_reference_breakpoints() {
        assert_eq!(modifier(1), -3);
        assert_eq!(modifier(3), -3);
        assert_eq!(modifier(4), -2);
        assert_eq!(modifier(5), -2);
        assert_eq!(modifier(6), -1);
        assert_eq!(modifier(8), -1);
        assert_eq!(modifier(9), 0);
        assert_eq!(modifier(12), 0);
        assert_eq!(modifier(13), 1);
        assert_eq!(modifier(15), 1);
        assert_eq!(modifier(16), 2);
        assert_eq!(modifier(17), 2);
        assert_eq!(modifier(18), 3);
        assert_eq!(modifier(25), 3);
    }

    #[test]
    fn novice_max_hp_is_constitution_plus_six() {
        let abilities = Abilities {
            strength: 10,
            dexterity: 10,
            constitution: 14,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        };
        assert_eq!(AvatarClass::Novice.max_hp(&abilities), 20);
    }

    #[test]
    fn try_remove_item_fails_without_enough_stock() {
        let mut avatar = Avatar {
            user: Address("addr".to_string()),
            class: AvatarClass::Novice,
            name: "hero".to_string(),
            gravatar_hash: "HASH".to_string(),
            abilities: Abilities {
                strength: 10,
                dexterity: 10,
                constitution: 10,
                intelligence: 10,
                wisdom: 10,
                charisma: 10,
            },
            hp: 16,
            xp: 0,
            lv: 1,
            items: BTreeMap::new(),
        };
        avatar.add_item("GOLD", 5);
        assert!(!avatar.try_remove_item("GOLD", 10));
        assert!(avatar.try_remove_item("GOLD", 5));
        assert_eq!(avatar.item_count("GOLD"), 0);
    }
}
