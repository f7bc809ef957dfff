//! Hack-and-slash combat.

use crate::random::{self, Dice, RandomStream};
use crate::types::avatar::modifier;
use crate::types::Avatar;

use super::{BattleOutcome, MoveResult};

/// A monster definition used by [`hack_and_slash`].
#[derive(Clone, Debug)]
pub struct Monster {
    pub name: &'static str,
    pub hp: i32,
    /// Parsed from the monster table but not yet consumed by the battle
    /// loop, matching the reference fixture's `piercing` column.
    pub piercing: i32,
    pub armor: i32,
    pub damage: &'static str,
    pub rewards: &'static [MonsterReward],
}

/// A `1d10`-indexed reward slot on monster death.
#[derive(Clone, Copy, Debug)]
pub struct MonsterReward {
    pub roll: u32,
    pub item: &'static str,
}

/// A single step of the combat log, mirroring the reference battle_status
/// entries (`attack_monster`, `attacked_by_monster`, `item_use`, etc).
#[derive(Clone, Debug, PartialEq)]
pub enum BattleLogEntry {
    SelectedMonster(&'static str),
    UsedBandage { healed: bool },
    AttackedMonster { damage: i32, monster_hp_left: i32 },
    AttackedByMonster { damage: i32, gained_xp: bool },
    MonsterDefeated { reward: Option<&'static str> },
    AvatarDefeated,
    RanOutOfRandom,
}

/// The default, fixed monster table. Grounded on the reference
/// implementation's CSV fixture (columns: hp, piercing, armor, damage,
/// reward1..rewardN), reduced to the fields combat actually consumes.
pub fn default_monster_table() -> Vec<Monster> {
    vec![
        Monster {
            name: "Slime",
            hp: 8,
            piercing: 0,
            armor: 0,
            damage: "1d3",
            rewards: &[MonsterReward { roll: 1, item: "GOOP" }],
        },
        Monster {
            name: "Goblin",
            hp: 14,
            piercing: 0,
            armor: 1,
            damage: "1d4",
            rewards: &[
                MonsterReward { roll: 1, item: "RICE" },
                MonsterReward { roll: 2, item: "GOLD" },
            ],
        },
        Monster {
            name: "Wolf",
            hp: 18,
            piercing: 1,
            armor: 1,
            damage: "1d6",
            rewards: &[MonsterReward { roll: 1, item: "MEAT" }],
        },
        Monster {
            name: "Bandit",
            hp: 24,
            piercing: 1,
            armor: 2,
            damage: "1d6+1",
            rewards: &[
                MonsterReward { roll: 1, item: "GOLD" },
                MonsterReward { roll: 2, item: "FLNT" },
            ],
        },
        Monster {
            name: "Orc",
            hp: 32,
            piercing: 2,
            armor: 3,
            damage: "1d8",
            rewards: &[MonsterReward { roll: 1, item: "LSWD" }],
        },
        Monster {
            name: "Ogre",
            hp: 42,
            piercing: 2,
            armor: 4,
            damage: "2d6",
            rewards: &[
                MonsterReward { roll: 1, item: "GOLD" },
                MonsterReward { roll: 2, item: "WHET" },
            ],
        },
    ]
}

fn reward_for_roll(monster: &Monster, roll: i32) -> Option<&'static str> {
    monster
        .rewards
        .iter()
        .find(|r| r.roll as i32 == roll)
        .map(|r| r.item)
}

/// Runs a full combat encounter against a monster drawn from `table`.
///
/// Exhaustion of the random stream at any point during the fight is a
/// normal termination (`BattleOutcome::Finish`), never a propagated error.
pub fn hack_and_slash(
    mut avatar: Avatar,
    randoms: &mut RandomStream,
    table: &[Monster],
) -> (Avatar, MoveResult) {
    let mut log = Vec::new();

    let monster_index = match randoms.pop() {
        Ok(v) => (v.rem_euclid(table.len() as i32)) as usize,
        Err(_) => {
            log.push(BattleLogEntry::RanOutOfRandom);
            return (avatar, MoveResult::Battle(log, BattleOutcome::Finish));
        }
    };
    let monster = &table[monster_index];
    log.push(BattleLogEntry::SelectedMonster(monster.name));
    let mut monster_hp = monster.hp;

    loop {
        if avatar.hp <= (avatar.max_hp() as f64 * 0.2) as i32 && avatar.item_count("BNDG") > 0 {
            match random::roll_expr(randoms, "2d6", true) {
                Ok(heal_roll) => {
                    let healed = heal_roll >= 7;
                    if healed {
                        avatar.hp += 4;
                    }
                    avatar.try_remove_item("BNDG", 1);
                    log.push(BattleLogEntry::UsedBandage { healed });
                }
                Err(_) => {
                    log.push(BattleLogEntry::RanOutOfRandom);
                    return (avatar, MoveResult::Battle(log, BattleOutcome::Finish));
                }
            }
        }

        let attack_roll = match random::roll_expr(randoms, "2d6", true) {
            Ok(r) => r + modifier(avatar.abilities.strength),
            Err(_) => {
                log.push(BattleLogEntry::RanOutOfRandom);
                return (avatar, MoveResult::Battle(log, BattleOutcome::Finish));
            }
        };

        if attack_roll >= 7 {
            let raw_damage = match Dice::parse(avatar.damage_dice())
                .ok()
                .and_then(|d| random::roll(randoms, d, true).ok())
            {
                Some(v) => v.into_iter().sum::<i32>(),
                None => {
                    log.push(BattleLogEntry::RanOutOfRandom);
                    return (avatar, MoveResult::Battle(log, BattleOutcome::Finish));
                }
            };
            let damage = (raw_damage - monster.armor).max(0);
            monster_hp -= damage;
            log.push(BattleLogEntry::AttackedMonster {
                damage,
                monster_hp_left: monster_hp,
            });
        } else if (2..=6).contains(&attack_roll) {
            let monster_damage = match random::roll_expr(randoms, monster.damage, true) {
                Ok(v) => v,
                Err(_) => {
                    log.push(BattleLogEntry::RanOutOfRandom);
                    return (avatar, MoveResult::Battle(log, BattleOutcome::Finish));
                }
            };
            avatar.hp -= monster_damage;
            let gained_xp = attack_roll <= 6;
            if gained_xp {
                avatar.xp += 1;
            }
            log.push(BattleLogEntry::AttackedByMonster {
                damage: monster_damage,
                gained_xp,
            });
        }
        // attack_roll < 2 (possible with a low-strength modifier): neither
        // side lands a hit this round.

        if monster_hp <= 0 {
            let reward = match random::roll_expr(randoms, "1d10", true) {
                Ok(r) => reward_for_roll(monster, r),
                Err(_) => {
                    log.push(BattleLogEntry::RanOutOfRandom);
                    return (avatar, MoveResult::Battle(log, BattleOutcome::Finish));
                }
            };
            if let Some(item) = reward {
                avatar.add_item(item, 1);
            }
            log.push(BattleLogEntry::MonsterDefeated { reward });
            return (avatar, MoveResult::Battle(log, BattleOutcome::Win));
        }

        if avatar.hp <= 0 {
            log.push(BattleLogEntry::AvatarDefeated);
            return (avatar, MoveResult::Battle(log, BattleOutcome::Lose));
        }
    }
}
