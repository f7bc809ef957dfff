//! Deterministic move execution.
//!
//! Each handler is a pure function `(Avatar, &Move, &mut RandomStream) ->
//! (Avatar, MoveResult)`. Handlers never reach for wall-clock time, network
//! I/O, or any randomness outside the move's own [`RandomStream`] — replay
//! on any node must produce bitwise-identical results.

pub mod combat;
pub mod crafting;

use crate::random::RandomStream;
use crate::types::{Avatar, AvatarClass, Move, MoveName};

pub use combat::{BattleLogEntry, Monster, MonsterReward, default_monster_table};
pub use crafting::{RECIPES, SUCCESS_ROLLS};

/// Outcome of executing a single move against an avatar.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveResult {
    Ok,
    Failed(String),
    Battle(Vec<BattleLogEntry>, BattleOutcome),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattleOutcome {
    Win,
    Lose,
    Finish,
}

/// Executes `mv` against `avatar`, consuming `randoms` for any dice the
/// handler needs. Returns the (possibly unchanged) avatar and the result.
///
/// `mv.name == Send` applies the *sender's* side (debiting the item); the
/// receiver's credit is a separate, synthetic step applied only during
/// avatar reconstruction for the receiving address (see
/// [`crate::reconstructor`]).
pub fn execute(
    avatar: Avatar,
    mv: &Move,
    randoms: &mut RandomStream,
) -> (Avatar, MoveResult) {
    match mv.name {
        MoveName::CreateNovice => create_novice(mv),
        MoveName::HackAndSlash => combat::hack_and_slash(avatar, randoms, &default_monster_table()),
        MoveName::Sleep => sleep(avatar),
        MoveName::LevelUp => level_up(avatar, mv),
        MoveName::Say => (avatar, MoveResult::Ok),
        MoveName::Send => send(avatar, mv),
        MoveName::Combine => crafting::combine(avatar, mv, randoms),
        MoveName::Sell | MoveName::Buy => (avatar, MoveResult::Ok),
    }
}

/// Applies the receiver-side credit of a `send` move. Called only by the
/// reconstructor when replaying for the recipient's address.
pub fn receive(mut avatar: Avatar, mv: &Move) -> (Avatar, MoveResult) {
    let (Some(item), Some(amount)) = (
        mv.detail("item_name"),
        mv.detail("amount").and_then(|a| a.parse::<u64>().ok()),
    ) else {
        return (avatar, MoveResult::Failed("malformed send move".to_string()));
    };
    avatar.add_item(item, amount);
    (avatar, MoveResult::Ok)
}

fn create_novice(mv: &Move) -> (Avatar, MoveResult) {
    use crate::types::avatar::Abilities;

    let ability = |key: &str| -> i32 { mv.detail(key).and_then(|s| s.parse().ok()).unwrap_or(9) };

    let abilities = Abilities {
        strength: ability("strength"),
        dexterity: ability("dexterity"),
        constitution: ability("constitution"),
        intelligence: ability("intelligence"),
        wisdom: ability("wisdom"),
        charisma: ability("charisma"),
    };

    let class = AvatarClass::Novice;
    let max_hp = class.max_hp(&abilities);

    let name = mv
        .detail("name")
        .map(|s| s.to_string())
        .unwrap_or_else(|| mv.user.0.chars().take(6).collect());
    let gravatar_hash = mv
        .detail("gravatar_hash")
        .map(|s| s.to_string())
        .unwrap_or_else(|| "HASH".to_string());

    let avatar = Avatar {
        user: mv.user.clone(),
        class,
        name,
        gravatar_hash,
        abilities,
        hp: max_hp,
        xp: 0,
        lv: 1,
        items: Default::default(),
    };

    (avatar, MoveResult::Ok)
}

fn sleep(mut avatar: Avatar) -> (Avatar, MoveResult) {
    avatar.hp = avatar.max_hp();
    (avatar, MoveResult::Ok)
}

fn level_up(mut avatar: Avatar, mv: &Move) -> (Avatar, MoveResult) {
    let Some(ability_name) = mv.detail("new_status") else {
        return (avatar, MoveResult::Failed("missing new_status".to_string()));
    };

    let cost = avatar.lv + 7;
    if avatar.xp < cost {
        return (avatar, MoveResult::Failed("not enough xp".to_string()));
    }

    avatar.xp -= cost;
    avatar.lv += 1;
    if avatar.abilities.bump(ability_name) && ability_name == "constitution" {
        avatar.hp += 1;
    }

    (avatar, MoveResult::Ok)
}

fn send(mut avatar: Avatar, mv: &Move) -> (Avatar, MoveResult) {
    let (Some(item), Some(amount)) = (
        mv.detail("item_name"),
        mv.detail("amount").and_then(|a| a.parse::<u64>().ok()),
    ) else {
        return (avatar, MoveResult::Failed("malformed send move".to_string()));
    };

    if avatar.try_remove_item(item, amount) {
        (avatar, MoveResult::Ok)
    } else {
        (avatar, MoveResult::Failed("not enough items".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MoveDetails;
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;

    fn dt() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn mv_with_details(name: MoveName, details: MoveDetails) -> Move {
        Move::create_signed("seed", name, details, 0, dt())
    }

    fn details(pairs: &[(&str, &str)]) -> MoveDetails {
        let mut d = BTreeMap::new();
        for (k, v) in pairs {
            d.insert(k.to_string(), v.to_string());
        }
        d
    }

    #[test]
    fn create_novice_sets_hp_to_max_and_carries_no_gold() {
        let mv = mv_with_details(
            MoveName::CreateNovice,
            details(&[("constitution", "10")]),
        );
        let (avatar, result) = create_novice(&mv);
        assert_eq!(result, MoveResult::Ok);
        assert_eq!(avatar.hp, avatar.max_hp());
        assert_eq!(avatar.max_hp(), 16);
        assert_eq!(avatar.item_count("GOLD"), 0);
    }

    #[test]
    fn level_up_fails_when_xp_below_threshold() {
        let mv = mv_with_details(MoveName::LevelUp, details(&[("new_status", "strength")]));
        let (avatar, _) = create_novice(&mv_with_details(MoveName::CreateNovice, details(&[])));
        let (_, result) = level_up(avatar, &mv);
        assert!(matches!(result, MoveResult::Failed(_)));
    }

    #[test]
    fn level_up_bumps_constitution_and_hp_together() {
        let (mut avatar, _) =
            create_novice(&mv_with_details(MoveName::CreateNovice, details(&[])));
        avatar.xp = 8;
        let mv = mv_with_details(MoveName::LevelUp, details(&[("new_status", "constitution")]));
        let before_con = avatar.abilities.constitution;
        let before_hp = avatar.hp;

        let (avatar, result) = level_up(avatar, &mv);
        assert_eq!(result, MoveResult::Ok);
        assert_eq!(avatar.abilities.constitution, before_con + 1);
        assert_eq!(avatar.hp, before_hp + 1);
        assert_eq!(avatar.xp, 0);
        assert_eq!(avatar.lv, 2);
    }

    #[test]
    fn send_fails_without_enough_items() {
        let (avatar, _) = create_novice(&mv_with_details(MoveName::CreateNovice, details(&[])));
        let mv = mv_with_details(
            MoveName::Send,
            details(&[("item_name", "GOLD"), ("amount", "5"), ("receiver", "someone")]),
        );
        let (_, result) = send(avatar, &mv);
        assert!(matches!(result, MoveResult::Failed(_)));
    }

    #[test]
    fn receive_credits_the_recipient_avatar() {
        let (avatar, _) = create_novice(&mv_with_details(MoveName::CreateNovice, details(&[])));
        let mv = mv_with_details(
            MoveName::Send,
            details(&[("item_name", "GOLD"), ("amount", "5"), ("receiver", "someone")]),
        );
        let (avatar, result) = receive(avatar, &mv);
        assert_eq!(result, MoveResult::Ok);
        assert_eq!(avatar.item_count("GOLD"), 5);
    }

    #[test]
    fn sleep_restores_full_hp() {
        let (mut avatar, _) = create_novice(&mv_with_details(MoveName::CreateNovice, details(&[])));
        avatar.hp = 1;
        let (avatar, result) = sleep(avatar);
        assert_eq!(result, MoveResult::Ok);
        assert_eq!(avatar.hp, avatar.max_hp());
    }

    #[test]
    fn say_leaves_avatar_unchanged() {
        let (avatar, _) = create_novice(&mv_with_details(MoveName::CreateNovice, details(&[])));
        let mv = mv_with_details(MoveName::Say, details(&[("content", "hi")]));
        let mut stream = crate::random::RandomStream::default();
        let (after, result) = execute(avatar.clone(), &mv, &mut stream);
        assert_eq!(result, MoveResult::Ok);
        assert_eq!(after.hp, avatar.hp);
    }
}
