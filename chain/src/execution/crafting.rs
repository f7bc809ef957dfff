//! Item combination ("combine") recipes.
//!
//! Recipes and their success dice are grounded directly on the reference
//! implementation's `recipes` and `success_roll` tables: three named
//! ingredients go in, one item comes out, gated by a success die that rolls
//! a `1` (the only winning face on every recipe below).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::random::{self, RandomStream};
use crate::types::{Avatar, Move};

use super::MoveResult;

/// `output item -> (ingredient a, ingredient b, ingredient c)`.
pub static RECIPES: LazyLock<BTreeMap<&'static str, [&'static str; 3]>> = LazyLock::new(|| {
    BTreeMap::from([
        ("OYKD", ["RICE", "EGGS", "CHKN"]),
        ("CBNR", ["WHET", "EGGS", "MEAT"]),
        ("STKD", ["RICE", "RKST", "MEAT"]),
        ("CHKR", ["RICE", "RKST", "CHKN"]),
        ("STEK", ["MEAT", "RKST", "OLIV"]),
        ("STCB", ["STEK", "WHET", "EGGS"]),
        ("FRCH", ["CHKN", "RKST", "OLIV"]),
        ("FSWD", ["LSWD", "FLNT", "OLIV"]),
        ("FSW1", ["FSWD", "FSWD", "FSWD"]),
        ("FSW2", ["FSW1", "FSW1", "FSW1"]),
        ("FSW3", ["FSW2", "FSW2", "FSW2"]),
    ])
});

/// `output item -> dice expression for the success roll` (wins on a 1).
pub static SUCCESS_ROLLS: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    BTreeMap::from([
        ("OYKD", "1d1"),
        ("CBNR", "1d1"),
        ("STKD", "1d1"),
        ("CHKR", "1d1"),
        ("STEK", "1d1"),
        ("STCB", "1d1"),
        ("FRCH", "1d1"),
        ("FSWD", "1d2"),
        ("FSW1", "1d2"),
        ("FSW2", "1d4"),
        ("FSW3", "1d6"),
    ])
});

/// Executes a `combine` move: consumes the move's `item1`/`item2`/`item3`
/// details, searches [`RECIPES`] for the entry whose ingredient set matches
/// (order-insensitive), and on a match rolls the output's success die.
pub fn combine(mut avatar: Avatar, mv: &Move, randoms: &mut RandomStream) -> (Avatar, MoveResult) {
    let (Some(item1), Some(item2), Some(item3)) =
        (mv.detail("item1"), mv.detail("item2"), mv.detail("item3"))
    else {
        return (
            avatar,
            MoveResult::Failed("missing ingredient detail".to_string()),
        );
    };
    let given: BTreeSet<&str> = BTreeSet::from([item1, item2, item3]);

    let Some((&output, &ingredients)) = RECIPES
        .iter()
        .find(|(_, recipe)| recipe.iter().copied().collect::<BTreeSet<&str>>() == given)
    else {
        return (
            avatar,
            MoveResult::Failed("no recipe matches those ingredients".to_string()),
        );
    };

    for ingredient in ingredients {
        if avatar.item_count(ingredient) < 1 {
            return (
                avatar,
                MoveResult::Failed(format!("missing ingredient: {ingredient}")),
            );
        }
    }
    for ingredient in ingredients {
        avatar.try_remove_item(ingredient, 1);
    }

    let success_dice = SUCCESS_ROLLS.get(output).copied().unwrap_or("1d1");
    match random::roll_expr(randoms, success_dice, true) {
        Ok(1) => {
            avatar.add_item(output, 1);
            (avatar, MoveResult::Ok)
        }
        Ok(_) => (avatar, MoveResult::Failed("combine roll failed".to_string())),
        Err(_) => (avatar, MoveResult::Failed("out of random".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::avatar::Abilities;
    use crate::types::{Address, AvatarClass, MoveDetails, MoveName};
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap as Map;

    fn dt() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn avatar_with(items: &[(&str, u64)]) -> Avatar {
        let mut items_map = Map::new();
        for (k, v) in items {
            items_map.insert(k.to_string(), *v);
        }
        Avatar {
            user: Address("crafter".to_string()),
            class: AvatarClass::Novice,
            name: "crafter".to_string(),
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
            items: items_map,
        }
    }

    fn combine_move(item1: &str, item2: &str, item3: &str) -> Move {
        let mut details = MoveDetails::new();
        details.insert("item1".to_string(), item1.to_string());
        details.insert("item2".to_string(), item2.to_string());
        details.insert("item3".to_string(), item3.to_string());
        Move::create_signed("crafter-seed", MoveName::Combine, details, 0, dt())
    }

    #[test]
    fn successful_combine_consumes_ingredients_and_yields_output() {
        let avatar = avatar_with(&[("RICE", 1), ("EGGS", 1), ("CHKN", 1)]);
        let mv = combine_move("RICE", "EGGS", "CHKN");
        let mut randoms = RandomStream::from_values(vec![0]); // (0 % 1) + 1 == 1

        let (avatar, result) = combine(avatar, &mv, &mut randoms);
        assert_eq!(result, MoveResult::Ok);
        assert_eq!(avatar.item_count("OYKD"), 1);
        assert_eq!(avatar.item_count("RICE"), 0);
    }

    #[test]
    fn ingredient_order_does_not_matter() {
        let avatar = avatar_with(&[("RICE", 1), ("EGGS", 1), ("CHKN", 1)]);
        let mv = combine_move("CHKN", "RICE", "EGGS");
        let mut randoms = RandomStream::from_values(vec![0]);

        let (avatar, result) = combine(avatar, &mv, &mut randoms);
        assert_eq!(result, MoveResult::Ok);
        assert_eq!(avatar.item_count("OYKD"), 1);
    }

    #[test]
    fn missing_ingredient_fails_without_consuming_anything() {
        let avatar = avatar_with(&[("RICE", 1), ("EGGS", 1)]);
        let mv = combine_move("RICE", "EGGS", "CHKN");
        let mut randoms = RandomStream::from_values(vec![0]);

        let (avatar, result) = combine(avatar, &mv, &mut randoms);
        assert!(matches!(result, MoveResult::Failed(_)));
        assert_eq!(avatar.item_count("RICE"), 1);
    }

    #[test]
    fn unknown_recipe_is_rejected() {
        let avatar = avatar_with(&[]);
        let mv = combine_move("NOPE", "NADA", "ZILCH");
        let mut randoms = RandomStream::from_values(vec![0]);
        let (_, result) = combine(avatar, &mv, &mut randoms);
        assert!(matches!(result, MoveResult::Failed(_)));
    }
}
