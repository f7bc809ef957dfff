//! Hash-seeded pseudorandom stream and dice notation.
//!
//! Every confirmed move derives its own private random stream from the hash
//! of the block that confirmed it and the move's own id. Combat and
//! crafting consume this stream; once it runs dry further draws fail with
//! [`RandomError::Exhausted`], which combat treats as a normal termination
//! rather than a user-facing error.

use thiserror::Error;

/// Failure mode for the random stream and dice rolls.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RandomError {
    #[error("random stream exhausted")]
    Exhausted,
    #[error("malformed dice expression: {0}")]
    MalformedExpression(String),
}

/// A move's private pseudorandom stream, consumed from the tail.
///
/// Constructed once per move via [`RandomStream::derive`] and then drained
/// by dice rolls during execution.
#[derive(Clone, Debug, Default)]
pub struct RandomStream {
    values: Vec<i32>,
}

impl RandomStream {
    /// Derives the stream for a move from its containing block's hash and
    /// its own id: XOR of corresponding characters (as code points),
    /// dropping the first `difficulty / 4` values.
    pub fn derive(block_hash: &str, move_id: &str, difficulty: u32) -> Self {
        let values: Vec<i32> = block_hash
            .chars()
            .zip(move_id.chars())
            .map(|(a, b)| (a as i32) ^ (b as i32))
            .collect();

        let skip = (difficulty / 4) as usize;
        let values = if skip >= values.len() {
            Vec::new()
        } else {
            values[skip..].to_vec()
        };

        Self { values }
    }

    #[cfg(test)]
    pub fn from_values(values: Vec<i32>) -> Self {
        Self { values }
    }

    /// Pops the next value from the tail of the stream.
    pub fn pop(&mut self) -> Result<i32, RandomError> {
        self.values.pop().ok_or(RandomError::Exhausted)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// A parsed `NdM(+K)` dice expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dice {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl Dice {
    /// Parses dice notation like `"2d6"` or `"1d6+2"`.
    pub fn parse(expr: &str) -> Result<Self, RandomError> {
        let (base, modifier) = match expr.split_once('+') {
            Some((base, k)) => {
                let k: i32 = k
                    .trim()
                    .parse()
                    .map_err(|_| RandomError::MalformedExpression(expr.to_string()))?;
                (base, k)
            }
            None => (expr, 0),
        };

        let (count_str, sides_str) = base
            .split_once('d')
            .ok_or_else(|| RandomError::MalformedExpression(expr.to_string()))?;

        let count: u32 = count_str
            .trim()
            .parse()
            .map_err(|_| RandomError::MalformedExpression(expr.to_string()))?;
        let sides: u32 = sides_str
            .trim()
            .parse()
            .map_err(|_| RandomError::MalformedExpression(expr.to_string()))?;

        Ok(Dice {
            count,
            sides,
            modifier,
        })
    }
}

/// Rolls `dice` against `stream`, draining `dice.count` values.
///
/// When `combined` is `true`, returns a single summed total (including the
/// constant modifier). When `false`, returns each die's individual result
/// (the modifier, if any, is added to the last die rolled) — used by
/// combat logs that want to show each die separately.
pub fn roll(stream: &mut RandomStream, dice: Dice, combined: bool) -> Result<Vec<i32>, RandomError> {
    let mut rolls = Vec::with_capacity(dice.count as usize);
    for _ in 0..dice.count {
        let v = stream.pop()?;
        let face = if dice.sides == 0 {
            0
        } else {
            (v.rem_euclid(dice.sides as i32)) + 1
        };
        rolls.push(face);
    }

    if combined {
        let total: i32 = rolls.iter().sum::<i32>() + dice.modifier;
        Ok(vec![total])
    } else {
        if let Some(last) = rolls.last_mut() {
            *last += dice.modifier;
        }
        Ok(rolls)
    }
}

/// Convenience wrapper: parses `expr` and rolls it against `stream`,
/// returning the combined total.
pub fn roll_expr(stream: &mut RandomStream, expr: &str, combined: bool) -> Result<i32, RandomError> {
    let dice = Dice::parse(expr)?;
    let rolls = roll(stream, dice, combined)?;
    Ok(rolls.into_iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dice_determinism_matches_reference_scenario() {
        // roll([1,7,3], '2d6', combined=true) == 6
        let mut stream = RandomStream::from_values(vec![1, 7, 3]);
        let total = roll_expr(&mut stream, "2d6", true).expect("roll should succeed");
        assert_eq!(total, 6);
    }

    #[test]
    fn identical_block_hash_and_move_id_yield_all_zero_stream() {
        let hash = "a".repeat(64);
        let stream = RandomStream::derive(&hash, &hash, 0);
        assert!(stream.values.iter().all(|v| *v == 0));
    }

    #[test]
    fn all_zero_stream_rolls_minimum_face_every_time() {
        let hash = "b".repeat(64);
        let mut stream = RandomStream::derive(&hash, &hash, 0);
        let dice = Dice::parse("3d6").unwrap();
        let rolls = roll(&mut stream, dice, false).unwrap();
        assert!(rolls.iter().all(|&f| f == 1));
    }

    #[test]
    fn difficulty_trims_leading_values_by_quarter() {
        let hash = "c".repeat(64);
        let full = RandomStream::derive(&hash, &hash, 0);
        let trimmed = RandomStream::derive(&hash, &hash, 16);
        assert_eq!(trimmed.len(), full.len() - 4);
    }

    #[test]
    fn exhausted_stream_returns_exhausted_error() {
        let mut stream = RandomStream::from_values(vec![]);
        let err = roll_expr(&mut stream, "1d6", true).unwrap_err();
        assert_eq!(err, RandomError::Exhausted);
    }

    #[test]
    fn malformed_expression_is_rejected() {
        assert!(Dice::parse("not-dice").is_err());
    }
}
