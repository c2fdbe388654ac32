//! Spawn directions and batch distribution

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the map entities enter from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnDirection {
    North,
    West,
    South,
    East,
}

impl SpawnDirection {
    /// Precedence used when a batch does not divide evenly
    pub const PRECEDENCE: [SpawnDirection; 4] = [Self::North, Self::West, Self::South, Self::East];

    /// Bit flag of this direction
    pub const fn bit(self) -> u8 {
        match self {
            Self::North => 1,
            Self::West => 2,
            Self::South => 4,
            Self::East => 8,
        }
    }
}

impl fmt::Display for SpawnDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::North => write!(f, "north"),
            Self::West => write!(f, "west"),
            Self::South => write!(f, "south"),
            Self::East => write!(f, "east"),
        }
    }
}

/// Set of active spawn directions
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<SpawnDirection>", into = "Vec<SpawnDirection>")]
pub struct SpawnDirections(u8);

impl SpawnDirections {
    pub const NONE: Self = Self(0);

    /// All four directions
    pub const fn all() -> Self {
        Self(0b1111)
    }

    /// Build from the raw flag byte (N=1, W=2, S=4, E=8)
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn with(mut self, direction: SpawnDirection) -> Self {
        self.insert(direction);
        self
    }

    pub fn insert(&mut self, direction: SpawnDirection) {
        self.0 |= direction.bit();
    }

    pub fn remove(&mut self, direction: SpawnDirection) {
        self.0 &= !direction.bit();
    }

    pub fn contains(self, direction: SpawnDirection) -> bool {
        self.0 & direction.bit() != 0
    }

    /// Active directions in precedence order
    pub fn iter(self) -> impl Iterator<Item = SpawnDirection> {
        SpawnDirection::PRECEDENCE
            .into_iter()
            .filter(move |d| self.contains(*d))
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<SpawnDirection> for SpawnDirections {
    fn from_iter<I: IntoIterator<Item = SpawnDirection>>(iter: I) -> Self {
        let mut set = Self::NONE;
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}

impl From<Vec<SpawnDirection>> for SpawnDirections {
    fn from(directions: Vec<SpawnDirection>) -> Self {
        directions.into_iter().collect()
    }
}

impl From<SpawnDirections> for Vec<SpawnDirection> {
    fn from(directions: SpawnDirections) -> Self {
        directions.iter().collect()
    }
}

impl fmt::Debug for SpawnDirections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Split `count` entities across the active directions.
///
/// Every direction gets `count / n`; the first `count % n` directions in
/// N, W, S, E order get one extra. Directions are returned in that order.
pub fn distribute(count: u32, directions: SpawnDirections) -> Vec<(SpawnDirection, u32)> {
    let n = directions.count();
    if n == 0 {
        return Vec::new();
    }
    let base = count / n;
    let remainder = count % n;
    directions
        .iter()
        .enumerate()
        .map(|(i, d)| (d, base + u32::from((i as u32) < remainder)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use SpawnDirection::*;

    #[test]
    fn test_distribution_examples() {
        let ns = SpawnDirections::NONE.with(North).with(South);
        assert_eq!(distribute(10, ns), vec![(North, 5), (South, 5)]);
        assert_eq!(distribute(11, ns), vec![(North, 6), (South, 5)]);

        let all = SpawnDirections::all();
        assert_eq!(distribute(6, all), vec![(North, 2), (West, 2), (South, 1), (East, 1)]);
        assert_eq!(distribute(1, all), vec![(North, 1), (West, 0), (South, 0), (East, 0)]);
        assert!(distribute(5, SpawnDirections::NONE).is_empty());
    }

    #[test]
    fn test_precedence_ignores_insertion_order() {
        let set: SpawnDirections = vec![East, South, West].into();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![West, South, East]);
        assert_eq!(distribute(5, set), vec![(West, 2), (South, 2), (East, 1)]);
    }

    #[test]
    fn test_flags() {
        let mut set = SpawnDirections::from_bits(0b0101);
        assert!(set.contains(North));
        assert!(set.contains(South));
        assert!(!set.contains(West));
        set.remove(North);
        assert_eq!(set.count(), 1);
        assert_eq!(set.bits(), 4);
    }

    proptest! {
        #[test]
        fn proptest_distribution_is_fair(count in 0u32..10_000, bits in 1u8..16) {
            let directions = SpawnDirections::from_bits(bits);
            let split = distribute(count, directions);
            let n = directions.count();

            prop_assert_eq!(split.len() as u32, n);
            prop_assert_eq!(split.iter().map(|(_, c)| c).sum::<u32>(), count);
            for (i, (_, c)) in split.iter().enumerate() {
                let extra = u32::from((i as u32) < count % n);
                prop_assert_eq!(*c, count / n + extra);
            }
            prop_assert_eq!(split, distribute(count, directions));
        }
    }
}
