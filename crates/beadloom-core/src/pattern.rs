//! Procedural fills over a contiguous range of one strand.
//!
//! Colours are drawn from the palette's key order. The alternating rules
//! index by absolute cell position, not by offset into the range, so a fill
//! starting at an odd index begins with the second colour.

use rand::Rng;

use crate::model::Cell;

/// A recognised pattern code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternCode {
    /// `ABAB`: `colors[i % 2]`.
    Alternating,
    /// `AABB`: `colors[(i / 2) % 2]`.
    DoubleAlternating,
    /// `RANDOM`: an independent uniform pick per cell.
    Random,
}

impl PatternCode {
    /// Parse a wire code. Unknown codes yield `None` and are ignored by callers.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "ABAB" => Some(Self::Alternating),
            "AABB" => Some(Self::DoubleAlternating),
            "RANDOM" => Some(Self::Random),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Alternating => "ABAB",
            Self::DoubleAlternating => "AABB",
            Self::Random => "RANDOM",
        }
    }
}

/// Fill `cells[start..=end]` according to `pattern`.
///
/// `end` is clamped to the last cell; an empty clamped range or an empty
/// colour list leaves the cells untouched. Returns the number of cells
/// written. With a single colour the alternating rules leave the "B"
/// positions empty.
pub fn fill_range<R: Rng + ?Sized>(
    cells: &mut [Cell],
    start: usize,
    end: usize,
    pattern: PatternCode,
    colors: &[String],
    rng: &mut R,
) -> usize {
    if colors.is_empty() || cells.is_empty() || start >= cells.len() {
        return 0;
    }
    let end = end.min(cells.len() - 1);
    if start > end {
        return 0;
    }
    for (i, cell) in cells.iter_mut().enumerate().take(end + 1).skip(start) {
        let pick = match pattern {
            PatternCode::Alternating => colors.get(i % 2),
            PatternCode::DoubleAlternating => colors.get((i / 2) % 2),
            PatternCode::Random => colors.get(rng.random_range(0..colors.len())),
        };
        cell.bead_id = pick.cloned();
    }
    end - start + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn colors() -> Vec<String> {
        vec!["x".to_string(), "y".to_string(), "z".to_string()]
    }

    fn ids(cells: &[Cell]) -> Vec<Option<&str>> {
        cells.iter().map(|cell| cell.bead_id.as_deref()).collect()
    }

    #[test]
    fn alternating_uses_absolute_index() {
        let mut cells = vec![Cell::empty(); 6];
        let mut rng = SmallRng::seed_from_u64(1);
        let written = fill_range(&mut cells, 0, 5, PatternCode::Alternating, &colors(), &mut rng);
        assert_eq!(written, 6);
        assert_eq!(
            ids(&cells),
            vec![Some("x"), Some("y"), Some("x"), Some("y"), Some("x"), Some("y")]
        );

        let mut cells = vec![Cell::empty(); 4];
        fill_range(&mut cells, 1, 2, PatternCode::Alternating, &colors(), &mut rng);
        assert_eq!(ids(&cells), vec![None, Some("y"), Some("x"), None]);
    }

    #[test]
    fn double_alternating_pairs() {
        let mut cells = vec![Cell::empty(); 6];
        let mut rng = SmallRng::seed_from_u64(1);
        fill_range(&mut cells, 0, 5, PatternCode::DoubleAlternating, &colors(), &mut rng);
        assert_eq!(
            ids(&cells),
            vec![Some("x"), Some("x"), Some("y"), Some("y"), Some("x"), Some("x")]
        );
    }

    #[test]
    fn random_only_draws_palette_colours() {
        let mut cells = vec![Cell::empty(); 64];
        let mut rng = SmallRng::seed_from_u64(7);
        fill_range(&mut cells, 0, 63, PatternCode::Random, &colors(), &mut rng);
        assert!(
            cells
                .iter()
                .all(|cell| matches!(cell.bead_id.as_deref(), Some("x" | "y" | "z")))
        );
    }

    #[test]
    fn end_is_clamped_and_bad_ranges_are_ignored() {
        let mut cells = vec![Cell::empty(); 3];
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(
            fill_range(&mut cells, 1, 99, PatternCode::Alternating, &colors(), &mut rng),
            2
        );
        assert_eq!(
            fill_range(&mut cells, 3, 4, PatternCode::Alternating, &colors(), &mut rng),
            0
        );
        assert_eq!(
            fill_range(&mut cells, 2, 1, PatternCode::Alternating, &colors(), &mut rng),
            0
        );
        assert_eq!(
            fill_range(&mut cells, 0, 2, PatternCode::Alternating, &[], &mut rng),
            0
        );
    }

    #[test]
    fn single_colour_leaves_b_positions_empty() {
        let mut cells = vec![Cell::filled("old"); 4];
        let mut rng = SmallRng::seed_from_u64(1);
        fill_range(&mut cells, 0, 3, PatternCode::Alternating, &["x".to_string()], &mut rng);
        assert_eq!(ids(&cells), vec![Some("x"), None, Some("x"), None]);
    }

    #[test]
    fn codes_round_trip() {
        for code in ["ABAB", "AABB", "RANDOM"] {
            assert_eq!(PatternCode::parse(code).map(PatternCode::code), Some(code));
        }
        assert_eq!(PatternCode::parse("ZIGZAG"), None);
    }
}
