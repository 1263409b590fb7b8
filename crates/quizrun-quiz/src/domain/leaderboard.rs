//! Final standings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One participant's place on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// The participant.
    pub user_id: String,
    /// Correct answers across the session.
    pub points: u32,
}

/// Cumulative scores ranked for publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "standings", rename_all = "snake_case")]
pub enum Leaderboard {
    /// Nobody answered during the session.
    NoScores,
    /// Standings by descending points.
    Ranked(Vec<Standing>),
}

impl Leaderboard {
    /// Ranks cumulative scores by descending points.
    ///
    /// The sort is stable, so participants with equal points keep the order
    /// in which `scores` yields them. Pass an ordered map for a reproducible
    /// leaderboard.
    #[must_use]
    pub fn rank<'a, I>(scores: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a u32)>,
    {
        let mut standings: Vec<Standing> = scores
            .into_iter()
            .map(|(user_id, points)| Standing {
                user_id: user_id.clone(),
                points: *points,
            })
            .collect();
        if standings.is_empty() {
            return Self::NoScores;
        }
        standings.sort_by(|a, b| b.points.cmp(&a.points));
        Self::Ranked(standings)
    }

    /// Returns the standings, empty for [`Leaderboard::NoScores`].
    #[must_use]
    pub fn standings(&self) -> &[Standing] {
        match self {
            Self::NoScores => &[],
            Self::Ranked(standings) => standings,
        }
    }
}

impl fmt::Display for Leaderboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoScores => f.write_str("No scores available"),
            Self::Ranked(standings) => {
                for (i, standing) in standings.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{}: {} points", standing.user_id, standing.points)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn scores(entries: &[(&str, u32)]) -> BTreeMap<String, u32> {
        entries
            .iter()
            .map(|(user, points)| ((*user).to_owned(), *points))
            .collect()
    }

    #[test]
    fn test_empty_scores_yield_sentinel() {
        let leaderboard = Leaderboard::rank(&BTreeMap::<String, u32>::new());

        assert_eq!(leaderboard, Leaderboard::NoScores);
        assert!(leaderboard.standings().is_empty());
        assert_eq!(leaderboard.to_string(), "No scores available");
    }

    #[test]
    fn test_rank_orders_by_descending_points() {
        let leaderboard = Leaderboard::rank(&scores(&[("ann", 1), ("bob", 3), ("cy", 2)]));

        let order: Vec<&str> = leaderboard
            .standings()
            .iter()
            .map(|s| s.user_id.as_str())
            .collect();
        assert_eq!(order, vec!["bob", "cy", "ann"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let leaderboard = Leaderboard::rank(&scores(&[("zed", 2), ("amy", 2), ("kim", 5)]));

        let order: Vec<&str> = leaderboard
            .standings()
            .iter()
            .map(|s| s.user_id.as_str())
            .collect();
        assert_eq!(order, vec!["kim", "amy", "zed"]);
    }

    #[test]
    fn test_zero_point_participants_are_listed() {
        let leaderboard = Leaderboard::rank(&scores(&[("A", 1), ("B", 0)]));

        assert_eq!(leaderboard.to_string(), "A: 1 points\nB: 0 points");
    }
}
