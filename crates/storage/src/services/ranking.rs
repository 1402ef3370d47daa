use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a player stands among the opponents it has faced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RankingSummary {
    /// 1-based rank, 1 being the highest rating.
    pub position_in_ranking: i32,
    pub total_opponents: i32,
    /// Share of opponents rated at or below the player, 0 to 100.
    pub percentile: f64,
}

/// Ranks `user_rating` among `opponent_ratings`.
///
/// The player is placed above every opponent with an equal rating, so the
/// position is one plus the number of strictly higher opponents. The
/// percentile is `100 * (total - (position - 1)) / total`, multiplied
/// before dividing, in `f64`.
///
/// Returns `None` when there are no opponents, since the percentile is
/// undefined.
pub fn compute_ranking(user_rating: i32, opponent_ratings: &[i32]) -> Option<RankingSummary> {
    if opponent_ratings.is_empty() {
        return None;
    }

    let total = opponent_ratings.len() as i32;
    let strictly_higher = opponent_ratings
        .iter()
        .filter(|rating| **rating > user_rating)
        .count() as i32;
    let position = strictly_higher + 1;

    let at_or_below = total - (position - 1);
    let percentile = (100.0 * f64::from(at_or_below)) / f64::from(total);

    Some(RankingSummary {
        position_in_ranking: position,
        total_opponents: total,
        percentile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ties_place_user_above_opponents() {
        let summary = compute_ranking(1500, &[1600, 1500, 1400, 1300]).unwrap();
        assert_eq!(summary.position_in_ranking, 2);
        assert_eq!(summary.total_opponents, 4);
        assert_eq!(summary.percentile, 75.0);
    }

    #[test]
    fn test_user_above_everyone() {
        let summary = compute_ranking(2800, &[2000, 2100, 2799]).unwrap();
        assert_eq!(summary.position_in_ranking, 1);
        assert_eq!(summary.percentile, 100.0);
    }

    #[test]
    fn test_user_below_everyone() {
        let summary = compute_ranking(800, &[900, 1000, 1100, 1200]).unwrap();
        assert_eq!(summary.position_in_ranking, 5);
        assert_eq!(summary.percentile, 0.0);
    }

    #[test]
    fn test_all_equal_ratings() {
        let summary = compute_ranking(1200, &[1200, 1200, 1200]).unwrap();
        assert_eq!(summary.position_in_ranking, 1);
        assert_eq!(summary.percentile, 100.0);
    }

    #[test]
    fn test_non_terminating_fraction_is_deterministic() {
        let summary = compute_ranking(1500, &[1600, 1400, 1300]).unwrap();
        assert_eq!(summary.position_in_ranking, 2);
        assert_eq!(summary.percentile, 200.0 / 3.0);
        assert_eq!(
            summary.percentile.to_bits(),
            compute_ranking(1500, &[1300, 1600, 1400]).unwrap().percentile.to_bits()
        );
    }

    #[test]
    fn test_no_opponents_is_undefined() {
        assert!(compute_ranking(1500, &[]).is_none());
    }
}
