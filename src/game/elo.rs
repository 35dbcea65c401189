//! Elo rating arithmetic used at game end.

const K_FACTOR: f64 = 32.0;

/// Expected score for a player rated `rating` against `opponent`.
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// New rating after a game with the given actual score (1.0 / 0.5 / 0.0).
pub fn updated_rating(rating: i32, opponent: i32, score: f64) -> i32 {
    let expected = expected_score(rating as f64, opponent as f64);
    (rating as f64 + K_FACTOR * (score - expected)).round() as i32
}
