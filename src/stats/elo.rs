/// Rating adjustment weight per game
pub const K_FACTOR: f64 = 32.0;
pub const DEFAULT_RATING: i32 = 1500;

/// Probability that a player rated `own` beats one rated `opponent`
pub fn expected_score(own: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - own) / 400.0))
}

/// Points moved from loser to winner.
///
/// Rounded to the nearest integer but never below 1, so a win always raises the
/// winner and lowers the loser.
pub fn rating_delta(winner: i32, loser: i32) -> i32 {
    let delta = (K_FACTOR * (1.0 - expected_score(winner, loser))).round() as i32;
    delta.max(1)
}

/// New (winner, loser) ratings after a decisive game
pub fn rate(winner: i32, loser: i32) -> (i32, i32) {
    let delta = rating_delta(winner, loser);
    (winner + delta, loser - delta)
}
