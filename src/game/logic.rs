// Pure turn and attack rules. Nothing here touches the store.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::board::Board;
use super::ships::{Coordinate, ShipKind};

/// Turn state of a started game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub room_id: String,
    /// Player allowed to attack next
    pub turn: String,
    /// Unix seconds
    pub started_at: i64,
}

impl GameSession {
    pub fn new(room_id: &str, first_turn: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            turn: first_turn.to_string(),
            started_at: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackResult {
    Hit,
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Room exists but nobody has placed ships
    AwaitingPlacement,
    /// One board stored, waiting on the other
    AwaitingBothPlacements,
    /// Both boards stored and a turn holder chosen
    InProgress,
    /// Room is gone: finished, expired or never created
    Over,
}

impl GamePhase {
    pub fn from_room_state(room_exists: bool, boards_placed: usize, session_exists: bool) -> Self {
        match (room_exists, boards_placed, session_exists) {
            (false, _, _) => GamePhase::Over,
            (true, _, true) => GamePhase::InProgress,
            (true, 0, false) => GamePhase::AwaitingPlacement,
            (true, _, false) => GamePhase::AwaitingBothPlacements,
        }
    }
}

/// Result of applying one attack to the defender's board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub result: AttackResult,
    /// Ship completed by this hit, if any
    pub sunk: Option<ShipKind>,
    /// Every fleet cell has now been hit
    pub victory: bool,
    /// Turn holder after this attack
    pub next_turn: String,
}

/// Applies an attack on `target` given the cells the attacker had already struck.
///
/// A hit keeps the turn with the attacker and a miss passes it to the defender.
/// A ship is reported sunk only by the hit that completes it.
pub fn resolve_attack(
    attacker: &str,
    defender: &str,
    defender_board: &Board,
    previously_attacked: &HashSet<Coordinate>,
    target: Coordinate,
) -> Resolution {
    let Some(kind) = defender_board.ship_at(&target) else {
        return Resolution {
            result: AttackResult::Miss,
            sunk: None,
            victory: false,
            next_turn: defender.to_string(),
        };
    };

    let is_struck = |cell: &Coordinate| *cell == target || previously_attacked.contains(cell);

    let sunk = defender_board
        .ship(kind)
        .filter(|ship| ship.cells.iter().all(is_struck))
        .map(|ship| ship.kind);

    let hits = defender_board
        .grid
        .keys()
        .filter(|cell| is_struck(cell))
        .count();

    Resolution {
        result: AttackResult::Hit,
        sunk,
        victory: hits >= ShipKind::FLEET_CELLS,
        next_turn: attacker.to_string(),
    }
}

/// The other member of a two-player room
pub fn opponent_of<'a>(members: &'a [String], player: &str) -> Option<&'a str> {
    members
        .iter()
        .map(String::as_str)
        .find(|member| *member != player)
}

/// Picks the first turn holder uniformly at random
pub fn choose_first_turn<'a, R: Rng + ?Sized>(
    members: &'a [String],
    rng: &mut R,
) -> Option<&'a str> {
    members.choose(rng).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ships::{Orientation, ShipPlacement};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    mod helpers {
        use super::*;

        pub fn board() -> Board {
            let fleet: Vec<ShipPlacement> = ShipKind::iter()
                .zip(["A1", "B1", "C1", "D1", "E1"])
                .map(|(kind, start)| ShipPlacement::new(kind, start, Orientation::Horizontal))
                .collect();
            Board::from_placements("r1", "bob", &fleet).unwrap()
        }

        pub fn coords(cells: &[&str]) -> HashSet<Coordinate> {
            cells.iter().map(|c| c.parse().unwrap()).collect()
        }

        pub fn coord(cell: &str) -> Coordinate {
            cell.parse().unwrap()
        }
    }

    use helpers::*;

    #[test]
    fn test_miss_passes_turn() {
        let resolution = resolve_attack("alice", "bob", &board(), &HashSet::new(), coord("J10"));

        assert_eq!(resolution.result, AttackResult::Miss);
        assert_eq!(resolution.next_turn, "bob");
        assert_eq!(resolution.sunk, None);
        assert!(!resolution.victory);
    }

    #[test]
    fn test_hit_keeps_turn() {
        let resolution = resolve_attack("alice", "bob", &board(), &HashSet::new(), coord("A3"));

        assert_eq!(resolution.result, AttackResult::Hit);
        assert_eq!(resolution.next_turn, "alice");
        assert_eq!(resolution.sunk, None);
    }

    #[test]
    fn test_last_cell_sinks_ship() {
        let previous = coords(&["A1", "A2", "A3", "A4"]);
        let resolution = resolve_attack("alice", "bob", &board(), &previous, coord("A5"));

        assert_eq!(resolution.sunk, Some(ShipKind::Carrier));
        assert!(!resolution.victory);
    }

    #[test]
    fn test_hit_on_other_ship_does_not_repeat_sunk() {
        let previous = coords(&["A1", "A2", "A3", "A4", "A5"]);
        let resolution = resolve_attack("alice", "bob", &board(), &previous, coord("B1"));

        assert_eq!(resolution.result, AttackResult::Hit);
        assert_eq!(resolution.sunk, None);
    }

    #[test]
    fn test_misses_do_not_count_toward_victory() {
        let mut previous = coords(&["F1", "F2", "F3", "G1", "G2", "G3"]);
        previous.extend(board().grid.keys().copied().filter(|c| *c != coord("E2")).take(15));

        let resolution = resolve_attack("alice", "bob", &board(), &previous, coord("E2"));
        assert!(!resolution.victory);
    }

    #[rstest]
    #[case(16, false)]
    #[case(17, true)]
    fn test_victory_requires_every_fleet_cell(#[case] struck: usize, #[case] victory: bool) {
        let board = board();
        let cells: Vec<Coordinate> = board.grid.keys().copied().collect();
        let (target, previous) = cells[..struck].split_last().unwrap();
        let previous: HashSet<Coordinate> = previous.iter().copied().collect();

        let resolution = resolve_attack("alice", "bob", &board, &previous, *target);
        assert_eq!(resolution.victory, victory);
    }

    #[rstest]
    #[case(false, 0, false, GamePhase::Over)]
    #[case(true, 0, false, GamePhase::AwaitingPlacement)]
    #[case(true, 1, false, GamePhase::AwaitingBothPlacements)]
    #[case(true, 2, false, GamePhase::AwaitingBothPlacements)]
    #[case(true, 2, true, GamePhase::InProgress)]
    fn test_phase_from_room_state(
        #[case] room_exists: bool,
        #[case] boards: usize,
        #[case] session: bool,
        #[case] expected: GamePhase,
    ) {
        assert_eq!(GamePhase::from_room_state(room_exists, boards, session), expected);
    }

    #[test]
    fn test_opponent_of() {
        let members = vec!["alice".to_string(), "bob".to_string()];
        assert_eq!(opponent_of(&members, "alice"), Some("bob"));
        assert_eq!(opponent_of(&members, "bob"), Some("alice"));
        assert_eq!(opponent_of(&members[..1], "alice"), None);
    }

    #[test]
    fn test_first_turn_is_a_member() {
        let members = vec!["alice".to_string(), "bob".to_string()];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let first = choose_first_turn(&members, &mut rng).unwrap();
            assert!(members.iter().any(|m| m == first));
        }
        assert_eq!(choose_first_turn(&[], &mut rng), None);
    }
}
