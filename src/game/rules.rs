use chess::{Board, ChessMove, Color, Game, MoveGen, Piece, ALL_SQUARES};
use std::str::FromStr;

use crate::game::room::Outcome;

/// Convert a chess color to its wire name.
pub fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

/// All legal moves in the given position.
pub fn legal_moves(board: &Board) -> Vec<ChessMove> {
    MoveGen::new_legal(board).collect()
}

/// Parse candidate move text against a position.
///
/// Strategies are tried in order: compact UCI form first ("e2e4", "e7e8q"),
/// then standard algebraic notation resolved against the position ("Nf3").
/// Returns `None` when neither parser accepts the text. Legality of a
/// UCI-parsed move is the caller's problem; SAN only resolves legal moves.
pub fn parse_move(board: &Board, text: &str) -> Option<ChessMove> {
    if let Ok(mv) = ChessMove::from_str(text) {
        return Some(mv);
    }
    ChessMove::from_san(board, text).ok()
}

pub fn is_legal(board: &Board, mv: ChessMove) -> bool {
    MoveGen::new_legal(board).any(|m| m == mv)
}

/// Terminal status of the current position, if any.
///
/// No legal moves means checkmate (the side to move is in check and loses)
/// or stalemate. Insufficient material and declarable draws (threefold
/// repetition, fifty-move rule) also end the game.
pub fn terminal_outcome(game: &Game) -> Option<Outcome> {
    let board = game.current_position();
    if MoveGen::new_legal(&board).next().is_none() {
        if board.checkers().popcnt() > 0 {
            return Some(match board.side_to_move() {
                Color::White => Outcome::BlackWins,
                Color::Black => Outcome::WhiteWins,
            });
        }
        return Some(Outcome::Draw);
    }
    if has_insufficient_material(&board) || game.can_declare_draw() {
        return Some(Outcome::Draw);
    }
    None
}

/// Check if the board has insufficient material for checkmate.
pub fn has_insufficient_material(board: &Board) -> bool {
    let mut minor = [0u32; 2];
    let mut bishop_square_colors = [[false; 2]; 2];

    for square in ALL_SQUARES {
        let Some(piece) = board.piece_on(square) else {
            continue;
        };
        let side = match board.color_on(square) {
            Some(Color::White) => 0,
            Some(Color::Black) => 1,
            None => continue,
        };
        match piece {
            Piece::King => {}
            Piece::Knight => minor[side] += 1,
            Piece::Bishop => {
                minor[side] += 1;
                let dark = (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 1;
                bishop_square_colors[side][dark as usize] = true;
            }
            // Pawn, rook or queen: mate is always possible.
            _ => return false,
        }
    }

    match (minor[0], minor[1]) {
        // King vs king, or a lone minor piece vs a bare king.
        (0, 0) | (1, 0) | (0, 1) => true,
        // Bishop vs bishop on same-colored squares.
        (1, 1) => {
            let white = bishop_square_colors[0];
            let black = bishop_square_colors[1];
            (white[0] && black[0]) || (white[1] && black[1])
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uci_strategy_parses_compact_text() {
        let board = Board::default();
        let mv = parse_move(&board, "e2e4").unwrap();
        assert_eq!(mv.to_string(), "e2e4");
    }

    #[test]
    fn san_strategy_resolves_against_the_position() {
        let board = Board::default();
        let mv = parse_move(&board, "Nf3").unwrap();
        assert_eq!(mv.to_string(), "g1f3");
    }

    #[test]
    fn garbage_text_fails_both_strategies() {
        let board = Board::default();
        assert!(parse_move(&board, "not-a-move").is_none());
        assert!(parse_move(&board, "").is_none());
    }

    #[test]
    fn uci_parse_does_not_imply_legality() {
        let board = Board::default();
        let mv = parse_move(&board, "e2e5").unwrap();
        assert!(!is_legal(&board, mv));
    }

    #[test]
    fn starting_position_is_not_terminal() {
        assert_eq!(terminal_outcome(&Game::new()), None);
        assert!(!has_insufficient_material(&Board::default()));
    }

    #[test]
    fn bare_kings_are_insufficient_material() {
        let board = Board::from_str("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();
        assert!(has_insufficient_material(&board));
    }

    #[test]
    fn lone_queen_is_sufficient_material() {
        let board = Board::from_str("8/8/4k3/8/8/4K3/4Q3/8 w - - 0 1").unwrap();
        assert!(!has_insufficient_material(&board));
    }
}
