/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use kibitz::{pre_parse, read_pgn_file, save_pgn, MoveTree, PgnError, Position};

const TWO_GAMES: &str = r#"[Event "Casual Game"]
[Site "London"]
[Date "1851.06.21"]
[White "Anderssen, Adolf"]
[Black "Kieseritzky, Lionel"]
[Result "1-0"]

1.e4 e5 2.f4 exf4 3.Bc4 Qh4+ 4.Kf1 b5 5.Bxb5 Nf6 6.Nf3 Qh6 7.d3 Nh5 8.Nh4 Qg5
9.Nf5 c6 10.g4 Nf6 11.Rg1 cxb5 12.h4 Qg6 13.h5 Qg5 14.Qf3 Ng8 15.Bxf4 Qf6
16.Nc3 Bc5 17.Nd5 Qxb2 18.Bd6 Bxg1 {It is from this move that Black's defeat
stems.} 19. e5 Qxa1+ 20. Ke2 Na6 21.Nxg7+ Kd8 22.Qf6+ Nxf6 23.Be7# 1-0

[Event "Opera"]
[White "Morphy"]
[Black "Duke Karl / Count Isouard"]
[Result "1-0"]

1. e4 e5 2. Nf3 d6 3. d4 Bg4 $4 (3... exd4 4. Qxd4) 4. dxe5 Bxf3 5. Qxf3 dxe5
6. Bc4 Nf6 7. Qb3 Qe7 8. Nc3 c6 9. Bg5 b5 10. Nxb5 cxb5 11. Bxb5+ Nbd7 12. O-O-O
Rd8 13. Rxd7 Rxd7 14. Rd1 Qe6 15. Bxd7+ Nxd7 16. Qb8+ Nxb8 17. Rd8# 1-0
"#;

fn main_line(tree: &MoveTree) -> Vec<String> {
    let end = tree.end_of_line(tree.root());
    tree.nice_history(end)
        .into_iter()
        .map(String::from)
        .collect()
}

#[test]
fn test_immortal_game() {
    let games = pre_parse(TWO_GAMES.as_bytes());
    assert_eq!(games.len(), 2);

    let immortal = &games[0];
    assert_eq!(immortal.description(), "Anderssen, Adolf - Kieseritzky, Lionel (1-0)");
    assert_eq!(immortal.tag("Date"), Some("1851.06.21"));

    let tree = immortal.load().unwrap();
    let line = main_line(&tree);
    assert_eq!(line.len(), 45);
    assert_eq!(line.first().map(String::as_str), Some("e4"));
    assert_eq!(line.last().map(String::as_str), Some("Be7+"));

    let end = tree.end_of_line(tree.root());
    assert!(tree.position(end).legal_moves().is_empty());
}

#[test]
fn test_opera_game_with_variation() {
    let games = pre_parse(TWO_GAMES.as_bytes());
    let opera = &games[1];
    assert_eq!(opera.tag("Black"), Some("Duke Karl / Count Isouard"));

    let tree = opera.load().unwrap();
    let line = main_line(&tree);
    assert_eq!(line.len(), 33);
    assert_eq!(line[22], "O-O-O");
    assert_eq!(line.last().map(String::as_str), Some("Rd8+"));

    // 3...exd4 4.Qxd4 sits beside 3...Bg4
    let after_d4 = tree
        .ancestors(tree.end_of_line(tree.root()))
        .find(|&id| tree.nice_last_move(id) == "d4" && tree.parent(id) != Some(tree.root()))
        .unwrap();
    let replies = tree
        .children(after_d4)
        .iter()
        .map(|&(mv, _)| tree.position(after_d4).nice_string(mv))
        .collect::<Vec<_>>();
    assert_eq!(replies, ["Bg4", "exd4"]);
    assert_eq!(tree.len(), 1 + 33 + 2);
}

#[test]
fn test_broken_game_reports_the_token() {
    let games = pre_parse(b"[White \"A\"]\n\n1. e4 e5 2. Ke3 Nc6 *\n");
    let err = games[0].load().unwrap_err();
    assert!(matches!(err, PgnError::BadMove { ref token, .. } if token == "Ke3"));
}

#[test]
fn test_save_then_read_back() {
    let path = std::env::temp_dir().join(format!("kibitz-pgn-{}.pgn", std::process::id()));

    let start = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 3 20").unwrap();
    let moves = ["e8c8", "e1g1", "h8h1"].map(|m| m.parse().unwrap());
    save_pgn(&path, &start, &moves).unwrap();

    let games = read_pgn_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(games.len(), 1);
    assert_eq!(games[0].tag("SetUp"), Some("1"));

    let tree = games[0].load().unwrap();
    assert_eq!(tree.position(tree.root()), &start);
    assert_eq!(main_line(&tree), ["O-O-O", "O-O", "Rh1+"]);
}
