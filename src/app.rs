/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    io::{self, Write},
    ops::ControlFlow,
    process::ChildStdin,
    str::FromStr,
    sync::mpsc::{channel, Receiver, Sender},
    thread,
};

use anyhow::{bail, Context, Result};
use log::{debug, info};
use uci_parser::UciCommand;

use crate::{
    numbered_moves, read_pgn_file, save_pgn, validate_games, Config, EngineEvent, EngineListener,
    EngineSession, FrontendCommand, Move, MoveTree, NodeId, PgnError, PgnRecord, Position, Table,
};

/// Rows of the analysis table printed unless every row is asked for.
const TABLE_ROWS: usize = 10;

/// Everything the front end reacts to.
#[derive(Debug)]
pub enum FrontendEvent {
    /// A command typed by the user.
    Command(FrontendCommand),

    /// Output from the engine.
    Engine(EngineEvent),

    /// The user's input was closed.
    InputClosed,
}

impl From<EngineEvent> for FrontendEvent {
    fn from(event: EngineEvent) -> Self {
        Self::Engine(event)
    }
}

/// An interactive analysis board, backed by a UCI engine.
///
/// Holds the tree of every line explored so far, the node currently on the board,
/// and the engine session whose output fills that node's analysis table.
#[derive(Debug)]
pub struct Frontend<W: Write = ChildStdin> {
    tree: MoveTree,
    node: NodeId,

    /// Games of the most recently loaded PGN file, and which one is on the board.
    games: Vec<PgnRecord>,
    game: Option<usize>,

    session: EngineSession<W>,
    config: Config,

    /// Whether the engine should follow the board with `go infinite`.
    analysing: bool,

    sender: Sender<FrontendEvent>,
    receiver: Receiver<FrontendEvent>,
}

/// Routes engine output into the analysis table of the node on the board.
struct AnalysisSink<'a> {
    table: &'a mut Table,
    position: Position,
}

impl EngineListener for AnalysisSink<'_> {
    fn on_line(&mut self, line: &str) {
        if self.table.receive(line, &self.position) {
            return;
        }

        if line.starts_with("bestmove") || line.starts_with("id name") {
            println!("{line}");
        }
    }

    fn on_error_line(&mut self, line: &str) {
        eprintln!("{line}");
    }
}

impl Frontend<ChildStdin> {
    /// Creates a front end and starts the engine named in `config`, if any.
    pub fn new(config: Config) -> Self {
        let (sender, receiver) = channel();

        let session = match &config.engine {
            Some(engine) => EngineSession::spawn(engine, config.log_info_lines, sender.clone()),
            None => EngineSession::dead(config.log_info_lines),
        };

        let mut frontend = Self::with_channel(session, config, sender, receiver);
        frontend.start_engine();
        frontend
    }

    /// Runs the front end until the user exits or their input closes.
    pub fn run(&mut self) -> Result<()> {
        // Spawn a separate thread for handling user input
        let sender = self.sender.clone();
        thread::spawn(|| {
            if let Err(err) = input_handler(sender) {
                eprintln!("Input handler thread stopping after fatal error: {err}");
            }
        });

        self.print_alerts();
        if !self.session.is_alive() {
            println!("No engine is running. Analysis commands will be ignored.");
        }

        while let Ok(event) = self.receiver.recv() {
            let flow = match event {
                FrontendEvent::Command(cmd) => match self.handle_command(cmd) {
                    Ok(flow) => flow,
                    Err(err) => {
                        eprintln!("Error: {err:#}");
                        ControlFlow::Continue(())
                    }
                },

                FrontendEvent::Engine(EngineEvent::Exited) => {
                    self.session.handle_exit();
                    ControlFlow::Continue(())
                }

                FrontendEvent::Engine(event) => {
                    self.receive_engine_event(event);
                    ControlFlow::Continue(())
                }

                FrontendEvent::InputClosed => ControlFlow::Break(()),
            };

            self.print_alerts();

            if flow.is_break() {
                break;
            }
        }

        self.session.shutdown();
        Ok(())
    }
}

impl<W: Write> Frontend<W> {
    /// Creates a front end that talks to an already-built `session`.
    ///
    /// Nothing is sent to the engine until a command asks for it.
    pub fn with_session(session: EngineSession<W>, config: Config) -> Self {
        let (sender, receiver) = channel();
        Self::with_channel(session, config, sender, receiver)
    }

    fn with_channel(
        session: EngineSession<W>,
        config: Config,
        sender: Sender<FrontendEvent>,
        receiver: Receiver<FrontendEvent>,
    ) -> Self {
        Self {
            tree: MoveTree::default(),
            node: NodeId::ROOT,
            games: Vec::new(),
            game: None,
            session,
            config,
            analysing: false,
            sender,
            receiver,
        }
    }

    /// The tree of every line explored so far.
    pub const fn tree(&self) -> &MoveTree {
        &self.tree
    }

    /// The node currently on the board.
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// The position currently on the board.
    pub fn position(&self) -> &Position {
        self.tree.position(self.node)
    }

    /// Whether the engine is following the board.
    pub const fn is_analysing(&self) -> bool {
        self.analysing
    }

    /// The engine session.
    pub const fn session(&self) -> &EngineSession<W> {
        &self.session
    }

    /// Sends the engine its startup handshake and every configured option.
    pub fn start_engine(&mut self) {
        if !self.session.is_alive() {
            return;
        }

        self.session.send("uci");
        for (name, value) in &self.config.options {
            self.session
                .set_option(name, Config::option_value_string(value));
        }
        self.session.send("ucinewgame");
    }

    /// Replaces the whole tree, putting its root on the board.
    pub fn set_tree(&mut self, tree: MoveTree) {
        self.tree = tree;
        self.node = self.tree.root();
        debug!("Board is now at the root of a new tree");
        self.reset_engine_game();
    }

    /// Starts a new game from `position`, forgetting any loaded PGN file.
    pub fn new_game(&mut self, position: Position) {
        self.games.clear();
        self.game = None;
        self.set_tree(MoveTree::new(position));
    }

    /// Starts a new game from `fen`.
    pub fn load_fen(&mut self, fen: &str) -> Result<()> {
        let position = Position::from_fen(fen).with_context(|| format!("Invalid FEN {fen:?}"))?;
        self.new_game(position);
        Ok(())
    }

    /// Sends `ucinewgame` once the engine is idle, so it drops everything it has cached.
    ///
    /// If the engine is following the board, analysis restarts on the current node.
    pub fn reset_engine_game(&mut self) {
        if self.analysing {
            self.start_analysis(true);
        } else {
            self.session.send("stop");
            self.session.send("ucinewgame");
        }
    }

    /// Loads every game of the PGN file at `path`, returning each failure with its game number.
    ///
    /// Neither the board nor the loaded games change.
    pub fn validate_pgn(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(usize, Vec<(usize, PgnError)>)> {
        let games = read_pgn_file(path)?;
        Ok((games.len(), validate_games(&games)))
    }

    /// Plays the move at the top of the current node's analysis table.
    pub fn play_best(&mut self) -> Result<()> {
        let Some(best) = self.tree.table(self.node).sorted().first().map(|info| info.mv()) else {
            bail!("No analysis to take a move from");
        };

        if let Some(reason) = self.position().illegal_reason(best) {
            bail!("The engine's move {best} is illegal here: {reason}");
        }

        let node = self.tree.make_move(self.node, best);
        self.go_to(node);
        Ok(())
    }

    /// Loads game number `index`, counting from 1, of the PGN file at `path`.
    pub fn load_pgn(&mut self, path: impl AsRef<std::path::Path>, index: usize) -> Result<()> {
        let games = read_pgn_file(path)?;
        if index == 0 || index > games.len() {
            bail!("Game {index} does not exist; the file has {} game(s)", games.len());
        }

        let record = &games[index - 1];
        let tree = record
            .load()
            .with_context(|| format!("Failed to load game {index} ({})", record.description()))?;

        info!("Loaded game {index} of {}: {}", games.len(), record.description());
        self.games = games;
        self.game = Some(index - 1);
        self.set_tree(tree);
        Ok(())
    }

    /// Plays `moves` one by one from the current node, stopping at the first that cannot be played.
    ///
    /// Each move may be written in algebraic notation (`Nf3`) or as a coordinate move (`g1f3`).
    pub fn play_moves<T: AsRef<str>>(&mut self, moves: &[T]) -> Result<()> {
        let mut node = self.node;
        let mut result = Ok(());

        for text in moves {
            let text = text.as_ref();
            match self.parse_move(node, text) {
                Ok(mv) => node = self.tree.make_move(node, mv),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        self.go_to(node);
        result
    }

    fn parse_move(&self, node: NodeId, text: &str) -> Result<Move> {
        let position = self.tree.position(node);

        if let Ok(mv) = Move::from_uci(text) {
            if let Some(reason) = position.illegal_reason(mv) {
                bail!("Illegal move {text:?}: {reason}");
            }
            return Ok(mv);
        }

        position
            .resolve_notation(text)
            .with_context(|| format!("Could not play {text:?}"))
    }

    /// Puts `node` on the board, restarting analysis there if the engine is following the board.
    pub fn go_to(&mut self, node: NodeId) {
        if node == self.node {
            return;
        }

        self.node = node;
        self.on_node_changed();
    }

    fn on_node_changed(&mut self) {
        debug!("Board is now at node {:?}", self.node);

        if self.analysing {
            self.start_analysis(false);
        }
    }

    /// Tells the engine to analyse the node on the board, discarding any output about earlier positions.
    ///
    /// With `new_game`, the engine is also told to forget earlier searches once it has stopped.
    fn start_analysis(&mut self, new_game: bool) {
        self.session.send("stop");
        if new_game {
            self.session.send("ucinewgame");
        }

        self.tree.table_mut(self.node).invalidate();
        self.send_position();
        self.session.send("go infinite");
    }

    fn send_position(&mut self) {
        let command = position_command(&self.tree, self.node);
        self.session.send(&command);
        self.session.sync();
    }

    /// Passes one event from the engine's output streams through the session.
    pub fn receive_engine_event(&mut self, event: EngineEvent) {
        let position = *self.tree.position(self.node);
        let mut sink = AnalysisSink {
            table: self.tree.table_mut(self.node),
            position,
        };

        match event {
            EngineEvent::Stdout(line) => self.session.receive_line(&line, &mut sink),
            EngineEvent::Stderr(line) => self.session.receive_error_line(&line, &mut sink),
            EngineEvent::Exited => {}
        }
    }

    fn print_alerts(&mut self) {
        for alert in self.session.take_alerts() {
            eprintln!("{alert}");
        }
    }

    /// Executes one user command.
    pub fn handle_command(&mut self, cmd: FrontendCommand) -> Result<ControlFlow<()>> {
        match cmd {
            FrontendCommand::Display => self.display(),

            FrontendCommand::Fen { fen } => {
                if fen.is_empty() {
                    println!("{}", self.position().to_fen());
                } else {
                    self.load_fen(&fen.join(" "))?;
                }
            }

            FrontendCommand::Move { moves } => self.play_moves(&moves)?,

            FrontendCommand::Back { count } => {
                let mut node = self.node;
                for _ in 0..count {
                    match self.tree.parent(node) {
                        Some(parent) => node = parent,
                        None => break,
                    }
                }
                self.go_to(node);
            }

            FrontendCommand::Forward { count } => {
                let mut node = self.node;
                for _ in 0..count {
                    match self.tree.children(node).first() {
                        Some(&(_, child)) => node = child,
                        None => break,
                    }
                }
                self.go_to(node);
            }

            FrontendCommand::NewGame => {
                self.new_game(Position::default());
                self.display();
            }

            FrontendCommand::Root => self.go_to(self.tree.root()),

            FrontendCommand::End => self.go_to(self.tree.end_of_line(self.node)),

            FrontendCommand::Moves => {
                let position = self.position();
                let mut moves = position
                    .legal_moves()
                    .into_iter()
                    .map(|mv| position.nice_string(mv))
                    .collect::<Vec<_>>();
                moves.sort();

                // If there are none, print "(none)"
                if moves.is_empty() {
                    println!("(none)");
                } else {
                    println!("{}", moves.join(", "));
                }
            }

            FrontendCommand::History => self.history(),

            FrontendCommand::Pgn { path, index } => {
                self.load_pgn(&path, index)?;
                self.display();
            }

            FrontendCommand::Games => {
                if self.games.is_empty() {
                    println!("(no PGN file loaded)");
                }
                for (i, game) in self.games.iter().enumerate() {
                    let marker = if Some(i) == self.game { '*' } else { ' ' };
                    println!("{marker}{:>4}. {}", i + 1, game.description());
                }
            }

            FrontendCommand::Tags => match self.game.and_then(|i| self.games.get(i)) {
                Some(game) => {
                    for (key, value) in game.tags() {
                        println!("[{key} \"{value}\"]");
                    }
                }
                None => println!("(no PGN game loaded)"),
            },

            FrontendCommand::ValidatePgn { path } => {
                let (count, failures) = self.validate_pgn(&path)?;
                for (index, err) in &failures {
                    println!("Game {index}: {err}");
                }

                if failures.is_empty() {
                    println!("All {count} game(s) in {path:?} load cleanly");
                } else {
                    println!("{} of {count} game(s) in {path:?} failed to load", failures.len());
                }
            }

            FrontendCommand::Save { path } => {
                let moves = self.tree.history(self.node);
                save_pgn(&path, self.tree.position(self.tree.root()), &moves)?;
                println!("Saved {} move(s) to {path:?}", moves.len());
            }

            FrontendCommand::Analyse => {
                if !self.session.is_alive() {
                    bail!("No engine is running");
                }
                self.analysing = true;
                self.start_analysis(false);
            }

            FrontendCommand::Halt => {
                self.analysing = false;
                self.session.send("stop");
            }

            FrontendCommand::PlayBest => self.play_best()?,

            FrontendCommand::ResetCache => self.reset_engine_game(),

            FrontendCommand::Table { all } => self.table(all),

            FrontendCommand::Exit => return Ok(ControlFlow::Break(())),

            FrontendCommand::Uci { cmd, raw } => return self.handle_uci_command(cmd, &raw),
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Passes a UCI command through to the engine.
    fn handle_uci_command(&mut self, cmd: UciCommand, raw: &str) -> Result<ControlFlow<()>> {
        match cmd {
            UciCommand::Position { .. } => bail!("The board is set with `fen`, `move`, and `pgn`, not `position`"),

            UciCommand::Go(_) => {
                // The engine only ever searches the position on the board
                self.analysing = false;
                self.session.send("stop");
                self.tree.table_mut(self.node).invalidate();
                self.send_position();
                self.session.send(raw);
            }

            UciCommand::Stop => {
                self.analysing = false;
                self.session.send(raw);
            }

            UciCommand::Quit => return Ok(ControlFlow::Break(())),

            _ => self.session.send(raw),
        }

        Ok(ControlFlow::Continue(()))
    }

    fn display(&self) {
        println!("{:?}", self.position());

        if let Some(eval) = self.tree.table(self.node).eval() {
            println!("Eval: {:.1}% for White", eval * 100.0);
        }
    }

    fn history(&self) {
        let root = self.tree.root();
        let moves = self.tree.history(self.node);
        let line = numbered_moves(self.tree.position(root), &moves);

        if line.is_empty() {
            println!("(start of game)");
        } else {
            println!("{}", line.join(" "));
        }

        let position = self.position();
        let continuations = self
            .tree
            .children(self.node)
            .iter()
            .map(|&(mv, _)| position.nice_string(mv))
            .collect::<Vec<_>>();

        if !continuations.is_empty() {
            println!("Continuations: {}", continuations.join(", "));
        }
    }

    fn table(&self, all: bool) {
        let table = self.tree.table(self.node);
        if table.is_empty() {
            println!("(no analysis)");
            return;
        }

        println!(
            "Nodes: {}  NPS: {}  Time: {}ms",
            table.nodes, table.nps, table.time
        );

        let rows = if all { usize::MAX } else { TABLE_ROWS };
        for info in table.sorted().into_iter().take(rows) {
            let pv = info.nice_pv();
            let first = pv.first().map(String::as_str).unwrap_or("??");
            let stats = info.stats_list(&self.config.stats, table.nodes);
            println!(
                "{first:>8}  {}  | {}",
                stats.join("  "),
                pv.iter().skip(1).cloned().collect::<Vec<_>>().join(" ")
            );
        }
    }
}

/// The `position` command describing `node`: its game's starting FEN and the moves played since.
pub fn position_command(tree: &MoveTree, node: NodeId) -> String {
    let mut command = format!("position fen {}", tree.initial_fen());

    let moves = tree.history(node);
    if !moves.is_empty() {
        command.push_str(" moves");
        for mv in moves {
            command.push(' ');
            command.push_str(&mv.to_uci());
        }
    }

    command
}

/// Loop forever, reading input from `stdin` and sending it over `sender`.
fn input_handler(sender: Sender<FrontendEvent>) -> Result<()> {
    let mut buffer = String::with_capacity(2048);

    loop {
        // Clear the buffer, read input, and trim the trailing newline
        buffer.clear();
        let bytes = io::stdin()
            .read_line(&mut buffer)
            .context("Failed to read line of user input")?;

        // For ctrl + d
        if 0 == bytes {
            sender
                .send(FrontendEvent::InputClosed)
                .context("Failed to send exit event after receiving empty input")?;
            return Ok(());
        }

        // Trim any leading/trailing whitespace
        let buf = buffer.trim();

        // Ignore empty lines
        if buf.is_empty() {
            continue;
        }

        match FrontendCommand::from_str(buf) {
            Ok(cmd) => sender
                .send(FrontendEvent::Command(cmd))
                .context("Failed to send command to front end")?,

            // Clap errors already carry their own help text
            Err(err) => eprintln!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontend() -> Frontend<Vec<u8>> {
        Frontend::with_session(
            EngineSession::with_writer(Vec::<u8>::new(), false),
            Config::default(),
        )
    }

    fn sent(frontend: &Frontend<Vec<u8>>) -> String {
        let written = frontend.session().writer().cloned().unwrap_or_default();
        String::from_utf8(written).unwrap()
    }

    fn run(frontend: &mut Frontend<Vec<u8>>, input: &str) -> ControlFlow<()> {
        frontend.handle_command(input.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_position_command() {
        let mut tree = MoveTree::default();
        assert_eq!(
            position_command(&tree, tree.root()),
            "position fen rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );

        let e4 = tree.make_move(tree.root(), "e2e4".parse().unwrap());
        let e5 = tree.make_move(e4, "e7e5".parse().unwrap());
        assert!(position_command(&tree, e5).ends_with(" w KQkq - 0 1 moves e2e4 e7e5"));
    }

    #[test]
    fn test_start_engine() {
        let mut frontend = frontend();
        frontend.start_engine();

        let sent = sent(&frontend);
        assert!(sent.starts_with("uci\n"));
        assert!(sent.contains("setoption name MultiPV value 500\n"));
        assert!(sent.contains("setoption name ScoreType value centipawn\n"));
        assert!(sent.ends_with("ucinewgame\n"));
    }

    #[test]
    fn test_navigation() {
        let mut frontend = frontend();
        run(&mut frontend, "move e4 e7e5 Nf3");
        assert_eq!(frontend.tree().history(frontend.node()), ["e2e4", "e7e5", "g1f3"]);

        run(&mut frontend, "back 2");
        assert_eq!(frontend.tree().history(frontend.node()), ["e2e4"]);

        run(&mut frontend, "root");
        assert_eq!(frontend.node(), frontend.tree().root());

        run(&mut frontend, "forward");
        assert_eq!(frontend.tree().history(frontend.node()), ["e2e4"]);

        run(&mut frontend, "end");
        assert_eq!(frontend.tree().history(frontend.node()), ["e2e4", "e7e5", "g1f3"]);

        // Stepping past either end of the line stays put
        run(&mut frontend, "forward 5");
        assert_eq!(frontend.tree().history(frontend.node()).len(), 3);
        run(&mut frontend, "back 10");
        assert_eq!(frontend.node(), frontend.tree().root());
    }

    #[test]
    fn test_bad_moves_stop_early() {
        let mut frontend = frontend();
        let err = frontend.play_moves(&["e4", "e5", "Ke3", "Nf3"]).unwrap_err();
        assert!(err.to_string().contains("Ke3"));

        // The moves before the bad one are still played
        assert_eq!(frontend.tree().history(frontend.node()), ["e2e4", "e7e5"]);

        let err = frontend.play_moves(&["e1e3"]).unwrap_err();
        assert!(err.to_string().contains("Illegal move"));
        assert_eq!(frontend.tree().history(frontend.node()).len(), 2);
    }

    #[test]
    fn test_analysis_follows_board() {
        let mut frontend = frontend();
        run(&mut frontend, "analyse");
        assert!(frontend.is_analysing());
        assert_eq!(frontend.session().pending_syncs(), 1);

        run(&mut frontend, "m e4");
        let output = sent(&frontend);
        assert!(output.ends_with(
            "stop\nposition fen rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 moves e2e4\nisready\ngo infinite\n"
        ));
        assert_eq!(frontend.session().pending_syncs(), 2);

        run(&mut frontend, "halt");
        assert!(!frontend.is_analysing());
        let before = sent(&frontend);
        assert!(before.ends_with("stop\n"));

        // Once halted, moving the board does not restart the engine
        run(&mut frontend, "b");
        assert_eq!(sent(&frontend), before);
    }

    #[test]
    fn test_engine_output_fills_table() {
        let mut frontend = frontend();
        run(&mut frontend, "analyse");

        // Output from before the sync is answered belongs to an older position
        frontend.receive_engine_event(EngineEvent::Stdout(String::from(
            "info depth 5 multipv 1 score cp 30 nodes 100 pv d2d4",
        )));
        assert!(frontend.tree().table(frontend.node()).is_empty());

        frontend.receive_engine_event(EngineEvent::Stdout(String::from("readyok")));
        frontend.receive_engine_event(EngineEvent::Stdout(String::from(
            "info depth 5 multipv 1 score cp 30 nodes 100 pv e2e4 e7e5",
        )));

        let table = frontend.tree().table(frontend.node());
        assert_eq!(table.len(), 1);
        assert_eq!(table.nodes, 100);
        assert!(table.get("e2e4".parse().unwrap()).is_some());
    }

    #[test]
    fn test_uci_passthrough() {
        let mut frontend = frontend();
        run(&mut frontend, "m d4");

        assert!(frontend
            .handle_command("position startpos".parse().unwrap())
            .is_err());

        run(&mut frontend, "go nodes 1000");
        assert!(sent(&frontend).ends_with(" moves d2d4\nisready\ngo nodes 1000\n"));
        assert!(!frontend.is_analysing());

        run(&mut frontend, "setoption name Threads value 4");
        assert!(sent(&frontend).ends_with("setoption name Threads value 4\n"));

        assert!(run(&mut frontend, "quit").is_break());
        assert!(run(&mut frontend, "exit").is_break());
    }

    #[test]
    fn test_fen_resets_tree() {
        let mut frontend = frontend();
        run(&mut frontend, "m e4 e5");

        let fen = "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1";
        run(&mut frontend, &format!("fen {fen}"));
        assert_eq!(frontend.tree().len(), 1);
        assert_eq!(frontend.position().to_fen(), fen);
        assert!(sent(&frontend).ends_with("ucinewgame\n"));

        assert!(frontend.load_fen("not a fen").is_err());
        assert_eq!(frontend.position().to_fen(), fen);
    }

    #[test]
    fn test_new_game_stops_the_search_first() {
        let mut frontend = frontend();
        run(&mut frontend, "m e4 e5");
        run(&mut frontend, "analyse");

        run(&mut frontend, "new");
        assert_eq!(frontend.tree().len(), 1);
        assert_eq!(frontend.node(), frontend.tree().root());
        assert_eq!(frontend.position(), &Position::default());
        assert!(frontend.is_analysing());
        assert!(sent(&frontend).ends_with(
            "stop\nucinewgame\nposition fen rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1\nisready\ngo infinite\n"
        ));

        let fen = "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1";
        run(&mut frontend, &format!("fen {fen}"));
        assert!(sent(&frontend).ends_with(&format!(
            "go infinite\nstop\nucinewgame\nposition fen {fen}\nisready\ngo infinite\n"
        )));
    }

    #[test]
    fn test_reset_cache() {
        let mut frontend = frontend();
        run(&mut frontend, "m d4");

        run(&mut frontend, "reset");
        assert!(sent(&frontend).ends_with("stop\nucinewgame\n"));

        // The board is untouched
        assert_eq!(frontend.tree().history(frontend.node()), ["d2d4"]);

        run(&mut frontend, "analyse");
        run(&mut frontend, "reset");
        assert!(sent(&frontend).ends_with("stop\nucinewgame\nposition fen rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 moves d2d4\nisready\ngo infinite\n"));
        assert_eq!(frontend.tree().len(), 2);
    }

    #[test]
    fn test_play_best() {
        let mut frontend = frontend();
        assert!(frontend.play_best().is_err());

        run(&mut frontend, "analyse");
        for line in [
            "readyok",
            "info depth 8 multipv 2 score cp 20 nodes 900 pv e2e4 e7e5",
            "info depth 8 multipv 1 score cp 35 nodes 900 pv d2d4 d7d5",
        ] {
            frontend.receive_engine_event(EngineEvent::Stdout(String::from(line)));
        }

        run(&mut frontend, "best");
        assert_eq!(frontend.tree().history(frontend.node()), ["d2d4"]);
        assert!(sent(&frontend).ends_with(" moves d2d4\nisready\ngo infinite\n"));

        // Nothing has been analysed at the new node yet
        assert!(frontend.play_best().is_err());
        assert_eq!(frontend.tree().history(frontend.node()).len(), 1);
    }

    #[test]
    fn test_halted_board_keeps_its_analysis() {
        let mut frontend = frontend();
        run(&mut frontend, "analyse");
        frontend.receive_engine_event(EngineEvent::Stdout(String::from("readyok")));
        frontend.receive_engine_event(EngineEvent::Stdout(String::from(
            "info depth 5 multipv 1 score cp 30 nodes 100 pv e2e4 e7e5",
        )));
        run(&mut frontend, "halt");

        let version = frontend.tree().table(frontend.node()).version;
        run(&mut frontend, "m e4");
        run(&mut frontend, "b");

        let table = frontend.tree().table(frontend.node());
        assert_eq!(table.len(), 1);
        assert_eq!(table.nodes, 100);
        assert_eq!(table.version, version);
    }

    #[test]
    fn test_validate_pgn() {
        let path = std::env::temp_dir().join(format!("kibitz-validate-{}.pgn", std::process::id()));
        std::fs::write(
            &path,
            "[White \"A\"]\n\n1. e4 e5 *\n\n[White \"B\"]\n\n1. e4 e5 2. Ke3 *\n",
        )
        .unwrap();

        let mut frontend = frontend();
        run(&mut frontend, "m c4");
        let before = sent(&frontend);

        let (count, failures) = frontend.validate_pgn(&path).unwrap();
        assert_eq!(count, 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 2);

        run(&mut frontend, &format!("validate {}", path.display()));
        assert_eq!(sent(&frontend), before);
        assert_eq!(frontend.tree().history(frontend.node()), ["c2c4"]);

        std::fs::remove_file(&path).unwrap();
        assert!(frontend.validate_pgn(&path).is_err());
    }

    #[test]
    fn test_load_pgn() {
        let path = std::env::temp_dir().join(format!("kibitz-app-{}.pgn", std::process::id()));
        std::fs::write(
            &path,
            "[White \"A\"]\n[Black \"B\"]\n\n1. e4 e5 (1... c5) 2. Nf3 1-0\n\n[White \"C\"]\n\n1. d4 *\n",
        )
        .unwrap();

        let mut frontend = frontend();
        frontend.load_pgn(&path, 2).unwrap();
        assert_eq!(frontend.node(), frontend.tree().root());
        let end = frontend.tree().end_of_line(frontend.node());
        assert_eq!(frontend.tree().history(end), ["d2d4"]);

        frontend.load_pgn(&path, 1).unwrap();
        assert_eq!(frontend.tree().len(), 5);

        assert!(frontend.load_pgn(&path, 3).is_err());
        assert!(frontend.load_pgn(&path, 0).is_err());

        std::fs::remove_file(&path).unwrap();
    }
}
