//! Reader and printer for the textual exchange format ("jxchg").
//!
//! ```text
//! FS   := '#' n FS? | '[' TYPE (FEATURE FS)* ']'
//! TYPE := word | "quoted" | number
//! ```
//!
//! Numbers in type or feature position are ids. Quoted names are looked up
//! as grammar types and otherwise become runtime atoms. A coreference `#n`
//! may be used before its body is complete, which is how cycles are written.

use crate::arena::{DagArena, NodeId};
use rustc_hash::FxHashMap;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;
use tfs_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use tfs_common::{FeatureId, SymbolTable, TypeId};
use tfs_lattice::TypeLattice;
use tracing::warn;

/// 1-based line and column of a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JxchgError {
    #[error("{position}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: Position,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("{position}: unterminated string")]
    UnterminatedString { position: Position },
    #[error("{position}: unknown feature `{name}`")]
    UnknownFeature { name: String, position: Position },
    #[error("{position}: coreference number out of range")]
    BadCoreference { position: Position },
    #[error("{position}: trailing input after feature structure")]
    TrailingInput { position: Position },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Hash,
    Number(u32),
    Word(String),
    Quoted(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::OpenBracket => f.write_str("`[`"),
            Token::CloseBracket => f.write_str("`]`"),
            Token::OpenParen => f.write_str("`(`"),
            Token::CloseParen => f.write_str("`)`"),
            Token::Hash => f.write_str("`#`"),
            Token::Number(n) => write!(f, "number {n}"),
            Token::Word(w) => write!(f, "`{w}`"),
            Token::Quoted(q) => write!(f, "\"{q}\""),
        }
    }
}

/// Splits jxchg text into tokens.
pub struct Tokenizer<'a> {
    chars: Peekable<CharIndices<'a>>,
    line: u32,
    column: u32,
    peeked: Option<Option<(Token, Position)>>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Tokenizer {
            chars: text.char_indices().peekable(),
            line: 1,
            column: 0,
            peeked: None,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn scan(&mut self) -> Result<Option<(Token, Position)>, JxchgError> {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let position = Position {
            line: self.line,
            column: self.column + 1,
        };
        let Some(c) = self.bump() else {
            return Ok(None);
        };
        let token = match c {
            '[' => Token::OpenBracket,
            ']' => Token::CloseBracket,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            '#' => Token::Hash,
            '"' => Token::Quoted(self.scan_quoted(position)?),
            _ => {
                let mut word = String::from(c);
                while let Some(next) = self.peek_char() {
                    if next.is_whitespace() || is_delimiter(next) {
                        break;
                    }
                    word.push(next);
                    self.bump();
                }
                match word.parse::<u32>() {
                    Ok(n) if word.bytes().all(|b| b.is_ascii_digit()) => Token::Number(n),
                    _ => Token::Word(word),
                }
            }
        };
        Ok(Some((token, position)))
    }

    fn scan_quoted(&mut self, position: Position) -> Result<String, JxchgError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(JxchgError::UnterminatedString { position }),
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some(escaped) => text.push(escaped),
                    None => return Err(JxchgError::UnterminatedString { position }),
                },
                Some(c) => text.push(c),
            }
        }
    }

    /// Next token and its position, `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<(Token, Position)>, JxchgError> {
        match self.peeked.take() {
            Some(peeked) => Ok(peeked),
            None => self.scan(),
        }
    }

    pub fn peek_token(&mut self) -> Result<Option<&(Token, Position)>, JxchgError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scan()?);
        }
        Ok(self.peeked.as_ref().and_then(Option::as_ref))
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '[' | ']' | '(' | ')' | '#' | '"')
}

fn expect_some(
    token: Option<(Token, Position)>,
    expected: &'static str,
) -> Result<(Token, Position), JxchgError> {
    token.ok_or(JxchgError::UnexpectedEnd { expected })
}

fn unexpected(expected: &'static str, token: Token, position: Position) -> JxchgError {
    JxchgError::UnexpectedToken {
        expected,
        found: token.to_string(),
        position,
    }
}

/// Builds dags from jxchg tokens, resolving names against a lattice and a
/// feature table.
pub struct JxchgReader<'g> {
    lattice: &'g TypeLattice,
    features: &'g SymbolTable<FeatureId>,
}

impl<'g> JxchgReader<'g> {
    pub fn new(lattice: &'g TypeLattice, features: &'g SymbolTable<FeatureId>) -> Self {
        JxchgReader { lattice, features }
    }

    /// Read one complete feature structure from `text`.
    pub fn parse(&self, arena: &mut DagArena, text: &str) -> Result<NodeId, JxchgError> {
        let mut tokens = Tokenizer::new(text);
        let root = self.read(arena, &mut tokens)?;
        if let Some((_, position)) = tokens.next_token()? {
            return Err(JxchgError::TrailingInput { position });
        }
        Ok(root)
    }

    /// Read the next feature structure from a token stream. Nodes allocated
    /// before an error are released again.
    pub fn read(&self, arena: &mut DagArena, tokens: &mut Tokenizer<'_>) -> Result<NodeId, JxchgError> {
        let checkpoint = arena.checkpoint();
        let mut corefs = FxHashMap::default();
        let result = self.read_fs(arena, tokens, &mut corefs);
        if result.is_err() {
            arena.truncate(checkpoint);
        }
        result
    }

    fn read_fs(
        &self,
        arena: &mut DagArena,
        tokens: &mut Tokenizer<'_>,
        corefs: &mut FxHashMap<u32, NodeId>,
    ) -> Result<NodeId, JxchgError> {
        let (token, position) = expect_some(tokens.next_token()?, "`[` or `#`")?;
        match token {
            Token::OpenBracket => {
                let node = arena.add_node(TypeId::TOP);
                self.read_body(arena, tokens, corefs, node)?;
                Ok(node)
            }
            Token::Hash => {
                let (token, position) = expect_some(tokens.next_token()?, "coreference number")?;
                let Token::Number(key) = token else {
                    return Err(JxchgError::BadCoreference { position });
                };
                if let Some(&node) = corefs.get(&key) {
                    return Ok(node);
                }
                let node = arena.add_node(TypeId::TOP);
                corefs.insert(key, node);
                let (token, position) = expect_some(tokens.next_token()?, "`[`")?;
                if token != Token::OpenBracket {
                    return Err(unexpected("`[`", token, position));
                }
                self.read_body(arena, tokens, corefs, node)?;
                Ok(node)
            }
            other => Err(unexpected("`[` or `#`", other, position)),
        }
    }

    /// Type and feature/value pairs after `[`, up to the matching `]`.
    fn read_body(
        &self,
        arena: &mut DagArena,
        tokens: &mut Tokenizer<'_>,
        corefs: &mut FxHashMap<u32, NodeId>,
        node: NodeId,
    ) -> Result<(), JxchgError> {
        let (token, position) = expect_some(tokens.next_token()?, "type")?;
        let ty = match token {
            Token::Number(id) => {
                let ty = TypeId(id);
                if self.lattice.is_grammar_type(ty) {
                    ty
                } else {
                    warn!(target: "tfs::jxchg", %position, id, "unknown type id, using TOP");
                    TypeId::TOP
                }
            }
            Token::Word(name) => self.lattice.type_id(&name).unwrap_or_else(|| {
                warn!(target: "tfs::jxchg", %position, %name, "unknown type, using TOP");
                TypeId::TOP
            }),
            Token::Quoted(name) => self.lattice.intern_atom(&name),
            other => return Err(unexpected("type", other, position)),
        };
        arena.set_node_type(node, ty);

        loop {
            let (token, position) = expect_some(tokens.next_token()?, "feature or `]`")?;
            let feature = match token {
                Token::CloseBracket => return Ok(()),
                Token::Number(id) => {
                    let feature = FeatureId(id);
                    if !self.features.contains(feature) {
                        return Err(JxchgError::UnknownFeature {
                            name: id.to_string(),
                            position,
                        });
                    }
                    feature
                }
                Token::Word(name) => self
                    .features
                    .get(&name)
                    .ok_or(JxchgError::UnknownFeature { name, position })?,
                other => return Err(unexpected("feature or `]`", other, position)),
            };
            let value = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.read_fs(arena, tokens, corefs)
            })?;
            arena.add_edge(node, feature, value);
        }
    }
}

/// Read one feature structure from a token stream.
pub fn build_from_token_stream(
    arena: &mut DagArena,
    tokens: &mut Tokenizer<'_>,
    lattice: &TypeLattice,
    features: &SymbolTable<FeatureId>,
) -> Result<NodeId, JxchgError> {
    JxchgReader::new(lattice, features).read(arena, tokens)
}

/// Prints a dag in jxchg syntax: `[type FEAT[...] FEAT #1[...] FEAT #1]`.
///
/// Follows forward pointers and pending edges, so it shows the entangled
/// result of an unfinished episode as well as committed structure.
pub struct DagDisplay<'a> {
    arena: &'a DagArena,
    root: NodeId,
    lattice: &'a TypeLattice,
    features: &'a SymbolTable<FeatureId>,
}

impl<'a> DagDisplay<'a> {
    pub fn new(
        arena: &'a DagArena,
        root: NodeId,
        lattice: &'a TypeLattice,
        features: &'a SymbolTable<FeatureId>,
    ) -> Self {
        DagDisplay {
            arena,
            root,
            lattice,
            features,
        }
    }

    fn count_references(&self, node: NodeId, counts: &mut FxHashMap<NodeId, u32>) {
        let node = self.arena.deref(node);
        let count = counts.entry(node).or_insert(0);
        *count += 1;
        if *count > 1 {
            return;
        }
        for edge in self.arena.current_edges(node) {
            stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.count_references(edge.target, counts)
            });
        }
    }

    fn write_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        node: NodeId,
        counts: &FxHashMap<NodeId, u32>,
        numbers: &mut FxHashMap<NodeId, u32>,
    ) -> fmt::Result {
        let node = self.arena.deref(node);
        if counts.get(&node).copied().unwrap_or(0) > 1 {
            if let Some(number) = numbers.get(&node) {
                return write!(f, "#{number}");
            }
            let number = numbers.len() as u32 + 1;
            numbers.insert(node, number);
            write!(f, "#{number}")?;
        }
        f.write_str("[")?;
        self.write_type(f, self.arena.current_type(node))?;
        for edge in self.arena.current_edges(node) {
            match self.features.name(edge.feature) {
                Some(name) => write!(f, " {name}")?,
                None => write!(f, " {}", edge.feature.0)?,
            }
            let target = self.arena.deref(edge.target);
            if counts.get(&target).copied().unwrap_or(0) > 1 {
                f.write_str(" ")?;
            }
            stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.write_node(f, target, counts, numbers)
            })?;
        }
        f.write_str("]")
    }

    fn write_type(&self, f: &mut fmt::Formatter<'_>, ty: TypeId) -> fmt::Result {
        match self.lattice.type_name(ty) {
            Some(name) if self.lattice.is_atom(ty) => {
                f.write_str("\"")?;
                for c in name.chars() {
                    if matches!(c, '"' | '\\') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
            Some(name) => f.write_str(&name),
            None => write!(f, "{}", ty.0),
        }
    }
}

impl fmt::Display for DagDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts = FxHashMap::default();
        self.count_references(self.root, &mut counts);
        let mut numbers = FxHashMap::default();
        self.write_node(f, self.root, &counts, &mut numbers)
    }
}

#[cfg(test)]
#[path = "../tests/jxchg_tests.rs"]
mod tests;
