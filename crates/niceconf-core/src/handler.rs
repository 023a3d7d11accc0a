//! Parse handlers
//!
//! A handler is the state machine for one construct at one nesting level.
//! The dispatch loop in [`crate::engine`] feeds it one character at a time
//! and acts on the returned [`Status`]: pop it and hand its value to the
//! parent, push a child for the same character, or redeliver the character
//! to whatever is on top afterwards.

use indexmap::IndexMap;

use crate::environment::Environment;
use crate::value::{self, Value};

/// What a handler tells the dispatch loop after receiving one character
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    /// The handler is finished and its value is ready for the parent
    pub done: bool,
    /// Try to start a child handler with this same character
    pub waiting: bool,
    /// Redeliver this character to the handler that is on top afterwards
    pub revalidate: bool,
    /// Do not hand the finished value to the parent
    pub ignore: bool,
}

impl Status {
    /// Character consumed; keep feeding this handler
    pub const CONTINUE: Status = Status {
        done: false,
        waiting: false,
        revalidate: false,
        ignore: false,
    };

    /// Character not consumed; start a child handler if it is a start token
    pub const WAITING: Status = Status {
        done: false,
        waiting: true,
        revalidate: false,
        ignore: false,
    };

    /// Finished; the character was the last one of this construct
    pub const DONE: Status = Status {
        done: true,
        waiting: false,
        revalidate: false,
        ignore: false,
    };

    /// Finished; the character belongs to the enclosing construct
    pub const DONE_REVALIDATE: Status = Status {
        done: true,
        waiting: false,
        revalidate: true,
        ignore: false,
    };

    /// Same status, but the finished value is discarded instead of handed up
    pub fn ignored(self) -> Self {
        Self {
            ignore: true,
            ..self
        }
    }
}

/// The six kinds of construct the grammar knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Dictionary,
    List,
    String,
    Integer,
    EnvironmentReference,
    Boolean,
}

impl HandlerKind {
    /// Short name used in log output
    pub fn name(self) -> &'static str {
        match self {
            HandlerKind::Dictionary => "dict",
            HandlerKind::List => "list",
            HandlerKind::String => "string",
            HandlerKind::Integer => "integer",
            HandlerKind::EnvironmentReference => "reference",
            HandlerKind::Boolean => "boolean",
        }
    }
}

/// A start-token predicate paired with the constructor it guards
pub struct Starter {
    pub kind: HandlerKind,
    pub accepts: fn(char) -> bool,
    pub start: fn(char) -> Handler,
}

/// Start-token table, scanned in order when a handler is waiting for a child
pub const STARTERS: [Starter; 6] = [
    Starter {
        kind: HandlerKind::Dictionary,
        accepts: |c| c == '{',
        start: |_| Handler::Dictionary(DictionaryHandler::new()),
    },
    Starter {
        kind: HandlerKind::List,
        accepts: |c| c == '[',
        start: |_| Handler::List(ListHandler::new()),
    },
    Starter {
        kind: HandlerKind::String,
        accepts: |c| matches!(c, '\'' | '"'),
        start: |quote| Handler::String(StringHandler::new(quote)),
    },
    Starter {
        kind: HandlerKind::Integer,
        accepts: |c| c.is_ascii_digit(),
        start: |digit| Handler::Integer(IntegerHandler::new(digit)),
    },
    Starter {
        kind: HandlerKind::EnvironmentReference,
        accepts: |c| c == '$',
        start: |_| Handler::EnvironmentReference(ReferenceHandler::new()),
    },
    Starter {
        kind: HandlerKind::Boolean,
        accepts: |c| matches!(c, 't' | 'f'),
        start: |letter| Handler::Boolean(BooleanHandler::new(letter)),
    },
];

/// Find the handler constructor whose start token is `symbol`
pub fn find_starter(symbol: char) -> Option<&'static Starter> {
    STARTERS.iter().find(|starter| (starter.accepts)(symbol))
}

/// Check that no character is a start token for more than one kind
///
/// Every start token is ASCII, so the Latin-1 range covers all of them
/// plus a margin of characters that must match nothing.
pub fn starters_are_disjoint() -> bool {
    (0u32..0x100).filter_map(char::from_u32).all(|c| {
        let accepting = STARTERS.iter().filter(|s| (s.accepts)(c)).count();
        accepting <= 1
    })
}

/// Characters allowed in a dictionary key segment
pub fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters allowed in an environment reference path
pub fn is_reference_char(c: char) -> bool {
    is_key_char(c) || c == '.'
}

/// One in-progress construct
#[derive(Debug)]
pub enum Handler {
    Dictionary(DictionaryHandler),
    List(ListHandler),
    String(StringHandler),
    Integer(IntegerHandler),
    EnvironmentReference(ReferenceHandler),
    Boolean(BooleanHandler),
}

impl Handler {
    /// Which construct this handler parses
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Dictionary(_) => HandlerKind::Dictionary,
            Handler::List(_) => HandlerKind::List,
            Handler::String(_) => HandlerKind::String,
            Handler::Integer(_) => HandlerKind::Integer,
            Handler::EnvironmentReference(_) => HandlerKind::EnvironmentReference,
            Handler::Boolean(_) => HandlerKind::Boolean,
        }
    }

    /// Feed one character
    pub fn receive(&mut self, symbol: char, environment: &Environment) -> Status {
        match self {
            Handler::Dictionary(h) => h.receive(symbol),
            Handler::List(h) => h.receive(symbol),
            Handler::String(h) => h.receive(symbol),
            Handler::Integer(h) => h.receive(symbol),
            Handler::EnvironmentReference(h) => h.receive(symbol, environment),
            Handler::Boolean(h) => h.receive(symbol),
        }
    }

    /// Accept the value of a finished child
    pub fn add_value(&mut self, value: Value) {
        match self {
            Handler::Dictionary(h) => h.add_value(value),
            Handler::List(h) => h.add_value(value),
            other => {
                // scalars never return `waiting`, so they never get children
                log::warn!(
                    "{} handler cannot hold a child value; dropping {}",
                    other.kind().name(),
                    value.type_name()
                );
            }
        }
    }

    /// The value this handler produced
    pub fn into_value(self) -> Value {
        match self {
            Handler::Dictionary(h) => h.into_value(),
            Handler::List(h) => h.into_value(),
            Handler::String(h) => h.into_value(),
            Handler::Integer(h) => h.into_value(),
            Handler::EnvironmentReference(h) => h.into_value(),
            Handler::Boolean(h) => h.into_value(),
        }
    }
}

/// Where a dictionary handler is within an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DictionaryState {
    /// Collecting key characters
    #[default]
    ReadingKey,
    /// Key is complete; everything is filler until a child delivers a value
    AwaitingValue,
    /// Closed by `}`
    Closed,
}

/// Dictionary body: `key.path = value` entries, optionally closed by `}`
#[derive(Debug, Default)]
pub struct DictionaryHandler {
    entries: IndexMap<String, Value>,
    key: String,
    path: Vec<String>,
    state: DictionaryState,
}

impl DictionaryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DictionaryState {
        self.state
    }

    fn receive(&mut self, symbol: char) -> Status {
        match self.state {
            DictionaryState::AwaitingValue => return Status::WAITING,
            DictionaryState::Closed => return Status::DONE,
            DictionaryState::ReadingKey => {}
        }

        if symbol == '}' {
            self.state = DictionaryState::Closed;
            return Status::DONE;
        }

        if !self.key.is_empty() {
            if symbol == '.' {
                self.commit_segment();
            } else if !is_key_char(symbol) {
                self.commit_segment();
                self.state = DictionaryState::AwaitingValue;
                return Status::WAITING;
            }
        }

        if is_key_char(symbol) {
            self.key.push(symbol);
        }
        Status::CONTINUE
    }

    fn commit_segment(&mut self) {
        self.path.push(std::mem::take(&mut self.key));
    }

    fn add_value(&mut self, value: Value) {
        value::insert_path(&mut self.entries, &self.path, value);
        self.path.clear();
        self.state = DictionaryState::ReadingKey;
    }

    fn into_value(self) -> Value {
        if !self.path.is_empty() || !self.key.is_empty() {
            let mut pending = self.path.join(".");
            if !self.key.is_empty() {
                if !pending.is_empty() {
                    pending.push('.');
                }
                pending.push_str(&self.key);
            }
            log::debug!("Dropping key '{}' that never received a value", pending);
        }
        Value::Mapping(self.entries)
    }
}

/// `[ ... ]`; anything that does not start an element is filler
#[derive(Debug, Default)]
pub struct ListHandler {
    items: Vec<Value>,
}

impl ListHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn receive(&mut self, symbol: char) -> Status {
        if symbol == ']' {
            Status::DONE
        } else {
            Status::WAITING
        }
    }

    fn add_value(&mut self, value: Value) {
        self.items.push(value);
    }

    fn into_value(self) -> Value {
        Value::Sequence(self.items)
    }
}

/// Quoted text, closed by the same quote that opened it
#[derive(Debug)]
pub struct StringHandler {
    quote: char,
    text: String,
}

impl StringHandler {
    pub fn new(quote: char) -> Self {
        Self {
            quote,
            text: String::new(),
        }
    }

    fn receive(&mut self, symbol: char) -> Status {
        if symbol == self.quote {
            return Status::DONE;
        }
        self.text.push(symbol);
        Status::CONTINUE
    }

    fn into_value(self) -> Value {
        Value::String(self.text)
    }
}

/// Unsigned decimal integer; ends at the first non-digit
#[derive(Debug)]
pub struct IntegerHandler {
    digits: String,
}

impl IntegerHandler {
    pub fn new(first_digit: char) -> Self {
        Self {
            digits: first_digit.to_string(),
        }
    }

    fn receive(&mut self, symbol: char) -> Status {
        if symbol.is_ascii_digit() {
            self.digits.push(symbol);
            Status::CONTINUE
        } else {
            Status::DONE_REVALIDATE
        }
    }

    fn into_value(self) -> Value {
        match self.digits.parse::<u64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => {
                log::debug!("Integer literal {} does not fit in 64 bits", self.digits);
                Value::Unresolved
            }
        }
    }
}

/// Letters that may follow the `t` of `true` or the `f` of `false`
const BOOLEAN_LETTERS: [char; 6] = ['r', 'u', 'e', 'a', 'l', 's'];

/// `true` / `false`
///
/// Any interruption or misspelling yields `false`. An interrupting character
/// is consumed, not redelivered.
#[derive(Debug)]
pub struct BooleanHandler {
    literal: String,
    expected_len: usize,
    value: bool,
}

impl BooleanHandler {
    pub fn new(first_letter: char) -> Self {
        Self {
            literal: first_letter.to_string(),
            expected_len: if first_letter == 't' { 4 } else { 5 },
            value: false,
        }
    }

    fn receive(&mut self, symbol: char) -> Status {
        if !BOOLEAN_LETTERS.contains(&symbol) {
            log::debug!(
                "Malformed boolean '{}' interrupted by {:?}; using false",
                self.literal,
                symbol
            );
            self.value = false;
            return Status::DONE;
        }

        self.literal.push(symbol);
        if self.literal.len() < self.expected_len {
            return Status::CONTINUE;
        }

        self.value = self.literal == "true";
        if !self.value && self.literal != "false" {
            log::debug!("Malformed boolean '{}'; using false", self.literal);
        }
        Status::DONE
    }

    fn into_value(self) -> Value {
        Value::Bool(self.value)
    }
}

/// `$dotted.path`, resolved against the environment when the path ends
#[derive(Debug, Default)]
pub struct ReferenceHandler {
    path: String,
    value: Value,
}

impl ReferenceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn receive(&mut self, symbol: char, environment: &Environment) -> Status {
        if is_reference_char(symbol) {
            self.path.push(symbol);
            return Status::CONTINUE;
        }
        self.value = environment.resolve(&self.path);
        Status::DONE_REVALIDATE
    }

    fn into_value(self) -> Value {
        self.value
    }
}
