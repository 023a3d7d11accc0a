//! Incremental parse engine
//!
//! [`ParseState`] owns a stack of [`Handler`]s. The bottom entry is the
//! implicit root dictionary. Each character passes the comment filter and is
//! then dispatched to the top handler; the returned [`Status`] decides whether
//! that handler is popped, whether a child is pushed, and whether the
//! character is delivered again.
//!
//! Feeding is push-driven, so a document can arrive all at once, line by line
//! or one character at a time with identical results.
//!
//! # Example
//!
//! ```
//! use niceconf_core::{begin_parse, Environment, Value};
//!
//! let mut state = begin_parse(Environment::from_json(r#"{"region": "eu"}"#).unwrap());
//! state.feed_line("app.region = $region").unwrap();
//! state.feed_line("app.ports = [80, 443]").unwrap();
//! let tree = state.finish().unwrap();
//!
//! assert_eq!(tree.lookup("app.region"), Some(&Value::from("eu")));
//! assert_eq!(tree.lookup("app.ports.1"), Some(&Value::Integer(443)));
//! ```

use crate::environment::Environment;
use crate::error::{Error, Result, SourceLocation};
use crate::handler::{self, DictionaryHandler, Handler, Starter, Status};
use crate::value::Value;

/// Character fed after every line in line mode
pub const LINE_TERMINATOR: char = '\n';

const COMMENT_START: char = '#';

/// Tuning knobs for a single parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// How many times one character may be redelivered before the parse fails
    pub max_redeliveries: usize,
    /// How many constructs may be open at once, not counting the root
    ///
    /// The finished tree is dropped, compared and exported recursively, so
    /// this also bounds the call depth of everything done with the result.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_redeliveries: 8,
            max_depth: 128,
        }
    }
}

/// Drops everything from `#` up to the end of the line
#[derive(Debug, Default)]
struct CommentFilter {
    in_comment: bool,
}

impl CommentFilter {
    fn admit(&mut self, symbol: char) -> bool {
        if symbol == LINE_TERMINATOR {
            self.in_comment = false;
            return true;
        }
        if symbol == COMMENT_START {
            self.in_comment = true;
        }
        !self.in_comment
    }
}

/// One parse in progress
#[derive(Debug)]
pub struct ParseState {
    stack: Vec<Handler>,
    environment: Environment,
    options: ParseOptions,
    comments: CommentFilter,
    line: usize,
    column: usize,
    failure: Option<Error>,
}

/// Start a parse with default options
pub fn begin_parse(environment: Environment) -> ParseState {
    ParseState::new(environment, ParseOptions::default())
}

impl ParseState {
    /// Start a parse whose references resolve against `environment`
    pub fn new(environment: Environment, options: ParseOptions) -> Self {
        debug_assert!(
            handler::starters_are_disjoint(),
            "a character starts more than one handler kind"
        );
        Self {
            stack: vec![Handler::Dictionary(DictionaryHandler::new())],
            environment,
            options,
            comments: CommentFilter::default(),
            line: 1,
            column: 0,
            failure: None,
        }
    }

    /// Number of open constructs, counting the root dictionary
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether an earlier fatal error ended this parse
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Feed a single character
    ///
    /// After a fatal error every further call returns that same error.
    pub fn feed(&mut self, symbol: char) -> Result<()> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let location = self.advance_position(symbol);
        if !self.comments.admit(symbol) {
            return Ok(());
        }

        self.dispatch(symbol).map_err(|err| {
            let err = err.with_source_location(location);
            self.failure = Some(err.clone());
            err
        })
    }

    /// Feed one line, followed by a line terminator
    ///
    /// `line` should not contain the terminator itself.
    pub fn feed_line(&mut self, line: &str) -> Result<()> {
        for symbol in line.chars() {
            self.feed(symbol)?;
        }
        self.feed(LINE_TERMINATOR)
    }

    /// Feed a whole document, one line at a time
    pub fn feed_str(&mut self, text: &str) -> Result<()> {
        for line in text.lines() {
            self.feed_line(line)?;
        }
        Ok(())
    }

    /// End the parse and take the root dictionary
    ///
    /// Constructs still open at this point are discarded.
    pub fn finish(mut self) -> Result<Value> {
        if let Some(err) = self.failure {
            return Err(err);
        }

        if self.stack.len() > 1 {
            let open: Vec<_> = self.stack[1..].iter().map(|h| h.kind().name()).collect();
            log::warn!(
                "Input ended inside {} unterminated construct(s) ({}); discarding them",
                open.len(),
                open.join(" > ")
            );
            self.stack.truncate(1);
        }

        match self.stack.pop() {
            Some(root) => Ok(root.into_value()),
            None => Err(Error::unexpected_end_of_stack()),
        }
    }

    fn advance_position(&mut self, symbol: char) -> SourceLocation {
        self.column += 1;
        let location = SourceLocation {
            file: None,
            line: self.line,
            column: self.column,
        };
        if symbol == LINE_TERMINATOR {
            self.line += 1;
            self.column = 0;
        }
        location
    }

    fn dispatch(&mut self, symbol: char) -> Result<()> {
        let mut redeliveries = 0;
        loop {
            let Some(current) = self.stack.last_mut() else {
                return Err(Error::unexpected_end_of_stack());
            };
            let status = current.receive(symbol, &self.environment);

            if !self.apply(status, symbol)? {
                return Ok(());
            }

            redeliveries += 1;
            if redeliveries > self.options.max_redeliveries {
                return Err(Error::redelivery_loop_exceeded(
                    self.options.max_redeliveries,
                ));
            }
            log::trace!("Redelivering {:?}", symbol);
        }
    }

    /// Act on a handler's status; returns whether to redeliver `symbol`
    fn apply(&mut self, status: Status, symbol: char) -> Result<bool> {
        if status.done {
            self.pop_into_parent(status.ignore)?;
        }

        if status.waiting {
            if let Some(starter) = handler::find_starter(symbol) {
                self.push(starter, symbol)?;
            }
        }

        Ok(status.revalidate)
    }

    fn pop_into_parent(&mut self, ignore: bool) -> Result<()> {
        let Some(finished) = self.stack.pop() else {
            return Err(Error::unexpected_end_of_stack());
        };
        let depth = self.stack.len();
        let Some(parent) = self.stack.last_mut() else {
            return Err(Error::unexpected_end_of_stack());
        };

        log::trace!(
            "Pop {} into {} (depth {})",
            finished.kind().name(),
            parent.kind().name(),
            depth
        );
        if ignore {
            log::trace!("Discarding value of {}", finished.kind().name());
        } else {
            parent.add_value(finished.into_value());
        }
        Ok(())
    }

    fn push(&mut self, starter: &Starter, symbol: char) -> Result<()> {
        let open = self.stack.len().saturating_sub(1);
        if open >= self.options.max_depth {
            return Err(Error::nesting_too_deep(self.options.max_depth));
        }

        log::trace!("Push {} on {:?}", starter.kind.name(), symbol);
        self.stack.push((starter.start)(symbol));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Value {
        parse_with_env(text, Environment::default())
    }

    fn parse_with_env(text: &str, env: Environment) -> Value {
        let mut state = begin_parse(env);
        state.feed_str(text).unwrap();
        state.finish().unwrap()
    }

    fn parse_err(text: &str) -> Error {
        let mut state = begin_parse(Environment::default());
        match state.feed_str(text) {
            Ok(()) => state.finish().unwrap_err(),
            Err(err) => err,
        }
    }

    #[test]
    fn test_scalar_entries() {
        let tree = parse("name = 'demo'\nport = 8080\non = true\noff = false\n");
        assert_eq!(
            tree.to_string(),
            "{name: demo, port: 8080, on: true, off: false}"
        );
    }

    #[test]
    fn test_dotted_keys_nest() {
        let tree = parse("a.b.c = 2\na.d = 3\n");
        assert_eq!(tree.to_string(), "{a: {b: {c: 2}, d: 3}}");
    }

    #[test]
    fn test_list_of_mixed_values() {
        let tree = parse("list = [1, \"a\", true]\n");
        let expected = Value::from(vec![Value::Integer(1), Value::from("a"), Value::Bool(true)]);
        assert_eq!(tree.lookup("list"), Some(&expected));
    }

    #[test]
    fn test_nested_dictionary_and_list() {
        let tree = parse("server {\n  host = 'h'\n  ports = [1 2]\n}\nafter = 1\n");
        assert_eq!(
            tree.to_string(),
            "{server: {host: h, ports: [1, 2]}, after: 1}"
        );
    }

    #[test]
    fn test_nested_lists() {
        let tree = parse("m = [[1, 2], [], [\"x\"]]\n");
        assert_eq!(tree.to_string(), "{m: [[1, 2], [], [x]]}");
    }

    #[test]
    fn test_integer_terminated_by_bracket_closes_list() {
        // the `]` ends the integer and is then redelivered to the list
        let tree = parse("n = [7]\n");
        assert_eq!(tree.lookup("n.0"), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_environment_reference() {
        let env = Environment::from_json(r#"{"domain": {"adapter": {"type": "x"}}}"#).unwrap();
        let tree = parse_with_env("k = $domain.adapter.type\n", env);
        assert_eq!(tree.lookup("k"), Some(&Value::from("x")));
    }

    #[test]
    fn test_reference_inside_list() {
        let env = Environment::from_json(r#"{"a": 1, "b": 2}"#).unwrap();
        let tree = parse_with_env("l = [$a, $b]\n", env);
        assert_eq!(tree.to_string(), "{l: [1, 2]}");
    }

    #[test]
    fn test_unmatched_reference_is_unresolved() {
        let tree = parse("k = $missing.path\nnext = 1\n");
        assert_eq!(tree.lookup("k"), Some(&Value::Unresolved));
        assert_eq!(tree.lookup("next"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_comments_are_stripped() {
        let tree = parse("# heading\na = 1 # trailing\n# b = 2\nc = 'x'\n");
        assert_eq!(tree.to_string(), "{a: 1, c: x}");
    }

    #[test]
    fn test_comment_filter_runs_before_strings() {
        let tree = parse("s = 'a#b'\nnext = 2\n");
        // the rest of the line after `#` never reaches the string handler,
        // so the string swallows the newline and the next entry
        assert!(tree.lookup("next").is_none());
    }

    #[test]
    fn test_malformed_boolean_is_false() {
        let tree = parse("x = trux\ny = fals\n");
        assert_eq!(tree.lookup("x"), Some(&Value::Bool(false)));
        assert_eq!(tree.lookup("y"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let tree = parse("a = 1\na = 2\n");
        assert_eq!(tree.to_string(), "{a: 2}");
    }

    #[test]
    fn test_dotted_write_over_scalar_replaces_it() {
        let tree = parse("a = 1\na.b = 2\n");
        assert_eq!(tree.to_string(), "{a: {b: 2}}");
    }

    #[test]
    fn test_stray_closing_brace_fails() {
        let err = parse_err("a = 1\n}\n");
        assert_eq!(err.kind, ErrorKind::UnexpectedEndOfStack);
        let loc = err.source_location.unwrap();
        assert_eq!((loc.line, loc.column), (2, 1));
    }

    #[test]
    fn test_failed_state_is_poisoned() {
        let mut state = begin_parse(Environment::default());
        assert!(state.feed('}').is_err());
        assert!(state.is_failed());
        let again = state.feed('a').unwrap_err();
        assert_eq!(again.kind, ErrorKind::UnexpectedEndOfStack);
        let at_finish = state.finish().unwrap_err();
        assert_eq!(at_finish.kind, ErrorKind::UnexpectedEndOfStack);
    }

    #[test]
    fn test_redelivery_guard() {
        let options = ParseOptions {
            max_redeliveries: 0,
            ..ParseOptions::default()
        };
        let mut state = ParseState::new(Environment::default(), options);
        let err = state.feed_str("a = 1\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::RedeliveryLoopExceeded { limit: 0 });
    }

    #[test]
    fn test_nesting_limit() {
        let text = format!("a = {}\n", "[".repeat(129));
        let err = parse_err(&text);
        assert_eq!(err.kind, ErrorKind::NestingTooDeep { limit: 128 });
        let loc = err.source_location.unwrap();
        assert_eq!((loc.line, loc.column), (1, 133));
    }

    #[test]
    fn test_nesting_at_limit_is_accepted() {
        let text = format!("a = {}{}\n", "[".repeat(128), "]".repeat(128));
        let tree = parse(&text);

        let mut depth = 0;
        let mut node = tree.lookup("a").unwrap();
        while let Some(items) = node.as_sequence() {
            depth += 1;
            match items.first() {
                Some(inner) => node = inner,
                None => break,
            }
        }
        assert_eq!(depth, 128);
    }

    #[test]
    fn test_nesting_limit_counts_scalars() {
        let options = ParseOptions {
            max_depth: 2,
            ..ParseOptions::default()
        };

        let mut state = ParseState::new(Environment::default(), options.clone());
        state.feed_line("a = [[]]").unwrap();
        assert_eq!(state.finish().unwrap().to_string(), "{a: [[]]}");

        let mut state = ParseState::new(Environment::default(), options);
        let err = state.feed_line("a = [[1]]").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NestingTooDeep { limit: 2 });
        assert!(state.is_failed());
    }

    #[test]
    fn test_finish_discards_unterminated() {
        let mut state = begin_parse(Environment::default());
        state.feed_str("done = 1\nopen = [1, 2\n").unwrap();
        assert_eq!(state.depth(), 2);
        let tree = state.finish().unwrap();
        assert_eq!(tree.to_string(), "{done: 1}");
    }

    #[test]
    fn test_unterminated_string_at_end() {
        let tree = parse("a = 'never closed\n");
        assert_eq!(tree, Value::mapping());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Value::mapping());
        assert_eq!(parse("\n\n# only comments\n"), Value::mapping());
    }

    #[test]
    fn test_whole_feed_matches_character_feed() {
        let text = "a.b = [1, {c = 'd'}]\ne = true\n";
        let mut by_char = begin_parse(Environment::default());
        for c in text.chars() {
            by_char.feed(c).unwrap();
        }
        assert_eq!(by_char.finish().unwrap(), parse(text));
    }

    #[test]
    fn test_dictionary_inside_list() {
        let tree = parse("l = [{a = 1}, {b = 2}]\n");
        assert_eq!(tree.to_string(), "{l: [{a: 1}, {b: 2}]}");
    }

    #[test]
    fn test_ignored_status_drops_value() {
        let mut state = begin_parse(Environment::default());
        for c in "k = [1".chars() {
            state.feed(c).unwrap();
        }
        assert_eq!(state.depth(), 3);

        // pop the integer without handing it to the list
        let redeliver = state.apply(Status::DONE.ignored(), ' ').unwrap();
        assert!(!redeliver);
        state.feed(']').unwrap();
        state.feed('\n').unwrap();

        let tree = state.finish().unwrap();
        assert_eq!(tree.to_string(), "{k: []}");
    }

    #[test]
    fn test_independent_parses() {
        let mut first = begin_parse(Environment::default());
        let mut second = begin_parse(Environment::default());
        first.feed_line("a = 1").unwrap();
        second.feed_line("b = 2").unwrap();
        assert_eq!(first.finish().unwrap().to_string(), "{a: 1}");
        assert_eq!(second.finish().unwrap().to_string(), "{b: 2}");
    }
}
