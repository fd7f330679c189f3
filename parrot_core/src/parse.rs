//! Recursive-descent parser for the canonical textual value form.
//!
//! The replay engine parses artifact statements through this module rather
//! than evaluating any free-form text.

use std::collections::BTreeMap;

use crate::{Value, ValueError};

/// Decode a single value, requiring the whole input to be consumed.
pub fn decode(src: &str) -> Result<Value, ValueError> {
    let (value, used) = parse_prefix(src)?;
    if src[used..].trim().is_empty() {
        Ok(value)
    } else {
        Err(ValueError::Trailing { pos: used })
    }
}

/// Parse one value from the front of `src`, returning it together with the
/// number of bytes consumed. Used by the replay engine to walk argument
/// lists that may be interleaved with sentinel blocks.
pub fn parse_prefix(src: &str) -> Result<(Value, usize), ValueError> {
    let mut parser = Parser { src, pos: 0 };
    let value = parser.value()?;
    Ok((value, parser.pos))
}

/// Parse a comma-separated argument list. An empty or all-whitespace input
/// yields an empty list.
pub fn parse_args(src: &str) -> Result<Vec<Value>, ValueError> {
    let mut parser = Parser { src, pos: 0 };
    let mut args = Vec::new();
    parser.skip_ws();
    while !parser.at_end() {
        args.push(parser.value()?);
        parser.skip_ws();
        if parser.eat(',') {
            parser.skip_ws();
        } else if !parser.at_end() {
            return Err(ValueError::Parse {
                pos: parser.pos,
                expected: "`,` between arguments",
            });
        }
    }
    Ok(args)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.rest().is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, expected: &'static str) -> ValueError {
        ValueError::Parse {
            pos: self.pos,
            expected,
        }
    }

    fn value(&mut self) -> Result<Value, ValueError> {
        self.skip_ws();
        match self.peek() {
            Some('\'') | Some('"') => self.string().map(Value::Str),
            Some('[') => self.list(),
            Some('{') => self.map(),
            Some('N') => self.keyword(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            _ => Err(self.error("a value")),
        }
    }

    fn string(&mut self) -> Result<String, ValueError> {
        let delim = self.peek().ok_or_else(|| self.error("a quoted string"))?;
        self.pos += 1;
        match self.rest().find(delim) {
            Some(end) => {
                let s = self.rest()[..end].to_owned();
                self.pos += end + 1;
                Ok(s)
            }
            None => Err(self.error("a closing quote")),
        }
    }

    fn keyword(&mut self) -> Result<Value, ValueError> {
        if self.rest().starts_with("None") {
            self.pos += 4;
            Ok(Value::None)
        } else {
            Err(self.error("the keyword `None`"))
        }
    }

    fn number(&mut self) -> Result<Value, ValueError> {
        let span: usize = self
            .rest()
            .chars()
            .take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
            .map(char::len_utf8)
            .sum();
        let text = &self.rest()[..span];
        let value = if text.contains(['.', 'e', 'E']) {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.error("a float literal"))?
        } else {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.error("an integer literal"))?
        };
        self.pos += span;
        Ok(value)
    }

    fn list(&mut self) -> Result<Value, ValueError> {
        self.pos += 1; // consume `[`
        let mut items = Vec::new();
        self.skip_ws();
        if self.eat(']') {
            return Ok(Value::List(items));
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(']') {
                return Ok(Value::List(items));
            }
            if !self.eat(',') {
                return Err(self.error("`,` or `]`"));
            }
        }
    }

    fn map(&mut self) -> Result<Value, ValueError> {
        self.pos += 1; // consume `{`
        let mut entries = BTreeMap::new();
        self.skip_ws();
        if self.eat('}') {
            return Ok(Value::Map(entries));
        }
        loop {
            self.skip_ws();
            if !matches!(self.peek(), Some('\'') | Some('"')) {
                return Err(self.error("a quoted map key"));
            }
            let key = self.string()?;
            self.skip_ws();
            if !self.eat(':') {
                return Err(self.error("`:` after a map key"));
            }
            entries.insert(key, self.value()?);
            self.skip_ws();
            if self.eat('}') {
                return Ok(Value::Map(entries));
            }
            if !self.eat(',') {
                return Err(self.error("`,` or `}`"));
            }
        }
    }
}
