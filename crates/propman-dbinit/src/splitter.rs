//! Splitting SQL documents into executable statements.
//!
//! Two regions are handled differently:
//!
//! - With the default `;` terminator, statements end at the first `;` that is
//!   not inside a quoted string, a backtick identifier or a comment.
//! - After `DELIMITER <symbol>`, a statement ends only on a line holding
//!   nothing but the symbol, or on a line ending in `END` followed by the
//!   symbol. The latter is rewritten to `END;` so routine bodies stay complete.
//!   The symbol anywhere else, such as `//` inside a URL, is plain text.
//!
//! `DELIMITER` lines are client syntax and never reach the output.

use std::sync::LazyLock;

use regex::Regex;

static DELIMITER_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*delimiter\s+(\S+)\s*$").expect("Invalid delimiter directive regex")
});

/// Keyword closing a stored routine or trigger body.
const ROUTINE_END: &str = "END";

/// A single executable SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Trimmed statement text, including its trailing `;` when present.
    pub sql: String,
    /// 1-based line of the source document where the statement starts.
    pub line: usize,
}

impl Statement {
    /// Returns the first keyword of the statement in upper case, skipping
    /// leading comments.
    #[must_use]
    pub fn first_keyword(&self) -> Option<String> {
        let word: String = skip_leading_comments(&self.sql)
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        (!word.is_empty()).then(|| word.to_ascii_uppercase())
    }

    /// Returns whether the statement selects a database (`USE ...`).
    #[must_use]
    pub fn is_database_selection(&self) -> bool {
        self.first_keyword().as_deref() == Some("USE")
    }
}

/// Splits `text` into statements.
#[must_use]
pub fn split_statements(text: &str) -> Vec<Statement> {
    let mut splitter = Splitter::default();
    for (idx, line) in text.lines().enumerate() {
        splitter.line(line, idx + 1);
    }
    splitter.finish()
}

/// Returns the text after any leading whitespace and comments.
#[must_use]
pub fn skip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        let dash_comment = rest
            .strip_prefix("--")
            .is_some_and(|after| opens_dash_comment(after.chars().next()));
        if dash_comment || rest.starts_with('#') {
            rest = rest.find('\n').map_or("", |pos| &rest[pos + 1..]).trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |pos| &after[pos + 2..]).trim_start();
        } else {
            return rest;
        }
    }
}

/// `--` only starts a comment when followed by whitespace, a control
/// character or the end of the line.
fn opens_dash_comment(next: Option<char>) -> bool {
    next.is_none_or(|c| c.is_whitespace() || c.is_control())
}

fn is_blank(sql: &str) -> bool {
    skip_leading_comments(sql).trim_start_matches([';', ' ', '\t', '\n', '\r']).is_empty()
}

/// Returns the line rewritten as `... END;` if it closes a routine with the
/// custom terminator.
fn routine_end(line: &str, terminator: &str) -> Option<String> {
    let trimmed = line.trim_end();
    let before = trimmed.strip_suffix(terminator)?.trim_end();
    let before = before.strip_suffix(';').unwrap_or(before).trim_end();

    let split = before.len().checked_sub(ROUTINE_END.len())?;
    let keyword = before.get(split..)?;
    if !keyword.eq_ignore_ascii_case(ROUTINE_END) {
        return None;
    }
    let standalone = before[..split]
        .chars()
        .next_back()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
    standalone.then(|| format!("{before};"))
}

#[derive(Default)]
struct Splitter {
    statements: Vec<Statement>,
    current: String,
    start_line: Option<usize>,
    /// Custom terminator, `None` while `;` is in effect.
    delimiter: Option<String>,
    quote: Option<char>,
    block_comment: bool,
}

impl Splitter {
    fn line(&mut self, line: &str, lineno: usize) {
        // In the default region a `delimiter` column or alias mid-statement
        // must not be taken for the directive.
        let at_boundary = self.delimiter.is_some() || is_blank(&self.current);
        if self.quote.is_none() && !self.block_comment && at_boundary {
            if let Some(caps) = DELIMITER_DIRECTIVE.captures(line) {
                self.flush();
                let symbol = &caps[1];
                self.delimiter = (symbol != ";").then(|| symbol.to_string());
                return;
            }
        }

        match self.delimiter.clone() {
            Some(terminator) => self.custom_line(line, &terminator, lineno),
            None => self.default_line(line, lineno),
        }
    }

    fn custom_line(&mut self, line: &str, terminator: &str, lineno: usize) {
        if line.trim() == terminator {
            self.flush();
        } else if let Some(rewritten) = routine_end(line, terminator) {
            self.push_str(&rewritten, lineno);
            self.flush();
        } else {
            self.push_str(line, lineno);
            self.current.push('\n');
        }
    }

    fn default_line(&mut self, line: &str, lineno: usize) {
        let mut chars = line.chars().peekable();

        while let Some(ch) = chars.next() {
            if self.block_comment {
                self.push_char(ch, lineno);
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.push_char('/', lineno);
                    self.block_comment = false;
                }
                continue;
            }

            if let Some(quote) = self.quote {
                self.push_char(ch, lineno);
                if ch == '\\' && quote != '`' {
                    if let Some(escaped) = chars.next() {
                        self.push_char(escaped, lineno);
                    }
                } else if ch == quote {
                    if chars.peek() == Some(&quote) {
                        chars.next();
                        self.push_char(quote, lineno);
                    } else {
                        self.quote = None;
                    }
                }
                continue;
            }

            match ch {
                '-' if chars.peek() == Some(&'-') && opens_dash_comment(chars.clone().nth(1)) => {
                    self.push_char(ch, lineno);
                    let rest: String = chars.by_ref().collect();
                    self.push_str(&rest, lineno);
                }
                '#' => {
                    self.push_char(ch, lineno);
                    let rest: String = chars.by_ref().collect();
                    self.push_str(&rest, lineno);
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.push_str("/*", lineno);
                    self.block_comment = true;
                }
                '\'' | '"' | '`' => {
                    self.push_char(ch, lineno);
                    self.quote = Some(ch);
                }
                ';' => {
                    self.push_char(ch, lineno);
                    self.flush();
                }
                _ => self.push_char(ch, lineno),
            }
        }

        self.current.push('\n');
    }

    fn push_char(&mut self, ch: char, lineno: usize) {
        if self.start_line.is_none() && !ch.is_whitespace() {
            self.start_line = Some(lineno);
        }
        self.current.push(ch);
    }

    fn push_str(&mut self, s: &str, lineno: usize) {
        if self.start_line.is_none() && !s.trim().is_empty() {
            self.start_line = Some(lineno);
        }
        self.current.push_str(s);
    }

    fn flush(&mut self) {
        let sql = self.current.trim();
        if !is_blank(sql) {
            self.statements.push(Statement {
                sql: sql.to_string(),
                line: self.start_line.unwrap_or(1),
            });
        }
        self.current.clear();
        self.start_line = None;
    }

    fn finish(mut self) -> Vec<Statement> {
        self.flush();
        self.statements
    }
}
