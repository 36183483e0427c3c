//! Text codec for journal command lines.
//!
//! # Responsibility
//! - Encode commands as single source lines with quoted, escaped arguments.
//! - Decode source lines back into validated commands.
//!
//! # Invariants
//! - Encoding then decoding any command yields the identical command.
//! - Arguments may contain spaces, quotes, backslashes, and newlines; the
//!   escape scheme keeps one command per line regardless of value content.
//! - Malformed text decodes to an error, never to a command with dropped
//!   fields.

use crate::command::{Command, CommandError, OperationKind};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)"|(\S+)"#).expect("valid token regex"));

/// Encodes a command as its canonical source line.
pub fn encode_command(command: &Command) -> String {
    let mut line = String::from(command.kind().code());
    for argument in command.arguments() {
        line.push(' ');
        line.push('"');
        line.push_str(&escape_argument(argument));
        line.push('"');
    }
    line
}

/// Decodes one source line into a command.
pub fn decode_command(line: &str) -> Result<Command, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(CommandError::EmptyText);
    }

    let mut tokens = Vec::new();
    let mut previous_end = None;
    for capture in TOKEN_RE.captures_iter(trimmed) {
        if let Some(whole) = capture.get(0) {
            if previous_end == Some(whole.start()) {
                return Err(CommandError::MalformedText(format!(
                    "expected whitespace before `{}`",
                    whole.as_str()
                )));
            }
            previous_end = Some(whole.end());
        }
        if let Some(quoted) = capture.get(1) {
            tokens.push(Token::Quoted(quoted.as_str()));
        } else if let Some(bare) = capture.get(2) {
            if bare.as_str().contains('"') {
                return Err(CommandError::MalformedText(format!(
                    "unterminated or stray quote near `{}`",
                    bare.as_str()
                )));
            }
            tokens.push(Token::Bare(bare.as_str()));
        }
    }

    let code = match tokens.first() {
        Some(Token::Bare(code)) => *code,
        Some(Token::Quoted(_)) => {
            return Err(CommandError::MalformedText(
                "operation code must not be quoted".to_string(),
            ))
        }
        None => return Err(CommandError::EmptyText),
    };
    let kind = OperationKind::from_code(code)
        .ok_or_else(|| CommandError::UnknownCode(code.to_string()))?;

    let mut arguments = Vec::with_capacity(tokens.len() - 1);
    for token in &tokens[1..] {
        let raw = match token {
            Token::Quoted(value) => unescape_argument(value)?,
            // Bare single-word arguments are tolerated on load for
            // hand-edited journals; encoding always quotes.
            Token::Bare(value) => (*value).to_string(),
        };
        arguments.push(raw);
    }

    Command::new(kind, arguments)
}

enum Token<'a> {
    Quoted(&'a str),
    Bare(&'a str),
}

fn escape_argument(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn unescape_argument(value: &str) -> Result<String, CommandError> {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unescaped.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => unescaped.push('\\'),
            Some('"') => unescaped.push('"'),
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some(other) => {
                return Err(CommandError::MalformedText(format!(
                    "unknown escape sequence `\\{other}`"
                )))
            }
            None => {
                return Err(CommandError::MalformedText(
                    "dangling escape at end of argument".to_string(),
                ))
            }
        }
    }
    Ok(unescaped)
}

#[cfg(test)]
mod tests {
    use super::{decode_command, encode_command};
    use crate::command::{Command, CommandError, OperationKind};

    fn command(kind: OperationKind, arguments: &[&str]) -> Command {
        Command::new(kind, arguments.iter().map(|a| a.to_string()).collect())
            .expect("test command arity must match")
    }

    #[test]
    fn encode_quotes_every_argument() {
        let cmd = command(OperationKind::SetEntryProperty, &["id1", "title", "My Bank"]);
        assert_eq!(encode_command(&cmd), r#"sep "id1" "title" "My Bank""#);
    }

    #[test]
    fn hostile_values_round_trip_exactly() {
        let value = "a \"quoted\" \\ multi\nline\rvalue";
        let cmd = command(OperationKind::SetEntryMeta, &["id1", "note", value]);
        let line = encode_command(&cmd);
        assert!(!line.contains('\n'));
        let decoded = decode_command(&line).expect("encoded line must decode");
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn bare_arguments_are_tolerated_on_decode() {
        let decoded = decode_command("men id1 id2").expect("bare args decode");
        assert_eq!(decoded.kind(), OperationKind::MoveEntry);
        assert_eq!(decoded.arguments(), ["id1", "id2"]);
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = decode_command(r#"xyz "a""#).expect_err("unknown code must fail");
        assert_eq!(err, CommandError::UnknownCode("xyz".to_string()));
    }

    #[test]
    fn truncated_quote_is_rejected() {
        let err = decode_command(r#"sep "id1" "title" "unterminated"#)
            .expect_err("truncated line must fail");
        assert!(matches!(err, CommandError::MalformedText(_)));
    }

    #[test]
    fn wrong_arity_is_rejected_on_decode() {
        let err = decode_command(r#"den "id1" "extra""#).expect_err("arity must fail");
        assert!(matches!(err, CommandError::ArityMismatch { .. }));
    }

    #[test]
    fn tokens_without_separating_whitespace_are_rejected() {
        let err = decode_command(r#"sep "id1"x "title" "value""#)
            .expect_err("junk abutting a quoted token must fail");
        assert!(matches!(err, CommandError::MalformedText(_)));

        let err = decode_command(r#"men "id1""id2""#)
            .expect_err("abutting quoted tokens must fail");
        assert!(matches!(err, CommandError::MalformedText(_)));
    }

    #[test]
    fn unknown_escape_is_rejected() {
        let err = decode_command(r#"cmm "bad \x escape""#).expect_err("escape must fail");
        assert!(matches!(err, CommandError::MalformedText(_)));
    }
}
