//! Tokenizer for the Jam build-description language.
//!
//! Jam tokenization is context sensitive: `:` is an operator inside a variable
//! expansion but part of a literal outside one, `;`/`{`/`}` are only special
//! when whitespace-delimited, and a double quote toggles a quoted mode that
//! persists across token boundaries. The scanner therefore carries three
//! pieces of state (expansion nesting depth, an inside-modifier-span flag and
//! an inside-quote flag) and is total: any input scans to a token sequence,
//! with unscannable single characters coming out as one-character literals.

use crate::token::{Span, Token, TokenKind};

pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    expansion_depth: i32,
    inside_modifier_span: bool,
    inside_quote: bool,
}

impl Scanner {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            expansion_depth: 0,
            inside_modifier_span: false,
            inside_quote: false,
        }
    }

    /// Scans the whole input. The returned stream always ends with an EOF
    /// token whose span is empty.
    pub fn scan(mut self) -> TokenStream {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        TokenStream::new(self.chars, tokens)
    }

    fn scan_token(&mut self) -> Token {
        loop {
            if self.pos >= self.chars.len() {
                let span = Span::new(self.pos, self.pos);
                return Token::new(TokenKind::Eof, "", span);
            }

            let start = self.pos;
            let ch = self.chars[start];

            if self.inside_modifier_span {
                if ch == '=' {
                    self.inside_modifier_span = false;
                    self.pos += 1;
                    return Token::new(TokenKind::Assignment, "=", Span::new(start, self.pos));
                }
                if ch.is_alphabetic() {
                    self.pos += 1;
                    return Token::new(
                        TokenKind::VariableExpansionModifier,
                        ch,
                        Span::new(start, self.pos),
                    );
                }
                if self.lookahead_is(start, "\\\\\\\\") {
                    self.pos += 4;
                    return Token::new(
                        TokenKind::VariableExpansionModifier,
                        "\\\\\\\\",
                        Span::new(start, self.pos),
                    );
                }
                if ch == ')' {
                    self.inside_modifier_span = false;
                    // fall through to the close-parenthesis rule
                }
            }

            if ch.is_whitespace() {
                return self.read_whitespace();
            }

            if ch == '$' && self.peek_at(start + 1) == Some('(') {
                self.expansion_depth += 1;
                self.pos += 2;
                return Token::new(
                    TokenKind::VariableDereferencerOpen,
                    "$(",
                    Span::new(start, self.pos),
                );
            }
            if ch == '@' && self.peek_at(start + 1) == Some('(') {
                self.expansion_depth += 1;
                self.pos += 2;
                return Token::new(
                    TokenKind::LiteralExpansionOpen,
                    "@(",
                    Span::new(start, self.pos),
                );
            }
            if ch == ')' {
                self.expansion_depth -= 1;
                self.pos += 1;
                return Token::new(TokenKind::ParenthesisClose, ")", Span::new(start, self.pos));
            }
            if ch == '#' {
                self.skip_comment();
                continue;
            }

            let literal = self.read_literal(self.expansion_depth == 0);
            let consumed = self.pos - start;
            let unquoted = consumed == literal.chars().count();

            if unquoted
                && literal == ":"
                && self
                    .peek_at(self.pos)
                    .is_some_and(|next| !next.is_whitespace())
            {
                self.inside_modifier_span = true;
            }

            let kind = if unquoted {
                let ws_before = start == 0 || self.chars[start - 1].is_whitespace();
                let ws_after = self
                    .peek_at(self.pos)
                    .is_none_or(|next| next.is_whitespace());
                self.kind_for(&literal, ws_before && ws_after)
            } else {
                TokenKind::Literal
            };

            return Token::new(kind, literal, Span::new(start, self.pos));
        }
    }

    /// Reads a literal starting at the cursor, applying backslash escapes and
    /// quote stripping. Stops before an unescaped `$(`/`@(`, before `)` while
    /// inside an expansion, and before any non-literal character. When the
    /// first character is already non-literal, consumes exactly that one
    /// character so scanning always makes progress.
    fn read_literal(&mut self, allow_colon: bool) -> String {
        let start = self.pos;
        let len = self.chars.len();
        let mut out = String::new();
        let mut i = start;

        while i != len {
            let ch = self.chars[i];
            let has_more = i + 1 < len;

            if ch == '\\' && has_more {
                out.push(self.chars[i + 1]);
                i += 2;
                continue;
            }
            if (ch == '$' || ch == '@') && self.peek_at(i + 1) == Some('(') {
                break;
            }
            if ch == ')' && self.expansion_depth > 0 {
                break;
            }
            if self.inside_quote {
                if ch == '"' {
                    self.inside_quote = false;
                } else {
                    out.push(ch);
                }
                i += 1;
                continue;
            }
            if ch == '"' {
                self.inside_quote = true;
                i += 1;
                continue;
            }
            // A colon only joins a literal when permitted by context and not
            // in leading position.
            let colon_ok = allow_colon && i != start;
            if is_literal_char(ch, colon_ok) || ch == '$' || ch == '@' {
                out.push(ch);
                i += 1;
                continue;
            }
            break;
        }

        if i == start {
            self.pos = start + 1;
            return self.chars[start].to_string();
        }
        self.pos = i;
        out
    }

    /// Whitespace runs are split at every boundary between newline and
    /// non-newline characters, so the parser can tell line breaks apart from
    /// intra-line spacing.
    fn read_whitespace(&mut self) -> Token {
        let start = self.pos;
        let mut newline_run: Option<bool> = None;
        let mut i = start;
        while i < self.chars.len() {
            let ch = self.chars[i];
            if !ch.is_whitespace() {
                break;
            }
            let is_newline = ch == '\n' || ch == '\r';
            if newline_run.is_some_and(|run| run != is_newline) {
                break;
            }
            newline_run = Some(is_newline);
            i += 1;
        }
        let literal: String = self.chars[start..i].iter().collect();
        self.pos = i;
        Token::new(TokenKind::Whitespace, literal, Span::new(start, i))
    }

    /// Skips a `#` comment: everything up to and including the trailing
    /// newline run.
    fn skip_comment(&mut self) {
        let mut in_newlines = false;
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            let is_newline = ch == '\n' || ch == '\r';
            if in_newlines && !is_newline {
                return;
            }
            if is_newline {
                in_newlines = true;
            }
            self.pos += 1;
        }
    }

    fn kind_for(&self, literal: &str, whitespace_delimited: bool) -> TokenKind {
        match literal {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "rule" => TokenKind::Rule,
            "actions" => TokenKind::Actions,
            "return" => TokenKind::Return,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "local" => TokenKind::Local,
            "on" => TokenKind::On,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "include" | "Include" => TokenKind::Include,
            "!" => TokenKind::Not,
            "&&" => TokenKind::And,
            "||" => TokenKind::Or,
            "!=" => TokenKind::NotEqual,
            "+=" => TokenKind::AppendOperator,
            "-=" => TokenKind::SubtractOperator,
            "?=" => TokenKind::AssignmentIfEmpty,
            "[" => TokenKind::BracketOpen,
            "]" => TokenKind::BracketClose,
            "=" if self.inside_modifier_span || whitespace_delimited => TokenKind::Assignment,
            ";" if whitespace_delimited => TokenKind::Terminator,
            "{" if whitespace_delimited => TokenKind::AccoladeOpen,
            "}" if whitespace_delimited => TokenKind::AccoladeClose,
            "<" if whitespace_delimited => TokenKind::LessThan,
            ">" if whitespace_delimited => TokenKind::GreaterThan,
            ":" if self.expansion_depth > 0 || whitespace_delimited => TokenKind::Colon,
            _ => TokenKind::Literal,
        }
    }

    fn peek_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    fn lookahead_is(&self, from: usize, needle: &str) -> bool {
        let mut i = from;
        for ch in needle.chars() {
            if self.peek_at(i) != Some(ch) {
                return false;
            }
            i += 1;
        }
        true
    }
}

fn is_literal_char(ch: char, allow_colon: bool) -> bool {
    if ch.is_whitespace() {
        return false;
    }
    match ch {
        '}' | '{' | '[' | ']' | '#' | '$' | '@' | '"' | '\\' => false,
        ':' => allow_colon,
        _ => true,
    }
}

/// Convenience entry point: scan a whole source text.
pub fn scan(input: &str) -> TokenStream {
    Scanner::new(input).scan()
}

/// Cursor over the scanned tokens. The cursor indexes into the full token
/// vector, whitespace included; the skipping variants of `peek`/`next` are
/// what the parser normally uses, while the raw variants feed the
/// adjacency-sensitive combine-expression check.
pub struct TokenStream {
    source: Vec<char>,
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream {
    fn new(source: Vec<char>, tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            source,
            tokens,
            cursor: 0,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn source_chars(&self) -> &[char] {
        &self.source
    }

    fn eof_index(&self) -> usize {
        self.tokens.len() - 1
    }

    fn skip_whitespace_from(&self, mut index: usize) -> usize {
        let eof = self.eof_index();
        while index < eof && self.tokens[index].kind == TokenKind::Whitespace {
            index += 1;
        }
        index.min(eof)
    }

    /// Next non-whitespace token, without advancing.
    pub fn peek(&self) -> &Token {
        &self.tokens[self.skip_whitespace_from(self.cursor)]
    }

    /// The token directly at the cursor, whitespace included.
    pub fn peek_raw(&self) -> &Token {
        &self.tokens[self.cursor.min(self.eof_index())]
    }

    /// Consumes and returns the next non-whitespace token. At the end of
    /// input this keeps returning the EOF token.
    pub fn next(&mut self) -> Token {
        let index = self.skip_whitespace_from(self.cursor);
        let token = self.tokens[index].clone();
        self.cursor = if token.kind == TokenKind::Eof {
            index
        } else {
            index + 1
        };
        token
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.tokens.len());
    }

    /// Character offset of the token at the cursor; used by the raw-line
    /// reader for actions bodies.
    pub fn char_pos(&self) -> usize {
        self.peek_raw().span.start
    }

    /// Moves the cursor to the first token starting at or after the given
    /// character offset. Tokens straddling the offset can only be whitespace
    /// runs, which the parser skips anyway.
    pub fn seek_to_char(&mut self, pos: usize) {
        let mut index = 0;
        while index < self.eof_index() && self.tokens[index].span.start < pos {
            index += 1;
        }
        self.cursor = index;
    }
}

/// Reads one raw source line starting at `pos`. Returns the line without its
/// terminator and the offset just past the terminator.
pub fn raw_line_at(chars: &[char], pos: usize) -> (String, usize) {
    let mut end = pos;
    while end < chars.len() && chars[end] != '\n' && chars[end] != '\r' {
        end += 1;
    }
    let line: String = chars[pos..end].iter().collect();
    let mut next = end;
    if next < chars.len() && chars[next] == '\r' {
        next += 1;
    }
    if next < chars.len() && chars[next] == '\n' {
        next += 1;
    }
    (line, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        scan(input).tokens().iter().map(|t| t.kind).collect()
    }

    fn non_ws(input: &str) -> Vec<(TokenKind, String)> {
        scan(input)
            .tokens()
            .iter()
            .filter(|t| t.kind != TokenKind::Whitespace && t.kind != TokenKind::Eof)
            .map(|t| (t.kind, t.literal.clone()))
            .collect()
    }

    #[test]
    fn simple_assignment() {
        assert_eq!(
            non_ws("myvar = 123 ;"),
            vec![
                (TokenKind::Literal, "myvar".to_string()),
                (TokenKind::Assignment, "=".to_string()),
                (TokenKind::Literal, "123".to_string()),
                (TokenKind::Terminator, ";".to_string()),
            ]
        );
    }

    #[test]
    fn terminator_requires_whitespace() {
        assert_eq!(
            non_ws("a;b ;"),
            vec![
                (TokenKind::Literal, "a;b".to_string()),
                (TokenKind::Terminator, ";".to_string()),
            ]
        );
    }

    #[test]
    fn accolades_require_whitespace() {
        assert_eq!(
            kinds("{ }"),
            vec![
                TokenKind::AccoladeOpen,
                TokenKind::Whitespace,
                TokenKind::AccoladeClose,
                TokenKind::Eof,
            ]
        );
        // Glued braces are plain literals.
        assert_eq!(kinds("{}"), vec![
            TokenKind::Literal,
            TokenKind::Literal,
            TokenKind::Eof
        ]);
    }

    #[test]
    fn variable_dereference_tokens() {
        assert_eq!(
            non_ws("$(myvar)"),
            vec![
                (TokenKind::VariableDereferencerOpen, "$(".to_string()),
                (TokenKind::Literal, "myvar".to_string()),
                (TokenKind::ParenthesisClose, ")".to_string()),
            ]
        );
    }

    #[test]
    fn modifier_span_tokens() {
        assert_eq!(
            non_ws("$(myvar:S=.exe)"),
            vec![
                (TokenKind::VariableDereferencerOpen, "$(".to_string()),
                (TokenKind::Literal, "myvar".to_string()),
                (TokenKind::Colon, ":".to_string()),
                (TokenKind::VariableExpansionModifier, "S".to_string()),
                (TokenKind::Assignment, "=".to_string()),
                (TokenKind::Literal, ".exe".to_string()),
                (TokenKind::ParenthesisClose, ")".to_string()),
            ]
        );
    }

    #[test]
    fn chained_modifiers() {
        assert_eq!(
            non_ws("$(v:S=.c:G=hi)"),
            vec![
                (TokenKind::VariableDereferencerOpen, "$(".to_string()),
                (TokenKind::Literal, "v".to_string()),
                (TokenKind::Colon, ":".to_string()),
                (TokenKind::VariableExpansionModifier, "S".to_string()),
                (TokenKind::Assignment, "=".to_string()),
                (TokenKind::Literal, ".c".to_string()),
                (TokenKind::Colon, ":".to_string()),
                (TokenKind::VariableExpansionModifier, "G".to_string()),
                (TokenKind::Assignment, "=".to_string()),
                (TokenKind::Literal, "hi".to_string()),
                (TokenKind::ParenthesisClose, ")".to_string()),
            ]
        );
    }

    #[test]
    fn bare_modifier_closes_span_at_parenthesis() {
        assert_eq!(
            non_ws("$(v:J)"),
            vec![
                (TokenKind::VariableDereferencerOpen, "$(".to_string()),
                (TokenKind::Literal, "v".to_string()),
                (TokenKind::Colon, ":".to_string()),
                (TokenKind::VariableExpansionModifier, "J".to_string()),
                (TokenKind::ParenthesisClose, ")".to_string()),
            ]
        );
    }

    #[test]
    fn colon_inside_literal_outside_expansion() {
        assert_eq!(
            non_ws("hello:there"),
            vec![(TokenKind::Literal, "hello:there".to_string())]
        );
    }

    #[test]
    fn colon_whitespace_delimited_is_an_argument_separator() {
        assert_eq!(
            non_ws("a : b"),
            vec![
                (TokenKind::Literal, "a".to_string()),
                (TokenKind::Colon, ":".to_string()),
                (TokenKind::Literal, "b".to_string()),
            ]
        );
    }

    #[test]
    fn backslash_escapes_one_character() {
        assert_eq!(
            non_ws(r"a\ b"),
            vec![(TokenKind::Literal, "a b".to_string())]
        );
        assert_eq!(
            non_ws(r"c\:d"),
            vec![(TokenKind::Literal, "c:d".to_string())]
        );
    }

    #[test]
    fn quotes_strip_and_bind() {
        assert_eq!(
            non_ws(r#""hello there""#),
            vec![(TokenKind::Literal, "hello there".to_string())]
        );
        // Quoted keywords lose their special meaning.
        assert_eq!(
            non_ws(r#"";""#),
            vec![(TokenKind::Literal, ";".to_string())]
        );
    }

    #[test]
    fn empty_quoted_literal() {
        assert_eq!(non_ws(r#""""#), vec![(TokenKind::Literal, String::new())]);
    }

    #[test]
    fn quote_state_persists_across_tokens() {
        // The quote opens inside the first literal and closes in the second,
        // keeping the interior whitespace out of the token stream's
        // whitespace tokens only outside the quote.
        assert_eq!(
            non_ws(r#"a"b c"d"#),
            vec![(TokenKind::Literal, "ab cd".to_string())]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            non_ws("a ;\n# ignore me\nb ;"),
            vec![
                (TokenKind::Literal, "a".to_string()),
                (TokenKind::Terminator, ";".to_string()),
                (TokenKind::Literal, "b".to_string()),
                (TokenKind::Terminator, ";".to_string()),
            ]
        );
    }

    #[test]
    fn whitespace_runs_split_at_newlines() {
        let literals: Vec<String> = scan("a \n\n  b")
            .tokens()
            .iter()
            .filter(|t| t.kind == TokenKind::Whitespace)
            .map(|t| t.literal.clone())
            .collect();
        assert_eq!(literals, vec![" ", "\n\n", "  "]);
    }

    #[test]
    fn keywords_and_operators() {
        assert_eq!(
            non_ws("if ! $(a) != b && c { }"),
            vec![
                (TokenKind::If, "if".to_string()),
                (TokenKind::Not, "!".to_string()),
                (TokenKind::VariableDereferencerOpen, "$(".to_string()),
                (TokenKind::Literal, "a".to_string()),
                (TokenKind::ParenthesisClose, ")".to_string()),
                (TokenKind::NotEqual, "!=".to_string()),
                (TokenKind::Literal, "b".to_string()),
                (TokenKind::And, "&&".to_string()),
                (TokenKind::Literal, "c".to_string()),
                (TokenKind::AccoladeOpen, "{".to_string()),
                (TokenKind::AccoladeClose, "}".to_string()),
            ]
        );
    }

    #[test]
    fn angle_brackets_only_special_when_delimited() {
        assert_eq!(
            non_ws("a < b"),
            vec![
                (TokenKind::Literal, "a".to_string()),
                (TokenKind::LessThan, "<".to_string()),
                (TokenKind::Literal, "b".to_string()),
            ]
        );
        assert_eq!(
            non_ws("<grist>file"),
            vec![(TokenKind::Literal, "<grist>file".to_string())]
        );
    }

    #[test]
    fn close_parenthesis_is_only_special_inside_expansions() {
        assert_eq!(non_ws("a)b"), vec![(TokenKind::Literal, "a)b".to_string())]);
        assert_eq!(
            non_ws("(a  b  c)"),
            vec![
                (TokenKind::Literal, "(a".to_string()),
                (TokenKind::Literal, "b".to_string()),
                (TokenKind::Literal, "c)".to_string()),
            ]
        );
        // An open expansion still ends at the parenthesis.
        assert_eq!(
            non_ws("$(v)b"),
            vec![
                (TokenKind::VariableDereferencerOpen, "$(".to_string()),
                (TokenKind::Literal, "v".to_string()),
                (TokenKind::ParenthesisClose, ")".to_string()),
                (TokenKind::Literal, "b".to_string()),
            ]
        );
    }

    #[test]
    fn nested_expansions() {
        assert_eq!(
            non_ws("$($(a))"),
            vec![
                (TokenKind::VariableDereferencerOpen, "$(".to_string()),
                (TokenKind::VariableDereferencerOpen, "$(".to_string()),
                (TokenKind::Literal, "a".to_string()),
                (TokenKind::ParenthesisClose, ")".to_string()),
                (TokenKind::ParenthesisClose, ")".to_string()),
            ]
        );
    }

    #[test]
    fn literal_expansion_token() {
        assert_eq!(
            non_ws("@(harry:S=.exe)")[0],
            (TokenKind::LiteralExpansionOpen, "@(".to_string())
        );
    }

    #[test]
    fn dollar_without_parenthesis_stays_literal() {
        assert_eq!(non_ws("a$b"), vec![(TokenKind::Literal, "a$b".to_string())]);
    }

    #[test]
    fn scanning_never_fails_on_stray_characters() {
        // Unbalanced quote, stray ')' at depth zero, lone backslash at EOF.
        let stream = scan("\" ) \\");
        assert_eq!(stream.tokens().last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn raw_line_reader() {
        let chars: Vec<char> = "one\ntwo\r\nthree".chars().collect();
        let (line, next) = raw_line_at(&chars, 0);
        assert_eq!(line, "one");
        let (line, next) = raw_line_at(&chars, next);
        assert_eq!(line, "two");
        let (line, next) = raw_line_at(&chars, next);
        assert_eq!(line, "three");
        assert_eq!(next, chars.len());
    }

    #[test]
    fn token_stream_cursor_save_restore() {
        let mut stream = scan("a = b ;");
        let saved = stream.cursor();
        assert_eq!(stream.next().literal, "a");
        assert_eq!(stream.next().kind, TokenKind::Assignment);
        stream.set_cursor(saved);
        assert_eq!(stream.next().literal, "a");
    }

    #[test]
    fn peek_raw_sees_whitespace() {
        let mut stream = scan("a b");
        stream.next();
        assert_eq!(stream.peek_raw().kind, TokenKind::Whitespace);
        assert_eq!(stream.peek().literal, "b");
    }
}
