//! Recursive-descent parser for Jam.
//!
//! The parser walks the scanned token stream with a cursor and backtracks by
//! saving/restoring it; the only places that need it are the
//! assignment-versus-invocation split and left-side classification, both of
//! which speculatively parse one expression and look at the following token.
//! Whitespace tokens are skipped everywhere except the immediate-adjacency
//! peek that drives combine-expression construction.

use thiserror::Error;

use crate::ast::{
    AssignOp, BinaryOp, Dereference, Expression, Modifier, Program, Statement, SwitchCase,
};
use crate::scanner::{self, raw_line_at, TokenStream};
use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected token {kind:?} ({literal:?}) at offset {position}")]
    UnexpectedToken {
        kind: TokenKind,
        literal: String,
        position: usize,
    },
    #[error("expected {expected:?}, found {found:?} ({literal:?}) at offset {position}")]
    ExpectedToken {
        expected: TokenKind,
        found: TokenKind,
        literal: String,
        position: usize,
    },
    #[error("expected an expression at offset {position}")]
    ExpectedExpression { position: usize },
    #[error("expected a literal name at offset {position}")]
    ExpectedLiteralName { position: usize },
    #[error("rule body must be a block at offset {position}")]
    ExpectedBlockBody { position: usize },
    #[error("a negated condition cannot carry a comparison operator (offset {position})")]
    NegatedComparison { position: usize },
    #[error("actions body never closed with a lone '}}' line")]
    UnterminatedActions,
}

type Result<T> = std::result::Result<T, ParseError>;

pub struct Parser {
    stream: TokenStream,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            stream: scanner::scan(input),
        }
    }

    /// Parses the whole input as a statement sequence.
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut statements = Vec::new();
        while let Some(statement) = self.parse_statement()? {
            statements.push(statement);
        }
        let trailing = self.stream.peek();
        if trailing.kind != TokenKind::Eof {
            return Err(Self::unexpected(trailing));
        }
        Ok(Program { statements })
    }

    /// Parses one statement; `None` at EOF or before a token that closes the
    /// enclosing construct (`}` or `case`).
    pub fn parse_statement(&mut self) -> Result<Option<Statement>> {
        let statement = match self.stream.peek().kind {
            TokenKind::Eof | TokenKind::Case | TokenKind::AccoladeClose => return Ok(None),
            TokenKind::AccoladeOpen => Statement::Block(self.parse_block()?),
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Switch => self.parse_switch()?,
            TokenKind::Rule => self.parse_rule_declaration()?,
            TokenKind::Actions => self.parse_actions_declaration()?,
            TokenKind::Return => self.parse_return()?,
            TokenKind::Local => self.parse_local()?,
            TokenKind::On => self.parse_on()?,
            TokenKind::Include => self.parse_include()?,
            TokenKind::Break => {
                self.stream.next();
                self.expect(TokenKind::Terminator)?;
                Statement::Break
            }
            TokenKind::Continue => {
                self.stream.next();
                self.expect(TokenKind::Terminator)?;
                Statement::Continue
            }
            TokenKind::Literal | TokenKind::VariableDereferencerOpen => {
                self.parse_assignment_or_invocation()?
            }
            _ => return Err(Self::unexpected(self.stream.peek())),
        };
        Ok(Some(statement))
    }

    // --- statements ---------------------------------------------------------

    fn parse_block(&mut self) -> Result<Vec<Statement>> {
        self.expect(TokenKind::AccoladeOpen)?;
        let mut statements = Vec::new();
        loop {
            if self.stream.peek().kind == TokenKind::AccoladeClose {
                self.stream.next();
                return Ok(statements);
            }
            match self.parse_statement()? {
                Some(statement) => statements.push(statement),
                None => return Err(self.expected_here(TokenKind::AccoladeClose)),
            }
        }
    }

    fn parse_if(&mut self) -> Result<Statement> {
        self.stream.next();
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        let else_branch = if self.stream.peek().kind == TokenKind::Else {
            self.stream.next();
            Some(Box::new(self.require_statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            body,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Statement> {
        self.stream.next();
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(Statement::While { condition, body })
    }

    fn parse_for(&mut self) -> Result<Statement> {
        self.stream.next();
        let variable = self.require_literal_name()?;
        self.expect(TokenKind::In)?;
        let list = self.parse_expression_list()?;
        let body = self.parse_block()?;
        Ok(Statement::For {
            variable,
            list,
            body,
        })
    }

    fn parse_switch(&mut self) -> Result<Statement> {
        self.stream.next();
        let subject = self.require_expression()?;
        self.expect(TokenKind::AccoladeOpen)?;

        let mut cases = Vec::new();
        loop {
            let next = self.stream.next();
            if next.kind == TokenKind::AccoladeClose {
                break;
            }
            if next.kind != TokenKind::Case {
                return Err(Self::unexpected(&next));
            }
            let value = self.require_literal_name()?;
            self.expect(TokenKind::Colon)?;
            let mut statements = Vec::new();
            while let Some(statement) = self.parse_statement()? {
                statements.push(statement);
            }
            cases.push(SwitchCase { value, statements });
        }
        Ok(Statement::Switch { subject, cases })
    }

    fn parse_rule_declaration(&mut self) -> Result<Statement> {
        self.stream.next();
        let name = self.require_literal_name()?;
        let argument_lists = self.parse_argument_list()?;

        let mut parameters = Vec::new();
        for list in argument_lists {
            for expression in list {
                match expression {
                    Expression::Literal(parameter) => parameters.push(parameter),
                    _ => {
                        return Err(ParseError::ExpectedLiteralName {
                            position: self.stream.peek().span.start,
                        });
                    }
                }
            }
        }
        // Zero-parameter rules still receive implicit arguments; normalize
        // to one synthetic placeholder so `$(1)` has something to bind to.
        if parameters.is_empty() {
            parameters.push("implicit_argument_1".to_string());
        }

        let body_position = self.stream.peek().span.start;
        let body = match self.require_statement()? {
            Statement::Block(statements) => statements,
            _ => {
                return Err(ParseError::ExpectedBlockBody {
                    position: body_position,
                });
            }
        };
        Ok(Statement::RuleDeclaration {
            name,
            parameters,
            body,
        })
    }

    /// `actions [modifier…] name { raw shell lines }`. The body is captured
    /// verbatim, line by line, until a line that trims to `}`.
    fn parse_actions_declaration(&mut self) -> Result<Statement> {
        self.stream.next();
        let mut expressions = self.parse_expression_list()?;
        let name = match expressions.pop() {
            Some(Expression::Literal(name)) => name,
            _ => {
                return Err(ParseError::ExpectedLiteralName {
                    position: self.stream.peek().span.start,
                });
            }
        };
        let modifiers = expressions;

        self.expect(TokenKind::AccoladeOpen)?;

        let chars = self.stream.source_chars().to_vec();
        let mut pos = self.stream.char_pos();
        // Discard the remainder of the `{` line.
        let (_, next) = raw_line_at(&chars, pos);
        pos = next;

        let mut lines = Vec::new();
        loop {
            if pos >= chars.len() {
                return Err(ParseError::UnterminatedActions);
            }
            let (line, next) = raw_line_at(&chars, pos);
            pos = next;
            if line.trim() == "}" {
                break;
            }
            lines.push(line);
        }
        self.stream.seek_to_char(pos);

        Ok(Statement::ActionsDeclaration {
            name,
            modifiers,
            lines,
        })
    }

    fn parse_return(&mut self) -> Result<Statement> {
        self.stream.next();
        let values = self.parse_expression_list()?;
        self.expect(TokenKind::Terminator)?;
        Ok(Statement::Return(values))
    }

    fn parse_local(&mut self) -> Result<Statement> {
        self.stream.next();
        let variable = self.require_literal_name()?;
        let next = self.stream.next();
        let value = match next.kind {
            TokenKind::Terminator => Vec::new(),
            TokenKind::Assignment => {
                let value = self.parse_expression_list()?;
                self.expect(TokenKind::Terminator)?;
                value
            }
            _ => return Err(Self::unexpected(&next)),
        };
        Ok(Statement::Local { variable, value })
    }

    fn parse_on(&mut self) -> Result<Statement> {
        self.stream.next();
        let target = self.require_expression()?;
        let body = Box::new(self.require_statement()?);
        Ok(Statement::On { target, body })
    }

    fn parse_include(&mut self) -> Result<Statement> {
        self.stream.next();
        let unit = self.require_expression()?;
        self.expect(TokenKind::Terminator)?;
        Ok(Statement::Include(unit))
    }

    /// A statement opening with an expression is either an assignment or a
    /// rule invocation; one speculative expression parse plus a peek at the
    /// following token decides.
    fn parse_assignment_or_invocation(&mut self) -> Result<Statement> {
        if self.next_is_assignment()? {
            let left = self.parse_assignment_left_side()?;
            let op_token = self.stream.next();
            let op = match op_token.kind {
                TokenKind::Assignment => AssignOp::Assign,
                TokenKind::AppendOperator => AssignOp::Append,
                TokenKind::SubtractOperator => AssignOp::Subtract,
                TokenKind::AssignmentIfEmpty => AssignOp::AssignIfEmpty,
                _ => return Err(Self::unexpected(&op_token)),
            };
            let right = self.parse_expression_list()?;
            self.expect(TokenKind::Terminator)?;
            return Ok(Statement::Assignment { left, op, right });
        }

        let rule = self.require_expression()?;
        let arguments = self.parse_argument_list()?;
        self.expect(TokenKind::Terminator)?;
        Ok(Statement::Invocation { rule, arguments })
    }

    fn next_is_assignment(&mut self) -> Result<bool> {
        let saved = self.stream.cursor();
        let expression = self.parse_expression()?;
        let next = self.stream.next();
        self.stream.set_cursor(saved);
        if expression.is_none() {
            return Ok(false);
        }
        Ok(matches!(
            next.kind,
            TokenKind::Assignment
                | TokenKind::AppendOperator
                | TokenKind::SubtractOperator
                | TokenKind::AssignmentIfEmpty
                | TokenKind::On
        ))
    }

    fn parse_assignment_left_side(&mut self) -> Result<Expression> {
        let saved = self.stream.cursor();
        self.parse_expression()?;
        let next = self.stream.next();
        self.stream.set_cursor(saved);

        match next.kind {
            TokenKind::On => {
                let variable = Box::new(self.require_expression()?);
                self.expect(TokenKind::On)?;
                let targets = self.parse_expression_list()?;
                Ok(Expression::VariableOnTarget { variable, targets })
            }
            TokenKind::Assignment
            | TokenKind::AppendOperator
            | TokenKind::SubtractOperator
            | TokenKind::AssignmentIfEmpty => self.require_expression(),
            _ => Err(Self::unexpected(&next)),
        }
    }

    // --- expressions --------------------------------------------------------

    /// Parses expressions until a token that cannot start one.
    pub fn parse_expression_list(&mut self) -> Result<Vec<Expression>> {
        let mut expressions = Vec::new();
        while let Some(expression) = self.parse_expression()? {
            expressions.push(expression);
        }
        Ok(expressions)
    }

    /// Colon-separated expression lists, as in rule invocation arguments.
    pub fn parse_argument_list(&mut self) -> Result<Vec<Vec<Expression>>> {
        let mut lists = Vec::new();
        loop {
            lists.push(self.parse_expression_list()?);
            if self.stream.peek().kind == TokenKind::Colon {
                self.stream.next();
                continue;
            }
            return Ok(lists);
        }
    }

    /// Parses one expression, or `None` when the next token terminates an
    /// expression list.
    pub fn parse_expression(&mut self) -> Result<Option<Expression>> {
        let expression = match self.stream.peek().kind {
            TokenKind::Eof
            | TokenKind::Colon
            | TokenKind::Terminator
            | TokenKind::ParenthesisClose
            | TokenKind::BracketClose
            | TokenKind::Assignment
            | TokenKind::AppendOperator
            | TokenKind::SubtractOperator
            | TokenKind::AssignmentIfEmpty
            | TokenKind::AccoladeOpen
            | TokenKind::Not
            | TokenKind::And
            | TokenKind::Or
            | TokenKind::NotEqual
            | TokenKind::In
            | TokenKind::LessThan
            | TokenKind::GreaterThan => return Ok(None),
            TokenKind::VariableDereferencerOpen | TokenKind::LiteralExpansionOpen => {
                self.parse_dereference_expression()?
            }
            TokenKind::BracketOpen => self.parse_invocation_expression()?,
            _ => {
                let first = Expression::Literal(self.stream.next().literal);
                self.scan_for_combine(first)?
            }
        };
        Ok(Some(expression))
    }

    /// `$(subject[indexer]:modifiers)` or `@(...)`.
    fn parse_dereference_expression(&mut self) -> Result<Expression> {
        let open = self.stream.next();
        let variable = self.require_expression()?;

        let mut indexer = None;
        let mut next = self.stream.next();
        if next.kind == TokenKind::BracketOpen {
            indexer = Some(self.require_expression()?);
            self.expect(TokenKind::BracketClose)?;
            next = self.stream.next();
        }

        let mut modifiers = Vec::new();
        if next.kind == TokenKind::Colon {
            loop {
                let token = self.stream.next();
                match token.kind {
                    TokenKind::Colon => continue,
                    TokenKind::ParenthesisClose => {
                        next = token;
                        break;
                    }
                    TokenKind::VariableExpansionModifier => {
                        let command = token.literal.chars().next().unwrap_or('\\');
                        let argument = if self.stream.peek().kind == TokenKind::Assignment {
                            self.stream.next();
                            // `X=` with no value means "replace with empty",
                            // which is not the same as a bare `X`.
                            Some(
                                self.parse_expression()?
                                    .unwrap_or(Expression::Literal(String::new())),
                            )
                        } else {
                            None
                        };
                        modifiers.push(Modifier { command, argument });
                    }
                    _ => return Err(Self::unexpected(&token)),
                }
            }
        }

        if next.kind != TokenKind::ParenthesisClose {
            return Err(ParseError::ExpectedToken {
                expected: TokenKind::ParenthesisClose,
                found: next.kind,
                literal: next.literal,
                position: next.span.start,
            });
        }

        let dereference = Box::new(Dereference {
            variable,
            indexer,
            modifiers,
        });
        let expression = match open.kind {
            TokenKind::LiteralExpansionOpen => Expression::LiteralExpansion(dereference),
            _ => Expression::VariableDereference(dereference),
        };
        self.scan_for_combine(expression)
    }

    fn parse_invocation_expression(&mut self) -> Result<Expression> {
        self.expect(TokenKind::BracketOpen)?;
        let rule = Box::new(self.require_expression()?);
        let arguments = self.parse_argument_list()?;
        self.expect(TokenKind::BracketClose)?;
        Ok(Expression::Invocation { rule, arguments })
    }

    /// When the token directly after an expression (no whitespace) can start
    /// another expression, the two glue into a combine expression.
    fn scan_for_combine(&mut self, first: Expression) -> Result<Expression> {
        let adjacent = matches!(
            self.stream.peek_raw().kind,
            TokenKind::Literal
                | TokenKind::VariableDereferencerOpen
                | TokenKind::LiteralExpansionOpen
        );
        if !adjacent {
            return Ok(first);
        }

        let tail = self.require_expression()?;
        let mut elements = vec![first];
        match tail {
            Expression::Combine(tail_elements) => elements.extend(tail_elements),
            other => elements.push(other),
        }
        Ok(Expression::Combine(elements))
    }

    // --- conditions ---------------------------------------------------------

    /// Entry point for `if`/`while` conditions. Jam does not treat
    /// parentheses as tokens, so a stray `)` can trail an otherwise complete
    /// condition (`if (a) { }` scans as the literal `(a` plus `)`); sweep
    /// those up here, at the outermost level only.
    pub fn parse_condition(&mut self) -> Result<Expression> {
        let condition = self.parse_condition_chain()?;
        while self.stream.peek().kind == TokenKind::ParenthesisClose {
            self.stream.next();
        }
        Ok(condition)
    }

    fn parse_condition_chain(&mut self) -> Result<Expression> {
        let left = self.parse_condition_term()?;
        let op = match self.stream.peek().kind {
            TokenKind::And => BinaryOp::And,
            TokenKind::Or => BinaryOp::Or,
            _ => return Ok(left),
        };
        self.stream.next();
        let right = self.parse_condition_chain()?;
        Ok(Expression::BinaryOperator {
            left: Box::new(left),
            op,
            right: vec![right],
        })
    }

    fn parse_condition_term(&mut self) -> Result<Expression> {
        if self.stream.peek().kind == TokenKind::Not {
            self.stream.next();
            let inner = self.require_expression()?;
            if comparison_op(self.stream.peek().kind).is_some() {
                return Err(ParseError::NegatedComparison {
                    position: self.stream.peek().span.start,
                });
            }
            return Ok(Expression::Not(Box::new(inner)));
        }

        // A lone `(` followed by whitespace opens a condition group; a glued
        // `(` is an ordinary literal that participates in combines.
        let peek = self.stream.peek();
        if peek.kind == TokenKind::Literal && peek.literal == "(" {
            let saved = self.stream.cursor();
            self.stream.next();
            if self.stream.peek_raw().kind == TokenKind::Whitespace {
                let inner = self.parse_condition_chain()?;
                self.expect(TokenKind::ParenthesisClose)?;
                return Ok(inner);
            }
            self.stream.set_cursor(saved);
        }

        let left = self.require_expression()?;
        let Some(op) = comparison_op(self.stream.peek().kind) else {
            return Ok(left);
        };
        self.stream.next();
        let right = self.parse_expression_list()?;
        Ok(Expression::BinaryOperator {
            left: Box::new(left),
            op,
            right,
        })
    }

    // --- helpers ------------------------------------------------------------

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        let token = self.stream.next();
        if token.kind != expected {
            return Err(ParseError::ExpectedToken {
                expected,
                found: token.kind,
                literal: token.literal,
                position: token.span.start,
            });
        }
        Ok(token)
    }

    fn expected_here(&self, expected: TokenKind) -> ParseError {
        let token = self.stream.peek();
        ParseError::ExpectedToken {
            expected,
            found: token.kind,
            literal: token.literal.clone(),
            position: token.span.start,
        }
    }

    fn require_expression(&mut self) -> Result<Expression> {
        let position = self.stream.peek().span.start;
        self.parse_expression()?
            .ok_or(ParseError::ExpectedExpression { position })
    }

    fn require_statement(&mut self) -> Result<Statement> {
        let token = self.stream.peek().clone();
        self.parse_statement()?
            .ok_or_else(|| Self::unexpected(&token))
    }

    fn require_literal_name(&mut self) -> Result<String> {
        let position = self.stream.peek().span.start;
        match self.parse_expression()? {
            Some(Expression::Literal(name)) => Ok(name),
            _ => Err(ParseError::ExpectedLiteralName { position }),
        }
    }

    fn unexpected(token: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            kind: token.kind,
            literal: token.literal.clone(),
            position: token.span.start,
        }
    }
}

fn comparison_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Assignment => Some(BinaryOp::Equal),
        TokenKind::NotEqual => Some(BinaryOp::NotEqual),
        TokenKind::In => Some(BinaryOp::In),
        TokenKind::LessThan => Some(BinaryOp::LessThan),
        TokenKind::GreaterThan => Some(BinaryOp::GreaterThan),
        _ => None,
    }
}

/// Parses a full source unit.
pub fn parse(input: &str) -> Result<Program> {
    Parser::new(input).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn statements(input: &str) -> Vec<Statement> {
        parse(input).expect("parse").statements
    }

    fn single(input: &str) -> Statement {
        let mut parsed = statements(input);
        assert_eq!(parsed.len(), 1, "expected one statement");
        parsed.remove(0)
    }

    fn lit(value: &str) -> Expression {
        Expression::Literal(value.to_string())
    }

    fn deref(name: &str) -> Expression {
        Expression::VariableDereference(Box::new(Dereference {
            variable: lit(name),
            indexer: None,
            modifiers: Vec::new(),
        }))
    }

    #[test]
    fn simple_assignment() {
        assert_eq!(
            single("myvar = a b c ;"),
            Statement::Assignment {
                left: lit("myvar"),
                op: AssignOp::Assign,
                right: vec![lit("a"), lit("b"), lit("c")],
            }
        );
    }

    #[test]
    fn assignment_operators() {
        for (source, op) in [
            ("v += x ;", AssignOp::Append),
            ("v -= x ;", AssignOp::Subtract),
            ("v ?= x ;", AssignOp::AssignIfEmpty),
        ] {
            match single(source) {
                Statement::Assignment { op: parsed, .. } => assert_eq!(parsed, op),
                other => panic!("expected assignment, got {other:?}"),
            }
        }
    }

    #[test]
    fn invocation_statement() {
        assert_eq!(
            single("Echo hello world ;"),
            Statement::Invocation {
                rule: lit("Echo"),
                arguments: vec![vec![lit("hello"), lit("world")]],
            }
        );
    }

    #[test]
    fn invocation_with_argument_lists() {
        assert_eq!(
            single("MyRule a b : c ;"),
            Statement::Invocation {
                rule: lit("MyRule"),
                arguments: vec![vec![lit("a"), lit("b")], vec![lit("c")]],
            }
        );
    }

    #[test]
    fn dynamic_invocation_statement() {
        match single("$(myrules) arg ;") {
            Statement::Invocation { rule, .. } => assert_eq!(rule, deref("myrules")),
            other => panic!("expected invocation, got {other:?}"),
        }
    }

    #[test]
    fn combine_expression() {
        assert_eq!(
            single("v = a$(x)b ;"),
            Statement::Assignment {
                left: lit("v"),
                op: AssignOp::Assign,
                right: vec![Expression::Combine(vec![lit("a"), deref("x"), lit("b")])],
            }
        );
    }

    #[test]
    fn combine_on_left_side() {
        match single("$(myvar)_sally = 123 ;") {
            Statement::Assignment { left, .. } => {
                assert_eq!(
                    left,
                    Expression::Combine(vec![deref("myvar"), lit("_sally")])
                );
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn dereference_with_indexer_and_modifiers() {
        match single("v = $(src[$(i)]:S=.o:G=grist) ;") {
            Statement::Assignment { right, .. } => {
                let Expression::VariableDereference(d) = &right[0] else {
                    panic!("expected dereference, got {:?}", right[0]);
                };
                assert_eq!(d.variable, lit("src"));
                assert_eq!(d.indexer, Some(deref("i")));
                assert_eq!(
                    d.modifiers,
                    vec![
                        Modifier {
                            command: 'S',
                            argument: Some(lit(".o")),
                        },
                        Modifier {
                            command: 'G',
                            argument: Some(lit("grist")),
                        },
                    ]
                );
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn bare_modifier_versus_empty_value() {
        match single("v = $(a:S) $(a:S=) ;") {
            Statement::Assignment { right, .. } => {
                let Expression::VariableDereference(bare) = &right[0] else {
                    panic!();
                };
                let Expression::VariableDereference(empty) = &right[1] else {
                    panic!();
                };
                assert_eq!(bare.modifiers[0].argument, None);
                assert_eq!(empty.modifiers[0].argument, Some(lit("")));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn rule_declaration_with_parameters() {
        match single("rule MyRule arg1 : arg2 { Echo $(arg1) ; }") {
            Statement::RuleDeclaration {
                name,
                parameters,
                body,
            } => {
                assert_eq!(name, "MyRule");
                assert_eq!(parameters, vec!["arg1", "arg2"]);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected rule declaration, got {other:?}"),
        }
    }

    #[test]
    fn zero_parameter_rule_gets_a_placeholder() {
        match single("rule NoArgs { }") {
            Statement::RuleDeclaration { parameters, .. } => {
                assert_eq!(parameters, vec!["implicit_argument_1"]);
            }
            other => panic!("expected rule declaration, got {other:?}"),
        }
    }

    #[test]
    fn actions_capture_raw_lines() {
        let source = indoc! {"
            actions together quietly clean
            {
                rm -rf $(1)
                echo done
            }
        "};
        match single(source) {
            Statement::ActionsDeclaration {
                name,
                modifiers,
                lines,
            } => {
                assert_eq!(name, "clean");
                assert_eq!(modifiers, vec![lit("together"), lit("quietly")]);
                assert_eq!(lines, vec!["    rm -rf $(1)", "    echo done"]);
            }
            other => panic!("expected actions declaration, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_actions_is_an_error() {
        assert_eq!(
            parse("actions clean {\n  rm\n").unwrap_err(),
            ParseError::UnterminatedActions
        );
    }

    #[test]
    fn if_else_chain() {
        match single("if $(a) { } else if $(b) { } else { }") {
            Statement::If { else_branch, .. } => {
                let else_branch = *else_branch.expect("else branch");
                assert!(matches!(else_branch, Statement::If { .. }));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn condition_operators() {
        match single("if $(a) != b c { }") {
            Statement::If { condition, .. } => {
                assert_eq!(
                    condition,
                    Expression::BinaryOperator {
                        left: Box::new(deref("a")),
                        op: BinaryOp::NotEqual,
                        right: vec![lit("b"), lit("c")],
                    }
                );
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn condition_chains_are_right_associated() {
        match single("if $(a) || $(b) && $(c) { }") {
            Statement::If { condition, .. } => {
                let Expression::BinaryOperator { op, right, .. } = condition else {
                    panic!("expected operator chain");
                };
                assert_eq!(op, BinaryOp::Or);
                assert!(matches!(
                    &right[0],
                    Expression::BinaryOperator {
                        op: BinaryOp::And,
                        ..
                    }
                ));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn grouped_condition() {
        match single("if ( $(a) || $(b) ) && $(c) { }") {
            Statement::If { condition, .. } => {
                let Expression::BinaryOperator { op, left, .. } = condition else {
                    panic!("expected operator chain");
                };
                assert_eq!(op, BinaryOp::And);
                assert!(matches!(
                    *left,
                    Expression::BinaryOperator {
                        op: BinaryOp::Or,
                        ..
                    }
                ));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn glued_parenthesis_is_a_combine() {
        match single("if ($(a)x = foox) { }") {
            Statement::If { condition, .. } => {
                let Expression::BinaryOperator { left, .. } = condition else {
                    panic!("expected comparison");
                };
                assert_eq!(
                    *left,
                    Expression::Combine(vec![lit("("), deref("a"), lit("x")])
                );
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn trailing_parenthesis_after_condition_is_swept() {
        // `(a` is one literal; the stray `)` before `{` must not break the
        // parse.
        match single("if (a) { Echo a ; }") {
            Statement::If { condition, .. } => assert_eq!(condition, lit("(a")),
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn negation() {
        match single("if ! $(a) { }") {
            Statement::If { condition, .. } => {
                assert_eq!(condition, Expression::Not(Box::new(deref("a"))));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn negated_comparison_is_rejected() {
        assert!(matches!(
            parse("if ! $(a) = b { }").unwrap_err(),
            ParseError::NegatedComparison { .. }
        ));
    }

    #[test]
    fn switch_statement() {
        match single("switch $(v) { case a : Echo one ; case * : Echo other ; }") {
            Statement::Switch { subject, cases } => {
                assert_eq!(subject, deref("v"));
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].value, "a");
                assert_eq!(cases[1].value, "*");
                assert_eq!(cases[0].statements.len(), 1);
            }
            other => panic!("expected switch, got {other:?}"),
        }
    }

    #[test]
    fn for_loop() {
        match single("for x in a $(b) { Echo $(x) ; }") {
            Statement::For { variable, list, .. } => {
                assert_eq!(variable, "x");
                assert_eq!(list, vec![lit("a"), deref("b")]);
            }
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn on_statement() {
        match single("on $(t) { Echo $(v) ; }") {
            Statement::On { target, body } => {
                assert_eq!(target, deref("t"));
                assert!(matches!(*body, Statement::Block(_)));
            }
            other => panic!("expected on, got {other:?}"),
        }
    }

    #[test]
    fn on_target_assignment() {
        match single("myvar on target1 $(t2) = value ;") {
            Statement::Assignment { left, op, right } => {
                assert_eq!(op, AssignOp::Assign);
                assert_eq!(right, vec![lit("value")]);
                assert_eq!(
                    left,
                    Expression::VariableOnTarget {
                        variable: Box::new(lit("myvar")),
                        targets: vec![lit("target1"), deref("t2")],
                    }
                );
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn local_with_and_without_value() {
        assert_eq!(
            single("local a ;"),
            Statement::Local {
                variable: "a".to_string(),
                value: vec![],
            }
        );
        assert_eq!(
            single("local a = b c ;"),
            Statement::Local {
                variable: "a".to_string(),
                value: vec![lit("b"), lit("c")],
            }
        );
    }

    #[test]
    fn include_statement() {
        assert_eq!(
            single("include $(unit) ;"),
            Statement::Include(deref("unit"))
        );
        assert_eq!(
            single("Include other.jam ;"),
            Statement::Include(lit("other.jam"))
        );
    }

    #[test]
    fn bracket_invocation_expression() {
        match single("v = [ MakeThing a : b ] ;") {
            Statement::Assignment { right, .. } => {
                assert_eq!(
                    right[0],
                    Expression::Invocation {
                        rule: Box::new(lit("MakeThing")),
                        arguments: vec![vec![lit("a")], vec![lit("b")]],
                    }
                );
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn return_statement() {
        assert_eq!(
            single("rule R { return a b ; }"),
            Statement::RuleDeclaration {
                name: "R".to_string(),
                parameters: vec!["implicit_argument_1".to_string()],
                body: vec![Statement::Return(vec![lit("a"), lit("b")])],
            }
        );
    }

    #[test]
    fn break_and_continue() {
        assert_eq!(
            statements("for x in a { break ; continue ; }"),
            vec![Statement::For {
                variable: "x".to_string(),
                list: vec![lit("a")],
                body: vec![Statement::Break, Statement::Continue],
            }]
        );
    }

    #[test]
    fn nested_dereference() {
        match single("v = $($(name)) ;") {
            Statement::Assignment { right, .. } => {
                let Expression::VariableDereference(outer) = &right[0] else {
                    panic!();
                };
                assert_eq!(outer.variable, deref("name"));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_token_reports_position() {
        match parse("v = a ; }").unwrap_err() {
            ParseError::UnexpectedToken { kind, position, .. } => {
                assert_eq!(kind, TokenKind::AccoladeClose);
                assert_eq!(position, 8);
            }
            other => panic!("expected unexpected-token error, got {other:?}"),
        }
    }

    #[test]
    fn missing_terminator_is_an_error() {
        assert!(parse("v = a").is_err());
    }
}
