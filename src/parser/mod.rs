//! Recursive-descent parser.
//!
//! Operator precedence, lowest to highest:
//! assignment, `||`, `&&`, equality, relational, additive, multiplicative,
//! unary, primary. Assignment is right-associative, everything else binds
//! left. Prefix `++`/`--` are desugared here into plain assignments of
//! `var ± 1`; they have no node of their own.

use crate::{
    ast::{AssignOp, Ast, BinOp, ReturnKind, UnaryOp},
    error::{CompileError, CompileResult},
    lexer::{Lexer, Token, TokenKind},
};

const MAX_PARAMS: usize = 6;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self { lexer }
    }

    /// Parse a whole translation unit into a `Program` node.
    pub fn parse(mut self) -> CompileResult<Ast> {
        let mut globals = vec![];
        let mut functions = vec![];

        while !self.check(TokenKind::Eof) {
            let returns = match self.current().kind {
                TokenKind::Int => ReturnKind::Int,
                TokenKind::Void => ReturnKind::Void,
                kind => {
                    return Err(self.error_here(format!(
                        "expected `int` or `void` at top level, found `{kind}`"
                    )))
                }
            };
            self.advance()?;

            let name = self.expect(TokenKind::Ident)?.text().to_owned();

            // One token decides: `(` starts a function, anything else is a
            // global variable declaration.
            if self.check(TokenKind::LParen) {
                functions.push(self.parse_function(returns, name)?);
            } else if returns == ReturnKind::Void {
                return Err(self.error_here(format!(
                    "expected `(`, found `{}`",
                    self.current().kind
                )));
            } else {
                globals.push(self.parse_var_decl(name)?);
            }
        }

        Ok(Ast::Program { globals, functions })
    }

    fn parse_function(&mut self, returns: ReturnKind, name: String) -> CompileResult<Ast> {
        self.expect(TokenKind::LParen)?;

        let mut params = vec![];
        if !self.check(TokenKind::RParen) {
            loop {
                // the `int` before a parameter name is accepted and ignored
                if self.check(TokenKind::Int) {
                    self.advance()?;
                }
                let param = self.expect(TokenKind::Ident)?;
                if params.len() == MAX_PARAMS {
                    return Err(CompileError::at(
                        param.line,
                        param.col,
                        format!("too many parameters (at most {MAX_PARAMS})"),
                    ));
                }
                params.push(param.text().to_owned());

                if !self.check(TokenKind::Comma) {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;

        Ok(Ast::Function {
            name,
            returns,
            params,
            body: Box::new(body),
        })
    }

    /// Tail of `int NAME ...;` — used for globals and for local
    /// declarations alike.
    fn parse_var_decl(&mut self, name: String) -> CompileResult<Ast> {
        let mut is_array = false;
        let mut size = None;

        if self.check(TokenKind::LBracket) {
            self.advance()?;
            let length = self.expect(TokenKind::Number)?;
            is_array = true;
            size = length.value;
            self.expect(TokenKind::RBracket)?;
        }

        let mut init = None;
        if self.check(TokenKind::Assign) {
            self.advance()?;
            init = Some(Box::new(self.parse_expression()?));
        }
        self.expect(TokenKind::Semicolon)?;

        Ok(Ast::VarDecl {
            name,
            is_array,
            size,
            init,
        })
    }

    fn parse_statement(&mut self) -> CompileResult<Ast> {
        match self.current().kind {
            TokenKind::Int => {
                self.advance()?;
                let name = self.expect(TokenKind::Ident)?.text().to_owned();
                self.parse_var_decl(name)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::LBrace => self.parse_block(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(expr)
            }
        }
    }

    fn parse_if(&mut self) -> CompileResult<Ast> {
        self.advance()?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;

        let then_branch = self.parse_statement()?;

        // a dangling else binds to the nearest preceding `if`
        let mut else_branch = None;
        if self.check(TokenKind::Else) {
            self.advance()?;
            else_branch = Some(Box::new(self.parse_statement()?));
        }

        Ok(Ast::IfStatement {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    fn parse_while(&mut self) -> CompileResult<Ast> {
        self.advance()?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_statement()?;

        Ok(Ast::WhileStatement {
            condition: Box::new(condition),
            body: Box::new(body),
        })
    }

    fn parse_for(&mut self) -> CompileResult<Ast> {
        self.advance()?;
        self.expect(TokenKind::LParen)?;

        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if self.check(TokenKind::Int) {
            self.advance()?;
            let name = self.expect(TokenKind::Ident)?.text().to_owned();
            let mut init = None;
            if self.check(TokenKind::Assign) {
                self.advance()?;
                init = Some(Box::new(self.parse_expression()?));
            }
            Some(Box::new(Ast::VarDecl {
                name,
                is_array: false,
                size: None,
                init,
            }))
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(TokenKind::Semicolon)?;

        // an absent condition is unconditionally true
        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(TokenKind::Semicolon)?;

        let update = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(TokenKind::RParen)?;

        let body = self.parse_statement()?;

        Ok(Ast::ForStatement {
            init,
            condition,
            update,
            body: Box::new(body),
        })
    }

    fn parse_return(&mut self) -> CompileResult<Ast> {
        self.advance()?;

        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(TokenKind::Semicolon)?;

        Ok(Ast::ReturnStatement { value })
    }

    fn parse_block(&mut self) -> CompileResult<Ast> {
        self.expect(TokenKind::LBrace)?;

        let mut statements = vec![];
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Ast::Block { statements })
    }

    pub fn parse_expression(&mut self) -> CompileResult<Ast> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> CompileResult<Ast> {
        let expr = self.parse_logical_or()?;

        let operator = match self.current().kind {
            TokenKind::Assign => AssignOp::Plain,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Sub,
            _ => return Ok(expr),
        };
        self.advance()?;

        let value = self.parse_assignment()?;

        Ok(Ast::Assignment {
            operator,
            target: Box::new(expr),
            value: Box::new(value),
        })
    }

    fn parse_logical_or(&mut self) -> CompileResult<Ast> {
        let mut expr = self.parse_logical_and()?;

        while self.check(TokenKind::OrOr) {
            self.advance()?;
            let right = self.parse_logical_and()?;
            expr = Ast::BinaryOp {
                operator: BinOp::Or,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> CompileResult<Ast> {
        let mut expr = self.parse_equality()?;

        while self.check(TokenKind::AndAnd) {
            self.advance()?;
            let right = self.parse_equality()?;
            expr = Ast::BinaryOp {
                operator: BinOp::And,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_equality(&mut self) -> CompileResult<Ast> {
        let mut expr = self.parse_relational()?;

        loop {
            let operator = match self.current().kind {
                TokenKind::Equal => BinOp::Equal,
                TokenKind::NotEqual => BinOp::NotEqual,
                _ => return Ok(expr),
            };
            self.advance()?;
            let right = self.parse_relational()?;
            expr = Ast::BinaryOp {
                operator,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
    }

    fn parse_relational(&mut self) -> CompileResult<Ast> {
        let mut expr = self.parse_additive()?;

        loop {
            let operator = match self.current().kind {
                TokenKind::LessThan => BinOp::LessThan,
                TokenKind::LessOrEqual => BinOp::LessOrEqual,
                TokenKind::GreaterThan => BinOp::GreaterThan,
                TokenKind::GreaterOrEqual => BinOp::GreaterOrEqual,
                _ => return Ok(expr),
            };
            self.advance()?;
            let right = self.parse_additive()?;
            expr = Ast::BinaryOp {
                operator,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
    }

    fn parse_additive(&mut self) -> CompileResult<Ast> {
        let mut expr = self.parse_multiplicative()?;

        loop {
            let operator = match self.current().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(expr),
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            expr = Ast::BinaryOp {
                operator,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> CompileResult<Ast> {
        let mut expr = self.parse_unary()?;

        loop {
            let operator = match self.current().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(expr),
            };
            self.advance()?;
            let right = self.parse_unary()?;
            expr = Ast::BinaryOp {
                operator,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> CompileResult<Ast> {
        match self.current().kind {
            TokenKind::Minus => {
                self.advance()?;
                let operand = self.parse_unary()?;
                Ok(Ast::UnaryOp {
                    operator: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Bang => {
                self.advance()?;
                let operand = self.parse_unary()?;
                Ok(Ast::UnaryOp {
                    operator: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            TokenKind::PlusPlus => self.parse_increment(BinOp::Add),
            TokenKind::MinusMinus => self.parse_increment(BinOp::Sub),
            _ => self.parse_primary(),
        }
    }

    /// `++x` and `--x` become `x = x ± 1` right here.
    fn parse_increment(&mut self, operator: BinOp) -> CompileResult<Ast> {
        self.advance()?;
        let name = self.expect(TokenKind::Ident)?.text().to_owned();

        Ok(Ast::Assignment {
            operator: AssignOp::Plain,
            target: Box::new(Ast::Variable { name: name.clone() }),
            value: Box::new(Ast::BinaryOp {
                operator,
                left: Box::new(Ast::Variable { name }),
                right: Box::new(Ast::Number { value: 1 }),
            }),
        })
    }

    fn parse_primary(&mut self) -> CompileResult<Ast> {
        match self.current().kind {
            TokenKind::Number => {
                let value = self.current().value.unwrap_or_default();
                self.advance()?;
                Ok(Ast::Number { value })
            }
            TokenKind::Str => {
                let value = self.current().text().to_owned();
                self.advance()?;
                Ok(Ast::Str { value })
            }
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Ampersand => {
                self.advance()?;
                let name = self.expect(TokenKind::Ident)?.text().to_owned();
                Ok(Ast::AddressOf { name })
            }
            TokenKind::Ident => {
                let name = self.current().text().to_owned();
                self.advance()?;

                if self.check(TokenKind::LParen) {
                    self.parse_call(name)
                } else if self.check(TokenKind::LBracket) {
                    self.advance()?;
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket)?;
                    Ok(Ast::ArrayAccess {
                        name,
                        index: Box::new(index),
                    })
                } else {
                    Ok(Ast::Variable { name })
                }
            }
            kind => Err(self.error_here(format!("expected expression, found `{kind}`"))),
        }
    }

    fn parse_call(&mut self, name: String) -> CompileResult<Ast> {
        self.expect(TokenKind::LParen)?;

        let mut args = vec![];
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.check(TokenKind::Comma) {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(TokenKind::RParen)?;

        Ok(Ast::FunctionCall { name, args })
    }

    fn current(&self) -> &Token {
        self.lexer.current()
    }

    fn advance(&mut self) -> CompileResult<()> {
        self.lexer.advance()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    /// Consume and return the current token if it has the expected kind.
    fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if self.current().kind != kind {
            return Err(self.error_here(format!(
                "expected `{kind}`, found `{}`",
                self.current().kind
            )));
        }
        let token = self.current().clone();
        self.advance()?;
        Ok(token)
    }

    fn error_here(&self, message: String) -> CompileError {
        CompileError::at(self.current().line, self.current().col, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> CompileResult<Ast> {
        Parser::new(Lexer::new(input)?).parse()
    }

    fn parse_expr(input: &str) -> Ast {
        let mut parser = Parser::new(Lexer::new(input).unwrap());
        parser.parse_expression().unwrap()
    }

    fn num(value: i32) -> Box<Ast> {
        Box::new(Ast::Number { value })
    }

    fn var(name: &str) -> Box<Ast> {
        Box::new(Ast::Variable {
            name: name.to_owned(),
        })
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse_expr("1 + 2 * 3"),
            Ast::BinaryOp {
                operator: BinOp::Add,
                left: num(1),
                right: Box::new(Ast::BinaryOp {
                    operator: BinOp::Mul,
                    left: num(2),
                    right: num(3),
                }),
            }
        );
    }

    #[test]
    fn test_comparison_binds_looser_than_addition() {
        assert_eq!(
            parse_expr("a + 1 < b"),
            Ast::BinaryOp {
                operator: BinOp::LessThan,
                left: Box::new(Ast::BinaryOp {
                    operator: BinOp::Add,
                    left: var("a"),
                    right: num(1),
                }),
                right: var("b"),
            }
        );
    }

    #[test]
    fn test_additive_is_left_associative() {
        assert_eq!(
            parse_expr("1 - 2 - 3"),
            Ast::BinaryOp {
                operator: BinOp::Sub,
                left: Box::new(Ast::BinaryOp {
                    operator: BinOp::Sub,
                    left: num(1),
                    right: num(2),
                }),
                right: num(3),
            }
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(
            parse_expr("a = b = 1"),
            Ast::Assignment {
                operator: AssignOp::Plain,
                target: var("a"),
                value: Box::new(Ast::Assignment {
                    operator: AssignOp::Plain,
                    target: var("b"),
                    value: num(1),
                }),
            }
        );
    }

    #[test]
    fn test_prefix_increment_desugars_to_assignment() {
        assert_eq!(
            parse_expr("++i"),
            Ast::Assignment {
                operator: AssignOp::Plain,
                target: var("i"),
                value: Box::new(Ast::BinaryOp {
                    operator: BinOp::Add,
                    left: var("i"),
                    right: num(1),
                }),
            }
        );
    }

    #[test]
    fn test_logical_operators_nest() {
        assert_eq!(
            parse_expr("a || b && c"),
            Ast::BinaryOp {
                operator: BinOp::Or,
                left: var("a"),
                right: Box::new(Ast::BinaryOp {
                    operator: BinOp::And,
                    left: var("b"),
                    right: var("c"),
                }),
            }
        );
    }

    #[test]
    fn test_top_level_function_and_global() {
        let program = parse("int g = 42; int main() { return g; }").unwrap();

        let Ast::Program { globals, functions } = program else {
            panic!("expected a program node");
        };
        assert_eq!(globals.len(), 1);
        assert_eq!(functions.len(), 1);
        assert_eq!(
            globals[0],
            Ast::VarDecl {
                name: "g".to_owned(),
                is_array: false,
                size: None,
                init: Some(num(42)),
            }
        );
        let Ast::Function { name, returns, params, .. } = &functions[0] else {
            panic!("expected a function node");
        };
        assert_eq!(name, "main");
        assert_eq!(*returns, ReturnKind::Int);
        assert!(params.is_empty());
    }

    #[test]
    fn test_global_array() {
        let program = parse("int table[16];").unwrap();
        let Ast::Program { globals, .. } = program else {
            panic!("expected a program node");
        };
        assert_eq!(
            globals[0],
            Ast::VarDecl {
                name: "table".to_owned(),
                is_array: true,
                size: Some(16),
                init: None,
            }
        );
    }

    #[test]
    fn test_parameters_with_and_without_int() {
        let program = parse("int add(int a, b) { return a + b; }").unwrap();
        let Ast::Program { functions, .. } = program else {
            panic!("expected a program node");
        };
        let Ast::Function { params, .. } = &functions[0] else {
            panic!("expected a function node");
        };
        assert_eq!(params, &["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let program = parse("void f() { if (a) if (b) g(); else h(); }").unwrap();
        let Ast::Program { functions, .. } = program else {
            panic!("expected a program node");
        };
        let Ast::Function { body, .. } = &functions[0] else {
            panic!("expected a function node");
        };
        let Ast::Block { statements } = body.as_ref() else {
            panic!("expected a block body");
        };
        let Ast::IfStatement { else_branch: outer_else, then_branch, .. } = &statements[0] else {
            panic!("expected an if statement");
        };
        assert!(outer_else.is_none());
        let Ast::IfStatement { else_branch: inner_else, .. } = then_branch.as_ref() else {
            panic!("expected a nested if statement");
        };
        assert!(inner_else.is_some());
    }

    #[test]
    fn test_for_with_all_parts_absent() {
        let program = parse("void f() { for (;;) g(); }").unwrap();
        let Ast::Program { functions, .. } = program else {
            panic!("expected a program node");
        };
        let Ast::Function { body, .. } = &functions[0] else {
            panic!("expected a function node");
        };
        let Ast::Block { statements } = body.as_ref() else {
            panic!("expected a block body");
        };
        let Ast::ForStatement { init, condition, update, .. } = &statements[0] else {
            panic!("expected a for statement");
        };
        assert!(init.is_none());
        assert!(condition.is_none());
        assert!(update.is_none());
    }

    #[test]
    fn test_for_with_declaration_init() {
        let program = parse("void f() { for (int i = 0; i < 3; ++i) g(i); }").unwrap();
        assert!(matches!(program, Ast::Program { .. }));
    }

    #[test]
    fn test_pointer_declarator_is_rejected() {
        let result = parse("int main() { int x = 3; int *u; return 0; }");
        let err = result.unwrap_err();
        assert_eq!(err.position, Some((1, 29)));
        assert!(err.message.contains("expected `identifier`"));
    }

    #[test]
    fn test_missing_semicolon_is_rejected() {
        let result = parse("int main() { return 0 }");
        assert!(result.unwrap_err().message.contains("expected `;`"));
    }

    #[test]
    fn test_too_many_parameters_rejected() {
        let result = parse("int f(a, b, c, d, e, g, h) { return 0; }");
        assert!(result.unwrap_err().message.contains("too many parameters"));
    }
}
