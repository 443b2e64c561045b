//! A minimal recursive-descent parser for a practical Rego subset:
//! packages, imports, default/complete/function/set/object rules,
//! `:=`/`=` literals, dot/bracket references, `some x in` enumeration,
//! array/set/object comprehensions, `not`, `with` overrides, built-in
//! calls, and arithmetic/comparison infix expressions.
//!
//! Out of scope per spec.md §1 ("the surface-syntax parser... treated
//! as an external collaborator"); this module exists only because the
//! interpreter facade's `addModule`/`rawQuery` operations need *some*
//! way to get from source text to the tree the pipeline consumes, and
//! nothing in the retrieval pack ships a Rego front-end. Grounded on the
//! teacher's own lexer/recursive-descent split (`parser/lexer.rs` +
//! `parser/mod.rs`), using `logos` rather than the teacher's hand-rolled
//! tokenizer for the lexer half, since `logos` is already the teacher's
//! chosen lexing crate.

pub mod lexer;

use crate::error::{ErrorCode, RegoError};
use crate::term::Term;
use crate::tree::{Kind, Node};
use lexer::{get_spanned_tokens_from_source, SpannedToken, Token};

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

type PResult<T> = Result<T, RegoError>;

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).map(|t| t.token.clone());
        self.pos += 1;
        t
    }

    fn expect(&mut self, expected: &Token) -> PResult<()> {
        match self.bump() {
            Some(ref t) if t == expected => Ok(()),
            other => Err(parse_error(format!("expected {expected:?}, found {other:?}"))),
        }
    }

    fn ident(&mut self) -> PResult<String> {
        match self.bump() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(parse_error(format!("expected identifier, found {other:?}"))),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Parses a dotted path (`data.xs.foo`) into one `.`-joined name.
    fn dotted_path(&mut self) -> PResult<String> {
        let mut parts = vec![self.ident()?];
        while self.eat(&Token::Dot) {
            parts.push(self.ident()?);
        }
        Ok(parts.join("."))
    }

    // -- top level ---------------------------------------------------

    pub fn parse_module(src: &str) -> PResult<Node> {
        let (tokens, lex_errors) = get_spanned_tokens_from_source(src);
        if let Some(e) = lex_errors.into_iter().next() {
            return Err(parse_error(e));
        }
        let mut parser = Parser::new(tokens);
        parser.module()
    }

    pub fn parse_query(src: &str) -> PResult<Node> {
        let (tokens, lex_errors) = get_spanned_tokens_from_source(src);
        if let Some(e) = lex_errors.into_iter().next() {
            return Err(parse_error(e));
        }
        let mut parser = Parser::new(tokens);
        let mut literals = vec![parser.literal()?];
        while parser.eat(&Token::Semi) {
            literals.push(parser.literal()?);
        }
        Ok(Node::with_children(Kind::Query, literals))
    }

    fn module(&mut self) -> PResult<Node> {
        self.expect(&Token::Package)?;
        let pkg = self.dotted_path()?;
        let package = Node::with_children(Kind::Package, vec![Node::var(pkg)]);

        let mut imports = vec![];
        while self.peek() == Some(&Token::Import) {
            self.bump();
            let path = self.dotted_path()?;
            let mut children = vec![Node::var(path)];
            if self.eat(&Token::As) {
                children.push(Node::var(self.ident()?));
            }
            imports.push(Node::with_children(Kind::Import, children));
        }

        let mut rules = vec![];
        while self.peek().is_some() {
            rules.push(self.rule()?);
        }

        let mut policy_children = imports;
        policy_children.extend(rules);
        let policy = Node::with_children(Kind::Policy, policy_children);
        Ok(Node::with_children(Kind::Module, vec![package, policy]))
    }

    // -- rules --------------------------------------------------------

    fn rule(&mut self) -> PResult<Node> {
        if self.eat(&Token::Default) {
            let name = self.ident()?;
            self.expect(&Token::Unify)?;
            let value = self.expr()?;
            return Ok(Node::with_children(
                Kind::DefaultRule,
                vec![Node::var(name), Node::with_children(Kind::Expr, vec![value])],
            ));
        }

        let name = self.ident()?;

        if self.eat(&Token::LParen) {
            let mut args = vec![];
            if self.peek() != Some(&Token::RParen) {
                args.push(Node::var(self.ident()?));
                while self.eat(&Token::Comma) {
                    args.push(Node::var(self.ident()?));
                }
            }
            self.expect(&Token::RParen)?;
            let args_node = Node::with_children(Kind::RuleArgs, args);
            self.expect(&Token::Unify)?;
            let value = self.expr()?;
            let body = self.optional_brace_body()?;
            return Ok(Node::with_children(
                Kind::RuleFunc,
                vec![Node::var(name), args_node, Node::with_children(Kind::Expr, vec![value]), body],
            ));
        }

        if self.eat(&Token::LBracket) {
            let key_or_elem = self.expr()?;
            self.expect(&Token::RBracket)?;
            if self.eat(&Token::Unify) {
                let value = self.expr()?;
                let body = self.brace_body()?;
                return Ok(Node::with_children(
                    Kind::RuleObj,
                    vec![Node::var(name), key_or_elem, value, body],
                ));
            }
            let body = self.brace_body()?;
            return Ok(Node::with_children(Kind::RuleSet, vec![Node::var(name), key_or_elem, body]));
        }

        if self.eat(&Token::Unify) {
            let value = self.expr()?;
            let body = self.optional_brace_body()?;
            return Ok(Node::with_children(
                Kind::RuleComp,
                vec![Node::var(name), Node::with_children(Kind::Expr, vec![value]), body],
            ));
        }

        // bare boolean complete rule: `allow { ... }`
        let body = self.brace_body()?;
        Ok(Node::with_children(
            Kind::RuleComp,
            vec![Node::var(name), Node::with_children(Kind::Expr, vec![Node::term(Term::bool(true))]), body],
        ))
    }

    fn optional_brace_body(&mut self) -> PResult<Node> {
        if self.peek() == Some(&Token::LBrace) {
            self.brace_body()
        } else {
            Ok(Node::new(Kind::UnifyBody))
        }
    }

    fn brace_body(&mut self) -> PResult<Node> {
        self.expect(&Token::LBrace)?;
        let mut literals = vec![];
        if self.peek() != Some(&Token::RBrace) {
            literals.push(self.literal()?);
            while self.eat(&Token::Semi) {
                if self.peek() == Some(&Token::RBrace) {
                    break;
                }
                literals.push(self.literal()?);
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(Node::with_children(Kind::UnifyBody, literals))
    }

    // -- statements -----------------------------------------------------

    fn literal(&mut self) -> PResult<Node> {
        if self.eat(&Token::Not) {
            let inner = self.literal()?;
            return Ok(Node::with_children(
                Kind::LiteralNot,
                vec![Node::with_children(Kind::UnifyBody, vec![inner])],
            ));
        }
        if self.eat(&Token::Some) {
            let var = self.ident()?;
            self.expect(&Token::In)?;
            let seq = self.expr()?;
            return Ok(Node::with_children(
                Kind::Literal,
                vec![Node::with_children(
                    Kind::Membership,
                    vec![Node::var(var), Node::with_children(Kind::Expr, vec![seq])],
                )],
            ));
        }

        // assignment / unify / naked expr
        if matches!(self.peek(), Some(Token::Ident(_))) {
            let checkpoint = self.pos;
            if let Ok(name) = self.ident() {
                if self.eat(&Token::Assign) {
                    let rhs = self.expr()?;
                    let assign = Node::with_children(
                        Kind::AssignInfix,
                        vec![
                            Node::with_children(Kind::AssignArg, vec![Node::var(name)]),
                            Node::with_children(Kind::AssignArg, vec![rhs]),
                        ],
                    );
                    let mut literal = Node::with_children(Kind::Literal, vec![Node::with_children(Kind::Expr, vec![assign])]);
                    literal = self.maybe_with(literal)?;
                    return Ok(literal);
                }
            }
            self.pos = checkpoint;
        }

        let expr = self.expr()?;
        let mut literal = Node::with_children(Kind::Literal, vec![Node::with_children(Kind::Expr, vec![expr])]);
        literal = self.maybe_with(literal)?;
        Ok(literal)
    }

    fn maybe_with(&mut self, literal: Node) -> PResult<Node> {
        if !self.eat(&Token::With) {
            return Ok(literal);
        }
        let mut overrides = vec![];
        loop {
            let path = self.dotted_path()?;
            self.expect(&Token::As)?;
            let value = self.expr()?;
            overrides.push(Node::with_children(
                Kind::With,
                vec![Node::var(path), Node::with_children(Kind::Expr, vec![value])],
            ));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let withseq = Node::with_children(Kind::WithSeq, overrides);
        Ok(Node::with_children(
            Kind::LiteralWith,
            vec![Node::with_children(Kind::UnifyBody, vec![literal]), withseq],
        ))
    }

    // -- expressions (precedence climbing) -----------------------------

    fn expr(&mut self) -> PResult<Node> {
        self.comparison()
    }

    fn comparison(&mut self) -> PResult<Node> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(Kind::OpEquals),
            Some(Token::Neq) => Some(Kind::OpNotEquals),
            Some(Token::Lt) => Some(Kind::OpLessThan),
            Some(Token::Le) => Some(Kind::OpLessThanOrEquals),
            Some(Token::Gt) => Some(Kind::OpGreaterThan),
            Some(Token::Ge) => Some(Kind::OpGreaterThanOrEquals),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(lhs);
        };
        self.bump();
        let rhs = self.additive()?;
        Ok(Node::with_children(
            Kind::BoolInfix,
            vec![Node::new(op), Node::with_children(Kind::Expr, vec![lhs]), Node::with_children(Kind::Expr, vec![rhs])],
        ))
    }

    fn additive(&mut self) -> PResult<Node> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => Kind::OpAdd,
                Some(Token::Minus) => Kind::OpSubtract,
                _ => break,
            };
            self.bump();
            let rhs = self.multiplicative()?;
            lhs = Node::with_children(
                Kind::ArithInfix,
                vec![Node::new(op), Node::with_children(Kind::Expr, vec![lhs]), Node::with_children(Kind::Expr, vec![rhs])],
            );
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> PResult<Node> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Kind::OpMultiply,
                Some(Token::Slash) => Kind::OpDivide,
                Some(Token::Percent) => Kind::OpModulo,
                _ => break,
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = Node::with_children(
                Kind::ArithInfix,
                vec![Node::new(op), Node::with_children(Kind::Expr, vec![lhs]), Node::with_children(Kind::Expr, vec![rhs])],
            );
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> PResult<Node> {
        if self.eat(&Token::Minus) {
            let inner = self.unary()?;
            return Ok(Node::with_children(Kind::UnaryExpr, vec![Node::new(Kind::OpSubtract), inner]));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> PResult<Node> {
        let mut base = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.bump();
                    let field = self.ident()?;
                    base = Node::with_children(
                        Kind::Ref,
                        vec![base, Node::with_children(Kind::RefArgDot, vec![Node::var(field)])],
                    );
                }
                Some(Token::LBracket) => {
                    self.bump();
                    let index = if self.peek() == Some(&Token::Ident("_".to_string())) {
                        self.bump();
                        Node::var("_")
                    } else {
                        self.expr()?
                    };
                    self.expect(&Token::RBracket)?;
                    base = Node::with_children(
                        Kind::Ref,
                        vec![base, Node::with_children(Kind::RefArgBrack, vec![Node::with_children(Kind::Expr, vec![index])])],
                    );
                }
                Some(Token::LParen) => {
                    self.bump();
                    let mut args = vec![base];
                    if self.peek() != Some(&Token::RParen) {
                        args.push(self.expr()?);
                        while self.eat(&Token::Comma) {
                            args.push(self.expr()?);
                        }
                    }
                    self.expect(&Token::RParen)?;
                    base = Node::with_children(Kind::ExprCall, args);
                }
                _ => break,
            }
        }
        Ok(base)
    }

    fn primary(&mut self) -> PResult<Node> {
        match self.bump() {
            Some(Token::Number(text)) => Ok(Node::term(parse_number(&text)?)),
            Some(Token::Str(text)) => Ok(Node::term(Term::str(unescape(&text)))),
            Some(Token::True) => Ok(Node::term(Term::bool(true))),
            Some(Token::False) => Ok(Node::term(Term::bool(false))),
            Some(Token::Null) => Ok(Node::term(Term::null())),
            Some(Token::Ident(name)) => Ok(Node::var(name)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => self.array_or_compr(),
            Some(Token::LBrace) => self.object_or_set(),
            other => Err(parse_error(format!("unexpected token in expression: {other:?}"))),
        }
    }

    fn array_or_compr(&mut self) -> PResult<Node> {
        if self.peek() == Some(&Token::RBracket) {
            self.bump();
            return Ok(Node::with_children(Kind::Array, vec![]));
        }
        let first = self.expr()?;
        if self.eat(&Token::Pipe) {
            let mut literals = vec![self.literal()?];
            while self.eat(&Token::Semi) {
                literals.push(self.literal()?);
            }
            self.expect(&Token::RBracket)?;
            let body = Node::with_children(Kind::UnifyBody, literals);
            return Ok(Node::with_children(
                Kind::ArrayCompr,
                vec![Node::with_children(Kind::Expr, vec![first]), body],
            ));
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if self.peek() == Some(&Token::RBracket) {
                break;
            }
            items.push(self.expr()?);
        }
        self.expect(&Token::RBracket)?;
        Ok(Node::with_children(Kind::Array, items))
    }

    fn object_or_set(&mut self) -> PResult<Node> {
        if self.peek() == Some(&Token::RBrace) {
            self.bump();
            return Ok(Node::with_children(Kind::Object, vec![]));
        }
        let first = self.expr()?;
        if self.eat(&Token::Colon) {
            let val = self.expr()?;
            let mut items = vec![Node::with_children(Kind::ObjectItem, vec![first, val])];
            while self.eat(&Token::Comma) {
                if self.peek() == Some(&Token::RBrace) {
                    break;
                }
                let k = self.expr()?;
                self.expect(&Token::Colon)?;
                let v = self.expr()?;
                items.push(Node::with_children(Kind::ObjectItem, vec![k, v]));
            }
            self.expect(&Token::RBrace)?;
            return Ok(Node::with_children(Kind::Object, items));
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if self.peek() == Some(&Token::RBrace) {
                break;
            }
            items.push(self.expr()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(Node::with_children(Kind::Set, items))
    }
}

fn parse_error(message: impl Into<String>) -> RegoError {
    RegoError::new(message, ErrorCode::RegoParseError)
}

fn parse_number(text: &str) -> PResult<Term> {
    if text.contains('.') || text.contains(['e', 'E']) {
        text.parse::<f64>()
            .map_err(|e| parse_error(format!("invalid number literal {text:?}: {e}")))
            .and_then(|f| Term::float(f).map_err(|e| parse_error(e.to_string())))
    } else {
        crate::bigint::BigInt::from_str_radix(text, 10)
            .map(Term::int)
            .map_err(|e| parse_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_complete_rule_with_default() {
        let module = Parser::parse_module("package p\ndefault allow = false\nallow { input.role == \"admin\" }").unwrap();
        assert_eq!(module.kind, Kind::Module);
        let policy = module.find(Kind::Policy).unwrap();
        assert_eq!(policy.children.len(), 2);
    }

    #[test]
    fn parses_function_rule() {
        let module = Parser::parse_module("package p\nf(x) = y { y := x * 2 }").unwrap();
        let policy = module.find(Kind::Policy).unwrap();
        assert_eq!(policy.children[0].kind, Kind::RuleFunc);
    }

    #[test]
    fn parses_query_with_enumeration() {
        let query = Parser::parse_query("some i; x := data.xs[i]").unwrap();
        assert_eq!(query.kind, Kind::Query);
        assert_eq!(query.children.len(), 2);
    }
}
