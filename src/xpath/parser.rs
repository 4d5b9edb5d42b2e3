//! Recursive descent parser producing the expression tree

use super::ast::{ArithOp, Axis, CompareOp, Expr, Function, LocationPath, NodeTest, Step};
use super::lexer::{tokenize, Spanned, Token};
use super::SyntaxError;

pub(crate) fn parse(input: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error(format!("unexpected {token:?}"))),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_name(&mut self, name: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(n)) if n == name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), SyntaxError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}")))
        }
    }

    fn error(&self, message: String) -> SyntaxError {
        let offset = self
            .tokens
            .get(self.pos)
            .map(|s| s.offset)
            .unwrap_or(self.end);
        SyntaxError { offset, message }
    }

    fn or_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.and_expr()?;
        while self.eat_name("or") {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.equality_expr()?;
        while self.eat_name("and") {
            let right = self.equality_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::NotEq) => CompareOp::NotEq,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.relational_expr()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn relational_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::Le) => CompareOp::Le,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::Ge) => CompareOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive_expr()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn additive_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative_expr()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Name(n)) if n == "div" => ArithOp::Div,
                Some(Token::Name(n)) if n == "mod" => ArithOp::Mod,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary_expr()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
    }

    fn unary_expr(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat(&Token::Minus) {
            let inner = self.unary_expr()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn path_expr(&mut self) -> Result<Expr, SyntaxError> {
        if !self.at_filter_start() {
            return self.location_path().map(Expr::Path);
        }

        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        let mut steps = Vec::new();
        if self.eat(&Token::Slash) {
            self.relative_path(&mut steps)?;
        } else if self.eat(&Token::DoubleSlash) {
            steps.push(Step::descendant_or_self());
            self.relative_path(&mut steps)?;
        }

        if predicates.is_empty() && steps.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter {
                primary: Box::new(primary),
                predicates,
                steps,
            })
        }
    }

    /// Literals, numbers, parentheses and function calls start a filter
    /// expression; anything else is a location path
    fn at_filter_start(&self) -> bool {
        match self.peek() {
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen) => true,
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen) && !is_node_type(name)
            }
            _ => false,
        }
    }

    fn primary_expr(&mut self) -> Result<Expr, SyntaxError> {
        match self.advance() {
            Some(Token::Literal(text)) => Ok(Expr::Literal(text)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                self.pos -= 1;
                let function = Function::from_name(&name)
                    .ok_or_else(|| self.error(format!("unknown function '{name}'")))?;
                self.pos += 1;
                self.expect(&Token::LParen)?;

                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.or_expr()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }

                let (min, max) = function.arity();
                if args.len() < min || max.is_some_and(|max| args.len() > max) {
                    return Err(self.error(format!(
                        "wrong number of arguments to '{name}': {}",
                        args.len()
                    )));
                }
                Ok(Expr::Call(function, args))
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error("expected an expression".to_string()))
            }
        }
    }

    fn location_path(&mut self) -> Result<LocationPath, SyntaxError> {
        let mut steps = Vec::new();
        if self.eat(&Token::Slash) {
            if self.at_step_start() {
                self.relative_path(&mut steps)?;
            }
            return Ok(LocationPath {
                absolute: true,
                steps,
            });
        }
        if self.eat(&Token::DoubleSlash) {
            steps.push(Step::descendant_or_self());
            self.relative_path(&mut steps)?;
            return Ok(LocationPath {
                absolute: true,
                steps,
            });
        }

        self.relative_path(&mut steps)?;
        Ok(LocationPath {
            absolute: false,
            steps,
        })
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn relative_path(&mut self, steps: &mut Vec<Step>) -> Result<(), SyntaxError> {
        steps.push(self.step()?);
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
                steps.push(self.step()?);
            } else {
                return Ok(());
            }
        }
    }

    fn step(&mut self) -> Result<Step, SyntaxError> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfNode,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::ColonColon)) =
            (self.peek(), self.peek_at(1))
        {
            let axis = Axis::from_name(name)
                .ok_or_else(|| self.error(format!("unknown axis '{name}'")))?;
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, SyntaxError> {
        match self.peek().cloned() {
            Some(Token::Star) => {
                self.pos += 1;
                Ok(NodeTest::Any)
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                if is_node_type(&name) && self.eat(&Token::LParen) {
                    self.expect(&Token::RParen)?;
                    return Ok(match name.as_str() {
                        "text" => NodeTest::Text,
                        "comment" => NodeTest::Comment,
                        _ => NodeTest::Node,
                    });
                }
                match name.strip_suffix(":*") {
                    Some(prefix) => Ok(NodeTest::Prefix(prefix.to_string())),
                    None => Ok(NodeTest::Name(name)),
                }
            }
            _ => Err(self.error("expected a node test".to_string())),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.or_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "node" | "text" | "comment")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step {
            axis: Axis::Child,
            test: NodeTest::Name(name.to_string()),
            predicates: Vec::new(),
        }
    }

    #[test]
    fn test_abbreviated_path() {
        let expr = parse("//ul/li").unwrap();
        assert_eq!(
            expr,
            Expr::Path(LocationPath {
                absolute: true,
                steps: vec![Step::descendant_or_self(), child("ul"), child("li")],
            })
        );
    }

    #[test]
    fn test_root_only() {
        assert_eq!(
            parse("/").unwrap(),
            Expr::Path(LocationPath {
                absolute: true,
                steps: Vec::new(),
            })
        );
    }

    #[test]
    fn test_attribute_and_predicate() {
        let expr = parse("a[@href][2]").unwrap();
        let Expr::Path(path) = expr else {
            panic!("expected a path");
        };
        assert_eq!(path.steps.len(), 1);
        assert_eq!(path.steps[0].predicates.len(), 2);
        assert_eq!(path.steps[0].predicates[1], Expr::Number(2.0));
    }

    #[test]
    fn test_operator_names_by_position() {
        // `div` is an element name at the start and an operator after an operand
        let expr = parse("div div div").unwrap();
        assert!(matches!(expr, Expr::Arith(ArithOp::Div, _, _)));

        let expr = parse("a and b or c").unwrap();
        assert!(matches!(expr, Expr::Or(_, _)));

        let expr = parse("* * 2").unwrap();
        assert!(matches!(expr, Expr::Arith(ArithOp::Mul, _, _)));
    }

    #[test]
    fn test_function_calls() {
        assert!(matches!(
            parse("count(//p)").unwrap(),
            Expr::Call(Function::Count, _)
        ));
        assert!(matches!(
            parse("concat('a', 'b', 'c')").unwrap(),
            Expr::Call(Function::Concat, ref args) if args.len() == 3
        ));
        assert!(matches!(
            parse("//p/text()").unwrap(),
            Expr::Path(ref p) if p.steps[2].test == NodeTest::Text
        ));
    }

    #[test]
    fn test_filter_with_path() {
        let expr = parse("(//section)[1]//h2").unwrap();
        assert!(matches!(expr, Expr::Filter { ref steps, .. } if steps.len() == 2));
    }

    #[test]
    fn test_errors() {
        for input in ["", "//", "a[", "a]", "foo(1)", "count()", "child::", "bogus::a", "1 +"] {
            assert!(parse(input).is_err(), "{input:?} should fail");
        }
    }
}
