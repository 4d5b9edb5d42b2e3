//! Expression evaluation over `Node` trees

use std::cell::OnceCell;
use std::collections::HashMap;

use ego_tree::NodeId;

use super::ast::{ArithOp, Axis, CompareOp, Expr, Function, LocationPath, NodeTest, Step};
use crate::dom::{Node, NodeKind};

/// A member of a node-set: a tree node or an attribute of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Item<'a> {
    Node(Node<'a>),
    Attr {
        owner: Node<'a>,
        index: usize,
        name: &'a str,
        value: &'a str,
    },
}

impl<'a> Item<'a> {
    fn string_value(&self) -> String {
        match self {
            Item::Node(node) => node.text_raw(),
            Item::Attr { value, .. } => value.to_string(),
        }
    }

    fn name(&self) -> Option<&'a str> {
        match self {
            Item::Node(node) => node.name(),
            Item::Attr { name, .. } => Some(name),
        }
    }

    fn owner(&self) -> Node<'a> {
        match self {
            Item::Node(node) => *node,
            Item::Attr { owner, .. } => *owner,
        }
    }
}

/// Result of evaluating an expression
#[derive(Debug, Clone)]
pub(crate) enum Value<'a> {
    Nodes(Vec<Item<'a>>),
    Str(String),
    Num(f64),
    Bool(bool),
}

impl<'a> Value<'a> {
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Nodes(items) => !items.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    pub fn to_num(&self) -> f64 {
        match self {
            Value::Nodes(_) => parse_number(&self.to_str()),
            Value::Str(s) => parse_number(s),
            Value::Num(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
        }
    }

    pub fn to_str(&self) -> String {
        match self {
            Value::Nodes(items) => items.first().map(Item::string_value).unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn into_items(self) -> Vec<Item<'a>> {
        match self {
            Value::Nodes(items) => items,
            _ => Vec::new(),
        }
    }
}

/// Numeric value of a string: optional `-`, digits with an optional
/// fraction, surrounding whitespace allowed; anything else is NaN
pub(crate) fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
        && digits != ".";
    if well_formed {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        // Integral values print without a fraction; -0 prints as 0
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

#[derive(Clone, Copy)]
struct Context<'a> {
    item: Item<'a>,
    position: usize,
    size: usize,
}

/// Evaluates one expression against one tree; caches document order
pub(crate) struct Evaluator<'a> {
    root: Node<'a>,
    ignore_case: bool,
    order: OnceCell<HashMap<NodeId, usize>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: Node<'a>) -> Self {
        Self {
            root: context.root(),
            ignore_case: context.is_html(),
            order: OnceCell::new(),
        }
    }

    pub fn evaluate(&self, expr: &Expr, node: Node<'a>) -> Value<'a> {
        let ctx = Context {
            item: Item::Node(node),
            position: 1,
            size: 1,
        };
        self.eval(expr, &ctx)
    }

    fn eval(&self, expr: &Expr, ctx: &Context<'a>) -> Value<'a> {
        match expr {
            Expr::Or(l, r) => Value::Bool(self.eval(l, ctx).to_bool() || self.eval(r, ctx).to_bool()),
            Expr::And(l, r) => {
                Value::Bool(self.eval(l, ctx).to_bool() && self.eval(r, ctx).to_bool())
            }
            Expr::Compare(op, l, r) => {
                Value::Bool(compare(*op, &self.eval(l, ctx), &self.eval(r, ctx)))
            }
            Expr::Arith(op, l, r) => {
                let (a, b) = (self.eval(l, ctx).to_num(), self.eval(r, ctx).to_num());
                Value::Num(match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div => a / b,
                    ArithOp::Mod => a % b,
                })
            }
            Expr::Negate(inner) => Value::Num(-self.eval(inner, ctx).to_num()),
            Expr::Union(l, r) => {
                let mut items = self.eval(l, ctx).into_items();
                items.extend(self.eval(r, ctx).into_items());
                Value::Nodes(self.document_order(items))
            }
            Expr::Literal(s) => Value::Str(s.clone()),
            Expr::Number(n) => Value::Num(*n),
            Expr::Call(function, args) => self.call(*function, args, ctx),
            Expr::Path(path) => Value::Nodes(self.location_path(path, ctx)),
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let value = self.eval(primary, ctx);
                if predicates.is_empty() && steps.is_empty() {
                    return value;
                }
                let Value::Nodes(mut items) = value else {
                    return Value::Nodes(Vec::new());
                };
                for predicate in predicates {
                    items = self.filter(items, predicate);
                }
                for step in steps {
                    items = self.step(&items, step);
                }
                Value::Nodes(items)
            }
        }
    }

    fn location_path(&self, path: &LocationPath, ctx: &Context<'a>) -> Vec<Item<'a>> {
        let mut items = if path.absolute {
            vec![Item::Node(self.root)]
        } else {
            vec![ctx.item]
        };
        for step in &path.steps {
            items = self.step(&items, step);
        }
        items
    }

    fn step(&self, input: &[Item<'a>], step: &Step) -> Vec<Item<'a>> {
        let mut out = Vec::new();
        for item in input {
            let mut matched: Vec<Item<'a>> = self
                .axis(*item, step.axis)
                .into_iter()
                .filter(|candidate| self.test(candidate, &step.test, step.axis))
                .collect();
            for predicate in &step.predicates {
                matched = self.filter(matched, predicate);
            }
            out.extend(matched);
        }
        self.document_order(out)
    }

    /// Keep the items for which the predicate holds; `items` are in the
    /// proximity order of the axis that produced them
    fn filter(&self, items: Vec<Item<'a>>, predicate: &Expr) -> Vec<Item<'a>> {
        let size = items.len();
        items
            .into_iter()
            .enumerate()
            .filter(|(idx, item)| {
                let ctx = Context {
                    item: *item,
                    position: idx + 1,
                    size,
                };
                match self.eval(predicate, &ctx) {
                    Value::Num(n) => n == (idx + 1) as f64,
                    other => other.to_bool(),
                }
            })
            .map(|(_, item)| item)
            .collect()
    }

    /// Items along `axis` in proximity order
    fn axis(&self, item: Item<'a>, axis: Axis) -> Vec<Item<'a>> {
        let node = match item {
            Item::Node(node) => node,
            Item::Attr { owner, .. } => {
                return match axis {
                    Axis::SelfNode => vec![item],
                    Axis::Parent => vec![Item::Node(owner)],
                    Axis::Ancestor | Axis::AncestorOrSelf => {
                        let mut out = Vec::new();
                        if axis == Axis::AncestorOrSelf {
                            out.push(item);
                        }
                        out.push(Item::Node(owner));
                        out.extend(owner.ancestors().map(Item::Node));
                        out
                    }
                    _ => Vec::new(),
                };
            }
        };

        match axis {
            Axis::Child => node.children().map(Item::Node).collect(),
            Axis::Descendant => node.descendants().skip(1).map(Item::Node).collect(),
            Axis::DescendantOrSelf => node.descendants().map(Item::Node).collect(),
            Axis::SelfNode => vec![item],
            Axis::Parent => node.parent().map(Item::Node).into_iter().collect(),
            Axis::Ancestor => node.ancestors().map(Item::Node).collect(),
            Axis::AncestorOrSelf => std::iter::once(node)
                .chain(node.ancestors())
                .map(Item::Node)
                .collect(),
            Axis::FollowingSibling => std::iter::successors(node.next_sibling(), |n| n.next_sibling())
                .map(Item::Node)
                .collect(),
            Axis::PrecedingSibling => std::iter::successors(node.prev_sibling(), |n| n.prev_sibling())
                .map(Item::Node)
                .collect(),
            Axis::Following => {
                let mut out = Vec::new();
                let mut current = Some(node);
                while let Some(n) = current {
                    for sibling in std::iter::successors(n.next_sibling(), |s| s.next_sibling()) {
                        out.extend(sibling.descendants().map(Item::Node));
                    }
                    current = n.parent();
                }
                out
            }
            Axis::Preceding => {
                let ancestors: Vec<Node<'a>> = node.ancestors().collect();
                let position = self.position(node);
                let mut out: Vec<Item<'a>> = self
                    .root
                    .descendants()
                    .filter(|n| self.position(*n) < position && !ancestors.contains(n))
                    .map(Item::Node)
                    .collect();
                out.reverse();
                out
            }
            Axis::Attribute => node
                .attributes()
                .into_iter()
                .enumerate()
                .map(|(index, (name, value))| Item::Attr {
                    owner: node,
                    index,
                    name,
                    value,
                })
                .collect(),
        }
    }

    fn test(&self, item: &Item<'a>, test: &NodeTest, axis: Axis) -> bool {
        let principal = match (item, axis) {
            (Item::Attr { .. }, Axis::Attribute) => true,
            (Item::Attr { .. }, _) => false,
            (Item::Node(node), _) => node.kind() == NodeKind::Element,
        };
        match test {
            NodeTest::Node => true,
            NodeTest::Text => matches!(item, Item::Node(n) if n.kind() == NodeKind::Text),
            NodeTest::Comment => matches!(item, Item::Node(n) if n.kind() == NodeKind::Comment),
            NodeTest::Any => principal,
            NodeTest::Name(expected) => {
                principal && item.name().is_some_and(|name| self.name_matches(name, expected))
            }
            NodeTest::Prefix(prefix) => {
                principal
                    && item
                        .name()
                        .and_then(|name| name.split_once(':'))
                        .is_some_and(|(p, _)| self.name_matches(p, prefix))
            }
        }
    }

    fn name_matches(&self, actual: &str, expected: &str) -> bool {
        if self.ignore_case {
            actual.eq_ignore_ascii_case(expected)
        } else {
            actual == expected
        }
    }

    fn call(&self, function: Function, args: &[Expr], ctx: &Context<'a>) -> Value<'a> {
        let arg = |idx: usize| self.eval(&args[idx], ctx);
        let string_arg = |idx: usize| match args.get(idx) {
            Some(expr) => self.eval(expr, ctx).to_str(),
            None => ctx.item.string_value(),
        };
        let first_item = || match args.first() {
            Some(expr) => {
                let items = self.document_order(self.eval(expr, ctx).into_items());
                items.first().copied()
            }
            None => Some(ctx.item),
        };

        match function {
            Function::Last => Value::Num(ctx.size as f64),
            Function::Position => Value::Num(ctx.position as f64),
            Function::Count => Value::Num(arg(0).into_items().len() as f64),
            Function::Name => Value::Str(
                first_item()
                    .and_then(|item| item.name())
                    .unwrap_or_default()
                    .to_string(),
            ),
            Function::LocalName => Value::Str(
                first_item()
                    .and_then(|item| item.name())
                    .map(|name| name.rsplit_once(':').map_or(name, |(_, local)| local))
                    .unwrap_or_default()
                    .to_string(),
            ),
            Function::String => Value::Str(string_arg(0)),
            Function::Concat => Value::Str(args.iter().map(|a| self.eval(a, ctx).to_str()).collect()),
            Function::StartsWith => Value::Bool(string_arg(0).starts_with(&string_arg(1))),
            Function::EndsWith => Value::Bool(string_arg(0).ends_with(&string_arg(1))),
            Function::Contains => Value::Bool(string_arg(0).contains(&string_arg(1))),
            Function::SubstringBefore => {
                let (haystack, needle) = (string_arg(0), string_arg(1));
                Value::Str(
                    haystack
                        .find(&needle)
                        .map(|idx| haystack[..idx].to_string())
                        .unwrap_or_default(),
                )
            }
            Function::SubstringAfter => {
                let (haystack, needle) = (string_arg(0), string_arg(1));
                Value::Str(
                    haystack
                        .find(&needle)
                        .map(|idx| haystack[idx + needle.len()..].to_string())
                        .unwrap_or_default(),
                )
            }
            Function::Substring => {
                let source = string_arg(0);
                let start = round(arg(1).to_num());
                let end = match args.get(2) {
                    Some(len) => start + round(self.eval(len, ctx).to_num()),
                    None => f64::INFINITY,
                };
                Value::Str(
                    source
                        .chars()
                        .enumerate()
                        .filter(|(idx, _)| {
                            let position = (*idx + 1) as f64;
                            position >= start && position < end
                        })
                        .map(|(_, c)| c)
                        .collect(),
                )
            }
            Function::StringLength => Value::Num(string_arg(0).chars().count() as f64),
            Function::NormalizeSpace => {
                Value::Str(string_arg(0).split_whitespace().collect::<Vec<_>>().join(" "))
            }
            Function::Translate => {
                let source = string_arg(0);
                let from: Vec<char> = string_arg(1).chars().collect();
                let to: Vec<char> = string_arg(2).chars().collect();
                Value::Str(
                    source
                        .chars()
                        .filter_map(|c| match from.iter().position(|f| *f == c) {
                            Some(idx) => to.get(idx).copied(),
                            None => Some(c),
                        })
                        .collect(),
                )
            }
            Function::Boolean => Value::Bool(arg(0).to_bool()),
            Function::Not => Value::Bool(!arg(0).to_bool()),
            Function::True => Value::Bool(true),
            Function::False => Value::Bool(false),
            Function::Number => Value::Num(match args.first() {
                Some(expr) => self.eval(expr, ctx).to_num(),
                None => parse_number(&ctx.item.string_value()),
            }),
            Function::Sum => Value::Num(
                arg(0)
                    .into_items()
                    .iter()
                    .map(|item| parse_number(&item.string_value()))
                    .sum(),
            ),
            Function::Floor => Value::Num(arg(0).to_num().floor()),
            Function::Ceiling => Value::Num(arg(0).to_num().ceil()),
            Function::Round => Value::Num(round(arg(0).to_num())),
        }
    }

    /// Sort into document order and drop duplicates
    fn document_order(&self, mut items: Vec<Item<'a>>) -> Vec<Item<'a>> {
        if items.len() < 2 {
            return items;
        }
        items.sort_by_key(|item| self.sort_key(item));
        items.dedup_by_key(|item| self.sort_key(item));
        items
    }

    fn sort_key(&self, item: &Item<'a>) -> (usize, usize) {
        let position = self.position(item.owner());
        match item {
            Item::Node(_) => (position, 0),
            Item::Attr { index, .. } => (position, index + 1),
        }
    }

    fn position(&self, node: Node<'a>) -> usize {
        let order = self.order.get_or_init(|| {
            self.root
                .descendants()
                .enumerate()
                .map(|(idx, n)| (n.id(), idx))
                .collect()
        });
        order.get(&node.id()).copied().unwrap_or(usize::MAX)
    }
}

/// XPath rounding: halves go towards positive infinity
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

fn compare(op: CompareOp, left: &Value<'_>, right: &Value<'_>) -> bool {
    match (left, right) {
        (Value::Nodes(a), Value::Nodes(b)) => {
            let right_strings: Vec<String> = b.iter().map(Item::string_value).collect();
            a.iter().any(|x| {
                let x = Value::Str(x.string_value());
                right_strings
                    .iter()
                    .any(|y| compare_scalars(op, &x, &Value::Str(y.clone())))
            })
        }
        (Value::Nodes(a), Value::Bool(_)) => compare_scalars(op, &Value::Bool(!a.is_empty()), right),
        (Value::Bool(_), Value::Nodes(b)) => compare_scalars(op, left, &Value::Bool(!b.is_empty())),
        (Value::Nodes(a), _) => a
            .iter()
            .any(|x| compare_scalars(op, &Value::Str(x.string_value()), right)),
        (_, Value::Nodes(b)) => b
            .iter()
            .any(|y| compare_scalars(op, left, &Value::Str(y.string_value()))),
        _ => compare_scalars(op, left, right),
    }
}

fn compare_scalars(op: CompareOp, left: &Value<'_>, right: &Value<'_>) -> bool {
    match op {
        CompareOp::Eq | CompareOp::NotEq => {
            let equal = match (left, right) {
                (Value::Bool(_), _) | (_, Value::Bool(_)) => left.to_bool() == right.to_bool(),
                (Value::Num(_), _) | (_, Value::Num(_)) => left.to_num() == right.to_num(),
                _ => left.to_str() == right.to_str(),
            };
            equal == (op == CompareOp::Eq)
        }
        CompareOp::Lt => left.to_num() < right.to_num(),
        CompareOp::Le => left.to_num() <= right.to_num(),
        CompareOp::Gt => left.to_num() > right.to_num(),
        CompareOp::Ge => left.to_num() >= right.to_num(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 42 "), 42.0);
        assert_eq!(parse_number("-1.5"), -1.5);
        assert_eq!(parse_number(".5"), 0.5);
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("abc").is_nan());
        assert!(parse_number("").is_nan());
        assert!(parse_number(".").is_nan());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_round() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(1.4), 1.0);
    }

    #[test]
    fn test_scalar_comparison() {
        assert!(compare_scalars(CompareOp::Eq, &Value::Str("1".into()), &Value::Num(1.0)));
        assert!(compare_scalars(CompareOp::Eq, &Value::Str("x".into()), &Value::Bool(true)));
        assert!(compare_scalars(CompareOp::Lt, &Value::Str("2".into()), &Value::Str("10".into())));
        assert!(compare_scalars(CompareOp::NotEq, &Value::Str("a".into()), &Value::Str("b".into())));
    }
}
