//! Traversal and dispatch engine.
//!
//! Each node is classified by its [`NodeKind`] and planned by exactly one
//! rule. A plan is a list of [`Step`]s plus a [`Recursion`] signal: rules
//! that own recursion into their subtree say [`Recursion::Handled`], all
//! others get the default "visit every child in order" appended.
//!
//! Plans are executed on an explicit LIFO work stack, which yields the same
//! order as a recursive pre-order walk without consuming call stack.

use crate::ast::{Jump, Node, NodeKind, Span};
use crate::emit::{EmittedToken, TokenStream};
use crate::position::{PositionError, PositionMap};
use crate::token::TokenKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("cannot place token: {0}")]
    Position(#[from] PositionError),
}

/// Whether a rule already took care of the node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recursion {
    Handled,
    Default,
}

#[derive(Debug, Clone, Copy)]
enum Step<'n> {
    /// Emit at the start of an anchor, with the anchor's length.
    Emit(TokenKind, Span),
    /// Emit at the last byte of a node, with length 1.
    EmitEnd(TokenKind, Span),
    /// Dispatch a node through the rules.
    Visit(&'n Node),
    /// Dispatch each child of a node, in order.
    Children(&'n Node),
}

struct Plan<'n> {
    steps: Vec<Step<'n>>,
    recursion: Recursion,
}

impl<'n> Plan<'n> {
    fn default(steps: Vec<Step<'n>>) -> Self {
        Self {
            steps,
            recursion: Recursion::Default,
        }
    }

    fn handled(steps: Vec<Step<'n>>) -> Self {
        Self {
            steps,
            recursion: Recursion::Handled,
        }
    }

    /// Single marker at an anchor, then default recursion.
    fn mark(kind: TokenKind, anchor: Span) -> Self {
        Self::default(vec![Step::Emit(kind, anchor)])
    }

    /// BEGIN at the anchor, the subtree, END at the node's last byte.
    fn bracket(begin: TokenKind, end: TokenKind, anchor: Span, node: &'n Node) -> Self {
        Self::handled(vec![
            Step::Emit(begin, anchor),
            Step::Children(node),
            Step::EmitEnd(end, node.span),
        ])
    }
}

/// Walks one lowered tree and accumulates its structural tokens.
pub struct Engine<'m> {
    positions: &'m PositionMap,
    stream: TokenStream,
}

impl<'m> Engine<'m> {
    pub fn new(positions: &'m PositionMap) -> Self {
        Self {
            positions,
            stream: TokenStream::new(),
        }
    }

    /// Traverse the children of `root` and return every emitted token.
    pub fn run(mut self, root: &Node) -> Result<TokenStream, DispatchError> {
        let mut work = vec![Step::Children(root)];

        while let Some(step) = work.pop() {
            match step {
                Step::Emit(kind, anchor) => {
                    let at = self.positions.start(anchor)?;
                    self.stream.push(EmittedToken::new(kind, at, anchor.len()));
                }
                Step::EmitEnd(kind, span) => {
                    let end = self.positions.end(span)?;
                    let mut at = end;
                    at.column = end.column.saturating_sub(1);
                    self.stream.push(EmittedToken::new(kind, at, 1));
                }
                Step::Visit(node) => {
                    let plan = self.plan(node)?;
                    if plan.recursion == Recursion::Default {
                        work.push(Step::Children(node));
                    }
                    work.extend(plan.steps.into_iter().rev());
                }
                Step::Children(node) => {
                    work.extend(node.children.iter().rev().map(Step::Visit));
                }
            }
        }

        Ok(self.stream)
    }

    fn plan<'n>(&self, node: &'n Node) -> Result<Plan<'n>, DispatchError> {
        use TokenKind as T;

        let plan = match &node.kind {
            NodeKind::Loop { keyword } => Plan::bracket(T::FOR_BEGIN, T::FOR_END, *keyword, node),
            NodeKind::Jump { keyword, jump } => match jump {
                Jump::Break => Plan::mark(T::BREAK, *keyword),
                Jump::Continue => Plan::mark(T::CONTINUE, *keyword),
            },
            NodeKind::Class { keyword } => {
                Plan::bracket(T::CLASS_BEGIN, T::CLASS_END, *keyword, node)
            }
            NodeKind::Do { keyword } => Plan::bracket(T::DO_BEGIN, T::DO_END, *keyword, node),
            NodeKind::Function { keyword } => {
                Plan::bracket(T::FUNCTION_BEGIN, T::FUNCTION_END, *keyword, node)
            }
            NodeKind::StaticVariable { name } => Plan::mark(T::VARDEF, *name),
            NodeKind::If { keyword, else_ifs } => {
                // One END per `elseif` (each opened an IF_BEGIN) plus the
                // chain's own, all at the end of the whole statement.
                let mut steps = vec![Step::Emit(T::IF_BEGIN, *keyword), Step::Children(node)];
                steps.extend((0..=*else_ifs).map(|_| Step::EmitEnd(T::IF_END, node.span)));
                Plan::handled(steps)
            }
            NodeKind::Goto { keyword } => Plan::mark(T::GOTO, *keyword),
            NodeKind::Markup {
                start_tag,
                echo_shorthand,
            } => {
                if *echo_shorthand {
                    Plan::handled(vec![Step::Children(node)])
                } else {
                    let anchor = start_tag.unwrap_or(node.span);
                    if self.positions.start(anchor)?.is_file_start() {
                        Plan::default(Vec::new())
                    } else {
                        Plan::mark(T::ECHO, anchor)
                    }
                }
            }
            NodeKind::Interface { keyword } => {
                Plan::bracket(T::INTERFACE_BEGIN, T::INTERFACE_END, *keyword, node)
            }
            NodeKind::Namespace { keyword } => Plan::mark(T::NAMESPACE, *keyword),
            NodeKind::NamespaceUse { keyword } => Plan::mark(T::NAMESPACE_USE, *keyword),
            NodeKind::Return { keyword } => Plan::mark(T::RETURN, *keyword),
            NodeKind::Switch { keyword } => {
                Plan::bracket(T::SWITCH_BEGIN, T::SWITCH_END, *keyword, node)
            }
            NodeKind::Throw { keyword } => Plan::mark(T::THROW, *keyword),
            NodeKind::Trait { keyword } => {
                Plan::bracket(T::TRAIT_BEGIN, T::TRAIT_END, *keyword, node)
            }
            NodeKind::Try { keyword } => Plan::mark(T::TRY, *keyword),
            NodeKind::While { keyword } => {
                Plan::bracket(T::WHILE_BEGIN, T::WHILE_END, *keyword, node)
            }
            NodeKind::Else { keyword } => Plan::mark(T::ELSE, *keyword),
            // `elseif` is emitted as `else if`; the owning if closes it.
            NodeKind::ElseIf { keyword } => Plan::handled(vec![
                Step::Emit(T::ELSE, *keyword),
                Step::Emit(T::IF_BEGIN, *keyword),
                Step::Children(node),
            ]),
            NodeKind::Case { keyword } => Plan::mark(T::CASE, *keyword),
            NodeKind::Catch { keyword } => {
                Plan::bracket(T::CATCH_BEGIN, T::CATCH_END, *keyword, node)
            }
            NodeKind::Default { keyword } => Plan::mark(T::CASE, *keyword),
            NodeKind::ConstElement { name } => Plan::mark(T::VARDEF, *name),
            NodeKind::Finally { keyword } => Plan::mark(T::FINALLY, *keyword),
            NodeKind::PropertyDeclaration => Plan::handled(
                node.children
                    .iter()
                    .flat_map(|element| [Step::Emit(T::VARDEF, element.span), Step::Visit(element)])
                    .collect(),
            ),
            NodeKind::TraitUse { adaptations } => {
                let mut steps: Vec<Step<'n>> = node
                    .children
                    .iter()
                    .flat_map(|name| [Step::Emit(T::TRAIT_USE, name.span), Step::Visit(name)])
                    .collect();
                if let Some(list) = adaptations {
                    steps.push(Step::Children(list));
                }
                Plan::handled(steps)
            }
            NodeKind::Assignment {
                operator,
                destructuring,
            } => {
                if *destructuring {
                    Plan::default(Vec::new())
                } else {
                    Plan::mark(T::ASSIGN, *operator)
                }
            }
            NodeKind::Ternary { question } => Plan::mark(T::TERNARY, *question),
            NodeKind::ObjectCreation {
                keyword,
                anonymous_class,
            } => match anonymous_class {
                Some(class) => Plan::handled(vec![
                    Step::Emit(T::NEW_CLASS, *keyword),
                    Step::Emit(T::IN_CLASS_BEGIN, *class),
                    Step::Children(node),
                    Step::EmitEnd(T::IN_CLASS_END, node.span),
                ]),
                None => Plan::mark(T::NEW_CLASS, *keyword),
            },
            NodeKind::Array { opening } => Plan::mark(T::NEW_ARRAY, *opening),
            NodeKind::Call { callee } => Plan::mark(T::APPLY, *callee),
            NodeKind::Echo { keyword } => {
                // Echoed expressions are not traversed; only malformed
                // pieces (the only children kept) are.
                let mut steps = vec![Step::Emit(T::ECHO, keyword.unwrap_or(node.span))];
                steps.extend(node.children.iter().map(Step::Visit));
                Plan::handled(steps)
            }
            NodeKind::Print { keyword } => Plan::mark(T::ECHO, *keyword),
            NodeKind::Unset { keyword } => Plan::mark(T::UNSET, *keyword),
            NodeKind::PostfixUpdate { operator } => Plan::mark(T::ASSIGN, *operator),
            NodeKind::Isset { keyword } => Plan::mark(T::ISSET, *keyword),
            NodeKind::Intrinsic => Plan::mark(T::APPLY, node.span),
            NodeKind::Eval { keyword } => Plan::mark(T::EVAL, *keyword),
            NodeKind::List => Plan::handled(
                node.children
                    .iter()
                    .flat_map(|element| {
                        let nested = matches!(
                            element.kind,
                            NodeKind::ListElement { nested_list: true }
                        );
                        let assign = (!nested).then_some(Step::Emit(T::ASSIGN, element.span));
                        assign.into_iter().chain([Step::Visit(element)])
                    })
                    .collect(),
            ),
            NodeKind::Yield { keyword } => Plan::mark(T::YIELD, *keyword),
            NodeKind::ListElement { .. } | NodeKind::Error | NodeKind::Other { .. } => {
                Plan::default(Vec::new())
            }
        };

        Ok(plan)
    }
}

/// Run the engine over a lowered tree.
pub fn dispatch(root: &Node, positions: &PositionMap) -> Result<TokenStream, DispatchError> {
    Engine::new(positions).run(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn other(span: Span, children: Vec<Node>) -> Node {
        Node::new(NodeKind::Other { kind: "test" }, span, children)
    }

    fn run(source: &str, root: &Node) -> TokenStream {
        dispatch(root, &PositionMap::new(source)).unwrap()
    }

    #[test]
    fn bracket_emits_end_at_last_byte() {
        let source = "while(1){}";
        let node = Node::new(
            NodeKind::While {
                keyword: Span::new(0, 5),
            },
            Span::new(0, 10),
            Vec::new(),
        );
        let root = other(Span::new(0, 10), vec![node]);
        let stream = run(source, &root);

        assert_eq!(
            stream.as_slice(),
            &[
                EmittedToken::new(TokenKind::WHILE_BEGIN, Position { line: 1, column: 1 }, 5),
                EmittedToken::new(TokenKind::WHILE_END, Position { line: 1, column: 10 }, 1),
            ]
        );
    }

    #[test]
    fn default_rule_visits_children_in_order() {
        let source = "return;return;";
        let first = Node::leaf(
            NodeKind::Return {
                keyword: Span::new(0, 6),
            },
            Span::new(0, 7),
        );
        let second = Node::leaf(
            NodeKind::Return {
                keyword: Span::new(7, 13),
            },
            Span::new(7, 14),
        );
        let wrapper = other(Span::new(0, 14), vec![first, second]);
        let root = other(Span::new(0, 14), vec![wrapper]);
        let stream = run(source, &root);

        let columns: Vec<usize> = stream.iter().map(|t| t.column).collect();
        assert_eq!(columns, vec![1, 8]);
    }

    #[test]
    fn markup_at_file_start_is_suppressed() {
        let source = "<?php ?>x<?php ";
        let opening = Node::leaf(
            NodeKind::Markup {
                start_tag: Some(Span::new(0, 5)),
                echo_shorthand: false,
            },
            Span::new(0, 5),
        );
        let later = Node::leaf(
            NodeKind::Markup {
                start_tag: Some(Span::new(9, 14)),
                echo_shorthand: false,
            },
            Span::new(6, 14),
        );
        let root = other(Span::new(0, 15), vec![opening, later]);
        let stream = run(source, &root);

        assert_eq!(
            stream.as_slice(),
            &[EmittedToken::new(
                TokenKind::ECHO,
                Position { line: 1, column: 10 },
                5
            )]
        );
    }

    #[test]
    fn markup_without_tag_anchors_at_segment() {
        let source = "<?php ?>tail";
        let tail = Node::leaf(
            NodeKind::Markup {
                start_tag: None,
                echo_shorthand: false,
            },
            Span::new(6, 12),
        );
        let root = other(Span::new(0, 12), vec![tail]);
        let stream = run(source, &root);

        assert_eq!(stream.len(), 1);
        assert_eq!(stream.as_slice()[0].column, 7);
        assert_eq!(stream.as_slice()[0].length, 6);
    }

    #[test]
    fn echo_shorthand_descends_instead_of_marking() {
        let source = "x<?= $a ?>";
        let echo = Node::leaf(NodeKind::Echo { keyword: None }, Span::new(5, 7));
        let markup = Node::new(
            NodeKind::Markup {
                start_tag: Some(Span::new(1, 4)),
                echo_shorthand: true,
            },
            Span::new(0, 4),
            vec![echo],
        );
        let root = other(Span::new(0, 10), vec![markup]);
        let stream = run(source, &root);

        assert_eq!(
            stream.as_slice(),
            &[EmittedToken::new(
                TokenKind::ECHO,
                Position { line: 1, column: 6 },
                2
            )]
        );
    }

    #[test]
    fn property_declaration_marks_each_element() {
        let source = "public $a, $b = 1;";
        let a = Node::leaf(NodeKind::Other { kind: "property_element" }, Span::new(7, 9));
        let b = Node::leaf(NodeKind::Other { kind: "property_element" }, Span::new(11, 17));
        let decl = Node::new(NodeKind::PropertyDeclaration, Span::new(0, 18), vec![a, b]);
        let root = other(Span::new(0, 18), vec![decl]);
        let stream = run(source, &root);

        let lengths: Vec<(TokenKind, usize)> =
            stream.iter().map(|t| (t.kind, t.length)).collect();
        assert_eq!(
            lengths,
            vec![(TokenKind::VARDEF, 2), (TokenKind::VARDEF, 6)]
        );
    }

    #[test]
    fn list_skips_assign_for_nested_patterns() {
        let source = "[$a, [$b]] = $x;";
        let inner_b = Node::new(
            NodeKind::ListElement { nested_list: false },
            Span::new(6, 8),
            vec![Node::leaf(NodeKind::Other { kind: "variable_name" }, Span::new(6, 8))],
        );
        let inner = Node::new(NodeKind::List, Span::new(5, 9), vec![inner_b]);
        let a = Node::new(
            NodeKind::ListElement { nested_list: false },
            Span::new(1, 3),
            vec![Node::leaf(NodeKind::Other { kind: "variable_name" }, Span::new(1, 3))],
        );
        let nested = Node::new(
            NodeKind::ListElement { nested_list: true },
            Span::new(5, 9),
            vec![inner],
        );
        let outer = Node::new(NodeKind::List, Span::new(0, 10), vec![a, nested]);
        let assignment = Node::new(
            NodeKind::Assignment {
                operator: Span::new(11, 12),
                destructuring: true,
            },
            Span::new(0, 15),
            vec![outer],
        );
        let root = other(Span::new(0, 16), vec![assignment]);
        let stream = run(source, &root);

        let columns: Vec<usize> = stream.iter().map(|t| t.column).collect();
        assert_eq!(stream.kinds(), vec![TokenKind::ASSIGN, TokenKind::ASSIGN]);
        assert_eq!(columns, vec![2, 7]);
    }

    #[test]
    fn out_of_range_anchor_is_fatal() {
        let node = Node::leaf(
            NodeKind::Return {
                keyword: Span::new(50, 56),
            },
            Span::new(50, 57),
        );
        let root = other(Span::new(0, 3), vec![node]);
        let result = dispatch(&root, &PositionMap::new("abc"));
        assert!(matches!(result, Err(DispatchError::Position(_))));
    }

    #[test]
    fn deep_nesting_stays_iterative() {
        let depth = 100_000;
        let mut node = Node::leaf(
            NodeKind::Return {
                keyword: Span::new(0, 6),
            },
            Span::new(0, 7),
        );
        for _ in 0..depth {
            node = other(Span::new(0, 7), vec![node]);
        }
        let stream = run("return;", &node);
        assert_eq!(stream.kinds(), vec![TokenKind::RETURN]);
    }
}
