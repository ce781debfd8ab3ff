//! Lowering from the tree-sitter CST to the typed [`Node`] tree.
//!
//! Anchor tokens are resolved to byte spans here, so the dispatch engine
//! never touches tree-sitter. The walk uses an explicit frame stack; nesting
//! depth of the analyzed source does not consume call stack.

use crate::ast::{Jump, Node, NodeKind, Span};
use crate::ts::errors::TreeSitterError;
use crate::ts::parser::ParsedSource;
use tree_sitter::Node as TsNode;

/// Lower a parsed file. The root is the `program` node.
pub fn lower(parsed: &ParsedSource<'_>) -> Result<Node, TreeSitterError> {
    Lowerer {
        source: parsed.source,
    }
    .run(parsed.root_node())
}

/// Work item: a CST node to classify, or a node synthesized from several
/// CST pieces (markup segments, destructuring slots, `<?=` echoes).
enum Job<'t> {
    Lower(TsNode<'t>),
    Synthetic {
        kind: NodeKind,
        span: Span,
        jobs: Vec<Job<'t>>,
    },
}

struct Frame<'t> {
    kind: NodeKind,
    span: Span,
    /// Remaining child jobs, last job first.
    jobs: Vec<Job<'t>>,
    children: Vec<Node>,
    /// The last child is a trait adaptation list to move into the kind.
    adaptations: bool,
}

impl<'t> Frame<'t> {
    fn new(kind: NodeKind, span: Span, mut jobs: Vec<Job<'t>>) -> Self {
        jobs.reverse();
        Self {
            kind,
            span,
            children: Vec::with_capacity(jobs.len()),
            jobs,
            adaptations: false,
        }
    }

    fn finish(mut self) -> Node {
        if self.adaptations {
            if let NodeKind::TraitUse { adaptations } = &mut self.kind {
                *adaptations = self.children.pop().map(Box::new);
            }
        }
        Node::new(self.kind, self.span, self.children)
    }
}

struct Lowerer<'a> {
    source: &'a str,
}

impl<'a> Lowerer<'a> {
    fn run<'t>(&self, root: TsNode<'t>) -> Result<Node, TreeSitterError> {
        let mut stack = vec![self.classify(root)?];

        loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.jobs.pop(),
                None => return Err(TreeSitterError::ParseFailed),
            };

            match next {
                Some(Job::Lower(node)) => stack.push(self.classify(node)?),
                Some(Job::Synthetic { kind, span, jobs }) => {
                    stack.push(Frame::new(kind, span, jobs))
                }
                None => {
                    let node = match stack.pop() {
                        Some(frame) => frame.finish(),
                        None => return Err(TreeSitterError::ParseFailed),
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
            }
        }
    }

    fn text(&self, span: Span) -> &'a str {
        self.source.get(span.start..span.end).unwrap_or("")
    }

    /// Decide the node kind and which children to lower.
    fn classify<'t>(&self, node: TsNode<'t>) -> Result<Frame<'t>, TreeSitterError> {
        let span = Span::from(node.range());
        let default = |kind: NodeKind| -> Result<Frame<'t>, TreeSitterError> {
            Ok(Frame::new(kind, span, self.child_jobs(node)))
        };

        if node.is_error() {
            return default(NodeKind::Error);
        }

        match node.kind() {
            "for_statement" => default(NodeKind::Loop {
                keyword: require(node, "for")?,
            }),
            "foreach_statement" => default(NodeKind::Loop {
                keyword: require(node, "foreach")?,
            }),
            "break_statement" => default(NodeKind::Jump {
                keyword: require(node, "break")?,
                jump: Jump::Break,
            }),
            "continue_statement" => default(NodeKind::Jump {
                keyword: require(node, "continue")?,
                jump: Jump::Continue,
            }),
            "class_declaration" => default(NodeKind::Class {
                keyword: require(node, "class")?,
            }),
            "do_statement" => default(NodeKind::Do {
                keyword: require(node, "do")?,
            }),
            "function_definition"
            | "method_declaration"
            | "anonymous_function"
            | "anonymous_function_creation_expression" => default(NodeKind::Function {
                keyword: require(node, "function")?,
            }),
            "static_variable_declaration" => default(NodeKind::StaticVariable {
                name: field_or_first_named(node, "name")?,
            }),
            "if_statement" => default(NodeKind::If {
                keyword: require(node, "if")?,
                else_ifs: children(node)
                    .iter()
                    .filter(|c| c.kind() == "else_if_clause")
                    .count(),
            }),
            "goto_statement" => default(NodeKind::Goto {
                keyword: require(node, "goto")?,
            }),
            "interface_declaration" => default(NodeKind::Interface {
                keyword: require(node, "interface")?,
            }),
            "namespace_definition" => default(NodeKind::Namespace {
                keyword: require(node, "namespace")?,
            }),
            "namespace_use_declaration" => default(NodeKind::NamespaceUse {
                keyword: require(node, "use")?,
            }),
            "return_statement" => default(NodeKind::Return {
                keyword: require(node, "return")?,
            }),
            "switch_statement" => default(NodeKind::Switch {
                keyword: require(node, "switch")?,
            }),
            "throw_expression" | "throw_statement" => default(NodeKind::Throw {
                keyword: require(node, "throw")?,
            }),
            "trait_declaration" => default(NodeKind::Trait {
                keyword: require(node, "trait")?,
            }),
            "try_statement" => default(NodeKind::Try {
                keyword: require(node, "try")?,
            }),
            "while_statement" => default(NodeKind::While {
                keyword: require(node, "while")?,
            }),
            "else_clause" => default(NodeKind::Else {
                keyword: require(node, "else")?,
            }),
            "else_if_clause" => default(NodeKind::ElseIf {
                keyword: require(node, "elseif")?,
            }),
            "case_statement" => default(NodeKind::Case {
                keyword: require(node, "case")?,
            }),
            "catch_clause" => default(NodeKind::Catch {
                keyword: require(node, "catch")?,
            }),
            "default_statement" => default(NodeKind::Default {
                keyword: require(node, "default")?,
            }),
            "const_element" => default(NodeKind::ConstElement {
                name: field_or_first_named(node, "name")?,
            }),
            "finally_clause" => default(NodeKind::Finally {
                keyword: require(node, "finally")?,
            }),
            "property_declaration" => {
                let jobs = named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "property_element")
                    .map(Job::Lower)
                    .collect();
                Ok(Frame::new(NodeKind::PropertyDeclaration, span, jobs))
            }
            // An initialized property is an assignment to the element.
            "property_element" => match property_initializer(node) {
                Some(operator) => default(NodeKind::Assignment {
                    operator,
                    destructuring: false,
                }),
                None => default(NodeKind::Other { kind: node.kind() }),
            },
            "use_declaration" => {
                let parts = named_children(node);
                let adaptations = parts.iter().any(|c| c.kind() == "use_list");
                // Names first, the adaptation list (if any) last.
                let jobs = parts
                    .iter()
                    .filter(|c| c.kind() != "use_list")
                    .chain(parts.iter().filter(|c| c.kind() == "use_list"))
                    .map(|c| Job::Lower(*c))
                    .collect();
                let mut frame = Frame::new(NodeKind::TraitUse { adaptations: None }, span, jobs);
                frame.adaptations = adaptations;
                Ok(frame)
            }
            "assignment_expression" | "reference_assignment_expression" => {
                let destructuring = node
                    .child_by_field_name("left")
                    .is_some_and(|left| left.kind() == "list_literal");
                default(NodeKind::Assignment {
                    operator: require(node, "=")?,
                    destructuring,
                })
            }
            "augmented_assignment_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .or_else(|| {
                        children(node)
                            .into_iter()
                            .find(|c| !c.is_named() && c.kind().ends_with('='))
                    })
                    .map(|op| Span::from(op.range()))
                    .ok_or_else(|| missing(node, "assignment operator"))?;
                default(NodeKind::Assignment {
                    operator,
                    destructuring: false,
                })
            }
            "conditional_expression" => default(NodeKind::Ternary {
                question: require(node, "?")?,
            }),
            "object_creation_expression" => match keyword(node, "new") {
                Some(new) => default(NodeKind::ObjectCreation {
                    keyword: new,
                    anonymous_class: anonymous_class_keyword(node),
                }),
                // `new` lives in the wrapped anonymous class, which carries the rule.
                None if children(node).iter().any(|c| c.kind() == "anonymous_class") => {
                    default(NodeKind::Other { kind: node.kind() })
                }
                None => Err(missing(node, "new")),
            },
            "anonymous_class" => match keyword(node, "new") {
                Some(new) => default(NodeKind::ObjectCreation {
                    keyword: new,
                    anonymous_class: keyword(node, "class"),
                }),
                None => default(NodeKind::Other { kind: node.kind() }),
            },
            "array_creation_expression" => {
                let opening = keyword(node, "array")
                    .or_else(|| keyword(node, "["))
                    .ok_or_else(|| missing(node, "array opening"))?;
                default(NodeKind::Array { opening })
            }
            "function_call_expression" => {
                let callee = node
                    .child_by_field_name("function")
                    .or_else(|| node.named_child(0))
                    .ok_or_else(|| missing(node, "callee"))?;
                let callee_span = Span::from(callee.range());
                let intrinsic = if callee.kind() == "name" {
                    self.text(callee_span).to_ascii_lowercase()
                } else {
                    String::new()
                };
                default(match intrinsic.as_str() {
                    "isset" => NodeKind::Isset {
                        keyword: callee_span,
                    },
                    "eval" => NodeKind::Eval {
                        keyword: callee_span,
                    },
                    "empty" | "exit" | "die" => NodeKind::Intrinsic,
                    "__halt_compiler" => NodeKind::Other { kind: node.kind() },
                    _ => NodeKind::Call {
                        callee: callee_span,
                    },
                })
            }
            "member_call_expression"
            | "nullsafe_member_call_expression"
            | "scoped_call_expression" => {
                let callee_end = node
                    .child_by_field_name("name")
                    .map(|name| name.end_byte())
                    .or_else(|| node.child_by_field_name("arguments").map(|a| a.start_byte()))
                    .unwrap_or(span.end);
                default(NodeKind::Call {
                    callee: Span::new(span.start, callee_end),
                })
            }
            "echo_statement" => {
                let jobs = children(node)
                    .into_iter()
                    .filter(|c| c.is_error() || c.is_missing())
                    .map(Job::Lower)
                    .collect();
                Ok(Frame::new(
                    NodeKind::Echo {
                        keyword: keyword(node, "echo"),
                    },
                    span,
                    jobs,
                ))
            }
            "print_intrinsic" => default(NodeKind::Print {
                keyword: require(node, "print")?,
            }),
            "unset_statement" => default(NodeKind::Unset {
                keyword: require(node, "unset")?,
            }),
            "update_expression" => {
                let parts = children(node);
                let operator = parts
                    .iter()
                    .position(|c| matches!(c.kind(), "++" | "--"))
                    .ok_or_else(|| missing(node, "update operator"))?;
                if operator == 0 {
                    // Prefix update has no rule.
                    default(NodeKind::Other { kind: node.kind() })
                } else {
                    default(NodeKind::PostfixUpdate {
                        operator: Span::from(parts[operator].range()),
                    })
                }
            }
            "clone_expression" => default(NodeKind::Intrinsic),
            "exit_statement" => {
                // The statement form swallows its semicolon; the anchor does not.
                let end = children(node)
                    .into_iter()
                    .filter(|c| c.kind() != ";")
                    .last()
                    .map_or(span.end, |c| c.end_byte());
                Ok(Frame::new(
                    NodeKind::Intrinsic,
                    Span::new(span.start, end),
                    self.child_jobs(node),
                ))
            }
            "name"
                if node
                    .parent()
                    .is_some_and(|p| p.kind() == "expression_statement")
                    && matches!(
                        self.text(span).to_ascii_lowercase().as_str(),
                        "exit" | "die"
                    ) =>
            {
                default(NodeKind::Intrinsic)
            }
            "yield_expression" => {
                let start = children(node)
                    .into_iter()
                    .find(|c| c.kind().starts_with("yield"))
                    .map(|c| Span::from(c.range()))
                    .ok_or_else(|| missing(node, "yield"))?;
                let keyword = match keyword(node, "from") {
                    Some(from) => start.cover(from),
                    None => start,
                };
                default(NodeKind::Yield { keyword })
            }
            "list_literal" => Ok(Frame::new(NodeKind::List, span, list_elements(node))),
            "text_interpolation" | "php_tag" | "text" => {
                // Normally grouped by `child_jobs`; reached only for a root
                // fragment.
                let start_tag = markup_start_tag(node);
                Ok(Frame::new(
                    NodeKind::Markup {
                        start_tag,
                        echo_shorthand: start_tag.is_some_and(|t| self.text(t) == "<?="),
                    },
                    span,
                    Vec::new(),
                ))
            }
            kind => default(NodeKind::Other { kind }),
        }
    }

    /// Named children as jobs, grouping markup into segments.
    ///
    /// A file's leading `text` and the `php_tag` that ends it form one
    /// segment. A segment ending in `<?=` adopts the next expression
    /// statement as its echo.
    fn child_jobs<'t>(&self, node: TsNode<'t>) -> Vec<Job<'t>> {
        let parts = named_children(node);
        let mut jobs = Vec::with_capacity(parts.len());
        let mut i = 0;

        while i < parts.len() {
            let part = parts[i];
            i += 1;

            let span = Span::from(part.range());
            let (span, start_tag) = match part.kind() {
                "text" => match parts.get(i) {
                    Some(tag) if tag.kind() == "php_tag" => {
                        i += 1;
                        let tag = Span::from(tag.range());
                        (span.cover(tag), Some(tag))
                    }
                    _ => (span, None),
                },
                "php_tag" => (span, Some(span)),
                "text_interpolation" => (span, markup_start_tag(part)),
                _ => {
                    jobs.push(Job::Lower(part));
                    continue;
                }
            };

            let echo_shorthand = start_tag.is_some_and(|t| self.text(t) == "<?=");
            let mut segment = Vec::new();
            if echo_shorthand {
                if let Some(statement) = parts.get(i).filter(|p| p.kind() == "expression_statement")
                {
                    i += 1;
                    segment.push(shorthand_echo(*statement));
                }
            }

            jobs.push(Job::Synthetic {
                kind: NodeKind::Markup {
                    start_tag,
                    echo_shorthand,
                },
                span,
                jobs: segment,
            });
        }

        jobs
    }
}

/// The implicit echo of `<?= expr ?>`, spanning the echoed expressions.
fn shorthand_echo(statement: TsNode<'_>) -> Job<'_> {
    let exprs = named_children(statement);
    let span = match (exprs.first(), exprs.last()) {
        (Some(first), Some(last)) => Span::new(first.start_byte(), last.end_byte()),
        _ => Span::from(statement.range()),
    };
    let jobs = children(statement)
        .into_iter()
        .filter(|c| c.is_error() || c.is_missing())
        .map(Job::Lower)
        .collect();

    Job::Synthetic {
        kind: NodeKind::Echo { keyword: None },
        span,
        jobs,
    }
}

/// Regroup a destructuring pattern into one element per comma-separated
/// slot. Empty slots (`[, $b]`) produce nothing.
fn list_elements(node: TsNode<'_>) -> Vec<Job<'_>> {
    let mut slots: Vec<Vec<TsNode<'_>>> = vec![Vec::new()];
    for part in children(node) {
        match part.kind() {
            "," => slots.push(Vec::new()),
            "list" | "(" | ")" | "[" | "]" | "comment" => {}
            _ => {
                if let Some(slot) = slots.last_mut() {
                    slot.push(part);
                }
            }
        }
    }

    slots
        .into_iter()
        .filter_map(|slot| {
            let named: Vec<TsNode<'_>> = slot.iter().copied().filter(|p| p.is_named()).collect();
            let value = *named.last()?;
            let first = slot.first()?;
            let last = slot.last()?;
            Some(Job::Synthetic {
                kind: NodeKind::ListElement {
                    nested_list: value.kind() == "list_literal",
                },
                span: Span::new(first.start_byte(), last.end_byte()),
                jobs: named.into_iter().map(Job::Lower).collect(),
            })
        })
        .collect()
}

/// The `=` of a property default, directly on the element or inside its
/// initializer.
fn property_initializer(node: TsNode<'_>) -> Option<Span> {
    keyword(node, "=").or_else(|| {
        children(node)
            .into_iter()
            .find(|c| c.kind() == "property_initializer")
            .and_then(|init| keyword(init, "="))
    })
}

fn markup_start_tag(node: TsNode<'_>) -> Option<Span> {
    if node.kind() == "php_tag" {
        return Some(Span::from(node.range()));
    }
    children(node)
        .into_iter()
        .find(|c| c.kind() == "php_tag")
        .map(|tag| Span::from(tag.range()))
}

/// `class` keyword of an inline anonymous class, either directly under the
/// creation expression or inside an `anonymous_class` child.
fn anonymous_class_keyword(node: TsNode<'_>) -> Option<Span> {
    keyword(node, "class").or_else(|| {
        children(node)
            .into_iter()
            .find(|c| c.kind() == "anonymous_class")
            .and_then(|class| keyword(class, "class"))
    })
}

fn children(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut cursor = node.walk();
    let parts = node.children(&mut cursor).collect();
    parts
}

fn named_children(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut cursor = node.walk();
    let parts = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    parts
}

/// Span of the first direct child token of the given kind.
fn keyword(node: TsNode<'_>, kind: &str) -> Option<Span> {
    children(node)
        .into_iter()
        .find(|c| c.kind() == kind)
        .map(|c| Span::from(c.range()))
}

fn require(node: TsNode<'_>, kind: &'static str) -> Result<Span, TreeSitterError> {
    keyword(node, kind).ok_or_else(|| missing(node, kind))
}

fn field_or_first_named(node: TsNode<'_>, field: &'static str) -> Result<Span, TreeSitterError> {
    node.child_by_field_name(field)
        .or_else(|| named_children(node).into_iter().next())
        .map(|c| Span::from(c.range()))
        .ok_or_else(|| missing(node, field))
}

fn missing(node: TsNode<'_>, anchor: &'static str) -> TreeSitterError {
    TreeSitterError::MissingAnchor {
        kind: node.kind(),
        anchor,
        offset: node.start_byte(),
    }
}
