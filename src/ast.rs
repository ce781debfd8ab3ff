//! Typed AST consumed by the dispatch engine.
//!
//! Lowered once from the tree-sitter CST (see [`crate::ts::lower`]). Every
//! node category that has an emission rule is its own [`NodeKind`] variant
//! carrying the byte spans of its anchor tokens; everything else is
//! [`NodeKind::Other`].

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl From<tree_sitter::Range> for Span {
    fn from(range: tree_sitter::Range) -> Self {
        Span::new(range.start_byte, range.end_byte)
    }
}

/// Which keyword a `break`/`continue` statement uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    Break,
    Continue,
}

/// Node categories. Spans name the anchor token each rule emits at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// `for` / `foreach`
    Loop { keyword: Span },
    Jump { keyword: Span, jump: Jump },
    Class { keyword: Span },
    Do { keyword: Span },
    /// Function, method and closure declarations.
    Function { keyword: Span },
    StaticVariable { name: Span },
    If { keyword: Span, else_ifs: usize },
    Goto { keyword: Span },
    /// Inline markup ending in an opening tag (absent at end of file).
    ///
    /// With `echo_shorthand` the opening tag is `<?=` and the only child is
    /// the [`NodeKind::Echo`] for the echoed expression.
    Markup {
        start_tag: Option<Span>,
        echo_shorthand: bool,
    },
    Interface { keyword: Span },
    Namespace { keyword: Span },
    NamespaceUse { keyword: Span },
    Return { keyword: Span },
    Switch { keyword: Span },
    Throw { keyword: Span },
    Trait { keyword: Span },
    Try { keyword: Span },
    While { keyword: Span },
    Else { keyword: Span },
    ElseIf { keyword: Span },
    Case { keyword: Span },
    Catch { keyword: Span },
    Default { keyword: Span },
    ConstElement { name: Span },
    Finally { keyword: Span },
    /// Children are the declared property elements only.
    PropertyDeclaration,
    /// Children are the used trait names only.
    TraitUse { adaptations: Option<Box<Node>> },
    Assignment { operator: Span, destructuring: bool },
    Ternary { question: Span },
    ObjectCreation {
        keyword: Span,
        anonymous_class: Option<Span>,
    },
    Array { opening: Span },
    Call { callee: Span },
    /// `echo`; `keyword` is absent for `<?=`. Children are only the
    /// malformed parts of the expression list.
    Echo { keyword: Option<Span> },
    Print { keyword: Span },
    Unset { keyword: Span },
    PostfixUpdate { operator: Span },
    Isset { keyword: Span },
    /// `exit`, `die`, `empty` and `clone`, anchored at the whole node.
    Intrinsic,
    Eval { keyword: Span },
    /// Destructuring pattern. Children are [`NodeKind::ListElement`]s.
    List,
    /// One slot of a destructuring pattern: optional key, then value.
    ListElement { nested_list: bool },
    /// `yield` or `yield from`.
    Yield { keyword: Span },
    /// Parse error recovered by the parser.
    Error,
    /// Any other CST node; the tree-sitter kind is kept for debugging.
    Other { kind: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span, children: Vec<Node>) -> Self {
        Self {
            kind,
            span,
            children,
        }
    }

    pub fn leaf(kind: NodeKind, span: Span) -> Self {
        Self::new(kind, span, Vec::new())
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.children.iter());
            if let NodeKind::TraitUse {
                adaptations: Some(list),
            } = &node.kind
            {
                stack.push(list);
            }
        }
        total
    }
}

// Deeply nested sources would otherwise overflow the stack in drop glue.
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        stack.extend(self.kind.take_adaptations());
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
            stack.extend(node.kind.take_adaptations());
        }
    }
}

impl NodeKind {
    fn take_adaptations(&mut self) -> Option<Node> {
        match self {
            NodeKind::TraitUse { adaptations } => adaptations.take().map(|list| *list),
            _ => None,
        }
    }
}
