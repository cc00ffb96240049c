use std::fmt;

use crate::engine::{Engine, State, Step};
use crate::grammar::Grammar;
use crate::stack::Stack;
use crate::tokens::TokenSource;
use crate::types::{Token, Value, Var};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub symbol: Var,
    /// Value of the matched token, terminals only.
    pub value: Option<Value>,
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(symbol: impl Into<Var>) -> Self {
        Node {
            symbol: symbol.into(),
            value: None,
            children: Vec::new(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "({}, {})", self.symbol, value),
            None => write!(f, "{}", self.symbol),
        }
    }
}

/// Parse tree stored as an arena; node 0 is the start symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
    nodes: Vec<Node>,
}

impl ParseTree {
    pub const ROOT: NodeId = 0;

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn root(&self) -> &Node {
        self.node(Self::ROOT)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Leaves under `id`, left to right, separated by two spaces. Empty
    /// nonterminals and action symbols do not show up.
    pub fn phrase(&self, id: NodeId, grammar: &Grammar) -> String {
        let mut leaves = Vec::new();
        self.collect_leaves(id, grammar, &mut leaves);
        leaves.join("  ")
    }

    fn collect_leaves(&self, id: NodeId, grammar: &Grammar, leaves: &mut Vec<String>) {
        let node = self.node(id);
        if node.children.is_empty() {
            if grammar.is_terminal(&node.symbol) {
                leaves.push(node.to_string());
            }
            return;
        }

        for child in &node.children {
            self.collect_leaves(*child, grammar, leaves);
        }
    }

    /// Non-empty phrases of every `nonterminal` node, in preorder.
    pub fn phrases_for(&self, nonterminal: &str, grammar: &Grammar) -> Vec<String> {
        let mut phrases = Vec::new();
        let mut pending = vec![Self::ROOT];

        while let Some(id) = pending.pop() {
            let node = self.node(id);
            if node.symbol == nonterminal {
                let phrase = self.phrase(id, grammar);
                if !phrase.is_empty() {
                    phrases.push(phrase);
                }
            }
            pending.extend(node.children.iter().rev());
        }

        phrases
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = self.node(id);
        writeln!(f, "{:indent$}{}", "", node, indent = depth * 2)?;
        for child in &node.children {
            self.fmt_node(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, Self::ROOT, 0)
    }
}

/// Mirrors engine transitions into a tree. Its stack tracks the parse
/// stack without the bottom sentinel.
pub struct TreeBuilder {
    tree: ParseTree,
    pending: Stack<NodeId>,
}

impl TreeBuilder {
    pub fn new(grammar: &Grammar) -> Self {
        let mut tree = ParseTree { nodes: Vec::new() };
        let root = tree.add(Node::new(grammar.start()));
        let mut pending = Stack::new();
        pending.push(root);

        TreeBuilder { tree, pending }
    }

    pub fn observe(&mut self, grammar: &Grammar, step: &Step) {
        match step {
            Step::Expanded(index) => {
                let parent = match self.pending.pop() {
                    Some(parent) => parent,
                    None => return,
                };

                let children: Vec<NodeId> = grammar
                    .rule(*index)
                    .rhs
                    .iter()
                    .map(|symbol| self.tree.add(Node::new(symbol.as_str())))
                    .collect();
                self.tree.nodes[parent].children = children.clone();
                self.pending.multipush(children);
            }
            Step::Matched(Token { value, .. }) => {
                if let Some(id) = self.pending.pop() {
                    self.tree.nodes[id].value = value.clone();
                }
            }
            Step::Performed(_) => {
                self.pending.pop();
            }
            Step::Accepted | Step::Rejected => {}
        }
    }

    pub fn finish(self) -> ParseTree {
        self.tree
    }
}

/// Parses `tokens` and returns the tree, or `None` on rejection. Action
/// symbols stay in the tree as leaves but run no routine.
pub fn build<S: TokenSource>(grammar: &Grammar, tokens: S) -> Option<ParseTree> {
    let mut engine = Engine::new(grammar, tokens, ());
    let mut builder = TreeBuilder::new(grammar);

    loop {
        let step = match engine.step() {
            Ok(step) => step,
            Err(never) => match never {},
        };
        builder.observe(grammar, &step);

        match engine.state() {
            State::Running => continue,
            State::Accepted => return Some(builder.finish()),
            State::Rejected => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use crate::tokens::TokenStream;

    #[test]
    fn expression_tree() {
        let g = Grammar::expressions().unwrap();
        let tree = build(&g, TokenStream::from_names("$id * $id")).unwrap();

        assert_eq!(tree.root().symbol, "goal");
        assert_eq!(tree.phrase(ParseTree::ROOT, &g), "$id  *  $id");
        assert_eq!(tree.phrases_for("f", &g), vec!["$id", "$id"]);
        // the empty mt produces no phrase
        assert_eq!(tree.phrases_for("mt", &g), Vec::<String>::new());
        assert_eq!(tree.phrases_for("t", &g), vec!["$id  *  $id"]);
    }

    #[test]
    fn rejected_input_has_no_tree() {
        let g = Grammar::expressions().unwrap();
        assert_eq!(build(&g, TokenStream::from_names("$id *")), None);
    }

    #[test]
    fn values_and_actions_in_scheme_trees() {
        let g = Grammar::plh().unwrap();
        let tokens = scan("if n < 10 then put n;").unwrap();
        let tree = build(&g, TokenStream::new(tokens)).unwrap();

        assert_eq!(tree.phrases_for("logexpr", &g), vec!["($id, n)  <  ($int, 10)"]);
        assert_eq!(tree.phrases_for("put", &g), vec!["$put  ($id, n)  ;"]);

        let outline = tree.to_string();
        assert!(outline.starts_with("program\n  decls\n  states\n"));
        assert!(outline.contains("@begin_if"));
    }
}
