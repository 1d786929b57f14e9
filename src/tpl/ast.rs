/// A branch of a conditional: `guard` is `None` for the `else` branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub guard: Option<String>,
    pub body: Vec<Node>,
}

impl Branch {
    pub fn is_else(&self) -> bool {
        self.guard.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(String),
    Print(String),
    /// `if`/`elif`/`else` chain. At most one branch is an `else`, and it is last.
    Conditional {
        branches: Vec<Branch>,
    },
    Loop {
        path: String,
        body: Vec<Node>,
    },
    Root {
        children: Vec<Node>,
    },
}

impl Node {
    pub fn name(&self) -> &'static str {
        match self {
            Node::Literal(_) => "literal",
            Node::Print(_) => "print tag",
            Node::Conditional { .. } => "if",
            Node::Loop { .. } => "loop",
            Node::Root { .. } => "root",
        }
    }
}
