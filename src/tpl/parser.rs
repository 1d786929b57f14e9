use crate::error::ParseError;
use crate::tpl::ast::{Branch, Node};
use crate::tpl::lexer::{Token, TokenKind, join_expression};

/// A block whose closing tag has not been seen yet.
enum Block {
    /// Collects the branches of an `if` chain as they are closed.
    Conditional { branches: Vec<Branch> },
    /// An `if` or `elif` branch with its guard path.
    If { guard: String },
    Else,
    Loop { path: String },
}

impl Block {
    fn name(&self) -> &'static str {
        match self {
            Block::Conditional { .. } | Block::If { .. } => "if",
            Block::Else => "else",
            Block::Loop { .. } => "loop",
        }
    }
}

/// A parse stack entry. `Node` entries are complete, `Open` entries are not.
enum Frame {
    Node(Node),
    Open { block: Block, tag: String },
}

/// What follows the branch being closed.
#[derive(Clone, Copy)]
enum Continuation {
    Elif,
    Else,
    End,
}

/// Single-pass shift/reduce parser over the token stream.
///
/// Start tags shift an `Open` frame; `elif`, `else` and end tags reduce by
/// popping complete frames until the innermost `Open` frame, which must be of
/// the expected kind. The popped frames become that block's body.
struct Parser {
    stack: Vec<Frame>,
}

impl Parser {
    fn new() -> Self {
        Self { stack: Vec::new() }
    }

    fn shift(&mut self, token: Token<'_>) -> Result<(), ParseError> {
        match &token.kind {
            TokenKind::Literal { text } => {
                self.stack.push(Frame::Node(Node::Literal(text.to_string())));
            }
            TokenKind::Print { expression } => {
                self.stack
                    .push(Frame::Node(Node::Print(join_expression(expression))));
            }
            TokenKind::StartBlock { function, .. } => {
                let guard = token.path().unwrap_or_default();
                self.start_block(function, guard, token.raw)?;
            }
            TokenKind::EndBlock { function } => self.end_block(function, token.raw)?,
        }
        Ok(())
    }

    fn start_block(&mut self, function: &str, guard: String, tag: &str) -> Result<(), ParseError> {
        match function {
            "if" => {
                self.open(
                    Block::Conditional {
                        branches: Vec::new(),
                    },
                    tag,
                );
                self.open(Block::If { guard }, tag);
            }
            "elif" => {
                self.close_branch(tag, Continuation::Elif)?;
                self.open(Block::If { guard }, tag);
            }
            "else" => {
                self.close_branch(tag, Continuation::Else)?;
                self.open(Block::Else, tag);
            }
            "loop" => self.open(Block::Loop { path: guard }, tag),
            _ => {
                return Err(ParseError::UnknownStartFunction {
                    function: function.to_string(),
                    tag: tag.to_string(),
                });
            }
        }
        Ok(())
    }

    fn end_block(&mut self, function: &str, tag: &str) -> Result<(), ParseError> {
        match function {
            "if" => {
                self.close_branch(tag, Continuation::End)?;
                match self.stack.pop() {
                    Some(Frame::Open {
                        block: Block::Conditional { branches },
                        ..
                    }) => {
                        validate_branches(&branches, tag)?;
                        self.stack
                            .push(Frame::Node(Node::Conditional { branches }));
                        Ok(())
                    }
                    _ => Err(ParseError::UnmatchedStart {
                        tag: tag.to_string(),
                    }),
                }
            }
            "loop" => match self.rewind(tag)? {
                (Block::Loop { path }, body) => {
                    self.stack.push(Frame::Node(Node::Loop { path, body }));
                    Ok(())
                }
                (other, _) => Err(ParseError::MismatchedTag {
                    expected: "loop",
                    found: other.name(),
                    tag: tag.to_string(),
                }),
            },
            _ => Err(ParseError::UnknownEndFunction {
                function: function.to_string(),
                tag: tag.to_string(),
            }),
        }
    }

    fn open(&mut self, block: Block, tag: &str) {
        self.stack.push(Frame::Open {
            block,
            tag: tag.to_string(),
        });
    }

    /// Pops complete frames down to the innermost open block and returns it
    /// with the popped nodes in source order.
    fn rewind(&mut self, tag: &str) -> Result<(Block, Vec<Node>), ParseError> {
        let mut body = Vec::new();
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Node(node) => body.push(node),
                Frame::Open { block, .. } => {
                    body.reverse();
                    return Ok((block, body));
                }
            }
        }
        Err(ParseError::UnmatchedStart {
            tag: tag.to_string(),
        })
    }

    /// Reduces the trailing `if`/`elif`/`else` branch into its conditional.
    fn close_branch(&mut self, tag: &str, next: Continuation) -> Result<(), ParseError> {
        let (block, body) = self.rewind(tag)?;
        let guard = match block {
            Block::If { guard } => Some(guard),
            Block::Else => None,
            other => {
                return Err(ParseError::MismatchedTag {
                    expected: "if",
                    found: other.name(),
                    tag: tag.to_string(),
                });
            }
        };

        if guard.is_none() {
            match next {
                Continuation::Elif => {
                    return Err(ParseError::ElseNotLast {
                        tag: tag.to_string(),
                    });
                }
                Continuation::Else => {
                    return Err(ParseError::MultipleElse {
                        tag: tag.to_string(),
                    });
                }
                Continuation::End => {}
            }
        }

        match self.stack.last_mut() {
            Some(Frame::Open {
                block: Block::Conditional { branches },
                ..
            }) => {
                branches.push(Branch { guard, body });
                Ok(())
            }
            _ => Err(ParseError::UnmatchedStart {
                tag: tag.to_string(),
            }),
        }
    }

    /// Every frame must be complete once the tokens run out.
    fn finish(self) -> Result<Node, ParseError> {
        let mut children = Vec::with_capacity(self.stack.len());
        for frame in self.stack {
            match frame {
                Frame::Node(node) => children.push(node),
                Frame::Open { tag, .. } => return Err(ParseError::UnmatchedEnd { tag }),
            }
        }
        Ok(Node::Root { children })
    }
}

/// At most one `else`, and only in last position.
fn validate_branches(branches: &[Branch], tag: &str) -> Result<(), ParseError> {
    let elses = branches.iter().filter(|b| b.is_else()).count();
    if elses > 1 {
        return Err(ParseError::MultipleElse {
            tag: tag.to_string(),
        });
    }
    if elses == 1 && branches.last().is_some_and(|b| !b.is_else()) {
        return Err(ParseError::ElseNotLast {
            tag: tag.to_string(),
        });
    }
    Ok(())
}

/// Reduces a token stream into a `Node::Root`.
pub fn parse<'t>(tokens: impl IntoIterator<Item = Token<'t>>) -> Result<Node, ParseError> {
    let mut parser = Parser::new();
    for token in tokens {
        parser.shift(token)?;
    }
    parser.finish()
}
