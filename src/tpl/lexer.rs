use log::trace;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::iter;
use std::sync::OnceLock;

/// One tag or literal run of the template source.
///
/// `raw` is the exact source slice the token was produced from, so joining
/// the `raw` of every token reproduces the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'t> {
    pub raw: &'t str,
    pub kind: TokenKind<'t>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'t> {
    /// Plain text with `\X` escapes already collapsed to `X`.
    Literal { text: Cow<'t, str> },
    /// `{{ expression }}`
    Print { expression: Vec<String> },
    /// `{% function expression %}`
    StartBlock {
        function: &'t str,
        expression: Option<Vec<String>>,
    },
    /// `{% /function %}`
    EndBlock { function: &'t str },
}

impl Token<'_> {
    /// The variable path carried by the token, if it has one.
    pub fn path(&self) -> Option<String> {
        match &self.kind {
            TokenKind::Print { expression } => Some(join_expression(expression)),
            TokenKind::StartBlock { expression, .. } => Some(
                expression
                    .as_deref()
                    .map(join_expression)
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }
}

const PRINT: &str = r"\{\{\s*(?P<print_expr>(?:\\.|[^{}])+?)\s*\}\}";
const START_BLOCK: &str = r"\{%\s*(?P<start_fn>[\w-]+)(?P<start_expr>(?:\\.|[^{}])+?)?\s*%\}";
const END_BLOCK: &str = r"\{%\s*/\s*(?P<end_fn>[\w-]+)\s*%\}";

fn tokenizer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Alternation order is the match priority.
        let pattern = format!(
            r"(?s)(?P<print>{PRINT})|(?P<start>{START_BLOCK})|(?P<end>{END_BLOCK})"
        );
        Regex::new(&pattern).expect("tokenizer pattern is valid")
    })
}

fn unescape_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\\(.)").expect("unescape pattern is valid"))
}

/// Splits template text into tokens.
///
/// Never fails: anything that does not form a complete tag stays literal
/// text, so a lone `{{` or an unterminated `{%` passes through untouched.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut previous_end = 0;

    for caps in tokenizer_regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() != previous_end {
            tokens.push(literal(&text[previous_end..whole.start()]));
        }
        previous_end = whole.end();

        let token = classify(whole.as_str(), &caps);
        trace!("token {:?}", token);
        tokens.push(token);
    }

    if previous_end < text.len() {
        tokens.push(literal(&text[previous_end..]));
    }

    tokens
}

fn literal(raw: &str) -> Token<'_> {
    Token {
        raw,
        kind: TokenKind::Literal {
            text: unescape_regex().replace_all(raw, "$1"),
        },
    }
}

fn classify<'t>(raw: &'t str, caps: &Captures<'t>) -> Token<'t> {
    let kind = if let Some(expr) = caps.name("print_expr") {
        TokenKind::Print {
            expression: split_expression(expr.as_str()),
        }
    } else if let Some(function) = caps.name("start_fn") {
        let expression = caps
            .name("start_expr")
            .map(|m| m.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(split_expression);
        TokenKind::StartBlock {
            function: function.as_str(),
            expression,
        }
    } else {
        // The only remaining alternative is an end block.
        TokenKind::EndBlock {
            function: caps.name("end_fn").map(|m| m.as_str()).unwrap_or_default(),
        }
    };
    Token { raw, kind }
}

/// Shell-style word splitting of a tag expression.
///
/// Whitespace separates words; single quotes keep their content verbatim;
/// double quotes allow `\"` and `\\`; a backslash outside quotes escapes the
/// next character. An unterminated quote runs to the end of the input. An
/// empty expression yields a single empty word.
pub fn split_expression(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = text.trim().chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    word.push(q);
                }
            }
            '"' => {
                in_word = true;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => break,
                        '\\' => match chars.next() {
                            Some(e @ ('"' | '\\')) => word.push(e),
                            Some(e) => {
                                word.push('\\');
                                word.push(e);
                            }
                            None => word.push('\\'),
                        },
                        _ => word.push(q),
                    }
                }
            }
            '\\' => {
                in_word = true;
                word.push(chars.next().unwrap_or('\\'));
            }
            _ => {
                in_word = true;
                word.push(c);
            }
        }
    }
    if in_word {
        words.push(word);
    }

    if words.is_empty() {
        words.push(String::new());
    }
    words
}

/// Joins expression words into the single path string the resolver uses.
///
/// Words are re-quoted the way a Windows command line is built: a word that
/// is empty or holds a space or tab is wrapped in double quotes, an embedded
/// `"` becomes `\"`, and backslashes are doubled only where they precede a
/// quote. So `{{ 'a b' }}` resolves the key `"a b"`, quotes included.
pub fn join_expression(words: &[String]) -> String {
    let mut joined = String::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            joined.push(' ');
        }
        let quote = word.is_empty() || word.contains([' ', '\t']);
        if quote {
            joined.push('"');
        }

        let mut backslashes = 0;
        for c in word.chars() {
            match c {
                '\\' => backslashes += 1,
                '"' => {
                    joined.extend(iter::repeat_n('\\', backslashes * 2 + 1));
                    joined.push('"');
                    backslashes = 0;
                }
                _ => {
                    joined.extend(iter::repeat_n('\\', backslashes));
                    joined.push(c);
                    backslashes = 0;
                }
            }
        }

        let trailing = if quote { backslashes * 2 } else { backslashes };
        joined.extend(iter::repeat_n('\\', trailing));
        if quote {
            joined.push('"');
        }
    }
    joined
}
