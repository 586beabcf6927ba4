//! Syntax tree over PowerShell source.
//!
//! The tree is shallow on purpose: the script root, function definitions,
//! and class definitions with their methods. Function bodies are never
//! descended into, so functions defined inside other functions do not
//! appear as nodes.

use super::lexer::{tokenize, Token, TokenKind};
use super::help;

/// Byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `<# ... #>`
    Block,
    /// Consecutive `#` lines
    Lines,
}

/// A comment block that may carry comment-based help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentBlock {
    pub style: CommentStyle,
    pub span: Span,
}

impl CommentBlock {
    /// Comment text without its delimiters.
    pub fn body(&self, src: &str) -> String {
        let raw = self.span.text(src);
        match self.style {
            CommentStyle::Block => {
                let inner = raw.strip_prefix("<#").unwrap_or(raw);
                inner.strip_suffix("#>").unwrap_or(inner).to_string()
            }
            CommentStyle::Lines => raw
                .lines()
                .map(|l| l.trim_start().strip_prefix('#').unwrap_or(l))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// The pieces of a definition the help resolver works from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionParts {
    pub help: Option<CommentBlock>,
    /// `[CmdletBinding()]` and friends in front of `param`
    pub attributes: Option<Span>,
    /// Text between the parentheses of `param(...)` or of `function f(...)`
    pub param_list: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionData {
    pub name: String,
    /// Parameters declared as `function f($a) { }`
    pub inline_params: bool,
    pub parts: DefinitionParts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptData {
    pub parts: DefinitionParts,
    /// `<#PSScriptInfo ... #>`
    pub script_info: Option<Span>,
}

/// Closed set of node kinds the extractor filters on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Script,
    FunctionDefinition(FunctionData),
    /// `class Name { ... }`
    TypeDefinition { name: String },
    /// Class method or constructor; its body is a child function node
    MemberDefinition { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub extent: Span,
    pub children: Vec<Node>,
}

impl Node {
    pub fn function(&self) -> Option<&FunctionData> {
        match self.kind {
            NodeKind::FunctionDefinition(ref data) => Some(data),
            _ => None,
        }
    }
}

/// Parsed source together with its tree.
#[derive(Debug, Clone)]
pub struct Ast {
    pub source: String,
    pub script: ScriptData,
    pub root: Node,
}

impl Ast {
    pub fn script(&self) -> &ScriptData {
        &self.script
    }

    /// Pre-order search; the predicate sees each node and its parent.
    pub fn find_all<F>(&self, predicate: F) -> Vec<&Node>
    where
        F: Fn(&Node, Option<&Node>) -> bool,
    {
        let mut found = Vec::new();
        collect(&self.root, None, &predicate, &mut found);
        found
    }

    /// Function definitions in source order, excluding class methods.
    pub fn functions(&self) -> Vec<&Node> {
        self.find_all(|node, parent| {
            matches!(node.kind, NodeKind::FunctionDefinition(_))
                && !matches!(
                    parent.map(|p| &p.kind),
                    Some(NodeKind::MemberDefinition { .. })
                )
        })
    }
}

fn collect<'a, F>(node: &'a Node, parent: Option<&'a Node>, predicate: &F, out: &mut Vec<&'a Node>)
where
    F: Fn(&Node, Option<&Node>) -> bool,
{
    if predicate(node, parent) {
        out.push(node);
    }
    for child in &node.children {
        collect(child, Some(node), predicate, out);
    }
}

/// Parse PowerShell source into a tree. Never fails: malformed constructs
/// are skipped.
pub fn parse(source: &str) -> Ast {
    let tokens = tokenize(source);
    let builder = Builder {
        src: source,
        tokens: &tokens,
    };
    let children = builder.statements(0, tokens.len());
    let script = builder.script_data();
    tracing::debug!(nodes = children.len(), "parsed syntax tree");
    Ast {
        source: source.to_string(),
        script,
        root: Node {
            kind: NodeKind::Script,
            extent: Span {
                start: 0,
                end: source.len(),
            },
            children,
        },
    }
}

const FUNCTION_KEYWORDS: &[&str] = &["function", "filter", "workflow"];
const SCOPE_PREFIXES: &[&str] = &["global:", "script:", "local:", "private:"];

struct Builder<'a> {
    src: &'a str,
    tokens: &'a [Token],
}

impl<'a> Builder<'a> {
    fn kind(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    fn statements(&self, from: usize, to: usize) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut i = from;
        while i < to {
            let tok = self.tokens[i];
            if tok.kind == TokenKind::Word && self.at_statement_start(i, from) {
                let word = tok.text(self.src).to_ascii_lowercase();
                let parsed = if FUNCTION_KEYWORDS.contains(&word.as_str()) {
                    self.function(i, to)
                } else if word == "class" {
                    self.class(i, to)
                } else {
                    None
                };
                if let Some((node, next)) = parsed {
                    nodes.push(node);
                    i = next;
                    continue;
                }
            }
            i += 1;
        }
        nodes
    }

    /// True when only comments separate token `i` from the previous
    /// statement boundary.
    fn at_statement_start(&self, i: usize, from: usize) -> bool {
        let mut j = i;
        while j > from {
            j -= 1;
            match self.tokens[j].kind {
                TokenKind::BlockComment | TokenKind::LineComment => continue,
                TokenKind::Newline | TokenKind::Semi | TokenKind::LBrace | TokenKind::RBrace => {
                    return true
                }
                _ => return false,
            }
        }
        true
    }

    fn skip_newlines(&self, mut i: usize, to: usize) -> usize {
        while i < to && matches!(self.kind(i), Some(TokenKind::Newline)) {
            i += 1;
        }
        i
    }

    fn skip_trivia(&self, mut i: usize, to: usize) -> usize {
        while i < to
            && (self.tokens[i].kind == TokenKind::Newline || self.tokens[i].is_comment())
        {
            i += 1;
        }
        i
    }

    /// Index of the token closing the bracket opened at `open`.
    fn matching(&self, open: usize, to: usize) -> Option<usize> {
        let open_kind = self.tokens[open].kind;
        let close_kind = match open_kind {
            TokenKind::LBrace => TokenKind::RBrace,
            TokenKind::LParen => TokenKind::RParen,
            TokenKind::LBracket => TokenKind::RBracket,
            _ => return None,
        };
        let mut depth = 0usize;
        for j in open..to {
            let kind = self.tokens[j].kind;
            if kind == open_kind {
                depth += 1;
            } else if kind == close_kind {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
        }
        None
    }

    fn function(&self, i: usize, to: usize) -> Option<(Node, usize)> {
        let name_tok = self.tokens.get(i + 1).filter(|t| t.kind == TokenKind::Word)?;
        let name = strip_scope(name_tok.text(self.src)).to_string();

        let mut k = self.skip_trivia(i + 2, to);
        let mut inline = None;
        if self.kind(k) == Some(TokenKind::LParen) {
            let close = self.matching(k, to)?;
            inline = Some(Span {
                start: self.tokens[k].end,
                end: self.tokens[close].start,
            });
            k = self.skip_trivia(close + 1, to);
        }
        if self.kind(k) != Some(TokenKind::LBrace) {
            return None;
        }
        let close = self.matching(k, to)?;

        let help = self
            .help_before(i)
            .or_else(|| self.help_at_body_start(k + 1, close))
            .or_else(|| self.help_at_body_end(k + 1, close));

        let (attributes, param_list) = match inline {
            Some(span) => (None, Some(span)),
            None => self.param_block(k + 1, close),
        };

        let data = FunctionData {
            name,
            inline_params: inline.is_some(),
            parts: DefinitionParts {
                help,
                attributes,
                param_list,
            },
        };
        let node = Node {
            kind: NodeKind::FunctionDefinition(data),
            extent: Span {
                start: self.tokens[i].start,
                end: self.tokens[close].end,
            },
            children: Vec::new(),
        };
        Some((node, close + 1))
    }

    fn class(&self, i: usize, to: usize) -> Option<(Node, usize)> {
        let name_tok = self.tokens.get(i + 1).filter(|t| t.kind == TokenKind::Word)?;
        let open = (i + 2..to).find(|&j| self.tokens[j].kind == TokenKind::LBrace)?;
        let close = self.matching(open, to)?;

        let node = Node {
            kind: NodeKind::TypeDefinition {
                name: name_tok.text(self.src).to_string(),
            },
            extent: Span {
                start: self.tokens[i].start,
                end: self.tokens[close].end,
            },
            children: self.members(open + 1, close),
        };
        Some((node, close + 1))
    }

    /// Methods and constructors: `Name(...) { ... }` at class-body depth.
    fn members(&self, from: usize, to: usize) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut i = from;
        while i < to {
            let tok = self.tokens[i];
            if matches!(tok.kind, TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket) {
                i = self.matching(i, to).map(|c| c + 1).unwrap_or(to);
                continue;
            }
            if tok.kind == TokenKind::Word && self.kind(i + 1) == Some(TokenKind::LParen) {
                if let Some(node) = self.method(i, to) {
                    i = node.1;
                    nodes.push(node.0);
                    continue;
                }
            }
            i += 1;
        }
        nodes
    }

    fn method(&self, i: usize, to: usize) -> Option<(Node, usize)> {
        let name = self.tokens[i].text(self.src).to_string();
        let params_close = self.matching(i + 1, to)?;
        let open = self.skip_newlines(params_close + 1, to);
        if self.kind(open) != Some(TokenKind::LBrace) {
            return None;
        }
        let close = self.matching(open, to)?;
        let extent = Span {
            start: self.tokens[i].start,
            end: self.tokens[close].end,
        };
        let body = FunctionData {
            name: name.clone(),
            inline_params: true,
            parts: DefinitionParts {
                help: None,
                attributes: None,
                param_list: Some(Span {
                    start: self.tokens[i + 1].end,
                    end: self.tokens[params_close].start,
                }),
            },
        };
        let node = Node {
            kind: NodeKind::MemberDefinition { name },
            extent,
            children: vec![Node {
                kind: NodeKind::FunctionDefinition(body),
                extent,
                children: Vec::new(),
            }],
        };
        Some((node, close + 1))
    }

    /// `[attr()]... param(...)` as the first statement in `from..to`.
    fn param_block(&self, from: usize, to: usize) -> (Option<Span>, Option<Span>) {
        let mut i = self.skip_trivia(from, to);
        // `using` statements must come first in a script
        while i < to && self.tokens[i].is_word(self.src, "using") {
            while i < to && !matches!(self.kind(i), Some(TokenKind::Newline | TokenKind::Semi)) {
                i += 1;
            }
            i = self.skip_trivia(i + 1, to);
        }

        let mut attr_start = None;
        let mut attr_end = None;
        while i < to && self.tokens[i].kind == TokenKind::LBracket {
            let Some(close) = self.matching(i, to) else {
                return (None, None);
            };
            attr_start.get_or_insert(self.tokens[i].start);
            attr_end = Some(self.tokens[close].end);
            i = self.skip_trivia(close + 1, to);
        }

        if i >= to || !self.tokens[i].is_word(self.src, "param") {
            return (None, None);
        }
        let open = self.skip_trivia(i + 1, to);
        if self.kind(open) != Some(TokenKind::LParen) {
            return (None, None);
        }
        let Some(close) = self.matching(open, to) else {
            return (None, None);
        };

        let attributes = attr_start.zip(attr_end).map(|(start, end)| Span { start, end });
        let list = Span {
            start: self.tokens[open].end,
            end: self.tokens[close].start,
        };
        (attributes, Some(list))
    }

    /// Comment block ending on the line above `i` (at most one blank line
    /// in between).
    fn help_before(&self, i: usize) -> Option<CommentBlock> {
        let mut j = i;
        let mut newlines = 0;
        while j > 0 && self.tokens[j - 1].kind == TokenKind::Newline {
            newlines += 1;
            j -= 1;
        }
        if j == 0 || newlines == 0 || newlines > 2 {
            return None;
        }
        let block = self.comment_block_ending_at(j - 1)?;
        self.accept_help(block)
    }

    fn help_at_body_start(&self, from: usize, to: usize) -> Option<CommentBlock> {
        let i = self.skip_newlines(from, to);
        if i >= to {
            return None;
        }
        let block = self.comment_block_starting_at(i, to)?;
        self.accept_help(block)
    }

    fn help_at_body_end(&self, from: usize, to: usize) -> Option<CommentBlock> {
        let mut j = to;
        while j > from && self.tokens[j - 1].kind == TokenKind::Newline {
            j -= 1;
        }
        if j == from {
            return None;
        }
        let block = self.comment_block_ending_at(j - 1)?;
        self.accept_help(block)
    }

    fn accept_help(&self, block: CommentBlock) -> Option<CommentBlock> {
        help::is_help(&block.body(self.src)).then_some(block)
    }

    /// A comment token alone on its line(s); line comments extend over
    /// directly adjacent `#` lines.
    fn comment_block_ending_at(&self, end: usize) -> Option<CommentBlock> {
        let tok = self.tokens[end];
        if !tok.is_comment() {
            return None;
        }
        let mut first = end;
        if tok.kind == TokenKind::LineComment {
            while first >= 2
                && self.tokens[first - 1].kind == TokenKind::Newline
                && self.tokens[first - 2].kind == TokenKind::LineComment
                && self.owns_line(first - 2)
            {
                first -= 2;
            }
        }
        if !self.owns_line(first) {
            return None;
        }
        Some(self.block(first, end))
    }

    fn comment_block_starting_at(&self, start: usize, to: usize) -> Option<CommentBlock> {
        let tok = self.tokens[start];
        if !tok.is_comment() {
            return None;
        }
        let mut last = start;
        if tok.kind == TokenKind::LineComment {
            while last + 2 < to
                && self.tokens[last + 1].kind == TokenKind::Newline
                && self.tokens[last + 2].kind == TokenKind::LineComment
            {
                last += 2;
            }
        }
        Some(self.block(start, last))
    }

    fn block(&self, first: usize, last: usize) -> CommentBlock {
        let style = match self.tokens[first].kind {
            TokenKind::BlockComment => CommentStyle::Block,
            _ => CommentStyle::Lines,
        };
        CommentBlock {
            style,
            span: Span {
                start: self.tokens[first].start,
                end: self.tokens[last].end,
            },
        }
    }

    /// Nothing but whitespace precedes token `i` on its line.
    fn owns_line(&self, i: usize) -> bool {
        i == 0 || self.tokens[i - 1].kind == TokenKind::Newline
    }

    fn script_data(&self) -> ScriptData {
        let to = self.tokens.len();
        let (attributes, param_list) = self.param_block(0, to);
        ScriptData {
            parts: DefinitionParts {
                help: self.script_help(),
                attributes,
                param_list,
            },
            script_info: self.script_info(),
        }
    }

    fn script_info(&self) -> Option<Span> {
        self.tokens
            .iter()
            .find(|t| {
                t.kind == TokenKind::BlockComment
                    && t.text(self.src)
                        .get(..14)
                        .is_some_and(|p| p.eq_ignore_ascii_case("<#PSScriptInfo"))
            })
            .map(|t| Span {
                start: t.start,
                end: t.end,
            })
    }

    /// First help block among the leading comments, unless it sits right
    /// above a function; otherwise the last help block of the file.
    fn script_help(&self) -> Option<CommentBlock> {
        let to = self.tokens.len();
        let mut i = self.skip_newlines(0, to);
        while i < to && self.tokens[i].is_comment() {
            let block = self.comment_block_starting_at(i, to)?;
            let last = self.last_token_of(&block, i);
            let next = self.skip_newlines(last + 1, to);
            let is_info = self.tokens[i].kind == TokenKind::BlockComment
                && self.script_info().is_some_and(|s| s.start == block.span.start);
            if !is_info && help::is_help(&block.body(self.src)) {
                let newlines = next - (last + 1);
                let owned_by_function = next < to
                    && FUNCTION_KEYWORDS
                        .iter()
                        .any(|kw| self.tokens[next].is_word(self.src, kw))
                    && newlines < 3;
                if !owned_by_function {
                    return Some(block);
                }
                break;
            }
            i = next;
        }

        let mut j = to;
        while j > 0 && self.tokens[j - 1].kind == TokenKind::Newline {
            j -= 1;
        }
        if j == 0 || j <= i {
            return None;
        }
        let block = self.comment_block_ending_at(j - 1)?;
        self.accept_help(block)
    }

    fn last_token_of(&self, block: &CommentBlock, first: usize) -> usize {
        (first..self.tokens.len())
            .find(|&j| self.tokens[j].end == block.span.end)
            .unwrap_or(first)
    }
}

fn strip_scope(name: &str) -> &str {
    for prefix in SCOPE_PREFIXES {
        if name.len() > prefix.len()
            && name.get(..prefix.len()).is_some_and(|p| p.eq_ignore_ascii_case(prefix))
        {
            return &name[prefix.len()..];
        }
    }
    name
}
