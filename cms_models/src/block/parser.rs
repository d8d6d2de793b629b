//! Parser of the serialized block grammar
//!
//! Blocks are delimited by HTML comments: `<!-- wp:core/quote {"a":1} -->`, closed by
//! `<!-- /wp:core/quote -->`, or self-closing as `<!-- wp:spacer /-->`. Names without a
//! namespace belong to `core/`. Whatever sits between top-level blocks is kept as freeform
//! blocks without a name.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Map;
use serde_json::Value;

use super::Block;

static DELIMITER_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<!--\s+(?P<closer>/)?wp:(?P<namespace>[a-z][a-z0-9_-]*/)?(?P<name>[a-z][a-z0-9_-]*)\s+",
    )
    .unwrap()
});
static ATTRS_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\}\s+(?P<void>/)?-->").unwrap());
static BARE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?P<void>/)?-->").unwrap());

#[derive(Debug, PartialEq)]
enum TokenKind {
    Opener,
    Closer,
    Void,
}

#[derive(Debug)]
struct Token {
    kind: TokenKind,
    name: String,
    attrs: Map<String, Value>,
    start: usize,
    len: usize,
}

impl Token {
    fn end(&self) -> usize {
        self.start + self.len
    }

    fn into_block(self) -> Block {
        Block {
            block_name: Some(self.name),
            attrs: self.attrs,
            ..Default::default()
        }
    }
}

/// A block whose closing delimiter has not been reached yet
struct Frame {
    block: Block,
    token_start: usize,
    token_len: usize,
    /// Where the markup not yet attributed to the block starts
    prev_offset: usize,
    /// Start of freeform markup preceding a top-level block
    leading_html_start: Option<usize>,
}

/// Finds the next well-formed delimiter at or after `offset`
fn next_token(document: &str, offset: usize) -> Option<Token> {
    let mut search_from = offset;
    while let Some(captures) = DELIMITER_START.captures_at(document, search_from) {
        let whole = captures.get(0)?;
        let after_name = whole.end();
        let closer = captures.name("closer").is_some();
        let name = match captures.name("namespace") {
            Some(namespace) => format!("{}{}", namespace.as_str(), &captures["name"]),
            None => format!("core/{}", &captures["name"]),
        };

        let rest = &document[after_name..];
        let parsed = if rest.starts_with('{') {
            ATTRS_END.captures(rest).map(|end| {
                let end_match = end.get(0).map_or(0, |m| m.start());
                // the closing brace belongs to the attributes
                let raw_attrs = &rest[..end_match + 1];
                let attrs = serde_json::from_str::<Map<String, Value>>(raw_attrs)
                    .unwrap_or_else(|error| {
                        tracing::debug!(%error, block = %name, "ignoring unparsable block attributes");
                        Map::new()
                    });
                let len = end.get(0).map_or(0, |m| m.end());
                (attrs, end.name("void").is_some(), len)
            })
        } else {
            BARE_END.captures(rest).map(|end| {
                let len = end.get(0).map_or(0, |m| m.end());
                (Map::new(), end.name("void").is_some(), len)
            })
        };

        match parsed {
            Some((attrs, void, len)) => {
                let kind = match (closer, void) {
                    (true, _) => TokenKind::Closer,
                    (false, true) => TokenKind::Void,
                    (false, false) => TokenKind::Opener,
                };
                return Some(Token {
                    kind,
                    name,
                    attrs,
                    start: whole.start(),
                    len: after_name - whole.start() + len,
                });
            }
            // not a delimiter after all, keep looking
            None => search_from = whole.start() + 1,
        }
    }
    None
}

struct Parser<'a> {
    document: &'a str,
    offset: usize,
    output: Vec<Block>,
    stack: Vec<Frame>,
}

impl<'a> Parser<'a> {
    fn new(document: &'a str) -> Self {
        Self {
            document,
            offset: 0,
            output: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn parse(mut self) -> Vec<Block> {
        while let Some(token) = next_token(self.document, self.offset) {
            if !self.proceed(token) {
                return self.output;
            }
        }
        self.finish();
        self.output
    }

    /// Consumes one delimiter, returns `false` once the rest of the document is consumed
    fn proceed(&mut self, token: Token) -> bool {
        let token_start = token.start;
        let token_end = token.end();
        match token.kind {
            TokenKind::Void => {
                let (start, len) = (token.start, token.len);
                match self.stack.last_mut() {
                    None => {
                        self.push_freeform(self.offset, token_start);
                        self.output.push(token.into_block());
                    }
                    Some(parent) => add_inner_block(
                        self.document,
                        parent,
                        token.into_block(),
                        start,
                        len,
                        None,
                    ),
                }
            }
            TokenKind::Opener => {
                let leading_html_start =
                    (self.stack.is_empty() && token_start > self.offset).then_some(self.offset);
                self.stack.push(Frame {
                    token_start,
                    token_len: token.len,
                    prev_offset: token_end,
                    leading_html_start,
                    block: token.into_block(),
                });
            }
            TokenKind::Closer => {
                let Some(mut frame) = self.stack.pop() else {
                    // a stray closer: the remainder is plain markup
                    self.push_freeform(self.offset, self.document.len());
                    return false;
                };
                if frame.block.block_name.as_deref() != Some(token.name.as_str()) {
                    tracing::debug!(
                        expected = ?frame.block.block_name,
                        found = %token.name,
                        "mismatched block closer"
                    );
                }
                append_html(&mut frame.block, &self.document[frame.prev_offset..token_start]);
                self.close(frame, token_end);
            }
        }
        self.offset = token_end;
        true
    }

    /// Attaches a completed block either to its parent or to the output
    fn close(&mut self, frame: Frame, end: usize) {
        match self.stack.last_mut() {
            Some(parent) => add_inner_block(
                self.document,
                parent,
                frame.block,
                frame.token_start,
                frame.token_len,
                Some(end),
            ),
            None => {
                if let Some(leading) = frame.leading_html_start {
                    self.push_freeform(leading, frame.token_start);
                }
                self.output.push(frame.block);
            }
        }
    }

    /// Closes every block left open and keeps trailing markup
    fn finish(&mut self) {
        let end = self.document.len();
        if self.stack.is_empty() {
            self.push_freeform(self.offset, end);
            return;
        }
        while let Some(mut frame) = self.stack.pop() {
            append_html(&mut frame.block, &self.document[frame.prev_offset..end]);
            self.close(frame, end);
        }
    }

    fn push_freeform(&mut self, start: usize, end: usize) {
        let html = &self.document[start..end];
        if !html.is_empty() {
            self.output.push(Block::freeform(html));
        }
    }
}

fn append_html(block: &mut Block, html: &str) {
    if !html.is_empty() {
        block.inner_html.push_str(html);
        block.inner_content.push(Some(html.to_owned()));
    }
}

fn add_inner_block(
    document: &str,
    parent: &mut Frame,
    block: Block,
    token_start: usize,
    token_len: usize,
    last_offset: Option<usize>,
) {
    append_html(&mut parent.block, &document[parent.prev_offset..token_start]);
    parent.block.inner_content.push(None);
    parent.block.inner_blocks.push(block);
    parent.prev_offset = last_offset.unwrap_or(token_start + token_len);
}

/// Parses a document body into its top-level blocks
pub fn parse_blocks(document: &str) -> Vec<Block> {
    Parser::new(document).parse()
}
