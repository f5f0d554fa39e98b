use std::path::{Path, PathBuf};
use std::{error::Error, fmt, fs, io};

/// Seed coordinates read from an HTML page.
///
/// Values come from elements whose `class` attribute contains the token `x`
/// or `y`, in document order. Agent `i` takes `xs[i]` and `ys[i]` when present;
/// the two axes are consumed independently.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartPositions {
    pub xs: Vec<i64>,
    pub ys: Vec<i64>,
}

#[derive(Debug)]
pub enum StartPositionsError {
    InvalidCoordinate {
        axis: char,
        index: usize,
        value: String,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Fetch {
        url: String,
        message: String,
    },
}

impl fmt::Display for StartPositionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartPositionsError::InvalidCoordinate { axis, index, value } => write!(
                f,
                "{axis} coordinate #{index} is not an integer: {value:?}"
            ),
            StartPositionsError::Io { path, .. } => {
                write!(f, "unable to read start positions from {}", path.display())
            }
            StartPositionsError::Fetch { url, message } => {
                write!(f, "unable to fetch start positions from {url}: {message}")
            }
        }
    }
}

impl Error for StartPositionsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StartPositionsError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl StartPositions {
    pub fn from_html(html: &str) -> Result<Self, StartPositionsError> {
        let mut positions = Self::default();
        for (class, text) in classed_text(html) {
            let axis = if has_class(class, "x") {
                'x'
            } else if has_class(class, "y") {
                'y'
            } else {
                continue;
            };
            let list = if axis == 'x' {
                &mut positions.xs
            } else {
                &mut positions.ys
            };
            let value = text.trim();
            let parsed = value
                .parse::<i64>()
                .map_err(|_| StartPositionsError::InvalidCoordinate {
                    axis,
                    index: list.len(),
                    value: value.to_string(),
                })?;
            list.push(parsed);
        }
        Ok(positions)
    }

    pub fn load_file(path: &Path) -> Result<Self, StartPositionsError> {
        let html = fs::read_to_string(path).map_err(|source| StartPositionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_html(&html)
    }

    pub fn x(&self, index: usize) -> Option<i64> {
        self.xs.get(index).copied()
    }

    pub fn y(&self, index: usize) -> Option<i64> {
        self.ys.get(index).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty() && self.ys.is_empty()
    }
}

fn has_class(class_attr: &str, token: &str) -> bool {
    class_attr.split_whitespace().any(|c| c == token)
}

enum Token<'a> {
    Open {
        name: &'a str,
        body: &'a str,
        self_closing: bool,
    },
    Close(&'a str),
    Text(&'a str),
}

/// Split `html` into tags and text. Comments, doctypes and processing
/// instructions are dropped.
fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut rest = html;
    while !rest.is_empty() {
        let Some(open) = rest.find('<') else {
            out.push(Token::Text(rest));
            break;
        };
        if open > 0 {
            out.push(Token::Text(&rest[..open]));
        }
        rest = &rest[open..];
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }
        let Some(close) = tag_end(rest) else {
            break;
        };
        let body = &rest[1..close];
        rest = &rest[close + 1..];
        if let Some(name) = body.strip_prefix('/') {
            out.push(Token::Close(name.trim()));
        } else if !(body.starts_with('!') || body.starts_with('?')) {
            let name_end = body
                .find(|c: char| c.is_whitespace() || c == '/')
                .unwrap_or(body.len());
            out.push(Token::Open {
                name: &body[..name_end],
                body,
                self_closing: body.trim_end().ends_with('/'),
            });
        }
    }
    out
}

/// Byte offset of the `>` closing the tag at the start of `text`, ignoring
/// any `>` inside quoted attribute values.
fn tag_end(text: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in text.bytes().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

/// Yield `(class attribute, text content)` for each element that carries a
/// class, in document order. Text content joins every text node up to the
/// element's matching close tag, nested markup included.
fn classed_text(html: &str) -> Vec<(&str, String)> {
    let tokens = tokenize(html);
    let mut out = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let &Token::Open {
            name,
            body,
            self_closing,
        } = token
        else {
            continue;
        };
        let Some(class) = attribute(body, "class") else {
            continue;
        };
        let mut text = String::new();
        if !self_closing {
            let mut depth = 0usize;
            for inner in &tokens[i + 1..] {
                match inner {
                    Token::Text(t) => text.push_str(t),
                    Token::Open {
                        name: n,
                        self_closing: false,
                        ..
                    } if n.eq_ignore_ascii_case(name) => depth += 1,
                    Token::Close(n) if n.eq_ignore_ascii_case(name) => {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                    _ => {}
                }
            }
        }
        out.push((class, text));
    }
    out
}

/// Value of attribute `wanted` inside a tag body such as `td class="x"`.
fn attribute<'a>(tag: &'a str, wanted: &str) -> Option<&'a str> {
    let name_end = tag
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(tag.len());
    let mut rest = &tag[name_end..];
    loop {
        rest = rest.trim_start();
        if let Some(r) = rest.strip_prefix('/') {
            rest = r;
            continue;
        }
        if rest.is_empty() {
            return None;
        }
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace() || c == '/')
            .unwrap_or(rest.len());
        let key = &rest[..key_end];
        rest = rest[key_end..].trim_start();
        let value = match rest.strip_prefix('=') {
            Some(r) => {
                let r = r.trim_start();
                match r.chars().next() {
                    Some(q @ ('"' | '\'')) => {
                        let inner = &r[1..];
                        let end = inner.find(q).unwrap_or(inner.len());
                        rest = inner.get(end + 1..).unwrap_or("");
                        &inner[..end]
                    }
                    _ => {
                        let end = r.find(char::is_whitespace).unwrap_or(r.len());
                        rest = &r[end..];
                        &r[..end]
                    }
                }
            }
            None => "",
        };
        if key.eq_ignore_ascii_case(wanted) {
            return Some(value);
        }
    }
}
