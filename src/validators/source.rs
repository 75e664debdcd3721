//! Lightweight structural scanning of Python-shaped sources.
//!
//! This is not an AST. It is a line/indentation scanner that recovers just
//! enough structure (def/class blocks and their extents) for the structural
//! rule checks, plus a string/comment masker the textual checks share.
//!
//! Validation is two-tier: checks that need structure consume
//! [`ParseOutcome::Parsed`] and silently skip on [`ParseOutcome::Unparsed`];
//! purely textual checks always run. Unparseable input therefore degrades to
//! a reduced check set instead of failing the whole validator.

use std::sync::LazyLock;

use regex::Regex;

/// Result of the structural scan.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Parsed(SourceStructure),
    /// Input was not recognizable as line-structured source (e.g. binary).
    Unparsed,
}

impl ParseOutcome {
    pub fn structure(&self) -> Option<&SourceStructure> {
        match self {
            Self::Parsed(s) => Some(s),
            Self::Unparsed => None,
        }
    }
}

/// What kind of definition a block is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Function,
    Class,
}

/// One `def` or `class` block with its extent.
#[derive(Debug, Clone)]
pub struct DefBlock {
    pub kind: DefKind,
    pub name: String,
    /// 1-based line of the `def`/`class` statement.
    pub line: usize,
    /// 1-based last line of the body (trailing blanks excluded).
    pub end_line: usize,
    /// Leading whitespace width of the statement (tabs count as 4).
    pub indent: usize,
    /// The full statement line, for signature-level checks.
    pub signature: String,
}

impl DefBlock {
    /// Block length in lines, statement line included.
    pub fn len_lines(&self) -> usize {
        self.end_line.saturating_sub(self.line) + 1
    }
}

/// All definitions found in a file, in source order.
#[derive(Debug, Clone)]
pub struct SourceStructure {
    pub defs: Vec<DefBlock>,
}

impl SourceStructure {
    pub fn functions(&self) -> impl Iterator<Item = &DefBlock> {
        self.defs.iter().filter(|d| d.kind == DefKind::Function)
    }

    pub fn classes(&self) -> impl Iterator<Item = &DefBlock> {
        self.defs.iter().filter(|d| d.kind == DefKind::Class)
    }

    /// Direct methods of a class: contained functions at the shallowest
    /// nesting level inside the class body.
    pub fn methods_of<'a>(&'a self, class: &DefBlock) -> Vec<&'a DefBlock> {
        let contained: Vec<&DefBlock> = self
            .functions()
            .filter(|f| f.line > class.line && f.line <= class.end_line && f.indent > class.indent)
            .collect();
        let Some(min_indent) = contained.iter().map(|f| f.indent).min() else {
            return Vec::new();
        };
        contained
            .into_iter()
            .filter(|f| f.indent == min_indent)
            .collect()
    }
}

static DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_]\w*)").expect("def pattern should compile")
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)class\s+([A-Za-z_]\w*)").expect("class pattern should compile")
});

/// Indentation width with tabs counted as 4 columns.
pub fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// Scan `content` into def/class blocks.
///
/// Returns `Unparsed` only for input that is not line-structured text at all
/// (NUL bytes). Plain text with no definitions parses to an empty structure.
pub fn parse(content: &str) -> ParseOutcome {
    if content.contains('\u{0}') {
        return ParseOutcome::Unparsed;
    }

    let lines: Vec<&str> = content.lines().collect();
    let masked = mask_code(content);
    let mut defs = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        // Match on masked lines so `def` inside a string does not count.
        let candidate = &masked[idx];
        let (indent, name, kind) = if let Some(caps) = DEF_RE.captures(candidate) {
            (
                indent_width(&caps[1]),
                caps[2].to_string(),
                DefKind::Function,
            )
        } else if let Some(caps) = CLASS_RE.captures(candidate) {
            (indent_width(&caps[1]), caps[2].to_string(), DefKind::Class)
        } else {
            continue;
        };

        // Extent: subsequent lines that are blank or indented deeper.
        let mut end = idx;
        for (j, body_line) in lines.iter().enumerate().skip(idx + 1) {
            if body_line.trim().is_empty() {
                continue;
            }
            if indent_width(body_line) > indent {
                end = j;
            } else {
                break;
            }
        }

        defs.push(DefBlock {
            kind,
            name,
            line: idx + 1,
            end_line: end + 1,
            indent,
            signature: line.to_string(),
        });
    }

    ParseOutcome::Parsed(SourceStructure { defs })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrState {
    None,
    Single(char),
    Triple(char),
}

/// Blank out string literals and `#` comments, preserving column positions.
///
/// Heuristic state machine: handles single/double quotes, backslash escapes,
/// and triple-quoted strings spanning lines. Unterminated single-line strings
/// reset at end of line.
pub fn mask_code(content: &str) -> Vec<String> {
    let mut state = StrState::None;
    let mut out = Vec::new();

    for line in content.lines() {
        let chars: Vec<char> = line.chars().collect();
        let mut masked = String::with_capacity(line.len());
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match state {
                StrState::Triple(q) => {
                    if c == q && chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q) {
                        state = StrState::None;
                        masked.push_str("   ");
                        i += 3;
                    } else {
                        masked.push(' ');
                        i += 1;
                    }
                }
                StrState::Single(q) => {
                    if c == '\\' {
                        masked.push_str("  ");
                        i += 2;
                    } else if c == q {
                        state = StrState::None;
                        masked.push(' ');
                        i += 1;
                    } else {
                        masked.push(' ');
                        i += 1;
                    }
                }
                StrState::None => {
                    if c == '#' {
                        // Rest of line is a comment.
                        break;
                    } else if c == '"' || c == '\'' {
                        if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                            state = StrState::Triple(c);
                            masked.push_str("   ");
                            i += 3;
                        } else {
                            state = StrState::Single(c);
                            masked.push(' ');
                            i += 1;
                        }
                    } else {
                        masked.push(c);
                        i += 1;
                    }
                }
            }
        }

        // An unterminated non-triple string does not continue past the line.
        if let StrState::Single(_) = state {
            state = StrState::None;
        }
        out.push(masked);
    }

    out
}

/// Extract comment texts as `(1-based line, text after '#')` pairs.
///
/// Uses the mask to find where code ends, so `#` inside strings is ignored.
pub fn comments(content: &str) -> Vec<(usize, String)> {
    let masked = mask_code(content);
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let code_len = masked[idx].chars().count();
            let chars: Vec<char> = line.chars().collect();
            if code_len < chars.len() {
                let tail: String = chars[code_len..].iter().collect();
                let tail = tail.trim_start();
                tail.strip_prefix('#')
                    .map(|c| (idx + 1, c.trim().to_string()))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
import os


def top_level(x):
    y = x + 1
    return y


class Solver:
    \"\"\"A solver.\"\"\"

    def step(self):
        return 1

    def run(self):
        return 2
";

    fn structure(content: &str) -> SourceStructure {
        match parse(content) {
            ParseOutcome::Parsed(s) => s,
            ParseOutcome::Unparsed => panic!("expected parsed structure"),
        }
    }

    #[test]
    fn finds_functions_and_classes() {
        let s = structure(SAMPLE);
        assert_eq!(s.functions().count(), 3);
        assert_eq!(s.classes().count(), 1);
    }

    #[test]
    fn block_extents_cover_bodies() {
        let s = structure(SAMPLE);
        let top = s.functions().find(|f| f.name == "top_level").unwrap();
        assert_eq!(top.line, 4);
        assert_eq!(top.end_line, 6);
        assert_eq!(top.len_lines(), 3);
    }

    #[test]
    fn methods_of_finds_direct_methods() {
        let s = structure(SAMPLE);
        let class = s.classes().next().unwrap();
        let methods = s.methods_of(class);
        assert_eq!(methods.len(), 2);
        assert!(methods.iter().any(|m| m.name == "step"));
    }

    #[test]
    fn nul_bytes_mean_unparsed() {
        assert!(matches!(parse("abc\u{0}def"), ParseOutcome::Unparsed));
    }

    #[test]
    fn plain_text_parses_to_empty_structure() {
        let s = structure("just some notes\nnothing here\n");
        assert!(s.defs.is_empty());
    }

    #[test]
    fn def_inside_string_is_not_a_definition() {
        let s = structure("template = \"def fake(): pass\"\n");
        assert!(s.defs.is_empty());
    }

    #[test]
    fn mask_blanks_strings_and_comments() {
        let masked = mask_code("x = \"(\" + '('  # (unbalanced in comment\n");
        assert!(!masked[0].contains('('));
        assert!(!masked[0].contains('#'));
    }

    #[test]
    fn mask_handles_triple_quotes_across_lines() {
        let masked = mask_code("s = \"\"\"\n( [ {\n\"\"\"\nx = (1)\n");
        assert!(!masked[1].contains('('));
        assert!(masked[3].contains('('));
    }

    #[test]
    fn comments_skips_hash_inside_strings() {
        let found = comments("url = \"http://x#y\"\n# real comment\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0], (2, "real comment".to_string()));
    }

    #[test]
    fn async_def_is_recognized() {
        let s = structure("async def fetch(url):\n    return url\n");
        assert_eq!(s.functions().count(), 1);
    }
}
