// src/deps/depfile.rs

//! Parser for Makefile-style dependency records as written by
//! `cc -MMD -MF <record> -MT <object>`:
//!
//! ```make
//! build/obj/app/main.c.o: src/app/main.c include/app/app.h \
//!   include/app/config.h
//! include/app/app.h:
//! # dirbuild-signature: 5f0c...
//! ```
//!
//! Escapes: `\ ` is a space inside a path, `\#` a literal hash, `$$` a
//! literal dollar. A trailing `\` continues the line.

use std::path::{Path, PathBuf};

use super::signature::SIGNATURE_PREFIX;

/// Parsed content of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Depfile {
    /// Targets of the first rule (normally just the object).
    pub targets: Vec<PathBuf>,
    /// Every prerequisite of every rule, in order of appearance, deduplicated.
    pub prerequisites: Vec<PathBuf>,
    /// Command signature stamped after a successful compile.
    pub signature: Option<String>,
}

/// Parse record content. The error string says why the record is corrupt.
pub fn parse_depfile(content: &str) -> Result<Depfile, String> {
    let mut depfile = Depfile::default();
    let mut saw_rule = false;

    for line in logical_lines(content)? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') {
            if let Some(sig) = trimmed.strip_prefix(SIGNATURE_PREFIX) {
                let sig = sig.trim();
                if sig.is_empty() || !sig.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(format!("malformed signature line '{trimmed}'"));
                }
                depfile.signature = Some(sig.to_string());
            }
            continue;
        }

        let (targets, prerequisites) = split_rule(&line)?;
        if !saw_rule {
            if targets.is_empty() {
                return Err("first rule has no target".to_string());
            }
            depfile.targets = targets;
            saw_rule = true;
        }
        for p in prerequisites {
            if !depfile.prerequisites.contains(&p) {
                depfile.prerequisites.push(p);
            }
        }
    }

    if !saw_rule {
        return Err("no `target: prerequisites` rule found".to_string());
    }
    Ok(depfile)
}

/// Render a single `target: prerequisites` rule, escaping what the parser
/// unescapes.
pub fn render_rule(target: &Path, prerequisites: &[&Path]) -> String {
    let mut rule = escape_path(target);
    rule.push(':');
    for prerequisite in prerequisites {
        rule.push(' ');
        rule.push_str(&escape_path(prerequisite));
    }
    rule.push('\n');
    rule
}

fn escape_path(path: &Path) -> String {
    let mut out = String::new();
    for ch in path.display().to_string().chars() {
        match ch {
            ' ' | '#' => {
                out.push('\\');
                out.push(ch);
            }
            '$' => out.push_str("$$"),
            _ => out.push(ch),
        }
    }
    out
}

/// Join backslash-continued physical lines.
fn logical_lines(content: &str) -> Result<Vec<String>, String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continued = false;

    for raw in content.lines() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if continued {
            current.push(' ');
            current.push_str(raw.trim_start());
        } else {
            current.push_str(raw);
        }

        if ends_with_continuation(&current) {
            current.pop();
            continued = true;
        } else {
            lines.push(std::mem::take(&mut current));
            continued = false;
        }
    }

    if continued {
        return Err("record ends in a dangling line continuation (truncated?)".to_string());
    }
    Ok(lines)
}

/// A line continues when it ends in an odd number of backslashes.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split one logical rule line into (targets, prerequisites).
fn split_rule(line: &str) -> Result<(Vec<PathBuf>, Vec<PathBuf>), String> {
    let mut targets = Vec::new();
    let mut prerequisites = Vec::new();
    let mut in_prereqs = false;

    for token in tokenize(line) {
        if in_prereqs {
            prerequisites.push(PathBuf::from(token));
            continue;
        }
        if token == ":" {
            in_prereqs = true;
        } else if let Some(target) = token.strip_suffix(':') {
            targets.push(PathBuf::from(target));
            in_prereqs = true;
        } else if let Some((target, first)) = split_glued_colon(&token) {
            targets.push(PathBuf::from(target));
            if !first.is_empty() {
                prerequisites.push(PathBuf::from(first));
            }
            in_prereqs = true;
        } else {
            targets.push(PathBuf::from(token));
        }
    }

    if !in_prereqs {
        return Err(format!("line without rule separator: '{line}'"));
    }
    Ok((targets, prerequisites))
}

/// `a.o:b.c` written without a space. A colon directly after a single drive
/// letter (`C:\...`) is not a separator.
fn split_glued_colon(token: &str) -> Option<(&str, &str)> {
    let idx = token.find(':')?;
    if idx == 1 && token.as_bytes()[0].is_ascii_alphabetic() {
        return None;
    }
    Some((&token[..idx], &token[idx + 1..]))
}

/// Split on unescaped whitespace, resolving escapes.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.peek() {
                Some(' ') | Some('#') | Some('\\') => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                _ => current.push('\\'),
            },
            '$' if chars.peek() == Some(&'$') => {
                chars.next();
                current.push('$');
            }
            ' ' | '\t' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gcc_record_with_continuations() {
        let content = "build/obj/app/main.c.o: src/app/main.c include/a/a.h \\\n  include/a/b.h\n";
        let dep = parse_depfile(content).unwrap();
        assert_eq!(dep.targets, vec![PathBuf::from("build/obj/app/main.c.o")]);
        assert_eq!(
            dep.prerequisites,
            vec![
                PathBuf::from("src/app/main.c"),
                PathBuf::from("include/a/a.h"),
                PathBuf::from("include/a/b.h"),
            ]
        );
        assert_eq!(dep.signature, None);
    }

    #[test]
    fn phony_header_rules_and_signature() {
        let content = "x.o: x.c x.h\nx.h:\n# dirbuild-signature: abc123\n";
        let dep = parse_depfile(content).unwrap();
        assert_eq!(dep.prerequisites, vec![PathBuf::from("x.c"), PathBuf::from("x.h")]);
        assert_eq!(dep.signature.as_deref(), Some("abc123"));
    }

    #[test]
    fn escaped_spaces_stay_in_paths() {
        let dep = parse_depfile("a.o: my\\ dir/a.c cost$$.h\n").unwrap();
        assert_eq!(
            dep.prerequisites,
            vec![PathBuf::from("my dir/a.c"), PathBuf::from("cost$.h")]
        );
    }

    #[test]
    fn rendered_rules_parse_back() {
        let rule = render_rule(
            Path::new("build/obj/my app/start.s.o"),
            &[Path::new("src/my app/start.s"), Path::new("cost$#1.inc")],
        );
        assert_eq!(rule, "build/obj/my\\ app/start.s.o: src/my\\ app/start.s cost$$\\#1.inc\n");

        let dep = parse_depfile(&rule).unwrap();
        assert_eq!(dep.targets, vec![PathBuf::from("build/obj/my app/start.s.o")]);
        assert_eq!(
            dep.prerequisites,
            vec![PathBuf::from("src/my app/start.s"), PathBuf::from("cost$#1.inc")]
        );
    }

    #[test]
    fn corrupt_records_are_rejected() {
        assert!(parse_depfile("").is_err());
        assert!(parse_depfile("garbage without separator\n").is_err());
        assert!(parse_depfile("a.o: a.c \\").is_err());
        assert!(parse_depfile(": a.c\n").is_err());
        assert!(parse_depfile("a.o: a.c\n# dirbuild-signature: not hex!\n").is_err());
    }
}
