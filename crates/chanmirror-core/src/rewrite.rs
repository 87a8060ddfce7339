//! Caption/body rewriting applied before anything is sent.
//!
//! Rules run in file order. Entity ranges are kept valid in UTF-16 units:
//! entities before a match stay, entities after it shift, entities enclosing
//! it grow or shrink, and entities cut by it are dropped.

use std::{fs, mem, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    errors::Error,
    transport::types::TextEntity,
    utils::{utf16_len, utf16_offset},
    Result,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    #[default]
    Literal,
    Regex,
}

/// One rule as stored in the rules file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    #[serde(rename = "type", default)]
    pub kind: RuleKind,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
}

#[derive(Debug)]
enum Matcher {
    Literal(String),
    Regex(Regex),
}

#[derive(Debug)]
struct CompiledRule {
    matcher: Matcher,
    replacement: String,
}

impl CompiledRule {
    /// Non-overlapping matches in ascending order as (start, end, replacement).
    fn spans(&self, text: &str) -> Vec<(usize, usize, String)> {
        match &self.matcher {
            Matcher::Literal(pat) => text
                .match_indices(pat.as_str())
                .map(|(i, m)| (i, i + m.len(), self.replacement.clone()))
                .collect(),
            Matcher::Regex(re) => re
                .captures_iter(text)
                .filter_map(|caps| {
                    let m = caps.get(0)?;
                    if m.start() == m.end() {
                        return None;
                    }
                    let mut dst = String::new();
                    caps.expand(&self.replacement, &mut dst);
                    Some((m.start(), m.end(), dst))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CaptionRewriter {
    rules: Vec<CompiledRule>,
    header: String,
    footer: String,
}

impl CaptionRewriter {
    pub fn new(rules: Vec<RewriteRule>, header: String, footer: String) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            if rule.pattern.is_empty() {
                return Err(Error::Config("rewrite rule with empty pattern".to_string()));
            }
            let matcher = match rule.kind {
                RuleKind::Literal => Matcher::Literal(rule.pattern),
                RuleKind::Regex => Matcher::Regex(Regex::new(&rule.pattern).map_err(|e| {
                    Error::Config(format!("invalid rewrite regex `{}`: {e}", rule.pattern))
                })?),
            };
            compiled.push(CompiledRule {
                matcher,
                replacement: rule.replacement,
            });
        }
        Ok(Self {
            rules: compiled,
            header,
            footer,
        })
    }

    /// Load rules from a JSON array file.
    pub fn load(path: &Path, header: String, footer: String) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let rules: Vec<RewriteRule> = serde_json::from_str(&raw)?;
        let rewriter = Self::new(rules, header, footer)?;
        info!(
            path = %path.display(),
            rules = rewriter.rules.len(),
            "rewrite rules loaded"
        );
        Ok(rewriter)
    }

    pub fn is_noop(&self) -> bool {
        self.rules.is_empty() && self.header.is_empty() && self.footer.is_empty()
    }

    /// Rewrite a body and its entities. Empty bodies stay empty, and a body
    /// blanked by the rules comes back empty without header or footer.
    pub fn apply(&self, text: &str, entities: &[TextEntity]) -> (String, Vec<TextEntity>) {
        let mut text = text.to_string();
        let mut entities = entities.to_vec();
        if text.is_empty() || self.is_noop() {
            return (text, entities);
        }

        for rule in &self.rules {
            // Back to front so earlier byte offsets stay valid.
            for (start, end, replacement) in rule.spans(&text).into_iter().rev() {
                splice(&mut text, &mut entities, start, end, &replacement);
            }
        }

        // Rules may blank the body; header/footer only wrap real content.
        if text.trim().is_empty() {
            return (String::new(), Vec::new());
        }

        if !self.header.is_empty() {
            let shift = utf16_len(&self.header) as i32;
            for e in &mut entities {
                e.offset += shift;
            }
            text.insert_str(0, &self.header);
        }
        text.push_str(&self.footer);

        (text, entities)
    }
}

fn splice(
    text: &mut String,
    entities: &mut Vec<TextEntity>,
    start: usize,
    end: usize,
    replacement: &str,
) {
    let m_start = utf16_offset(text, start) as i32;
    let m_end = m_start + utf16_len(&text[start..end]) as i32;
    let diff = utf16_len(replacement) as i32 - (m_end - m_start);

    *entities = mem::take(entities)
        .into_iter()
        .filter_map(|mut e| {
            if e.end() <= m_start {
                Some(e)
            } else if e.offset >= m_end {
                e.offset += diff;
                Some(e)
            } else if e.offset <= m_start && e.end() >= m_end {
                e.length += diff;
                (e.length > 0).then_some(e)
            } else {
                None
            }
        })
        .collect();

    text.replace_range(start..end, replacement);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::types::EntityKind;
    use std::path::PathBuf;
    use std::time::Duration;

    fn literal(pattern: &str, replacement: &str) -> RewriteRule {
        RewriteRule {
            kind: RuleKind::Literal,
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }

    fn bold(offset: i32, length: i32) -> TextEntity {
        TextEntity::new(offset, length, EntityKind::Bold)
    }

    #[test]
    fn literal_replacement_shifts_following_entities() {
        let rw = CaptionRewriter::new(vec![literal("cat", "tiger")], String::new(), String::new())
            .unwrap();
        // "a cat and dog": bold on "dog" (10..13)
        let (text, ents) = rw.apply("a cat and dog", &[bold(0, 1), bold(10, 3)]);
        assert_eq!(text, "a tiger and dog");
        assert_eq!(ents, vec![bold(0, 1), bold(12, 3)]);
    }

    #[test]
    fn enclosing_entity_resizes_and_cut_entity_is_dropped() {
        let rw = CaptionRewriter::new(vec![literal("bb", "")], String::new(), String::new())
            .unwrap();
        // "aabbcc": whole-text entity encloses the match, (3,3) is cut by it
        let (text, ents) = rw.apply("aabbcc", &[bold(0, 6), bold(3, 3)]);
        assert_eq!(text, "aacc");
        assert_eq!(ents, vec![bold(0, 4)]);
    }

    #[test]
    fn regex_rules_expand_groups_and_respect_utf16() {
        let rule = RewriteRule {
            kind: RuleKind::Regex,
            pattern: r"@(\w+)".to_string(),
            replacement: "[$1]".to_string(),
        };
        let rw = CaptionRewriter::new(vec![rule], String::new(), String::new()).unwrap();
        // "😀 @chan x": emoji is 2 units, entity on "x" at 9
        let (text, ents) = rw.apply("😀 @chan x", &[bold(9, 1)]);
        assert_eq!(text, "😀 [chan] x");
        assert_eq!(ents, vec![bold(10, 1)]);
    }

    #[test]
    fn header_and_footer_wrap_non_empty_bodies_only() {
        let rw = CaptionRewriter::new(vec![], "» ".to_string(), "\n-- mirror".to_string()).unwrap();
        let (text, ents) = rw.apply("hi", &[bold(0, 2)]);
        assert_eq!(text, "» hi\n-- mirror");
        assert_eq!(ents, vec![bold(2, 2)]);

        let (empty, _) = rw.apply("", &[]);
        assert!(empty.is_empty());
    }

    #[test]
    fn body_blanked_by_rules_gets_no_header_or_footer() {
        let rw = CaptionRewriter::new(
            vec![literal("spam", "")],
            "» ".to_string(),
            "\n-- mirror".to_string(),
        )
        .unwrap();

        let (text, ents) = rw.apply("spam", &[bold(0, 4)]);
        assert!(text.is_empty());
        assert!(ents.is_empty());

        let (text, _) = rw.apply(" spam ", &[]);
        assert!(text.is_empty());
    }

    #[test]
    fn replacement_containing_pattern_terminates() {
        let rw = CaptionRewriter::new(vec![literal("a", "aa")], String::new(), String::new())
            .unwrap();
        assert_eq!(rw.apply("aba", &[]).0, "aabaa");
    }

    #[test]
    fn invalid_rules_are_config_errors() {
        let bad = RewriteRule {
            kind: RuleKind::Regex,
            pattern: "(".to_string(),
            replacement: String::new(),
        };
        assert!(matches!(
            CaptionRewriter::new(vec![bad], String::new(), String::new()),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            CaptionRewriter::new(vec![literal("", "x")], String::new(), String::new()),
            Err(Error::Config(_))
        ));
    }

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.json"))
    }

    #[test]
    fn loads_rules_from_json_file() {
        let path = tmp_file("chanmirror-rules-test");
        std::fs::write(
            &path,
            r#"[{"type":"regex","pattern":"t\\.me/\\S+","replacement":"t.me/mirror"},
                {"pattern":"foo","replacement":"bar"}]"#,
        )
        .unwrap();

        let rw = CaptionRewriter::load(&path, String::new(), String::new()).unwrap();
        let (text, _) = rw.apply("foo at t.me/source", &[]);
        assert_eq!(text, "bar at t.me/mirror");

        let _ = std::fs::remove_file(&path);
    }
}
