//! Markdown export of a pattern article.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use regex::Regex;

use crate::core::catalog::Pattern;

const PATTERN_TEMPLATE: &str = include_str!("../../templates/pattern.md");

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag regex should be valid"));

static ENGINE: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_template("pattern_markdown", PATTERN_TEMPLATE)
        .expect("pattern markdown template should be valid");
    env
});

/// Render a pattern as a standalone markdown document.
pub fn render_markdown(pattern: &Pattern) -> Result<String> {
    let template = ENGINE.get_template("pattern_markdown")?;
    let rendered = template
        .render(context! {
            pattern => pattern,
            category => capitalize_first(&pattern.category),
            kind => capitalize_first(&pattern.kind),
            difficulty => capitalize_first(&pattern.difficulty),
            content => strip_html(&pattern.content),
        })
        .with_context(|| format!("render markdown for {}", pattern.slug))?;
    Ok(rendered.trim().to_string())
}

/// Remove anything that looks like an HTML tag.
pub fn strip_html(html: &str) -> String {
    HTML_TAG.replace_all(html, "").into_owned()
}

/// Uppercase the first character, leaving the rest untouched.
fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{RealWorldExample, Reference, RelatedPattern};

    fn sample() -> Pattern {
        Pattern {
            id: 1,
            name: "Singleton".to_string(),
            slug: "singleton".to_string(),
            description: "One instance".to_string(),
            category: "javascript".to_string(),
            difficulty: "beginner".to_string(),
            kind: "creational".to_string(),
            content: "<p>Only <b>one</b>.</p>".to_string(),
            code_example: "const a = 1;".to_string(),
            code_template: String::new(),
            related_patterns: vec![RelatedPattern {
                id: 2,
                name: "Factory".to_string(),
                description: "Makes things".to_string(),
            }],
            real_world_examples: vec![
                RealWorldExample {
                    title: "Pool".to_string(),
                    description: "Shared pool".to_string(),
                },
                RealWorldExample {
                    title: "Config".to_string(),
                    description: "Shared settings".to_string(),
                },
            ],
            benefits: vec!["Simple".to_string(), "Global".to_string()],
            drawbacks: vec!["Hidden state".to_string()],
            further_reading: vec![
                Reference {
                    title: "Docs".to_string(),
                    description: "Read this".to_string(),
                    url: Some("https://example.com".to_string()),
                },
                Reference {
                    title: "Book".to_string(),
                    description: "Offline".to_string(),
                    url: None,
                },
            ],
        }
    }

    #[test]
    fn renders_full_document() {
        let markdown = render_markdown(&sample()).expect("render");
        let expected = "# Singleton\n\nOne instance\n\n## Category\n\nJavascript\n\n## Type\n\nCreational\n\n## Difficulty\n\nBeginner\n\n## Description\n\nOnly one.\n\n## Implementation Example\n\n```javascript\nconst a = 1;\n```\n\n## Real-World Applications\n\n### Pool\n\nShared pool\n\n### Config\n\nShared settings\n\n## Benefits\n\n- Simple\n- Global\n\n## Drawbacks\n\n- Hidden state\n\n## Related Patterns\n\n- **Factory**: Makes things\n\n## Further Reading\n\n- [Docs](https://example.com): Read this\n- [Book](#): Offline\n\n---\n\nGenerated from JS Design Patterns Learning Platform";
        assert_eq!(markdown, expected);
    }

    #[test]
    fn strip_html_removes_tags_only() {
        assert_eq!(strip_html("<p>a &lt; b</p>"), "a &lt; b");
    }

    #[test]
    fn capitalize_first_keeps_tail() {
        assert_eq!(capitalize_first("nodejs"), "Nodejs");
        assert_eq!(capitalize_first(""), "");
    }
}
