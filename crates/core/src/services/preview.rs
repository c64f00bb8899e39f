//! Builds the single document shown in the preview surface.
//!
//! The entry document is returned as-is. Relative references to sibling
//! stylesheets, scripts or images are not rewritten, so only self-contained
//! documents render completely unless the embedding surface serves the other
//! project files itself.

use serde::Serialize;
use serde_json::Value;

use crate::{
    db::models::File,
    error::{Error, Result},
};

pub const HTML_MIME: &str = "text/html";
pub const MARKUP_EXTENSION: &str = ".html";
pub const ROOT_DOCUMENT: &str = "index.html";

/// Packages whose presence means the project needs a build step or a server.
const FRAMEWORK_PACKAGES: &[&str] = &[
    "next",
    "nuxt",
    "gatsby",
    "@sveltejs/kit",
    "@remix-run/react",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum DocumentSource {
    Entry { path: String },
    Diagnostic { framework: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderableDocument {
    pub mime: &'static str,
    pub body: String,
    #[serde(flatten)]
    pub source: DocumentSource,
}

pub fn generate(files: &[File]) -> Result<RenderableDocument> {
    if let Some(framework) = detect_framework(files) {
        tracing::debug!(framework, "Rendering framework placeholder");
        return Ok(RenderableDocument {
            mime: HTML_MIME,
            body: framework_placeholder(framework, files),
            source: DocumentSource::Diagnostic {
                framework: framework.to_string(),
            },
        });
    }

    let entry = select_entry(files).ok_or(Error::NoEntryPoint)?;
    tracing::debug!(path = %entry.path, "Rendering entry document");

    Ok(RenderableDocument {
        mime: HTML_MIME,
        body: entry.content.clone(),
        source: DocumentSource::Entry {
            path: entry.path.clone(),
        },
    })
}

/// `index.html` anywhere in the project first, otherwise the first markup file.
pub fn select_entry(files: &[File]) -> Option<&File> {
    let mut markup = files.iter().filter(|f| f.path.ends_with(MARKUP_EXTENSION));
    let first = markup.clone().next()?;
    Some(markup.find(|f| f.name() == ROOT_DOCUMENT).unwrap_or(first))
}

fn detect_framework(files: &[File]) -> Option<&'static str> {
    let manifest = files.iter().find(|f| f.name() == "package.json")?;

    match serde_json::from_str::<Value>(&manifest.content) {
        Ok(json) => ["dependencies", "devDependencies"]
            .iter()
            .filter_map(|section| json.get(section).and_then(Value::as_object))
            .find_map(|deps| {
                FRAMEWORK_PACKAGES
                    .iter()
                    .copied()
                    .find(|package| deps.contains_key(*package))
            }),
        // Half-edited manifests still count if they mention a framework.
        Err(_) => FRAMEWORK_PACKAGES
            .iter()
            .copied()
            .find(|package| manifest.content.contains(&format!("\"{package}\""))),
    }
}

fn framework_placeholder(framework: &str, files: &[File]) -> String {
    let listing = files
        .iter()
        .map(|f| escape_html(f.relative_path()))
        .collect::<Vec<_>>()
        .join("<br>\n    ");
    let framework = escape_html(framework);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Preview unavailable</title>
  <style>
    body {{ font-family: system-ui, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; color: #333; }}
    .note {{ background: #fffde7; border-left: 4px solid #ffd600; padding: 12px; margin: 20px 0; }}
    .code {{ background: #eaeaea; padding: 12px; border-radius: 4px; font-family: monospace; }}
  </style>
</head>
<body>
  <h1>{framework} project</h1>
  <div class="note">
    <p>This project depends on <code>{framework}</code>, which needs a build step
    and a server. Live preview cannot render it.</p>
    <ol>
      <li>Export the project as a ZIP file</li>
      <li>Extract it on your machine</li>
      <li>Run <code>npm install</code> and <code>npm run dev</code></li>
    </ol>
  </div>
  <h2>Project structure</h2>
  <div class="code">
    {listing}
  </div>
</body>
</html>
"#
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> File {
        File::new("P", path, content)
    }

    #[test]
    fn no_markup_means_no_entry_point() {
        let files = [file("app.js", ""), file("site.css", "")];
        assert!(matches!(generate(&files), Err(Error::NoEntryPoint)));
    }

    #[test]
    fn prefers_index_html() {
        let files = [file("about.html", "<p>about</p>"), file("index.html", "<p>home</p>")];
        let doc = generate(&files).unwrap();

        assert_eq!(doc.mime, "text/html");
        assert_eq!(doc.body, "<p>home</p>");
        assert_eq!(
            doc.source,
            DocumentSource::Entry {
                path: "P/index.html".to_string()
            }
        );
    }

    #[test]
    fn falls_back_to_first_markup_file() {
        let files = [
            file("style.css", ""),
            file("contact.html", "<p>contact</p>"),
            file("about.html", "<p>about</p>"),
        ];
        assert_eq!(generate(&files).unwrap().body, "<p>contact</p>");
    }

    #[test]
    fn name_must_match_exactly() {
        let files = [file("a.html", "a"), file("myindex.html", "b")];
        assert_eq!(generate(&files).unwrap().body, "a");
    }

    #[test]
    fn framework_projects_get_a_placeholder() {
        let files = [
            file("package.json", r#"{"dependencies": {"next": "14.0.0", "react": "18"}}"#),
            file("pages/index.html", "<p>never shown</p>"),
            file("pages/<odd>.js", ""),
        ];
        let doc = generate(&files).unwrap();

        assert_eq!(
            doc.source,
            DocumentSource::Diagnostic {
                framework: "next".to_string()
            }
        );
        assert!(doc.body.contains("pages/index.html"));
        assert!(doc.body.contains("pages/&lt;odd&gt;.js"));
        assert!(!doc.body.contains("never shown"));
    }

    #[test]
    fn plain_package_json_is_not_a_framework() {
        let files = [
            file("package.json", r#"{"devDependencies": {"prettier": "3"}}"#),
            file("index.html", "<p>ok</p>"),
        ];
        assert_eq!(generate(&files).unwrap().body, "<p>ok</p>");
    }

    #[test]
    fn broken_manifest_falls_back_to_text_match() {
        let files = [
            file("package.json", r#"{"dependencies": {"nuxt": "3","#),
            file("index.html", ""),
        ];
        assert!(matches!(
            generate(&files).unwrap().source,
            DocumentSource::Diagnostic { framework } if framework == "nuxt"
        ));
    }
}
