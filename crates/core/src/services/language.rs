use serde::Serialize;

/// Highlighting mode handed to the editor widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Html,
    Css,
    Scss,
    Javascript,
    Typescript,
    Json,
    Yaml,
    Ini,
    Xml,
    Graphql,
    Php,
    Python,
    Ruby,
    Go,
    Java,
    Csharp,
    Sql,
    Markdown,
    Plaintext,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Html => "html",
            Language::Css => "css",
            Language::Scss => "scss",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Ini => "ini",
            Language::Xml => "xml",
            Language::Graphql => "graphql",
            Language::Php => "php",
            Language::Python => "python",
            Language::Ruby => "ruby",
            Language::Go => "go",
            Language::Java => "java",
            Language::Csharp => "csharp",
            Language::Sql => "sql",
            Language::Markdown => "markdown",
            Language::Plaintext => "plaintext",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const LANGUAGES: &[(&str, Language)] = &[
    ("html", Language::Html),
    ("htm", Language::Html),
    ("xhtml", Language::Html),
    ("ejs", Language::Html),
    ("hbs", Language::Html),
    ("pug", Language::Html),
    ("vue", Language::Html),
    ("svelte", Language::Html),
    ("astro", Language::Html),
    ("css", Language::Css),
    ("scss", Language::Scss),
    ("sass", Language::Scss),
    ("less", Language::Scss),
    ("js", Language::Javascript),
    ("mjs", Language::Javascript),
    ("cjs", Language::Javascript),
    ("jsx", Language::Javascript),
    ("ts", Language::Typescript),
    ("mts", Language::Typescript),
    ("cts", Language::Typescript),
    ("tsx", Language::Typescript),
    ("json", Language::Json),
    ("jsonc", Language::Json),
    ("lock", Language::Json),
    ("yaml", Language::Yaml),
    ("yml", Language::Yaml),
    ("toml", Language::Ini),
    ("xml", Language::Xml),
    ("svg", Language::Xml),
    ("rss", Language::Xml),
    ("graphql", Language::Graphql),
    ("gql", Language::Graphql),
    ("php", Language::Php),
    ("py", Language::Python),
    ("python", Language::Python),
    ("rb", Language::Ruby),
    ("go", Language::Go),
    ("java", Language::Java),
    ("cs", Language::Csharp),
    ("sql", Language::Sql),
    ("md", Language::Markdown),
    ("markdown", Language::Markdown),
];

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "ico", "tiff", "avif", // images
    "woff", "woff2", "ttf", "otf", "eot", // fonts
    "mp3", "wav", "ogg", "flac", "aac", "mp4", "webm", "avi", "mov", "wmv", "mkv", // media
    "zip", "tar", "gz", "rar", "7z", // archives
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", // documents
    "wasm", "exe", "dll", "so", "dylib",
];

/// Lowercased text after the last `.` of the last path segment.
fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

pub fn detect(path: &str) -> Language {
    extension(path)
        .and_then(|ext| {
            LANGUAGES
                .iter()
                .find(|(candidate, _)| *candidate == ext)
                .map(|(_, language)| *language)
        })
        .unwrap_or(Language::Plaintext)
}

pub fn is_binary(path: &str) -> bool {
    extension(path).is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_extensions() {
        assert_eq!(detect("P/index.html"), Language::Html);
        assert_eq!(detect("P/src/App.TSX"), Language::Typescript);
        assert_eq!(detect("P/styles/main.sass"), Language::Scss);
        assert_eq!(detect("P/Cargo.toml"), Language::Ini);
        assert_eq!(detect("P/package-lock.lock"), Language::Json);
        assert_eq!(detect("P/.gitignore"), Language::Plaintext);
        assert_eq!(detect("P/Makefile"), Language::Plaintext);
        assert_eq!(Language::Csharp.to_string(), "csharp");
    }

    #[test]
    fn folder_dots_are_ignored() {
        assert_eq!(detect("P/v1.2/README"), Language::Plaintext);
    }

    #[test]
    fn detects_binary_assets() {
        assert!(is_binary("P/img/logo.PNG"));
        assert!(is_binary("P/fonts/inter.woff2"));
        assert!(!is_binary("P/img/logo.svg"));
        assert!(!is_binary("P/LICENSE"));
    }
}
