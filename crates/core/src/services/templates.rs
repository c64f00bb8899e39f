use crate::services::archive::Entry;

/// Built-in starting point for a new project.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub files: &'static [(&'static str, &'static str)],
}

impl Template {
    pub fn entries(&self) -> Vec<Entry> {
        self.files
            .iter()
            .map(|(path, content)| Entry::text(*path, *content))
            .collect()
    }
}

pub const TEMPLATES: &[Template] = &[
    Template {
        id: "html-css-js",
        name: "HTML, CSS & JavaScript",
        description: "A basic web project with HTML, CSS, and JavaScript files",
        files: &[
            (
                "index.html",
                r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>My Web Project</title>
  <link rel="stylesheet" href="styles.css">
</head>
<body>
  <header>
    <h1>Welcome to My Web Project</h1>
  </header>
  <main>
    <p>This is a simple HTML, CSS, and JavaScript project template.</p>
    <button id="clickMe">Click Me</button>
  </main>
  <script src="script.js"></script>
</body>
</html>
"#,
            ),
            (
                "styles.css",
                r#"body {
  font-family: system-ui, sans-serif;
  line-height: 1.6;
  margin: 0 auto;
  max-width: 800px;
  padding: 20px;
}

button {
  background: #0070f3;
  border: none;
  border-radius: 4px;
  color: white;
  padding: 8px 16px;
}
"#,
            ),
            (
                "script.js",
                r#"document.addEventListener('DOMContentLoaded', () => {
  const button = document.getElementById('clickMe');
  button.addEventListener('click', () => {
    alert('Hello from your web project!');
  });
});
"#,
            ),
        ],
    },
    Template {
        id: "landing-page",
        name: "Landing Page",
        description: "A single responsive page with a hero section and a feature grid",
        files: &[
            (
                "index.html",
                r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Landing Page</title>
  <link rel="stylesheet" href="css/style.css">
</head>
<body>
  <section class="hero">
    <h1>Build something great</h1>
    <p>A clean starting point for your next idea.</p>
  </section>
  <section class="features">
    <article><h2>Fast</h2><p>No build step required.</p></article>
    <article><h2>Simple</h2><p>Plain HTML and CSS.</p></article>
    <article><h2>Portable</h2><p>Export it anywhere.</p></article>
  </section>
</body>
</html>
"#,
            ),
            (
                "css/style.css",
                r#"body {
  font-family: system-ui, sans-serif;
  margin: 0;
}

.hero {
  background: #0070f3;
  color: white;
  padding: 80px 20px;
  text-align: center;
}

.features {
  display: grid;
  gap: 20px;
  grid-template-columns: repeat(auto-fill, minmax(240px, 1fr));
  padding: 40px 20px;
}
"#,
            ),
        ],
    },
];

pub fn find(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// Files for a project created without a template or import.
pub fn default_entries(project_name: &str) -> Vec<Entry> {
    let index = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{project_name}</title>
  <link rel="stylesheet" href="styles.css">
</head>
<body>
  <h1>Welcome to {project_name}</h1>
  <p>Start editing to see your changes!</p>

  <script src="script.js"></script>
</body>
</html>"#
    );
    let styles = r#"body {
  font-family: system-ui, sans-serif;
  line-height: 1.6;
  color: #333;
  max-width: 800px;
  margin: 0 auto;
  padding: 20px;
}

h1 {
  color: #0070f3;
}"#;
    let script = "// Your JavaScript code goes here\nconsole.log('Hello, world!');";

    vec![
        Entry::text("index.html", index),
        Entry::text("styles.css", styles),
        Entry::text("script.js", script),
    ]
}
