use std::time::Duration;

use sitebench_core::{
    services::{
        archive::{self, Entry, FolderItem},
        preview::DocumentSource,
    },
    Config, EditorView, Error, ProjectSeed, SessionEvent, SessionState, Workbench,
};
use tempfile::TempDir;

fn file_config(dir: &TempDir) -> Config {
    let db = dir.path().join("data").join("sitebench.db");
    Config {
        database_url: format!("sqlite:{}?mode=rwc", db.display()),
        max_connections: 2,
        preview_debounce_ms: 300,
    }
}

async fn next_preview(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event @ (SessionEvent::PreviewReady(_) | SessionEvent::PreviewFailed { .. })) => {
                    return event
                }
                Ok(_) => continue,
                Err(e) => panic!("event stream closed: {e}"),
            }
        }
    })
    .await
    .expect("preview within timeout")
}

#[tokio::test]
async fn projects_survive_reopening_the_store() {
    let dir = TempDir::new().unwrap();

    let bench = Workbench::open(file_config(&dir)).await.unwrap();
    let (project, _) = bench
        .create_project("Blog", "personal site", ProjectSeed::Default)
        .await
        .unwrap();
    bench.close().await;

    let reopened = Workbench::open(file_config(&dir)).await.unwrap();
    let listed = reopened.projects().list().await.unwrap();
    assert_eq!(listed, vec![project.clone()]);
    assert_eq!(listed[0].description.as_deref(), Some("personal site"));

    let files = reopened.files().list_by_project(&project.id).await.unwrap();
    assert_eq!(files.len(), 3);
}

#[tokio::test]
async fn saved_edits_reach_the_store_and_preview() {
    let dir = TempDir::new().unwrap();
    let bench = Workbench::open(file_config(&dir)).await.unwrap();
    let (project, _) = bench
        .create_project("Demo", "", ProjectSeed::Template("html-css-js".into()))
        .await
        .unwrap();

    let session = bench.open_session(&project.id).await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    let mut events = session.subscribe();

    let view = session.current_view().unwrap();
    assert!(matches!(&view, EditorView::Text { file_path, .. } if file_path.ends_with("/index.html")));

    session.edit_current_file("<h1>Edited</h1>").unwrap();
    // Typing alone writes nothing.
    assert!(bench
        .preview_project(&project.id)
        .await
        .unwrap()
        .body
        .contains("Welcome to My Web Project"));

    let saved = session.save().await.unwrap();
    assert!(saved.updated_at >= project.updated_at);
    assert_eq!(bench.preview_project(&project.id).await.unwrap().body, "<h1>Edited</h1>");

    // The preview scheduled by load may still land first.
    loop {
        match next_preview(&mut events).await {
            SessionEvent::PreviewReady(handle) if handle.document.body == "<h1>Edited</h1>" => break,
            SessionEvent::PreviewReady(_) => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[tokio::test]
async fn rapid_regenerations_publish_only_the_last() {
    let dir = TempDir::new().unwrap();
    let bench = Workbench::open(file_config(&dir)).await.unwrap();
    let (project, _) = bench
        .create_project("Fast", "", ProjectSeed::Default)
        .await
        .unwrap();
    let session = bench.open_session(&project.id).await.unwrap();
    let mut events = session.subscribe();

    let mut last = 0;
    for n in 0..5 {
        session.edit_current_file(format!("<p>{n}</p>")).unwrap();
        last = session.regenerate_preview();
    }

    match next_preview(&mut events).await {
        SessionEvent::PreviewReady(handle) => {
            assert_eq!(handle.generation, last);
            assert_eq!(handle.document.body, "<p>4</p>");
        }
        other => panic!("unexpected event {other:?}"),
    }

    session.close();
    assert!(session.current_preview().is_none());
}

#[tokio::test]
async fn framework_projects_preview_as_diagnostic() {
    let dir = TempDir::new().unwrap();
    let bench = Workbench::open(file_config(&dir)).await.unwrap();
    let bytes = archive::entries_to_archive(&[
        Entry::text("package.json", r#"{"dependencies":{"next":"14"}}"#),
        Entry::text("pages/index.html", "<p>app</p>"),
    ])
    .unwrap();

    let (project, report) = bench
        .create_project("Next App", "", ProjectSeed::Archive(bytes))
        .await
        .unwrap();
    assert!(report.is_complete());

    let document = bench.preview_project(&project.id).await.unwrap();
    assert_eq!(
        document.source,
        DocumentSource::Diagnostic {
            framework: "next".to_string()
        }
    );
    assert!(document.body.contains("pages/index.html"));
}

#[tokio::test]
async fn folder_import_then_export_round_trips() {
    let dir = TempDir::new().unwrap();
    let bench = Workbench::open(file_config(&dir)).await.unwrap();
    let items = vec![
        FolderItem {
            relative_path: "site/index.html".into(),
            name: "index.html".into(),
            contents: Ok(b"<p>home</p>".to_vec()),
        },
        FolderItem {
            relative_path: "site/css/main.css".into(),
            name: "main.css".into(),
            contents: Ok(b"p { color: red; }".to_vec()),
        },
    ];

    let (project, _) = bench
        .create_project("Folder Site", "", ProjectSeed::Folder(items))
        .await
        .unwrap();

    let session = bench.open_session(&project.id).await.unwrap();
    session.create_file("site/img/logo.svg").await.unwrap();

    let exported = session.export_archive().unwrap();
    assert_eq!(exported.file_name, "Folder-Site.zip");

    let mut paths: Vec<_> = archive::archive_to_entries(&exported.bytes)
        .unwrap()
        .entries
        .into_iter()
        .map(|entry| entry.path)
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec!["site/css/main.css", "site/img/logo.svg", "site/index.html"]
    );
}

#[tokio::test]
async fn session_survives_failed_operations() {
    let dir = TempDir::new().unwrap();
    let bench = Workbench::open(file_config(&dir)).await.unwrap();
    let (project, _) = bench
        .create_project("Sturdy", "", ProjectSeed::Default)
        .await
        .unwrap();
    let session = bench.open_session(&project.id).await.unwrap();

    assert!(matches!(
        session.create_file("styles.css").await,
        Err(Error::DuplicatePath(_))
    ));
    assert!(matches!(
        session.create_file("bad name").await,
        Err(Error::InvalidName(_))
    ));
    assert!(matches!(
        session.import_archive(b"not a zip").await,
        Err(Error::InvalidArchive(_))
    ));

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.files().len(), 3);
    session.create_file("about.html").await.unwrap();
    assert_eq!(session.files().len(), 4);
}

#[tokio::test]
async fn deleted_project_cannot_be_opened() {
    let dir = TempDir::new().unwrap();
    let bench = Workbench::open(file_config(&dir)).await.unwrap();
    let (project, _) = bench
        .create_project("Temp", "", ProjectSeed::Default)
        .await
        .unwrap();

    bench.delete_project(&project.id).await.unwrap();

    let session = bench.session(&project.id);
    assert!(matches!(session.load().await, Err(Error::NotFound(_))));
    assert_eq!(session.state(), SessionState::NotFound);
}
