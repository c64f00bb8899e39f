use serde::Serialize;

use crate::db::models::{File, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    #[serde(rename_all = "camelCase")]
    File {
        content: String,
        last_modified: Timestamp,
    },
    Folder,
}

/// Display-only view of a project's files. Rebuilt on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTreeNode {
    pub name: String,
    /// Full store path for files, `{project_id}/{folder}` for folders.
    pub path: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub children: Vec<FileTreeNode>,
}

impl FileTreeNode {
    fn folder(name: &str, path: String) -> Self {
        Self {
            name: name.to_string(),
            path,
            kind: NodeKind::Folder,
            children: Vec::new(),
        }
    }

    fn leaf(name: &str, file: &File) -> Self {
        Self {
            name: name.to_string(),
            path: file.path.clone(),
            kind: NodeKind::File {
                content: file.content.clone(),
                last_modified: file.last_modified,
            },
            children: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder)
    }

    /// Every file node below this one, depth first.
    pub fn files(&self) -> Vec<&FileTreeNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.is_folder() {
                stack.extend(node.children.iter().rev());
            } else {
                out.push(node);
            }
        }
        out
    }

    pub fn find(&self, path: &str) -> Option<&FileTreeNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }

    /// Puts `node` into `children`, replacing any same-named entry in place.
    fn insert(&mut self, node: FileTreeNode) -> usize {
        match self.children.iter().position(|c| c.name == node.name) {
            Some(index) => {
                self.children[index] = node;
                index
            }
            None => {
                self.children.push(node);
                self.children.len() - 1
            }
        }
    }
}

pub fn build_tree(files: &[File]) -> FileTreeNode {
    let mut root = FileTreeNode::folder("root", String::new());

    let mut sorted: Vec<&File> = files.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    for file in sorted {
        let parts: Vec<&str> = file.relative_path().split('/').collect();
        let Some((leaf, folders)) = parts.split_last() else {
            continue;
        };

        let mut node = &mut root;
        let mut current_path = file.project_id.clone();
        for part in folders {
            current_path.push('/');
            current_path.push_str(part);

            let index = match node.children.iter().position(|c| c.name == *part) {
                Some(index) if node.children[index].is_folder() => index,
                _ => node.insert(FileTreeNode::folder(part, current_path.clone())),
            };
            node = &mut node.children[index];
        }
        node.insert(FileTreeNode::leaf(leaf, file));
    }

    root
}
