//! Read-only browser over the markdown files of a workspace directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

const SKIPPED_PROJECT_DIRS: [&str; 7] = [
    "skills",
    "memory",
    ".git",
    "venv",
    "__pycache__",
    "node_modules",
    ".next",
];

#[derive(Debug, Error)]
pub enum DocError {
    #[error("invalid document id")]
    InvalidId,
    #[error("document not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocEntry {
    pub id: String,
    pub name: String,
    pub category: &'static str,
    pub category_label: &'static str,
    pub size: u64,
    pub modified: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocContent {
    pub id: String,
    pub content: String,
    pub size: usize,
}

fn is_markdown(name: &str) -> bool {
    name.ends_with(".md")
}

fn entry(
    path: &Path,
    id: String,
    name: String,
    category: &'static str,
    category_label: &'static str,
) -> io::Result<DocEntry> {
    let meta = fs::metadata(path)?;
    let modified = meta
        .modified()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default();
    Ok(DocEntry {
        id,
        name,
        category,
        category_label,
        size: meta.len(),
        modified,
    })
}

fn sorted_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}

fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for name in sorted_names(dir)? {
        let path = dir.join(name);
        if path.is_dir() {
            walk_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn rel_id(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Memory notes (newest name first), root-level markdown, skill docs, then
/// project READMEs.
pub fn list(root: &Path) -> Result<Vec<DocEntry>, DocError> {
    let mut docs = Vec::new();
    if !root.is_dir() {
        return Ok(docs);
    }

    let memory = root.join("memory");
    if memory.is_dir() {
        for f in sorted_names(&memory)?.into_iter().rev() {
            if !is_markdown(&f) {
                continue;
            }
            docs.push(entry(
                &memory.join(&f),
                format!("memory/{}", f),
                f,
                "memory",
                "Memory / Chat History",
            )?);
        }
    }

    let top = sorted_names(root)?;
    for f in &top {
        let path = root.join(f);
        if is_markdown(f) && path.is_file() {
            docs.push(entry(&path, format!("root/{}", f), f.clone(), "root", "Workspace Root")?);
        }
    }

    let skills = root.join("skills");
    if skills.is_dir() {
        for skill in sorted_names(&skills)? {
            let skill_path = skills.join(&skill);
            if !skill_path.is_dir() {
                continue;
            }
            let mut files = Vec::new();
            walk_files(&skill_path, &mut files)?;
            for file in files {
                let Some(base) = file.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if !is_markdown(base) {
                    continue;
                }
                let name = format!("{}/{}", skill, base);
                docs.push(entry(
                    &file,
                    format!("project/{}", rel_id(root, &file)),
                    name,
                    "skills",
                    "Skills",
                )?);
            }
        }
    }

    for item in &top {
        let path = root.join(item);
        if !path.is_dir() || SKIPPED_PROJECT_DIRS.contains(&item.as_str()) {
            continue;
        }
        let readme = path.join("README.md");
        if readme.is_file() {
            docs.push(entry(
                &readme,
                format!("project/{}/README.md", item),
                format!("{}/README.md", item),
                "projects",
                "Projects",
            )?);
        }
    }

    Ok(docs)
}

/// Resolves a listing id back to a file. The resolved path must stay inside
/// `root` after symlinks are followed.
pub fn read(root: &Path, id: &str) -> Result<DocContent, DocError> {
    let (category, rest) = id.split_once('/').ok_or(DocError::InvalidId)?;
    if rest.is_empty() {
        return Err(DocError::InvalidId);
    }
    let candidate = match category {
        "memory" => root.join("memory").join(rest),
        "root" | "skills" | "project" => root.join(rest),
        _ => return Err(DocError::InvalidId),
    };

    let real_root = root.canonicalize()?;
    let real = match candidate.canonicalize() {
        Ok(p) => p,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if candidate.components().any(|c| c == Component::ParentDir) {
                return Err(DocError::InvalidId);
            }
            return Err(DocError::NotFound);
        }
        Err(e) => return Err(e.into()),
    };
    if !real.starts_with(&real_root) {
        return Err(DocError::InvalidId);
    }
    if !real.is_file() {
        return Err(DocError::NotFound);
    }

    let content = fs::read_to_string(&real)?;
    Ok(DocContent {
        id: id.to_string(),
        size: content.chars().count(),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn write(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(p, body).expect("write");
    }

    fn workspace() -> PathBuf {
        let root = temp_dir("prodhubd-docs");
        write(&root, "memory/2025-01-01.md", "old");
        write(&root, "memory/2025-02-01.md", "new");
        write(&root, "memory/notes.txt", "skip");
        write(&root, "AGENTS.md", "# Agents");
        write(&root, "skills/research/SKILL.md", "skill");
        write(&root, "skills/research/refs/deep.md", "deep");
        write(&root, "skills/research/run.sh", "echo");
        write(&root, "tools/README.md", "tools readme");
        write(&root, "node_modules/README.md", "nope");
        root
    }

    #[test]
    fn lists_by_category_in_order() {
        let root = workspace();
        let ids: Vec<String> = list(&root).expect("list").into_iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            vec![
                "memory/2025-02-01.md",
                "memory/2025-01-01.md",
                "root/AGENTS.md",
                "project/skills/research/SKILL.md",
                "project/skills/research/refs/deep.md",
                "project/tools/README.md",
            ]
        );
        let docs = list(&root).expect("list");
        assert_eq!(docs[3].name, "research/SKILL.md");
        assert_eq!(docs[4].name, "research/deep.md");
        assert_eq!(docs[0].category_label, "Memory / Chat History");
        assert_eq!(docs[2].size, 8);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn reads_each_category() {
        let root = workspace();
        assert_eq!(read(&root, "memory/2025-02-01.md").expect("memory").content, "new");
        assert_eq!(read(&root, "root/AGENTS.md").expect("root").size, 8);
        assert_eq!(
            read(&root, "project/skills/research/SKILL.md").expect("skill").content,
            "skill"
        );
        assert_eq!(read(&root, "project/tools/README.md").expect("readme").content, "tools readme");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn rejects_escapes_and_unknown_ids() {
        let root = workspace();
        let outside = root.parent().expect("parent").join(format!(
            "{}-outside.md",
            root.file_name().and_then(|n| n.to_str()).unwrap_or("x")
        ));
        fs::write(&outside, "secret").expect("write outside");
        let escape = format!(
            "root/../{}",
            outside.file_name().and_then(|n| n.to_str()).expect("name")
        );
        assert!(matches!(read(&root, &escape), Err(DocError::InvalidId)));
        assert!(matches!(read(&root, "bogus/AGENTS.md"), Err(DocError::InvalidId)));
        assert!(matches!(read(&root, "AGENTS.md"), Err(DocError::InvalidId)));
        assert!(matches!(read(&root, "root/missing.md"), Err(DocError::NotFound)));
        assert!(matches!(read(&root, "root/memory"), Err(DocError::NotFound)));
        let _ = fs::remove_dir_all(root);
        let _ = fs::remove_file(outside);
    }
}
