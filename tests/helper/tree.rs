//! Configuration tree and repository builders

use std::fs;
use std::path::Path;

use git2::{Repository, Signature};

/// `module "<name>" { source = ..., version = ... }`; an empty version is left out
pub fn module_block(name: &str, source: &str, version: &str) -> String {
    let mut block = format!("module \"{}\" {{\n  source = \"{}\"\n", name, source);
    if !version.is_empty() {
        block.push_str(&format!("  version = \"{}\"\n", version));
    }
    block.push_str("}\n\n");
    block
}

/// Writes `content` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Initializes a repository at `dir` with one commit carrying `tags`
pub fn create_git_repository(dir: &Path, tags: &[&str]) {
    let repo = Repository::init(dir).unwrap();
    let signature = Signature::now("Test", "test@example.com").unwrap();

    let tree_id = repo.index().unwrap().write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let commit_id = repo
        .commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
        .unwrap();
    let commit = repo.find_commit(commit_id).unwrap();

    for tag in tags {
        repo.tag_lightweight(tag, commit.as_object(), false).unwrap();
    }
}
