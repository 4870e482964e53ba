// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, mtime: u64 },
    Dir(Vec<String>), // List of child names
    Link(PathBuf),
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Logical clock; every write or touch advances it by one second so
    /// modification times are strictly increasing.
    clock: u64,
}

impl MockState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// In-memory filesystem with deterministic modification times.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

fn parent_or_root(path: &Path) -> Option<&Path> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(Path::new("."))
    } else {
        Some(parent)
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut state = MockState::default();
        // Ensure root exists
        state
            .entries
            .insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        let mtime = state.tick();
        state.entries.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                mtime,
            },
        );
        Self::attach_to_parent(&mut state.entries, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        Self::ensure_dir_entry(&mut state.entries, path.as_ref());
    }

    /// Bump a file's modification time to "now" on the logical clock.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        let now = state.tick();
        if let Some(MockEntry::File { mtime, .. }) = state.entries.get_mut(path.as_ref()) {
            *mtime = now;
        }
    }

    /// Force a file's modification time (in logical seconds).
    pub fn set_mtime(&self, path: impl AsRef<Path>, secs: u64) {
        let mut state = self.lock();
        if let Some(MockEntry::File { mtime, .. }) = state.entries.get_mut(path.as_ref()) {
            *mtime = secs;
        }
    }

    /// Target of a symlink created through [`FileSystem::symlink`].
    pub fn link_target(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        match self.lock().entries.get(path.as_ref()) {
            Some(MockEntry::Link(target)) => Some(target.clone()),
            _ => None,
        }
    }

    fn attach_to_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = parent_or_root(path) else {
            return;
        };
        if parent == path {
            return;
        }
        Self::ensure_dir_entry(entries, parent);
        if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }

    fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if entries.contains_key(path) {
            return;
        }
        entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        Self::attach_to_parent(entries, path);
    }

    fn detach_from_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = parent_or_root(path) else {
            return;
        };
        if let (Some(MockEntry::Dir(children)), Some(name)) = (
            entries.get_mut(parent),
            path.file_name().and_then(|n| n.to_str()),
        ) {
            children.retain(|c| c != name);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::File { content, .. }) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            Some(MockEntry::Link(_)) => Err(anyhow!("Is a symlink: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Link(_)))
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        match self.lock().entries.get(path) {
            Some(MockEntry::File { mtime, .. }) => {
                Some(SystemTime::UNIX_EPOCH + Duration::from_secs(*mtime))
            }
            _ => None,
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::File { .. }) | Some(MockEntry::Link(_)) => {
                state.entries.remove(path);
                Self::detach_from_parent(&mut state.entries, path);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if !matches!(state.entries.get(path), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        state
            .entries
            .retain(|p, _| !(p == path || p.starts_with(path)));
        Self::detach_from_parent(&mut state.entries, path);
        Ok(())
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        let mut state = self.lock();
        if state.entries.contains_key(link) {
            return Err(anyhow!("File exists: {:?}", link));
        }
        state
            .entries
            .insert(link.to_path_buf(), MockEntry::Link(target.to_path_buf()));
        Self::attach_to_parent(&mut state.entries, link);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_get_strictly_increasing_mtimes() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/a.c", "int a;");
        fs.add_file("./src/b.c", "int b;");

        let a = fs.modified(Path::new("./src/a.c")).unwrap();
        let b = fs.modified(Path::new("./src/b.c")).unwrap();
        assert!(b > a);

        fs.touch("./src/a.c");
        assert!(fs.modified(Path::new("./src/a.c")).unwrap() > b);
    }

    #[test]
    fn parents_are_created_and_listed() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/app/main.c", "");

        assert!(fs.is_dir(Path::new("./src")));
        assert!(fs.is_dir(Path::new("./src/app")));
        assert_eq!(
            fs.read_dir(Path::new("./src")).unwrap(),
            vec![PathBuf::from("./src/app")]
        );
    }

    #[test]
    fn remove_dir_all_drops_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("./build/obj/app/main.c.o", "");
        fs.add_file("./build/bin/app", "");

        fs.remove_dir_all(Path::new("./build/obj")).unwrap();

        assert!(!fs.exists(Path::new("./build/obj/app/main.c.o")));
        assert!(!fs.exists(Path::new("./build/obj")));
        assert!(fs.exists(Path::new("./build/bin/app")));
        assert_eq!(
            fs.read_dir(Path::new("./build")).unwrap(),
            vec![PathBuf::from("./build/bin")]
        );
    }
}
