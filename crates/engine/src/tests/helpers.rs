use crate::{Engine, OpenOption};
use std::fs;
use std::path::Path;

pub fn open_rw(path: &Path) -> Engine {
    Engine::open(path, &[OpenOption::ReadWrite]).unwrap()
}

pub fn open_ro(path: &Path) -> Engine {
    Engine::open(path, &[]).unwrap()
}

pub fn count_files_with_ext(dir: &Path, ext: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|x| x == ext)
                .unwrap_or(false)
        })
        .count()
}
