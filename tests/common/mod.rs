#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use permsearch::algebra::{Field, FieldBuilder, FieldPolynomial};
use permsearch::{Search, SearchConfig, SearchOptions, SearchOutcome, SearchSummary};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Empty scratch directory, removed on drop.
pub struct ScratchDir(PathBuf);

impl ScratchDir {
    pub fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "permsearch-{label}-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("create scratch directory");
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

pub fn options(dir: &Path) -> SearchOptions {
    SearchOptions {
        output_dir: dir.to_path_buf(),
        ..SearchOptions::default()
    }
}

/// Run a search in `dir` that must finish in one pass.
pub fn run_complete(config: SearchConfig, dir: &Path) -> SearchSummary {
    let outcome = Search::new(config, options(dir))
        .expect("valid configuration")
        .run()
        .expect("search succeeds");
    match outcome {
        SearchOutcome::Complete(summary) => summary,
        SearchOutcome::Interrupted(summary) => panic!("search stopped early: {summary:?}"),
    }
}

/// Result lines without the header.
pub fn result_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read result file")
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

pub fn result_set(path: &Path) -> BTreeSet<String> {
    result_lines(path).into_iter().collect()
}

/// The field a result file was written over.
pub fn field_of(path: &Path, p: u32, r: u32) -> Field {
    let text = fs::read_to_string(path).expect("read result file");
    let header = text.lines().next().expect("header line");
    let poly = FieldPolynomial::parse(header, p).expect("parse defining polynomial");
    FieldBuilder::new(p, r)
        .irreducible(poly.coeffs().to_vec())
        .build()
        .expect("rebuild field")
}
