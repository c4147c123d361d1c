use super::{Callback, Request};
use crate::page::{Block, FragState, Link, LinkClass, Listing, Row, Span};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// File extensions worth scanning for definitions and serving with
/// identifier links.
const SOURCE_EXTS: &[&str] = &[
    "rs", "c", "h", "cc", "cpp", "hpp", "py", "go", "js", "ts", "java", "rb", "pl", "pm", "sh",
];

/// Caps on the lazily built definition index.
const INDEX_MAX_FILES: usize = 2000;
const INDEX_MAX_FILE_BYTES: u64 = 256 * 1024;

/// Where a lazily served fragment came from: enough to re-read its rows
/// when the client asks for it.
#[derive(Debug, Clone)]
struct FragSource {
    tree: String,
    file: String,
    revision: String,
    start: usize,
    end: usize,
}

/// One recorded definition site.
#[derive(Debug, Clone)]
struct Def {
    ident: String,
    file: String,
    line: u32,
    text: String,
}

/// Per-tree definition index, built on first use from the tree's head
/// revision.
#[derive(Debug, Default)]
struct DefIndex {
    defs: Vec<Def>,
    /// ident -> number of definition sites
    idents: HashMap<String, u32>,
    files: Vec<String>,
}

/// Serves listings, deferred fragments, search results and release lists
/// for the trees under a root directory. Trees are first-level
/// subdirectories; revisions are git tags when a tree is a git repository.
pub struct TreeStore {
    root: PathBuf,
    fragment_rows: usize,
    frag_seq: u64,
    fragments: HashMap<String, FragSource>,
    indexes: HashMap<String, DefIndex>,
}

impl TreeStore {
    pub fn new(root: PathBuf, fragment_rows: usize) -> TreeStore {
        TreeStore {
            root,
            fragment_rows: fragment_rows.max(1),
            frag_seq: 0,
            fragments: HashMap::new(),
            indexes: HashMap::new(),
        }
    }

    /// Names of the trees under the root, sorted.
    pub fn trees(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if entry.path().is_dir() && !name.starts_with('.') {
                    out.push(name);
                }
            }
        }
        out.sort();
        out
    }

    /// Serve one request. Failures never propagate to the client as errors;
    /// they degrade to a message listing, matching the permissive contract
    /// of the navigation engine.
    pub fn handle(&mut self, req: &Request) -> String {
        match req.callback {
            Callback::LoadFile => {
                let tree = req.param("tree").unwrap_or("");
                let file = req.param("file").unwrap_or("/");
                let revision = req.param("v").unwrap_or("");
                let line: u32 = req.param("line").and_then(|l| l.parse().ok()).unwrap_or(1);
                let full = req.param("full").is_some();
                let listing = self
                    .listing(tree, file, revision, line, full)
                    .unwrap_or_else(|err| {
                        log::warn!("listing {tree}/{file} failed: {err:#}");
                        message_listing(&format!("Cannot load {tree}/{file}: {err:#}"))
                    });
                to_json(&listing)
            }
            Callback::LoadFragment => {
                let id = req.param("frag").unwrap_or("").to_string();
                let rows = self.fragment(&id).unwrap_or_else(|err| {
                    log::warn!("fragment {id} failed: {err:#}");
                    Vec::new()
                });
                format!("{id}|{}", to_json(&rows))
            }
            Callback::Search => {
                let tree = req.param("tree").unwrap_or("").to_string();
                let rows = if let Some(target) = req.param("lookup") {
                    let target = target.to_string();
                    self.lookup(&tree, &target)
                } else {
                    let term = req.param("search").unwrap_or("").to_string();
                    self.search(&tree, &term)
                };
                to_json(&rows)
            }
            Callback::Releases => {
                let tree = req.param("tree").unwrap_or("");
                to_json(&self.releases(tree))
            }
        }
    }

    /// Build a listing for a directory or file within a tree.
    fn listing(
        &mut self,
        tree: &str,
        file: &str,
        revision: &str,
        line: u32,
        full: bool,
    ) -> Result<Listing> {
        if tree.is_empty() {
            bail!("no tree given");
        }
        let rel = sanitize(file)?;
        let tree_dir = self.root.join(tree);
        if !tree_dir.is_dir() {
            bail!("unknown tree '{tree}'");
        }

        if revision.is_empty() {
            let path = tree_dir.join(&rel);
            if rel.is_empty() || path.is_dir() {
                return dir_listing_fs(&tree_dir, &rel);
            }
            if !path.is_file() {
                bail!("no such file");
            }
            let content = read_lossy(&path)?;
            return Ok(self.file_listing(tree, &rel, revision, &content, line, full));
        }

        // Revisioned reads go through git.
        match git_object_type(&tree_dir, revision, &rel).as_deref() {
            Some("tree") => dir_listing_git(&tree_dir, revision, &rel),
            Some("blob") => {
                let content = git(&tree_dir, &["show", &format!("{revision}:{rel}")])
                    .context("git show failed")?;
                Ok(self.file_listing(tree, &rel, revision, &content, line, full))
            }
            _ => bail!("no such object at revision '{revision}'"),
        }
    }

    /// Chunk a file's lines into one inline block plus deferred fragments.
    /// The chunk holding the requested line ships inline so the landing
    /// anchor exists before any fragment arrives; the rest is deferred.
    fn file_listing(
        &mut self,
        tree: &str,
        file: &str,
        revision: &str,
        content: &str,
        line: u32,
        full: bool,
    ) -> Listing {
        self.ensure_index(tree);
        let lines: Vec<&str> = content.lines().collect();

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < lines.len() {
            let end = (start + self.fragment_rows).min(lines.len());
            chunks.push((start, end));
            start = end;
        }
        if chunks.is_empty() {
            chunks.push((0, 0));
        }

        let target = if line > 0 {
            ((line as usize - 1) / self.fragment_rows).min(chunks.len() - 1)
        } else {
            0
        };

        // Register deferred fragments before the index is borrowed.
        let mut frag_ids: Vec<Option<String>> = Vec::new();
        for (ci, &(start, end)) in chunks.iter().enumerate() {
            if full || chunks.len() == 1 || ci == target {
                frag_ids.push(None);
                continue;
            }
            self.frag_seq += 1;
            let id = format!("frag{}", self.frag_seq);
            self.fragments.insert(
                id.clone(),
                FragSource {
                    tree: tree.to_string(),
                    file: file.to_string(),
                    revision: revision.to_string(),
                    start,
                    end,
                },
            );
            frag_ids.push(Some(id));
        }

        let index = self.indexes.get(tree);
        let mut blocks = Vec::new();
        if full || chunks.len() == 1 {
            blocks.push(Block::Rows(source_rows(&lines, 0, index)));
        } else {
            for (ci, &(start, end)) in chunks.iter().enumerate() {
                match &frag_ids[ci] {
                    None => {
                        blocks.push(Block::Rows(source_rows(&lines[start..end], start, index)))
                    }
                    Some(id) => blocks.push(Block::Fragment {
                        id: id.clone(),
                        state: FragState::Pending,
                        rows: Vec::new(),
                    }),
                }
            }
        }
        Listing {
            dir: false,
            blocks,
        }
    }

    /// Serve a previously registered fragment's rows.
    fn fragment(&mut self, id: &str) -> Result<Vec<Row>> {
        let src = self
            .fragments
            .get(id)
            .cloned()
            .with_context(|| format!("unknown fragment '{id}'"))?;
        let tree_dir = self.root.join(&src.tree);
        let content = if src.revision.is_empty() {
            read_lossy(&tree_dir.join(&src.file))?
        } else {
            git(&tree_dir, &["show", &format!("{}:{}", src.revision, src.file)])
                .context("git show failed")?
        };
        let lines: Vec<&str> = content.lines().collect();
        let end = src.end.min(lines.len());
        let start = src.start.min(end);
        let index = self.indexes.get(&src.tree);
        Ok(source_rows(&lines[start..end], start, index))
    }

    /// Definition lookup for a symbol-reference target (`+code=<ident>`).
    fn lookup(&mut self, tree: &str, target: &str) -> Vec<Row> {
        self.ensure_index(tree);
        let ident = target.strip_prefix("+code=").unwrap_or(target);
        let index = match self.indexes.get(tree) {
            Some(i) => i,
            None => return vec![Row::plain("no index for tree")],
        };
        let hits: Vec<&Def> = index.defs.iter().filter(|d| d.ident == ident).collect();
        if hits.is_empty() {
            return vec![Row::plain(&format!("No definitions found for '{ident}'"))];
        }
        let mut rows = vec![Row::plain(&format!(
            "{ident}: {} definition{}",
            hits.len(),
            if hits.len() == 1 { "" } else { "s" }
        ))];
        for def in hits {
            rows.push(def_row(def));
        }
        rows
    }

    /// Free-text search over indexed identifiers and file names.
    fn search(&mut self, tree: &str, term: &str) -> Vec<Row> {
        self.ensure_index(tree);
        let term = term.to_lowercase();
        let index = match self.indexes.get(tree) {
            Some(i) => i,
            None => return vec![Row::plain("no index for tree")],
        };
        if term.is_empty() {
            return vec![Row::plain("Empty search")];
        }
        let mut rows = Vec::new();
        for def in &index.defs {
            if def.ident.to_lowercase().contains(&term) {
                rows.push(def_row(def));
            }
            if rows.len() >= 100 {
                break;
            }
        }
        for file in &index.files {
            if rows.len() >= 100 {
                break;
            }
            if file.to_lowercase().contains(&term) {
                rows.push(Row {
                    id: None,
                    name: None,
                    spans: vec![Span::Link(Link::new(LinkClass::Fref, file, file))],
                });
            }
        }
        if rows.is_empty() {
            rows.push(Row::plain(&format!("No matches for '{term}'")));
        }
        rows
    }

    /// Release list for a tree: the default (empty) revision first, then
    /// git tags newest first when the tree is a repository.
    fn releases(&self, tree: &str) -> Vec<String> {
        let mut out = vec![String::new()];
        if let Some(tags) = git(&self.root.join(tree), &["tag", "--sort=-creatordate"]) {
            out.extend(tags.lines().filter(|l| !l.is_empty()).map(str::to_string));
        }
        out
    }

    /// Build the definition index for a tree the first time it is needed.
    fn ensure_index(&mut self, tree: &str) {
        if self.indexes.contains_key(tree) {
            return;
        }
        let mut index = DefIndex::default();
        let tree_dir = self.root.join(tree);
        let mut files = Vec::new();
        collect_source_files(&tree_dir, &tree_dir, &mut files);
        files.sort();
        files.truncate(INDEX_MAX_FILES);
        for rel in &files {
            index.files.push(rel.clone());
            let Ok(content) = read_lossy(&tree_dir.join(rel)) else {
                continue;
            };
            for (n, line) in content.lines().enumerate() {
                if let Some(ident) = detect_def(line) {
                    *index.idents.entry(ident.to_string()).or_insert(0) += 1;
                    index.defs.push(Def {
                        ident: ident.to_string(),
                        file: rel.clone(),
                        line: (n + 1) as u32,
                        text: line.trim().to_string(),
                    });
                }
            }
        }
        log::info!(
            "indexed tree '{tree}': {} files, {} definitions",
            index.files.len(),
            index.defs.len()
        );
        self.indexes.insert(tree.to_string(), index);
    }
}

/// Recursively gather indexable source files, as paths relative to the
/// tree root.
fn collect_source_files(tree_dir: &Path, dir: &Path, out: &mut Vec<String>) {
    if out.len() >= INDEX_MAX_FILES {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_source_files(tree_dir, &path, out);
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !SOURCE_EXTS.contains(&ext) {
            continue;
        }
        if entry
            .metadata()
            .map(|m| m.len() > INDEX_MAX_FILE_BYTES)
            .unwrap_or(true)
        {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(tree_dir) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// A search/lookup result row: file link plus the definition line.
fn def_row(def: &Def) -> Row {
    Row {
        id: None,
        name: None,
        spans: vec![
            Span::Link(Link::new(
                LinkClass::Fref,
                &format!("{}#L{}", def.file, def.line),
                &def.file,
            )),
            Span::Text(format!(":{}  {}", def.line, def.text)),
        ],
    }
}

/// Numbered, identifier-linked rows for a slice of source lines.
/// `offset` is the zero-based index of the first line in the file.
fn source_rows(lines: &[&str], offset: usize, index: Option<&DefIndex>) -> Vec<Row> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| Row {
            id: Some(format!("L{}", offset + i + 1)),
            name: None,
            spans: linkify(line, index),
        })
        .collect()
}

/// Wrap identifier tokens with known definitions in symbol-reference
/// links. Identifiers with several definition sites are classed `falt`.
fn linkify(line: &str, index: Option<&DefIndex>) -> Vec<Span> {
    let index = match index {
        Some(i) if !i.idents.is_empty() => i,
        _ => return vec![Span::Text(line.to_string())],
    };
    let mut spans = Vec::new();
    let mut text = String::new();
    let mut iter = line.char_indices().peekable();
    while let Some(&(start, c)) = iter.peek() {
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start;
            while let Some(&(i, c)) = iter.peek() {
                if !c.is_ascii_alphanumeric() && c != '_' {
                    break;
                }
                end = i + c.len_utf8();
                iter.next();
            }
            let word = &line[start..end];
            match index.idents.get(word) {
                Some(&count) if word.len() >= 3 => {
                    if !text.is_empty() {
                        spans.push(Span::Text(std::mem::take(&mut text)));
                    }
                    let class = if count > 1 {
                        LinkClass::Falt
                    } else {
                        LinkClass::Sref
                    };
                    spans.push(Span::Link(Link::new(
                        class,
                        &format!("+code={word}"),
                        word,
                    )));
                }
                _ => text.push_str(word),
            }
        } else {
            text.push(c);
            iter.next();
        }
    }
    if !text.is_empty() {
        spans.push(Span::Text(text));
    }
    if spans.is_empty() {
        spans.push(Span::Text(String::new()));
    }
    spans
}

/// Detect a definition site on one source line, returning the defined
/// identifier. Keyword-prefix heuristics only; no language parsing.
fn detect_def(line: &str) -> Option<&str> {
    let mut rest = line.trim_start();
    for modifier in ["pub ", "pub(crate) ", "static ", "unsafe ", "async ", "export "] {
        if let Some(stripped) = rest.strip_prefix(modifier) {
            rest = stripped;
        }
    }
    for kw in ["fn ", "struct ", "enum ", "trait ", "def ", "class ", "func ", "#define ", "sub "] {
        if let Some(after) = rest.strip_prefix(kw) {
            let ident: &str = {
                let end = after
                    .char_indices()
                    .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_')
                    .map(|(i, _)| i)
                    .unwrap_or(after.len());
                &after[..end]
            };
            if ident.len() >= 2 && !ident.as_bytes()[0].is_ascii_digit() {
                return Some(ident);
            }
            return None;
        }
    }
    None
}

/// Normalize a request path into tree-relative form. Empty segments and
/// `.` collapse; `..` is rejected outright.
fn sanitize(file: &str) -> Result<String> {
    let mut parts = Vec::new();
    for seg in file.split('/') {
        match seg {
            "" | "." => continue,
            ".." => bail!("path escapes tree"),
            _ => parts.push(seg),
        }
    }
    Ok(parts.join("/"))
}

fn message_listing(msg: &str) -> Listing {
    Listing {
        dir: false,
        blocks: vec![Block::Rows(vec![Row::plain(msg)])],
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(body) => body,
        Err(err) => {
            log::error!("payload serialization failed: {err}");
            String::new()
        }
    }
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Run a git command in `dir`, returning stdout on success.
fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        None
    }
}

/// Object type (`blob`/`tree`) of `rev:path`, or None when it is missing.
fn git_object_type(dir: &Path, revision: &str, rel: &str) -> Option<String> {
    let spec = if rel.is_empty() {
        format!("{revision}^{{tree}}")
    } else {
        format!("{revision}:{rel}")
    };
    git(dir, &["cat-file", "-t", &spec]).map(|s| s.trim().to_string())
}

fn dir_listing_fs(tree_dir: &Path, rel: &str) -> Result<Listing> {
    let path = tree_dir.join(rel);
    let mut entries: Vec<(String, bool)> = Vec::new();
    for entry in fs::read_dir(&path).with_context(|| format!("read dir {}", path.display()))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        entries.push((name, entry.path().is_dir()));
    }
    Ok(dir_listing(rel, entries))
}

fn dir_listing_git(tree_dir: &Path, revision: &str, rel: &str) -> Result<Listing> {
    let output = if rel.is_empty() {
        git(tree_dir, &["ls-tree", revision])
    } else {
        git(tree_dir, &["ls-tree", revision, &format!("{rel}/")])
    }
    .context("git ls-tree failed")?;
    let mut entries = Vec::new();
    for line in output.lines() {
        // <mode> <type> <hash>\t<path>
        let Some((meta, path)) = line.split_once('\t') else {
            continue;
        };
        let is_dir = meta.split_whitespace().nth(1) == Some("tree");
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        if name.starts_with('.') {
            continue;
        }
        entries.push((name, is_dir));
    }
    Ok(dir_listing(rel, entries))
}

/// Render directory entries as a listing: directories first, a parent
/// link when below the tree root.
fn dir_listing(rel: &str, mut entries: Vec<(String, bool)>) -> Listing {
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let base = if rel.is_empty() {
        String::new()
    } else {
        format!("{rel}/")
    };
    let mut rows = Vec::new();
    if !rel.is_empty() {
        let parent = match rel.rsplit_once('/') {
            Some((p, _)) => format!("{p}/"),
            None => String::new(),
        };
        rows.push(Row {
            id: None,
            name: None,
            spans: vec![Span::Link(Link::new(LinkClass::Fref, &parent, "../"))],
        });
    }
    for (name, is_dir) in entries {
        let suffix = if is_dir { "/" } else { "" };
        let href = format!("{base}{name}{suffix}");
        let text = format!("{name}{suffix}");
        rows.push(Row {
            id: None,
            name: None,
            spans: vec![Span::Link(Link::new(LinkClass::Fref, &href, &text))],
        });
    }
    Listing {
        dir: true,
        blocks: vec![Block::Rows(rows)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn demo_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        let tree = dir.path().join("demo");
        fs::create_dir_all(tree.join("src")).unwrap();
        fs::write(
            tree.join("src/lib.rs"),
            "pub fn alpha() {}\nfn beta() {\n    alpha();\n}\n",
        )
        .unwrap();
        fs::write(tree.join("README"), "hello\n").unwrap();
        dir
    }

    fn load_file_req(tree: &str, file: &str) -> Request {
        Request::new(
            vec![
                format!("tree__{tree}"),
                format!("file__{file}"),
                "v__".to_string(),
                "line__1".to_string(),
                "NO_CACHE".to_string(),
            ],
            Callback::LoadFile,
        )
    }

    #[test]
    fn test_dir_listing_has_fref_entries() {
        let root = demo_root();
        let mut store = TreeStore::new(root.path().to_path_buf(), 500);
        let body = store.handle(&load_file_req("demo", "/"));
        let listing: Listing = serde_json::from_str(&body).unwrap();
        assert!(listing.dir);
        let Block::Rows(rows) = &listing.blocks[0] else {
            panic!("expected rows");
        };
        let texts: Vec<String> = rows.iter().map(|r| r.text()).collect();
        assert_eq!(texts, vec!["src/", "README"]);
    }

    #[test]
    fn test_subdir_listing_has_parent_link() {
        let root = demo_root();
        let mut store = TreeStore::new(root.path().to_path_buf(), 500);
        let body = store.handle(&load_file_req("demo", "src/"));
        let listing: Listing = serde_json::from_str(&body).unwrap();
        let Block::Rows(rows) = &listing.blocks[0] else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].text(), "../");
        assert_eq!(rows[1].text(), "lib.rs");
    }

    #[test]
    fn test_file_listing_chunked_into_fragments() {
        let root = demo_root();
        let mut store = TreeStore::new(root.path().to_path_buf(), 2);
        let body = store.handle(&load_file_req("demo", "src/lib.rs"));
        let listing: Listing = serde_json::from_str(&body).unwrap();
        assert!(!listing.dir);
        // 4 lines at 2 per chunk: one inline block plus one pending fragment
        assert_eq!(listing.blocks.len(), 2);
        let Block::Fragment { id, state, rows } = &listing.blocks[1] else {
            panic!("expected fragment");
        };
        assert_eq!(*state, FragState::Pending);
        assert!(rows.is_empty());

        // The fragment serves the remaining lines, ids continuing at L3
        let frag_body = store.handle(&Request::new(
            vec![format!("tree__demo"), format!("frag__{id}"), "NO_CACHE".to_string()],
            Callback::LoadFragment,
        ));
        let (echo, rest) = frag_body.split_once('|').unwrap();
        assert_eq!(echo, id);
        let rows: Vec<Row> = serde_json::from_str(rest).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id.as_deref(), Some("L3"));
    }

    #[test]
    fn test_target_line_chunk_ships_inline() {
        let root = demo_root();
        let mut store = TreeStore::new(root.path().to_path_buf(), 2);
        let mut req = load_file_req("demo", "src/lib.rs");
        req.params.retain(|p| p != "line__1");
        req.params.push("line__3".to_string());
        let listing: Listing = serde_json::from_str(&store.handle(&req)).unwrap();
        // Lines 3..4 arrive inline; lines 1..2 are deferred.
        assert_eq!(listing.blocks.len(), 2);
        assert!(matches!(listing.blocks[0], Block::Fragment { .. }));
        let Block::Rows(rows) = &listing.blocks[1] else {
            panic!("expected inline rows");
        };
        assert_eq!(rows[0].id.as_deref(), Some("L3"));
    }

    #[test]
    fn test_full_listing_skips_fragments() {
        let root = demo_root();
        let mut store = TreeStore::new(root.path().to_path_buf(), 2);
        let mut req = load_file_req("demo", "src/lib.rs");
        req.params.push("full__1".to_string());
        let listing: Listing = serde_json::from_str(&store.handle(&req)).unwrap();
        assert_eq!(listing.blocks.len(), 1);
        let Block::Rows(rows) = &listing.blocks[0] else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_path_escape_is_rejected() {
        let root = demo_root();
        let mut store = TreeStore::new(root.path().to_path_buf(), 500);
        let body = store.handle(&load_file_req("demo", "../etc/passwd"));
        let listing: Listing = serde_json::from_str(&body).unwrap();
        assert!(!listing.dir);
        let Block::Rows(rows) = &listing.blocks[0] else {
            panic!("expected rows");
        };
        assert!(rows[0].text().contains("Cannot load"));
    }

    #[test]
    fn test_lookup_finds_definition() {
        let root = demo_root();
        let mut store = TreeStore::new(root.path().to_path_buf(), 500);
        let body = store.handle(&Request::new(
            vec![
                "lookup__+code=alpha".to_string(),
                "v__".to_string(),
                "tree__demo".to_string(),
                "NO_CACHE".to_string(),
            ],
            Callback::Search,
        ));
        let rows: Vec<Row> = serde_json::from_str(&body).unwrap();
        assert!(rows[0].text().contains("alpha: 1 definition"));
        assert!(rows[1].text().starts_with("src/lib.rs:1"));
    }

    #[test]
    fn test_listing_links_known_identifiers() {
        let root = demo_root();
        let mut store = TreeStore::new(root.path().to_path_buf(), 500);
        let body = store.handle(&load_file_req("demo", "src/lib.rs"));
        let listing: Listing = serde_json::from_str(&body).unwrap();
        let Block::Rows(rows) = &listing.blocks[0] else {
            panic!("expected rows");
        };
        // line 3 calls alpha(); the call site carries an sref link
        let has_sref = rows[2].spans.iter().any(|s| {
            matches!(s, Span::Link(l) if l.class == LinkClass::Sref && l.href == "+code=alpha")
        });
        assert!(has_sref, "expected an sref link on the alpha() call");
    }

    #[test]
    fn test_linkify_preserves_non_ascii_text() {
        let mut index = DefIndex::default();
        index.idents.insert("alpha".to_string(), 1);

        let line = "// café alpha résumé";
        let spans = linkify(line, Some(&index));
        let flattened: String = spans
            .iter()
            .map(|s| match s {
                Span::Text(t) => t.as_str(),
                Span::Link(l) => l.text.as_str(),
            })
            .collect();
        assert_eq!(flattened, line);
        assert!(spans.iter().any(|s| {
            matches!(s, Span::Link(l) if l.class == LinkClass::Sref && l.text == "alpha")
        }));
    }

    #[test]
    fn test_releases_for_plain_directory() {
        let root = demo_root();
        let mut store = TreeStore::new(root.path().to_path_buf(), 500);
        let body = store.handle(&Request::new(
            vec!["tree__demo".to_string(), "NO_CACHE".to_string()],
            Callback::Releases,
        ));
        let versions: Vec<String> = serde_json::from_str(&body).unwrap();
        assert_eq!(versions, vec![String::new()]);
    }

    #[test]
    fn test_detect_def() {
        assert_eq!(detect_def("pub fn alpha() {"), Some("alpha"));
        assert_eq!(detect_def("    struct Point {"), Some("Point"));
        assert_eq!(detect_def("#define MAX_LEN 10"), Some("MAX_LEN"));
        assert_eq!(detect_def("def run(self):"), Some("run"));
        assert_eq!(detect_def("let x = 1;"), None);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("/a/./b/").unwrap(), "a/b");
        assert_eq!(sanitize("").unwrap(), "");
        assert!(sanitize("a/../b").is_err());
    }
}
