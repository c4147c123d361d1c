use serde::{Deserialize, Serialize};

/// A parsed navigation target: which tree, file and revision to show, and
/// which line to land on (`0` means no line).
///
/// The address line encodes this as `tree[+revision]/file[#Lline]` — tree
/// and revision separated by `+`, the file path after the first `/`, and an
/// optional trailing `#L<n>` anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub tree: String,
    pub file: String,
    pub revision: String,
    pub line: u32,
}

impl Location {
    pub fn new(tree: &str, file: &str, revision: &str, line: u32) -> Self {
        Location {
            tree: tree.to_string(),
            file: file.to_string(),
            revision: revision.to_string(),
            line,
        }
    }

    /// Parse an address-line fragment. Malformed input degrades to empty
    /// fields rather than erroring: an unparsable fragment means "root of
    /// the tree, no file, no line".
    pub fn parse(fragment: &str) -> Location {
        let frag = fragment.strip_prefix('#').unwrap_or(fragment);
        let (head, rest) = match frag.split_once('/') {
            Some((head, rest)) => (head, rest),
            None => (frag, ""),
        };
        let (tree, revision) = match head.split_once('+') {
            Some((tree, revision)) => (tree, revision),
            None => (head, ""),
        };
        let (file, line) = split_line_suffix(rest);
        Location {
            tree: tree.to_string(),
            file: file.to_string(),
            revision: revision.to_string(),
            line,
        }
    }

    /// `tree[+revision]` — the tree portion of a full path.
    pub fn full_tree(&self) -> String {
        if self.revision.is_empty() {
            self.tree.clone()
        } else {
            format!("{}+{}", self.tree, self.revision)
        }
    }

    /// `tree[+revision]/file`, without any line suffix.
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.full_tree(), self.file.trim_start_matches('/'))
    }

    /// The full address-line fragment, with the line suffix when a line is
    /// set.
    pub fn fragment(&self) -> String {
        if self.line > 0 {
            format!("{}#L{}", self.full_path(), self.line)
        } else {
            self.full_path()
        }
    }

    /// Whether two locations address the same fetchable resource. Line is
    /// deliberately excluded: line-only changes never warrant a new fetch.
    pub fn same_target(&self, other: &Location) -> bool {
        self.tree == other.tree && self.file == other.file && self.revision == other.revision
    }
}

/// Split a trailing `#L<digits>` anchor off a fragment, returning the rest
/// and the parsed line (`0` when absent or malformed).
pub fn split_line_suffix(s: &str) -> (&str, u32) {
    if let Some(pos) = s.rfind("#L") {
        let digits = &s[pos + 2..];
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(line) = digits.parse() {
                return (&s[..pos], line);
            }
        }
    }
    (s, 0)
}

/// Drop a trailing `#L<digits>` anchor, keeping everything else intact.
pub fn strip_line_suffix(s: &str) -> &str {
    split_line_suffix(s).0
}

/// The element id (`L<digits>`) of a fragment's trailing line anchor.
pub fn line_anchor_id(s: &str) -> Option<&str> {
    let pos = s.rfind("#L")?;
    let (_, line) = split_line_suffix(s);
    if line > 0 {
        Some(&s[pos + 1..])
    } else {
        None
    }
}

/// Strip the site prefix from an intercepted href, leaving the tree-relative
/// part. Absolute hrefs carry the site base up through the `+*/` marker;
/// relative hrefs pass through unchanged.
pub fn strip_site_prefix(href: &str) -> &str {
    match href.find("+*/") {
        Some(pos) => &href[pos + 3..],
        None => href,
    }
}
