use crate::nav::Location;
use serde::{Deserialize, Serialize};

/// Product name used for page titles.
pub const PRODUCT: &str = "LXR";

/// Link classes carried by listing payloads. These decide which click
/// behavior gets armed on each anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkClass {
    /// File reference — navigates to another listing.
    Fref,
    /// Line-number permalink — jumps within the current listing.
    Line,
    /// Symbol reference — looks up the identifier's definitions.
    Sref,
    /// Alternate definition — a symbol with more than one definition.
    Falt,
    /// Anything else; never intercepted.
    Plain,
}

/// Click behavior armed on a link. `None` means the click falls through to
/// default whole-page navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    Nav,
    JumpLine,
    Lookup,
    PopupAnchor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub class: LinkClass,
    pub href: String,
    pub text: String,
    /// Window the link opens into (popup mode rewrites this).
    #[serde(skip)]
    pub target: Option<String>,
    #[serde(skip)]
    pub onclick: Option<ClickAction>,
}

impl Link {
    pub fn new(class: LinkClass, href: &str, text: &str) -> Link {
        Link {
            class,
            href: href.to_string(),
            text: text.to_string(),
            target: None,
            onclick: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Span {
    Text(String),
    Link(Link),
}

/// One rendered listing row. `id` is the stable element id (`L<n>` for
/// source lines); `name` is the anchor name, rewritten as navigation
/// renames anchors to full-path form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(skip)]
    pub name: Option<String>,
    pub spans: Vec<Span>,
}

impl Row {
    pub fn plain(text: &str) -> Row {
        Row {
            id: None,
            name: None,
            spans: vec![Span::Text(text.to_string())],
        }
    }

    /// The row's text content with link markup flattened away.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            match span {
                Span::Text(t) => out.push_str(t),
                Span::Link(l) => out.push_str(&l.text),
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragState {
    Pending,
    Done,
}

impl Default for FragState {
    fn default() -> Self {
        FragState::Pending
    }
}

/// A run of listing content: either rows delivered inline, or a deferred
/// section served later by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Block {
    Rows(Vec<Row>),
    Fragment {
        id: String,
        #[serde(default)]
        state: FragState,
        #[serde(default)]
        rows: Vec<Row>,
    },
}

/// A whole-listing payload: directory flag plus content blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    pub dir: bool,
    pub blocks: Vec<Block>,
}

/// The main content region: a progress placeholder while a fetch is in
/// flight, a listing once one lands.
#[derive(Debug, Clone)]
pub enum Content {
    Progress(String),
    Listing(Listing),
}

#[derive(Debug, Clone)]
pub enum PanelBody {
    Progress(String),
    Rows(Vec<Row>),
}

/// The search-results panel (hidden until a search or lookup runs).
#[derive(Debug, Clone)]
pub struct SearchPanel {
    pub visible: bool,
    pub body: PanelBody,
}

/// The search form: target window plus the hidden `navtarget` field popup
/// mode fills in before submission.
#[derive(Debug, Clone, Default)]
pub struct SearchForm {
    pub target: Option<String>,
    pub navtarget: String,
}

/// The print-view link and the form whose action it submits.
#[derive(Debug, Clone, Default)]
pub struct PrintLink {
    pub visible: bool,
    pub action: String,
}

/// In-memory model of the rendered page: every element the navigation
/// engine reads or patches. Plays the role the DOM plays in a browser;
/// mutated only from the event loop.
#[derive(Debug, Clone)]
pub struct Page {
    /// Address-line fragment, the single source of truth the watchdog
    /// reconciles against. Stored without a leading `#`.
    pub fragment: String,
    pub title: String,
    pub content: Content,
    pub breadcrumb: Vec<Span>,
    /// Known revisions for the current tree, newest first. The empty string
    /// is the tree's default revision.
    pub versions: Vec<String>,
    pub selected_version: String,
    pub print: PrintLink,
    /// Hidden symbol-lookup field.
    pub lookup: String,
    pub search: SearchPanel,
    pub form: SearchForm,
    /// Per-window unique name, assigned once (popup mode).
    pub window_name: Option<String>,
    /// Names of secondary windows opened so far; opening an existing name
    /// reuses the window instead of spawning another.
    pub open_windows: Vec<String>,
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}

impl Page {
    pub fn new() -> Page {
        Page {
            fragment: String::new(),
            title: PRODUCT.to_string(),
            content: Content::Progress(String::new()),
            breadcrumb: Vec::new(),
            versions: vec![String::new()],
            selected_version: String::new(),
            print: PrintLink::default(),
            lookup: String::new(),
            search: SearchPanel {
                visible: false,
                body: PanelBody::Rows(Vec::new()),
            },
            form: SearchForm::default(),
            window_name: None,
            open_windows: Vec::new(),
        }
    }

    pub fn set_progress(&mut self, msg: &str) {
        self.content = Content::Progress(msg.to_string());
    }

    pub fn set_listing(&mut self, listing: Listing) {
        self.content = Content::Listing(listing);
    }

    pub fn listing(&self) -> Option<&Listing> {
        match &self.content {
            Content::Listing(l) => Some(l),
            Content::Progress(_) => None,
        }
    }

    /// Find a content row by element id (`L<n>` anchors live here).
    pub fn row_by_id_mut(&mut self, id: &str) -> Option<&mut Row> {
        let listing = match &mut self.content {
            Content::Listing(l) => l,
            Content::Progress(_) => return None,
        };
        for block in &mut listing.blocks {
            let rows = match block {
                Block::Rows(rows) => rows,
                Block::Fragment { rows, .. } => rows,
            };
            if let Some(row) = rows.iter_mut().find(|r| r.id.as_deref() == Some(id)) {
                return Some(row);
            }
        }
        None
    }

    /// Id of the first not-yet-loaded fragment, in block order.
    pub fn first_pending_fragment(&self) -> Option<String> {
        let listing = self.listing()?;
        listing.blocks.iter().find_map(|block| match block {
            Block::Fragment { id, state, .. } if *state == FragState::Pending => {
                Some(id.clone())
            }
            _ => None,
        })
    }

    /// Fill a deferred fragment's rows and flag it done. Returns false when
    /// no such fragment exists any more (navigation moved on).
    pub fn fill_fragment(&mut self, id: &str, new_rows: Vec<Row>) -> bool {
        let listing = match &mut self.content {
            Content::Listing(l) => l,
            Content::Progress(_) => return false,
        };
        for block in &mut listing.blocks {
            if let Block::Fragment {
                id: frag_id,
                state,
                rows,
            } = block
            {
                if frag_id == id {
                    *rows = new_rows;
                    *state = FragState::Done;
                    return true;
                }
            }
        }
        false
    }

    /// Mutable references to the links inside one fragment.
    pub fn fragment_links_mut(&mut self, id: &str) -> Vec<&mut Link> {
        let mut out = Vec::new();
        if let Content::Listing(listing) = &mut self.content {
            for block in &mut listing.blocks {
                if let Block::Fragment {
                    id: frag_id, rows, ..
                } = block
                {
                    if frag_id == id {
                        collect_links(rows, &mut out);
                    }
                }
            }
        }
        out
    }

    /// Mutable references to every link on the page: breadcrumb, content
    /// and search results alike.
    pub fn all_links_mut(&mut self) -> Vec<&mut Link> {
        let mut out = Vec::new();
        for span in &mut self.breadcrumb {
            if let Span::Link(link) = span {
                out.push(link);
            }
        }
        if let Content::Listing(listing) = &mut self.content {
            for block in &mut listing.blocks {
                let rows = match block {
                    Block::Rows(rows) => rows,
                    Block::Fragment { rows, .. } => rows,
                };
                collect_links(rows, &mut out);
            }
        }
        if let PanelBody::Rows(rows) = &mut self.search.body {
            collect_links(rows, &mut out);
        }
        out
    }

    /// Immutable snapshot of every link, in the same order as
    /// [`Page::all_links_mut`].
    pub fn links(&self) -> Vec<&Link> {
        let mut out = Vec::new();
        for span in &self.breadcrumb {
            if let Span::Link(link) = span {
                out.push(link);
            }
        }
        if let Content::Listing(listing) = &self.content {
            for block in &listing.blocks {
                let rows = match block {
                    Block::Rows(rows) => rows,
                    Block::Fragment { rows, .. } => rows,
                };
                for row in rows {
                    for span in &row.spans {
                        if let Span::Link(link) = span {
                            out.push(link);
                        }
                    }
                }
            }
        }
        if let PanelBody::Rows(rows) = &self.search.body {
            for row in rows {
                for span in &row.spans {
                    if let Span::Link(link) = span {
                        out.push(link);
                    }
                }
            }
        }
        out
    }

    /// Open a secondary window, reusing an already-open one of the same
    /// name.
    pub fn open_window(&mut self, name: &str) {
        if !self.open_windows.iter().any(|w| w == name) {
            self.open_windows.push(name.to_string());
        }
    }

    pub fn show_search_progress(&mut self, msg: &str) {
        self.search.visible = true;
        self.search.body = PanelBody::Progress(msg.to_string());
    }

    pub fn hide_search(&mut self) {
        self.search.visible = false;
    }
}

fn collect_links<'a>(rows: &'a mut [Row], out: &mut Vec<&'a mut Link>) {
    for row in rows {
        for span in &mut row.spans {
            if let Span::Link(link) = span {
                out.push(link);
            }
        }
    }
}

/// Rebuild the page chrome around a freshly loaded listing: breadcrumb
/// trail, title and print link. Shared between incremental finalize and
/// whole-page loads.
pub fn apply_chrome(page: &mut Page, loc: &Location, dir: bool) {
    // Breadcrumb: the tree link, then one link per non-empty path segment,
    // each href being the path walked so far.
    let mut crumbs = vec![Span::Link(Link::new(LinkClass::Fref, ".", &loc.tree))];
    let mut walked = String::new();
    for seg in loc.file.split('/').filter(|s| !s.is_empty()) {
        crumbs.push(Span::Text("/".to_string()));
        crumbs.push(Span::Link(Link::new(
            LinkClass::Fref,
            &format!("{walked}{seg}"),
            seg,
        )));
        walked.push_str(seg);
        walked.push('/');
    }
    page.breadcrumb = crumbs;
    page.title = format!("{PRODUCT} {}/{}", loc.tree, loc.file);

    if dir {
        page.print.visible = false;
    } else {
        page.print.action = format!(
            "../{}/+print={}",
            loc.full_tree(),
            loc.file.trim_start_matches('/')
        );
        page.print.visible = true;
    }
}
