use crate::backend::{Callback, Request, Response};
use crate::config::LxrConfig;
use crate::nav::{self, popup, Location, NavAction, NavMode, Navigator, Watchdog};
use crate::page::{self, Block, ClickAction, FragState, LinkClass, Listing, Page, PanelBody};
use std::sync::mpsc::Sender;
use std::time::Instant;

/// Whether we're navigating or typing in the search box / address line
#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    Search(String),
    Address(String),
}

/// The secondary results window popup mode opens (and reuses).
#[derive(Debug, Clone)]
pub struct PopupPane {
    pub name: String,
    pub body: PanelBody,
}

/// Top-level application state: the page model, the navigation engine and
/// the host-side concerns a browser would own (history, focus, scrolling,
/// default navigation).
pub struct App {
    pub cfg: LxrConfig,
    pub page: Page,
    pub nav: Navigator,
    pub watchdog: Watchdog,
    req_tx: Sender<Request>,
    cache_token: String,
    /// What the host believes is displayed; drives default (whole-page)
    /// navigation in off/popup modes.
    pub current: Location,
    /// Target of an in-flight whole-page load.
    full_target: Option<Location>,
    pub input: InputMode,
    pub link_cursor: usize,
    pub scroll: usize,
    pub history: Vec<String>,
    pub hist_pos: usize,
    pub notice: Option<(String, Instant)>,
    pub popup: Option<PopupPane>,
    pub should_quit: bool,
}

impl App {
    pub fn new(cfg: LxrConfig, req_tx: Sender<Request>, initial: Location) -> App {
        let mode = cfg.nav_mode();
        let cache_token = format!("t{}", chrono::Local::now().timestamp());
        let serial = std::process::id();
        let poll = cfg.nav.poll_interval_ms;

        let mut page = Page::new();
        page.fragment = initial.fragment();

        let mut app = App {
            cfg,
            page,
            nav: Navigator::new(mode, &cache_token, serial),
            watchdog: Watchdog::new(poll),
            req_tx,
            cache_token,
            current: initial.clone(),
            full_target: None,
            input: InputMode::Normal,
            link_cursor: 0,
            scroll: 0,
            history: vec![initial.fragment()],
            hist_pos: 0,
            notice: None,
            popup: None,
            should_quit: false,
        };
        match mode {
            NavMode::Incremental => {
                let reqs = app.nav.load_content(&mut app.page);
                for req in reqs {
                    app.send(req);
                }
            }
            NavMode::Off | NavMode::Popup => app.full_load(initial),
        }
        app
    }

    fn send(&self, req: Request) {
        // Fire-and-forget; a vanished worker only means no response ever
        // arrives, which the engine already tolerates.
        if self.req_tx.send(req).is_err() {
            log::warn!("content worker is gone");
        }
    }

    /// Navigate to a location through whichever style is active.
    pub fn open(&mut self, loc: Location) {
        match self.nav.mode() {
            NavMode::Incremental => {
                let action =
                    self.nav
                        .load_file(&mut self.page, &loc.tree, &loc.file, &loc.revision, loc.line);
                match action {
                    NavAction::Fetch(req) => self.send(req),
                    NavAction::LineJump => self.follow_fragment_line(),
                    NavAction::Default => self.full_load(loc),
                }
            }
            NavMode::Off | NavMode::Popup => self.full_load(loc),
        }
    }

    /// Default whole-page navigation: rebuild everything, the way a
    /// browser would on a plain link click.
    fn full_load(&mut self, loc: Location) {
        self.page.set_progress("Loading...");
        self.full_target = Some(loc.clone());
        let file = if loc.file.is_empty() {
            "/"
        } else {
            loc.file.as_str()
        };
        self.send(Request::new(
            vec![
                format!("tree__{}", loc.tree),
                format!("file__{file}"),
                format!("v__{}", loc.revision),
                format!("line__{}", loc.line.max(1)),
                "full__1".to_string(),
                self.cache_token.clone(),
            ],
            Callback::LoadFile,
        ));
        self.send(Request::new(
            vec![format!("tree__{}", loc.tree), self.cache_token.clone()],
            Callback::Releases,
        ));
    }

    /// Route one worker response into the matching finalize path.
    pub fn on_response(&mut self, resp: Response) {
        match self.nav.mode() {
            NavMode::Incremental => match resp.callback {
                Callback::LoadFile => {
                    let reqs = self.nav.finalize_file(&mut self.page, &resp.body);
                    for req in reqs {
                        self.send(req);
                    }
                    self.current = self.nav.loaded().clone();
                    self.link_cursor = 0;
                    self.follow_fragment_line();
                    self.push_history();
                }
                Callback::LoadFragment => {
                    let reqs = self.nav.finalize_fragment(&mut self.page, &resp.body);
                    for req in reqs {
                        self.send(req);
                    }
                    // Earlier fragments filling in shift the target line's
                    // display position; keep it in view during the drain.
                    let (_, line) = nav::split_line_suffix(&self.page.fragment);
                    if line > 0 {
                        self.follow_fragment_line();
                    }
                }
                Callback::Search => self.nav.finalize_search(&mut self.page, &resp.body),
                Callback::Releases => self.nav.finalize_releases(&mut self.page, &resp.body),
            },
            NavMode::Off | NavMode::Popup => match resp.callback {
                Callback::LoadFile => self.finish_full_load(&resp.body),
                Callback::Releases => {
                    let versions: Vec<String> =
                        serde_json::from_str(&resp.body).unwrap_or_default();
                    if !versions.is_empty() {
                        self.page.versions = versions;
                    }
                    self.page.selected_version = self.current.revision.clone();
                }
                Callback::Search => {
                    if let Some(pane) = &mut self.popup {
                        pane.body = serde_json::from_str(&resp.body)
                            .map(PanelBody::Rows)
                            .unwrap_or_else(|_| PanelBody::Rows(Vec::new()));
                    }
                }
                Callback::LoadFragment => {}
            },
        }
    }

    fn finish_full_load(&mut self, body: &str) {
        let listing: Listing = match serde_json::from_str(body) {
            Ok(listing) => listing,
            Err(err) => {
                log::warn!("discarding unparsable page payload: {err}");
                return;
            }
        };
        let Some(loc) = self.full_target.take() else {
            return;
        };
        let dir = listing.dir;
        self.page.set_listing(listing);
        page::apply_chrome(&mut self.page, &loc, dir);
        self.page.fragment = loc.fragment();
        self.page.selected_version = loc.revision.clone();
        self.current = loc;
        if self.nav.mode() == NavMode::Popup {
            popup::prepare(&mut self.page, self.nav.window_serial());
        }
        self.link_cursor = 0;
        self.follow_fragment_line();
        self.push_history();
    }

    // ── Clicks ──

    /// Activate the link under the cursor.
    pub fn click_current(&mut self) {
        let (class, href, onclick) = {
            let links = self.page.links();
            match links.get(self.link_cursor) {
                Some(link) => (link.class, link.href.clone(), link.onclick),
                None => return,
            }
        };
        match onclick {
            Some(ClickAction::Nav) => match self.nav.nav_click(&mut self.page, &href) {
                NavAction::Fetch(req) => self.send(req),
                NavAction::LineJump => self.follow_fragment_line(),
                NavAction::Default => self.default_click(class, &href),
            },
            Some(ClickAction::JumpLine) => {
                let reqs = self.nav.jump_line(&mut self.page, &href);
                for req in reqs {
                    self.send(req);
                }
                self.follow_fragment_line();
            }
            Some(ClickAction::Lookup) => {
                if let Some(req) = self.nav.lookup_anchor(&mut self.page, &href) {
                    self.send(req);
                }
            }
            Some(ClickAction::PopupAnchor) => self.popup_click(&href),
            None => self.default_click(class, &href),
        }
    }

    /// Un-intercepted click: what the browser itself would do.
    fn default_click(&mut self, class: LinkClass, href: &str) {
        match class {
            LinkClass::Line => {
                let (_, line) = nav::split_line_suffix(href);
                if line > 0 {
                    let loc = Location {
                        line,
                        ..self.current.clone()
                    };
                    self.page.fragment = loc.fragment();
                    self.follow_fragment_line();
                }
            }
            _ => {
                let target = nav::strip_site_prefix(href);
                let (file, line) = nav::split_line_suffix(target);
                self.full_load(Location {
                    tree: self.current.tree.clone(),
                    file: file.to_string(),
                    revision: self.current.revision.clone(),
                    line,
                });
            }
        }
    }

    /// Popup-armed anchor: retarget it at the secondary window, then show
    /// that window with the link's lookup results.
    fn popup_click(&mut self, href: &str) {
        popup::anchor_click(&mut self.page, self.link_cursor);
        let Some(name) = self.page.window_name.clone() else {
            return;
        };
        self.popup = Some(PopupPane {
            name: format!("popup_{name}"),
            body: PanelBody::Progress("Searching...".to_string()),
        });
        let target = nav::strip_site_prefix(href).to_string();
        self.send(Request::new(
            vec![
                format!("lookup__{target}"),
                format!("v__{}", self.page.selected_version),
                format!("tree__{}", self.current.tree),
                self.cache_token.clone(),
            ],
            Callback::Search,
        ));
    }

    // ── Input submissions ──

    pub fn submit_search(&mut self, term: &str) {
        if term.is_empty() {
            return;
        }
        match self.nav.mode() {
            NavMode::Incremental => {
                if let Some(req) = self.nav.do_search(&mut self.page, term) {
                    self.send(req);
                }
            }
            NavMode::Popup => {
                // Retargets the form and opens the popup window; the popup
                // then loads the search results.
                let _ = self.nav.do_search(&mut self.page, term);
                if let Some(target) = self.page.form.target.clone() {
                    self.popup = Some(PopupPane {
                        name: target,
                        body: PanelBody::Progress("Searching...".to_string()),
                    });
                }
                self.send(Request::new(
                    vec![
                        format!("search__{term}"),
                        format!("v__{}", self.page.selected_version),
                        format!("tree__{}", self.current.tree),
                        self.cache_token.clone(),
                    ],
                    Callback::Search,
                ));
            }
            NavMode::Off => self.notify("search needs incremental or popup navigation"),
        }
    }

    /// Commit an edited address line — the same thing as typing in a
    /// browser's URL fragment.
    pub fn submit_address(&mut self, fragment: &str) {
        self.page.fragment = fragment.to_string();
        if self.nav.mode() != NavMode::Incremental {
            self.open(Location::parse(fragment));
        }
        // Incremental mode: the watchdog notices and reconciles.
    }

    // ── History ──

    fn push_history(&mut self) {
        if self.history.get(self.hist_pos).map(String::as_str) == Some(self.page.fragment.as_str())
        {
            return;
        }
        self.history.truncate(self.hist_pos + 1);
        self.history.push(self.page.fragment.clone());
        self.hist_pos = self.history.len() - 1;
    }

    pub fn back(&mut self) {
        if self.hist_pos > 0 {
            self.hist_pos -= 1;
            self.apply_history();
        }
    }

    pub fn forward(&mut self) {
        if self.hist_pos + 1 < self.history.len() {
            self.hist_pos += 1;
            self.apply_history();
        }
    }

    fn apply_history(&mut self) {
        let fragment = self.history[self.hist_pos].clone();
        self.page.fragment = fragment.clone();
        if self.nav.mode() != NavMode::Incremental {
            self.full_load(Location::parse(&fragment));
        }
        // Incremental mode: watchdog reconciliation, exactly like browser
        // back/forward over hash changes.
    }

    // ── Versions ──

    pub fn version_next(&mut self) {
        if self.nav.mode() == NavMode::Incremental {
            let reqs = self.nav.next_version(&mut self.page);
            for req in reqs {
                self.send(req);
            }
            return;
        }
        let idx = self.selected_version_index();
        if idx > 0 {
            self.reload_at_version(idx - 1);
        }
    }

    pub fn version_previous(&mut self) {
        if self.nav.mode() == NavMode::Incremental {
            let reqs = self.nav.previous_version(&mut self.page);
            for req in reqs {
                self.send(req);
            }
            return;
        }
        let idx = self.selected_version_index();
        if idx + 1 < self.page.versions.len() {
            self.reload_at_version(idx + 1);
        }
    }

    fn selected_version_index(&self) -> usize {
        self.page
            .versions
            .iter()
            .position(|v| *v == self.page.selected_version)
            .unwrap_or(0)
    }

    fn reload_at_version(&mut self, idx: usize) {
        let revision = self.page.versions[idx].clone();
        self.page.selected_version = revision.clone();
        self.full_load(Location {
            revision,
            line: 0,
            ..self.current.clone()
        });
    }

    pub fn reload(&mut self) {
        if self.nav.mode() == NavMode::Incremental {
            let reqs = self.nav.load_content(&mut self.page);
            for req in reqs {
                self.send(req);
            }
        } else {
            self.full_load(self.current.clone());
        }
    }

    pub fn show_prefs_hint(&mut self) {
        match self.nav.prefs_path(".") {
            Some(path) => self.notify(&format!("preferences: {path}")),
            None => self.notify("preferences are a server page in this mode"),
        }
    }

    // ── Ticks ──

    /// Drive the address-line watchdog at its configured interval.
    pub fn watchdog_tick(&mut self) {
        if !self.nav.watchdog_armed() || !self.watchdog.due() {
            return;
        }
        let reqs = self.nav.check_hash(&mut self.page);
        for req in reqs {
            self.send(req);
        }
    }

    /// Per-iteration housekeeping: expire notifications.
    pub fn tick(&mut self) {
        if let Some((_, since)) = &self.notice {
            if since.elapsed().as_secs() >= 3 {
                self.notice = None;
            }
        }
    }

    pub fn notify(&mut self, msg: &str) {
        self.notice = Some((msg.to_string(), Instant::now()));
    }

    // ── Focus and scrolling ──

    pub fn next_link(&mut self) {
        let n = self.page.links().len();
        if n > 0 {
            self.link_cursor = (self.link_cursor + 1) % n;
        }
    }

    pub fn prev_link(&mut self) {
        let n = self.page.links().len();
        if n > 0 {
            self.link_cursor = (self.link_cursor + n - 1) % n;
        }
    }

    pub fn scroll_down(&mut self, by: usize) {
        self.scroll = (self.scroll + by).min(self.row_count().saturating_sub(1));
    }

    pub fn scroll_up(&mut self, by: usize) {
        self.scroll = self.scroll.saturating_sub(by);
    }

    pub fn scroll_top(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_bottom(&mut self) {
        self.scroll = self.row_count().saturating_sub(1);
    }

    /// Number of display rows the listing occupies (a pending fragment
    /// renders as one placeholder row).
    pub fn row_count(&self) -> usize {
        let Some(listing) = self.page.listing() else {
            return 0;
        };
        listing
            .blocks
            .iter()
            .map(|block| match block {
                Block::Rows(rows) => rows.len(),
                Block::Fragment {
                    state: FragState::Pending,
                    ..
                } => 1,
                Block::Fragment { rows, .. } => rows.len(),
            })
            .sum()
    }

    /// Display index of the row with the given element id.
    pub fn row_index_of(&self, id: &str) -> Option<usize> {
        let listing = self.page.listing()?;
        let mut idx = 0;
        for block in listing.blocks.iter() {
            match block {
                Block::Fragment {
                    state: FragState::Pending,
                    ..
                } => idx += 1,
                Block::Rows(rows) | Block::Fragment { rows, .. } => {
                    for row in rows {
                        if row.id.as_deref() == Some(id) {
                            return Some(idx);
                        }
                        idx += 1;
                    }
                }
            }
        }
        None
    }

    /// Scroll so the address line's target line is in view.
    fn follow_fragment_line(&mut self) {
        let (_, line) = nav::split_line_suffix(&self.page.fragment);
        if line == 0 {
            self.scroll = 0;
            return;
        }
        if let Some(idx) = self.row_index_of(&format!("L{line}")) {
            self.scroll = idx.saturating_sub(5);
        }
    }
}
