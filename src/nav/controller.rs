use super::location::{self, Location};
use super::popup;
use crate::backend::{Callback, Request};
use crate::page::{self, ClickAction, LinkClass, Page, PanelBody, Row};

/// How clicks are handled: incrementally in place, via a secondary window,
/// or not at all (default whole-page navigation). A single mode is selected
/// at startup; incremental and popup are mutually exclusive by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavMode {
    Off,
    Incremental,
    Popup,
}

/// Outcome of a dispatch: what the caller should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum NavAction {
    /// Incremental navigation is off; let default navigation proceed.
    Default,
    /// Same target already pending; only the line anchor moved, no fetch.
    LineJump,
    /// A fetch was initiated for a new target.
    Fetch(Request),
}

/// The navigation controller. Owns what used to be process-wide state in a
/// browser: the loaded and pending locations, the address-line baseline the
/// watchdog reconciles against, and the armed/disarmed state of that
/// watchdog. Methods take the page model and return the requests to issue;
/// the event loop sends them to the content worker and feeds responses back
/// into the `finalize_*` methods.
pub struct Navigator {
    mode: NavMode,
    /// Cache-busting token appended to every request.
    cache_token: String,
    loaded: Location,
    /// Baseline address-line fragment, kept equal to the page fragment
    /// except between a user edit and watchdog reconciliation.
    loaded_fragment: String,
    /// Requested but not yet rendered. Compared against new requests to
    /// suppress duplicate in-flight fetches for the same target.
    pending: Option<Location>,
    watchdog_armed: bool,
    /// Serial used to derive the per-window unique name.
    window_serial: u32,
}

impl Navigator {
    pub fn new(mode: NavMode, cache_token: &str, window_serial: u32) -> Navigator {
        Navigator {
            mode,
            cache_token: cache_token.to_string(),
            loaded: Location::default(),
            loaded_fragment: String::new(),
            pending: None,
            watchdog_armed: false,
            window_serial,
        }
    }

    pub fn mode(&self) -> NavMode {
        self.mode
    }

    pub fn loaded(&self) -> &Location {
        &self.loaded
    }

    pub fn pending(&self) -> Option<&Location> {
        self.pending.as_ref()
    }

    pub fn watchdog_armed(&self) -> bool {
        self.watchdog_armed
    }

    pub fn window_serial(&self) -> u32 {
        self.window_serial
    }

    /// Dispatch a navigation target: either a local line-only update or a
    /// fetch for new content.
    pub fn load_file(
        &mut self,
        page: &mut Page,
        tree: &str,
        file: &str,
        revision: &str,
        line: u32,
    ) -> NavAction {
        if self.mode != NavMode::Incremental {
            return NavAction::Default;
        }

        self.watchdog_armed = false;

        if let Some(pending) = &self.pending {
            if pending.tree == tree && pending.file == file && pending.revision == revision {
                // Same target: a line jump, not a new fetch.
                let base = location::strip_line_suffix(&page.fragment).to_string();
                page.fragment = if line > 0 {
                    format!("{base}#L{line}")
                } else {
                    base
                };
                self.watchdog_armed = true;
                return NavAction::LineJump;
            }
        }

        page.set_progress("Loading...");
        self.pending = Some(Location::new(tree, file, revision, line));

        let file_param = if file.is_empty() { "/" } else { file };
        let req = Request::new(
            vec![
                format!("tree__{tree}"),
                format!("file__{file_param}"),
                format!("v__{revision}"),
                format!("line__{}", line.max(1)),
                self.cache_token.clone(),
            ],
            Callback::LoadFile,
        );
        NavAction::Fetch(req)
    }

    /// Finalize a completed whole-listing fetch: patch the page, promote
    /// pending state to loaded, re-arm link handlers and resume the
    /// fragment drain.
    pub fn finalize_file(&mut self, page: &mut Page, body: &str) -> Vec<Request> {
        let listing: crate::page::Listing = match serde_json::from_str(body) {
            Ok(listing) => listing,
            Err(err) => {
                log::warn!("discarding unparsable listing payload: {err}");
                return Vec::new();
            }
        };
        let Some(pending) = self.pending.clone() else {
            log::warn!("listing response with no pending navigation");
            return Vec::new();
        };

        let dir = listing.dir;
        page.set_listing(listing);
        page::apply_chrome(page, &pending, dir);

        let full_path = Location {
            line: 0,
            ..pending.clone()
        }
        .full_path();

        self.watchdog_armed = false;
        if pending.line > 0 {
            let anchor = format!("L{}", pending.line);
            if let Some(row) = page.row_by_id_mut(&anchor) {
                let named = format!("{full_path}#L{}", pending.line);
                row.name = Some(named.clone());
                page.fragment = named;
            } else {
                page.fragment = full_path;
            }
            self.loaded.line = pending.line;
        } else {
            page.fragment = full_path;
            self.loaded.line = 0;
        }
        self.loaded_fragment = page.fragment.clone();
        self.loaded.tree = pending.tree;
        self.loaded.file = pending.file;
        self.loaded.revision = pending.revision;
        self.watchdog_armed = true;

        self.arm_links(page);
        self.next_pending_fragment(page).into_iter().collect()
    }

    /// Request the first not-yet-loaded fragment, if any. Fragments drain
    /// strictly one at a time: the next request is only issued from the
    /// previous fragment's finalize.
    pub fn next_pending_fragment(&self, page: &Page) -> Option<Request> {
        let id = page.first_pending_fragment()?;
        let tree = self
            .pending
            .as_ref()
            .map(|p| p.tree.as_str())
            .unwrap_or(self.loaded.tree.as_str());
        Some(Request::new(
            vec![
                format!("tree__{tree}"),
                format!("frag__{id}"),
                self.cache_token.clone(),
            ],
            Callback::LoadFragment,
        ))
    }

    /// Finalize one fragment fetch. The payload is `<element id>|<rows>`;
    /// a response whose target element no longer exists is silently
    /// discarded.
    pub fn finalize_fragment(&mut self, page: &mut Page, body: &str) -> Vec<Request> {
        let Some((id, rest)) = body.split_once('|') else {
            return Vec::new();
        };
        let rows: Vec<Row> = serde_json::from_str(rest).unwrap_or_default();
        if !page.fill_fragment(id, rows) {
            // Navigation moved on; drop the stale response.
            return Vec::new();
        }
        for link in page.fragment_links_mut(id) {
            link.onclick = arm_action(self.mode, link.class);
        }
        self.next_pending_fragment(page).into_iter().collect()
    }

    /// Address-line watchdog check. Distinguishes a line-only change (cheap
    /// in-page rename) from a real navigation (full reload).
    pub fn check_hash(&mut self, page: &mut Page) -> Vec<Request> {
        if page.fragment == self.loaded_fragment {
            return Vec::new();
        }
        if location::strip_line_suffix(&page.fragment)
            == location::strip_line_suffix(&self.loaded_fragment)
        {
            if let Some(anchor) = location::line_anchor_id(&page.fragment).map(str::to_string) {
                let fragment = page.fragment.clone();
                if let Some(row) = page.row_by_id_mut(&anchor) {
                    row.name = Some(fragment.clone());
                    self.loaded_fragment = fragment;
                }
                // Row absent: the fragment content may still be loading;
                // the next poll retries without moving the baseline.
            }
            Vec::new()
        } else {
            self.load_content(page)
        }
    }

    /// Full reload driven by the live address-line fragment, plus a
    /// releases fetch to repopulate the version select.
    pub fn load_content(&mut self, page: &mut Page) -> Vec<Request> {
        if self.mode != NavMode::Incremental {
            return Vec::new();
        }
        let loc = Location::parse(&page.fragment);
        let mut reqs = Vec::new();
        if let NavAction::Fetch(req) =
            self.load_file(page, &loc.tree, &loc.file, &loc.revision, loc.line)
        {
            reqs.push(req);
        }
        reqs.push(Request::new(
            vec![format!("tree__{}", loc.tree), self.cache_token.clone()],
            Callback::Releases,
        ));
        reqs
    }

    /// Finalize a releases fetch: fill the version select and point it at
    /// the pending revision.
    pub fn finalize_releases(&mut self, page: &mut Page, body: &str) {
        let versions: Vec<String> = serde_json::from_str(body).unwrap_or_default();
        if !versions.is_empty() {
            page.versions = versions;
        }
        page.selected_version = self
            .pending
            .as_ref()
            .map(|p| p.revision.clone())
            .unwrap_or_else(|| self.loaded.revision.clone());
    }

    /// Handle a click on a file-reference link. A `#L<n>` suffix on the
    /// href carries the landing line through.
    pub fn nav_click(&mut self, page: &mut Page, href: &str) -> NavAction {
        let target = location::strip_site_prefix(href);
        let (file, line) = location::split_line_suffix(target);
        let file = file.to_string();
        let tree = self.loaded.tree.clone();
        let revision = self.loaded.revision.clone();
        self.load_file(page, &tree, &file, &revision, line)
    }

    /// Handle a click on a line-number permalink: patch the line suffix of
    /// the address line and reconcile immediately.
    pub fn jump_line(&mut self, page: &mut Page, href: &str) -> Vec<Request> {
        let (_, line) = location::split_line_suffix(href);
        if line > 0 {
            let base = location::strip_line_suffix(&page.fragment).to_string();
            page.fragment = format!("{base}#L{line}");
        }
        self.check_hash(page)
    }

    /// Handle a click on a symbol-reference link: store the lookup target
    /// and fetch its definitions into the search panel.
    pub fn lookup_anchor(&mut self, page: &mut Page, href: &str) -> Option<Request> {
        if self.mode != NavMode::Incremental {
            return None;
        }
        let target = location::strip_site_prefix(href).to_string();
        page.lookup = target.clone();
        page.show_search_progress("Searching...");
        Some(Request::new(
            vec![
                format!("lookup__{target}"),
                format!("v__{}", page.selected_version),
                format!("tree__{}", self.loaded.tree),
                self.cache_token.clone(),
            ],
            Callback::Search,
        ))
    }

    /// Submit a search. Incremental mode fetches into the results panel;
    /// popup mode retargets the form at the secondary window instead.
    pub fn do_search(&mut self, page: &mut Page, term: &str) -> Option<Request> {
        match self.mode {
            NavMode::Incremental => {
                page.show_search_progress("Searching...");
                Some(Request::new(
                    vec![
                        format!("search__{term}"),
                        format!("v__{}", page.selected_version),
                        format!("tree__{}", self.loaded.tree),
                        self.cache_token.clone(),
                    ],
                    Callback::Search,
                ))
            }
            NavMode::Popup => {
                popup::search(page, self.window_serial);
                None
            }
            NavMode::Off => None,
        }
    }

    /// Finalize a search/lookup fetch into the results panel.
    pub fn finalize_search(&mut self, page: &mut Page, body: &str) {
        let rows: Vec<Row> = serde_json::from_str(body).unwrap_or_default();
        page.search.visible = true;
        page.search.body = PanelBody::Rows(rows);
        // Result links navigate too.
        self.arm_links(page);
    }

    /// Re-dispatch the current file at a newly selected revision, keeping
    /// the current line.
    pub fn update_version(&mut self, page: &mut Page, revision: &str) -> Vec<Request> {
        let rest = match page.fragment.split_once('/') {
            Some((_, rest)) => rest.to_string(),
            None => String::new(),
        };
        let (file, line) = location::split_line_suffix(&rest);
        let file = file.to_string();
        let tree = self.loaded.tree.clone();
        match self.load_file(page, &tree, &file, revision, line) {
            NavAction::Fetch(req) => vec![req],
            _ => Vec::new(),
        }
    }

    /// Step the version select one entry toward the newest revision.
    pub fn next_version(&mut self, page: &mut Page) -> Vec<Request> {
        let idx = selected_index(page);
        if idx > 0 {
            page.selected_version = page.versions[idx - 1].clone();
            let revision = page.selected_version.clone();
            self.update_version(page, &revision)
        } else {
            Vec::new()
        }
    }

    /// Step the version select one entry toward the oldest revision.
    pub fn previous_version(&mut self, page: &mut Page) -> Vec<Request> {
        let idx = selected_index(page);
        if idx + 1 < page.versions.len() {
            page.selected_version = page.versions[idx + 1].clone();
            let revision = page.selected_version.clone();
            self.update_version(page, &revision)
        } else {
            Vec::new()
        }
    }

    /// Where the preferences page lives for the loaded location. Only
    /// meaningful in incremental mode; other modes navigate natively.
    pub fn prefs_path(&self, base: &str) -> Option<String> {
        if self.mode != NavMode::Incremental {
            return None;
        }
        let ret = if self.loaded.file.is_empty() || self.loaded.file == "/" {
            ".".to_string()
        } else {
            self.loaded.file.clone()
        };
        Some(format!(
            "{}/{}/+prefs?return={ret}",
            base.trim_end_matches('/'),
            self.loaded.full_tree()
        ))
    }

    /// Arm click behavior on every link of the page according to its
    /// class. Runs after finalize so freshly inserted content navigates
    /// like the rest of the document.
    pub fn arm_links(&self, page: &mut Page) {
        for link in page.all_links_mut() {
            link.onclick = arm_action(self.mode, link.class);
        }
    }

}

fn arm_action(mode: NavMode, class: LinkClass) -> Option<ClickAction> {
    match mode {
        NavMode::Incremental => match class {
            LinkClass::Fref => Some(ClickAction::Nav),
            LinkClass::Line => Some(ClickAction::JumpLine),
            LinkClass::Sref | LinkClass::Falt => Some(ClickAction::Lookup),
            LinkClass::Plain => None,
        },
        NavMode::Popup => match class {
            LinkClass::Sref | LinkClass::Falt => Some(ClickAction::PopupAnchor),
            _ => None,
        },
        NavMode::Off => None,
    }
}

fn selected_index(page: &Page) -> usize {
    page.versions
        .iter()
        .position(|v| *v == page.selected_version)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Block, FragState, Listing, Span};

    fn nav() -> Navigator {
        Navigator::new(NavMode::Incremental, "NO_CACHE", 1)
    }

    fn file_listing(lines: &[&str]) -> String {
        let rows: Vec<Row> = lines
            .iter()
            .enumerate()
            .map(|(i, text)| Row {
                id: Some(format!("L{}", i + 1)),
                name: None,
                spans: vec![Span::Text(text.to_string())],
            })
            .collect();
        serde_json::to_string(&Listing {
            dir: false,
            blocks: vec![Block::Rows(rows)],
        })
        .unwrap()
    }

    fn fragmented_listing() -> String {
        serde_json::to_string(&Listing {
            dir: false,
            blocks: vec![
                Block::Rows(vec![Row::plain("head")]),
                Block::Fragment {
                    id: "frag1".to_string(),
                    state: FragState::Pending,
                    rows: vec![],
                },
                Block::Fragment {
                    id: "frag2".to_string(),
                    state: FragState::Pending,
                    rows: vec![],
                },
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_dispatch_issues_one_fetch_with_expected_params() {
        let mut nav = nav();
        let mut page = Page::new();
        let action = nav.load_file(&mut page, "linux", "kernel/fork.c", "", 120);
        let NavAction::Fetch(req) = action else {
            panic!("expected a fetch");
        };
        assert!(req.params.contains(&"tree__linux".to_string()));
        assert!(req.params.contains(&"file__kernel/fork.c".to_string()));
        assert!(req.params.contains(&"v__".to_string()));
        assert!(req.params.contains(&"line__120".to_string()));
        assert_eq!(req.callback, Callback::LoadFile);
        assert_eq!(
            nav.pending().unwrap(),
            &Location::new("linux", "kernel/fork.c", "", 120)
        );
        assert!(matches!(page.content, crate::page::Content::Progress(_)));
    }

    #[test]
    fn test_dispatch_same_target_degenerates_to_line_jump() {
        let mut nav = nav();
        let mut page = Page::new();
        let NavAction::Fetch(_) = nav.load_file(&mut page, "linux", "fork.c", "", 5) else {
            panic!("expected a fetch");
        };
        page.fragment = "linux/fork.c#L5".to_string();

        let action = nav.load_file(&mut page, "linux", "fork.c", "", 9);
        assert_eq!(action, NavAction::LineJump);
        assert_eq!(page.fragment, "linux/fork.c#L9");
        assert!(nav.watchdog_armed());
    }

    #[test]
    fn test_dispatch_line_zero_strips_suffix() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "fork.c", "", 5);
        page.fragment = "linux/fork.c#L5".to_string();
        assert_eq!(
            nav.load_file(&mut page, "linux", "fork.c", "", 0),
            NavAction::LineJump
        );
        assert_eq!(page.fragment, "linux/fork.c");
    }

    #[test]
    fn test_dispatch_off_mode_defers_to_default_navigation() {
        let mut nav = Navigator::new(NavMode::Off, "NO_CACHE", 1);
        let mut page = Page::new();
        assert_eq!(
            nav.load_file(&mut page, "linux", "fork.c", "", 1),
            NavAction::Default
        );
    }

    #[test]
    fn test_dispatch_empty_file_defaults_to_root() {
        let mut nav = nav();
        let mut page = Page::new();
        let NavAction::Fetch(req) = nav.load_file(&mut page, "linux", "", "", 0) else {
            panic!("expected a fetch");
        };
        assert!(req.params.contains(&"file__/".to_string()));
        assert!(req.params.contains(&"line__1".to_string()));
        // Pending state keeps the values as requested.
        assert_eq!(nav.pending().unwrap().file, "");
        assert_eq!(nav.pending().unwrap().line, 0);
    }

    #[test]
    fn test_finalize_promotes_pending_and_sets_fragment_with_line() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "kernel/fork.c", "", 120);
        let body = file_listing(&["a"; 200]);

        let followups = nav.finalize_file(&mut page, &body);
        assert!(followups.is_empty());
        assert_eq!(page.fragment, "linux/kernel/fork.c#L120");
        assert_eq!(nav.loaded(), &Location::new("linux", "kernel/fork.c", "", 120));
        assert!(nav.watchdog_armed());
        // The target line's anchor was renamed to full-path form.
        let row = page.row_by_id_mut("L120").unwrap();
        assert_eq!(row.name.as_deref(), Some("linux/kernel/fork.c#L120"));
    }

    #[test]
    fn test_finalize_without_line_or_matching_anchor() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "fork.c", "v6.1", 0);
        nav.finalize_file(&mut page, &file_listing(&["x", "y"]));
        assert_eq!(page.fragment, "linux+v6.1/fork.c");

        // A requested line beyond the listing falls back to the bare path.
        nav.load_file(&mut page, "linux", "fork.c", "", 999);
        nav.finalize_file(&mut page, &file_listing(&["x", "y"]));
        assert_eq!(page.fragment, "linux/fork.c");
    }

    #[test]
    fn test_finalize_directory_hides_print_link() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "mm/", "", 0);
        let body = serde_json::to_string(&Listing {
            dir: true,
            blocks: vec![Block::Rows(vec![Row::plain("../")])],
        })
        .unwrap();
        nav.finalize_file(&mut page, &body);
        assert!(!page.print.visible);

        nav.load_file(&mut page, "linux", "mm/slab.c", "", 0);
        nav.finalize_file(&mut page, &file_listing(&["z"]));
        assert!(page.print.visible);
        assert_eq!(page.print.action, "../linux/+print=mm/slab.c");
    }

    #[test]
    fn test_fragments_drain_sequentially() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "big.c", "", 0);

        // Finalize requests only the first pending fragment.
        let reqs = nav.finalize_file(&mut page, &fragmented_listing());
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].param("frag"), Some("frag1"));
        assert_eq!(reqs[0].param("tree"), Some("linux"));

        // Its arrival patches the page and requests the second.
        let rows = serde_json::to_string(&vec![Row::plain("body1")]).unwrap();
        let reqs = nav.finalize_fragment(&mut page, &format!("frag1|{rows}"));
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].param("frag"), Some("frag2"));

        // After the second lands there is nothing left to fetch.
        let rows = serde_json::to_string(&vec![Row::plain("body2")]).unwrap();
        let reqs = nav.finalize_fragment(&mut page, &format!("frag2|{rows}"));
        assert!(reqs.is_empty());
        assert_eq!(page.first_pending_fragment(), None);
    }

    #[test]
    fn test_stale_fragment_response_is_discarded() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "big.c", "", 0);
        nav.finalize_file(&mut page, &fragmented_listing());

        // Navigation moved on: the listing no longer has frag9.
        let rows = serde_json::to_string(&vec![Row::plain("late")]).unwrap();
        let reqs = nav.finalize_fragment(&mut page, &format!("frag9|{rows}"));
        assert!(reqs.is_empty());
    }

    #[test]
    fn test_watchdog_line_only_change_renames_anchor() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "", 5);
        nav.finalize_file(&mut page, &file_listing(&["1", "2", "3", "4", "5", "6", "7", "8", "9"]));
        assert_eq!(page.fragment, "linux/a.c#L5");

        // Simulated history navigation: same file, different line.
        page.fragment = "linux/a.c#L9".to_string();
        let reqs = nav.check_hash(&mut page);
        assert!(reqs.is_empty(), "line rename must not reload");
        let row = page.row_by_id_mut("L9").unwrap();
        assert_eq!(row.name.as_deref(), Some("linux/a.c#L9"));
        assert!(nav.watchdog_armed());
    }

    #[test]
    fn test_watchdog_missing_anchor_keeps_polling() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "", 1);
        nav.finalize_file(&mut page, &file_listing(&["only"]));

        page.fragment = "linux/a.c#L500".to_string();
        let reqs = nav.check_hash(&mut page);
        assert!(reqs.is_empty());
        // Baseline unmoved, so the next poll will look again.
        page.fragment = "linux/a.c#L1".to_string();
        let reqs = nav.check_hash(&mut page);
        assert!(reqs.is_empty());
        assert_eq!(page.row_by_id_mut("L1").unwrap().name.as_deref(), Some("linux/a.c#L1"));
    }

    #[test]
    fn test_watchdog_real_navigation_triggers_reload() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "", 0);
        nav.finalize_file(&mut page, &file_listing(&["x"]));

        page.fragment = "uboot/b.c#L3".to_string();
        let reqs = nav.check_hash(&mut page);
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].callback, Callback::LoadFile);
        assert!(reqs[0].params.contains(&"tree__uboot".to_string()));
        assert!(reqs[0].params.contains(&"file__b.c".to_string()));
        assert!(reqs[0].params.contains(&"line__3".to_string()));
        assert_eq!(reqs[1].callback, Callback::Releases);
        assert!(reqs[1].params.contains(&"tree__uboot".to_string()));
    }

    #[test]
    fn test_watchdog_steady_state_is_quiet() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "", 0);
        nav.finalize_file(&mut page, &file_listing(&["x"]));
        assert!(nav.check_hash(&mut page).is_empty());
    }

    #[test]
    fn test_jump_line_click_updates_fragment_and_reconciles() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "", 0);
        nav.finalize_file(&mut page, &file_listing(&["1", "2", "3"]));

        let reqs = nav.jump_line(&mut page, "#L2");
        assert!(reqs.is_empty());
        assert_eq!(page.fragment, "linux/a.c#L2");
        assert_eq!(page.row_by_id_mut("L2").unwrap().name.as_deref(), Some("linux/a.c#L2"));
    }

    #[test]
    fn test_nav_click_reuses_loaded_tree_and_revision() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "v6.1", 0);
        nav.finalize_file(&mut page, &file_listing(&["x"]));

        let NavAction::Fetch(req) = nav.nav_click(&mut page, "kernel/fork.c") else {
            panic!("expected a fetch");
        };
        assert!(req.params.contains(&"tree__linux".to_string()));
        assert!(req.params.contains(&"v__v6.1".to_string()));
        assert!(req.params.contains(&"file__kernel/fork.c".to_string()));
    }

    #[test]
    fn test_lookup_anchor_sets_hidden_field_and_panel() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "", 0);
        nav.finalize_file(&mut page, &file_listing(&["x"]));

        let req = nav.lookup_anchor(&mut page, "+code=kmalloc").unwrap();
        assert_eq!(page.lookup, "+code=kmalloc");
        assert!(page.search.visible);
        assert!(matches!(page.search.body, PanelBody::Progress(_)));
        assert!(req.params.contains(&"lookup__+code=kmalloc".to_string()));
        assert!(req.params.contains(&"tree__linux".to_string()));
    }

    #[test]
    fn test_search_incremental_fetches_into_panel() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "", 0);
        nav.finalize_file(&mut page, &file_listing(&["x"]));

        let req = nav.do_search(&mut page, "fork").unwrap();
        assert_eq!(req.callback, Callback::Search);
        assert!(req.params.contains(&"search__fork".to_string()));
        assert!(page.search.visible);

        let rows = serde_json::to_string(&vec![Row::plain("hit")]).unwrap();
        nav.finalize_search(&mut page, &rows);
        assert!(matches!(&page.search.body, PanelBody::Rows(rows) if rows.len() == 1));
    }

    #[test]
    fn test_releases_finalize_selects_pending_revision() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "v6.1", 0);
        let body = serde_json::to_string(&vec!["", "v6.2", "v6.1"]).unwrap();
        nav.finalize_releases(&mut page, &body);
        assert_eq!(page.versions.len(), 3);
        assert_eq!(page.selected_version, "v6.1");
    }

    #[test]
    fn test_version_stepping() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "", 0);
        nav.finalize_file(&mut page, &file_listing(&["x"]));
        page.versions = vec![String::new(), "v6.2".to_string(), "v6.1".to_string()];
        page.selected_version = "v6.2".to_string();

        // Toward older: selects v6.1 and refetches the same file at it.
        let reqs = nav.previous_version(&mut page);
        assert_eq!(page.selected_version, "v6.1");
        assert_eq!(reqs.len(), 1);
        assert!(reqs[0].params.contains(&"v__v6.1".to_string()));
        assert!(reqs[0].params.contains(&"file__a.c".to_string()));

        // Toward newer twice lands on the default revision.
        nav.finalize_file(&mut page, &file_listing(&["x"]));
        page.selected_version = "v6.1".to_string();
        let _ = nav.next_version(&mut page);
        assert_eq!(page.selected_version, "v6.2".to_string());
    }

    #[test]
    fn test_prefs_path() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "kernel/fork.c", "v6.1", 0);
        nav.finalize_file(&mut page, &file_listing(&["x"]));
        assert_eq!(
            nav.prefs_path("http://host/lxr").as_deref(),
            Some("http://host/lxr/linux+v6.1/+prefs?return=kernel/fork.c")
        );
    }

    #[test]
    fn test_arm_links_by_class() {
        let mut nav = nav();
        let mut page = Page::new();
        nav.load_file(&mut page, "linux", "a.c", "", 0);
        let listing = Listing {
            dir: false,
            blocks: vec![Block::Rows(vec![Row {
                id: Some("L1".to_string()),
                name: None,
                spans: vec![
                    Span::Link(crate::page::Link::new(LinkClass::Line, "#L1", "1")),
                    Span::Link(crate::page::Link::new(LinkClass::Sref, "+code=x", "x")),
                    Span::Link(crate::page::Link::new(LinkClass::Plain, "http://x", "x")),
                ],
            }])],
        };
        nav.finalize_file(&mut page, &serde_json::to_string(&listing).unwrap());
        let actions: Vec<Option<ClickAction>> = page.links().iter().map(|l| l.onclick).collect();
        // Breadcrumb frefs first, then the listing's line/sref/plain links.
        assert!(actions[..actions.len() - 3]
            .iter()
            .all(|a| *a == Some(ClickAction::Nav)));
        assert_eq!(
            &actions[actions.len() - 3..],
            &[
                Some(ClickAction::JumpLine),
                Some(ClickAction::Lookup),
                None
            ]
        );
    }
}
