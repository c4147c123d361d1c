//! Popup-mode navigation: results open in a secondary, reused window
//! instead of in place. Each window gets a stable unique name once;
//! outgoing symbol links and search submissions are retargeted at
//! `popup_<window name>` and tagged with `navtarget=<window name>` so the
//! destination page can answer back to the right window.

use crate::page::{ClickAction, LinkClass, Page};

/// Assign the per-window unique name, once.
pub fn window_unique(page: &mut Page, serial: u32) {
    if page.window_name.is_none() {
        page.window_name = Some(format!("lxr_source_{serial}"));
    }
}

/// Arm popup click behavior on every symbol-reference link.
pub fn prepare(page: &mut Page, serial: u32) {
    window_unique(page, serial);
    for link in page.all_links_mut() {
        if matches!(link.class, LinkClass::Sref | LinkClass::Falt) {
            link.onclick = Some(ClickAction::PopupAnchor);
        }
    }
}

/// Handle a click on a popup-armed anchor: open (or reuse) the secondary
/// window and rewrite the anchor so later clicks keep using it.
/// `link_index` addresses the link in [`Page::all_links_mut`] order.
pub fn anchor_click(page: &mut Page, link_index: usize) {
    let Some(name) = page.window_name.clone() else {
        return;
    };
    let popup_name = format!("popup_{name}");
    page.open_window(&popup_name);

    let mut links = page.all_links_mut();
    let Some(link) = links.get_mut(link_index) else {
        return;
    };
    link.target = Some(popup_name);
    if !link.href.contains("navtarget=") {
        let sep = if link.href.contains('?') {
            ";navtarget="
        } else {
            "?navtarget="
        };
        link.href = format!("{}{sep}{name}", link.href);
    }
}

/// Retarget a search submission at the popup window, recording the window
/// name in the form's hidden `navtarget` field before it goes out.
pub fn search(page: &mut Page, serial: u32) {
    window_unique(page, serial);
    let Some(name) = page.window_name.clone() else {
        return;
    };
    let popup_name = format!("popup_{name}");
    page.form.target = Some(popup_name.clone());
    page.form.navtarget = name;
    page.open_window(&popup_name);
}

/// Point the search form back at this window (used by pages shown inside
/// the popup).
pub fn navigate_here(page: &mut Page) {
    page.form.target = page.window_name.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Block, Content, Link, Listing, Row, Span};

    fn page_with_sref(href: &str) -> Page {
        let mut page = Page::new();
        page.content = Content::Listing(Listing {
            dir: false,
            blocks: vec![Block::Rows(vec![Row {
                id: None,
                name: None,
                spans: vec![Span::Link(Link::new(LinkClass::Sref, href, "sym"))],
            }])],
        });
        page
    }

    #[test]
    fn test_window_name_assigned_once() {
        let mut page = Page::new();
        window_unique(&mut page, 7);
        assert_eq!(page.window_name.as_deref(), Some("lxr_source_7"));
        window_unique(&mut page, 9);
        assert_eq!(page.window_name.as_deref(), Some("lxr_source_7"));
    }

    #[test]
    fn test_prepare_arms_only_symbol_links() {
        let mut page = page_with_sref("+code=x");
        page.breadcrumb = vec![Span::Link(Link::new(LinkClass::Fref, ".", "t"))];
        prepare(&mut page, 1);
        let links = page.links();
        assert_eq!(links[0].onclick, None);
        assert_eq!(links[1].onclick, Some(ClickAction::PopupAnchor));
    }

    #[test]
    fn test_anchor_click_rewrites_href_and_target() {
        let mut page = page_with_sref("+code=x");
        prepare(&mut page, 3);
        anchor_click(&mut page, 0);
        let links = page.links();
        assert_eq!(links[0].target.as_deref(), Some("popup_lxr_source_3"));
        assert_eq!(links[0].href, "+code=x?navtarget=lxr_source_3");
        assert_eq!(page.open_windows, vec!["popup_lxr_source_3".to_string()]);
    }

    #[test]
    fn test_anchor_click_appends_with_semicolon_after_query() {
        let mut page = page_with_sref("+search?q=x");
        prepare(&mut page, 3);
        anchor_click(&mut page, 0);
        assert_eq!(page.links()[0].href, "+search?q=x;navtarget=lxr_source_3");
    }

    #[test]
    fn test_anchor_click_is_idempotent() {
        let mut page = page_with_sref("+code=x");
        prepare(&mut page, 3);
        anchor_click(&mut page, 0);
        anchor_click(&mut page, 0);
        assert_eq!(page.links()[0].href, "+code=x?navtarget=lxr_source_3");
        assert_eq!(page.open_windows.len(), 1);
    }

    #[test]
    fn test_search_retargets_form() {
        let mut page = Page::new();
        search(&mut page, 5);
        assert_eq!(page.form.target.as_deref(), Some("popup_lxr_source_5"));
        assert_eq!(page.form.navtarget, "lxr_source_5");
        assert_eq!(page.open_windows, vec!["popup_lxr_source_5".to_string()]);
    }

    #[test]
    fn test_navigate_here_targets_own_window() {
        let mut page = Page::new();
        window_unique(&mut page, 5);
        navigate_here(&mut page);
        assert_eq!(page.form.target.as_deref(), Some("lxr_source_5"));
    }
}
