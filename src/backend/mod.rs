//! The fetch primitive: a parameter list goes in, a response body comes
//! back as text, and exactly one callback target is invoked per request.
//! The content store runs on its own thread; requests and responses travel
//! over mpsc channels, so responses land in completion order — if two
//! requests race, the last response to arrive wins.

mod tree;

pub use tree::TreeStore;

use std::sync::mpsc::{Receiver, Sender};
use std::thread;

/// Which finalize path a response body feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    LoadFile,
    LoadFragment,
    Search,
    Releases,
}

/// One asynchronous fetch: `key__value` parameters plus the callback the
/// response is handed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub params: Vec<String>,
    pub callback: Callback,
}

impl Request {
    pub fn new(params: Vec<String>, callback: Callback) -> Request {
        Request { params, callback }
    }

    /// Value of a `key__value` parameter, if present.
    pub fn param(&self, key: &str) -> Option<&str> {
        let prefix = format!("{key}__");
        self.params.iter().find_map(|p| p.strip_prefix(prefix.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub callback: Callback,
    pub body: String,
}

/// Run the content store on a worker thread, draining requests until the
/// request sender hangs up.
pub fn spawn(
    mut store: TreeStore,
    rx: Receiver<Request>,
    tx: Sender<Response>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(req) = rx.recv() {
            let body = store.handle(&req);
            if tx
                .send(Response {
                    callback: req.callback,
                    body,
                })
                .is_err()
            {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_extraction() {
        let req = Request::new(
            vec![
                "tree__linux".to_string(),
                "file__kernel/fork.c".to_string(),
                "v__".to_string(),
                "NO_CACHE".to_string(),
            ],
            Callback::LoadFile,
        );
        assert_eq!(req.param("tree"), Some("linux"));
        assert_eq!(req.param("file"), Some("kernel/fork.c"));
        assert_eq!(req.param("v"), Some(""));
        assert_eq!(req.param("frag"), None);
    }
}
