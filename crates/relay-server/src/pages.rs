//! Static pages compiled into the binary.

/// Game menu.
pub const INDEX_HTML: &str = include_str!("pages/index.html");

/// The Pong page; renders `update` frames and sends `from_browser` input.
pub const PONG_HTML: &str = include_str!("pages/pong.html");

/// Map a request path to its page. Query strings and fragments are ignored.
pub fn page_for(path: &str) -> Option<&'static str> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    match path {
        "/" | "/index.html" => Some(INDEX_HTML),
        "/pong" | "/pong/" => Some(PONG_HTML),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_serves_index() {
        assert_eq!(page_for("/"), Some(INDEX_HTML));
    }

    #[test]
    fn pong_serves_game() {
        assert_eq!(page_for("/pong"), Some(PONG_HTML));
        assert_eq!(page_for("/pong?debug=1"), Some(PONG_HTML));
    }

    #[test]
    fn unknown_path_has_no_page() {
        assert!(page_for("/admin").is_none());
        assert!(page_for("").is_none());
    }

    #[test]
    fn index_links_to_pong() {
        assert!(INDEX_HTML.contains("href=\"/pong\""));
    }

    #[test]
    fn pong_page_speaks_the_relay_protocol() {
        assert!(PONG_HTML.contains("WebSocket"));
        assert!(PONG_HTML.contains("from_browser"));
        assert!(PONG_HTML.contains("update"));
        assert!(PONG_HTML.contains("feedback"));
    }
}
