//! Page location model.
//!
//! The authentication-failure policy needs the current page's path,
//! query and fragment: to build the login `next` target, to avoid
//! redirecting from the login page to itself, and to read the `debug`
//! query flag.

use std::fmt;

/// Query values that switch debug mode on (compared case-insensitively).
const TRUTHY_VALUES: [&str; 4] = ["1", "true", "on", "yes"];

/// Current location of the page, split like `window.location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    path: String,
    query: String,
    fragment: String,
}

impl PageLocation {
    /// Build a location from its parts.  `query` and `fragment` are given
    /// without their leading `?` / `#`.
    pub fn new(
        path: impl Into<String>,
        query: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            path: if path.is_empty() { "/".to_string() } else { path },
            query: query.into(),
            fragment: fragment.into(),
        }
    }

    /// Split `"/path?query#fragment"` or an absolute `http(s)://` URL.
    ///
    /// ```
    /// use addeva_sdk::PageLocation;
    ///
    /// let loc = PageLocation::parse("https://example.com/shop/cart?x=1#top");
    /// assert_eq!(loc.path(), "/shop/cart");
    /// assert_eq!(loc.query(), "x=1");
    /// assert_eq!(loc.fragment(), "top");
    /// ```
    pub fn parse(input: &str) -> Self {
        let relative = strip_origin(input.trim());

        let (rest, fragment) = relative.split_once('#').unwrap_or((relative, ""));
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

        Self::new(path, query, fragment)
    }

    /// Path component, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string without the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Fragment without the leading `#`.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Path + `?query` + `#fragment`, omitting empty parts.
    pub fn return_target(&self) -> String {
        let mut target = self.path.clone();
        if !self.query.is_empty() {
            target.push('?');
            target.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            target.push('#');
            target.push_str(&self.fragment);
        }
        target
    }

    /// First percent-decoded value of the query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(key, _)| decode_component(key) == name)
            .map(|(_, value)| decode_component(value))
    }

    /// Whether the query parameter `param` holds a truthy value
    /// (`1`, `true`, `on`, `yes`).
    pub fn debug_enabled(&self, param: &str) -> bool {
        self.query_param(param).is_some_and(|value| {
            let value = value.trim();
            TRUTHY_VALUES.iter().any(|t| value.eq_ignore_ascii_case(t))
        })
    }

    /// Whether this location already is the login page.
    pub fn is_login_page(&self, login_path: &str) -> bool {
        self.path.contains(login_path)
    }
}

impl Default for PageLocation {
    fn default() -> Self {
        Self::new("/", "", "")
    }
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.return_target())
    }
}

/// Build the login destination for a user currently at `current`:
/// `<login_path>?mode=login&next=<encoded return target>`.
pub fn login_url(login_path: &str, current: &PageLocation) -> String {
    let target = current.return_target();
    let next = encode_uri_component(&target);
    format!("{login_path}?mode=login&next={next}")
}

/// Percent-encode like `encodeURIComponent`: `! ' ( ) *` stay literal.
fn encode_uri_component(raw: &str) -> String {
    let encoded = urlencoding::encode(raw);
    [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%2A", "*")]
        .iter()
        .fold(encoded.into_owned(), |acc, (from, to)| acc.replace(from, to))
}

fn strip_origin(input: &str) -> &str {
    for scheme in ["http://", "https://"] {
        if input
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        {
            let after = &input[scheme.len()..];
            return after.find(['/', '?', '#']).map_or("", |idx| &after[idx..]);
        }
    }
    input
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).map_or(spaced.clone(), |s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_relative_location() {
        let loc = PageLocation::parse("/products/list.html?page=2&sort=asc#item-5");
        assert_eq!(loc.path(), "/products/list.html");
        assert_eq!(loc.query(), "page=2&sort=asc");
        assert_eq!(loc.fragment(), "item-5");
    }

    #[test]
    fn parse_origin_only_url() {
        let loc = PageLocation::parse("https://addeva.example");
        assert_eq!(loc.path(), "/");
        assert_eq!(loc.return_target(), "/");

        let loc = PageLocation::parse("HTTP://addeva.example?debug=1");
        assert_eq!(loc.path(), "/");
        assert_eq!(loc.query(), "debug=1");
    }

    #[test]
    fn login_url_keeps_uri_component_marks() {
        let loc = PageLocation::parse("/news/(2024)*!it's.html?q=50%");
        assert_eq!(
            login_url("/support/login.html", &loc),
            "/support/login.html?mode=login&next=%2Fnews%2F(2024)*!it's.html%3Fq%3D50%25"
        );
    }

    #[test]
    fn parse_non_ascii_path() {
        let loc = PageLocation::parse("/お知らせ.html?lang=ja");
        assert_eq!(loc.path(), "/お知らせ.html");
        assert_eq!(
            login_url("/support/login.html", &loc),
            "/support/login.html?mode=login&next=%2F%E3%81%8A%E7%9F%A5%E3%82%89%E3%81%9B.html%3Flang%3Dja"
        );
    }

    #[test]
    fn return_target_omits_empty_parts() {
        assert_eq!(PageLocation::parse("/a").return_target(), "/a");
        assert_eq!(PageLocation::parse("/a?").return_target(), "/a");
        assert_eq!(PageLocation::parse("/a#h").return_target(), "/a#h");
        assert_eq!(PageLocation::parse("").return_target(), "/");
    }

    #[test]
    fn query_param_decodes_values() {
        let loc = PageLocation::parse("/?q=hello%20world&tag=a+b&flag");
        assert_eq!(loc.query_param("q").as_deref(), Some("hello world"));
        assert_eq!(loc.query_param("tag").as_deref(), Some("a b"));
        assert_eq!(loc.query_param("flag").as_deref(), Some(""));
        assert_eq!(loc.query_param("missing"), None);
    }

    #[test]
    fn debug_truthy_values() {
        for value in ["1", "true", "TRUE", "On", "yes", "YES"] {
            let loc = PageLocation::parse(&format!("/page?debug={value}"));
            assert!(loc.debug_enabled("debug"), "{value} should enable debug");
        }
    }

    #[test]
    fn debug_falsy_values() {
        for query in ["", "debug=0", "debug=false", "debug=", "debug", "nodebug=1"] {
            let loc = PageLocation::new("/page", query, "");
            assert!(!loc.debug_enabled("debug"), "{query:?} should not enable debug");
        }
    }

    #[test]
    fn login_page_detection() {
        let login = "/support/login.html";
        assert!(PageLocation::parse("/support/login.html?mode=login").is_login_page(login));
        assert!(!PageLocation::parse("/support/index.html").is_login_page(login));
    }

    #[test]
    fn login_url_encodes_return_target() {
        let loc = PageLocation::parse("/shop/cart.html?id=7&x=a b#pay");
        assert_eq!(
            login_url("/support/login.html", &loc),
            "/support/login.html?mode=login&next=%2Fshop%2Fcart.html%3Fid%3D7%26x%3Da%20b%23pay"
        );
    }
}
