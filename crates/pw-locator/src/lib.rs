//! Locator parsing and display contracts for the `web://` scheme.
//!
//! Addresses in the peer web name a node identity rather than a DNS host:
//! `web://[<node-id>]:<port><path>`. Users rarely type that form, so the
//! canonicalizer accepts every shorthand (bare node id, `node:port`,
//! bracketed or not, scheme optional) and always produces the fully
//! bracketed, fully ported canonical string. Pretty-printing reverses the
//! transform for the address bar.

use pw_core::CoreError;
use pw_core::CoreResult;
use url::Url;

/// Default peer-web port, shared by the parser default and display elision.
pub const DEFAULT_PORT: &str = "6937";

/// Canonical scheme prefix for peer-web locators.
pub const SCHEME_PREFIX: &str = "web://";

/// Sentinel for a fresh tab; displays as an empty host.
pub const ABOUT_NEWTAB: &str = "about:newtab";

/// Internal settings pseudo-page.
pub const ABOUT_SETTINGS: &str = "about:settings";

/// Internal history pseudo-page.
pub const ABOUT_HISTORY: &str = "about:history";

const SETTINGS_LABEL: &str = "Settings";
const HISTORY_LABEL: &str = "History";

/// Parsed, immutable peer-web locator.
///
/// Construction goes through [`Locator::parse`]; string forms are produced
/// on demand by [`Locator::canonical`] and [`Locator::pretty`] so the
/// address is parsed once and never re-derived from intermediate strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    node_id: String,
    port: String,
    path: String,
}

impl Locator {
    /// Parses free-form user input into a locator.
    ///
    /// Total over non-empty input: any scheme prefix is accepted and
    /// replaced with `web://`, missing ports default to [`DEFAULT_PORT`],
    /// missing paths default to `/`, and an unterminated `[` is recovered
    /// by treating the remainder as the node id. Only input that trims to
    /// nothing is rejected; callers are expected to screen that out first.
    ///
    /// In the unbracketed shorthand the node id ends at the first `:`, so
    /// an id that itself contains a colon must be written in bracketed
    /// form or the split will eat part of it. This ambiguity is inherent
    /// to the shorthand and intentionally not "fixed" here.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::new(
                "locator.empty_input",
                "cannot parse an empty locator",
            ));
        }

        // Whatever scheme the user typed is discarded; only one scheme
        // exists on the peer web.
        let rest = match trimmed.find("://") {
            Some(position) => &trimmed[position + 3..],
            None => trimmed,
        };

        if let Some(after_bracket) = rest.strip_prefix('[') {
            let Some(close) = after_bracket.find(']') else {
                // Unterminated bracket: salvage the remainder as the id.
                return Ok(Self {
                    node_id: after_bracket.to_owned(),
                    port: DEFAULT_PORT.to_owned(),
                    path: "/".to_owned(),
                });
            };

            let (port, path) = split_port_and_path(&after_bracket[close + 1..]);
            return Ok(Self {
                node_id: after_bracket[..close].to_owned(),
                port,
                path,
            });
        }

        let (authority, path) = match rest.find('/') {
            Some(slash) => (&rest[..slash], rest[slash..].to_owned()),
            None => (rest, "/".to_owned()),
        };

        let (node_id, port) = match authority.find(':') {
            Some(colon) => (
                authority[..colon].to_owned(),
                non_empty_port(&authority[colon + 1..]),
            ),
            None => (authority.to_owned(), DEFAULT_PORT.to_owned()),
        };

        Ok(Self {
            node_id,
            port,
            path,
        })
    }

    /// Node identity; opaque to the addressing layer.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Port as the literal digits that will appear in the canonical form.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Resource path, always starting with `/`. Preserved verbatim; no
    /// dot-segment or trailing-slash normalization is performed.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_default_port(&self) -> bool {
        self.port == DEFAULT_PORT
    }

    /// Canonical wire form: `web://[<node-id>]:<port><path>`.
    pub fn canonical(&self) -> String {
        format!(
            "{SCHEME_PREFIX}[{}]:{}{}",
            self.node_id, self.port, self.path
        )
    }

    /// Address-bar form: brackets dropped, default port and bare `/` path
    /// elided.
    pub fn pretty(&self) -> String {
        let mut pretty = format!("{SCHEME_PREFIX}{}", self.node_id);
        if self.port != DEFAULT_PORT {
            pretty.push(':');
            pretty.push_str(&self.port);
        }
        if self.path != "/" {
            pretty.push_str(&self.path);
        }
        pretty
    }
}

impl core::fmt::Display for Locator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Canonicalizes free-form input into the `web://[<node-id>]:<port><path>`
/// wire form. String-level convenience over [`Locator::parse`].
pub fn normalize(raw: &str) -> CoreResult<String> {
    Ok(Locator::parse(raw)?.canonical())
}

/// Collapses a canonical locator into its display form.
///
/// Defensive by design: anything that does not start with `web://[` or is
/// missing its closing bracket passes through unchanged, so non-peer URLs
/// and already-pretty strings are safe to feed back in. Idempotent.
pub fn prettify(input: &str) -> String {
    let Some(rest) = input.strip_prefix(SCHEME_PREFIX) else {
        return input.to_owned();
    };
    let Some(after_bracket) = rest.strip_prefix('[') else {
        return input.to_owned();
    };
    let Some(close) = after_bracket.find(']') else {
        return input.to_owned();
    };

    let (port, path) = split_port_and_path(&after_bracket[close + 1..]);
    let locator = Locator {
        node_id: after_bracket[..close].to_owned(),
        port,
        path,
    };
    locator.pretty()
}

/// Shortest human-meaningful label for anything the address bar can hold.
///
/// Handles internal pseudo-pages, peer-web locators, and ordinary URLs;
/// unparseable input is returned as-is, so the result is always renderable.
pub fn display_host(input: &str) -> String {
    if input.is_empty() || input == ABOUT_NEWTAB {
        return String::new();
    }
    if input == ABOUT_SETTINGS {
        return SETTINGS_LABEL.to_owned();
    }
    if input == ABOUT_HISTORY {
        return HISTORY_LABEL.to_owned();
    }
    if input.starts_with("about:") {
        return input.to_owned();
    }
    if input.starts_with(SCHEME_PREFIX) {
        return match Locator::parse(input) {
            Ok(locator) => locator.node_id,
            Err(_) => input.to_owned(),
        };
    }

    match Url::parse(input) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_owned(),
            None => input.to_owned(),
        },
        Err(_) => input.to_owned(),
    }
}

/// Splits the authority tail after a `]` into port and path. An absent or
/// empty port maps to the default so repeated normalization is stable.
fn split_port_and_path(tail: &str) -> (String, String) {
    let (port_part, path) = match tail.find('/') {
        Some(slash) => (&tail[..slash], tail[slash..].to_owned()),
        None => (tail, "/".to_owned()),
    };
    let port = port_part.strip_prefix(':').unwrap_or(port_part);
    (non_empty_port(port), path)
}

fn non_empty_port(port: &str) -> String {
    if port.is_empty() {
        DEFAULT_PORT.to_owned()
    } else {
        port.to_owned()
    }
}
