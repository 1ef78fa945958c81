use super::request::{Method, Request, Response};
use super::templates;
use crate::dispatcher::{Dispatcher, KeyAction, KeyEvent};
use crate::identity::DeviceIdentity;
use percent_encoding::percent_decode_str;

/// Decode a path parameter: `+` is a space, `%XX` is a byte
///
/// Invalid UTF-8 after decoding is replaced, not rejected.
#[must_use]
pub fn decode(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// The trailing path segment, after the last `/`
fn last_segment(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, tail)| tail)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    DeviceDescription,
    Key(KeyAction),
    Launch,
    Apps,
    ActiveApp,
    DeviceInfo,
    Icon,
    Discard,
}

enum Pattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Pattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == *p,
            Self::Prefix(p) => {
                path.strip_prefix(p).is_some_and(|rest| !rest.contains('/'))
            }
        }
    }
}

const ROUTES: [(Method, Pattern, Handler); 11] = [
    (Method::Get, Pattern::Exact("/"), Handler::DeviceDescription),
    (
        Method::Post,
        Pattern::Prefix("/keypress/"),
        Handler::Key(KeyAction::Press),
    ),
    (
        Method::Post,
        Pattern::Prefix("/keydown/"),
        Handler::Key(KeyAction::Down),
    ),
    (
        Method::Post,
        Pattern::Prefix("/keyup/"),
        Handler::Key(KeyAction::Up),
    ),
    (Method::Post, Pattern::Prefix("/launch/"), Handler::Launch),
    (Method::Get, Pattern::Exact("/query/apps"), Handler::Apps),
    (
        Method::Get,
        Pattern::Exact("/query/active-app"),
        Handler::ActiveApp,
    ),
    (
        Method::Get,
        Pattern::Exact("/query/device-info"),
        Handler::DeviceInfo,
    ),
    (Method::Get, Pattern::Prefix("/query/icon/"), Handler::Icon),
    (Method::Post, Pattern::Exact("/input"), Handler::Discard),
    (Method::Post, Pattern::Exact("/search"), Handler::Discard),
];

/// Turns ECP requests into responses and key events
///
/// Routes are tried in order and the first match wins. Paths no route
/// matches exactly, such as `/keypress/Lit_a/extra`, get a second
/// chance from a catch-all which only looks at prefixes (taking the
/// last segment as the parameter). Anything still unmatched gets an
/// empty 200: hubs treat any other status as a broken device.
///
pub struct Router {
    identity: DeviceIdentity,
}

impl Router {
    /// Create a router serving documents for `identity`
    #[must_use]
    pub const fn new(identity: DeviceIdentity) -> Self {
        Self { identity }
    }

    /// The identity documents are populated from
    #[must_use]
    pub const fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    fn find(method: &Method, path: &str) -> Option<Handler> {
        ROUTES
            .iter()
            .find(|(m, pattern, _)| m == method && pattern.matches(path))
            .map(|(_, _, handler)| *handler)
    }

    fn catch_all(method: &Method, path: &str) -> Option<Handler> {
        log::info!("HTTP {method} {path}");
        let handler = match *method {
            Method::Post => {
                if path.starts_with("/keypress/") {
                    Handler::Key(KeyAction::Press)
                } else if path.starts_with("/keydown/") {
                    Handler::Key(KeyAction::Down)
                } else if path.starts_with("/keyup/") {
                    Handler::Key(KeyAction::Up)
                } else if path.starts_with("/launch/") {
                    Handler::Launch
                } else {
                    return None;
                }
            }
            Method::Get if path.starts_with("/query/icon/") => Handler::Icon,
            _ => return None,
        };
        Some(handler)
    }

    /// Handle one request, dispatching any key event it carries
    pub fn route(&self, request: &Request, dispatcher: &Dispatcher) -> Response {
        let path = request.path.as_str();
        let Some(handler) = Self::find(&request.method, path)
            .or_else(|| Self::catch_all(&request.method, path))
        else {
            return Response::empty();
        };

        match handler {
            Handler::DeviceDescription => {
                Response::xml(templates::device_description(&self.identity))
            }
            Handler::Key(action) => {
                let key = decode(last_segment(path));
                if key.is_empty() {
                    log::warn!("{action} with no key");
                } else {
                    log::info!("{action}: {key}");
                    dispatcher.dispatch(&KeyEvent { action, key });
                }
                Response::empty()
            }
            Handler::Launch => {
                log::info!("Launch: {}", decode(last_segment(path)));
                Response::empty()
            }
            Handler::Apps => Response::xml(templates::APPS),
            Handler::ActiveApp => Response::xml(templates::ACTIVE_APP),
            Handler::DeviceInfo => {
                Response::xml(templates::device_info(&self.identity))
            }
            Handler::Icon => Response::png(&templates::PLACEHOLDER_ICON),
            Handler::Discard => Response::empty(),
        }
    }
}
