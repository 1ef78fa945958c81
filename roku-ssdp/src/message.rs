use crate::Advertisement;

/// The search target / notification type of a Roku ECP device
pub const SERVICE_TYPE: &str = "roku:ecp";

/// The search target meaning "everything"
pub const SEARCH_ALL: &str = "ssdp:all";

/// What we claim to be, in SERVER headers
pub const SERVER: &str = "Roku/12.0.0 UPnP/1.0 Roku/12.0.0";

/// What an incoming datagram means to us
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// An M-SEARCH which we should answer
    Search,
    /// Anything else on the (shared) multicast channel
    Ignore,
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Decide whether a datagram is a search we should answer
///
/// A substring test, not a parse: control hubs send searches with
/// assorted header spellings, and only the method and the target
/// matter. Non-UTF-8 payloads are fine.
#[must_use]
pub fn classify(payload: &[u8]) -> Classification {
    if contains(payload, b"M-SEARCH")
        && (contains(payload, SERVICE_TYPE.as_bytes())
            || contains(payload, SEARCH_ALL.as_bytes()))
    {
        Classification::Search
    } else {
        Classification::Ignore
    }
}

/// Build the unicast reply to an M-SEARCH
///
/// Several hub integrations match on the literal header text, so the
/// header set, spelling and order here are fixed.
#[must_use]
pub fn build_search_response(advertisement: &Advertisement) -> String {
    format!(
        "HTTP/1.1 200 OK\r
Cache-Control: max-age = 300\r
ST: {SERVICE_TYPE}\r
SERVER: {SERVER}\r
Ext:\r
Location: {}\r
USN: uuid:{SERVICE_TYPE}:{}\r
\r\n",
        advertisement.location(),
        advertisement.unique_service_name,
    )
}

/// Build the periodic "alive" NOTIFY
#[must_use]
pub fn build_notify_alive(advertisement: &Advertisement) -> String {
    format!(
        "NOTIFY * HTTP/1.1\r
HOST: 239.255.255.250:1900\r
Cache-Control: max-age = 300\r
NT: {SERVICE_TYPE}\r
NTS: ssdp:alive\r
SERVER: {SERVER}\r
Location: {}\r
USN: uuid:{SERVICE_TYPE}:{}\r
\r\n",
        advertisement.location(),
        advertisement.unique_service_name,
    )
}

/// Build the "byebye" NOTIFY sent when shutting down cleanly
#[must_use]
pub fn build_notify_byebye(advertisement: &Advertisement) -> String {
    format!(
        "NOTIFY * HTTP/1.1\r
HOST: 239.255.255.250:1900\r
NT: {SERVICE_TYPE}\r
NTS: ssdp:byebye\r
USN: uuid:{SERVICE_TYPE}:{}\r
\r\n",
        advertisement.unique_service_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn advert() -> Advertisement {
        Advertisement {
            local_ip: Ipv4Addr::new(192, 168, 1, 50),
            port: 8060,
            unique_service_name: "ESP32-DEADBEEF".to_string(),
        }
    }

    #[test]
    fn classifies_roku_search() {
        let m = b"M-SEARCH * HTTP/1.1\r\n\
HOST: 239.255.255.250:1900\r\n\
MAN: \"ssdp:discover\"\r\n\
ST: roku:ecp\r\n\
MX: 3\r\n\r\n";
        assert_eq!(classify(m), Classification::Search);
    }

    #[test]
    fn classifies_wildcard_search() {
        let m = b"M-SEARCH * HTTP/1.1\r\nST: ssdp:all\r\nMX: 1\r\n\r\n";
        assert_eq!(classify(m), Classification::Search);
    }

    #[test]
    fn ignores_search_for_other_services() {
        let m = b"M-SEARCH * HTTP/1.1\r\n\
ST: urn:schemas-upnp-org:device:MediaRenderer:1\r\nMX: 2\r\n\r\n";
        assert_eq!(classify(m), Classification::Ignore);
    }

    #[test]
    fn ignores_notify_for_our_service() {
        let m = build_notify_alive(&advert());
        assert_eq!(classify(m.as_bytes()), Classification::Ignore);
    }

    #[test]
    fn method_match_is_case_sensitive() {
        let m = b"m-search * HTTP/1.1\r\nST: roku:ecp\r\n\r\n";
        assert_eq!(classify(m), Classification::Ignore);
    }

    #[test]
    fn ignores_empty_and_binary() {
        assert_eq!(classify(b""), Classification::Ignore);
        assert_eq!(classify(&[0xff, 0xfe, 0x00, 0x80]), Classification::Ignore);
    }

    #[test]
    fn search_in_binary_payload_still_classified() {
        let mut m = vec![0xffu8, 0x00];
        m.extend_from_slice(b"M-SEARCH ssdp:all");
        assert_eq!(classify(&m), Classification::Search);
    }

    #[test]
    fn search_response_is_literal() {
        assert_eq!(
            build_search_response(&advert()),
            "HTTP/1.1 200 OK\r\n\
Cache-Control: max-age = 300\r\n\
ST: roku:ecp\r\n\
SERVER: Roku/12.0.0 UPnP/1.0 Roku/12.0.0\r\n\
Ext:\r\n\
Location: http://192.168.1.50:8060/\r\n\
USN: uuid:roku:ecp:ESP32-DEADBEEF\r\n\
\r\n"
        );
    }

    #[test]
    fn notify_alive_is_literal() {
        assert_eq!(
            build_notify_alive(&advert()),
            "NOTIFY * HTTP/1.1\r\n\
HOST: 239.255.255.250:1900\r\n\
Cache-Control: max-age = 300\r\n\
NT: roku:ecp\r\n\
NTS: ssdp:alive\r\n\
SERVER: Roku/12.0.0 UPnP/1.0 Roku/12.0.0\r\n\
Location: http://192.168.1.50:8060/\r\n\
USN: uuid:roku:ecp:ESP32-DEADBEEF\r\n\
\r\n"
        );
    }

    #[test]
    fn notify_byebye() {
        let m = build_notify_byebye(&advert());
        assert!(m.starts_with("NOTIFY * HTTP/1.1\r\n"));
        assert!(m.contains("NTS: ssdp:byebye\r\n"));
        assert!(m.contains("USN: uuid:roku:ecp:ESP32-DEADBEEF\r\n"));
        assert!(!m.contains("Location"));
        assert!(m.ends_with("\r\n\r\n"));
    }
}
