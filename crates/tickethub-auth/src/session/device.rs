//! Best-effort device classification from the User-Agent header.
//!
//! Labels are substring heuristics for the session-listing UI only. They
//! must never feed an authorization decision.

use tickethub_entity::session::DeviceInfo;

/// Parse the raw client signal into display-ready device details.
pub fn parse_device(user_agent: Option<&str>, ip_address: &str) -> DeviceInfo {
    let ua = user_agent.unwrap_or("");
    DeviceInfo {
        user_agent: ua.to_string(),
        browser: browser_family(ua),
        os: os_family(ua),
        device: device_class(ua),
        ip_address: ip_address.to_string(),
    }
}

/// Browser family label. Order matters: Edge and Opera embed "Chrome",
/// and Chrome embeds "Safari".
fn browser_family(ua: &str) -> Option<String> {
    let label = if ua.contains("Edg/") || ua.contains("Edge/") {
        "Edge"
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("Firefox/") {
        "Firefox"
    } else if ua.contains("Chrome/") || ua.contains("CriOS/") {
        "Chrome"
    } else if ua.contains("Safari/") {
        "Safari"
    } else {
        return None;
    };
    Some(label.to_string())
}

/// Operating system family label. Android must be checked before Linux,
/// since Android user agents also contain "Linux".
fn os_family(ua: &str) -> Option<String> {
    let label = if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        "iOS"
    } else if ua.contains("Mac OS X") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        return None;
    };
    Some(label.to_string())
}

/// Device class label: tablet, mobile, or desktop.
fn device_class(ua: &str) -> Option<String> {
    if ua.is_empty() {
        return None;
    }
    let label = if ua.contains("iPad") || ua.contains("Tablet") {
        "Tablet"
    } else if ua.contains("Mobile") || ua.contains("iPhone") {
        "Mobile"
    } else {
        "Desktop"
    };
    Some(label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) \
                                 AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 \
                                 Mobile/15E148 Safari/604.1";
    const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0";
    const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_5 like Mac OS X) \
                               AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 \
                               Mobile/15E148 Safari/604.1";

    #[test]
    fn test_chrome_on_windows_desktop() {
        let info = parse_device(Some(CHROME_WINDOWS), "10.0.0.1");
        assert_eq!(info.browser.as_deref(), Some("Chrome"));
        assert_eq!(info.os.as_deref(), Some("Windows"));
        assert_eq!(info.device.as_deref(), Some("Desktop"));
    }

    #[test]
    fn test_firefox_on_linux() {
        let info = parse_device(Some(FIREFOX_LINUX), "10.0.0.1");
        assert_eq!(info.browser.as_deref(), Some("Firefox"));
        assert_eq!(info.os.as_deref(), Some("Linux"));
    }

    #[test]
    fn test_safari_on_iphone_is_mobile() {
        let info = parse_device(Some(SAFARI_IPHONE), "10.0.0.1");
        assert_eq!(info.browser.as_deref(), Some("Safari"));
        assert_eq!(info.os.as_deref(), Some("iOS"));
        assert_eq!(info.device.as_deref(), Some("Mobile"));
    }

    #[test]
    fn test_edge_is_not_chrome() {
        let info = parse_device(Some(EDGE_WINDOWS), "10.0.0.1");
        assert_eq!(info.browser.as_deref(), Some("Edge"));
    }

    #[test]
    fn test_ipad_is_tablet() {
        let info = parse_device(Some(SAFARI_IPAD), "10.0.0.1");
        assert_eq!(info.device.as_deref(), Some("Tablet"));
        assert_eq!(info.os.as_deref(), Some("iOS"));
    }

    #[test]
    fn test_missing_user_agent_yields_no_labels() {
        let info = parse_device(None, "10.0.0.1");
        assert_eq!(info.user_agent, "");
        assert_eq!(info.browser, None);
        assert_eq!(info.os, None);
        assert_eq!(info.device, None);
        assert_eq!(info.ip_address, "10.0.0.1");
    }
}
