//! Fixed ECP documents, with the device's identity filled in
//!
//! Hub integrations compare these against what a real Roku 4 sends,
//! so everything but the substituted fields is literal.

use crate::identity::DeviceIdentity;
use quick_xml::escape::escape;

/// The UPnP device description served at `/`
#[must_use]
pub fn device_description(identity: &DeviceIdentity) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion>
    <major>1</major>
    <minor>0</minor>
  </specVersion>
  <device>
    <deviceType>urn:roku-com:device:player:1-0</deviceType>
    <friendlyName>{name}</friendlyName>
    <manufacturer>Roku</manufacturer>
    <manufacturerURL>http://www.roku.com/</manufacturerURL>
    <modelDescription>Roku Streaming Player Network Media</modelDescription>
    <modelName>Roku 4</modelName>
    <modelNumber>4400X</modelNumber>
    <modelURL>http://www.roku.com/</modelURL>
    <serialNumber>{usn}</serialNumber>
    <UDN>uuid:roku:ecp:{uuid}</UDN>
    <serviceList>
      <service>
        <serviceType>urn:roku-com:service:ecp:1</serviceType>
        <serviceId>urn:roku-com:serviceId:ecp1-0</serviceId>
        <controlURL/>
        <eventSubURL/>
        <SCPDURL>ecp_SCPD.xml</SCPDURL>
      </service>
    </serviceList>
  </device>
</root>"#,
        name = escape(identity.display_name.as_str()),
        usn = identity.unique_service_name,
        uuid = identity.device_uuid,
    )
}

/// `/query/apps`
pub const APPS: &str = r#"<apps>
    <app id="1" version="1.0.0">Emulated App 1</app>
    <app id="2" version="1.0.0">Emulated App 2</app>
</apps>"#;

/// `/query/active-app`: always the home screen
pub const ACTIVE_APP: &str = r"<active-app>
    <app>Roku</app>
</active-app>";

/// `/query/device-info`
///
/// The power mode is always reported as on.
#[must_use]
pub fn device_info(identity: &DeviceIdentity) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<device-info>
  <udn>{uuid}</udn>
  <serial-number>{usn}</serial-number>
  <device-id>{usn}</device-id>
  <advertising-id>{usn}</advertising-id>
  <vendor-name>Roku</vendor-name>
  <model-number>4400X</model-number>
  <model-name>Roku 4</model-name>
  <model-region>US</model-region>
  <is-tv>true</is-tv>
  <is-stick>false</is-stick>
  <ui-resolution>1080p</ui-resolution>
  <supports-ethernet>true</supports-ethernet>
  <wifi-mac>{mac}</wifi-mac>
  <wifi-driver>realtek</wifi-driver>
  <has-wifi-extender>false</has-wifi-extender>
  <has-wifi-5G-support>true</has-wifi-5G-support>
  <can-use-wifi-extender>true</can-use-wifi-extender>
  <ethernet-mac>{mac}</ethernet-mac>
  <network-type>wifi</network-type>
  <friendly-device-name>{name}</friendly-device-name>
  <friendly-model-name>Roku 4</friendly-model-name>
  <default-device-name>{name}</default-device-name>
  <user-device-name>{name}</user-device-name>
  <user-device-location></user-device-location>
  <build-number>AEA.09044.70</build-number>
  <software-version>9.4.0</software-version>
  <software-build>4170</software-build>
  <secure-device>true</secure-device>
  <language>en</language>
  <country>US</country>
  <locale>en_US</locale>
  <time-zone-auto>true</time-zone-auto>
  <time-zone>US/Pacific</time-zone>
  <time-zone-name>United States/Pacific</time-zone-name>
  <time-zone-tz>America/Los_Angeles</time-zone-tz>
  <time-zone-offset>-480</time-zone-offset>
  <clock-format>12-hour</clock-format>
  <uptime>86400</uptime>
  <power-mode>PowerOn</power-mode>
  <supports-suspend>true</supports-suspend>
  <supports-find-remote>true</supports-find-remote>
  <supports-tv-power-control>true</supports-tv-power-control>
  <find-remote-is-possible>true</find-remote-is-possible>
  <supports-audio-guide>true</supports-audio-guide>
  <supports-rva>true</supports-rva>
  <developer-enabled>true</developer-enabled>
  <keyed-developer-id></keyed-developer-id>
  <search-enabled>true</search-enabled>
  <search-channels-enabled>true</search-channels-enabled>
  <voice-search-enabled>true</voice-search-enabled>
  <notifications-enabled>true</notifications-enabled>
  <notifications-first-use>false</notifications-first-use>
  <supports-private-listening>true</supports-private-listening>
  <headphones-connected>false</headphones-connected>
  <supports-ecs-textedit>true</supports-ecs-textedit>
  <supports-ecs-microphone>true</supports-ecs-microphone>
  <supports-wake-on-wlan>true</supports-wake-on-wlan>
  <has-play-on-roku>true</has-play-on-roku>
  <has-mobile-screensaver>false</has-mobile-screensaver>
  <support-url>roku.com/support</support-url>
  <grandcentral-version>4.8.25</grandcentral-version>
  <trc-version>3.0</trc-version>
  <trc-channel-version>4.2.6</trc-channel-version>
  <davinci-version>2.8.20</davinci-version>
</device-info>"#,
        uuid = identity.device_uuid,
        usn = identity.unique_service_name,
        mac = identity.mac_address,
        name = escape(identity.display_name.as_str()),
    )
}

/// A 1x1 transparent PNG, served for every app icon
pub const PLACEHOLDER_ICON: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
    0x49, 0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
    0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00,
    0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];
