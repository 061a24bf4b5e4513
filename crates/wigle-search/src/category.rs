//! Search categories and their endpoint vocabulary

use wigle_core::{Record, first_present, scalar_text};

/// Keys every search endpoint accepts.
const COMMON_KEYS: &[&str] = &[
    "onlymine",
    "notmine",
    "latrange1",
    "latrange2",
    "longrange1",
    "longrange2",
    "closestLat",
    "closestLong",
    "lastupdt",
    "firsttime",
    "lasttime",
    "startTransID",
    "endTransID",
    "minQoS",
    "variance",
    "houseNumber",
    "road",
    "city",
    "region",
    "postalCode",
    "country",
    "resultsPerPage",
    "searchAfter",
];

const WIFI_KEYS: &[&str] = &[
    "encryption",
    "freenet",
    "paynet",
    "netid",
    "ssid",
    "ssidlike",
    "rcoisMinimum",
    "rcoisMaximum",
    "channel",
    "frequency",
];

const BT_KEYS: &[&str] = &["netid", "name", "namelike"];

const CELL_KEYS: &[&str] = &[
    "ssid",
    "ssidlike",
    "cell_op",
    "cell_net",
    "cell_id",
    "showGsm",
    "showCdma",
    "showLte",
    "showWcdma",
    "showNr",
];

/// Known search categories; structurally identical endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Wifi,
    Bluetooth,
    Cell,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Wifi, Self::Bluetooth, Self::Cell];

    /// Parse CLI/config string into enum
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "wifi" => Some(Self::Wifi),
            "bt" | "bluetooth" => Some(Self::Bluetooth),
            "cell" => Some(Self::Cell),
            _ => None,
        }
    }

    /// Search endpoint path relative to the API base
    pub fn search_path(self) -> &'static str {
        match self {
            Self::Wifi => "network/search",
            Self::Bluetooth => "bluetooth/search",
            Self::Cell => "cell/search",
        }
    }

    /// Prefix for run directories and page files
    pub fn save_prefix(self) -> &'static str {
        match self {
            Self::Wifi => "wifi-basic",
            Self::Bluetooth => "bt-basic",
            Self::Cell => "cell-basic",
        }
    }

    fn own_keys(self) -> &'static [&'static str] {
        match self {
            Self::Wifi => WIFI_KEYS,
            Self::Bluetooth => BT_KEYS,
            Self::Cell => CELL_KEYS,
        }
    }

    /// Whether `key` is a parameter this endpoint understands
    pub fn accepts(self, key: &str) -> bool {
        COMMON_KEYS.contains(&key) || self.own_keys().contains(&key)
    }

    /// Full parameter vocabulary, common keys first
    pub fn vocabulary(self) -> Vec<&'static str> {
        COMMON_KEYS
            .iter()
            .chain(self.own_keys())
            .copied()
            .collect()
    }

    /// Detail endpoint that resolves ids found by this category
    pub fn detail_kind(self) -> DetailKind {
        match self {
            Self::Bluetooth => DetailKind::Bluetooth,
            Self::Wifi | Self::Cell => DetailKind::Network,
        }
    }

    /// Columns of the live result preview: (field aliases, heading)
    fn preview_columns(self) -> [(&'static [&'static str], &'static str); 5] {
        match self {
            Self::Wifi => [
                (&["netid"], "BSSID"),
                (&["ssid"], "SSID"),
                (&["lastupdt"], "Last Updated"),
                (&["trilat"], "Lat"),
                (&["trilong"], "Lon"),
            ],
            Self::Bluetooth => [
                (&["netid"], "BTID"),
                (&["name", "ssid"], "Name"),
                (&["lastupdt"], "Last Updated"),
                (&["trilat"], "Lat"),
                (&["trilong"], "Lon"),
            ],
            Self::Cell => [
                (&["id"], "ID"),
                (&["ssid"], "Name"),
                (&["gentype"], "GenType"),
                (&["trilat"], "Lat"),
                (&["trilong"], "Lon"),
            ],
        }
    }

    pub fn preview_headings(self) -> [&'static str; 5] {
        self.preview_columns().map(|(_, heading)| heading)
    }

    /// One live-view row for a search result
    pub fn preview_row(self, record: &Record) -> [String; 5] {
        self.preview_columns().map(|(aliases, _)| {
            first_present(record, aliases)
                .map(scalar_text)
                .unwrap_or_default()
        })
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Wifi => "wifi",
            Self::Bluetooth => "bt",
            Self::Cell => "cell",
        })
    }
}

/// Detail endpoints
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetailKind {
    /// Wi-Fi networks and cell towers
    Network,
    Bluetooth,
}

impl DetailKind {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "network" | "wifi" | "cell" => Some(Self::Network),
            "bt" | "bluetooth" => Some(Self::Bluetooth),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Network => "network/detail",
            Self::Bluetooth => "bluetooth/detail",
        }
    }

    /// Accepted lookup keys; `netid` is the primary one
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            Self::Network => &[
                "netid",
                "operator",
                "lac",
                "cid",
                "type",
                "system",
                "network",
                "basestation",
            ],
            Self::Bluetooth => &["netid"],
        }
    }
}

impl std::fmt::Display for DetailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Bluetooth => "bluetooth",
        })
    }
}
