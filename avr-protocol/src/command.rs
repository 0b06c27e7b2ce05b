//! Outbound command and query formatting
//!
//! Queries append `?` to the command prefix. Parameter-style prefixes
//! (`PSBAS`, `PSTRE`, channel levels) want a space before the suffix, and a
//! few prefixes are queries by themselves and must not receive any suffix
//! at all (`NSE` returns the whole display in one burst).
//!
//! Secondary-zone encoding: a feature that is not zone-encoded sends
//! `zonePrefix + featurePrefix + token` (`Z2MUON`); a zone-encoded feature
//! sends the bare zone prefix plus token (`Z2ON`, `Z250`) because the zone
//! prefix alone identifies it.

/// Wire line terminator. The protocol is CR-terminated and newline-free.
pub const LINE_TERMINATOR: u8 = 0x0d;

/// How a feature's status query is formed from its command prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFormat {
    /// `<prefix>?` — the common case.
    Suffix,
    /// `<prefix> ?` — parameter-style prefixes.
    SpaceSuffix,
    /// `<prefix>` — the prefix itself is the query.
    Bare,
}

/// Format a status query for a command prefix.
pub fn format_query(prefix: &str, format: QueryFormat) -> String {
    match format {
        QueryFormat::Suffix => format!("{}?", prefix),
        QueryFormat::SpaceSuffix => format!("{} ?", prefix),
        QueryFormat::Bare => prefix.to_string(),
    }
}

/// Encode an outbound set command for a zone.
///
/// `zone_prefix` is empty for the main zone, `"Z2"`/`"Z3"`/`"Z4"` otherwise.
pub fn encode_zone_command(
    zone_prefix: &str,
    feature_prefix: &str,
    token: &str,
    zone_encoded: bool,
) -> String {
    if zone_prefix.is_empty() {
        format!("{}{}", feature_prefix, token)
    } else if zone_encoded {
        format!("{}{}", zone_prefix, token)
    } else {
        format!("{}{}{}", zone_prefix, feature_prefix, token)
    }
}

/// Encode a status query for a zone.
///
/// Zone-encoded features are queried with the bare zone prefix (`Z2?`);
/// everything else prefixes the feature query with the zone marker.
pub fn encode_zone_query(
    zone_prefix: &str,
    feature_prefix: &str,
    format: QueryFormat,
    zone_encoded: bool,
) -> String {
    if zone_prefix.is_empty() {
        format_query(feature_prefix, format)
    } else if zone_encoded {
        format!("{}?", zone_prefix)
    } else {
        format!("{}{}", zone_prefix, format_query(feature_prefix, format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_formats() {
        assert_eq!(format_query("PW", QueryFormat::Suffix), "PW?");
        assert_eq!(format_query("PSBAS", QueryFormat::SpaceSuffix), "PSBAS ?");
        assert_eq!(format_query("NSE", QueryFormat::Bare), "NSE");
    }

    #[test]
    fn main_zone_commands_use_feature_prefix_only() {
        assert_eq!(encode_zone_command("", "MV", "50", true), "MV50");
        assert_eq!(encode_zone_command("", "MU", "ON", false), "MUON");
    }

    #[test]
    fn zone_encoded_commands_drop_the_feature_prefix() {
        assert_eq!(encode_zone_command("Z2", "MV", "50", true), "Z250");
        assert_eq!(encode_zone_command("Z2", "ZM", "ON", true), "Z2ON");
        assert_eq!(encode_zone_command("Z3", "SI", "TUNER", true), "Z3TUNER");
    }

    #[test]
    fn non_zone_encoded_commands_keep_both_prefixes() {
        assert_eq!(encode_zone_command("Z2", "MU", "ON", false), "Z2MUON");
    }

    #[test]
    fn zone_queries() {
        assert_eq!(encode_zone_query("", "MV", QueryFormat::Suffix, true), "MV?");
        assert_eq!(encode_zone_query("Z2", "MV", QueryFormat::Suffix, true), "Z2?");
        assert_eq!(
            encode_zone_query("Z2", "MU", QueryFormat::Suffix, false),
            "Z2MU?"
        );
    }
}
