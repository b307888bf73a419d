//! Range-based IP to country lookup
//!
//! The index holds disjoint `[from, to]` IPv4 blocks sorted by their start
//! address. A lookup binary-searches for the last block starting at or
//! before the address and checks that the block actually reaches it, so an
//! address below every block or inside a gap resolves to `ZZ`.

use std::net::Ipv4Addr;
use std::path::Path;
use tracing::info;

use crate::analytics::models::{IpRange, UNKNOWN_COUNTRY};
use crate::error::{Error, Result};
use crate::source::ranges;

/// Immutable IPv4 range index, built once at startup
#[derive(Debug, Clone, Default)]
pub struct RangeCountryIndex {
    ranges: Vec<IpRange>,
}

impl RangeCountryIndex {
    /// Build an index from rows in any order
    ///
    /// Rows are assumed not to overlap; that is not verified. A row whose
    /// start lies after its end is rejected.
    pub fn build<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = IpRange>,
    {
        let mut ranges = Vec::new();

        for (idx, range) in rows.into_iter().enumerate() {
            if range.from_ip > range.to_ip {
                return Err(Error::DataFormat {
                    row: idx as u64 + 1,
                    reason: format!(
                        "range start {} is after range end {}",
                        range.from_ip, range.to_ip
                    ),
                });
            }
            ranges.push(range);
        }

        ranges.sort_by_key(|range| range.from_ip);

        Ok(Self { ranges })
    }

    /// Load and index an IP2Location-style CSV file
    pub fn from_csv(path: &Path) -> Result<Self> {
        let index = Self::build(ranges::read_ranges_file(path)?)?;
        info!("Indexed {} IP ranges from {}", index.len(), path.display());
        Ok(index)
    }

    /// The block containing `ip`, if any
    pub fn lookup_range(&self, ip: u32) -> Option<&IpRange> {
        let insertion_point = self.ranges.partition_point(|range| range.from_ip <= ip);
        let candidate = self.ranges.get(insertion_point.checked_sub(1)?)?;
        candidate.contains(ip).then_some(candidate)
    }

    /// Country code for a numeric address, `ZZ` when uncovered
    pub fn lookup_u32(&self, ip: u32) -> &str {
        self.lookup_range(ip)
            .map(|range| range.country_code.as_str())
            .unwrap_or(UNKNOWN_COUNTRY)
    }

    /// Country code for an address, `ZZ` when uncovered
    pub fn lookup(&self, ip: Ipv4Addr) -> &str {
        self.lookup_u32(u32::from(ip))
    }

    /// Country code for a dotted-quad or decimal literal
    ///
    /// Unparseable input is an error rather than `ZZ`: it means the caller
    /// passed something that was never an address.
    pub fn lookup_str(&self, literal: &str) -> Result<&str> {
        parse_ipv4(literal).map(|ip| self.lookup_u32(ip))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Parse `"1.2.3.4"` or `"16909060"` into a host-order integer
pub fn parse_ipv4(literal: &str) -> Result<u32> {
    let trimmed = literal.trim();

    if let Ok(addr) = trimmed.parse::<Ipv4Addr>() {
        return Ok(u32::from(addr));
    }

    trimmed
        .parse::<u32>()
        .map_err(|_| Error::InvalidIp(literal.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(from_ip: u32, to_ip: u32, code: &str, name: &str) -> IpRange {
        IpRange {
            from_ip,
            to_ip,
            country_code: code.to_string(),
            country_name: name.to_string(),
        }
    }

    fn us_fr_index() -> RangeCountryIndex {
        RangeCountryIndex::build(vec![
            range(11, 20, "FR", "France"),
            range(0, 10, "US", "United States"),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_inside_ranges() {
        let index = us_fr_index();

        assert_eq!(index.lookup_u32(5), "US");
        assert_eq!(index.lookup_u32(15), "FR");
    }

    #[test]
    fn test_lookup_range_boundaries() {
        let index = us_fr_index();

        assert_eq!(index.lookup_u32(0), "US");
        assert_eq!(index.lookup_u32(10), "US");
        assert_eq!(index.lookup_u32(11), "FR");
        assert_eq!(index.lookup_u32(20), "FR");
    }

    #[test]
    fn test_lookup_above_all_ranges() {
        let index = us_fr_index();
        assert_eq!(index.lookup_u32(25), UNKNOWN_COUNTRY);
        assert_eq!(index.lookup_u32(u32::MAX), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_lookup_below_all_ranges() {
        let index = RangeCountryIndex::build(vec![range(100, 200, "DE", "Germany")]).unwrap();
        assert_eq!(index.lookup_u32(0), UNKNOWN_COUNTRY);
        assert_eq!(index.lookup_u32(99), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_lookup_in_gap() {
        let index = RangeCountryIndex::build(vec![
            range(0, 10, "US", "United States"),
            range(50, 60, "JP", "Japan"),
        ])
        .unwrap();

        assert_eq!(index.lookup_u32(11), UNKNOWN_COUNTRY);
        assert_eq!(index.lookup_u32(49), UNKNOWN_COUNTRY);
        assert_eq!(index.lookup_u32(50), "JP");
    }

    #[test]
    fn test_lookup_empty_index() {
        let index = RangeCountryIndex::default();
        assert!(index.is_empty());
        assert_eq!(index.lookup_u32(42), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_lookup_is_order_independent() {
        let index = us_fr_index();
        let first: Vec<_> = [15, 5, 25, 15].iter().map(|&ip| index.lookup_u32(ip)).collect();
        let second: Vec<_> = [25, 15, 15, 5].iter().map(|&ip| index.lookup_u32(ip)).collect();

        assert_eq!(first, vec!["FR", "US", "ZZ", "FR"]);
        assert_eq!(second, vec!["ZZ", "FR", "FR", "US"]);
    }

    #[test]
    fn test_lookup_str_accepts_dotted_and_decimal() {
        let index = RangeCountryIndex::build(vec![range(
            u32::from(Ipv4Addr::new(8, 8, 8, 0)),
            u32::from(Ipv4Addr::new(8, 8, 8, 255)),
            "US",
            "United States",
        )])
        .unwrap();

        assert_eq!(index.lookup_str("8.8.8.8").unwrap(), "US");
        assert_eq!(index.lookup_str("134744072").unwrap(), "US");
        assert_eq!(index.lookup_str("9.9.9.9").unwrap(), UNKNOWN_COUNTRY);
        assert_eq!(index.lookup(Ipv4Addr::new(8, 8, 8, 8)), "US");
    }

    #[test]
    fn test_lookup_str_rejects_invalid_literals() {
        let index = us_fr_index();

        for literal in ["-1", "not-an-ip", "256.1.1.1", "4294967296", ""] {
            assert!(
                matches!(index.lookup_str(literal), Err(Error::InvalidIp(_))),
                "{literal:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_build_rejects_inverted_range() {
        let result = RangeCountryIndex::build(vec![
            range(0, 10, "US", "United States"),
            range(30, 20, "FR", "France"),
        ]);

        match result {
            Err(Error::DataFormat { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected DataFormat error, got {other:?}"),
        }
    }

    #[test]
    fn test_lookup_range_exposes_country_name() {
        let index = us_fr_index();
        let found = index.lookup_range(12).unwrap();
        assert_eq!(found.country_name, "France");
        assert!(index.lookup_range(21).is_none());
    }
}
