//! Rupee amounts as rendered by the storefront (`₹68,500.00`, `₹67472`).

use crate::result::{ProbeError, ProbeResult};
use std::fmt;
use std::str::FromStr;

/// An amount in paise
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(u64);

impl Money {
    /// From whole rupees
    #[must_use]
    pub const fn rupees(rupees: u64) -> Self {
        Self(rupees * 100)
    }

    /// From paise
    #[must_use]
    pub const fn from_paise(paise: u64) -> Self {
        Self(paise)
    }

    /// Amount in paise
    #[must_use]
    pub const fn paise(self) -> u64 {
        self.0
    }

    /// Find the first amount in a block of text such as `Total: ₹67472 (incl. GST)`.
    ///
    /// Digits before the rupee sign are ignored when a sign is present.
    pub fn find_in(text: &str) -> ProbeResult<Self> {
        let start = text.find('₹').map_or(0, |i| i + '₹'.len_utf8());
        let amount: String = text[start..]
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .collect();
        amount.trim_end_matches('.').parse()
    }
}

impl FromStr for Money {
    type Err = ProbeError;

    /// Parse `₹68,500.00`, `68500`, `Rs. 1,234.5`; at most two decimals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProbeError::assertion(format!("not a rupee amount: {s:?}"));
        let cleaned = s
            .trim()
            .trim_start_matches('₹')
            .trim_start_matches("Rs.")
            .trim_start_matches("Rs")
            .trim()
            .replace(',', "");
        let (whole, fraction) = cleaned.split_once('.').unwrap_or((&cleaned, ""));
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || fraction.len() > 2
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let rupees: u64 = whole.parse().map_err(|_| invalid())?;
        let paise = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<u64>().map_err(|_| invalid())?,
        };
        rupees
            .checked_mul(100)
            .and_then(|p| p.checked_add(paise))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Money {
    /// Indian digit grouping: `₹68,500.00`, `₹1,23,456.00`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rupees = (self.0 / 100).to_string();
        let grouped = if rupees.len() <= 3 {
            rupees
        } else {
            let (head, last3) = rupees.split_at(rupees.len() - 3);
            let mut groups: Vec<&str> = Vec::new();
            let mut rest = head;
            while rest.len() > 2 {
                let (h, t) = rest.split_at(rest.len() - 2);
                groups.push(t);
                rest = h;
            }
            groups.push(rest);
            groups.reverse();
            format!("{},{last3}", groups.join(","))
        };
        write!(f, "₹{grouped}.{:02}", self.0 % 100)
    }
}
