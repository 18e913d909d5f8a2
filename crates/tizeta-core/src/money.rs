//! Money in minor currency units.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount in minor units (santim for ETB, cents for USD).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
  pub const ZERO: Money = Money(0);

  pub const fn from_minor(minor: i64) -> Self { Self(minor) }

  pub const fn minor(self) -> i64 { self.0 }

  pub const fn is_negative(self) -> bool { self.0 < 0 }

  /// Two-decimal representation, e.g. `15050` → `"150.50"`.
  pub fn to_decimal_string(self) -> String {
    let sign = if self.0 < 0 { "-" } else { "" };
    let abs = self.0.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_decimal_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decimal_string_pads_minor_units() {
    assert_eq!(Money::from_minor(15050).to_decimal_string(), "150.50");
    assert_eq!(Money::from_minor(7).to_decimal_string(), "0.07");
    assert_eq!(Money::from_minor(-250).to_decimal_string(), "-2.50");
    assert_eq!(Money::ZERO.to_decimal_string(), "0.00");
  }
}
