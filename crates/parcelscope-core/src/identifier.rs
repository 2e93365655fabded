//! Positional decoding of parcel identifiers.
//!
//! A parcel identifier is a fixed-format ASCII code of at least 19 bytes:
//!
//! ```text
//! 41135 10300 1 0415 0023
//! │     │     │ │    └── lot denominator   (15..19)
//! │     │     │ └─────── lot numerator     (11..15)
//! │     │     └───────── separator, dropped (10..11)
//! │     └─────────────── sub-region code   (5..10)
//! └───────────────────── region code       (0..5)
//! ```
//!
//! Every registry endpoint takes these four fields as query parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum identifier length carrying all four fields.
pub const IDENTIFIER_LEN: usize = 19;

/// The four positional fields every registry endpoint needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecodedIdentifier {
    pub region_code: String,
    pub sub_region_code: String,
    pub lot_numerator: String,
    pub lot_denominator: String,
}

impl fmt::Display for DecodedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {}-{}",
            self.region_code, self.sub_region_code, self.lot_numerator, self.lot_denominator
        )
    }
}

/// Decode a parcel identifier into its positional fields.
///
/// Offsets and the length check count bytes, not characters. Returns `None`
/// when the input is shorter than [`IDENTIFIER_LEN`] bytes or when an offset
/// does not fall on a character boundary.
pub fn decode(identifier: &str) -> Option<DecodedIdentifier> {
    if identifier.len() < IDENTIFIER_LEN {
        return None;
    }
    let field = |start: usize, end: usize| identifier.get(start..end).map(str::to_string);

    Some(DecodedIdentifier {
        region_code: field(0, 5)?,
        sub_region_code: field(5, 10)?,
        lot_numerator: field(11, 15)?,
        lot_denominator: field(15, 19)?,
    })
}
