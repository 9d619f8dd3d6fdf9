//! Background video probing and decoding.

/// Decoded background clip shared across pages.
pub mod background;
