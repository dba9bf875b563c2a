//! Page parsers that turn fetched HTML into collected data.
//!
//! Parsers are pure: they take a page body that has already been fetched and
//! never perform I/O themselves, so the same body always yields the same
//! result.
//!
//! | Parser | Module | Output |
//! |--------|--------|--------|
//! | Page title | [`title`] | Whitespace-squashed headline text |

pub mod title;
