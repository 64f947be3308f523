//! Rule matcher implementations for deliberate.

pub mod scan;

pub use scan::ScanMatcher;
