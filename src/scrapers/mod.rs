//! Site-specific flows implementing [`crate::traits::AuctionSite`]

pub mod govdeals;
