//! Ports - capabilities the presenter core consumes

pub mod outbound;
