//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing a vehicle entering a parking slot.
#[derive(Clone, Copy, Debug)]
pub struct Entry;

/// Marker type describing a vehicle leaving a parking slot.
#[derive(Clone, Copy, Debug)]
pub struct Exit;

/// Marker type describing an entity expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;
