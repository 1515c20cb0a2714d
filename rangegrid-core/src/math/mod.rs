/// Conversions between cartesian and spherical coordinates
pub mod spherical;
