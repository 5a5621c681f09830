pub mod haversine;
pub mod resolver;

pub use haversine::{Coordinates, Geofence, haversine_distance};
pub use resolver::{AddressLookup, GeoResolver, ResolvedAddress};
