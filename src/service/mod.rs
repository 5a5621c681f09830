pub mod attendance;
pub mod auto_checkout;
pub mod clock;
pub mod department;
pub mod directory;
pub mod leave;
pub mod repository;
pub mod stats;
