//! Application services for the MusicSeerr backend.

pub mod catalog;
pub mod lidarr;
pub mod musicbrainz;
pub mod requests;

pub use lidarr::LidarrClient;
pub use musicbrainz::MusicBrainzClient;
pub use requests::RequestService;
