//! Value objects served by the API.
//!
//! Everything here is built per request from MusicBrainz or Lidarr responses;
//! nothing is cached or persisted.

use serde::Serialize;

use crate::services::lidarr::{LidarrAlbum, LidarrArtist, QueueRecord};
use crate::services::musicbrainz::{
    ArtistCredit, LifeSpan, MbArtist, MbMedium, MbRelease, MbReleaseGroup, MusicBrainzClient,
};

/// Dates missing from MusicBrainz sort after every real date.
const MISSING_DATE_SORT_KEY: &str = "9999";

/// Sort key for an optional YYYY[-MM[-DD]] date string.
pub fn date_sort_key(date: Option<&str>) -> &str {
    match date {
        Some(d) if !d.is_empty() => d,
        _ => MISSING_DATE_SORT_KEY,
    }
}

// =============================================================================
// Catalog (MusicBrainz)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistRef {
    pub mbid: String,
    pub name: String,
}

impl From<&ArtistCredit> for ArtistRef {
    fn from(credit: &ArtistCredit) -> Self {
        Self {
            mbid: credit.artist.id.clone(),
            name: credit.artist.name.clone(),
        }
    }
}

/// Artist search hit.
#[derive(Debug, Serialize)]
pub struct ArtistSearchResult {
    pub mbid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl From<MbArtist> for ArtistSearchResult {
    fn from(a: MbArtist) -> Self {
        Self {
            mbid: a.id,
            name: a.name,
            sort_name: a.sort_name,
            disambiguation: a.disambiguation,
            artist_type: a.artist_type,
            country: a.country,
            score: a.score,
        }
    }
}

/// Release group summary used by search results and discographies.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseGroupSummary {
    pub mbid: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<String>,
    pub secondary_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_release_date: Option<String>,
    pub artist_credit: Vec<ArtistRef>,
    pub cover_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl From<MbReleaseGroup> for ReleaseGroupSummary {
    fn from(rg: MbReleaseGroup) -> Self {
        Self {
            cover_url: MusicBrainzClient::cover_url(&rg.id, "250"),
            artist_credit: rg.artist_credit.iter().map(ArtistRef::from).collect(),
            mbid: rg.id,
            title: rg.title,
            primary_type: rg.primary_type,
            secondary_types: rg.secondary_types,
            first_release_date: rg.first_release_date,
            score: rg.score,
        }
    }
}

impl ReleaseGroupSummary {
    /// Display section for discography pages.
    ///
    /// Compilation, Live and Remix secondary types take precedence over the
    /// primary type; anything unrecognised lands in "Other".
    pub fn section(&self) -> ReleaseSection {
        let has = |t: &str| self.secondary_types.iter().any(|s| s == t);
        if has("Compilation") {
            return ReleaseSection::Compilation;
        }
        if has("Live") {
            return ReleaseSection::Live;
        }
        if has("Remix") {
            return ReleaseSection::Remix;
        }
        match self.primary_type.as_deref() {
            Some("Album") => ReleaseSection::Album,
            Some("EP") => ReleaseSection::Ep,
            Some("Single") => ReleaseSection::Single,
            _ => ReleaseSection::Other,
        }
    }
}

/// Discography sections in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ReleaseSection {
    Album,
    #[serde(rename = "EP")]
    Ep,
    Single,
    Live,
    Compilation,
    Remix,
    Other,
}

#[derive(Debug, Serialize)]
pub struct DiscographySection {
    pub section: ReleaseSection,
    pub release_groups: Vec<ReleaseGroupSummary>,
}

/// Group release groups by section, keeping their incoming order within each.
pub fn group_discography(release_groups: Vec<ReleaseGroupSummary>) -> Vec<DiscographySection> {
    let mut sections: Vec<DiscographySection> = Vec::new();
    for rg in release_groups {
        let section = rg.section();
        match sections.iter_mut().find(|s| s.section == section) {
            Some(existing) => existing.release_groups.push(rg),
            None => sections.push(DiscographySection {
                section,
                release_groups: vec![rg],
            }),
        }
    }
    sections.sort_by_key(|s| s.section);
    sections
}

/// Artist page: details plus date-sorted, grouped discography.
#[derive(Debug, Serialize)]
pub struct ArtistView {
    pub mbid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub life_span: Option<LifeSpan>,
    pub release_group_count: usize,
    pub discography: Vec<DiscographySection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRef {
    pub mbid: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_count: Option<u32>,
}

impl From<MbRelease> for ReleaseRef {
    fn from(r: MbRelease) -> Self {
        Self {
            mbid: r.id,
            title: r.title,
            date: r.date,
            country: r.country,
            status: r.status,
            track_count: r.track_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRef {
    pub position: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_ms: Option<u64>,
    pub disc_number: u32,
}

/// Flatten all media of a release into one track list.
pub fn flatten_tracks(media: Vec<MbMedium>) -> Vec<TrackRef> {
    media
        .into_iter()
        .flat_map(|medium| {
            let disc_number = medium.position;
            medium.tracks.into_iter().map(move |t| TrackRef {
                position: t.position,
                title: t.title,
                length_ms: t.length,
                disc_number,
            })
        })
        .collect()
}

/// Album page: release group, its editions, and the earliest edition's tracks.
#[derive(Debug, Serialize)]
pub struct ReleaseGroupRef {
    pub mbid: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<String>,
    pub secondary_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_release_date: Option<String>,
    pub artist_credit: Vec<ArtistRef>,
    pub cover_url: String,
    pub releases: Vec<ReleaseRef>,
    pub tracks: Vec<TrackRef>,
}

// =============================================================================
// Library (Lidarr)
// =============================================================================

/// Library status of an album as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumStatus {
    /// All tracks on disk
    Complete,
    /// Some tracks on disk
    Partial,
    /// Wanted, nothing on disk yet
    Monitored,
    NotRequested,
}

impl AlbumStatus {
    /// Derive status from Lidarr's own statistics; `percent_of_tracks` is authoritative.
    pub fn derive(monitored: bool, track_file_count: u32, percent_of_tracks: f64) -> Self {
        if percent_of_tracks >= 100.0 {
            AlbumStatus::Complete
        } else if track_file_count > 0 {
            AlbumStatus::Partial
        } else if monitored {
            AlbumStatus::Monitored
        } else {
            AlbumStatus::NotRequested
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LibraryArtist {
    pub id: i64,
    pub foreign_artist_id: String,
    pub name: String,
    pub monitored: bool,
    pub album_count: u32,
    pub track_file_count: u32,
    pub track_count: u32,
}

impl From<LidarrArtist> for LibraryArtist {
    fn from(a: LidarrArtist) -> Self {
        Self {
            id: a.id,
            foreign_artist_id: a.foreign_artist_id,
            name: a.artist_name,
            monitored: a.monitored,
            album_count: a.statistics.album_count,
            track_file_count: a.statistics.track_file_count,
            track_count: a.statistics.track_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LibraryAlbum {
    pub id: i64,
    pub foreign_album_id: String,
    pub artist_id: i64,
    pub title: String,
    pub monitored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub track_file_count: u32,
    pub track_count: u32,
    pub percent_of_tracks: f64,
    pub status: AlbumStatus,
}

impl LibraryAlbum {
    /// Monitored but nothing downloaded for an album with known tracks.
    pub fn is_wanted(&self) -> bool {
        self.monitored && self.track_file_count == 0 && self.track_count > 0
    }
}

impl From<LidarrAlbum> for LibraryAlbum {
    fn from(a: LidarrAlbum) -> Self {
        let stats = a.statistics;
        Self {
            status: AlbumStatus::derive(
                a.monitored,
                stats.track_file_count,
                stats.percent_of_tracks,
            ),
            id: a.id,
            foreign_album_id: a.foreign_album_id,
            artist_id: a.artist_id,
            title: a.title,
            monitored: a.monitored,
            album_type: a.album_type,
            release_date: a.release_date,
            track_file_count: stats.track_file_count,
            track_count: stats.track_count,
            percent_of_tracks: stats.percent_of_tracks,
        }
    }
}

/// Queue entry state shown to the user; unknown states pass through raw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum QueueState {
    Downloading,
    ImportPending,
    Other(String),
}

impl QueueState {
    pub fn from_record(status: &str, tracked_download_state: Option<&str>) -> Self {
        if tracked_download_state == Some("importPending") {
            QueueState::ImportPending
        } else if status == "downloading" {
            QueueState::Downloading
        } else {
            QueueState::Other(status.to_string())
        }
    }
}

impl From<QueueState> for String {
    fn from(state: QueueState) -> Self {
        match state {
            QueueState::Downloading => "downloading".to_string(),
            QueueState::ImportPending => "import_pending".to_string(),
            QueueState::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueueItem {
    pub id: i64,
    pub title: String,
    pub state: QueueState,
    pub size: u64,
    pub size_left: u64,
    pub progress_percent: f64,
    pub size_display: String,
    pub downloaded_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_title: Option<String>,
}

impl From<QueueRecord> for QueueItem {
    fn from(r: QueueRecord) -> Self {
        let size = r.size.max(0.0) as u64;
        let size_left = (r.size_left.max(0.0) as u64).min(size);
        let downloaded = size - size_left;
        Self {
            state: QueueState::from_record(&r.status, r.tracked_download_state.as_deref()),
            id: r.id,
            title: r.title,
            size,
            size_left,
            progress_percent: progress_percent(size, size_left),
            size_display: format_size(size),
            downloaded_display: format_size(downloaded),
            time_left: r.time_left,
            artist_name: r.artist.map(|a| a.artist_name),
            album_title: r.album.map(|a| a.title),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueueView {
    pub queue: Vec<QueueItem>,
    pub total_records: i64,
}

pub fn progress_percent(size: u64, size_left: u64) -> f64 {
    if size == 0 {
        return 0.0;
    }
    (size.saturating_sub(size_left)) as f64 / size as f64 * 100.0
}

/// Format bytes as human-readable size (B, KB, MB, GB)
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
