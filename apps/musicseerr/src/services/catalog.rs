//! Catalog views assembled from MusicBrainz lookups.

use crate::error::Result;
use crate::models::{
    date_sort_key, flatten_tracks, group_discography, ArtistRef, ArtistView, ReleaseGroupRef,
    ReleaseGroupSummary, ReleaseRef,
};
use crate::services::musicbrainz::{MbRelease, MusicBrainzClient};

/// Editions listed on an album page.
const MAX_RELEASES: usize = 10;

/// Artist details with the discography sorted by first release date and grouped.
pub async fn artist_view(client: &MusicBrainzClient, mbid: &str) -> Result<ArtistView> {
    let artist = client.get_artist(mbid).await?;

    let mut release_groups: Vec<ReleaseGroupSummary> = artist
        .release_groups
        .into_iter()
        .map(ReleaseGroupSummary::from)
        .collect();
    release_groups.sort_by(|a, b| {
        date_sort_key(a.first_release_date.as_deref())
            .cmp(date_sort_key(b.first_release_date.as_deref()))
    });

    Ok(ArtistView {
        mbid: artist.id,
        name: artist.name,
        artist_type: artist.artist_type,
        country: artist.country,
        disambiguation: artist.disambiguation,
        life_span: artist.life_span,
        release_group_count: release_groups.len(),
        discography: group_discography(release_groups),
    })
}

/// Release group with its editions and the track list of the earliest one.
///
/// A failed track lookup is logged and yields an empty track list; the
/// release group itself must load.
pub async fn release_group_view(
    client: &MusicBrainzClient,
    mbid: &str,
) -> Result<ReleaseGroupRef> {
    let rg = client.get_release_group(mbid).await?;

    let releases = sort_releases(rg.releases);

    let tracks = match releases.first() {
        Some(earliest) => match client.get_release_tracks(&earliest.id).await {
            Ok(release) => flatten_tracks(release.media),
            Err(e) => {
                tracing::warn!(release = %earliest.id, error = %e, "Failed to load tracks");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    Ok(ReleaseGroupRef {
        cover_url: MusicBrainzClient::cover_url(&rg.id, "500"),
        artist_credit: rg.artist_credit.iter().map(ArtistRef::from).collect(),
        mbid: rg.id,
        title: rg.title,
        primary_type: rg.primary_type,
        secondary_types: rg.secondary_types,
        first_release_date: rg.first_release_date,
        releases: releases
            .into_iter()
            .take(MAX_RELEASES)
            .map(ReleaseRef::from)
            .collect(),
        tracks,
    })
}

/// Releases ordered by date ascending, undated last.
pub fn sort_releases(mut releases: Vec<MbRelease>) -> Vec<MbRelease> {
    releases.sort_by(|a, b| {
        date_sort_key(a.date.as_deref()).cmp(date_sort_key(b.date.as_deref()))
    });
    releases
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(id: &str, date: Option<&str>) -> MbRelease {
        MbRelease {
            id: id.to_string(),
            title: "Edition".to_string(),
            status: None,
            country: None,
            date: date.map(str::to_string),
            track_count: None,
        }
    }

    #[test]
    fn test_earliest_release_first() {
        let sorted = sort_releases(vec![
            release("a", Some("2020-03-01")),
            release("b", None),
            release("c", Some("2019-01-01")),
        ]);
        assert_eq!(sorted[0].id, "c");
        assert_eq!(sorted[0].date.as_deref(), Some("2019-01-01"));
        assert_eq!(sorted[2].id, "b");
    }

    #[test]
    fn test_partial_dates_sort_before_later_years() {
        let sorted = sort_releases(vec![
            release("a", Some("2001-05-02")),
            release("b", Some("2001")),
        ]);
        assert_eq!(sorted[0].id, "b");
    }
}
