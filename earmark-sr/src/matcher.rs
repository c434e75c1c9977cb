//! Query matching against the inverted index
//!
//! Classic landmark voting: every query hash that exists in the index casts
//! one vote per posting into a per-song histogram keyed by the offset delta
//! `anchor_time − query_time`. A true match concentrates votes in one
//! histogram bin (the alignment between query and song); mismatches smear
//! votes across bins. The best song is ranked by its histogram peak and
//! accepted only when peak, peak-over-runner-up ratio, and aligned-share
//! confidence all clear their thresholds.

use earmark_common::params::MatcherParams;
use earmark_common::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::db::{CatalogStore, Posting};
use crate::fingerprint::{Fingerprint, FingerprintHash};

/// Scoring result for the best-ranked catalog song.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub song_id: i64,
    /// Votes in the best offset bin
    pub aligned: u32,
    /// The winning offset delta, in time bins (song time − query time)
    pub offset_delta: i64,
    /// Aligned share of the query's hashes, 0–100
    pub confidence: f64,
    /// Best peak over the runner-up song's peak
    pub score_ratio: f64,
    /// Whether all acceptance thresholds passed
    pub accepted: bool,
}

/// Score retrieved postings against the query. Pure and synchronous;
/// returns `None` when no query hash hit the index at all.
pub fn score_postings(
    query: &[Fingerprint],
    postings: &HashMap<FingerprintHash, Vec<Posting>>,
    params: &MatcherParams,
) -> Option<MatchScore> {
    if query.is_empty() {
        return None;
    }

    // song_id → (offset delta → votes)
    let mut histograms: HashMap<i64, HashMap<i64, u32>> = HashMap::new();
    for landmark in query {
        if let Some(matches) = postings.get(&landmark.hash) {
            for posting in matches {
                let delta = posting.anchor_time as i64 - landmark.anchor_time as i64;
                *histograms
                    .entry(posting.song_id)
                    .or_default()
                    .entry(delta)
                    .or_default() += 1;
            }
        }
    }

    // per song: the single best-aligned bin
    let mut ranked: Vec<(i64, u32, i64)> = histograms
        .iter()
        .map(|(&song_id, histogram)| {
            let (&delta, &votes) = histogram
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                .expect("histogram entries are never empty");
            (song_id, votes, delta)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let (song_id, aligned, offset_delta) = *ranked.first()?;
    let runner_up = ranked.get(1).map(|r| r.1).unwrap_or(0);

    let confidence = (100.0 * aligned as f64 / query.len().max(1) as f64).clamp(0.0, 100.0);
    let score_ratio = aligned as f64 / runner_up.max(1) as f64;
    let accepted = aligned >= params.min_aligned
        && score_ratio >= params.min_ratio
        && confidence >= params.min_confidence;

    Some(MatchScore {
        song_id,
        aligned,
        offset_delta,
        confidence,
        score_ratio,
        accepted,
    })
}

/// Matcher bound to a catalog.
pub struct Matcher {
    catalog: Arc<CatalogStore>,
    params: MatcherParams,
}

impl Matcher {
    pub fn new(catalog: Arc<CatalogStore>, params: MatcherParams) -> Self {
        Self { catalog, params }
    }

    /// Match query landmarks against the catalog.
    ///
    /// `Ok(None)` means no candidate existed (empty query or nothing hit
    /// the index); a returned score may still be `accepted == false`.
    pub async fn match_fingerprints(&self, query: &[Fingerprint]) -> Result<Option<MatchScore>> {
        if query.is_empty() {
            return Ok(None);
        }

        let hashes: Vec<FingerprintHash> = query.iter().map(|f| f.hash).collect();
        let postings = self.catalog.lookup(&hashes).await?;

        let score = score_postings(query, &postings, &self.params);
        if let Some(ref s) = score {
            debug!(
                song_id = s.song_id,
                aligned = s.aligned,
                confidence = s.confidence,
                score_ratio = s.score_ratio,
                accepted = s.accepted,
                "scored query against catalog"
            );
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmark(tag: u32, query_time: u32) -> Fingerprint {
        Fingerprint {
            hash: FingerprintHash::from_triple(tag, tag + 1, 1),
            anchor_time: query_time,
        }
    }

    /// Build a postings map where `song` matches `query[i]` at
    /// `query_time + offset` for the chosen indexes.
    fn aligned_postings(
        query: &[Fingerprint],
        song: i64,
        offset: i64,
        indexes: &[usize],
    ) -> HashMap<FingerprintHash, Vec<Posting>> {
        let mut map: HashMap<FingerprintHash, Vec<Posting>> = HashMap::new();
        for &i in indexes {
            map.entry(query[i].hash).or_default().push(Posting {
                song_id: song,
                anchor_time: (query[i].anchor_time as i64 + offset) as u32,
            });
        }
        map
    }

    fn query(n: u32) -> Vec<Fingerprint> {
        (0..n).map(|i| landmark(i * 10, i)).collect()
    }

    #[test]
    fn aligned_votes_win_with_the_right_offset() {
        let q = query(20);
        let postings = aligned_postings(&q, 3, 50, &(0..12).collect::<Vec<_>>());
        let score = score_postings(&q, &postings, &MatcherParams::default()).unwrap();

        assert_eq!(score.song_id, 3);
        assert_eq!(score.aligned, 12);
        assert_eq!(score.offset_delta, 50);
        assert!((score.confidence - 60.0).abs() < 1e-9);
        assert!(score.accepted);
    }

    #[test]
    fn scattered_votes_are_rejected() {
        let q = query(20);
        // every hit lands at a different offset: peak stays at 1
        let mut map: HashMap<FingerprintHash, Vec<Posting>> = HashMap::new();
        for (i, l) in q.iter().enumerate() {
            map.entry(l.hash).or_default().push(Posting {
                song_id: 3,
                anchor_time: l.anchor_time + (i as u32 * 37) % 400,
            });
        }
        let score = score_postings(&q, &map, &MatcherParams::default()).unwrap();
        assert!(!score.accepted);
        assert!(score.aligned < MatcherParams::default().min_aligned);
    }

    #[test]
    fn ambiguous_runner_up_fails_the_ratio() {
        let q = query(30);
        let mut map = aligned_postings(&q, 1, 10, &(0..10).collect::<Vec<_>>());
        for (hash, postings) in aligned_postings(&q, 2, 90, &(10..18).collect::<Vec<_>>()) {
            map.entry(hash).or_default().extend(postings);
        }
        let score = score_postings(&q, &map, &MatcherParams::default()).unwrap();
        assert_eq!(score.song_id, 1);
        // 10 vs 8 aligned: ratio 1.25 < 2.0
        assert!(score.score_ratio < 2.0);
        assert!(!score.accepted);
    }

    #[test]
    fn low_confidence_fails_even_when_aligned() {
        let q = query(200);
        let postings = aligned_postings(&q, 5, 0, &(0..8).collect::<Vec<_>>());
        let score = score_postings(&q, &postings, &MatcherParams::default()).unwrap();
        assert_eq!(score.aligned, 8);
        // 8 of 200 = 4% < 10%
        assert!(!score.accepted);
    }

    #[test]
    fn empty_query_has_no_candidate() {
        assert!(score_postings(&[], &HashMap::new(), &MatcherParams::default()).is_none());
    }

    #[test]
    fn no_index_hits_has_no_candidate() {
        let q = query(5);
        assert!(score_postings(&q, &HashMap::new(), &MatcherParams::default()).is_none());
    }

    #[tokio::test]
    async fn matcher_hits_the_catalog() {
        let catalog = Arc::new(CatalogStore::open_in_memory().await.unwrap());
        let song_landmarks: Vec<Fingerprint> =
            (0..40).map(|i| landmark(i * 10, i + 100)).collect();
        let id = catalog
            .add_song(
                &crate::db::NewSong {
                    title: "catalogued".into(),
                    artist: "a".into(),
                    album: None,
                    duration: 60.0,
                    path: "/x.flac".into(),
                    metadata: None,
                },
                &song_landmarks,
            )
            .await
            .unwrap();

        // query = the same landmarks re-timed to start at 0
        let q: Vec<Fingerprint> = (0..40).map(|i| landmark(i * 10, i)).collect();
        let matcher = Matcher::new(Arc::clone(&catalog), MatcherParams::default());
        let score = matcher.match_fingerprints(&q).await.unwrap().unwrap();

        assert_eq!(score.song_id, id);
        assert_eq!(score.offset_delta, 100);
        assert!(score.accepted);
    }
}
