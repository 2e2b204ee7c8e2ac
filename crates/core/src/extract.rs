//! Result-image qualification and batch recovery.
//!
//! The generation UI renders a fixed-size batch of result thumbnails in a
//! single row but gives them no stable DOM identifier. Grouping qualifying
//! images by vertical proximity recovers "this batch" in a layout-agnostic
//! way; the thresholds are tuned to the current UI snapshot and configurable
//! through [`Heuristics`].

use std::collections::HashSet;

use serde::Deserialize;

use crate::config::Heuristics;
use crate::model::GeneratedImage;

/// One rendered image as reported by the page scan, document coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageRect {
    pub url: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// URL substrings that mark UI chrome rather than generated content.
const CHROME_URL_MARKERS: &[&str] = &[
    "icon", "logo", "avatar", "sprite", "favicon", "emoji", "badge", ".svg",
];

fn is_chrome_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    CHROME_URL_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Filter a scan down to plausible generation results: new since the
/// baseline, not chrome, and large enough to be content. When at least a
/// full batch sits in the upper page region, anything below it is treated as
/// unrelated gallery content and dropped.
pub fn qualify(
    snapshot: &[ImageRect],
    baseline: &HashSet<String>,
    heuristics: &Heuristics,
) -> Vec<ImageRect> {
    let mut candidates: Vec<ImageRect> = snapshot
        .iter()
        .filter(|img| !baseline.contains(&img.url))
        .filter(|img| !is_chrome_url(&img.url))
        .filter(|img| {
            img.width >= heuristics.min_image_px && img.height >= heuristics.min_image_px
        })
        .cloned()
        .collect();

    let in_top_region = candidates
        .iter()
        .filter(|img| img.y < heuristics.top_region_px)
        .count();
    if in_top_region >= heuristics.batch_size {
        candidates.retain(|img| img.y < heuristics.top_region_px);
    }

    candidates
}

/// Order qualifying images top-to-bottom then left-to-right, group them into
/// rows, and pick the batch: the first row holding exactly `batch_size`
/// images, or the first `batch_size` images in sorted order when no such row
/// exists. Deterministic for a fixed snapshot.
pub fn extract_batch(mut candidates: Vec<ImageRect>, heuristics: &Heuristics) -> Vec<GeneratedImage> {
    candidates.sort_by(|a, b| {
        a.y.total_cmp(&b.y).then_with(|| a.x.total_cmp(&b.x))
    });

    let rows = group_rows(&candidates, heuristics.row_tolerance_px);
    let batch: Vec<&ImageRect> = match rows
        .iter()
        .find(|row| row.len() == heuristics.batch_size)
    {
        Some(row) => row.iter().collect(),
        None => candidates.iter().take(heuristics.batch_size).collect(),
    };

    batch
        .into_iter()
        .enumerate()
        .map(|(i, img)| GeneratedImage {
            url: img.url.clone(),
            index: i + 1,
        })
        .collect()
}

/// Cluster vertically-sorted rects into rows. A rect opens a new row when its
/// top edge drifts beyond the tolerance from the row's anchor.
fn group_rows(sorted: &[ImageRect], tolerance: f64) -> Vec<Vec<ImageRect>> {
    let mut rows: Vec<Vec<ImageRect>> = Vec::new();
    let mut anchor_y = f64::NEG_INFINITY;
    for img in sorted {
        if (img.y - anchor_y).abs() > tolerance {
            anchor_y = img.y;
            rows.push(Vec::new());
        }
        if let Some(row) = rows.last_mut() {
            row.push(img.clone());
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(url: &str, x: f64, y: f64, size: f64) -> ImageRect {
        ImageRect {
            url: url.to_string(),
            x,
            y,
            width: size,
            height: size,
        }
    }

    fn heuristics() -> Heuristics {
        Heuristics::default()
    }

    #[test]
    fn baseline_images_are_excluded() {
        let baseline: HashSet<String> = ["https://cdn.example/old.png".to_string()].into();
        let snapshot = vec![
            rect("https://cdn.example/old.png", 0.0, 100.0, 256.0),
            rect("https://cdn.example/new.png", 0.0, 100.0, 256.0),
        ];
        let qualified = qualify(&snapshot, &baseline, &heuristics());
        assert_eq!(qualified.len(), 1);
        assert_eq!(qualified[0].url, "https://cdn.example/new.png");
    }

    #[test]
    fn chrome_urls_and_thumbnails_are_excluded() {
        let snapshot = vec![
            rect("https://cdn.example/logo.png", 0.0, 100.0, 256.0),
            rect("https://cdn.example/user-avatar.jpg", 0.0, 100.0, 256.0),
            rect("https://cdn.example/art.png", 0.0, 100.0, 64.0),
            rect("https://cdn.example/keep.png", 0.0, 100.0, 256.0),
        ];
        let qualified = qualify(&snapshot, &HashSet::new(), &heuristics());
        assert_eq!(qualified.len(), 1);
        assert_eq!(qualified[0].url, "https://cdn.example/keep.png");
    }

    #[test]
    fn gallery_below_top_region_is_dropped_when_batch_is_above() {
        let mut snapshot: Vec<ImageRect> = (0..4)
            .map(|i| rect(&format!("https://cdn.example/top{i}.png"), i as f64 * 300.0, 200.0, 256.0))
            .collect();
        snapshot.push(rect("https://cdn.example/gallery.png", 0.0, 900.0, 256.0));

        let qualified = qualify(&snapshot, &HashSet::new(), &heuristics());
        assert_eq!(qualified.len(), 4);
        assert!(qualified.iter().all(|img| img.y < 600.0));
    }

    #[test]
    fn top_region_filter_is_skipped_without_a_full_batch_above() {
        let snapshot = vec![
            rect("https://cdn.example/a.png", 0.0, 200.0, 256.0),
            rect("https://cdn.example/b.png", 0.0, 900.0, 256.0),
        ];
        let qualified = qualify(&snapshot, &HashSet::new(), &heuristics());
        assert_eq!(qualified.len(), 2);
    }

    #[test]
    fn picks_first_row_of_exactly_four() {
        // Two rows of four; small y jitter inside the tolerance.
        let mut snapshot = Vec::new();
        for i in 0..4 {
            snapshot.push(rect(
                &format!("https://cdn.example/row1-{i}.png"),
                i as f64 * 300.0,
                200.0 + i as f64 * 5.0,
                256.0,
            ));
        }
        for i in 0..4 {
            snapshot.push(rect(
                &format!("https://cdn.example/row2-{i}.png"),
                i as f64 * 300.0,
                560.0,
                256.0,
            ));
        }

        let batch = extract_batch(snapshot, &heuristics());
        assert_eq!(batch.len(), 4);
        assert_eq!(batch[0].url, "https://cdn.example/row1-0.png");
        assert_eq!(batch[0].index, 1);
        assert_eq!(batch[3].url, "https://cdn.example/row1-3.png");
        assert_eq!(batch[3].index, 4);
    }

    #[test]
    fn extraction_is_deterministic_for_a_fixed_snapshot() {
        let snapshot: Vec<ImageRect> = (0..8)
            .map(|i| {
                rect(
                    &format!("https://cdn.example/{i}.png"),
                    (i % 4) as f64 * 300.0,
                    if i < 4 { 200.0 } else { 560.0 },
                    256.0,
                )
            })
            .collect();

        let first = extract_batch(snapshot.clone(), &heuristics());
        let second = extract_batch(snapshot, &heuristics());
        assert_eq!(first, second);
        // Index 1 is the top-left image.
        assert_eq!(first[0].index, 1);
        assert_eq!(first[0].url, "https://cdn.example/0.png");
    }

    #[test]
    fn falls_back_to_first_four_sorted_when_no_row_has_four() {
        let snapshot = vec![
            rect("https://cdn.example/a.png", 0.0, 100.0, 256.0),
            rect("https://cdn.example/b.png", 300.0, 100.0, 256.0),
            rect("https://cdn.example/c.png", 0.0, 500.0, 256.0),
            rect("https://cdn.example/d.png", 300.0, 500.0, 256.0),
            rect("https://cdn.example/e.png", 0.0, 900.0, 256.0),
        ];
        let batch = extract_batch(snapshot, &heuristics());
        let urls: Vec<&str> = batch.iter().map(|img| img.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/a.png",
                "https://cdn.example/b.png",
                "https://cdn.example/c.png",
                "https://cdn.example/d.png",
            ]
        );
    }

    #[test]
    fn fewer_candidates_than_batch_size_still_extracts() {
        let snapshot = vec![
            rect("https://cdn.example/only.png", 0.0, 100.0, 256.0),
            rect("https://cdn.example/pair.png", 300.0, 100.0, 256.0),
        ];
        let batch = extract_batch(snapshot, &heuristics());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].index, 2);
    }

    #[test]
    fn empty_candidates_extract_to_nothing() {
        assert!(extract_batch(Vec::new(), &heuristics()).is_empty());
    }

    #[test]
    fn row_ordering_is_row_major() {
        // Deliberately shuffled input.
        let snapshot = vec![
            rect("https://cdn.example/r1c2.png", 300.0, 200.0, 256.0),
            rect("https://cdn.example/r1c1.png", 0.0, 205.0, 256.0),
            rect("https://cdn.example/r1c4.png", 900.0, 198.0, 256.0),
            rect("https://cdn.example/r1c3.png", 600.0, 202.0, 256.0),
        ];
        let batch = extract_batch(snapshot, &heuristics());
        let urls: Vec<&str> = batch.iter().map(|img| img.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/r1c1.png",
                "https://cdn.example/r1c2.png",
                "https://cdn.example/r1c3.png",
                "https://cdn.example/r1c4.png",
            ]
        );
    }
}
